//! ASN.1 DER encoding and decoding.
//!
//! Decoding is strict about framing (definite, minimal lengths; minimal tag
//! numbers), so every value decoded here re-encodes to the exact bytes it
//! came from. Constructed content is kept as raw bytes and decoded into
//! children only on demand.

mod encoder;
mod input;
mod name;
mod oid;
mod time;
mod value;

use bon::Builder;

use crate::error::{Result, TrustKitError};

pub use encoder::{DerEncode, DerEncoder, tag_order};
pub use input::{Checkpoint, DerInput};
pub use name::X500Name;
pub use oid::{ObjectIdentifier, known};
pub use value::{BitString, DerValue};

/// ASN.1 tag byte constants.
pub mod tags {
    pub const BOOLEAN: u8 = 0x01;
    pub const INTEGER: u8 = 0x02;
    pub const BIT_STRING: u8 = 0x03;
    pub const OCTET_STRING: u8 = 0x04;
    pub const NULL: u8 = 0x05;
    pub const OID: u8 = 0x06;
    pub const ENUMERATED: u8 = 0x0A;
    pub const UTF8_STRING: u8 = 0x0C;
    pub const PRINTABLE_STRING: u8 = 0x13;
    pub const T61_STRING: u8 = 0x14;
    pub const IA5_STRING: u8 = 0x16;
    pub const UTC_TIME: u8 = 0x17;
    pub const GENERALIZED_TIME: u8 = 0x18;
    pub const VISIBLE_STRING: u8 = 0x1A;
    pub const UNIVERSAL_STRING: u8 = 0x1C;
    pub const BMP_STRING: u8 = 0x1E;
    pub const SEQUENCE: u8 = 0x30;
    pub const SET: u8 = 0x31;
    pub const CONTEXT_SPECIFIC: u8 = 0x80;
    pub const CONSTRUCTED: u8 = 0x20;

    /// Tag byte of a context-specific tag `[number]`.
    pub const fn context(number: u8, constructed: bool) -> u8 {
        CONTEXT_SPECIFIC | if constructed { CONSTRUCTED } else { 0 } | (number & 0x1F)
    }
}

/// ASN.1 tag class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TagClass {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

/// A parsed ASN.1 tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    pub class: TagClass,
    pub constructed: bool,
    pub number: u32,
}

impl Tag {
    /// Builds a tag from a single identifier octet (tag numbers below 31).
    pub const fn from_byte(byte: u8) -> Self {
        let class = match byte >> 6 {
            0 => TagClass::Universal,
            1 => TagClass::Application,
            2 => TagClass::ContextSpecific,
            _ => TagClass::Private,
        };
        Tag {
            class,
            constructed: byte & tags::CONSTRUCTED != 0,
            number: (byte & 0x1F) as u32,
        }
    }

    /// Parse a tag from the first bytes of `input`.
    /// Returns the tag and number of bytes consumed.
    pub fn from_bytes(input: &[u8]) -> Result<(Self, usize)> {
        let Some(&first) = input.first() else {
            return Err(TrustKitError::malformed("unexpected end of data reading tag"));
        };
        let tag = Tag::from_byte(first);
        if first & 0x1F != 0x1F {
            return Ok((tag, 1));
        }

        let mut number: u32 = 0;
        let mut i = 1;
        loop {
            let Some(&byte) = input.get(i) else {
                return Err(TrustKitError::malformed("truncated long-form tag"));
            };
            if i == 1 && byte == 0x80 {
                return Err(TrustKitError::malformed("non-minimal long-form tag"));
            }
            number = number
                .checked_mul(128)
                .ok_or_else(|| TrustKitError::malformed("tag number too large"))?
                | (byte & 0x7F) as u32;
            i += 1;
            if byte & 0x80 == 0 {
                break;
            }
        }
        if number < 0x1F {
            return Err(TrustKitError::malformed(
                "long-form tag used for a low tag number",
            ));
        }
        Ok((Tag { number, ..tag }, i))
    }

    /// Encode this tag to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let class_bits = match self.class {
            TagClass::Universal => 0x00,
            TagClass::Application => 0x40,
            TagClass::ContextSpecific => 0x80,
            TagClass::Private => 0xC0,
        };
        let constructed_bit = if self.constructed { tags::CONSTRUCTED } else { 0 };

        if self.number < 0x1F {
            return vec![class_bits | constructed_bit | self.number as u8];
        }
        let mut groups = Vec::new();
        let mut num = self.number;
        while num > 0 {
            groups.push((num & 0x7F) as u8);
            num >>= 7;
        }
        let mut out = vec![class_bits | constructed_bit | 0x1F];
        for (i, group) in groups.iter().rev().enumerate() {
            if i < groups.len() - 1 {
                out.push(group | 0x80);
            } else {
                out.push(*group);
            }
        }
        out
    }

    /// True if this is the context-specific tag `[number]`, either form.
    pub fn is_context_specific(&self, number: u32) -> bool {
        self.class == TagClass::ContextSpecific && self.number == number
    }

    /// True if the tag is the universal tag given by the single byte `byte`.
    pub fn is(&self, byte: u8) -> bool {
        *self == Tag::from_byte(byte)
    }
}

/// Limits applied while decoding untrusted input.
#[derive(Debug, Clone, Builder)]
pub struct DecoderConfig {
    /// Inputs longer than this are rejected before any parsing.
    #[builder(default = DecoderConfig::DEFAULT.max_input_len)]
    pub max_input_len: usize,
    /// Maximum number of children in one SEQUENCE OF or SET OF.
    #[builder(default = DecoderConfig::DEFAULT.max_elements)]
    pub max_elements: usize,
}

impl DecoderConfig {
    pub const DEFAULT: DecoderConfig = DecoderConfig {
        max_input_len: 64 << 20,
        max_elements: 1 << 16,
    };

    pub(crate) fn check_input(&self, data: &[u8]) -> Result<()> {
        if data.len() > self.max_input_len {
            log::trace!(
                "rejecting {} byte input, limit is {}",
                data.len(),
                self.max_input_len
            );
            return Err(TrustKitError::malformed(format!(
                "input of {} bytes exceeds the {} byte limit",
                data.len(),
                self.max_input_len
            )));
        }
        Ok(())
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Decodes a buffer holding exactly one DER element.
pub fn decode(bytes: &[u8]) -> Result<DerValue> {
    let input = DerInput::with_config(bytes, &DecoderConfig::DEFAULT)?;
    let (value, input) = input.read_value()?;
    input.finish()?;
    Ok(value)
}

/// Decodes a buffer holding exactly one SEQUENCE and returns its children.
pub fn decode_sequence(bytes: &[u8], expected_count: usize) -> Result<Vec<DerValue>> {
    let input = DerInput::with_config(bytes, &DecoderConfig::DEFAULT)?;
    let (items, input) = input.read_sequence(expected_count)?;
    input.finish()?;
    Ok(items)
}

/// Decodes a buffer holding exactly one SET (or the IMPLICIT-tagged SET
/// identified by `implicit_tag`) and returns its children in encoded order.
pub fn decode_set(
    bytes: &[u8],
    expected_count: usize,
    implicit_tag: Option<u8>,
) -> Result<Vec<DerValue>> {
    let input = DerInput::with_config(bytes, &DecoderConfig::DEFAULT)?;
    let (items, input) = input.read_set(expected_count, implicit_tag)?;
    input.finish()?;
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_tag() {
        let (tag, len) = Tag::from_bytes(&[0x30]).unwrap();
        assert_eq!(tag.class, TagClass::Universal);
        assert!(tag.constructed);
        assert_eq!(tag.number, 0x10);
        assert_eq!(len, 1);
    }

    #[test]
    fn test_long_form_tag() {
        let tag = Tag {
            class: TagClass::ContextSpecific,
            constructed: true,
            number: 200,
        };
        let bytes = tag.to_bytes();
        assert_eq!(bytes, vec![0xBF, 0x81, 0x48]);
        let (parsed, len) = Tag::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, tag);
        assert_eq!(len, 3);
    }

    #[test]
    fn test_long_form_low_number_rejected() {
        assert!(Tag::from_bytes(&[0x9F, 0x05]).is_err());
        assert!(Tag::from_bytes(&[0x9F, 0x80, 0x20]).is_err());
    }

    #[test]
    fn test_overrun_detected() {
        // NULL followed by a stray byte
        assert!(matches!(
            decode(&[0x05, 0x00, 0x00]),
            Err(TrustKitError::MalformedEncoding(_))
        ));
        // Missing content bytes
        assert!(decode(&[0x04, 0x03, 0x01]).is_err());
    }

    #[test]
    fn test_decode_set_implicit() {
        // [0] IMPLICIT SET OF { INTEGER 1, INTEGER 2 }
        let data = [0xA0, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02];
        let items = decode_set(&data, 2, Some(0xA0)).unwrap();
        assert_eq!(items.len(), 2);
        assert!(decode_set(&data, 2, None).is_err());
    }

    #[test]
    fn test_config_builder_defaults() {
        let config = DecoderConfig::builder().max_elements(4).build();
        assert_eq!(config.max_elements, 4);
        assert_eq!(config.max_input_len, DecoderConfig::DEFAULT.max_input_len);
        assert!(config.check_input(&[0u8; 16]).is_ok());
    }
}
