use std::fmt;

use num_bigint::{BigInt, Sign};
use time::OffsetDateTime;

use super::{DecoderConfig, DerInput, ObjectIdentifier, Tag, tags};
use crate::error::{Result, TrustKitError};

/// A single decoded or constructed DER element.
///
/// Holds the tag and the exact content octets. Constructed content is kept
/// as bytes and decoded into children on demand by [`DerValue::children`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DerValue {
    tag: Tag,
    content: Vec<u8>,
}

impl DerValue {
    /// Create a value from a single-octet tag and its content.
    pub fn new(tag: u8, content: impl Into<Vec<u8>>) -> Self {
        Self::with_tag(Tag::from_byte(tag), content)
    }

    pub fn with_tag(tag: Tag, content: impl Into<Vec<u8>>) -> Self {
        Self {
            tag,
            content: content.into(),
        }
    }

    /// Decode a buffer holding exactly one element.
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        super::decode(bytes)
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// True if the tag equals the single-octet tag `tag`.
    pub fn is(&self, tag: u8) -> bool {
        self.tag.is(tag)
    }

    pub fn is_constructed(&self) -> bool {
        self.tag.constructed
    }

    pub fn is_context_specific(&self, number: u32) -> bool {
        self.tag.is_context_specific(number)
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn into_content(self) -> Vec<u8> {
        self.content
    }

    /// The same content under a different tag, as for IMPLICIT tagging.
    pub fn retag(&self, tag: u8) -> DerValue {
        Self::new(tag, self.content.clone())
    }

    /// A cursor over the content octets.
    pub fn content_input(&self) -> DerInput<'_> {
        DerInput::new(&self.content)
    }

    /// A cursor over the content octets that enforces `config`'s element
    /// limit.
    pub fn content_input_with<'a>(&'a self, config: &'a DecoderConfig) -> DerInput<'a> {
        DerInput::nested(&self.content, config)
    }

    /// Encoded form: identifier octets, length octets, content.
    pub fn to_der(&self) -> Vec<u8> {
        let mut out = self.tag.to_bytes();
        super::encoder::push_length(&mut out, self.content.len());
        out.extend_from_slice(&self.content);
        out
    }

    /// Decode the content of a constructed value into its children, in
    /// encoded order.
    pub fn children(&self) -> Result<Vec<DerValue>> {
        self.children_with(&DecoderConfig::DEFAULT)
    }

    /// [`children`](Self::children) with an explicit element limit.
    pub fn children_with(&self, config: &DecoderConfig) -> Result<Vec<DerValue>> {
        if !self.tag.constructed {
            return Err(TrustKitError::malformed(format!(
                "{} is not a constructed value",
                self.tag_name()
            )));
        }
        self.content_input_with(config).read_all(4)
    }

    pub fn integer(&self) -> Result<BigInt> {
        self.expect(tags::INTEGER, "INTEGER")?;
        check_integer(&self.content)?;
        Ok(BigInt::from_signed_bytes_be(&self.content))
    }

    /// An INTEGER whose content is read as an unsigned magnitude, for
    /// encoders that omit the sign octet.
    pub fn positive_integer(&self) -> Result<BigInt> {
        self.expect(tags::INTEGER, "INTEGER")?;
        if self.content.is_empty() {
            return Err(TrustKitError::malformed("empty INTEGER"));
        }
        Ok(BigInt::from_bytes_be(Sign::Plus, &self.content))
    }

    pub fn u32_integer(&self) -> Result<u32> {
        let value = self.integer()?;
        u32::try_from(&value)
            .map_err(|_| TrustKitError::malformed(format!("INTEGER {value} out of range")))
    }

    pub fn enumerated(&self) -> Result<i64> {
        self.expect(tags::ENUMERATED, "ENUMERATED")?;
        check_integer(&self.content)?;
        let value = BigInt::from_signed_bytes_be(&self.content);
        i64::try_from(&value)
            .map_err(|_| TrustKitError::malformed(format!("ENUMERATED {value} out of range")))
    }

    pub fn boolean(&self) -> Result<bool> {
        self.expect(tags::BOOLEAN, "BOOLEAN")?;
        match self.content.as_slice() {
            [0x00] => Ok(false),
            [0xFF] => Ok(true),
            _ => Err(TrustKitError::malformed("invalid BOOLEAN encoding")),
        }
    }

    pub fn null(&self) -> Result<()> {
        self.expect(tags::NULL, "NULL")?;
        if !self.content.is_empty() {
            return Err(TrustKitError::malformed("NULL with content"));
        }
        Ok(())
    }

    pub fn octet_string(&self) -> Result<&[u8]> {
        self.expect(tags::OCTET_STRING, "OCTET STRING")?;
        Ok(&self.content)
    }

    /// Octets of a BIT STRING with no unused bits.
    pub fn bit_string(&self) -> Result<&[u8]> {
        self.expect(tags::BIT_STRING, "BIT STRING")?;
        match self.content.split_first() {
            Some((0, bytes)) => Ok(bytes),
            _ => Err(TrustKitError::malformed(
                "BIT STRING is not octet aligned",
            )),
        }
    }

    pub fn unaligned_bit_string(&self) -> Result<BitString> {
        self.expect(tags::BIT_STRING, "BIT STRING")?;
        let Some((&unused, bytes)) = self.content.split_first() else {
            return Err(TrustKitError::malformed("empty BIT STRING"));
        };
        BitString::new(bytes.to_vec(), unused)
    }

    pub fn oid(&self) -> Result<ObjectIdentifier> {
        self.expect(tags::OID, "OBJECT IDENTIFIER")?;
        ObjectIdentifier::from_der_content(&self.content)
    }

    pub fn utc_time(&self) -> Result<OffsetDateTime> {
        self.expect(tags::UTC_TIME, "UTCTime")?;
        super::time::parse_utc_time(&self.content)
    }

    pub fn generalized_time(&self) -> Result<OffsetDateTime> {
        self.expect(tags::GENERALIZED_TIME, "GeneralizedTime")?;
        super::time::parse_generalized_time(&self.content)
    }

    /// Either UTCTime or GeneralizedTime.
    pub fn time(&self) -> Result<OffsetDateTime> {
        if self.is(tags::UTC_TIME) {
            self.utc_time()
        } else {
            self.generalized_time()
        }
    }

    /// The value of any of the ASN.1 character string types.
    pub fn string(&self) -> Result<String> {
        let invalid = || {
            TrustKitError::malformed(format!("invalid {} content", self.tag_name()))
        };
        if !self.is_string() {
            return Err(TrustKitError::malformed(format!(
                "{} is not a string type",
                self.tag_name()
            )));
        }
        match self.tag.number as u8 {
            tags::UTF8_STRING
            | tags::PRINTABLE_STRING
            | tags::IA5_STRING
            | tags::VISIBLE_STRING => {
                String::from_utf8(self.content.clone()).map_err(|_| invalid())
            }
            // T.61 is treated as Latin-1.
            tags::T61_STRING => Ok(self.content.iter().map(|&b| b as char).collect()),
            tags::BMP_STRING => {
                if self.content.len() % 2 != 0 {
                    return Err(invalid());
                }
                let units: Vec<u16> = self
                    .content
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                String::from_utf16(&units).map_err(|_| invalid())
            }
            tags::UNIVERSAL_STRING => {
                if self.content.len() % 4 != 0 {
                    return Err(invalid());
                }
                self.content
                    .chunks_exact(4)
                    .map(|c| char::from_u32(u32::from_be_bytes([c[0], c[1], c[2], c[3]])))
                    .collect::<Option<String>>()
                    .ok_or_else(invalid)
            }
            _ => Err(invalid()),
        }
    }

    /// True if the tag is one of the character string types.
    pub fn is_string(&self) -> bool {
        self.tag.class == super::TagClass::Universal
            && !self.tag.constructed
            && self.tag.number < 0x1F
            && matches!(
                self.tag.number as u8,
                tags::UTF8_STRING
                    | tags::PRINTABLE_STRING
                    | tags::T61_STRING
                    | tags::IA5_STRING
                    | tags::VISIBLE_STRING
                    | tags::UNIVERSAL_STRING
                    | tags::BMP_STRING
            )
    }

    fn expect(&self, tag: u8, name: &str) -> Result<()> {
        if self.tag.is(tag) {
            Ok(())
        } else {
            Err(TrustKitError::malformed(format!(
                "expected {name}, found {}",
                self.tag_name()
            )))
        }
    }

    fn tag_name(&self) -> String {
        let bytes = self.tag.to_bytes();
        format!("tag 0x{}", hex::encode(bytes))
    }
}

impl fmt::Debug for DerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerValue")
            .field("tag", &format_args!("0x{}", hex::encode(self.tag.to_bytes())))
            .field("content", &hex::encode(&self.content))
            .finish()
    }
}

/// INTEGER content must be non-empty and minimal.
fn check_integer(content: &[u8]) -> Result<()> {
    match content {
        [] => Err(TrustKitError::malformed("empty INTEGER")),
        [0x00, next, ..] if next & 0x80 == 0 => {
            Err(TrustKitError::malformed("non-minimal INTEGER encoding"))
        }
        [0xFF, next, ..] if next & 0x80 != 0 => {
            Err(TrustKitError::malformed("non-minimal INTEGER encoding"))
        }
        _ => Ok(()),
    }
}

/// A BIT STRING whose length need not be a multiple of eight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BitString {
    bytes: Vec<u8>,
    unused_bits: u8,
}

impl BitString {
    pub fn new(bytes: Vec<u8>, unused_bits: u8) -> Result<Self> {
        if unused_bits > 7 || (bytes.is_empty() && unused_bits != 0) {
            return Err(TrustKitError::malformed(format!(
                "invalid unused bit count {unused_bits}"
            )));
        }
        if let Some(last) = bytes.last() {
            let mask = (1u8 << unused_bits) - 1;
            if last & mask != 0 {
                return Err(TrustKitError::malformed(
                    "BIT STRING padding bits are not zero",
                ));
            }
        }
        Ok(Self { bytes, unused_bits })
    }

    /// An octet-aligned bit string.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            unused_bits: 0,
        }
    }

    /// Bit 0 is the most significant bit of the first octet.
    pub fn from_bools(bits: &[bool]) -> Self {
        let mut bytes = vec![0u8; bits.len().div_ceil(8)];
        for (i, _) in bits.iter().enumerate().filter(|(_, set)| **set) {
            bytes[i / 8] |= 0x80 >> (i % 8);
        }
        Self {
            bytes,
            unused_bits: ((8 - bits.len() % 8) % 8) as u8,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len() * 8 - self.unused_bits as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> bool {
        index < self.len() && self.bytes[index / 8] & (0x80 >> (index % 8)) != 0
    }

    pub fn to_bools(&self) -> Vec<bool> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn unused_bits(&self) -> u8 {
        self.unused_bits
    }

    /// The same bits with trailing zero bits removed.
    pub fn truncated(&self) -> BitString {
        let len = (0..self.len()).rev().find(|&i| self.get(i)).map_or(0, |i| i + 1);
        Self::from_bools(&self.to_bools()[..len])
    }
}
