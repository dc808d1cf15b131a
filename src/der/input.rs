use num_bigint::BigInt;

use super::{DecoderConfig, DerValue, ObjectIdentifier, Tag, tags};
use crate::error::{Result, TrustKitError};

/// A read position in a DER buffer.
///
/// The input is `Copy`: every read consumes `self` and returns the value
/// together with the input positioned after it, leaving the caller's
/// earlier copies untouched.
#[derive(Debug, Clone, Copy)]
pub struct DerInput<'a> {
    data: &'a [u8],
    pos: usize,
    config: &'a DecoderConfig,
}

/// A saved position, restored with [`DerInput::rewind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

struct Element<'a> {
    tag: Tag,
    content: &'a [u8],
    raw: &'a [u8],
}

impl<'a> DerInput<'a> {
    /// An input over `data` using the default limits.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            config: &DecoderConfig::DEFAULT,
        }
    }

    /// An input over `data` using `config`; fails if `data` is over the
    /// configured size limit.
    pub fn with_config(data: &'a [u8], config: &'a DecoderConfig) -> Result<Self> {
        config.check_input(data)?;
        Ok(Self {
            data,
            pos: 0,
            config,
        })
    }

    /// An input over the content of an already-admitted element; the size
    /// limit is not checked again.
    pub(crate) fn nested(data: &'a [u8], config: &'a DecoderConfig) -> Self {
        Self {
            data,
            pos: 0,
            config,
        }
    }

    pub fn config(&self) -> &'a DecoderConfig {
        self.config
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// The next identifier octet, without consuming it.
    pub fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.pos)
    }

    pub fn rewind(self, checkpoint: Checkpoint) -> Self {
        Self {
            pos: checkpoint.0,
            ..self
        }
    }

    /// Fails if any bytes remain.
    pub fn finish(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(TrustKitError::malformed(format!(
                "{} unexpected trailing byte(s) at offset {}",
                self.data.len() - self.pos,
                self.pos
            )))
        }
    }

    fn read_element(self) -> Result<(Element<'a>, Self)> {
        let (tag, tag_len) = Tag::from_bytes(self.remaining())?;
        let mut pos = self.pos + tag_len;

        let Some(&first) = self.data.get(pos) else {
            return Err(TrustKitError::malformed("unexpected end of data reading length"));
        };
        pos += 1;
        let length = match first {
            0..0x80 => first as usize,
            0x80 => {
                return Err(TrustKitError::malformed(
                    "indefinite length is not allowed in DER",
                ));
            }
            0x81..=0x84 => {
                let num_bytes = (first & 0x7F) as usize;
                let Some(bytes) = self.data.get(pos..pos + num_bytes) else {
                    return Err(TrustKitError::malformed("truncated length"));
                };
                pos += num_bytes;
                let length = bytes.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize);
                if bytes[0] == 0 || length < 0x80 {
                    return Err(TrustKitError::malformed("non-minimal length encoding"));
                }
                length
            }
            _ => return Err(TrustKitError::malformed("length field too long")),
        };

        if length > self.data.len() - pos {
            return Err(TrustKitError::malformed(format!(
                "length {length} overruns the {} available byte(s)",
                self.data.len() - pos
            )));
        }
        let end = pos + length;
        let element = Element {
            tag,
            content: &self.data[pos..end],
            raw: &self.data[self.pos..end],
        };
        Ok((element, Self { pos: end, ..self }))
    }

    fn read_tag(self, tag: u8) -> Result<(Element<'a>, Self)> {
        let (element, next) = self.read_element()?;
        if !element.tag.is(tag) {
            return Err(TrustKitError::malformed(format!(
                "expected tag 0x{tag:02x}, found 0x{}",
                hex::encode(element.tag.to_bytes())
            )));
        }
        Ok((element, next))
    }

    pub fn read_value(self) -> Result<(DerValue, Self)> {
        let (element, next) = self.read_element()?;
        Ok((DerValue::with_tag(element.tag, element.content), next))
    }

    /// The complete encoding (identifier, length, content) of the next
    /// element.
    pub fn read_raw(self) -> Result<(&'a [u8], Self)> {
        let (element, next) = self.read_element()?;
        Ok((element.raw, next))
    }

    /// The next element, which must carry `tag`.
    pub fn read_expected(self, tag: u8) -> Result<(DerValue, Self)> {
        let (element, next) = self.read_tag(tag)?;
        Ok((DerValue::with_tag(element.tag, element.content), next))
    }

    /// The next element if its identifier octet is `tag`.
    pub fn read_optional(self, tag: u8) -> Result<(Option<DerValue>, Self)> {
        if self.peek_byte() == Some(tag) {
            let (value, next) = self.read_expected(tag)?;
            Ok((Some(value), next))
        } else {
            Ok((None, self))
        }
    }

    /// An input over the content of the next element, which must carry
    /// `tag`, and the input after it.
    pub fn enter(self, tag: u8) -> Result<(DerInput<'a>, Self)> {
        let (element, next) = self.read_tag(tag)?;
        let inner = Self {
            data: element.content,
            pos: 0,
            config: self.config,
        };
        Ok((inner, next))
    }

    /// A SEQUENCE and its children.
    pub fn read_sequence(self, expected_count: usize) -> Result<(Vec<DerValue>, Self)> {
        let (inner, next) = self.enter(tags::SEQUENCE)?;
        Ok((inner.read_all(expected_count)?, next))
    }

    /// A SET (or the IMPLICIT-tagged SET `implicit_tag`) and its children
    /// in encoded order.
    pub fn read_set(
        self,
        expected_count: usize,
        implicit_tag: Option<u8>,
    ) -> Result<(Vec<DerValue>, Self)> {
        let (inner, next) = self.enter(implicit_tag.unwrap_or(tags::SET))?;
        Ok((inner.read_all(expected_count)?, next))
    }

    /// Every remaining element.
    pub fn read_all(self, expected_count: usize) -> Result<Vec<DerValue>> {
        let max = self.config.max_elements;
        let mut items = Vec::with_capacity(expected_count.min(max));
        let mut input = self;
        while !input.is_empty() {
            if items.len() == max {
                log::trace!("element limit {max} reached at offset {}", input.pos);
                return Err(TrustKitError::malformed(format!(
                    "more than {max} elements in a constructed value"
                )));
            }
            let (value, next) = input.read_value()?;
            items.push(value);
            input = next;
        }
        Ok(items)
    }

    pub fn read_integer(self) -> Result<(BigInt, Self)> {
        let (value, next) = self.read_expected(tags::INTEGER)?;
        Ok((value.integer()?, next))
    }

    pub fn read_u32(self) -> Result<(u32, Self)> {
        let (value, next) = self.read_expected(tags::INTEGER)?;
        Ok((value.u32_integer()?, next))
    }

    pub fn read_oid(self) -> Result<(ObjectIdentifier, Self)> {
        let (element, next) = self.read_tag(tags::OID)?;
        Ok((ObjectIdentifier::from_der_content(element.content)?, next))
    }

    pub fn read_octet_string(self) -> Result<(&'a [u8], Self)> {
        let (element, next) = self.read_tag(tags::OCTET_STRING)?;
        Ok((element.content, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_lengths() {
        // indefinite
        assert!(DerInput::new(&[0x30, 0x80, 0x00, 0x00]).read_value().is_err());
        // long form for a short length
        assert!(DerInput::new(&[0x04, 0x81, 0x01, 0xAA]).read_value().is_err());
        // leading zero length octet
        let mut data = vec![0x04, 0x82, 0x00, 0x80];
        data.extend(vec![0u8; 0x80]);
        assert!(DerInput::new(&data).read_value().is_err());
        // more than four length octets
        assert!(
            DerInput::new(&[0x04, 0x85, 0x00, 0x00, 0x00, 0x00, 0x01, 0xAA])
                .read_value()
                .is_err()
        );
    }

    #[test]
    fn test_long_form_length() {
        let mut data = vec![0x04, 0x81, 0x80];
        data.extend(vec![7u8; 0x80]);
        let (value, next) = DerInput::new(&data).read_value().unwrap();
        assert_eq!(value.content().len(), 0x80);
        assert!(next.finish().is_ok());
        assert_eq!(value.to_der(), data);
    }

    #[test]
    fn test_checkpoint_and_rewind() {
        let data = [0x02, 0x01, 0x05, 0x04, 0x01, 0xAA];
        let input = DerInput::new(&data);
        let start = input.checkpoint();
        let (n, input) = input.read_u32().unwrap();
        assert_eq!(n, 5);
        assert!(input.read_u32().is_err());

        let input = input.rewind(start);
        assert_eq!(input.position(), 0);
        let (value, input) = input.read_value().unwrap();
        assert!(value.is(tags::INTEGER));
        let (octets, input) = input.read_octet_string().unwrap();
        assert_eq!(octets, &[0xAA]);
        assert!(input.finish().is_ok());
    }

    #[test]
    fn test_copies_are_independent() {
        let data = [0x05, 0x00, 0x05, 0x00];
        let input = DerInput::new(&data);
        let (_, advanced) = input.read_value().unwrap();
        assert_eq!(input.position(), 0);
        assert_eq!(advanced.position(), 2);
    }

    #[test]
    fn test_optional_and_enter() {
        let data = [0xA0, 0x03, 0x02, 0x01, 0x02, 0x05, 0x00];
        let input = DerInput::new(&data);
        let (missing, input) = input.read_optional(0xA1).unwrap();
        assert!(missing.is_none());
        let (inner, input) = input.enter(0xA0).unwrap();
        let (version, inner) = inner.read_u32().unwrap();
        assert_eq!(version, 2);
        assert!(inner.finish().is_ok());
        let (null, input) = input.read_expected(tags::NULL).unwrap();
        assert!(null.null().is_ok());
        assert!(input.finish().is_ok());
    }

    #[test]
    fn test_element_limit() {
        let config = DecoderConfig::builder().max_elements(2).build();
        let data = [0x30, 0x06, 0x05, 0x00, 0x05, 0x00, 0x05, 0x00];
        let input = DerInput::with_config(&data, &config).unwrap();
        assert!(input.read_sequence(3).is_err());
        let relaxed = DecoderConfig::default();
        let input = DerInput::with_config(&data, &relaxed).unwrap();
        assert_eq!(input.read_sequence(3).unwrap().0.len(), 3);
    }

    #[test]
    fn test_input_size_limit() {
        let config = DecoderConfig::builder().max_input_len(4).build();
        assert!(DerInput::with_config(&[0x04, 0x03, 0x01, 0x02, 0x03], &config).is_err());
    }
}
