use std::cmp::Ordering;

use num_bigint::BigInt;
use time::OffsetDateTime;

use super::{BitString, DerValue, ObjectIdentifier, Tag, tags};
use crate::error::Result;

/// Types that can write their DER encoding to a [`DerEncoder`].
pub trait DerEncode {
    fn encode(&self, out: &mut DerEncoder) -> Result<()>;

    fn to_der(&self) -> Result<Vec<u8>> {
        let mut out = DerEncoder::new();
        self.encode(&mut out)?;
        Ok(out.into_bytes())
    }
}

impl DerEncode for DerValue {
    fn encode(&self, out: &mut DerEncoder) -> Result<()> {
        out.put_der_value(self);
        Ok(())
    }
}

/// Append-only DER output buffer.
#[derive(Debug, Default, Clone)]
pub struct DerEncoder {
    buf: Vec<u8>,
}

impl DerEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn put_tlv(&mut self, tag: u8, content: &[u8]) {
        self.buf.push(tag);
        push_length(&mut self.buf, content.len());
        self.buf.extend_from_slice(content);
    }

    /// Two's-complement INTEGER in its minimal form.
    pub fn put_integer(&mut self, value: &BigInt) {
        self.put_tlv(tags::INTEGER, &value.to_signed_bytes_be());
    }

    pub fn put_u32(&mut self, value: u32) {
        self.put_integer(&BigInt::from(value));
    }

    pub fn put_enumerated(&mut self, value: i64) {
        self.put_tlv(tags::ENUMERATED, &BigInt::from(value).to_signed_bytes_be());
    }

    pub fn put_boolean(&mut self, value: bool) {
        self.put_tlv(tags::BOOLEAN, &[if value { 0xFF } else { 0x00 }]);
    }

    pub fn put_null(&mut self) {
        self.put_tlv(tags::NULL, &[]);
    }

    pub fn put_oid(&mut self, oid: &ObjectIdentifier) {
        self.put_tlv(tags::OID, &oid.to_der_content());
    }

    pub fn put_octet_string(&mut self, bytes: &[u8]) {
        self.put_tlv(tags::OCTET_STRING, bytes);
    }

    /// Octet-aligned BIT STRING.
    pub fn put_bit_string(&mut self, bytes: &[u8]) {
        self.buf.push(tags::BIT_STRING);
        push_length(&mut self.buf, bytes.len() + 1);
        self.buf.push(0);
        self.buf.extend_from_slice(bytes);
    }

    pub fn put_unaligned_bit_string(&mut self, bits: &BitString) {
        let bytes = bits.raw_bytes();
        self.buf.push(tags::BIT_STRING);
        push_length(&mut self.buf, bytes.len() + 1);
        self.buf.push(bits.unused_bits());
        self.buf.extend_from_slice(bytes);
    }

    /// BIT STRING with trailing zero bits removed, as named bit lists require.
    pub fn put_truncated_unaligned_bit_string(&mut self, bits: &BitString) {
        self.put_unaligned_bit_string(&bits.truncated());
    }

    pub fn put_utc_time(&mut self, t: OffsetDateTime) -> Result<()> {
        let s = super::time::format_utc_time(t)?;
        self.put_tlv(tags::UTC_TIME, s.as_bytes());
        Ok(())
    }

    pub fn put_generalized_time(&mut self, t: OffsetDateTime) -> Result<()> {
        let s = super::time::format_generalized_time(t)?;
        self.put_tlv(tags::GENERALIZED_TIME, s.as_bytes());
        Ok(())
    }

    pub fn put_der_value(&mut self, value: &DerValue) {
        self.buf.extend_from_slice(&value.tag().to_bytes());
        push_length(&mut self.buf, value.content().len());
        self.buf.extend_from_slice(value.content());
    }

    /// Append bytes that already hold complete DER elements.
    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append `tag`, then the contents of `value` as that tag's content.
    pub fn write(&mut self, tag: u8, value: &DerEncoder) {
        self.put_tlv(tag, value.as_bytes());
    }

    /// Append the single element in `value` with its identifier octet
    /// replaced by `tag`.
    pub fn write_implicit(&mut self, tag: u8, value: &DerEncoder) {
        if let Some((_, rest)) = value.buf.split_first() {
            self.buf.push(tag);
            self.buf.extend_from_slice(rest);
        }
    }

    pub fn put_sequence(&mut self, items: &[DerValue]) {
        let mut body = DerEncoder::new();
        for item in items {
            body.put_der_value(item);
        }
        self.write(tags::SEQUENCE, &body);
    }

    /// Encode every item, sort the encodings by [`tag_order`] and write them
    /// as the content of `tag`.
    pub fn put_ordered_set_of<T: DerEncode>(&mut self, tag: u8, items: &[T]) -> Result<()> {
        let mut encoded = items
            .iter()
            .map(|item| item.to_der())
            .collect::<Result<Vec<_>>>()?;
        encoded.sort_by(|a, b| tag_order(a, b));
        log::trace!("ordered {} element(s) for set tag 0x{tag:02x}", encoded.len());

        let mut body = DerEncoder::new();
        for item in &encoded {
            body.put_raw(item);
        }
        self.write(tag, &body);
        Ok(())
    }
}

/// Canonical SET OF ordering for two encoded elements: tag class, then tag
/// number (the constructed bit is ignored), then the remaining octets in
/// lexicographic order.
pub fn tag_order(a: &[u8], b: &[u8]) -> Ordering {
    match (Tag::from_bytes(a), Tag::from_bytes(b)) {
        (Ok((ta, la)), Ok((tb, lb))) => ta
            .class
            .cmp(&tb.class)
            .then(ta.number.cmp(&tb.number))
            .then_with(|| a[la..].cmp(&b[lb..])),
        _ => a.cmp(b),
    }
}

pub(crate) fn push_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}
