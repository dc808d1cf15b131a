use std::fmt;

use time::OffsetDateTime;

use super::{AttributeKey, AttributeValue, CertAttrSet, ExtensionKind, write_header};
use crate::der::{DerEncoder, ObjectIdentifier, known, tags};
use crate::error::{Result, TrustKitError};

const TAG_BEFORE: u8 = tags::context(0, false);
const TAG_AFTER: u8 = tags::context(1, false);

#[derive(Debug, Clone, Copy)]
enum Key {
    NotBefore,
    NotAfter,
}

impl AttributeKey for Key {
    const NAMES: &'static [&'static str] = &["not_before", "not_after"];
    const ALL: &'static [Self] = &[Key::NotBefore, Key::NotAfter];
}

/// The private key usage period extension:
///
/// ```text
/// PrivateKeyUsagePeriod ::= SEQUENCE {
///     notBefore [0] IMPLICIT GeneralizedTime OPTIONAL,
///     notAfter  [1] IMPLICIT GeneralizedTime OPTIONAL }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateKeyUsage {
    critical: bool,
    not_before: Option<OffsetDateTime>,
    not_after: Option<OffsetDateTime>,
}

impl PrivateKeyUsage {
    pub fn new(not_before: Option<OffsetDateTime>, not_after: Option<OffsetDateTime>) -> Self {
        Self {
            critical: false,
            not_before,
            not_after,
        }
    }

    pub fn not_before(&self) -> Option<OffsetDateTime> {
        self.not_before
    }

    pub fn not_after(&self) -> Option<OffsetDateTime> {
        self.not_after
    }

    /// Whether `at` falls inside the period. Missing bounds are open.
    pub fn is_valid_at(&self, at: OffsetDateTime) -> bool {
        self.not_before.is_none_or(|nb| nb <= at) && self.not_after.is_none_or(|na| at <= na)
    }
}

impl ExtensionKind for PrivateKeyUsage {
    const OID: ObjectIdentifier = known::PRIVATE_KEY_USAGE_PERIOD;
    const NAME: &'static str = "PrivateKeyUsage";

    /// An empty value is a period with neither bound.
    fn decode(critical: bool, value: &[u8]) -> Result<Self> {
        let mut usage = Self {
            critical,
            not_before: None,
            not_after: None,
        };
        if value.is_empty() {
            return Ok(usage);
        }
        let seq = crate::der::decode(value)?;
        if !seq.is(tags::SEQUENCE) {
            return Err(TrustKitError::malformed(
                "invalid encoding for PrivateKeyUsageExtension",
            ));
        }
        for field in seq.children()? {
            let slot = if field.is(TAG_BEFORE) {
                &mut usage.not_before
            } else if field.is(TAG_AFTER) {
                &mut usage.not_after
            } else {
                return Err(TrustKitError::malformed(
                    "invalid encoding of PrivateKeyUsageExtension",
                ));
            };
            if slot.is_some() {
                return Err(TrustKitError::malformed(format!(
                    "duplicate {} in PrivateKeyUsageExtension",
                    if field.is(TAG_BEFORE) { "notBefore" } else { "notAfter" }
                )));
            }
            *slot = Some(field.retag(tags::GENERALIZED_TIME).generalized_time()?);
        }
        Ok(usage)
    }

    fn critical(&self) -> bool {
        self.critical
    }

    fn value(&self) -> Result<Vec<u8>> {
        if self.not_before.is_none() && self.not_after.is_none() {
            return Ok(Vec::new());
        }
        let mut body = DerEncoder::new();
        for (tag, time) in [(TAG_BEFORE, self.not_before), (TAG_AFTER, self.not_after)] {
            if let Some(time) = time {
                let mut field = DerEncoder::new();
                field.put_generalized_time(time)?;
                body.write_implicit(tag, &field);
            }
        }
        let mut out = DerEncoder::new();
        out.write(tags::SEQUENCE, &body);
        Ok(out.into_bytes())
    }
}

impl CertAttrSet for PrivateKeyUsage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn elements(&self) -> &'static [&'static str] {
        Key::NAMES
    }

    fn get(&self, name: &str) -> Result<AttributeValue> {
        Ok(match Key::parse(Self::NAME, name)? {
            Key::NotBefore => self.not_before.into(),
            Key::NotAfter => self.not_after.into(),
        })
    }

    fn set(&mut self, name: &str, value: AttributeValue) -> Result<()> {
        let key = Key::parse(Self::NAME, name)?;
        let time = value.into_time()?;
        match key {
            Key::NotBefore => self.not_before = Some(time),
            Key::NotAfter => self.not_after = Some(time),
        }
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        match Key::parse(Self::NAME, name)? {
            Key::NotBefore => self.not_before = None,
            Key::NotAfter => self.not_after = None,
        }
        Ok(())
    }
}

impl fmt::Display for PrivateKeyUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_header(f, self)?;
        writeln!(f, "PrivateKeyUsage: [")?;
        if let Some(nb) = self.not_before {
            writeln!(f, "From: {nb}")?;
        }
        if let Some(na) = self.not_after {
            writeln!(f, "To: {na}")?;
        }
        writeln!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_encode_decode() {
        let usage = PrivateKeyUsage::new(
            Some(datetime!(2024-01-01 00:00:00 UTC)),
            Some(datetime!(2026-01-01 00:00:00 UTC)),
        );
        let value = usage.value().unwrap();
        assert_eq!(&value[..4], &[0x30, 0x22, 0x80, 0x0F]);
        assert_eq!(&value[4..19], b"20240101000000Z");
        assert_eq!(PrivateKeyUsage::decode(false, &value).unwrap(), usage);
        assert!(usage.is_valid_at(datetime!(2025-06-01 00:00:00 UTC)));
        assert!(!usage.is_valid_at(datetime!(2027-01-01 00:00:00 UTC)));
    }

    #[test]
    fn test_rejects_duplicates_and_constructed() {
        let mut dup = vec![0x30, 0x22];
        for _ in 0..2 {
            dup.push(0x80);
            dup.push(0x0F);
            dup.extend_from_slice(b"20240101000000Z");
        }
        assert!(matches!(
            PrivateKeyUsage::decode(false, &dup),
            Err(TrustKitError::MalformedEncoding(_))
        ));

        let mut constructed = vec![0x30, 0x13, 0xA0, 0x11, 0x18, 0x0F];
        constructed.extend_from_slice(b"20240101000000Z");
        assert!(PrivateKeyUsage::decode(false, &constructed).is_err());
    }

    #[test]
    fn test_delete_both_empties_value() {
        let mut usage = PrivateKeyUsage::new(None, Some(datetime!(2030-01-01 00:00:00 UTC)));
        assert_eq!(usage.get("not_before").unwrap(), AttributeValue::Absent);
        usage.delete("NOT_AFTER").unwrap();
        assert!(usage.value().unwrap().is_empty());
        assert!(usage.set("not_before", AttributeValue::Bool(true)).is_err());
    }
}
