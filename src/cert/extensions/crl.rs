//! Extensions found in CRLs and CRL entries.

use std::fmt;

use num_bigint::BigInt;
use time::OffsetDateTime;

use super::{AttributeKey, AttributeValue, CertAttrSet, ExtensionKind, write_header};
use crate::der::{DerEncoder, ObjectIdentifier, known};
use crate::error::{Result, TrustKitError};

/// Revocation reasons (RFC 5280 `CRLReason`). Code 7 is unassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrlReason {
    Unspecified = 0,
    KeyCompromise = 1,
    CaCompromise = 2,
    AffiliationChanged = 3,
    Superseded = 4,
    CessationOfOperation = 5,
    CertificateHold = 6,
    Unused = 7,
    RemoveFromCrl = 8,
    PrivilegeWithdrawn = 9,
    AaCompromise = 10,
}

impl CrlReason {
    /// The reason for `code`; out-of-range codes map to `Unspecified`.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => CrlReason::KeyCompromise,
            2 => CrlReason::CaCompromise,
            3 => CrlReason::AffiliationChanged,
            4 => CrlReason::Superseded,
            5 => CrlReason::CessationOfOperation,
            6 => CrlReason::CertificateHold,
            7 => CrlReason::Unused,
            8 => CrlReason::RemoveFromCrl,
            9 => CrlReason::PrivilegeWithdrawn,
            10 => CrlReason::AaCompromise,
            _ => CrlReason::Unspecified,
        }
    }

    pub fn code(self) -> i64 {
        self as i64
    }
}

#[derive(Debug, Clone, Copy)]
enum ReasonKey {
    Reason,
}

impl AttributeKey for ReasonKey {
    const NAMES: &'static [&'static str] = &["reason"];
    const ALL: &'static [Self] = &[ReasonKey::Reason];
}

/// The CRL entry reason code extension (`ENUMERATED`).
///
/// `Unspecified` is the default and encodes as an empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrlReasonCode {
    critical: bool,
    reason_code: i64,
}

impl CrlReasonCode {
    pub fn new(reason: CrlReason) -> Self {
        Self {
            critical: false,
            reason_code: reason.code(),
        }
    }

    pub fn reason(&self) -> CrlReason {
        CrlReason::from_code(self.reason_code)
    }
}

impl ExtensionKind for CrlReasonCode {
    const OID: ObjectIdentifier = known::CRL_REASON_CODE;
    const NAME: &'static str = "CRLReasonCode";

    /// An empty value is `Unspecified`.
    fn decode(critical: bool, value: &[u8]) -> Result<Self> {
        if value.is_empty() {
            return Ok(Self {
                critical,
                reason_code: 0,
            });
        }
        Ok(Self {
            critical,
            reason_code: crate::der::decode(value)?.enumerated()?,
        })
    }

    fn critical(&self) -> bool {
        self.critical
    }

    fn value(&self) -> Result<Vec<u8>> {
        if self.reason_code == 0 {
            return Ok(Vec::new());
        }
        let mut out = DerEncoder::new();
        out.put_enumerated(self.reason_code);
        Ok(out.into_bytes())
    }
}

impl CertAttrSet for CrlReasonCode {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn elements(&self) -> &'static [&'static str] {
        ReasonKey::NAMES
    }

    fn get(&self, name: &str) -> Result<AttributeValue> {
        match ReasonKey::parse(Self::NAME, name)? {
            ReasonKey::Reason => Ok(AttributeValue::Integer(BigInt::from(self.reason_code))),
        }
    }

    fn set(&mut self, name: &str, value: AttributeValue) -> Result<()> {
        match ReasonKey::parse(Self::NAME, name)? {
            ReasonKey::Reason => {
                let code = value.into_integer()?;
                self.reason_code = i64::try_from(&code).map_err(|_| {
                    TrustKitError::InvalidInput(format!("reason code {code} out of range"))
                })?;
            }
        }
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        match ReasonKey::parse(Self::NAME, name)? {
            ReasonKey::Reason => self.reason_code = 0,
        }
        Ok(())
    }
}

impl fmt::Display for CrlReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_header(f, self)?;
        writeln!(f, "Reason Code: {:?}", self.reason())
    }
}

#[derive(Debug, Clone, Copy)]
enum DateKey {
    Date,
}

impl AttributeKey for DateKey {
    const NAMES: &'static [&'static str] = &["date"];
    const ALL: &'static [Self] = &[DateKey::Date];
}

/// The CRL entry invalidity date extension (`GeneralizedTime`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidityDate {
    critical: bool,
    date: Option<OffsetDateTime>,
}

impl InvalidityDate {
    pub fn new(date: OffsetDateTime) -> Self {
        Self {
            critical: false,
            date: Some(date),
        }
    }

    pub fn date(&self) -> Option<OffsetDateTime> {
        self.date
    }
}

impl ExtensionKind for InvalidityDate {
    const OID: ObjectIdentifier = known::INVALIDITY_DATE;
    const NAME: &'static str = "InvalidityDate";

    fn decode(critical: bool, value: &[u8]) -> Result<Self> {
        let date = if value.is_empty() {
            None
        } else {
            Some(crate::der::decode(value)?.generalized_time()?)
        };
        Ok(Self { critical, date })
    }

    fn critical(&self) -> bool {
        self.critical
    }

    fn value(&self) -> Result<Vec<u8>> {
        let Some(date) = self.date else {
            return Ok(Vec::new());
        };
        let mut out = DerEncoder::new();
        out.put_generalized_time(date)?;
        Ok(out.into_bytes())
    }
}

impl CertAttrSet for InvalidityDate {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn elements(&self) -> &'static [&'static str] {
        DateKey::NAMES
    }

    fn get(&self, name: &str) -> Result<AttributeValue> {
        match DateKey::parse(Self::NAME, name)? {
            DateKey::Date => Ok(self.date.into()),
        }
    }

    fn set(&mut self, name: &str, value: AttributeValue) -> Result<()> {
        match DateKey::parse(Self::NAME, name)? {
            DateKey::Date => self.date = Some(value.into_time()?),
        }
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        match DateKey::parse(Self::NAME, name)? {
            DateKey::Date => self.date = None,
        }
        Ok(())
    }
}

impl fmt::Display for InvalidityDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_header(f, self)?;
        match self.date {
            Some(date) => writeln!(f, "Invalidity Date: {date}"),
            None => writeln!(f, "Invalidity Date: Not Set"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum NumberKey {
    Value,
}

impl AttributeKey for NumberKey {
    const NAMES: &'static [&'static str] = &["value"];
    const ALL: &'static [Self] = &[NumberKey::Value];
}

/// The delta CRL indicator: the number of the base CRL this delta updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaCrlIndicator {
    critical: bool,
    base_crl_number: Option<BigInt>,
}

impl DeltaCrlIndicator {
    pub fn new(base_crl_number: BigInt) -> Self {
        Self {
            critical: true,
            base_crl_number: Some(base_crl_number),
        }
    }

    pub fn base_crl_number(&self) -> Option<&BigInt> {
        self.base_crl_number.as_ref()
    }
}

impl ExtensionKind for DeltaCrlIndicator {
    const OID: ObjectIdentifier = known::DELTA_CRL_INDICATOR;
    const NAME: &'static str = "DeltaCRLIndicator";

    fn decode(critical: bool, value: &[u8]) -> Result<Self> {
        let base_crl_number = if value.is_empty() {
            None
        } else {
            Some(crate::der::decode(value)?.integer()?)
        };
        Ok(Self {
            critical,
            base_crl_number,
        })
    }

    fn critical(&self) -> bool {
        self.critical
    }

    fn value(&self) -> Result<Vec<u8>> {
        let Some(number) = &self.base_crl_number else {
            return Ok(Vec::new());
        };
        let mut out = DerEncoder::new();
        out.put_integer(number);
        Ok(out.into_bytes())
    }
}

impl CertAttrSet for DeltaCrlIndicator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn elements(&self) -> &'static [&'static str] {
        NumberKey::NAMES
    }

    fn get(&self, name: &str) -> Result<AttributeValue> {
        match NumberKey::parse(Self::NAME, name)? {
            NumberKey::Value => Ok(self.base_crl_number.clone().into()),
        }
    }

    fn set(&mut self, name: &str, value: AttributeValue) -> Result<()> {
        match NumberKey::parse(Self::NAME, name)? {
            NumberKey::Value => self.base_crl_number = Some(value.into_integer()?),
        }
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        match NumberKey::parse(Self::NAME, name)? {
            NumberKey::Value => self.base_crl_number = None,
        }
        Ok(())
    }
}

impl fmt::Display for DeltaCrlIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_header(f, self)?;
        match &self.base_crl_number {
            Some(n) => writeln!(f, "Base CRL Number: [\n  {n:x}\n]"),
            None => writeln!(f, "Base CRL Number: [\n]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_reason_codes() {
        assert_eq!(CrlReason::from_code(1), CrlReason::KeyCompromise);
        assert_eq!(CrlReason::from_code(10), CrlReason::AaCompromise);
        assert_eq!(CrlReason::from_code(11), CrlReason::Unspecified);
        assert_eq!(CrlReason::from_code(-1), CrlReason::Unspecified);

        let code = CrlReasonCode::new(CrlReason::Superseded);
        assert_eq!(code.value().unwrap(), vec![0x0A, 0x01, 0x04]);
        let decoded = CrlReasonCode::decode(false, &[0x0A, 0x01, 0x04]).unwrap();
        assert_eq!(decoded.reason(), CrlReason::Superseded);
        assert!(CrlReasonCode::decode(false, &[0x02, 0x01, 0x04]).is_err());
    }

    #[test]
    fn test_unspecified_reason_has_empty_value() {
        let mut code = CrlReasonCode::new(CrlReason::KeyCompromise);
        code.set("reason", AttributeValue::Integer(BigInt::from(42))).unwrap();
        assert_eq!(code.reason(), CrlReason::Unspecified);
        code.delete("reason").unwrap();
        assert!(code.value().unwrap().is_empty());
        assert!(code.get("date").is_err());
    }

    #[test]
    fn test_invalidity_date() {
        let date = InvalidityDate::new(datetime!(2023-05-06 07:08:09 UTC));
        let value = date.value().unwrap();
        assert_eq!(value[0], 0x18);
        assert_eq!(InvalidityDate::decode(false, &value).unwrap(), date);
        // UTCTime is not accepted
        let mut utc = vec![0x17, 0x0D];
        utc.extend_from_slice(b"230506070809Z");
        assert!(InvalidityDate::decode(false, &utc).is_err());
    }

    #[test]
    fn test_delta_crl_indicator() {
        let delta = DeltaCrlIndicator::new(BigInt::from(300));
        assert!(delta.critical());
        assert_eq!(delta.value().unwrap(), vec![0x02, 0x02, 0x01, 0x2C]);
        let decoded = DeltaCrlIndicator::decode(true, &delta.value().unwrap()).unwrap();
        assert_eq!(decoded.base_crl_number(), Some(&BigInt::from(300)));
        assert_eq!(
            decoded.get("VALUE").unwrap(),
            AttributeValue::Integer(BigInt::from(300))
        );
    }
}
