//! X.509v3 extensions.
//!
//! [`Extension`] is the raw `(id, critical, value)` triple found in a
//! certificate or CRL. Concrete kinds implement [`ExtensionKind`] for typed
//! access and [`CertAttrSet`] for the string-keyed get/set/delete interface
//! used by tooling. [`CertExtension`] is the closed union of known kinds,
//! decoded through an OID registry.

mod crl;
mod extended_key_usage;
mod key_identifier;
mod key_usage;
mod no_check;
mod private_key_usage;

use std::fmt;

use num_bigint::BigInt;
use time::OffsetDateTime;

pub use crl::{CrlReason, CrlReasonCode, DeltaCrlIndicator, InvalidityDate};
pub use extended_key_usage::{ExtendedKeyUsage, ExtendedKeyUsageOption};
pub use key_identifier::SubjectKeyIdentifier;
pub use key_usage::{KeyUsage, KeyUsageBit};
pub use no_check::OcspNoCheck;
pub use private_key_usage::PrivateKeyUsage;

use crate::der::{DerEncode, DerEncoder, DerValue, ObjectIdentifier, tags};
use crate::error::{Result, TrustKitError};

/// A raw extension: `SEQUENCE { extnID, critical BOOLEAN DEFAULT FALSE,
/// extnValue OCTET STRING }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    id: ObjectIdentifier,
    critical: bool,
    value: Vec<u8>,
}

impl Extension {
    pub fn new(id: ObjectIdentifier, critical: bool, value: Vec<u8>) -> Self {
        Self {
            id,
            critical,
            value,
        }
    }

    pub fn id(&self) -> &ObjectIdentifier {
        &self.id
    }

    pub fn is_critical(&self) -> bool {
        self.critical
    }

    /// The DER encoding carried in `extnValue`.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn parse(value: &DerValue) -> Result<Self> {
        if !value.is(tags::SEQUENCE) {
            return Err(TrustKitError::malformed("extension is not a SEQUENCE"));
        }
        let input = value.content_input();
        let (id, input) = input.read_oid()?;
        let (critical, input) = input.read_optional(tags::BOOLEAN)?;
        let critical = critical.map(|b| b.boolean()).transpose()?.unwrap_or(false);
        let (octets, input) = input.read_octet_string()?;
        input.finish()?;
        Ok(Self::new(id, critical, octets.to_vec()))
    }

    pub fn from_x509(ext: &x509_cert::ext::Extension) -> Self {
        Self::new(
            ObjectIdentifier::from(&ext.extn_id),
            ext.critical,
            ext.extn_value.as_bytes().to_vec(),
        )
    }

    pub fn to_x509(&self) -> Result<x509_cert::ext::Extension> {
        Ok(x509_cert::ext::Extension {
            extn_id: self.id.to_const_oid()?,
            critical: self.critical,
            extn_value: der::asn1::OctetString::new(self.value.clone())?,
        })
    }
}

impl DerEncode for Extension {
    fn encode(&self, out: &mut DerEncoder) -> Result<()> {
        let mut body = DerEncoder::new();
        body.put_oid(&self.id);
        if self.critical {
            body.put_boolean(true);
        }
        body.put_octet_string(&self.value);
        out.write(tags::SEQUENCE, &body);
        Ok(())
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ObjectId: {} Criticality={}", self.id, self.critical)
    }
}

/// A value passed through the string-keyed attribute interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Bool(bool),
    Bytes(Vec<u8>),
    Integer(BigInt),
    Oids(Vec<ObjectIdentifier>),
    Time(OffsetDateTime),
    Absent,
}

impl AttributeValue {
    fn type_error(expected: &str) -> TrustKitError {
        TrustKitError::InvalidInput(format!("Attribute value should be of type {expected}."))
    }

    pub(crate) fn into_bool(self) -> Result<bool> {
        match self {
            AttributeValue::Bool(b) => Ok(b),
            _ => Err(Self::type_error("Boolean")),
        }
    }

    pub(crate) fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            AttributeValue::Bytes(b) => Ok(b),
            _ => Err(Self::type_error("byte array")),
        }
    }

    pub(crate) fn into_integer(self) -> Result<BigInt> {
        match self {
            AttributeValue::Integer(i) => Ok(i),
            _ => Err(Self::type_error("Integer")),
        }
    }

    pub(crate) fn into_oids(self) -> Result<Vec<ObjectIdentifier>> {
        match self {
            AttributeValue::Oids(oids) => Ok(oids),
            _ => Err(Self::type_error("Vector")),
        }
    }

    pub(crate) fn into_time(self) -> Result<OffsetDateTime> {
        match self {
            AttributeValue::Time(t) => Ok(t),
            _ => Err(Self::type_error("Date")),
        }
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(AttributeValue::Absent, Into::into)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(value: Vec<u8>) -> Self {
        AttributeValue::Bytes(value)
    }
}

impl From<BigInt> for AttributeValue {
    fn from(value: BigInt) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<Vec<ObjectIdentifier>> for AttributeValue {
    fn from(value: Vec<ObjectIdentifier>) -> Self {
        AttributeValue::Oids(value)
    }
}

impl From<OffsetDateTime> for AttributeValue {
    fn from(value: OffsetDateTime) -> Self {
        AttributeValue::Time(value)
    }
}

/// Typed access to one extension kind.
pub trait ExtensionKind: Sized {
    const OID: ObjectIdentifier;
    const NAME: &'static str;

    /// Decode the `extnValue` octets. The whole buffer must be consumed.
    fn decode(critical: bool, value: &[u8]) -> Result<Self>;

    fn critical(&self) -> bool;

    /// Encode the current fields as `extnValue` octets. Kinds holding no
    /// data encode to an empty value.
    fn value(&self) -> Result<Vec<u8>>;

    fn to_extension(&self) -> Result<Extension> {
        Ok(Extension::new(Self::OID, self.critical(), self.value()?))
    }
}

/// String-keyed attribute access layered over an extension's typed fields.
///
/// Keys are compared ignoring ASCII case. Unknown keys fail with
/// [`TrustKitError::UnknownAttribute`] and leave the extension unchanged.
pub trait CertAttrSet {
    fn name(&self) -> &'static str;

    /// Every key this set accepts.
    fn elements(&self) -> &'static [&'static str];

    fn get(&self, name: &str) -> Result<AttributeValue>;

    fn set(&mut self, name: &str, value: AttributeValue) -> Result<()>;

    fn delete(&mut self, name: &str) -> Result<()>;
}

/// The closed set of attribute keys of one extension kind.
pub(crate) trait AttributeKey: Copy + 'static {
    const NAMES: &'static [&'static str];
    const ALL: &'static [Self];

    fn parse(set: &'static str, name: &str) -> Result<Self> {
        Self::NAMES
            .iter()
            .zip(Self::ALL)
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, key)| *key)
            .ok_or_else(|| TrustKitError::UnknownAttribute {
                set,
                name: name.to_string(),
            })
    }
}

/// Every known extension kind, or the raw extension for unknown OIDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertExtension {
    KeyUsage(KeyUsage),
    SubjectKeyIdentifier(SubjectKeyIdentifier),
    ExtendedKeyUsage(ExtendedKeyUsage),
    PrivateKeyUsage(PrivateKeyUsage),
    CrlReasonCode(CrlReasonCode),
    InvalidityDate(InvalidityDate),
    DeltaCrlIndicator(DeltaCrlIndicator),
    OcspNoCheck(OcspNoCheck),
    Unrecognized(Extension),
}

type DecodeFn = fn(&Extension) -> Result<CertExtension>;

fn decode_as<K: ExtensionKind + Into<CertExtension>>(ext: &Extension) -> Result<CertExtension> {
    Ok(K::decode(ext.is_critical(), ext.value())?.into())
}

fn registry() -> [(ObjectIdentifier, DecodeFn); 8] {
    [
        (KeyUsage::OID, decode_as::<KeyUsage>),
        (SubjectKeyIdentifier::OID, decode_as::<SubjectKeyIdentifier>),
        (ExtendedKeyUsage::OID, decode_as::<ExtendedKeyUsage>),
        (PrivateKeyUsage::OID, decode_as::<PrivateKeyUsage>),
        (CrlReasonCode::OID, decode_as::<CrlReasonCode>),
        (InvalidityDate::OID, decode_as::<InvalidityDate>),
        (DeltaCrlIndicator::OID, decode_as::<DeltaCrlIndicator>),
        (OcspNoCheck::OID, decode_as::<OcspNoCheck>),
    ]
}

impl CertExtension {
    /// Decode `ext` with the kind registered for its OID.
    pub fn decode(ext: &Extension) -> Result<Self> {
        match registry().into_iter().find(|(oid, _)| oid == ext.id()) {
            Some((_, decode)) => decode(ext),
            None => Ok(CertExtension::Unrecognized(ext.clone())),
        }
    }

    pub fn as_attr_set(&self) -> Option<&dyn CertAttrSet> {
        Some(match self {
            CertExtension::KeyUsage(e) => e,
            CertExtension::SubjectKeyIdentifier(e) => e,
            CertExtension::ExtendedKeyUsage(e) => e,
            CertExtension::PrivateKeyUsage(e) => e,
            CertExtension::CrlReasonCode(e) => e,
            CertExtension::InvalidityDate(e) => e,
            CertExtension::DeltaCrlIndicator(e) => e,
            CertExtension::OcspNoCheck(e) => e,
            CertExtension::Unrecognized(_) => return None,
        })
    }

    pub fn as_attr_set_mut(&mut self) -> Option<&mut dyn CertAttrSet> {
        Some(match self {
            CertExtension::KeyUsage(e) => e,
            CertExtension::SubjectKeyIdentifier(e) => e,
            CertExtension::ExtendedKeyUsage(e) => e,
            CertExtension::PrivateKeyUsage(e) => e,
            CertExtension::CrlReasonCode(e) => e,
            CertExtension::InvalidityDate(e) => e,
            CertExtension::DeltaCrlIndicator(e) => e,
            CertExtension::OcspNoCheck(e) => e,
            CertExtension::Unrecognized(_) => return None,
        })
    }

    pub fn to_extension(&self) -> Result<Extension> {
        match self {
            CertExtension::KeyUsage(e) => e.to_extension(),
            CertExtension::SubjectKeyIdentifier(e) => e.to_extension(),
            CertExtension::ExtendedKeyUsage(e) => e.to_extension(),
            CertExtension::PrivateKeyUsage(e) => e.to_extension(),
            CertExtension::CrlReasonCode(e) => e.to_extension(),
            CertExtension::InvalidityDate(e) => e.to_extension(),
            CertExtension::DeltaCrlIndicator(e) => e.to_extension(),
            CertExtension::OcspNoCheck(e) => e.to_extension(),
            CertExtension::Unrecognized(e) => Ok(e.clone()),
        }
    }
}

impl fmt::Display for CertExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CertExtension::KeyUsage(e) => write!(f, "{e}"),
            CertExtension::SubjectKeyIdentifier(e) => write!(f, "{e}"),
            CertExtension::ExtendedKeyUsage(e) => write!(f, "{e}"),
            CertExtension::PrivateKeyUsage(e) => write!(f, "{e}"),
            CertExtension::CrlReasonCode(e) => write!(f, "{e}"),
            CertExtension::InvalidityDate(e) => write!(f, "{e}"),
            CertExtension::DeltaCrlIndicator(e) => write!(f, "{e}"),
            CertExtension::OcspNoCheck(e) => write!(f, "{e}"),
            CertExtension::Unrecognized(e) => write!(f, "{e}"),
        }
    }
}

macro_rules! impl_into_cert_extension {
    ($($kind:ident),* $(,)?) => {
        $(
            impl From<$kind> for CertExtension {
                fn from(ext: $kind) -> Self {
                    CertExtension::$kind(ext)
                }
            }
        )*
    };
}

impl_into_cert_extension!(
    KeyUsage,
    SubjectKeyIdentifier,
    ExtendedKeyUsage,
    PrivateKeyUsage,
    CrlReasonCode,
    InvalidityDate,
    DeltaCrlIndicator,
    OcspNoCheck,
);

/// Writes the `ObjectId: … Criticality=…` header every kind's dump starts
/// with.
pub(crate) fn write_header<K: ExtensionKind>(f: &mut fmt::Formatter<'_>, ext: &K) -> fmt::Result {
    writeln!(f, "ObjectId: {} Criticality={}", K::OID, ext.critical())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::der::{decode, known};

    #[test]
    fn test_extension_parse_and_encode() {
        // SEQUENCE { keyUsage, TRUE, OCTET STRING { BIT STRING 07 80 } }
        let data = [
            0x30, 0x0E, 0x06, 0x03, 0x55, 0x1D, 0x0F, 0x01, 0x01, 0xFF, 0x04, 0x04, 0x03, 0x02,
            0x07, 0x80,
        ];
        let ext = Extension::parse(&decode(&data).unwrap()).unwrap();
        assert_eq!(ext.id(), &known::KEY_USAGE);
        assert!(ext.is_critical());
        assert_eq!(ext.value(), &[0x03, 0x02, 0x07, 0x80]);
        assert_eq!(ext.to_der().unwrap(), data);

        let not_critical = Extension::new(known::OCSP_NO_CHECK, false, vec![]);
        let encoded = not_critical.to_der().unwrap();
        // OID (11 octets) and an empty OCTET STRING, no BOOLEAN
        assert_eq!(encoded.len(), 2 + 11 + 2);
        assert_eq!(
            Extension::parse(&decode(&encoded).unwrap()).unwrap(),
            not_critical
        );
    }

    #[test]
    fn test_extension_trailing_data() {
        let data = [
            0x30, 0x0B, 0x06, 0x03, 0x55, 0x1D, 0x0F, 0x04, 0x00, 0x04, 0x00, 0x05, 0x00,
        ];
        assert!(Extension::parse(&decode(&data).unwrap()).is_err());
    }

    #[test]
    fn test_registry_dispatch() {
        let ku = KeyUsage::from_bits(&[KeyUsageBit::DigitalSignature]);
        let decoded = CertExtension::decode(&ku.to_extension().unwrap()).unwrap();
        assert_eq!(decoded, CertExtension::KeyUsage(ku));
        assert_eq!(decoded.as_attr_set().unwrap().name(), "KeyUsage");

        let unknown = Extension::new(known::BASIC_CONSTRAINTS, true, vec![0x30, 0x00]);
        let decoded = CertExtension::decode(&unknown).unwrap();
        assert!(decoded.as_attr_set().is_none());
        assert_eq!(decoded.to_extension().unwrap(), unknown);
    }

    #[test]
    fn test_x509_interop() {
        let ext = Extension::new(known::KEY_USAGE, true, vec![0x03, 0x02, 0x07, 0x80]);
        let x509 = ext.to_x509().unwrap();
        assert!(x509.critical);
        assert_eq!(Extension::from_x509(&x509), ext);
    }

    #[test]
    fn test_attribute_value_types() {
        assert_eq!(AttributeValue::from(Some(true)), AttributeValue::Bool(true));
        assert_eq!(AttributeValue::from(None::<bool>), AttributeValue::Absent);
        assert!(matches!(
            AttributeValue::Bytes(vec![]).into_bool(),
            Err(TrustKitError::InvalidInput(_))
        ));
    }
}
