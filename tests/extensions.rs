mod util;

use num_bigint::BigInt;
use time::macros::datetime;
use trustkit::cert::extensions::{
    AttributeValue, CertAttrSet, CertExtension, CrlReason, CrlReasonCode, DeltaCrlIndicator,
    ExtendedKeyUsage, ExtensionKind, InvalidityDate, KeyUsage, KeyUsageBit, OcspNoCheck,
    PrivateKeyUsage, SubjectKeyIdentifier,
};
use trustkit::der::known;
use trustkit::error::TrustKitError;

/// Encodes `kind`, expects an empty value, and decodes it back through the
/// OID registry.
fn assert_empty_round_trip<K>(kind: K)
where
    K: ExtensionKind + Into<CertExtension>,
{
    let extension = kind.to_extension().unwrap();
    assert!(extension.value().is_empty());
    let expected: CertExtension = kind.into();
    assert_eq!(CertExtension::decode(&extension).unwrap(), expected);
}

#[test]
fn key_usage_attribute_contract() {
    let mut key_usage = KeyUsage::new(vec![]);
    key_usage.set("digital_signature", true.into()).unwrap();
    assert_eq!(
        key_usage.get("digital_signature").unwrap(),
        AttributeValue::Bool(true)
    );
    assert!(key_usage.has(KeyUsageBit::DigitalSignature));
    // BIT STRING, seven unused bits, bit 0 set
    assert_eq!(key_usage.value().unwrap(), [0x03, 0x02, 0x07, 0x80]);

    let err = key_usage.get("not_a_field").unwrap_err();
    assert!(matches!(err, TrustKitError::UnknownAttribute { .. }));
    assert_eq!(
        err.to_string(),
        "Attribute name [not_a_field] not recognized by CertAttrSet:KeyUsage."
    );
    // a failed call leaves the extension untouched
    assert!(key_usage.set("not_a_field", true.into()).is_err());
    assert_eq!(key_usage.value().unwrap(), [0x03, 0x02, 0x07, 0x80]);
}

#[test]
fn key_usage_round_trips_through_extension() {
    let key_usage = KeyUsage::from_bits(&[KeyUsageBit::KeyCertSign, KeyUsageBit::CrlSign]);
    let extension = key_usage.to_extension().unwrap();
    assert!(extension.is_critical());
    match CertExtension::decode(&extension).unwrap() {
        CertExtension::KeyUsage(decoded) => assert_eq!(decoded, key_usage),
        other => panic!("decoded as {other:?}"),
    }
}

#[test]
fn no_check_has_no_attributes() {
    let mut no_check = OcspNoCheck::new();
    assert!(no_check.value().unwrap().is_empty());
    assert!(no_check.elements().is_empty());
    assert!(matches!(
        no_check.get("anything"),
        Err(TrustKitError::NoAttributes(_))
    ));
    assert!(no_check.delete("anything").is_err());
}

#[test]
fn certificate_extensions_are_decoded() {
    let ca = util::generate_ca_cert();
    let extensions = ca.cert.extensions().unwrap();
    assert!(
        extensions
            .iter()
            .any(|ext| matches!(ext, CertExtension::SubjectKeyIdentifier(_)))
    );
    let key_usage = extensions
        .iter()
        .find_map(|ext| match ext {
            CertExtension::KeyUsage(key_usage) => Some(key_usage),
            _ => None,
        })
        .unwrap();
    assert_eq!(
        key_usage.get("key_certsign").unwrap(),
        AttributeValue::Bool(true)
    );
    assert!(key_usage.to_string().contains("Key_CertSign"));
}

#[test]
fn emptied_extensions_decode_back() {
    let mut reason = CrlReasonCode::new(CrlReason::KeyCompromise);
    reason
        .set("reason", AttributeValue::Integer(BigInt::from(0)))
        .unwrap();
    assert_eq!(reason.reason(), CrlReason::Unspecified);
    assert_empty_round_trip(reason);
    assert_empty_round_trip(CrlReasonCode::new(CrlReason::Unspecified));

    let mut period = PrivateKeyUsage::new(
        Some(datetime!(2024-01-01 0:00 UTC)),
        Some(datetime!(2026-01-01 0:00 UTC)),
    );
    period.delete("not_before").unwrap();
    period.delete("not_after").unwrap();
    assert_empty_round_trip(period);
    assert_empty_round_trip(PrivateKeyUsage::new(None, None));

    let mut date = InvalidityDate::new(datetime!(2025-06-01 12:00 UTC));
    date.delete("date").unwrap();
    assert_empty_round_trip(date);

    let mut delta = DeltaCrlIndicator::new(BigInt::from(7));
    delta.delete("value").unwrap();
    assert_empty_round_trip(delta);

    let mut usages = ExtendedKeyUsage::new(vec![known::KP_CODE_SIGNING]);
    usages.delete("usages").unwrap();
    assert_empty_round_trip(usages);

    let mut key_id = SubjectKeyIdentifier::new(vec![0x01, 0x02, 0x03]);
    key_id.delete("key_id").unwrap();
    assert_empty_round_trip(key_id);
}
