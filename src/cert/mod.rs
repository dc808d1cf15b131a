//! X.509 certificates and CRLs.
//!
//! [`X509Certificate`] and [`X509Crl`] keep the exact DER they were built
//! from next to the `x509-cert` structure, so PKCS#7 encoding embeds them
//! unchanged. Fields that must match byte-for-byte (TBS, issuer, subject)
//! are sliced out with the crate's own decoder.

pub mod extensions;
pub mod params;

use std::fmt;

use der::{Decode, Encode};
use num_bigint::BigInt;
use time::OffsetDateTime;
use x509_cert::Certificate;
use x509_cert::crl::CertificateList;

use crate::algorithm::{AlgorithmId, SignatureAlgorithm};
use crate::der::{DerEncode, DerEncoder, DerInput, DerValue, X500Name, tags};
use crate::error::{Result, TrustKitError};
use crate::issuer::Issuer;
use crate::key::{KeyPair, PublicKey};
use extensions::{
    CertExtension, CrlReason, CrlReasonCode, ExtendedKeyUsage, ExtendedKeyUsageOption, Extension,
    ExtensionKind, KeyUsage,
};
use params::{CertificationRequestInfo, DistinguishedName, Validity};

const CERTIFICATE_PEM_LABEL: &str = "CERTIFICATE";

/// Splits a `SEQUENCE { tbs, signatureAlgorithm, signature BIT STRING }`
/// into its exact TBS bytes, algorithm and signature octets.
fn split_signed(raw: &[u8]) -> Result<(&[u8], AlgorithmId, Vec<u8>)> {
    let (body, rest) = DerInput::new(raw).enter(tags::SEQUENCE)?;
    rest.finish()?;
    let (tbs, body) = body.read_raw()?;
    let (algorithm, body) = AlgorithmId::read(body)?;
    let (signature, body) = body.read_expected(tags::BIT_STRING)?;
    body.finish()?;
    Ok((tbs, algorithm, signature.bit_string()?.to_vec()))
}

fn verify_signed(raw: &[u8], key: &PublicKey) -> Result<bool> {
    let (tbs, algorithm, signature) = split_signed(raw)?;
    let algorithm = SignatureAlgorithm::from_algorithm_id(&algorithm)?;
    key.verify(algorithm.scheme(), algorithm.digest(), tbs, &signature)
}

/// Represents an X.509 certificate.
#[derive(Debug, Clone)]
pub struct X509Certificate {
    raw: Vec<u8>,
    inner: Certificate,
}

impl X509Certificate {
    /// Parses a DER certificate. The structure is validated by `x509-cert`.
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let inner = Certificate::from_der(bytes)
            .map_err(|e| TrustKitError::CertificateError(e.to_string()))?;
        Ok(Self {
            raw: bytes.to_vec(),
            inner,
        })
    }

    /// Converts any certificate representation that can encode itself to
    /// DER by encoding and re-parsing it.
    pub fn from_external<T: Encode>(cert: &T) -> Result<Self> {
        Self::from_der(&cert.to_der()?)
    }

    pub fn from_pem(pem: &str) -> Result<Self> {
        Self::from_der(&crate::pem_utils::pem_to_der_with_label(
            pem,
            CERTIFICATE_PEM_LABEL,
        )?)
    }

    pub fn to_pem(&self) -> String {
        crate::pem_utils::der_to_pem(&self.raw, CERTIFICATE_PEM_LABEL)
    }

    pub fn inner(&self) -> &Certificate {
        &self.inner
    }

    /// The exact DER encoding.
    pub fn encoded(&self) -> &[u8] {
        &self.raw
    }

    pub fn serial_number(&self) -> BigInt {
        BigInt::from_signed_bytes_be(self.inner.tbs_certificate.serial_number.as_bytes())
    }

    /// The exact bytes of the `tbsCertificate` element.
    pub fn tbs_bytes(&self) -> Result<&[u8]> {
        Ok(split_signed(&self.raw)?.0)
    }

    /// The TBS fields after the optional `[0]` version: serial, signature,
    /// issuer, validity, subject, subjectPublicKeyInfo, ...
    fn tbs_field(&self, index: usize) -> Result<DerValue> {
        let fields = crate::der::decode(self.tbs_bytes()?)?.children()?;
        let offset = match fields.first() {
            Some(first) if first.is(tags::context(0, true)) => 1,
            _ => 0,
        };
        fields
            .into_iter()
            .nth(offset + index)
            .ok_or_else(|| TrustKitError::malformed("truncated TBSCertificate"))
    }

    pub fn issuer(&self) -> Result<X500Name> {
        X500Name::from_der_value(&self.tbs_field(2)?)
    }

    pub fn subject(&self) -> Result<X500Name> {
        X500Name::from_der_value(&self.tbs_field(4)?)
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_spki(&self.tbs_field(5)?)
    }

    fn validity_bound(&self, index: usize) -> Result<OffsetDateTime> {
        self.tbs_field(3)?
            .children()?
            .get(index)
            .ok_or_else(|| TrustKitError::malformed("truncated Validity"))?
            .time()
    }

    pub fn not_before(&self) -> Result<OffsetDateTime> {
        self.validity_bound(0)
    }

    pub fn not_after(&self) -> Result<OffsetDateTime> {
        self.validity_bound(1)
    }

    pub fn signature_algorithm_id(&self) -> Result<AlgorithmId> {
        Ok(split_signed(&self.raw)?.1)
    }

    /// Whether `issuer_key` produced this certificate's signature.
    pub fn verify_signature(&self, issuer_key: &PublicKey) -> Result<bool> {
        verify_signed(&self.raw, issuer_key)
    }

    /// Every extension, decoded through the extension registry.
    pub fn extensions(&self) -> Result<Vec<CertExtension>> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .map(|ext| CertExtension::decode(&Extension::from_x509(ext)))
            .collect()
    }

    fn find_extension<K: ExtensionKind>(&self) -> Result<Option<K>> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .map(Extension::from_x509)
            .find(|ext| ext.id() == &K::OID)
            .map(|ext| K::decode(ext.is_critical(), ext.value()))
            .transpose()
    }

    pub fn key_usage(&self) -> Result<Option<KeyUsage>> {
        self.find_extension()
    }

    /// Extracts certificate information into a `CertificationRequestInfo`,
    /// suitable for issuing a renewed certificate.
    pub fn to_cert_info(&self) -> Result<CertificationRequestInfo> {
        let usages = self
            .find_extension::<ExtendedKeyUsage>()?
            .map(|eku| {
                eku.usages()
                    .iter()
                    .filter_map(ExtendedKeyUsageOption::from_oid)
                    .collect()
            })
            .unwrap_or_default();

        let basic_constraints_oid = crate::der::known::BASIC_CONSTRAINTS;
        let is_ca = match self
            .inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .find(|ext| crate::der::ObjectIdentifier::from(&ext.extn_id) == basic_constraints_oid)
        {
            Some(ext) => {
                x509_cert::ext::pkix::BasicConstraints::from_der(ext.extn_value.as_bytes())?.ca
            }
            None => false,
        };

        Ok(CertificationRequestInfo {
            subject: DistinguishedName::from_x500_name(&self.subject()?),
            subject_public_key: self.public_key()?,
            usages,
            is_ca,
            extensions: Vec::new(),
        })
    }

    /// Creates a new self-signed certificate, valid for one year.
    pub fn new_self_signed(cert_info: &CertificationRequestInfo, key: &KeyPair) -> Result<Self> {
        // For self-signed certificates, the issuer is the same as the subject
        let self_issuer = SelfIssuer {
            name: &cert_info.subject,
            key,
        };
        self_issuer.issue(cert_info, Validity::for_days(365))
    }
}

impl DerEncode for X509Certificate {
    fn encode(&self, out: &mut DerEncoder) -> Result<()> {
        out.put_raw(&self.raw);
        Ok(())
    }
}

impl PartialEq for X509Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for X509Certificate {}

impl fmt::Display for X509Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[")?;
        match self.subject() {
            Ok(subject) => writeln!(f, "  Subject: {subject}")?,
            Err(e) => writeln!(f, "  Subject: <{e}>")?,
        }
        match self.issuer() {
            Ok(issuer) => writeln!(f, "  Issuer: {issuer}")?,
            Err(e) => writeln!(f, "  Issuer: <{e}>")?,
        }
        writeln!(f, "  SerialNumber: [ {:x} ]", self.serial_number())?;
        if let Ok(algorithm) = self.signature_algorithm_id() {
            writeln!(f, "  Algorithm: [{algorithm}]")?;
        }
        write!(f, "]")
    }
}

// Helper struct for self-signed certificates
struct SelfIssuer<'a> {
    name: &'a DistinguishedName,
    key: &'a KeyPair,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> Result<x509_cert::name::Name> {
        self.name.as_x509_name()
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }
}

/// A certificate together with the private key of its subject, able to
/// issue certificates and CRLs in that subject's name.
#[derive(Debug, Clone)]
pub struct CertificateWithPrivateKey {
    pub cert: X509Certificate,
    pub key: KeyPair,
}

impl Issuer for CertificateWithPrivateKey {
    fn issuer_name(&self) -> Result<x509_cert::name::Name> {
        // The name of the issuer is the subject of the certificate
        Ok(self.cert.inner.tbs_certificate.subject.clone())
    }

    fn signing_key(&self) -> &KeyPair {
        &self.key
    }
}

/// A certificate revocation list.
#[derive(Debug, Clone)]
pub struct X509Crl {
    raw: Vec<u8>,
    inner: CertificateList,
}

impl X509Crl {
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let inner = CertificateList::from_der(bytes)
            .map_err(|e| TrustKitError::CertificateError(e.to_string()))?;
        Ok(Self {
            raw: bytes.to_vec(),
            inner,
        })
    }

    pub fn from_external<T: Encode>(crl: &T) -> Result<Self> {
        Self::from_der(&crl.to_der()?)
    }

    pub fn inner(&self) -> &CertificateList {
        &self.inner
    }

    pub fn encoded(&self) -> &[u8] {
        &self.raw
    }

    pub fn issuer(&self) -> Result<X500Name> {
        let (tbs, _, _) = split_signed(&self.raw)?;
        let (fields, _) = DerInput::new(tbs).enter(tags::SEQUENCE)?;
        let fields = match fields.peek_byte() {
            Some(tags::INTEGER) => fields.read_value()?.1,
            _ => fields,
        };
        let (_, fields) = AlgorithmId::read(fields)?;
        let (issuer, _) = fields.read_expected(tags::SEQUENCE)?;
        X500Name::from_der_value(&issuer)
    }

    pub fn revoked_count(&self) -> usize {
        self.inner
            .tbs_cert_list
            .revoked_certificates
            .as_ref()
            .map_or(0, Vec::len)
    }

    /// Serial number and reason code of every revoked entry. Entries
    /// without a reason code extension report `None`.
    pub fn revoked(&self) -> Result<Vec<(BigInt, Option<CrlReason>)>> {
        self.inner
            .tbs_cert_list
            .revoked_certificates
            .iter()
            .flatten()
            .map(|entry| {
                let serial = BigInt::from_signed_bytes_be(entry.serial_number.as_bytes());
                let reason = entry
                    .crl_entry_extensions
                    .iter()
                    .flatten()
                    .map(Extension::from_x509)
                    .find(|ext| ext.id() == &CrlReasonCode::OID)
                    .map(|ext| CrlReasonCode::decode(ext.is_critical(), ext.value()))
                    .transpose()?
                    .map(|code| code.reason());
                Ok((serial, reason))
            })
            .collect()
    }

    pub fn verify_signature(&self, issuer_key: &PublicKey) -> Result<bool> {
        verify_signed(&self.raw, issuer_key)
    }
}

impl DerEncode for X509Crl {
    fn encode(&self, out: &mut DerEncoder) -> Result<()> {
        out.put_raw(&self.raw);
        Ok(())
    }
}

impl PartialEq for X509Crl {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for X509Crl {}

impl fmt::Display for X509Crl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "X.509 CRL v2")?;
        match self.issuer() {
            Ok(issuer) => writeln!(f, "Issuer: {issuer}")?,
            Err(e) => writeln!(f, "Issuer: <{e}>")?,
        }
        write!(f, "Revoked Certificates: {}", self.revoked_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::der::known;
    use extensions::KeyUsageBit;

    fn request(key: &KeyPair) -> CertificationRequestInfo {
        CertificationRequestInfo::builder()
            .subject(
                DistinguishedName::builder()
                    .common_name("Test Signer")
                    .organization("Trust Kit")
                    .build(),
            )
            .subject_public_key(key.public_key())
            .usages(vec![ExtendedKeyUsageOption::CodeSigning])
            .build()
    }

    #[test]
    fn test_self_signed_accessors() {
        let key = KeyPair::generate_ecdsa_p256();
        let cert = X509Certificate::new_self_signed(&request(&key), &key).unwrap();

        assert_eq!(cert.issuer().unwrap(), cert.subject().unwrap());
        assert_eq!(cert.subject().unwrap().common_name().as_deref(), Some("Test Signer"));
        assert_eq!(cert.public_key().unwrap(), key.public_key());
        assert_eq!(cert.serial_number().sign(), num_bigint::Sign::Plus);
        assert!(cert.verify_signature(&key.public_key()).unwrap());
        assert!(
            !cert
                .verify_signature(&KeyPair::generate_ecdsa_p256().public_key())
                .unwrap()
        );
        assert_eq!(
            cert.signature_algorithm_id().unwrap().oid(),
            &known::ECDSA_WITH_SHA256
        );
        assert!(cert.not_before().unwrap() < cert.not_after().unwrap());
    }

    #[test]
    fn test_tbs_bytes_are_exact() {
        let key = KeyPair::generate_ed25519();
        let cert = X509Certificate::new_self_signed(&request(&key), &key).unwrap();
        let expected = cert.inner().tbs_certificate.to_der().unwrap();
        assert_eq!(cert.tbs_bytes().unwrap(), expected.as_slice());
        assert_eq!(
            X509Certificate::from_external(cert.inner()).unwrap(),
            cert
        );
    }

    #[test]
    fn test_extensions_decoded() {
        let key = KeyPair::generate_ecdsa_p256();
        let cert = X509Certificate::new_self_signed(&request(&key), &key).unwrap();

        let key_usage = cert.key_usage().unwrap().unwrap();
        assert!(key_usage.has(KeyUsageBit::DigitalSignature));

        let extensions = cert.extensions().unwrap();
        assert!(extensions.iter().any(|e| matches!(e, CertExtension::ExtendedKeyUsage(_))));
        assert!(
            extensions
                .iter()
                .any(|e| matches!(e, CertExtension::SubjectKeyIdentifier(_)))
        );
        // BasicConstraints has no typed kind
        assert!(extensions.iter().any(|e| matches!(e, CertExtension::Unrecognized(_))));

        let info = cert.to_cert_info().unwrap();
        assert_eq!(info.usages, vec![ExtendedKeyUsageOption::CodeSigning]);
        assert!(!info.is_ca);
        assert_eq!(info.subject.organization.as_deref(), Some("Trust Kit"));
    }

    #[test]
    fn test_pem_round_trip() {
        let key = KeyPair::generate_ecdsa_p256();
        let cert = X509Certificate::new_self_signed(&request(&key), &key).unwrap();
        let pem = cert.to_pem();
        assert!(pem.starts_with("-----BEGIN CERTIFICATE-----"));
        assert_eq!(X509Certificate::from_pem(&pem).unwrap(), cert);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            X509Certificate::from_der(&[0x30, 0x00]),
            Err(TrustKitError::CertificateError(_))
        ));
    }
}
