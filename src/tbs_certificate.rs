use der::Encode;
use num_bigint::BigInt;
use time::OffsetDateTime;
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;

use crate::algorithm::{AlgorithmId, SignatureAlgorithm};
use crate::cert::extensions::Extension;
use crate::error::{Result, TrustKitError};
use crate::key::PublicKey;

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
/// This struct contains all the fields required to generate a valid X.509 certificate.
///
/// # Fields
/// * `serial_number` - The unique identifier for the certificate.
/// * `signature_algorithm` - The algorithm used to sign the certificate.
/// * `issuer` - The distinguished name of the certificate issuer.
/// * `not_before` - The start of the certificate's validity period.
/// * `not_after` - The end of the certificate's validity period.
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `extensions` - Additional X.509 extensions for the certificate.
#[derive(Debug, Clone)]
pub struct TbsCertificate {
    pub serial_number: BigInt,
    pub signature_algorithm: SignatureAlgorithm,
    pub issuer: Name,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
    pub subject: Name,
    pub subject_public_key: PublicKey,
    pub extensions: Vec<Extension>,
}

/// A random positive 63-bit serial number.
pub fn random_serial() -> BigInt {
    loop {
        let value = rand::random::<u64>() >> 1;
        if value != 0 {
            return BigInt::from(value);
        }
    }
}

fn to_x509_time(t: OffsetDateTime) -> Result<x509_cert::time::Time> {
    Ok(x509_cert::time::Time::UtcTime(
        der::asn1::UtcTime::from_system_time(t.into())?,
    ))
}

fn from_x509_time(t: &x509_cert::time::Time) -> OffsetDateTime {
    match t {
        x509_cert::time::Time::UtcTime(ut) => OffsetDateTime::from(ut.to_system_time()),
        x509_cert::time::Time::GeneralTime(gt) => OffsetDateTime::from(gt.to_system_time()),
    }
}

impl TbsCertificate {
    /// Creates a new `TbsCertificate` with a random serial number, valid
    /// for one year from now.
    pub fn new(
        issuer: Name,
        subject: Name,
        subject_public_key: PublicKey,
        signature_algorithm: SignatureAlgorithm,
        extensions: Vec<Extension>,
    ) -> Self {
        let not_before = OffsetDateTime::now_utc();
        let not_after = not_before + time::Duration::days(365);

        Self {
            serial_number: random_serial(),
            signature_algorithm,
            issuer,
            not_before,
            not_after,
            subject,
            subject_public_key,
            extensions,
        }
    }

    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        let extensions = self
            .extensions
            .iter()
            .map(Extension::to_x509)
            .collect::<Result<Vec<_>>>()?;

        let validity = x509_cert::time::Validity {
            not_before: to_x509_time(self.not_before)?,
            not_after: to_x509_time(self.not_after)?,
        };

        let serial_number = SerialNumber::new(&self.serial_number.to_signed_bytes_be())?;

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number,
            signature: self.signature_algorithm.to_x509()?,
            issuer: self.issuer.clone(),
            validity,
            subject: self.subject.clone(),
            subject_public_key_info: self.subject_public_key.to_x509_spki()?,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: (!extensions.is_empty()).then_some(extensions),
        })
    }

    /// Creates a `TbsCertificate` from a `TbsCertificateInner`.
    pub fn from_tbs_certificate_inner(inner: &TbsCertificateInner) -> Result<Self> {
        let signature = AlgorithmId::parse(&crate::der::decode(&inner.signature.to_der()?)?)?;
        let signature_algorithm = SignatureAlgorithm::from_algorithm_id(&signature)?;

        let serial_number = BigInt::from_signed_bytes_be(inner.serial_number.as_bytes());
        if serial_number.sign() != num_bigint::Sign::Plus {
            return Err(TrustKitError::CertificateError(format!(
                "serial number {serial_number} is not positive"
            )));
        }

        Ok(Self {
            serial_number,
            signature_algorithm,
            issuer: inner.issuer.clone(),
            not_before: from_x509_time(&inner.validity.not_before),
            not_after: from_x509_time(&inner.validity.not_after),
            subject: inner.subject.clone(),
            subject_public_key: PublicKey::from_x509_spki(&inner.subject_public_key_info)?,
            extensions: inner
                .extensions
                .iter()
                .flatten()
                .map(Extension::from_x509)
                .collect(),
        })
    }

    /// Encodes the `TbsCertificate` into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.to_tbs_certificate_inner()?.to_der()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::params::DistinguishedName;
    use crate::key::KeyPair;

    #[test]
    fn test_random_serial_is_positive() {
        for _ in 0..32 {
            let serial = random_serial();
            assert_eq!(serial.sign(), num_bigint::Sign::Plus);
            assert!(serial.to_signed_bytes_be().len() <= 8);
        }
    }

    #[test]
    fn test_inner_conversion_keeps_fields() {
        let key = KeyPair::generate_ecdsa_p256();
        let name = DistinguishedName::builder()
            .common_name("tbs")
            .build()
            .as_x509_name()
            .unwrap();
        let tbs = TbsCertificate::new(
            name.clone(),
            name,
            key.public_key(),
            key.signature_algorithm(),
            vec![],
        );
        let inner = tbs.to_tbs_certificate_inner().unwrap();
        assert!(inner.extensions.is_none());

        let back = TbsCertificate::from_tbs_certificate_inner(&inner).unwrap();
        assert_eq!(back.serial_number, tbs.serial_number);
        assert_eq!(back.signature_algorithm, SignatureAlgorithm::Sha256WithEcdsa);
        assert_eq!(back.subject_public_key, key.public_key());
        assert_eq!(back.not_after.unix_timestamp(), tbs.not_after.unix_timestamp());
    }
}
