use der::Encode;
use num_bigint::BigInt;
use time::OffsetDateTime;
use x509_cert::certificate::CertificateInner;
use x509_cert::ext::pkix::BasicConstraints;
use x509_cert::name::Name;

use crate::cert::extensions::{
    CrlReason, CrlReasonCode, ExtendedKeyUsage, ExtendedKeyUsageOption, Extension, ExtensionKind,
    KeyUsage, KeyUsageBit, SubjectKeyIdentifier,
};
use crate::cert::params::{CertificationRequestInfo, Validity};
use crate::cert::{X509Certificate, X509Crl};
use crate::der::{DerEncode, DerEncoder, known, tags};
use crate::error::Result;
use crate::key::KeyPair;
use crate::tbs_certificate::{TbsCertificate, random_serial};

/// Represents an entity capable of issuing certificates and CRLs.
pub trait Issuer {
    /// Returns the distinguished name of the issuer.
    fn issuer_name(&self) -> Result<Name>;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// Issues a certificate based on the provided certification request information.
    ///
    /// The request's own extensions come first, followed by BasicConstraints,
    /// SubjectKeyIdentifier, KeyUsage derived from the CA flag and the
    /// extended usages, and ExtendedKeyUsage.
    fn issue(
        &self,
        cert_request: &CertificationRequestInfo,
        validity: Validity,
    ) -> Result<X509Certificate> {
        let key = self.signing_key();
        let signature_algorithm = key.signature_algorithm();

        let basic_constraints = BasicConstraints {
            ca: cert_request.is_ca,
            path_len_constraint: None,
        };
        let mut extensions = vec![
            Extension::new(known::BASIC_CONSTRAINTS, true, basic_constraints.to_der()?),
            SubjectKeyIdentifier::from_public_key(&cert_request.subject_public_key)?
                .to_extension()?,
        ];

        let mut key_usage_bits = Vec::new();
        if cert_request.is_ca {
            key_usage_bits.push(KeyUsageBit::KeyCertSign);
            key_usage_bits.push(KeyUsageBit::CrlSign);
        }
        for usage in &cert_request.usages {
            key_usage_bits.push(match usage {
                ExtendedKeyUsageOption::ClientAuth
                | ExtendedKeyUsageOption::ServerAuth
                | ExtendedKeyUsageOption::EmailProtection => KeyUsageBit::KeyEncipherment,
                ExtendedKeyUsageOption::CodeSigning
                | ExtendedKeyUsageOption::TimeStamping
                | ExtendedKeyUsageOption::OcspSigning => KeyUsageBit::DigitalSignature,
            });
        }
        if !key_usage_bits.is_empty() {
            extensions.push(KeyUsage::from_bits(&key_usage_bits).to_extension()?);
        }

        if !cert_request.usages.is_empty() {
            let extended_key_usage =
                ExtendedKeyUsage::from_options(&cert_request.usages).with_critical(true);
            extensions.push(extended_key_usage.to_extension()?);
        }

        let combined_extensions = cert_request
            .extensions
            .iter()
            .cloned()
            .chain(extensions)
            .collect();

        let tbs_cert = TbsCertificate {
            serial_number: random_serial(),
            signature_algorithm,
            issuer: self.issuer_name()?,
            not_before: validity.not_before,
            not_after: validity.not_after,
            subject: cert_request.subject.as_x509_name()?,
            subject_public_key: cert_request.subject_public_key.clone(),
            extensions: combined_extensions,
        };

        let tbs_cert_inner = tbs_cert.to_tbs_certificate_inner()?;
        let signature = key.sign(signature_algorithm.digest(), &tbs_cert_inner.to_der()?)?;

        let cert_inner = CertificateInner {
            tbs_certificate: tbs_cert_inner,
            signature_algorithm: signature_algorithm.to_x509()?,
            signature: der::asn1::BitString::from_bytes(&signature)?,
        };

        log::debug!(
            "issued certificate with serial {:x}",
            tbs_cert.serial_number
        );
        X509Certificate::from_external(&cert_inner)
    }

    /// Issues a version 2 CRL revoking `revoked` as of `this_update`.
    ///
    /// Every entry except those revoked for an unspecified reason carries a
    /// CRLReasonCode entry extension.
    fn issue_crl(
        &self,
        revoked: &[(BigInt, CrlReason)],
        this_update: OffsetDateTime,
        next_update: Option<OffsetDateTime>,
    ) -> Result<X509Crl> {
        let key = self.signing_key();
        let signature_algorithm = key.signature_algorithm();
        let algorithm_id = signature_algorithm.algorithm_id();

        let mut tbs = DerEncoder::new();
        tbs.put_u32(1);
        algorithm_id.encode(&mut tbs)?;
        tbs.put_raw(&self.issuer_name()?.to_der()?);
        put_crl_time(&mut tbs, this_update)?;
        if let Some(next_update) = next_update {
            put_crl_time(&mut tbs, next_update)?;
        }
        if !revoked.is_empty() {
            let mut entries = DerEncoder::new();
            for (serial, reason) in revoked {
                let mut entry = DerEncoder::new();
                entry.put_integer(serial);
                put_crl_time(&mut entry, this_update)?;
                if *reason != CrlReason::Unspecified {
                    let mut entry_extensions = DerEncoder::new();
                    CrlReasonCode::new(*reason)
                        .to_extension()?
                        .encode(&mut entry_extensions)?;
                    entry.write(tags::SEQUENCE, &entry_extensions);
                }
                entries.write(tags::SEQUENCE, &entry);
            }
            tbs.write(tags::SEQUENCE, &entries);
        }

        let mut tbs_der = DerEncoder::new();
        tbs_der.write(tags::SEQUENCE, &tbs);
        let signature = key.sign(signature_algorithm.digest(), tbs_der.as_bytes())?;

        let mut body = DerEncoder::new();
        body.put_raw(tbs_der.as_bytes());
        algorithm_id.encode(&mut body)?;
        body.put_bit_string(&signature);
        let mut out = DerEncoder::new();
        out.write(tags::SEQUENCE, &body);
        X509Crl::from_der(out.as_bytes())
    }
}

/// UTCTime through 2049, GeneralizedTime after.
fn put_crl_time(out: &mut DerEncoder, t: OffsetDateTime) -> Result<()> {
    if t.year() < 2050 {
        out.put_utc_time(t)
    } else {
        out.put_generalized_time(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::CertificateWithPrivateKey;
    use crate::cert::params::DistinguishedName;

    fn ca() -> CertificateWithPrivateKey {
        let key = KeyPair::generate_ecdsa_p256();
        let info = CertificationRequestInfo::builder()
            .subject(DistinguishedName::builder().common_name("Test CA").build())
            .subject_public_key(key.public_key())
            .is_ca(true)
            .build();
        let cert = X509Certificate::new_self_signed(&info, &key).unwrap();
        CertificateWithPrivateKey { cert, key }
    }

    #[test]
    fn test_ca_issues_leaf() {
        let ca = ca();
        let ca_usage = ca.cert.key_usage().unwrap().unwrap();
        assert!(ca_usage.has(KeyUsageBit::KeyCertSign));
        assert!(ca_usage.has(KeyUsageBit::CrlSign));

        let leaf_key = KeyPair::generate_ed25519();
        let request = CertificationRequestInfo::builder()
            .subject(DistinguishedName::builder().common_name("Leaf").build())
            .subject_public_key(leaf_key.public_key())
            .usages(vec![ExtendedKeyUsageOption::ServerAuth])
            .build();
        let leaf = ca.issue(&request, Validity::for_days(30)).unwrap();

        assert_eq!(leaf.issuer().unwrap(), ca.cert.subject().unwrap());
        assert!(leaf.verify_signature(&ca.key.public_key()).unwrap());
        assert_ne!(leaf.serial_number(), ca.cert.serial_number());
        let usage = leaf.key_usage().unwrap().unwrap();
        assert!(usage.has(KeyUsageBit::KeyEncipherment));
        assert!(!usage.has(KeyUsageBit::KeyCertSign));
    }

    #[test]
    fn test_issue_crl() {
        let ca = ca();
        let now = OffsetDateTime::now_utc();
        let crl = ca
            .issue_crl(
                &[
                    (BigInt::from(7), CrlReason::KeyCompromise),
                    (BigInt::from(9), CrlReason::Unspecified),
                ],
                now,
                Some(now + time::Duration::days(7)),
            )
            .unwrap();

        assert_eq!(crl.revoked_count(), 2);
        assert_eq!(crl.issuer().unwrap(), ca.cert.subject().unwrap());
        assert_eq!(
            crl.revoked().unwrap(),
            vec![
                (BigInt::from(7), Some(CrlReason::KeyCompromise)),
                (BigInt::from(9), None),
            ]
        );
        assert!(crl.verify_signature(&ca.key.public_key()).unwrap());
    }

    #[test]
    fn test_empty_crl_omits_revoked_list() {
        let ca = ca();
        let crl = ca.issue_crl(&[], OffsetDateTime::now_utc(), None).unwrap();
        assert_eq!(crl.revoked_count(), 0);
        assert!(crl.inner().tbs_cert_list.revoked_certificates.is_none());
    }
}
