#![allow(dead_code)]

use std::sync::OnceLock;

use trustkit::cert::extensions::ExtendedKeyUsageOption;
use trustkit::cert::params::{CertificationRequestInfo, DistinguishedName};
use trustkit::cert::{CertificateWithPrivateKey, X509Certificate};
use trustkit::key::{KeyPair, PublicKey};

pub fn init_logging() {
    env_logger::builder().is_test(true).try_init().ok();
}

pub fn generate_ca_cert() -> CertificateWithPrivateKey {
    let ca_key = KeyPair::generate_ecdsa_p256();

    let subject_dn = DistinguishedName::builder()
        .common_name("myca.local")
        .build();

    let subject_public_key = PublicKey::from_key_pair(&ca_key);

    let ca_cert_info = CertificationRequestInfo::builder()
        .subject(subject_dn)
        .subject_public_key(subject_public_key)
        .usages(vec![
            ExtendedKeyUsageOption::ServerAuth,
            ExtendedKeyUsageOption::ClientAuth,
        ])
        .is_ca(true)
        .build();

    CertificateWithPrivateKey {
        cert: X509Certificate::new_self_signed(&ca_cert_info, &ca_key).unwrap(),
        key: ca_key,
    }
}

/// A self-signed certificate without a key usage extension.
pub fn self_signed(common_name: &str, key: KeyPair) -> CertificateWithPrivateKey {
    let info = CertificationRequestInfo::builder()
        .subject(DistinguishedName::builder().common_name(common_name).build())
        .subject_public_key(key.public_key())
        .build();
    CertificateWithPrivateKey {
        cert: X509Certificate::new_self_signed(&info, &key).unwrap(),
        key,
    }
}

/// A code signing certificate, which carries digitalSignature.
pub fn code_signer(common_name: &str, key: KeyPair) -> CertificateWithPrivateKey {
    let info = CertificationRequestInfo::builder()
        .subject(DistinguishedName::builder().common_name(common_name).build())
        .subject_public_key(key.public_key())
        .usages(vec![ExtendedKeyUsageOption::CodeSigning])
        .build();
    CertificateWithPrivateKey {
        cert: X509Certificate::new_self_signed(&info, &key).unwrap(),
        key,
    }
}

/// RSA key generation is slow, so one RSA signer is shared per test binary.
pub fn rsa_signer() -> &'static CertificateWithPrivateKey {
    static SIGNER: OnceLock<CertificateWithPrivateKey> = OnceLock::new();
    SIGNER.get_or_init(|| self_signed("RSA Signer", KeyPair::generate_rsa(2048).unwrap()))
}
