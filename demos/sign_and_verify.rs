use trustkit::algorithm::DigestAlgorithm;
use trustkit::cert::CertificateWithPrivateKey;
use trustkit::cert::X509Certificate;
use trustkit::cert::extensions::ExtendedKeyUsageOption;
use trustkit::cert::params::{CertificationRequestInfo, DistinguishedName, Validity};
use trustkit::der::known;
use trustkit::error::TrustKitError;
use trustkit::issuer::Issuer;
use trustkit::key::KeyPair;
use trustkit::pkcs7::{ContentInfo, Pkcs7, SignerInfo, Verification};

fn main() -> Result<(), TrustKitError> {
    env_logger::init();

    // Self-signed CA
    let ca_key = KeyPair::generate_ecdsa_p256();
    let ca_info = CertificationRequestInfo::builder()
        .subject(
            DistinguishedName::builder()
                .common_name("My Test CA")
                .build(),
        )
        .subject_public_key(ca_key.public_key())
        .is_ca(true)
        .build();
    let ca = CertificateWithPrivateKey {
        cert: X509Certificate::new_self_signed(&ca_info, &ca_key)?,
        key: ca_key,
    };

    // Code signing certificate issued by the CA
    let signer_key = KeyPair::generate_ed25519();
    let signer_info = CertificationRequestInfo::builder()
        .subject(
            DistinguishedName::builder()
                .common_name("Release Signer")
                .organization("Example Corp")
                .build(),
        )
        .subject_public_key(signer_key.public_key())
        .usages(vec![ExtendedKeyUsageOption::CodeSigning])
        .build();
    let signer_cert = ca.issue(&signer_info, Validity::for_days(825))?;

    let content = b"release-1.0.tar.gz digest list";
    let signer = SignerInfo::sign(
        &signer_key,
        &signer_cert,
        DigestAlgorithm::Sha512,
        &known::DATA,
        content,
        true,
    )?;
    let pkcs7 = Pkcs7::new(
        vec![DigestAlgorithm::Sha512.algorithm_id()],
        ContentInfo::data(content),
        vec![signer_cert, ca.cert.clone()],
        vec![],
        vec![signer],
    );

    let pem = pkcs7.to_pem()?;
    println!("{pem}");

    let decoded = Pkcs7::from_pem(&pem)?;
    println!("{decoded}");
    match decoded.verify(None)? {
        Verification::Verified(signers) => {
            for signer in signers {
                println!("verified signer: {}", signer.issuer_name());
            }
        }
        Verification::NoSignerVerified => println!("no signer verified"),
    }
    Ok(())
}
