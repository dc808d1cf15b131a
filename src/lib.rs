//! # TrustKit - PKCS#7 Signed Data and X.509 Trust Primitives in Pure Rust
//!
//! TrustKit is the binary trust-data layer of a certificate management tool,
//! built on rustcrypto libraries. It provides a canonical ASN.1 DER codec,
//! an extensible model for X.509v3 certificate extensions, and PKCS#7
//! `SignedData` construction, parsing and multi-signer verification.
//!
//! ## Supported Key Types
//!
//! - **RSA**: PKCS#1 v1.5 signatures with SHA-1 and the SHA-2 family
//! - **ECDSA**: P-256 and P-384 curves
//! - **Ed25519**: Edwards curve digital signature algorithm
//!
//! DSA public keys are recognized in certificates, but DSA signatures
//! cannot be verified.
//!
//! ## Key Features
//!
//! - **Canonical DER**: strict decoding with a checkpoint/rewind cursor and
//!   encoding with DER `SET OF` ordering
//! - **PKCS#7 SignedData**: both the current and the legacy wire grammar are
//!   decoded; encoding always produces the current one
//! - **Signer Verification**: per-signer verification with or without
//!   authenticated attributes, over enclosed or detached content
//! - **X.509 Extensions**: typed extension kinds with a named attribute
//!   accessor for tooling
//! - **Certificate Generation**: self-signed and CA-issued certificates and
//!   CRLs for tests and keytool-style flows
//!
//! ## Quick Start
//!
//! ### Signing and Verifying Content
//!
//! ```rust,no_run
//! use trustkit::{
//!     algorithm::DigestAlgorithm,
//!     cert::{X509Certificate, params::{CertificationRequestInfo, DistinguishedName}},
//!     der::known,
//!     key::KeyPair,
//!     pkcs7::{ContentInfo, Pkcs7, SignerInfo, Verification},
//! };
//!
//! # fn main() -> Result<(), trustkit::error::TrustKitError> {
//! let key = KeyPair::generate_rsa(2048)?;
//! let subject = DistinguishedName::builder()
//!     .common_name("Example Signer")
//!     .organization("Example Corp")
//!     .build();
//! let cert_info = CertificationRequestInfo::builder()
//!     .subject(subject)
//!     .subject_public_key(key.public_key())
//!     .build();
//! let cert = X509Certificate::new_self_signed(&cert_info, &key)?;
//!
//! let content = b"signed content";
//! let signer = SignerInfo::sign(&key, &cert, DigestAlgorithm::Sha256, &known::DATA, content, true)?;
//! let pkcs7 = Pkcs7::new(
//!     vec![DigestAlgorithm::Sha256.algorithm_id()],
//!     ContentInfo::data(content),
//!     vec![cert],
//!     vec![],
//!     vec![signer],
//! );
//!
//! let decoded = Pkcs7::from_der(&pkcs7.to_der()?)?;
//! match decoded.verify(None)? {
//!     Verification::Verified(signers) => println!("{} signer(s) verified", signers.len()),
//!     Verification::NoSignerVerified => println!("no signer verified"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Inspecting Certificate Extensions
//!
//! ```rust,no_run
//! use trustkit::cert::X509Certificate;
//! use trustkit::cert::extensions::{CertAttrSet, KeyUsageBit};
//!
//! # fn main() -> Result<(), trustkit::error::TrustKitError> {
//! # let pem = "";
//! let cert = X509Certificate::from_pem(pem)?;
//! for extension in cert.extensions()? {
//!     println!("{extension}");
//! }
//! if let Some(mut key_usage) = cert.key_usage()? {
//!     println!("digital signature: {}", key_usage.has(KeyUsageBit::DigitalSignature));
//!     key_usage.set("non_repudiation", true.into())?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`error::TrustKitError`]. A signature that
//! does not match is not an error: the signer is left out of the
//! verification result.
//!
//! ```rust
//! use trustkit::{error::TrustKitError, pkcs7::Pkcs7};
//!
//! match Pkcs7::from_der(&[0x30, 0x00]) {
//!     Ok(_) => println!("decoded"),
//!     Err(TrustKitError::MalformedEncoding(msg)) => println!("malformed: {}", msg),
//!     Err(TrustKitError::UnsupportedGrammar(msg)) => println!("unsupported: {}", msg),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`der`]: DER values, decoding cursor, encoder and distinguished names
//! - [`algorithm`]: Algorithm identifiers, digests and signature schemes
//! - [`key`]: Key generation, import/export, signing and verification
//! - [`cert`]: Certificate and CRL wrappers, generation parameters and extensions
//! - [`issuer`]: Certificate and CRL issuing
//! - [`pkcs7`]: PKCS#7 SignedData
//! - [`error`]: Error types
//! - [`tbs_certificate`]: Low-level certificate structure manipulation
//! - [`pem_utils`]: PEM armor helpers

pub mod algorithm;
pub mod cert;
pub mod der;
pub mod error;
pub mod issuer;
pub mod key;
pub mod pem_utils;
pub mod pkcs7;
pub mod tbs_certificate;
