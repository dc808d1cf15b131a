//! use trustkit::error::TrustKitError;

use thiserror::Error;

/// Represents errors that can occur in the TrustKit library.
///
/// A signature that simply does not match is never reported through this
/// type; verification drops the signer from its result set instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrustKitError {
    /// Tag/length mismatch, trailing bytes, or a typed accessor applied to the
    /// wrong tag.
    #[error("Malformed encoding: {0}")]
    MalformedEncoding(String),

    /// The content type is not one of the PKCS#7 grammars this crate parses.
    #[error("Unsupported content type: {0}")]
    UnsupportedGrammar(String),

    /// A named get/set/delete used a key the attribute set does not know.
    #[error("Attribute name [{name}] not recognized by CertAttrSet:{set}.")]
    UnknownAttribute { set: &'static str, name: String },

    /// The attribute set has no attributes at all.
    #[error("No attribute is allowed by CertAttrSet:{0}.")]
    NoAttributes(&'static str),

    /// Digest or signature algorithm not implemented.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The signature engine failed, or the signer's key may not sign.
    #[error("Signature error: {0}")]
    SignatureError(String),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during key generation.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// Error related to certificate operations.
    #[error("Certificate error: {0}")]
    CertificateError(String),

    /// Error from RSA operations.
    #[error("RSA error: {0}")]
    RsaError(String),
}

pub type Result<T> = std::result::Result<T, TrustKitError>;

impl TrustKitError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        TrustKitError::MalformedEncoding(msg.into())
    }
}

impl From<der::Error> for TrustKitError {
    /// Converts a `der::Error` into a `TrustKitError`.
    fn from(err: der::Error) -> Self {
        TrustKitError::MalformedEncoding(err.to_string())
    }
}

impl From<rsa::Error> for TrustKitError {
    fn from(err: rsa::Error) -> Self {
        TrustKitError::RsaError(err.to_string())
    }
}

impl From<rsa::pkcs1::Error> for TrustKitError {
    fn from(err: rsa::pkcs1::Error) -> Self {
        TrustKitError::RsaError(err.to_string())
    }
}

impl From<pkcs8::Error> for TrustKitError {
    fn from(err: pkcs8::Error) -> Self {
        TrustKitError::InvalidInput(err.to_string())
    }
}

impl From<pkcs8::spki::Error> for TrustKitError {
    fn from(err: pkcs8::spki::Error) -> Self {
        TrustKitError::InvalidInput(err.to_string())
    }
}

impl From<ecdsa::Error> for TrustKitError {
    fn from(err: ecdsa::Error) -> Self {
        TrustKitError::SignatureError(err.to_string())
    }
}

impl From<pem::PemError> for TrustKitError {
    fn from(err: pem::PemError) -> Self {
        TrustKitError::MalformedEncoding(err.to_string())
    }
}
