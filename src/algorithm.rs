//! Algorithm identifiers and the digest/signature algorithms behind them.

use std::fmt;

use num_bigint::BigInt;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use crate::der::{
    DecoderConfig, DerEncode, DerEncoder, DerInput, DerValue, ObjectIdentifier, known, tags,
};
use crate::error::{Result, TrustKitError};

/// An `AlgorithmIdentifier`: an OID and optional, opaque parameters.
///
/// Absent parameters and an explicit NULL are distinct values. Equality is
/// structural, with no normalization of the parameter bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlgorithmId {
    oid: ObjectIdentifier,
    params: Option<DerValue>,
}

impl AlgorithmId {
    /// An identifier with absent parameters.
    pub fn new(oid: ObjectIdentifier) -> Self {
        Self { oid, params: None }
    }

    pub fn with_params(oid: ObjectIdentifier, params: DerValue) -> Self {
        Self {
            oid,
            params: Some(params),
        }
    }

    /// An identifier with explicit NULL parameters.
    pub fn with_null_params(oid: ObjectIdentifier) -> Self {
        Self::with_params(oid, DerValue::new(tags::NULL, Vec::new()))
    }

    pub fn oid(&self) -> &ObjectIdentifier {
        &self.oid
    }

    pub fn parameters(&self) -> Option<&DerValue> {
        self.params.as_ref()
    }

    /// Parse `SEQUENCE { algorithm OBJECT IDENTIFIER, parameters ANY OPTIONAL }`.
    pub fn parse(value: &DerValue) -> Result<Self> {
        Self::parse_with(value, &DecoderConfig::DEFAULT)
    }

    fn parse_with(value: &DerValue, config: &DecoderConfig) -> Result<Self> {
        if !value.is(tags::SEQUENCE) {
            return Err(TrustKitError::malformed("algorithm id is not a SEQUENCE"));
        }
        let input = value.content_input_with(config);
        let (oid, input) = input.read_oid()?;
        let (params, input) = if input.is_empty() {
            (None, input)
        } else {
            let (params, input) = input.read_value()?;
            if params.is(tags::NULL) {
                params.null()?;
            }
            (Some(params), input)
        };
        input.finish()?;
        Ok(Self { oid, params })
    }

    /// Read one algorithm id from `input`.
    pub fn read(input: DerInput<'_>) -> Result<(Self, DerInput<'_>)> {
        let (value, input) = input.read_expected(tags::SEQUENCE)?;
        Ok((Self::parse_with(&value, input.config())?, input))
    }

    /// Standard name for well-known algorithms, else the dotted OID.
    pub fn name(&self) -> String {
        standard_name(&self.oid)
            .map(str::to_string)
            .unwrap_or_else(|| self.oid.to_string())
    }
}

impl DerEncode for AlgorithmId {
    fn encode(&self, out: &mut DerEncoder) -> Result<()> {
        let mut body = DerEncoder::new();
        body.put_oid(&self.oid);
        if let Some(params) = &self.params {
            body.put_der_value(params);
        }
        out.write(tags::SEQUENCE, &body);
        Ok(())
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

fn standard_name(oid: &ObjectIdentifier) -> Option<&'static str> {
    let names = [
        (known::MD2, "MD2"),
        (known::MD5, "MD5"),
        (known::SHA1, "SHA-1"),
        (known::SHA224, "SHA-224"),
        (known::SHA256, "SHA-256"),
        (known::SHA384, "SHA-384"),
        (known::SHA512, "SHA-512"),
        (known::RSA_ENCRYPTION, "RSA"),
        (known::EC_PUBLIC_KEY, "EC"),
        (known::DSA, "DSA"),
        (known::ED25519, "Ed25519"),
        (known::MD2_WITH_RSA, "MD2withRSA"),
        (known::MD5_WITH_RSA, "MD5withRSA"),
        (known::SHA1_WITH_RSA, "SHA1withRSA"),
        (known::SHA224_WITH_RSA, "SHA224withRSA"),
        (known::SHA256_WITH_RSA, "SHA256withRSA"),
        (known::SHA384_WITH_RSA, "SHA384withRSA"),
        (known::SHA512_WITH_RSA, "SHA512withRSA"),
        (known::ECDSA_WITH_SHA1, "SHA1withECDSA"),
        (known::ECDSA_WITH_SHA224, "SHA224withECDSA"),
        (known::ECDSA_WITH_SHA256, "SHA256withECDSA"),
        (known::ECDSA_WITH_SHA384, "SHA384withECDSA"),
        (known::ECDSA_WITH_SHA512, "SHA512withECDSA"),
        (known::DSA_WITH_SHA1, "SHA1withDSA"),
        (known::DSA_WITH_SHA224, "SHA224withDSA"),
        (known::DSA_WITH_SHA256, "SHA256withDSA"),
    ];
    names
        .into_iter()
        .find(|(known, _)| known == oid)
        .map(|(_, name)| name)
}

/// DSA domain parameters carried in a DSA algorithm id:
/// `Dss-Parms ::= SEQUENCE { p INTEGER, q INTEGER, g INTEGER }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsaParameters {
    pub p: BigInt,
    pub q: BigInt,
    pub g: BigInt,
}

impl DsaParameters {
    pub fn new(p: BigInt, q: BigInt, g: BigInt) -> Self {
        Self { p, q, g }
    }

    /// Decode the parameters of a DSA algorithm id.
    pub fn from_algorithm_id(alg: &AlgorithmId) -> Result<Self> {
        if alg.oid() != &known::DSA {
            return Err(TrustKitError::UnsupportedAlgorithm(format!(
                "{} is not a DSA algorithm id",
                alg.name()
            )));
        }
        let params = alg
            .parameters()
            .ok_or_else(|| TrustKitError::malformed("DSA algorithm id without parameters"))?;
        Self::parse(params)
    }

    pub fn parse(value: &DerValue) -> Result<Self> {
        if !value.is(tags::SEQUENCE) {
            return Err(TrustKitError::malformed("DSA parameters are not a SEQUENCE"));
        }
        let input = value.content_input();
        let (p, input) = input.read_expected(tags::INTEGER)?;
        let (q, input) = input.read_expected(tags::INTEGER)?;
        let (g, input) = input.read_expected(tags::INTEGER)?;
        input.finish()?;
        Ok(Self {
            p: p.positive_integer()?,
            q: q.positive_integer()?,
            g: g.positive_integer()?,
        })
    }

    pub fn to_der_value(&self) -> DerValue {
        let mut body = DerEncoder::new();
        body.put_integer(&self.p);
        body.put_integer(&self.q);
        body.put_integer(&self.g);
        DerValue::new(tags::SEQUENCE, body.into_bytes())
    }

    pub fn to_algorithm_id(&self) -> AlgorithmId {
        AlgorithmId::with_params(known::DSA, self.to_der_value())
    }
}

impl fmt::Display for DsaParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DSA")?;
        writeln!(f, "\tp: {:x}", self.p)?;
        writeln!(f, "\tq: {:x}", self.q)?;
        writeln!(f, "\tg: {:x}", self.g)
    }
}

/// Message digest algorithms usable for signer digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            DigestAlgorithm::Sha1 => known::SHA1,
            DigestAlgorithm::Sha224 => known::SHA224,
            DigestAlgorithm::Sha256 => known::SHA256,
            DigestAlgorithm::Sha384 => known::SHA384,
            DigestAlgorithm::Sha512 => known::SHA512,
        }
    }

    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        [
            DigestAlgorithm::Sha1,
            DigestAlgorithm::Sha224,
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha384,
            DigestAlgorithm::Sha512,
        ]
        .into_iter()
        .find(|digest| &digest.oid() == oid)
        .ok_or_else(|| {
            TrustKitError::UnsupportedAlgorithm(format!(
                "{} digest",
                standard_name(oid).map_or_else(|| oid.to_string(), str::to_string)
            ))
        })
    }

    pub fn from_algorithm_id(alg: &AlgorithmId) -> Result<Self> {
        Self::from_oid(alg.oid())
    }

    /// The algorithm id with explicit NULL parameters.
    pub fn algorithm_id(&self) -> AlgorithmId {
        AlgorithmId::with_null_params(self.oid())
    }

    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "SHA-1",
            DigestAlgorithm::Sha224 => "SHA-224",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }

    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            DigestAlgorithm::Sha224 => Sha224::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            DigestAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            DigestAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

/// The signature primitive named by a signer's digest-encryption algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureScheme {
    RsaPkcs1v15,
    Ecdsa,
    Ed25519,
    Dsa,
}

impl SignatureScheme {
    /// Resolve the scheme from either a key algorithm id (`rsaEncryption`,
    /// `id-ecPublicKey`) or a full signature algorithm id
    /// (`sha256WithRSAEncryption`, `ecdsa-with-SHA256`); producers use both.
    pub fn from_algorithm_id(alg: &AlgorithmId) -> Result<Self> {
        let oid = alg.oid();
        let is = |candidates: &[ObjectIdentifier]| candidates.contains(oid);
        if is(&[
            known::RSA_ENCRYPTION,
            known::MD2_WITH_RSA,
            known::MD5_WITH_RSA,
            known::SHA1_WITH_RSA,
            known::SHA224_WITH_RSA,
            known::SHA256_WITH_RSA,
            known::SHA384_WITH_RSA,
            known::SHA512_WITH_RSA,
        ]) {
            Ok(SignatureScheme::RsaPkcs1v15)
        } else if is(&[
            known::EC_PUBLIC_KEY,
            known::ECDSA_WITH_SHA1,
            known::ECDSA_WITH_SHA224,
            known::ECDSA_WITH_SHA256,
            known::ECDSA_WITH_SHA384,
            known::ECDSA_WITH_SHA512,
        ]) {
            Ok(SignatureScheme::Ecdsa)
        } else if is(&[known::ED25519]) {
            Ok(SignatureScheme::Ed25519)
        } else if is(&[
            known::DSA,
            known::DSA_WITH_SHA1,
            known::DSA_WITH_SHA224,
            known::DSA_WITH_SHA256,
        ]) {
            Ok(SignatureScheme::Dsa)
        } else {
            Err(TrustKitError::UnsupportedAlgorithm(format!(
                "signature algorithm {}",
                alg.name()
            )))
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SignatureScheme::RsaPkcs1v15 => "RSA",
            SignatureScheme::Ecdsa => "ECDSA",
            SignatureScheme::Ed25519 => "Ed25519",
            SignatureScheme::Dsa => "DSA",
        }
    }
}

/// Represents the supported signature algorithms for certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption.
    Sha256WithRsa,
    /// SHA-384 with RSA encryption.
    Sha384WithRsa,
    /// SHA-512 with RSA encryption.
    Sha512WithRsa,
    /// SHA-256 with ECDSA.
    Sha256WithEcdsa,
    /// SHA-384 with ECDSA.
    Sha384WithEcdsa,
    /// SHA-512 with ECDSA.
    Sha512WithEcdsa,
    /// Pure Ed25519.
    Ed25519,
}

impl SignatureAlgorithm {
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            SignatureAlgorithm::Sha256WithRsa => known::SHA256_WITH_RSA,
            SignatureAlgorithm::Sha384WithRsa => known::SHA384_WITH_RSA,
            SignatureAlgorithm::Sha512WithRsa => known::SHA512_WITH_RSA,
            SignatureAlgorithm::Sha256WithEcdsa => known::ECDSA_WITH_SHA256,
            SignatureAlgorithm::Sha384WithEcdsa => known::ECDSA_WITH_SHA384,
            SignatureAlgorithm::Sha512WithEcdsa => known::ECDSA_WITH_SHA512,
            SignatureAlgorithm::Ed25519 => known::ED25519,
        }
    }

    /// RSA algorithm ids carry NULL parameters, the others none.
    pub fn algorithm_id(&self) -> AlgorithmId {
        match self.scheme() {
            SignatureScheme::RsaPkcs1v15 => AlgorithmId::with_null_params(self.oid()),
            _ => AlgorithmId::new(self.oid()),
        }
    }

    pub fn from_algorithm_id(alg: &AlgorithmId) -> Result<Self> {
        [
            SignatureAlgorithm::Sha256WithRsa,
            SignatureAlgorithm::Sha384WithRsa,
            SignatureAlgorithm::Sha512WithRsa,
            SignatureAlgorithm::Sha256WithEcdsa,
            SignatureAlgorithm::Sha384WithEcdsa,
            SignatureAlgorithm::Sha512WithEcdsa,
            SignatureAlgorithm::Ed25519,
        ]
        .into_iter()
        .find(|sig| &sig.oid() == alg.oid())
        .ok_or_else(|| {
            TrustKitError::UnsupportedAlgorithm(format!("signature algorithm {}", alg.name()))
        })
    }

    /// Digest applied to the message; Ed25519 hashes internally with SHA-512.
    pub fn digest(&self) -> DigestAlgorithm {
        match self {
            SignatureAlgorithm::Sha256WithRsa | SignatureAlgorithm::Sha256WithEcdsa => {
                DigestAlgorithm::Sha256
            }
            SignatureAlgorithm::Sha384WithRsa | SignatureAlgorithm::Sha384WithEcdsa => {
                DigestAlgorithm::Sha384
            }
            SignatureAlgorithm::Sha512WithRsa
            | SignatureAlgorithm::Sha512WithEcdsa
            | SignatureAlgorithm::Ed25519 => DigestAlgorithm::Sha512,
        }
    }

    pub fn scheme(&self) -> SignatureScheme {
        match self {
            SignatureAlgorithm::Sha256WithRsa
            | SignatureAlgorithm::Sha384WithRsa
            | SignatureAlgorithm::Sha512WithRsa => SignatureScheme::RsaPkcs1v15,
            SignatureAlgorithm::Sha256WithEcdsa
            | SignatureAlgorithm::Sha384WithEcdsa
            | SignatureAlgorithm::Sha512WithEcdsa => SignatureScheme::Ecdsa,
            SignatureAlgorithm::Ed25519 => SignatureScheme::Ed25519,
        }
    }

    /// Converts to `x509-cert`'s `AlgorithmIdentifierOwned`.
    pub fn to_x509(&self) -> Result<x509_cert::spki::AlgorithmIdentifierOwned> {
        let encoded = self.algorithm_id().to_der()?;
        Ok(<x509_cert::spki::AlgorithmIdentifierOwned as der::Decode>::from_der(&encoded)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::der::decode;

    #[test]
    fn test_null_and_absent_params_are_distinct() {
        let with_null = AlgorithmId::with_null_params(known::SHA256);
        let absent = AlgorithmId::new(known::SHA256);
        assert_ne!(with_null, absent);

        let encoded = with_null.to_der().unwrap();
        assert_eq!(
            encoded,
            vec![
                0x30, 0x0D, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01,
                0x05, 0x00
            ]
        );
        let parsed = AlgorithmId::parse(&decode(&encoded).unwrap()).unwrap();
        assert_eq!(parsed, with_null);

        let parsed = AlgorithmId::parse(&decode(&absent.to_der().unwrap()).unwrap()).unwrap();
        assert!(parsed.parameters().is_none());
        assert_eq!(parsed.name(), "SHA-256");
    }

    #[test]
    fn test_trailing_data_in_algorithm_id() {
        // SEQUENCE { OID sha1, NULL, NULL }
        let data = [
            0x30, 0x0B, 0x06, 0x05, 0x2B, 0x0E, 0x03, 0x02, 0x1A, 0x05, 0x00, 0x05, 0x00,
        ];
        assert!(AlgorithmId::parse(&decode(&data).unwrap()).is_err());
    }

    #[test]
    fn test_dsa_parameters() {
        let params = DsaParameters::new(BigInt::from(23), BigInt::from(11), BigInt::from(4));
        let alg = params.to_algorithm_id();
        let encoded = alg.to_der().unwrap();
        let parsed = AlgorithmId::parse(&decode(&encoded).unwrap()).unwrap();
        assert_eq!(DsaParameters::from_algorithm_id(&parsed).unwrap(), params);
        assert_eq!(parsed.name(), "DSA");

        // Extra INTEGER after g
        let mut body = DerEncoder::new();
        for n in [23, 11, 4, 1] {
            body.put_u32(n);
        }
        let bad = DerValue::new(tags::SEQUENCE, body.into_bytes());
        assert!(matches!(
            DsaParameters::parse(&bad),
            Err(TrustKitError::MalformedEncoding(_))
        ));
        let not_seq = AlgorithmId::with_null_params(known::DSA);
        assert!(DsaParameters::from_algorithm_id(&not_seq).is_err());
    }

    #[test]
    fn test_digests() {
        assert_eq!(
            hex::encode(DigestAlgorithm::Sha256.digest(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(DigestAlgorithm::Sha1.digest(b"abc").len(), 20);
        assert_eq!(
            DigestAlgorithm::from_oid(&known::SHA384).unwrap(),
            DigestAlgorithm::Sha384
        );
        assert!(matches!(
            DigestAlgorithm::from_oid(&known::MD5),
            Err(TrustKitError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_scheme_from_key_or_signature_oid() {
        let rsa = AlgorithmId::with_null_params(known::RSA_ENCRYPTION);
        let sha256_rsa = SignatureAlgorithm::Sha256WithRsa.algorithm_id();
        assert_eq!(
            SignatureScheme::from_algorithm_id(&rsa).unwrap(),
            SignatureScheme::RsaPkcs1v15
        );
        assert_eq!(
            SignatureScheme::from_algorithm_id(&sha256_rsa).unwrap(),
            SignatureScheme::RsaPkcs1v15
        );
        assert_eq!(
            SignatureScheme::from_algorithm_id(&AlgorithmId::new(known::EC_PUBLIC_KEY)).unwrap(),
            SignatureScheme::Ecdsa
        );
        assert!(SignatureScheme::from_algorithm_id(&AlgorithmId::new(known::SHA1)).is_err());
    }

    #[test]
    fn test_signature_algorithm_to_x509() {
        let alg = SignatureAlgorithm::Sha256WithEcdsa.to_x509().unwrap();
        assert_eq!(alg.oid, const_oid::db::rfc5912::ECDSA_WITH_SHA_256);
        assert!(alg.parameters.is_none());
        let alg = SignatureAlgorithm::Sha256WithRsa.to_x509().unwrap();
        assert!(alg.parameters.is_some());
    }
}
