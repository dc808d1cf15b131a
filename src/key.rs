use ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use ed25519_dalek::{Signer, SigningKey as Ed25519SigningKey, Verifier};
use num_bigint::BigInt;
use p256::ecdsa::{SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};
use p384::ecdsa::{SigningKey as P384SigningKey, VerifyingKey as P384VerifyingKey};
use pkcs8::{DecodePrivateKey, EncodePrivateKey};
use rsa::{
    Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey,
    pkcs1::{DecodeRsaPublicKey, EncodeRsaPublicKey},
};
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};

use crate::algorithm::{
    AlgorithmId, DigestAlgorithm, DsaParameters, SignatureAlgorithm, SignatureScheme,
};
use crate::der::{DerEncode, DerEncoder, DerValue, ObjectIdentifier, known, tags};
use crate::error::{Result, TrustKitError};

/// Supported key types for certificate and signing operations.
#[derive(Debug, Clone)]
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    EcdsaP256 {
        signing_key: P256SigningKey,
        verifying_key: P256VerifyingKey,
    },
    EcdsaP384 {
        signing_key: P384SigningKey,
        verifying_key: P384VerifyingKey,
    },
    Ed25519 {
        signing_key: Ed25519SigningKey,
    },
}

impl KeyPair {
    /// Generate an RSA key pair with the given number of bits.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| TrustKitError::KeyGenerationError(e.to_string()))?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair::Rsa {
            private: Box::new(private),
            public,
        })
    }

    /// Generate an ECDSA P-256 key pair.
    pub fn generate_ecdsa_p256() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = P256SigningKey::random(&mut rng);
        let verifying_key = signing_key.verifying_key().to_owned();
        KeyPair::EcdsaP256 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an ECDSA P-384 key pair.
    pub fn generate_ecdsa_p384() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = P384SigningKey::random(&mut rng);
        let verifying_key = signing_key.verifying_key().to_owned();
        KeyPair::EcdsaP384 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an Ed25519 key pair.
    pub fn generate_ed25519() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = Ed25519SigningKey::generate(&mut rng);
        KeyPair::Ed25519 { signing_key }
    }

    /// Import an unencrypted PKCS#8 `PrivateKeyInfo`, dispatching on its
    /// algorithm (and, for EC keys, curve) identifier.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let info = pkcs8::PrivateKeyInfo::try_from(der)?;
        let algorithm = ObjectIdentifier::from(&info.algorithm.oid);

        if algorithm == known::RSA_ENCRYPTION {
            let private = RsaPrivateKey::from_pkcs8_der(der)?;
            let public = RsaPublicKey::from(&private);
            Ok(KeyPair::Rsa {
                private: Box::new(private),
                public,
            })
        } else if algorithm == known::EC_PUBLIC_KEY {
            let curve = ObjectIdentifier::from(&info.algorithm.parameters_oid()?);
            if curve == known::SECP256R1 {
                let signing_key = P256SigningKey::from_pkcs8_der(der)?;
                let verifying_key = signing_key.verifying_key().to_owned();
                Ok(KeyPair::EcdsaP256 {
                    signing_key,
                    verifying_key,
                })
            } else if curve == known::SECP384R1 {
                let signing_key = P384SigningKey::from_pkcs8_der(der)?;
                let verifying_key = signing_key.verifying_key().to_owned();
                Ok(KeyPair::EcdsaP384 {
                    signing_key,
                    verifying_key,
                })
            } else {
                Err(TrustKitError::UnsupportedAlgorithm(format!("EC curve {curve}")))
            }
        } else if algorithm == known::ED25519 {
            let signing_key = Ed25519SigningKey::from_pkcs8_der(der)?;
            Ok(KeyPair::Ed25519 { signing_key })
        } else {
            Err(TrustKitError::UnsupportedAlgorithm(format!(
                "private key algorithm {}",
                AlgorithmId::new(algorithm).name()
            )))
        }
    }

    /// Import a `PRIVATE KEY` PEM block.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self> {
        Self::from_pkcs8_der(&crate::pem_utils::pem_to_der(pem)?)
    }

    /// Export as an unencrypted PKCS#8 `PrivateKeyInfo`.
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>> {
        let document = match self {
            KeyPair::Rsa { private, .. } => private.to_pkcs8_der()?,
            KeyPair::EcdsaP256 { signing_key, .. } => signing_key.to_pkcs8_der()?,
            KeyPair::EcdsaP384 { signing_key, .. } => signing_key.to_pkcs8_der()?,
            KeyPair::Ed25519 { signing_key } => signing_key.to_pkcs8_der()?,
        };
        Ok(document.as_bytes().to_vec())
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_key_pair(self)
    }

    /// The algorithm used when this key signs certificates.
    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        match self {
            KeyPair::Rsa { .. } => SignatureAlgorithm::Sha256WithRsa,
            KeyPair::EcdsaP256 { .. } => SignatureAlgorithm::Sha256WithEcdsa,
            KeyPair::EcdsaP384 { .. } => SignatureAlgorithm::Sha384WithEcdsa,
            KeyPair::Ed25519 { .. } => SignatureAlgorithm::Ed25519,
        }
    }

    /// The digest-encryption algorithm id a signer info carries for this key.
    pub fn encryption_algorithm_id(&self) -> AlgorithmId {
        match self {
            KeyPair::Rsa { .. } => AlgorithmId::with_null_params(known::RSA_ENCRYPTION),
            KeyPair::EcdsaP256 { .. } | KeyPair::EcdsaP384 { .. } => {
                AlgorithmId::new(known::EC_PUBLIC_KEY)
            }
            KeyPair::Ed25519 { .. } => AlgorithmId::new(known::ED25519),
        }
    }

    /// Sign `data`. RSA and ECDSA sign its `digest`; Ed25519 signs the data
    /// itself.
    pub fn sign(&self, digest: DigestAlgorithm, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            KeyPair::Rsa { private, .. } => {
                Ok(private.sign(pkcs1v15_padding(digest), &digest.digest(data))?)
            }
            KeyPair::EcdsaP256 { signing_key, .. } => {
                let signature: p256::ecdsa::Signature =
                    signing_key.sign_prehash(&digest.digest(data))?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::EcdsaP384 { signing_key, .. } => {
                let signature: p384::ecdsa::Signature =
                    signing_key.sign_prehash(&digest.digest(data))?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::Ed25519 { signing_key } => Ok(signing_key.sign(data).to_bytes().to_vec()),
        }
    }
}

fn pkcs1v15_padding(digest: DigestAlgorithm) -> Pkcs1v15Sign {
    match digest {
        DigestAlgorithm::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
        DigestAlgorithm::Sha224 => Pkcs1v15Sign::new::<Sha224>(),
        DigestAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
        DigestAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
        DigestAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
    }
}

/// A public key as found in a certificate's `SubjectPublicKeyInfo`.
///
/// DSA keys are decoded (parameters and `y`) so certificates carrying them
/// can be read, but cannot verify signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    EcdsaP256(P256VerifyingKey),
    EcdsaP384(P384VerifyingKey),
    Ed25519(ed25519_dalek::VerifyingKey),
    Dsa { params: DsaParameters, y: BigInt },
}

impl PublicKey {
    pub fn from_key_pair(key: &KeyPair) -> Self {
        match key {
            KeyPair::Rsa { public, .. } => PublicKey::Rsa(public.clone()),
            KeyPair::EcdsaP256 { verifying_key, .. } => PublicKey::EcdsaP256(*verifying_key),
            KeyPair::EcdsaP384 { verifying_key, .. } => PublicKey::EcdsaP384(*verifying_key),
            KeyPair::Ed25519 { signing_key } => PublicKey::Ed25519(signing_key.verifying_key()),
        }
    }

    pub fn algorithm_id(&self) -> AlgorithmId {
        match self {
            PublicKey::Rsa(_) => AlgorithmId::with_null_params(known::RSA_ENCRYPTION),
            PublicKey::EcdsaP256(_) => ec_algorithm_id(known::SECP256R1),
            PublicKey::EcdsaP384(_) => ec_algorithm_id(known::SECP384R1),
            PublicKey::Ed25519(_) => AlgorithmId::new(known::ED25519),
            PublicKey::Dsa { params, .. } => params.to_algorithm_id(),
        }
    }

    /// The `subjectPublicKey` BIT STRING contents.
    pub fn key_bytes(&self) -> Result<Vec<u8>> {
        Ok(match self {
            PublicKey::Rsa(public) => public.to_pkcs1_der()?.as_bytes().to_vec(),
            PublicKey::EcdsaP256(key) => key.to_encoded_point(false).as_bytes().to_vec(),
            PublicKey::EcdsaP384(key) => key.to_encoded_point(false).as_bytes().to_vec(),
            PublicKey::Ed25519(key) => key.to_bytes().to_vec(),
            PublicKey::Dsa { y, .. } => {
                let mut out = DerEncoder::new();
                out.put_integer(y);
                out.into_bytes()
            }
        })
    }

    /// SHA-1 over the `subjectPublicKey` bits (RFC 5280 key identifier
    /// method 1).
    pub fn key_identifier(&self) -> Result<Vec<u8>> {
        Ok(DigestAlgorithm::Sha1.digest(&self.key_bytes()?))
    }

    /// Decode a DER `SubjectPublicKeyInfo`.
    pub fn from_spki_der(der: &[u8]) -> Result<Self> {
        Self::from_spki(&crate::der::decode(der)?)
    }

    pub fn from_spki(spki: &DerValue) -> Result<Self> {
        if !spki.is(tags::SEQUENCE) {
            return Err(TrustKitError::malformed(
                "subject public key info is not a SEQUENCE",
            ));
        }
        let input = spki.content_input();
        let (algorithm, input) = AlgorithmId::read(input)?;
        let (key, input) = input.read_expected(tags::BIT_STRING)?;
        input.finish()?;
        let key = key.bit_string()?;

        let oid = algorithm.oid();
        if oid == &known::RSA_ENCRYPTION {
            Ok(PublicKey::Rsa(RsaPublicKey::from_pkcs1_der(key)?))
        } else if oid == &known::EC_PUBLIC_KEY {
            let curve = algorithm
                .parameters()
                .ok_or_else(|| TrustKitError::malformed("EC key without curve parameters"))?
                .oid()?;
            let invalid = |e: ecdsa::Error| TrustKitError::SignatureError(e.to_string());
            if curve == known::SECP256R1 {
                Ok(PublicKey::EcdsaP256(
                    P256VerifyingKey::from_sec1_bytes(key).map_err(invalid)?,
                ))
            } else if curve == known::SECP384R1 {
                Ok(PublicKey::EcdsaP384(
                    P384VerifyingKey::from_sec1_bytes(key).map_err(invalid)?,
                ))
            } else {
                Err(TrustKitError::UnsupportedAlgorithm(format!("EC curve {curve}")))
            }
        } else if oid == &known::ED25519 {
            let bytes: [u8; 32] = key
                .try_into()
                .map_err(|_| TrustKitError::malformed("Ed25519 key is not 32 bytes"))?;
            let key = ed25519_dalek::VerifyingKey::from_bytes(&bytes)
                .map_err(|e| TrustKitError::SignatureError(e.to_string()))?;
            Ok(PublicKey::Ed25519(key))
        } else if oid == &known::DSA {
            let params = DsaParameters::from_algorithm_id(&algorithm)?;
            let y = crate::der::decode(key)?.integer()?;
            Ok(PublicKey::Dsa { params, y })
        } else {
            Err(TrustKitError::UnsupportedAlgorithm(format!(
                "public key algorithm {}",
                algorithm.name()
            )))
        }
    }

    pub fn to_spki_der(&self) -> Result<Vec<u8>> {
        let mut body = DerEncoder::new();
        self.algorithm_id().encode(&mut body)?;
        body.put_bit_string(&self.key_bytes()?);
        let mut out = DerEncoder::new();
        out.write(tags::SEQUENCE, &body);
        Ok(out.into_bytes())
    }

    /// Converts to `x509-cert`'s `SubjectPublicKeyInfoOwned`.
    pub fn to_x509_spki(&self) -> Result<x509_cert::spki::SubjectPublicKeyInfoOwned> {
        Ok(der::Decode::from_der(&self.to_spki_der()?)?)
    }

    /// Converts from `x509-cert`'s `SubjectPublicKeyInfoOwned`.
    pub fn from_x509_spki(spki: &x509_cert::spki::SubjectPublicKeyInfoOwned) -> Result<Self> {
        Self::from_spki_der(&der::Encode::to_der(spki)?)
    }

    pub fn scheme(&self) -> SignatureScheme {
        match self {
            PublicKey::Rsa(_) => SignatureScheme::RsaPkcs1v15,
            PublicKey::EcdsaP256(_) | PublicKey::EcdsaP384(_) => SignatureScheme::Ecdsa,
            PublicKey::Ed25519(_) => SignatureScheme::Ed25519,
            PublicKey::Dsa { .. } => SignatureScheme::Dsa,
        }
    }

    /// Check `signature` over `data`.
    ///
    /// Returns `Ok(false)` when the signature does not match, including when
    /// it is not even well-formed for the scheme. Errors only when the key
    /// cannot perform `scheme` at all.
    pub fn verify(
        &self,
        scheme: SignatureScheme,
        digest: DigestAlgorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool> {
        if scheme == SignatureScheme::Dsa {
            return Err(TrustKitError::UnsupportedAlgorithm(
                "DSA signature verification".to_string(),
            ));
        }
        if scheme != self.scheme() {
            return Err(TrustKitError::SignatureError(format!(
                "{} key cannot verify {} signatures",
                self.scheme().name(),
                scheme.name()
            )));
        }

        match self {
            PublicKey::Rsa(public) => Ok(public
                .verify(pkcs1v15_padding(digest), &digest.digest(data), signature)
                .is_ok()),
            PublicKey::EcdsaP256(key) => {
                let Ok(signature) = p256::ecdsa::Signature::from_der(signature) else {
                    log::debug!("ECDSA signature is not a valid DER signature");
                    return Ok(false);
                };
                Ok(key.verify_prehash(&digest.digest(data), &signature).is_ok())
            }
            PublicKey::EcdsaP384(key) => {
                let Ok(signature) = p384::ecdsa::Signature::from_der(signature) else {
                    log::debug!("ECDSA signature is not a valid DER signature");
                    return Ok(false);
                };
                Ok(key.verify_prehash(&digest.digest(data), &signature).is_ok())
            }
            PublicKey::Ed25519(key) => {
                let Ok(signature) = ed25519_dalek::Signature::from_slice(signature) else {
                    log::debug!("Ed25519 signature is not 64 bytes");
                    return Ok(false);
                };
                Ok(key.verify(data, &signature).is_ok())
            }
            PublicKey::Dsa { .. } => Err(TrustKitError::UnsupportedAlgorithm(
                "DSA signature verification".to_string(),
            )),
        }
    }
}

fn ec_algorithm_id(curve: ObjectIdentifier) -> AlgorithmId {
    AlgorithmId::with_params(
        known::EC_PUBLIC_KEY,
        DerValue::new(tags::OID, curve.to_der_content()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ecdsa_sign_and_verify() {
        let key = KeyPair::generate_ecdsa_p256();
        let public = key.public_key();
        let sig = key.sign(DigestAlgorithm::Sha256, b"payload").unwrap();
        assert!(
            public
                .verify(SignatureScheme::Ecdsa, DigestAlgorithm::Sha256, b"payload", &sig)
                .unwrap()
        );
        assert!(
            !public
                .verify(SignatureScheme::Ecdsa, DigestAlgorithm::Sha256, b"other", &sig)
                .unwrap()
        );
        assert!(
            !public
                .verify(SignatureScheme::Ecdsa, DigestAlgorithm::Sha256, b"payload", &[1, 2, 3])
                .unwrap()
        );
        assert!(
            public
                .verify(SignatureScheme::RsaPkcs1v15, DigestAlgorithm::Sha256, b"payload", &sig)
                .is_err()
        );
    }

    #[test]
    fn test_ed25519_sign_and_verify() {
        let key = KeyPair::generate_ed25519();
        let sig = key.sign(DigestAlgorithm::Sha512, b"payload").unwrap();
        assert_eq!(sig.len(), 64);
        assert!(
            key.public_key()
                .verify(SignatureScheme::Ed25519, DigestAlgorithm::Sha512, b"payload", &sig)
                .unwrap()
        );
    }

    #[test]
    fn test_spki_round_trip() {
        let keys = [
            KeyPair::generate_ecdsa_p256(),
            KeyPair::generate_ecdsa_p384(),
            KeyPair::generate_ed25519(),
        ];
        for key in keys {
            let public = key.public_key();
            let der = public.to_spki_der().unwrap();
            assert_eq!(PublicKey::from_spki_der(&der).unwrap(), public);
            let x509 = public.to_x509_spki().unwrap();
            assert_eq!(PublicKey::from_x509_spki(&x509).unwrap(), public);
            assert_eq!(public.key_identifier().unwrap().len(), 20);
        }
    }

    #[test]
    fn test_pkcs8_round_trip() {
        let key = KeyPair::generate_ecdsa_p384();
        let der = key.to_pkcs8_der().unwrap();
        let imported = KeyPair::from_pkcs8_der(&der).unwrap();
        assert_eq!(imported.public_key(), key.public_key());
        assert_eq!(imported.signature_algorithm(), SignatureAlgorithm::Sha384WithEcdsa);

        let key = KeyPair::generate_ed25519();
        let imported = KeyPair::from_pkcs8_der(&key.to_pkcs8_der().unwrap()).unwrap();
        assert_eq!(imported.public_key(), key.public_key());
    }

    #[test]
    fn test_dsa_key_cannot_verify() {
        let params = DsaParameters::new(BigInt::from(23), BigInt::from(11), BigInt::from(4));
        let key = PublicKey::Dsa {
            params,
            y: BigInt::from(8),
        };
        let parsed = PublicKey::from_spki_der(&key.to_spki_der().unwrap()).unwrap();
        assert_eq!(parsed, key);
        assert!(matches!(
            key.verify(SignatureScheme::Dsa, DigestAlgorithm::Sha1, b"x", b"y"),
            Err(TrustKitError::UnsupportedAlgorithm(_))
        ));
    }
}
