use std::fmt;

use num_bigint::BigInt;
use time::OffsetDateTime;

use super::Pkcs7;
use super::attributes::{Pkcs9Attribute, Pkcs9Attributes};
use crate::algorithm::{AlgorithmId, DigestAlgorithm, SignatureScheme};
use crate::cert::X509Certificate;
use crate::cert::extensions::KeyUsageBit;
use crate::der::{DecoderConfig, DerEncode, DerEncoder, DerValue, ObjectIdentifier, X500Name, tags};
use crate::error::{Result, TrustKitError};
use crate::key::KeyPair;

const AUTHENTICATED_ATTRIBUTES: u8 = tags::context(0, true);
const UNAUTHENTICATED_ATTRIBUTES: u8 = tags::context(1, true);

/// One signer of a SignedData value.
///
/// ```text
/// SignerInfo ::= SEQUENCE {
///     version                    INTEGER,
///     issuerAndSerialNumber      SEQUENCE { issuer Name, serialNumber INTEGER },
///     digestAlgorithm            AlgorithmIdentifier,
///     authenticatedAttributes    [0] IMPLICIT Attributes OPTIONAL,
///     digestEncryptionAlgorithm  AlgorithmIdentifier,
///     encryptedDigest            OCTET STRING,
///     unauthenticatedAttributes  [1] IMPLICIT Attributes OPTIONAL }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerInfo {
    version: u32,
    issuer_name: X500Name,
    serial_number: BigInt,
    digest_algorithm_id: AlgorithmId,
    authenticated_attributes: Option<Pkcs9Attributes>,
    digest_encryption_algorithm_id: AlgorithmId,
    encrypted_digest: Vec<u8>,
    unauthenticated_attributes: Option<Pkcs9Attributes>,
}

impl SignerInfo {
    pub fn new(
        issuer_name: X500Name,
        serial_number: BigInt,
        digest_algorithm_id: AlgorithmId,
        authenticated_attributes: Option<Pkcs9Attributes>,
        digest_encryption_algorithm_id: AlgorithmId,
        encrypted_digest: Vec<u8>,
        unauthenticated_attributes: Option<Pkcs9Attributes>,
    ) -> Self {
        Self {
            version: 1,
            issuer_name,
            serial_number,
            digest_algorithm_id,
            authenticated_attributes,
            digest_encryption_algorithm_id,
            encrypted_digest,
            unauthenticated_attributes,
        }
    }

    /// Sign `content` with `key`, whose certificate is `cert`.
    ///
    /// With `with_attributes`, the signature covers a content type, message
    /// digest and signing time attribute set instead of the content itself.
    pub fn sign(
        key: &KeyPair,
        cert: &X509Certificate,
        digest: DigestAlgorithm,
        content_type: &ObjectIdentifier,
        content: &[u8],
        with_attributes: bool,
    ) -> Result<Self> {
        let (authenticated_attributes, signature) = if with_attributes {
            let attributes = Pkcs9Attributes::new(vec![
                Pkcs9Attribute::content_type(content_type),
                Pkcs9Attribute::signing_time(OffsetDateTime::now_utc())?,
                Pkcs9Attribute::message_digest(&digest.digest(content)),
            ])?;
            let signature = key.sign(digest, attributes.encoded())?;
            (Some(attributes), signature)
        } else {
            (None, key.sign(digest, content)?)
        };

        Ok(Self::new(
            cert.issuer()?,
            cert.serial_number(),
            digest.algorithm_id(),
            authenticated_attributes,
            key.encryption_algorithm_id(),
            signature,
            None,
        ))
    }

    /// Decode a signer. Old-style signers may carry a plain SET in either
    /// attribute slot; it is read and discarded.
    pub fn parse(value: &DerValue, old_style: bool) -> Result<Self> {
        Self::parse_with(value, old_style, &DecoderConfig::DEFAULT)
    }

    /// [`parse`](Self::parse) with `config`'s element limit applied to the
    /// issuer name and both attribute sets.
    pub fn parse_with(value: &DerValue, old_style: bool, config: &DecoderConfig) -> Result<Self> {
        if !value.is(tags::SEQUENCE) {
            return Err(TrustKitError::malformed("SignerInfo is not a SEQUENCE"));
        }
        let input = value.content_input_with(config);
        let (version, input) = input.read_u32()?;

        let (issuer_and_serial, input) = input.enter(tags::SEQUENCE)?;
        let (issuer, issuer_and_serial) = issuer_and_serial.read_value()?;
        let (serial_number, issuer_and_serial) = issuer_and_serial.read_integer()?;
        issuer_and_serial.finish()?;
        let issuer_name = X500Name::from_der_value_with(&issuer, config)?;

        let (digest_algorithm_id, input) = AlgorithmId::read(input)?;

        let input = if old_style {
            input.read_optional(tags::SET)?.1
        } else {
            input
        };
        let (authenticated, input) = input.read_optional(AUTHENTICATED_ATTRIBUTES)?;
        let authenticated_attributes = authenticated
            .as_ref()
            .map(|attributes| Pkcs9Attributes::parse_with(attributes, config))
            .transpose()?;

        let (digest_encryption_algorithm_id, input) = AlgorithmId::read(input)?;
        let (encrypted_digest, input) = input.read_octet_string()?;

        let input = if old_style {
            input.read_optional(tags::SET)?.1
        } else {
            input
        };
        let (unauthenticated, input) = input.read_optional(UNAUTHENTICATED_ATTRIBUTES)?;
        let unauthenticated_attributes = unauthenticated
            .as_ref()
            .map(|attributes| Pkcs9Attributes::parse_with(attributes, config))
            .transpose()?;

        input
            .finish()
            .map_err(|_| TrustKitError::malformed("extra data at the end of SignerInfo"))?;

        Ok(Self {
            version,
            issuer_name,
            serial_number,
            digest_algorithm_id,
            authenticated_attributes,
            digest_encryption_algorithm_id,
            encrypted_digest: encrypted_digest.to_vec(),
            unauthenticated_attributes,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn issuer_name(&self) -> &X500Name {
        &self.issuer_name
    }

    pub fn serial_number(&self) -> &BigInt {
        &self.serial_number
    }

    pub fn digest_algorithm_id(&self) -> &AlgorithmId {
        &self.digest_algorithm_id
    }

    pub fn authenticated_attributes(&self) -> Option<&Pkcs9Attributes> {
        self.authenticated_attributes.as_ref()
    }

    pub fn digest_encryption_algorithm_id(&self) -> &AlgorithmId {
        &self.digest_encryption_algorithm_id
    }

    pub fn encrypted_digest(&self) -> &[u8] {
        &self.encrypted_digest
    }

    pub fn unauthenticated_attributes(&self) -> Option<&Pkcs9Attributes> {
        self.unauthenticated_attributes.as_ref()
    }

    /// The certificate in `pkcs7` this signer refers to.
    pub fn certificate<'a>(&self, pkcs7: &'a Pkcs7) -> Option<&'a X509Certificate> {
        pkcs7.get_certificate(&self.serial_number, &self.issuer_name)
    }

    /// Verify this signer over `data`, or over the content of `pkcs7` when
    /// no detached data is given.
    ///
    /// Returns `Ok(None)` when the signature does not check out: no data,
    /// attribute mismatch, unknown certificate or a bad signature. Errors are
    /// reserved for algorithms that cannot be used and keys that may not
    /// sign.
    pub fn verify(&self, pkcs7: &Pkcs7, data: Option<&[u8]>) -> Result<Option<&SignerInfo>> {
        let content_info = pkcs7.content_info();
        let Some(data) = data.or_else(|| content_info.content_bytes()) else {
            log::debug!("signer {:x} has no content to verify", self.serial_number);
            return Ok(None);
        };

        let digest = DigestAlgorithm::from_algorithm_id(&self.digest_algorithm_id)?;
        let signed: &[u8] = match &self.authenticated_attributes {
            Some(attributes) => {
                if attributes.content_type()?.as_ref() != Some(content_info.content_type()) {
                    log::debug!(
                        "signer {:x}: content type attribute does not match {}",
                        self.serial_number,
                        content_info.content_type()
                    );
                    return Ok(None);
                }
                let Some(message_digest) = attributes.message_digest()? else {
                    log::debug!("signer {:x}: no message digest attribute", self.serial_number);
                    return Ok(None);
                };
                if message_digest != digest.digest(data) {
                    log::debug!("signer {:x}: message digest mismatch", self.serial_number);
                    return Ok(None);
                }
                attributes.encoded()
            }
            None => data,
        };

        let Some(cert) = self.certificate(pkcs7) else {
            log::debug!(
                "no certificate for signer {:x} issued by {}",
                self.serial_number,
                self.issuer_name
            );
            return Ok(None);
        };

        if let Some(key_usage) = cert.key_usage()? {
            if !key_usage.has(KeyUsageBit::DigitalSignature)
                && !key_usage.has(KeyUsageBit::NonRepudiation)
            {
                return Err(TrustKitError::SignatureError(
                    "Key usage restricted: cannot be used for digital signatures".to_string(),
                ));
            }
        }

        let scheme = SignatureScheme::from_algorithm_id(&self.digest_encryption_algorithm_id)?;
        if cert
            .public_key()?
            .verify(scheme, digest, signed, &self.encrypted_digest)?
        {
            Ok(Some(self))
        } else {
            log::debug!("signature of signer {:x} does not match", self.serial_number);
            Ok(None)
        }
    }
}

impl DerEncode for SignerInfo {
    fn encode(&self, out: &mut DerEncoder) -> Result<()> {
        let mut body = DerEncoder::new();
        body.put_u32(self.version);

        let mut issuer_and_serial = DerEncoder::new();
        self.issuer_name.encode(&mut issuer_and_serial)?;
        issuer_and_serial.put_integer(&self.serial_number);
        body.write(tags::SEQUENCE, &issuer_and_serial);

        self.digest_algorithm_id.encode(&mut body)?;
        if let Some(attributes) = &self.authenticated_attributes {
            attributes.encode_implicit(AUTHENTICATED_ATTRIBUTES, &mut body)?;
        }
        self.digest_encryption_algorithm_id.encode(&mut body)?;
        body.put_octet_string(&self.encrypted_digest);
        if let Some(attributes) = &self.unauthenticated_attributes {
            attributes.encode_implicit(UNAUTHENTICATED_ATTRIBUTES, &mut body)?;
        }

        out.write(tags::SEQUENCE, &body);
        Ok(())
    }
}

impl fmt::Display for SignerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Signer Info for (issuer): {}", self.issuer_name)?;
        writeln!(f, "\tversion: {:x}", self.version)?;
        writeln!(f, "\tcertificateSerialNumber: {:x}", self.serial_number)?;
        writeln!(f, "\tdigestAlgorithmId: {}", self.digest_algorithm_id)?;
        if let Some(attributes) = &self.authenticated_attributes {
            write!(f, "\tauthenticatedAttributes: {attributes}")?;
        }
        writeln!(
            f,
            "\tdigestEncryptionAlgorithmId: {}",
            self.digest_encryption_algorithm_id
        )?;
        writeln!(f, "\tencryptedDigest: {}", hex::encode(&self.encrypted_digest))?;
        if let Some(attributes) = &self.unauthenticated_attributes {
            write!(f, "\tunauthenticatedAttributes: {attributes}")?;
        }
        Ok(())
    }
}
