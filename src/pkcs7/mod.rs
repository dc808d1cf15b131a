//! PKCS#7 SignedData.
//!
//! Decoding accepts the current grammar and the legacy one in which the
//! certificates are a mandatory plain SET followed by an (ignored) CRL SET.
//! Encoding always produces the current grammar with canonically ordered
//! SETs.

mod attributes;
mod content_info;
mod signer_info;

use std::fmt;
use std::sync::OnceLock;

use num_bigint::BigInt;

pub use attributes::{Pkcs9Attribute, Pkcs9Attributes};
pub use content_info::ContentInfo;
pub use signer_info::SignerInfo;

use crate::algorithm::AlgorithmId;
use crate::cert::{X509Certificate, X509Crl};
use crate::der::{
    DecoderConfig, DerEncode, DerEncoder, DerInput, DerValue, X500Name, known, tags,
};
use crate::error::{Result, TrustKitError};
use crate::pem_utils::{der_to_pem, pem_to_der_with_label};

const CERTIFICATES: u8 = tags::context(0, true);
const CRLS: u8 = tags::context(1, true);
const PEM_LABEL: &str = "PKCS7";

/// The signers that verified, in encoded order.
#[derive(Debug)]
pub enum Verification<'a> {
    Verified(Vec<&'a SignerInfo>),
    NoSignerVerified,
}

impl<'a> Verification<'a> {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Verified(_))
    }

    pub fn signers(&self) -> &[&'a SignerInfo] {
        match self {
            Verification::Verified(signers) => signers,
            Verification::NoSignerVerified => &[],
        }
    }
}

/// A decoded or assembled SignedData value.
///
/// ```text
/// SignedData ::= SEQUENCE {
///     version           INTEGER,
///     digestAlgorithms  SET OF AlgorithmIdentifier,
///     contentInfo       ContentInfo,
///     certificates      [0] IMPLICIT SET OF Certificate OPTIONAL,
///     crls              [1] IMPLICIT SET OF CertificateList OPTIONAL,
///     signerInfos       SET OF SignerInfo }
/// ```
#[derive(Debug, Clone)]
pub struct Pkcs7 {
    version: Option<u32>,
    digest_algorithm_ids: Vec<AlgorithmId>,
    content_info: ContentInfo,
    certificates: Vec<X509Certificate>,
    crls: Vec<X509Crl>,
    signer_infos: Vec<SignerInfo>,
    old_style: bool,
    cert_issuer_names: OnceLock<Vec<Option<X500Name>>>,
}

impl Pkcs7 {
    pub fn new(
        digest_algorithm_ids: Vec<AlgorithmId>,
        content_info: ContentInfo,
        certificates: Vec<X509Certificate>,
        crls: Vec<X509Crl>,
        signer_infos: Vec<SignerInfo>,
    ) -> Self {
        Self {
            version: Some(1),
            digest_algorithm_ids,
            content_info,
            certificates,
            crls,
            signer_infos,
            old_style: false,
            cert_issuer_names: OnceLock::new(),
        }
    }

    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        Self::from_der_with(bytes, &DecoderConfig::DEFAULT)
    }

    /// Decode with explicit limits. The current grammar is tried first; on
    /// any failure the input is rewound and decoded as legacy SignedData.
    pub fn from_der_with(bytes: &[u8], config: &DecoderConfig) -> Result<Self> {
        let input = DerInput::with_config(bytes, config)?;
        let start = input.checkpoint();
        match Self::parse(input, false) {
            Ok(pkcs7) => Ok(pkcs7),
            Err(err) => {
                log::debug!("decoding as current SignedData failed ({err}), retrying as legacy");
                let mut pkcs7 = Self::parse(input.rewind(start), true)?;
                pkcs7.old_style = true;
                Ok(pkcs7)
            }
        }
    }

    pub fn from_pem(pem: &str) -> Result<Self> {
        Self::from_der(&pem_to_der_with_label(pem, PEM_LABEL)?)
    }

    pub fn to_pem(&self) -> Result<String> {
        Ok(der_to_pem(&self.to_der()?, PEM_LABEL))
    }

    /// The canonical DER encoding.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        DerEncode::to_der(self)
    }

    fn parse(input: DerInput<'_>, old_style: bool) -> Result<Self> {
        let config = input.config();
        let (outer, rest) = ContentInfo::read(input, old_style)?;
        rest.finish()?;

        let content_type = outer.content_type().clone();
        let content = outer.content().ok_or_else(|| {
            TrustKitError::malformed(format!("content of type {content_type} is missing"))
        })?;

        if content_type == known::SIGNED_DATA {
            Self::parse_signed_data(content, config, old_style)
        } else if content_type == known::OLD_SIGNED_DATA {
            let mut pkcs7 = Self::parse_signed_data(content, config, true)?;
            pkcs7.old_style = true;
            Ok(pkcs7)
        } else if content_type == known::NETSCAPE_CERT_SEQUENCE {
            Self::parse_netscape_cert_chain(outer.clone(), content, config)
        } else {
            Err(TrustKitError::UnsupportedGrammar(format!(
                "content type {content_type} not supported"
            )))
        }
    }

    fn parse_signed_data(
        content: &DerValue,
        config: &DecoderConfig,
        old_style: bool,
    ) -> Result<Self> {
        if !content.is(tags::SEQUENCE) {
            return Err(TrustKitError::malformed("SignedData is not a SEQUENCE"));
        }
        let input = DerInput::with_config(content.content(), config)?;

        let (version, input) = input.read_u32()?;
        let (digest_algorithms, input) = input.read_set(1, None)?;
        let digest_algorithm_ids = digest_algorithms
            .iter()
            .map(AlgorithmId::parse)
            .collect::<Result<Vec<_>>>()?;
        let (content_info, input) = ContentInfo::read(input, old_style)?;

        let (certificates, crls, input) = if old_style {
            let (certificates, input) = input.read_set(2, None)?;
            let (crls, input) = input.read_set(0, None)?;
            if !crls.is_empty() {
                log::warn!("discarding {} CRL(s) from legacy SignedData", crls.len());
            }
            (certificates, Vec::new(), input)
        } else {
            let (certificates, input) = if input.peek_byte() == Some(CERTIFICATES) {
                input.read_set(2, Some(CERTIFICATES))?
            } else {
                (Vec::new(), input)
            };
            let (crls, input) = if input.peek_byte() == Some(CRLS) {
                input.read_set(1, Some(CRLS))?
            } else {
                (Vec::new(), input)
            };
            (certificates, crls, input)
        };

        let (signer_infos, input) = input.read_set(1, None)?;
        input.finish()?;

        Ok(Self {
            version: Some(version),
            digest_algorithm_ids,
            content_info,
            certificates: certificates
                .iter()
                .map(|v| X509Certificate::from_der(&v.to_der()))
                .collect::<Result<Vec<_>>>()?,
            crls: crls
                .iter()
                .map(|v| X509Crl::from_der(&v.to_der()))
                .collect::<Result<Vec<_>>>()?,
            signer_infos: signer_infos
                .iter()
                .map(|v| SignerInfo::parse_with(v, old_style, config))
                .collect::<Result<Vec<_>>>()?,
            old_style: false,
            cert_issuer_names: OnceLock::new(),
        })
    }

    /// A bare `SEQUENCE OF Certificate` with no signers.
    fn parse_netscape_cert_chain(
        content_info: ContentInfo,
        content: &DerValue,
        config: &DecoderConfig,
    ) -> Result<Self> {
        if !content.is(tags::SEQUENCE) {
            return Err(TrustKitError::malformed(
                "Netscape certificate sequence is not a SEQUENCE",
            ));
        }
        let certificates = DerInput::with_config(content.content(), config)?
            .read_all(2)?
            .iter()
            .map(|v| X509Certificate::from_der(&v.to_der()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            version: None,
            certificates,
            ..Self::new(Vec::new(), content_info, Vec::new(), Vec::new(), Vec::new())
        })
    }

    /// The SignedData version; `None` for a Netscape certificate sequence,
    /// which carries no version.
    pub fn version(&self) -> Option<u32> {
        self.version
    }

    pub fn digest_algorithm_ids(&self) -> &[AlgorithmId] {
        &self.digest_algorithm_ids
    }

    pub fn content_info(&self) -> &ContentInfo {
        &self.content_info
    }

    pub fn certificates(&self) -> &[X509Certificate] {
        &self.certificates
    }

    pub fn crls(&self) -> &[X509Crl] {
        &self.crls
    }

    pub fn signer_infos(&self) -> &[SignerInfo] {
        &self.signer_infos
    }

    /// Whether the value was decoded from the legacy grammar: either the
    /// current grammar failed and the legacy retry succeeded, or the content
    /// type was the legacy SignedData OID, which is always read with the
    /// legacy grammar.
    pub fn is_old_style(&self) -> bool {
        self.old_style
    }

    /// The certificate with the given serial number whose issuer equals
    /// `issuer`.
    pub fn get_certificate(&self, serial: &BigInt, issuer: &X500Name) -> Option<&X509Certificate> {
        let issuer_names = self.cert_issuer_names.get_or_init(|| {
            self.certificates
                .iter()
                .map(|cert| cert.issuer().ok())
                .collect()
        });
        self.certificates
            .iter()
            .zip(issuer_names)
            .find(|(cert, name)| cert.serial_number() == *serial && name.as_ref() == Some(issuer))
            .map(|(cert, _)| cert)
    }

    /// Verify every signer over `detached`, or over the enclosed content
    /// when `detached` is `None`.
    pub fn verify(&self, detached: Option<&[u8]>) -> Result<Verification<'_>> {
        let mut verified = Vec::new();
        for signer in &self.signer_infos {
            if let Some(signer) = signer.verify(self, detached)? {
                verified.push(signer);
            }
        }
        log::debug!(
            "{} of {} signer(s) verified",
            verified.len(),
            self.signer_infos.len()
        );
        if verified.is_empty() {
            Ok(Verification::NoSignerVerified)
        } else {
            Ok(Verification::Verified(verified))
        }
    }
}

impl DerEncode for Pkcs7 {
    fn encode(&self, out: &mut DerEncoder) -> Result<()> {
        let mut signed_data = DerEncoder::new();
        // SignedData requires a version even when the source had none
        signed_data.put_u32(self.version.unwrap_or(1));
        signed_data.put_ordered_set_of(tags::SET, &self.digest_algorithm_ids)?;
        self.content_info.encode(&mut signed_data)?;
        if !self.certificates.is_empty() {
            signed_data.put_ordered_set_of(CERTIFICATES, &self.certificates)?;
        }
        if !self.crls.is_empty() {
            signed_data.put_ordered_set_of(CRLS, &self.crls)?;
        }
        signed_data.put_ordered_set_of(tags::SET, &self.signer_infos)?;

        log::debug!(
            "encoded SignedData with {} signer(s) and {} certificate(s)",
            self.signer_infos.len(),
            self.certificates.len()
        );
        let content = DerValue::new(tags::SEQUENCE, signed_data.into_bytes());
        ContentInfo::new(known::SIGNED_DATA, Some(content)).encode(out)
    }
}

impl fmt::Display for Pkcs7 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.content_info)?;
        if let Some(version) = self.version {
            writeln!(f, "PKCS7 :: version: {version:x}")?;
        }
        writeln!(f, "PKCS7 :: digest AlgorithmIds: ")?;
        for alg in &self.digest_algorithm_ids {
            writeln!(f, "\t{alg}")?;
        }
        if !self.certificates.is_empty() {
            writeln!(f, "PKCS7 :: certificates: ")?;
            for (i, cert) in self.certificates.iter().enumerate() {
                writeln!(f, "\t{i}.   {cert}")?;
            }
        }
        if !self.crls.is_empty() {
            writeln!(f, "PKCS7 :: crls: ")?;
            for (i, crl) in self.crls.iter().enumerate() {
                writeln!(f, "\t{i}.   {crl}")?;
            }
        }
        writeln!(f, "PKCS7 :: signer infos: ")?;
        for (i, signer) in self.signer_infos.iter().enumerate() {
            writeln!(f, "\t{i}.  {signer}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::DigestAlgorithm;
    use crate::der::ObjectIdentifier;

    fn empty_signed_data(old_style_certs: bool) -> Vec<u8> {
        wrap(known::SIGNED_DATA, old_style_certs)
    }

    fn wrap(content_type: ObjectIdentifier, old_style_certs: bool) -> Vec<u8> {
        let mut body = DerEncoder::new();
        body.put_u32(1);
        body.put_ordered_set_of(tags::SET, &[DigestAlgorithm::Sha256.algorithm_id()])
            .unwrap();
        ContentInfo::data(b"x").encode(&mut body).unwrap();
        if old_style_certs {
            body.put_raw(&[0x31, 0x00, 0x31, 0x00]);
        }
        body.put_raw(&[0x31, 0x00]);
        let mut out = DerEncoder::new();
        ContentInfo::new(
            content_type,
            Some(DerValue::new(tags::SEQUENCE, body.into_bytes())),
        )
        .encode(&mut out)
        .unwrap();
        out.into_bytes()
    }

    #[test]
    fn test_current_grammar() {
        let pkcs7 = Pkcs7::from_der(&empty_signed_data(false)).unwrap();
        assert!(!pkcs7.is_old_style());
        assert_eq!(pkcs7.version(), Some(1));
        assert_eq!(pkcs7.content_info().content_bytes(), Some(&b"x"[..]));
        assert!(pkcs7.signer_infos().is_empty());
        assert!(matches!(pkcs7.verify(None).unwrap(), Verification::NoSignerVerified));
    }

    #[test]
    fn test_legacy_content_type() {
        let pkcs7 = Pkcs7::from_der(&wrap(known::OLD_SIGNED_DATA, true)).unwrap();
        assert!(pkcs7.is_old_style());
        assert_eq!(pkcs7.version(), Some(1));
        // encoding always uses the current content type and grammar
        assert_eq!(pkcs7.to_der().unwrap(), empty_signed_data(false));
    }

    #[test]
    fn test_legacy_grammar_fallback() {
        let pkcs7 = Pkcs7::from_der(&empty_signed_data(true)).unwrap();
        assert!(pkcs7.is_old_style());
        assert!(pkcs7.certificates().is_empty());
        // re-encoded in the current grammar
        assert_eq!(pkcs7.to_der().unwrap(), empty_signed_data(false));
    }

    #[test]
    fn test_round_trip() {
        let der = empty_signed_data(false);
        assert_eq!(Pkcs7::from_der(&der).unwrap().to_der().unwrap(), der);
    }

    #[test]
    fn test_unsupported_content_type() {
        let der = ContentInfo::new(known::ENVELOPED_DATA, Some(DerValue::new(tags::SEQUENCE, vec![])))
            .to_der()
            .unwrap();
        assert!(matches!(
            Pkcs7::from_der(&der),
            Err(TrustKitError::UnsupportedGrammar(_))
        ));
    }

    #[test]
    fn test_input_limit() {
        let der = empty_signed_data(false);
        let config = DecoderConfig::builder().max_input_len(der.len() - 1).build();
        assert!(matches!(
            Pkcs7::from_der_with(&der, &config),
            Err(TrustKitError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn test_pem_label() {
        let pkcs7 = Pkcs7::from_der(&empty_signed_data(false)).unwrap();
        let pem = pkcs7.to_pem().unwrap();
        assert!(pem.starts_with("-----BEGIN PKCS7-----"));
        assert_eq!(Pkcs7::from_pem(&pem).unwrap().to_der().unwrap(), pkcs7.to_der().unwrap());
    }
}
