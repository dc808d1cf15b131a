use std::fmt;

use time::OffsetDateTime;

use crate::der::{DecoderConfig, DerEncode, DerEncoder, DerValue, ObjectIdentifier, known, tags};
use crate::error::{Result, TrustKitError};

/// One PKCS#9 attribute: `SEQUENCE { type OID, values SET OF ANY }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pkcs9Attribute {
    oid: ObjectIdentifier,
    values: Vec<DerValue>,
}

impl Pkcs9Attribute {
    pub fn new(oid: ObjectIdentifier, values: Vec<DerValue>) -> Self {
        Self { oid, values }
    }

    pub fn content_type(content_type: &ObjectIdentifier) -> Self {
        Self::new(
            known::CONTENT_TYPE,
            vec![DerValue::new(tags::OID, content_type.to_der_content())],
        )
    }

    pub fn message_digest(digest: &[u8]) -> Self {
        Self::new(
            known::MESSAGE_DIGEST,
            vec![DerValue::new(tags::OCTET_STRING, digest)],
        )
    }

    /// UTCTime through 2049, GeneralizedTime after.
    pub fn signing_time(at: OffsetDateTime) -> Result<Self> {
        let mut out = DerEncoder::new();
        if at.year() < 2050 {
            out.put_utc_time(at)?;
        } else {
            out.put_generalized_time(at)?;
        }
        Ok(Self::new(
            known::SIGNING_TIME,
            vec![crate::der::decode(out.as_bytes())?],
        ))
    }

    pub fn parse(value: &DerValue) -> Result<Self> {
        Self::parse_with(value, &DecoderConfig::DEFAULT)
    }

    pub fn parse_with(value: &DerValue, config: &DecoderConfig) -> Result<Self> {
        if !value.is(tags::SEQUENCE) {
            return Err(TrustKitError::malformed("PKCS9 attribute is not a SEQUENCE"));
        }
        let input = value.content_input_with(config);
        let (oid, input) = input.read_oid()?;
        let (values, input) = input.read_set(1, None)?;
        input.finish()?;
        if values.is_empty() {
            return Err(TrustKitError::malformed(format!(
                "PKCS9 attribute {oid} has no values"
            )));
        }
        Ok(Self { oid, values })
    }

    pub fn oid(&self) -> &ObjectIdentifier {
        &self.oid
    }

    pub fn values(&self) -> &[DerValue] {
        &self.values
    }

    /// The first value; the attributes used for signing are single-valued.
    pub fn value(&self) -> Option<&DerValue> {
        self.values.first()
    }

    pub fn name(&self) -> String {
        match &self.oid {
            oid if *oid == known::CONTENT_TYPE => "ContentType".to_string(),
            oid if *oid == known::MESSAGE_DIGEST => "MessageDigest".to_string(),
            oid if *oid == known::SIGNING_TIME => "SigningTime".to_string(),
            oid => oid.to_string(),
        }
    }
}

impl DerEncode for Pkcs9Attribute {
    fn encode(&self, out: &mut DerEncoder) -> Result<()> {
        let mut body = DerEncoder::new();
        body.put_oid(&self.oid);
        body.put_ordered_set_of(tags::SET, &self.values)?;
        out.write(tags::SEQUENCE, &body);
        Ok(())
    }
}

impl fmt::Display for Pkcs9Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}: ", self.name())?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if self.oid == known::CONTENT_TYPE {
                if let Ok(oid) = value.oid() {
                    write!(f, "{oid}")?;
                    continue;
                }
            } else if self.oid == known::SIGNING_TIME {
                if let Ok(at) = value.time() {
                    write!(f, "{at}")?;
                    continue;
                }
            } else if self.oid == known::MESSAGE_DIGEST {
                if let Ok(digest) = value.octet_string() {
                    write!(f, "{}", hex::encode(digest))?;
                    continue;
                }
            }
            write!(f, "{}", hex::encode(value.to_der()))?;
        }
        write!(f, "]")
    }
}

/// The authenticated or unauthenticated attribute set of a signer.
///
/// A decoded set keeps the exact bytes it was received in, re-tagged as a
/// universal SET; those bytes are what the signer signed. A set built from
/// attributes is encoded as a canonical ordered SET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pkcs9Attributes {
    attributes: Vec<Pkcs9Attribute>,
    encoded: Vec<u8>,
}

impl Pkcs9Attributes {
    pub fn new(attributes: Vec<Pkcs9Attribute>) -> Result<Self> {
        check_unique(&attributes).map_err(|oid| {
            TrustKitError::InvalidInput(format!("duplicate PKCS9 attribute {oid}"))
        })?;
        let mut out = DerEncoder::new();
        out.put_ordered_set_of(tags::SET, &attributes)?;
        Ok(Self {
            attributes,
            encoded: out.into_bytes(),
        })
    }

    /// Decode an attribute set from its `[n] IMPLICIT SET OF Attribute`
    /// (or plain SET) encoding.
    pub fn parse(value: &DerValue) -> Result<Self> {
        Self::parse_with(value, &DecoderConfig::DEFAULT)
    }

    /// [`parse`](Self::parse) under `config`'s element limit.
    pub fn parse_with(value: &DerValue, config: &DecoderConfig) -> Result<Self> {
        let set = value.retag(tags::SET);
        let attributes = set
            .children_with(config)?
            .iter()
            .map(|attribute| Pkcs9Attribute::parse_with(attribute, config))
            .collect::<Result<Vec<_>>>()?;
        check_unique(&attributes).map_err(|oid| {
            TrustKitError::malformed(format!("duplicate PKCS9 attribute {oid}"))
        })?;
        Ok(Self {
            attributes,
            encoded: set.to_der(),
        })
    }

    /// The SET encoding the signature is computed over.
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    pub fn attributes(&self) -> &[Pkcs9Attribute] {
        &self.attributes
    }

    pub fn get(&self, oid: &ObjectIdentifier) -> Option<&Pkcs9Attribute> {
        self.attributes.iter().find(|a| a.oid() == oid)
    }

    pub fn content_type(&self) -> Result<Option<ObjectIdentifier>> {
        self.single_value(&known::CONTENT_TYPE)
            .map(DerValue::oid)
            .transpose()
    }

    pub fn message_digest(&self) -> Result<Option<Vec<u8>>> {
        self.single_value(&known::MESSAGE_DIGEST)
            .map(|v| v.octet_string().map(<[u8]>::to_vec))
            .transpose()
    }

    pub fn signing_time(&self) -> Result<Option<OffsetDateTime>> {
        self.single_value(&known::SIGNING_TIME)
            .map(DerValue::time)
            .transpose()
    }

    fn single_value(&self, oid: &ObjectIdentifier) -> Option<&DerValue> {
        self.get(oid).and_then(Pkcs9Attribute::value)
    }

    /// Write the set under the IMPLICIT tag `tag` (`[0]` or `[1]`).
    pub(crate) fn encode_implicit(&self, tag: u8, out: &mut DerEncoder) -> Result<()> {
        out.put_der_value(&crate::der::decode(&self.encoded)?.retag(tag));
        Ok(())
    }
}

fn check_unique(attributes: &[Pkcs9Attribute]) -> std::result::Result<(), ObjectIdentifier> {
    for (i, attribute) in attributes.iter().enumerate() {
        if attributes[..i].iter().any(|a| a.oid == attribute.oid) {
            return Err(attribute.oid.clone());
        }
    }
    Ok(())
}

impl fmt::Display for Pkcs9Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PKCS9 Attributes: [")?;
        for attribute in &self.attributes {
            writeln!(f, "\t{attribute}")?;
        }
        writeln!(f, "\t]")
    }
}
