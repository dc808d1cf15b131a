use std::fmt;

use crate::der::{DerEncode, DerEncoder, DerInput, DerValue, ObjectIdentifier, known, tags};
use crate::error::{Result, TrustKitError};

const EXPLICIT_CONTENT: u8 = tags::context(0, true);

/// `ContentInfo ::= SEQUENCE { contentType OID, content [0] EXPLICIT ANY OPTIONAL }`
///
/// Absent content means the content is detached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentInfo {
    content_type: ObjectIdentifier,
    content: Option<DerValue>,
}

impl ContentInfo {
    pub fn new(content_type: ObjectIdentifier, content: Option<DerValue>) -> Self {
        Self {
            content_type,
            content,
        }
    }

    /// Data content carried as an OCTET STRING.
    pub fn data(bytes: &[u8]) -> Self {
        Self::new(known::DATA, Some(DerValue::new(tags::OCTET_STRING, bytes)))
    }

    /// Data content that travels separately from the signed data.
    pub fn detached() -> Self {
        Self::new(known::DATA, None)
    }

    pub fn content_type(&self) -> &ObjectIdentifier {
        &self.content_type
    }

    pub fn content(&self) -> Option<&DerValue> {
        self.content.as_ref()
    }

    /// The octets of an OCTET STRING content.
    pub fn content_bytes(&self) -> Option<&[u8]> {
        self.content
            .as_ref()
            .and_then(|content| content.octet_string().ok())
    }

    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let (content_info, rest) = Self::read(DerInput::new(bytes), false)?;
        rest.finish()?;
        Ok(content_info)
    }

    /// Read a ContentInfo. Old-style input may carry the content without
    /// the `[0]` wrapper.
    pub fn read(input: DerInput<'_>, old_style: bool) -> Result<(Self, DerInput<'_>)> {
        let (body, next) = input.enter(tags::SEQUENCE)?;
        let (content_type, body) = body.read_oid()?;

        let (content, body) = match body.peek_byte() {
            None => (None, body),
            Some(EXPLICIT_CONTENT) => {
                let (wrapped, after) = body.enter(EXPLICIT_CONTENT)?;
                let (content, wrapped) = wrapped.read_value()?;
                wrapped.finish()?;
                (Some(content), after)
            }
            Some(_) if old_style => {
                let (content, after) = body.read_value()?;
                (Some(content), after)
            }
            Some(tag) => {
                return Err(TrustKitError::malformed(format!(
                    "ContentInfo content has tag 0x{tag:02x}, expected [0]"
                )));
            }
        };
        body.finish()?;

        Ok((
            Self {
                content_type,
                content,
            },
            next,
        ))
    }
}

impl DerEncode for ContentInfo {
    fn encode(&self, out: &mut DerEncoder) -> Result<()> {
        let mut body = DerEncoder::new();
        body.put_oid(&self.content_type);
        if let Some(content) = &self.content {
            let mut wrapped = DerEncoder::new();
            wrapped.put_der_value(content);
            body.write(EXPLICIT_CONTENT, &wrapped);
        }
        out.write(tags::SEQUENCE, &body);
        Ok(())
    }
}

impl fmt::Display for ContentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Content Info Sequence")?;
        writeln!(f, "\tContent type: {}", self.content_type)?;
        match &self.content {
            Some(content) => write!(f, "\tContent: {}", hex::encode(content.to_der())),
            None => write!(f, "\tContent: (detached)"),
        }
    }
}
