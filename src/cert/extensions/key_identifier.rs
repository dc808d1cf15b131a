use std::fmt;

use super::{AttributeKey, AttributeValue, CertAttrSet, ExtensionKind, write_header};
use crate::der::{DerEncoder, ObjectIdentifier, known};
use crate::error::Result;
use crate::key::PublicKey;

#[derive(Debug, Clone, Copy)]
enum Key {
    KeyId,
}

impl AttributeKey for Key {
    const NAMES: &'static [&'static str] = &["key_id"];
    const ALL: &'static [Self] = &[Key::KeyId];
}

/// The subject key identifier extension: `KeyIdentifier ::= OCTET STRING`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectKeyIdentifier {
    critical: bool,
    key_id: Option<Vec<u8>>,
}

impl SubjectKeyIdentifier {
    pub fn new(key_id: Vec<u8>) -> Self {
        Self {
            critical: false,
            key_id: Some(key_id),
        }
    }

    /// Identifier derived from the SHA-1 of the key's `subjectPublicKey` bits.
    pub fn from_public_key(key: &PublicKey) -> Result<Self> {
        Ok(Self::new(key.key_identifier()?))
    }

    pub fn key_id(&self) -> Option<&[u8]> {
        self.key_id.as_deref()
    }
}

impl ExtensionKind for SubjectKeyIdentifier {
    const OID: ObjectIdentifier = known::SUBJECT_KEY_IDENTIFIER;
    const NAME: &'static str = "SubjectKeyIdentifier";

    fn decode(critical: bool, value: &[u8]) -> Result<Self> {
        let key_id = if value.is_empty() {
            None
        } else {
            Some(crate::der::decode(value)?.octet_string()?.to_vec())
        };
        Ok(Self { critical, key_id })
    }

    fn critical(&self) -> bool {
        self.critical
    }

    fn value(&self) -> Result<Vec<u8>> {
        let Some(key_id) = &self.key_id else {
            return Ok(Vec::new());
        };
        let mut out = DerEncoder::new();
        out.put_octet_string(key_id);
        Ok(out.into_bytes())
    }
}

impl CertAttrSet for SubjectKeyIdentifier {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn elements(&self) -> &'static [&'static str] {
        Key::NAMES
    }

    fn get(&self, name: &str) -> Result<AttributeValue> {
        match Key::parse(Self::NAME, name)? {
            Key::KeyId => Ok(self.key_id.clone().into()),
        }
    }

    fn set(&mut self, name: &str, value: AttributeValue) -> Result<()> {
        match Key::parse(Self::NAME, name)? {
            Key::KeyId => self.key_id = Some(value.into_bytes()?),
        }
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        match Key::parse(Self::NAME, name)? {
            Key::KeyId => self.key_id = None,
        }
        Ok(())
    }
}

impl fmt::Display for SubjectKeyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_header(f, self)?;
        writeln!(f, "SubjectKeyIdentifier [")?;
        if let Some(key_id) = &self.key_id {
            writeln!(f, "KeyIdentifier [{}]", hex::encode(key_id))?;
        }
        writeln!(f, "]")
    }
}
