use std::fmt;

use super::{AttributeValue, CertAttrSet, ExtensionKind, write_header};
use crate::der::{ObjectIdentifier, known};
use crate::error::{Result, TrustKitError};

/// The OCSP no-check marker. It carries no data: the value is always empty
/// and every attribute operation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcspNoCheck {
    critical: bool,
}

impl OcspNoCheck {
    pub fn new() -> Self {
        Self { critical: false }
    }
}

impl Default for OcspNoCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtensionKind for OcspNoCheck {
    const OID: ObjectIdentifier = known::OCSP_NO_CHECK;
    const NAME: &'static str = "OCSPNoCheck";

    /// Whatever was encoded is ignored.
    fn decode(critical: bool, _value: &[u8]) -> Result<Self> {
        Ok(Self { critical })
    }

    fn critical(&self) -> bool {
        self.critical
    }

    fn value(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

impl CertAttrSet for OcspNoCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn elements(&self) -> &'static [&'static str] {
        &[]
    }

    fn get(&self, _name: &str) -> Result<AttributeValue> {
        Err(TrustKitError::NoAttributes(Self::NAME))
    }

    fn set(&mut self, _name: &str, _value: AttributeValue) -> Result<()> {
        Err(TrustKitError::NoAttributes(Self::NAME))
    }

    fn delete(&mut self, _name: &str) -> Result<()> {
        Err(TrustKitError::NoAttributes(Self::NAME))
    }
}

impl fmt::Display for OcspNoCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_header(f, self)?;
        writeln!(f, "NoCheck")
    }
}
