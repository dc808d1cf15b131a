use std::fmt;

use super::{AttributeKey, AttributeValue, CertAttrSet, ExtensionKind, write_header};
use crate::der::{DerEncoder, ObjectIdentifier, known, tags};
use crate::error::{Result, TrustKitError};

/// Represents an option for the Extended Key Usage extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExtendedKeyUsageOption {
    ServerAuth,
    ClientAuth,
    CodeSigning,
    EmailProtection,
    TimeStamping,
    OcspSigning,
}

impl ExtendedKeyUsageOption {
    const ALL: [ExtendedKeyUsageOption; 6] = [
        ExtendedKeyUsageOption::ServerAuth,
        ExtendedKeyUsageOption::ClientAuth,
        ExtendedKeyUsageOption::CodeSigning,
        ExtendedKeyUsageOption::EmailProtection,
        ExtendedKeyUsageOption::TimeStamping,
        ExtendedKeyUsageOption::OcspSigning,
    ];

    /// The option for a key purpose OID, if it is one of the supported ones.
    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|option| ObjectIdentifier::from(*option) == *oid)
    }
}

impl From<ExtendedKeyUsageOption> for ObjectIdentifier {
    fn from(value: ExtendedKeyUsageOption) -> Self {
        match value {
            ExtendedKeyUsageOption::ServerAuth => known::KP_SERVER_AUTH,
            ExtendedKeyUsageOption::ClientAuth => known::KP_CLIENT_AUTH,
            ExtendedKeyUsageOption::CodeSigning => known::KP_CODE_SIGNING,
            ExtendedKeyUsageOption::EmailProtection => known::KP_EMAIL_PROTECTION,
            ExtendedKeyUsageOption::TimeStamping => known::KP_TIME_STAMPING,
            ExtendedKeyUsageOption::OcspSigning => known::KP_OCSP_SIGNING,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Key {
    Usages,
}

impl AttributeKey for Key {
    const NAMES: &'static [&'static str] = &["usages"];
    const ALL: &'static [Self] = &[Key::Usages];
}

/// The extended key usage extension: `SEQUENCE OF KeyPurposeId`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedKeyUsage {
    critical: bool,
    usages: Option<Vec<ObjectIdentifier>>,
}

impl ExtendedKeyUsage {
    pub fn new(usages: Vec<ObjectIdentifier>) -> Self {
        Self {
            critical: false,
            usages: Some(usages),
        }
    }

    pub fn from_options(options: &[ExtendedKeyUsageOption]) -> Self {
        Self::new(options.iter().map(|o| (*o).into()).collect())
    }

    pub fn with_critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    pub fn usages(&self) -> &[ObjectIdentifier] {
        self.usages.as_deref().unwrap_or_default()
    }

    pub fn permits(&self, usage: &ObjectIdentifier) -> bool {
        self.usages()
            .iter()
            .any(|u| u == usage || *u == known::ANY_EXTENDED_KEY_USAGE)
    }
}

fn friendly_name(oid: &ObjectIdentifier) -> Option<&'static str> {
    let names = [
        (known::KP_SERVER_AUTH, "serverAuth"),
        (known::KP_CLIENT_AUTH, "clientAuth"),
        (known::KP_CODE_SIGNING, "codeSigning"),
        (known::KP_EMAIL_PROTECTION, "emailProtection"),
        (known::KP_IPSEC_END_SYSTEM, "ipsecEndSystem"),
        (known::KP_IPSEC_TUNNEL, "ipsecTunnel"),
        (known::KP_IPSEC_USER, "ipsecUser"),
        (known::KP_TIME_STAMPING, "timeStamping"),
        (known::KP_OCSP_SIGNING, "OCSPSigning"),
        (known::ANY_EXTENDED_KEY_USAGE, "anyExtendedKeyUsage"),
    ];
    names.into_iter().find(|(k, _)| k == oid).map(|(_, n)| n)
}

impl ExtensionKind for ExtendedKeyUsage {
    const OID: ObjectIdentifier = known::EXTENDED_KEY_USAGE;
    const NAME: &'static str = "ExtendedKeyUsage";

    fn decode(critical: bool, value: &[u8]) -> Result<Self> {
        if value.is_empty() {
            return Ok(Self {
                critical,
                usages: None,
            });
        }
        let seq = crate::der::decode(value)?;
        if !seq.is(tags::SEQUENCE) {
            return Err(TrustKitError::malformed(
                "invalid encoding for ExtendedKeyUsageExtension",
            ));
        }
        let usages = seq
            .children()?
            .iter()
            .map(|v| v.oid())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            critical,
            usages: Some(usages),
        })
    }

    fn critical(&self) -> bool {
        self.critical
    }

    fn value(&self) -> Result<Vec<u8>> {
        let Some(usages) = self.usages.as_ref().filter(|u| !u.is_empty()) else {
            return Ok(Vec::new());
        };
        let mut body = DerEncoder::new();
        for usage in usages {
            body.put_oid(usage);
        }
        let mut out = DerEncoder::new();
        out.write(tags::SEQUENCE, &body);
        Ok(out.into_bytes())
    }
}

impl CertAttrSet for ExtendedKeyUsage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn elements(&self) -> &'static [&'static str] {
        Key::NAMES
    }

    fn get(&self, name: &str) -> Result<AttributeValue> {
        match Key::parse(Self::NAME, name)? {
            Key::Usages => Ok(self.usages.clone().into()),
        }
    }

    fn set(&mut self, name: &str, value: AttributeValue) -> Result<()> {
        match Key::parse(Self::NAME, name)? {
            Key::Usages => self.usages = Some(value.into_oids()?),
        }
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        match Key::parse(Self::NAME, name)? {
            Key::Usages => self.usages = None,
        }
        Ok(())
    }
}

impl fmt::Display for ExtendedKeyUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_header(f, self)?;
        writeln!(f, "ExtendedKeyUsages [")?;
        for usage in self.usages() {
            match friendly_name(usage) {
                Some(name) => writeln!(f, "  {name}")?,
                None => writeln!(f, "  {usage}")?,
            }
        }
        writeln!(f, "]")
    }
}
