use std::str::FromStr;

use bon::Builder;
use time::Duration;
use time::OffsetDateTime;
use x509_cert::name::RdnSequence;

use super::extensions::{ExtendedKeyUsageOption, Extension};
use crate::der::{X500Name, known};
use crate::error::{Result, TrustKitError};
use crate::key::PublicKey;

/// Parameters for building an X.509 certificate.
///
/// This struct contains the subject, public key, and optional extensions for the certificate.
///
/// # Fields
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `usages` - A list of extended key usage options.
/// * `is_ca` - Indicates if the certificate is a CA.
/// * `extensions` - Additional X.509 extensions, placed before the generated ones.
#[derive(Clone, Debug, Builder)]
pub struct CertificationRequestInfo {
    pub subject: DistinguishedName,
    pub subject_public_key: PublicKey,
    #[builder(default)]
    pub usages: Vec<ExtendedKeyUsageOption>,
    #[builder(default)]
    pub is_ca: bool,
    #[builder(default)]
    pub extensions: Vec<Extension>,
}

/// Distinguished name parameters for building an X.509 certificate.
///
/// Only the attributes that are set appear in the encoded name.
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    #[builder(into)]
    pub common_name: String,
    #[builder(into)]
    pub country: Option<String>,
    #[builder(into)]
    pub state: Option<String>,
    #[builder(into)]
    pub locality: Option<String>,
    #[builder(into)]
    pub organization: Option<String>,
    #[builder(into)]
    pub organization_unit: Option<String>,
}

impl DistinguishedName {
    fn rfc4514_string(&self) -> String {
        let fields = [
            ("CN", Some(&self.common_name)),
            ("OU", self.organization_unit.as_ref()),
            ("O", self.organization.as_ref()),
            ("L", self.locality.as_ref()),
            ("ST", self.state.as_ref()),
            ("C", self.country.as_ref()),
        ];
        fields
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| format!("{key}={}", escape_rfc4514(v))))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Converts the distinguished name to `x509-cert`'s `Name`.
    pub fn as_x509_name(&self) -> Result<x509_cert::name::Name> {
        RdnSequence::from_str(&self.rfc4514_string())
            .map_err(|e| TrustKitError::InvalidInput(format!("invalid distinguished name: {e}")))
    }

    /// Picks the supported attributes out of a decoded name. A missing
    /// common name becomes the empty string.
    pub fn from_x500_name(name: &X500Name) -> Self {
        DistinguishedName {
            common_name: name.common_name().unwrap_or_default(),
            country: name.attribute(&known::COUNTRY),
            state: name.attribute(&known::STATE),
            locality: name.attribute(&known::LOCALITY),
            organization: name.attribute(&known::ORGANIZATION),
            organization_unit: name.attribute(&known::ORGANIZATIONAL_UNIT),
        }
    }

    pub fn from_x509_name(name: &x509_cert::name::Name) -> Result<Self> {
        Ok(Self::from_x500_name(&X500Name::try_from(name)?))
    }
}

fn escape_rfc4514(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        let leading = i == 0 && (c == '#' || c == ' ');
        if leading || matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Certificate validity period.
///
/// This struct represents the `notBefore` and `notAfter` fields in a certificate.
#[derive(Clone, Debug)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period starting now for the given number of days.
    pub fn for_days(days: i64) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            not_before: now,
            not_after: now + Duration::days(days),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_present_fields_are_encoded() {
        let dn = DistinguishedName::builder()
            .common_name("Signer")
            .organization("Acme")
            .country("US")
            .build();
        let name = X500Name::try_from(&dn.as_x509_name().unwrap()).unwrap();
        assert_eq!(name.common_name().as_deref(), Some("Signer"));
        assert_eq!(name.attribute(&known::ORGANIZATION).as_deref(), Some("Acme"));
        assert_eq!(name.attribute(&known::LOCALITY), None);
        assert_eq!(DistinguishedName::from_x500_name(&name), dn);
    }

    #[test]
    fn test_special_characters_are_escaped() {
        let dn = DistinguishedName::builder()
            .common_name("Doe, John")
            .build();
        assert_eq!(dn.rfc4514_string(), "CN=Doe\\, John");
        let name = X500Name::try_from(&dn.as_x509_name().unwrap()).unwrap();
        assert_eq!(name.common_name().as_deref(), Some("Doe, John"));
    }
}
