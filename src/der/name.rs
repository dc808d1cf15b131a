use std::fmt;

use super::{DecoderConfig, DerEncode, DerEncoder, DerValue, ObjectIdentifier, known, tags};
use crate::error::{Result, TrustKitError};

/// An X.500 distinguished name (RDNSequence).
///
/// Keeps the encoding it was decoded from, so re-encoding is exact.
/// Equality is by normalized value: attribute types must match exactly,
/// string values are compared after trimming, collapsing internal
/// whitespace and ASCII case folding, and attributes within one RDN are
/// compared as a set.
#[derive(Debug, Clone)]
pub struct X500Name {
    rdns: Vec<Rdn>,
    encoded: Vec<u8>,
}

/// One relative distinguished name: a set of attribute/value pairs.
#[derive(Debug, Clone)]
pub struct Rdn {
    avas: Vec<Ava>,
}

/// An attribute type and its value.
#[derive(Debug, Clone)]
pub struct Ava {
    oid: ObjectIdentifier,
    value: DerValue,
}

impl X500Name {
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        Self::from_der_value(&super::decode(bytes)?)
    }

    pub fn from_der_value(value: &DerValue) -> Result<Self> {
        Self::from_der_value_with(value, &DecoderConfig::DEFAULT)
    }

    /// Decode a name, applying `config`'s element limit to the RDN
    /// sequence and to every RDN.
    pub fn from_der_value_with(value: &DerValue, config: &DecoderConfig) -> Result<Self> {
        if !value.is(tags::SEQUENCE) {
            return Err(TrustKitError::malformed("X.500 name is not a SEQUENCE"));
        }
        let rdns = value
            .children_with(config)?
            .iter()
            .map(|rdn| Rdn::from_der_value(rdn, config))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            rdns,
            encoded: value.to_der(),
        })
    }

    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    /// The most specific string value of attribute `oid`.
    pub fn attribute(&self, oid: &ObjectIdentifier) -> Option<String> {
        self.rdns
            .iter()
            .rev()
            .flat_map(|rdn| rdn.avas.iter())
            .find(|ava| &ava.oid == oid)
            .and_then(|ava| ava.value.string().ok())
    }

    pub fn common_name(&self) -> Option<String> {
        self.attribute(&known::COMMON_NAME)
    }
}

impl TryFrom<&x509_cert::name::Name> for X500Name {
    type Error = TrustKitError;

    fn try_from(name: &x509_cert::name::Name) -> Result<Self> {
        Self::from_der(&der::Encode::to_der(name)?)
    }
}

impl DerEncode for X500Name {
    fn encode(&self, out: &mut DerEncoder) -> Result<()> {
        out.put_raw(&self.encoded);
        Ok(())
    }
}

impl PartialEq for X500Name {
    fn eq(&self, other: &Self) -> bool {
        self.rdns.len() == other.rdns.len()
            && self.rdns.iter().zip(&other.rdns).all(|(a, b)| a == b)
    }
}

impl Eq for X500Name {}

/// RFC 1779 form, most specific RDN first.
impl fmt::Display for X500Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rdn) in self.rdns.iter().rev().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{rdn}")?;
        }
        Ok(())
    }
}

impl Rdn {
    fn from_der_value(value: &DerValue, config: &DecoderConfig) -> Result<Self> {
        if !value.is(tags::SET) {
            return Err(TrustKitError::malformed("RDN is not a SET"));
        }
        let avas = value
            .children_with(config)?
            .iter()
            .map(Ava::from_der_value)
            .collect::<Result<Vec<_>>>()?;
        if avas.is_empty() {
            return Err(TrustKitError::malformed("empty RDN"));
        }
        Ok(Self { avas })
    }

    pub fn avas(&self) -> &[Ava] {
        &self.avas
    }
}

impl PartialEq for Rdn {
    fn eq(&self, other: &Self) -> bool {
        self.avas.len() == other.avas.len()
            && self.avas.iter().all(|a| other.avas.contains(a))
            && other.avas.iter().all(|b| self.avas.contains(b))
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ava) in self.avas.iter().enumerate() {
            if i > 0 {
                f.write_str(" + ")?;
            }
            write!(f, "{ava}")?;
        }
        Ok(())
    }
}

impl Ava {
    fn from_der_value(value: &DerValue) -> Result<Self> {
        if !value.is(tags::SEQUENCE) {
            return Err(TrustKitError::malformed(
                "attribute value assertion is not a SEQUENCE",
            ));
        }
        let input = value.content_input();
        let (oid, input) = input.read_oid()?;
        let (attr, input) = input.read_value()?;
        input.finish()?;
        Ok(Self { oid, value: attr })
    }

    pub fn oid(&self) -> &ObjectIdentifier {
        &self.oid
    }

    pub fn value(&self) -> &DerValue {
        &self.value
    }

    fn keyword(&self) -> Option<&'static str> {
        let keywords = [
            (known::COMMON_NAME, "CN"),
            (known::COUNTRY, "C"),
            (known::LOCALITY, "L"),
            (known::STATE, "ST"),
            (known::ORGANIZATION, "O"),
            (known::ORGANIZATIONAL_UNIT, "OU"),
            (known::STREET, "STREET"),
        ];
        keywords
            .into_iter()
            .find(|(oid, _)| *oid == self.oid)
            .map(|(_, keyword)| keyword)
    }
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

impl PartialEq for Ava {
    fn eq(&self, other: &Self) -> bool {
        if self.oid != other.oid {
            return false;
        }
        match (self.value.string(), other.value.string()) {
            (Ok(a), Ok(b)) => normalize(&a) == normalize(&b),
            _ => self.value == other.value,
        }
    }
}

impl fmt::Display for Ava {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.keyword() {
            Some(keyword) => f.write_str(keyword)?,
            None => write!(f, "OID.{}", self.oid)?,
        }
        f.write_str("=")?;
        match self.value.string() {
            Ok(s) => {
                let needs_quotes = s.starts_with(' ')
                    || s.ends_with(' ')
                    || s.contains([',', '+', '=', '"', '\n', '<', '>', '#', ';']);
                if needs_quotes {
                    write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
                } else {
                    f.write_str(&s)
                }
            }
            Err(_) => write!(f, "#{}", hex::encode(self.value.to_der())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(rdns: &[&[(&ObjectIdentifier, u8, &str)]]) -> X500Name {
        let mut seq = DerEncoder::new();
        for rdn in rdns {
            let mut set = DerEncoder::new();
            for (oid, tag, value) in rdn.iter() {
                let mut ava = DerEncoder::new();
                ava.put_oid(oid);
                ava.put_der_value(&DerValue::new(*tag, value.as_bytes().to_vec()));
                set.write(tags::SEQUENCE, &ava);
            }
            seq.write(tags::SET, &set);
        }
        let mut out = DerEncoder::new();
        out.write(tags::SEQUENCE, &seq);
        X500Name::from_der(out.as_bytes()).unwrap()
    }

    #[test]
    fn test_display_most_specific_first() {
        let n = name(&[
            &[(&known::COUNTRY, tags::PRINTABLE_STRING, "US")],
            &[(&known::ORGANIZATION, tags::UTF8_STRING, "Example, Inc")],
            &[(&known::COMMON_NAME, tags::UTF8_STRING, "signer")],
        ]);
        assert_eq!(n.to_string(), "CN=signer, O=\"Example, Inc\", C=US");
        assert_eq!(n.common_name().as_deref(), Some("signer"));
    }

    #[test]
    fn test_element_limit_covers_rdns() {
        let n = name(&[
            &[(&known::COUNTRY, tags::PRINTABLE_STRING, "US")],
            &[
                (&known::ORGANIZATION, tags::UTF8_STRING, "Example"),
                (&known::ORGANIZATIONAL_UNIT, tags::UTF8_STRING, "Release"),
            ],
            &[(&known::COMMON_NAME, tags::UTF8_STRING, "signer")],
        ]);
        let value = crate::der::decode(n.encoded()).unwrap();
        let two = DecoderConfig::builder().max_elements(2).build();
        assert!(matches!(
            X500Name::from_der_value_with(&value, &two),
            Err(TrustKitError::MalformedEncoding(_))
        ));
        let three = DecoderConfig::builder().max_elements(3).build();
        assert_eq!(X500Name::from_der_value_with(&value, &three).unwrap(), n);

        let multi_valued = name(&[&[
            (&known::ORGANIZATION, tags::UTF8_STRING, "Example"),
            (&known::ORGANIZATIONAL_UNIT, tags::UTF8_STRING, "Release"),
        ]]);
        let value = crate::der::decode(multi_valued.encoded()).unwrap();
        let one = DecoderConfig::builder().max_elements(1).build();
        assert!(X500Name::from_der_value_with(&value, &one).is_err());
    }

    #[test]
    fn test_equality_normalizes_strings() {
        let a = name(&[&[(&known::COMMON_NAME, tags::PRINTABLE_STRING, "Test  Signer")]]);
        let b = name(&[&[(&known::COMMON_NAME, tags::UTF8_STRING, " test signer ")]]);
        let c = name(&[&[(&known::COMMON_NAME, tags::UTF8_STRING, "other")]]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a.encoded(), b.encoded());
    }

    #[test]
    fn test_multi_valued_rdn_is_a_set() {
        let a = name(&[&[
            (&known::COMMON_NAME, tags::UTF8_STRING, "a"),
            (&known::ORGANIZATIONAL_UNIT, tags::UTF8_STRING, "b"),
        ]]);
        let b = name(&[&[
            (&known::ORGANIZATIONAL_UNIT, tags::UTF8_STRING, "b"),
            (&known::COMMON_NAME, tags::UTF8_STRING, "a"),
        ]]);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "CN=a + OU=b");
    }

    #[test]
    fn test_encoding_is_exact() {
        let n = name(&[&[(&known::COMMON_NAME, tags::T61_STRING, "x")]]);
        assert_eq!(n.to_der().unwrap(), n.encoded());
        assert!(X500Name::from_der(&[0x31, 0x00]).is_err());
    }
}
