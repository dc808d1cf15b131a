use std::fmt;

use super::{AttributeKey, AttributeValue, CertAttrSet, ExtensionKind, write_header};
use crate::der::{BitString, DerEncoder, ObjectIdentifier, known, tags};
use crate::error::Result;

/// One named bit of the key usage bit string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyUsageBit {
    DigitalSignature = 0,
    NonRepudiation = 1,
    KeyEncipherment = 2,
    DataEncipherment = 3,
    KeyAgreement = 4,
    KeyCertSign = 5,
    CrlSign = 6,
    EncipherOnly = 7,
    DecipherOnly = 8,
}

impl AttributeKey for KeyUsageBit {
    const NAMES: &'static [&'static str] = &[
        "digital_signature",
        "non_repudiation",
        "key_encipherment",
        "data_encipherment",
        "key_agreement",
        "key_certsign",
        "crl_sign",
        "encipher_only",
        "decipher_only",
    ];
    const ALL: &'static [Self] = &[
        KeyUsageBit::DigitalSignature,
        KeyUsageBit::NonRepudiation,
        KeyUsageBit::KeyEncipherment,
        KeyUsageBit::DataEncipherment,
        KeyUsageBit::KeyAgreement,
        KeyUsageBit::KeyCertSign,
        KeyUsageBit::CrlSign,
        KeyUsageBit::EncipherOnly,
        KeyUsageBit::DecipherOnly,
    ];
}

impl fmt::Display for KeyUsageBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyUsageBit::DigitalSignature => "DigitalSignature",
            KeyUsageBit::NonRepudiation => "Non_repudiation",
            KeyUsageBit::KeyEncipherment => "Key_Encipherment",
            KeyUsageBit::DataEncipherment => "Data_Encipherment",
            KeyUsageBit::KeyAgreement => "Key_Agreement",
            KeyUsageBit::KeyCertSign => "Key_CertSign",
            KeyUsageBit::CrlSign => "Crl_Sign",
            KeyUsageBit::EncipherOnly => "Encipher_Only",
            KeyUsageBit::DecipherOnly => "Decipher_Only",
        })
    }
}

/// The key usage extension: which operations the certified key may perform.
///
/// Encoded as a BIT STRING with trailing zero bits removed. Critical unless
/// decoded otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyUsage {
    critical: bool,
    bits: Vec<bool>,
}

impl KeyUsage {
    pub fn new(bits: Vec<bool>) -> Self {
        Self {
            critical: true,
            bits,
        }
    }

    pub fn from_bits(set: &[KeyUsageBit]) -> Self {
        let mut usage = Self::new(Vec::new());
        for bit in set {
            usage.set_bit(*bit, true);
        }
        usage
    }

    pub fn has(&self, bit: KeyUsageBit) -> bool {
        self.bits.get(bit as usize).copied().unwrap_or(false)
    }

    pub fn set_bit(&mut self, bit: KeyUsageBit, value: bool) {
        let index = bit as usize;
        if index >= self.bits.len() {
            self.bits.resize(index + 1, false);
        }
        self.bits[index] = value;
    }

    /// Every bit, as encoded (may be shorter or longer than nine).
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    pub fn is_empty(&self) -> bool {
        !self.bits.iter().any(|b| *b)
    }
}

impl ExtensionKind for KeyUsage {
    const OID: ObjectIdentifier = known::KEY_USAGE;
    const NAME: &'static str = "KeyUsage";

    /// Some producers wrap the bit string in an extra OCTET STRING; both
    /// forms are accepted.
    fn decode(critical: bool, value: &[u8]) -> Result<Self> {
        let mut bits = crate::der::decode(value)?;
        if bits.is(tags::OCTET_STRING) {
            bits = crate::der::decode(bits.content())?;
        }
        Ok(Self {
            critical,
            bits: bits.unaligned_bit_string()?.to_bools(),
        })
    }

    fn critical(&self) -> bool {
        self.critical
    }

    fn value(&self) -> Result<Vec<u8>> {
        let mut out = DerEncoder::new();
        out.put_truncated_unaligned_bit_string(&BitString::from_bools(&self.bits));
        Ok(out.into_bytes())
    }
}

impl CertAttrSet for KeyUsage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn elements(&self) -> &'static [&'static str] {
        KeyUsageBit::NAMES
    }

    fn get(&self, name: &str) -> Result<AttributeValue> {
        let bit = KeyUsageBit::parse(Self::NAME, name)?;
        Ok(AttributeValue::Bool(self.has(bit)))
    }

    fn set(&mut self, name: &str, value: AttributeValue) -> Result<()> {
        let bit = KeyUsageBit::parse(Self::NAME, name)?;
        self.set_bit(bit, value.into_bool()?);
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        let bit = KeyUsageBit::parse(Self::NAME, name)?;
        self.set_bit(bit, false);
        Ok(())
    }
}

impl fmt::Display for KeyUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_header(f, self)?;
        writeln!(f, "KeyUsage [")?;
        for bit in KeyUsageBit::ALL.iter().filter(|bit| self.has(**bit)) {
            writeln!(f, "  {bit}")?;
        }
        writeln!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrustKitError;

    #[test]
    fn test_set_get_and_encode() {
        let mut ku = KeyUsage::new(Vec::new());
        ku.set("digital_signature", AttributeValue::Bool(true)).unwrap();
        assert_eq!(
            ku.get("digital_signature").unwrap(),
            AttributeValue::Bool(true)
        );
        assert_eq!(ku.get("Key_CertSign").unwrap(), AttributeValue::Bool(false));
        // BIT STRING, 7 unused bits, bit 0 set
        assert_eq!(ku.value().unwrap(), vec![0x03, 0x02, 0x07, 0x80]);

        ku.set("crl_sign", AttributeValue::Bool(true)).unwrap();
        assert_eq!(ku.value().unwrap(), vec![0x03, 0x02, 0x01, 0x82]);

        ku.delete("digital_signature").unwrap();
        ku.delete("crl_sign").unwrap();
        assert!(ku.is_empty());
        assert_eq!(ku.value().unwrap(), vec![0x03, 0x01, 0x00]);
    }

    #[test]
    fn test_unknown_attribute() {
        let mut ku = KeyUsage::from_bits(&[KeyUsageBit::KeyCertSign]);
        let before = ku.clone();
        let err = ku.get("not_a_field").unwrap_err();
        assert_eq!(
            err,
            TrustKitError::UnknownAttribute {
                set: "KeyUsage",
                name: "not_a_field".to_string()
            }
        );
        assert!(ku.set("not_a_field", AttributeValue::Bool(true)).is_err());
        assert!(ku.delete("not_a_field").is_err());
        assert!(ku.set("key_certsign", AttributeValue::Bytes(vec![])).is_err());
        assert_eq!(ku, before);
    }

    #[test]
    fn test_decode_plain_and_wrapped() {
        let plain = [0x03, 0x02, 0x05, 0xA0];
        let ku = KeyUsage::decode(true, &plain).unwrap();
        assert!(ku.has(KeyUsageBit::DigitalSignature));
        assert!(ku.has(KeyUsageBit::KeyEncipherment));
        assert!(!ku.has(KeyUsageBit::NonRepudiation));

        let wrapped = [0x04, 0x04, 0x03, 0x02, 0x05, 0xA0];
        assert_eq!(KeyUsage::decode(true, &wrapped).unwrap(), ku);

        let trailing = [0x03, 0x02, 0x05, 0xA0, 0x00];
        assert!(matches!(
            KeyUsage::decode(true, &trailing),
            Err(TrustKitError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn test_decipher_only_spills_into_second_octet() {
        let ku = KeyUsage::from_bits(&[KeyUsageBit::DecipherOnly]);
        assert_eq!(ku.value().unwrap(), vec![0x03, 0x03, 0x07, 0x00, 0x80]);
        assert_eq!(ku.elements().len(), 9);
        assert!(ku.to_string().contains("Decipher_Only"));
    }
}
