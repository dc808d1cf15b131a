use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TrustKitError};

/// An ASN.1 OBJECT IDENTIFIER, stored as its arc values.
///
/// Two identifiers are equal iff their arcs are equal. Well-known values are
/// `const` and borrow a static arc table; parsed values own their arcs.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectIdentifier {
    arcs: Cow<'static, [u64]>,
}

impl ObjectIdentifier {
    /// Wrap a static arc table. The arcs are not validated; use this only
    /// for literal, well-formed identifiers.
    pub const fn from_static(arcs: &'static [u64]) -> Self {
        Self {
            arcs: Cow::Borrowed(arcs),
        }
    }

    /// Create an identifier from arc values, checking the X.690 rules for
    /// the first two arcs.
    pub fn from_arcs(arcs: impl Into<Vec<u64>>) -> Result<Self> {
        let arcs = arcs.into();
        if arcs.len() < 2 {
            return Err(TrustKitError::malformed(
                "object identifier needs at least two arcs",
            ));
        }
        match (arcs[0], arcs[1]) {
            (0 | 1, second) if second < 40 => {}
            (2, second) if second <= u64::MAX - 80 => {}
            (first, second) => {
                return Err(TrustKitError::malformed(format!(
                    "invalid leading arcs {first}.{second} in object identifier"
                )));
            }
        }
        Ok(Self {
            arcs: Cow::Owned(arcs),
        })
    }

    /// Decode the content octets of an OBJECT IDENTIFIER.
    pub fn from_der_content(content: &[u8]) -> Result<Self> {
        if content.is_empty() {
            return Err(TrustKitError::malformed("empty object identifier"));
        }
        let mut subids = Vec::new();
        let mut i = 0;
        while i < content.len() {
            let (value, consumed) = decode_subid(&content[i..])?;
            subids.push(value);
            i += consumed;
        }

        let first = subids[0];
        let mut arcs = Vec::with_capacity(subids.len() + 1);
        match first {
            0..40 => arcs.extend([0, first]),
            40..80 => arcs.extend([1, first - 40]),
            _ => arcs.extend([2, first - 80]),
        }
        arcs.extend_from_slice(&subids[1..]);
        Ok(Self {
            arcs: Cow::Owned(arcs),
        })
    }

    /// Encode the content octets (no tag or length).
    pub fn to_der_content(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_subid(&mut buf, self.arcs[0] * 40 + self.arcs[1]);
        for &arc in &self.arcs[2..] {
            encode_subid(&mut buf, arc);
        }
        buf
    }

    pub fn arcs(&self) -> &[u64] {
        &self.arcs
    }

    /// Name registered for this identifier in the `const-oid` database.
    pub fn name(&self) -> Option<&'static str> {
        let oid = self.to_const_oid().ok()?;
        const_oid::db::DB.by_oid(&oid)
    }

    pub fn to_const_oid(&self) -> Result<const_oid::ObjectIdentifier> {
        const_oid::ObjectIdentifier::from_bytes(&self.to_der_content())
            .map_err(|e| TrustKitError::EncodingError(format!("{self}: {e}")))
    }
}

impl From<&const_oid::ObjectIdentifier> for ObjectIdentifier {
    fn from(oid: &const_oid::ObjectIdentifier) -> Self {
        Self {
            arcs: Cow::Owned(oid.arcs().map(u64::from).collect()),
        }
    }
}

impl FromStr for ObjectIdentifier {
    type Err = TrustKitError;

    fn from_str(s: &str) -> Result<Self> {
        let arcs = s
            .split('.')
            .map(|arc| {
                arc.parse::<u64>().map_err(|_| {
                    TrustKitError::InvalidInput(format!("invalid object identifier: {s}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_arcs(arcs)
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in self.arcs.iter() {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{arc}")?;
            first = false;
        }
        Ok(())
    }
}

impl fmt::Debug for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectIdentifier({self})")
    }
}

fn encode_subid(buf: &mut Vec<u8>, mut value: u64) {
    let mut groups = [0u8; 10];
    let mut n = 0;
    loop {
        groups[n] = (value & 0x7F) as u8;
        n += 1;
        value >>= 7;
        if value == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        buf.push(if i > 0 { groups[i] | 0x80 } else { groups[i] });
    }
}

fn decode_subid(data: &[u8]) -> Result<(u64, usize)> {
    if data[0] == 0x80 {
        return Err(TrustKitError::malformed(
            "non-minimal subidentifier in object identifier",
        ));
    }
    let mut value: u64 = 0;
    for (i, &byte) in data.iter().enumerate() {
        if value >> 57 != 0 {
            return Err(TrustKitError::malformed(
                "object identifier arc exceeds 64 bits",
            ));
        }
        value = (value << 7) | (byte & 0x7F) as u64;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(TrustKitError::malformed("truncated object identifier"))
}

/// Well-known object identifiers.
pub mod known {
    use super::ObjectIdentifier as Oid;

    // PKCS#7 content types
    pub const DATA: Oid = Oid::from_static(&[1, 2, 840, 113549, 1, 7, 1]);
    pub const SIGNED_DATA: Oid = Oid::from_static(&[1, 2, 840, 113549, 1, 7, 2]);
    pub const ENVELOPED_DATA: Oid = Oid::from_static(&[1, 2, 840, 113549, 1, 7, 3]);
    pub const SIGNED_AND_ENVELOPED_DATA: Oid = Oid::from_static(&[1, 2, 840, 113549, 1, 7, 4]);
    pub const DIGESTED_DATA: Oid = Oid::from_static(&[1, 2, 840, 113549, 1, 7, 5]);
    pub const ENCRYPTED_DATA: Oid = Oid::from_static(&[1, 2, 840, 113549, 1, 7, 6]);
    /// SignedData as emitted by early producers, with a mistyped RSA arc.
    pub const OLD_SIGNED_DATA: Oid = Oid::from_static(&[1, 2, 840, 1113549, 1, 7, 2]);
    pub const NETSCAPE_CERT_SEQUENCE: Oid = Oid::from_static(&[2, 16, 840, 1, 113730, 2, 5]);
    pub const TIMESTAMP_TOKEN_INFO: Oid = Oid::from_static(&[1, 2, 840, 113549, 1, 9, 16, 1, 4]);

    // PKCS#9 attributes
    pub const EMAIL_ADDRESS: Oid = Oid::from_static(&[1, 2, 840, 113549, 1, 9, 1]);
    pub const CONTENT_TYPE: Oid = Oid::from_static(&[1, 2, 840, 113549, 1, 9, 3]);
    pub const MESSAGE_DIGEST: Oid = Oid::from_static(&[1, 2, 840, 113549, 1, 9, 4]);
    pub const SIGNING_TIME: Oid = Oid::from_static(&[1, 2, 840, 113549, 1, 9, 5]);

    // Digests
    pub const MD2: Oid = Oid::from_static(&[1, 2, 840, 113549, 2, 2]);
    pub const MD5: Oid = Oid::from_static(&[1, 2, 840, 113549, 2, 5]);
    pub const SHA1: Oid = Oid::from_static(&[1, 3, 14, 3, 2, 26]);
    pub const SHA256: Oid = Oid::from_static(&[2, 16, 840, 1, 101, 3, 4, 2, 1]);
    pub const SHA384: Oid = Oid::from_static(&[2, 16, 840, 1, 101, 3, 4, 2, 2]);
    pub const SHA512: Oid = Oid::from_static(&[2, 16, 840, 1, 101, 3, 4, 2, 3]);
    pub const SHA224: Oid = Oid::from_static(&[2, 16, 840, 1, 101, 3, 4, 2, 4]);

    // Key algorithms
    pub const RSA_ENCRYPTION: Oid = Oid::from_static(&[1, 2, 840, 113549, 1, 1, 1]);
    pub const EC_PUBLIC_KEY: Oid = Oid::from_static(&[1, 2, 840, 10045, 2, 1]);
    pub const DSA: Oid = Oid::from_static(&[1, 2, 840, 10040, 4, 1]);
    pub const ED25519: Oid = Oid::from_static(&[1, 3, 101, 112]);

    // Signature algorithms
    pub const MD2_WITH_RSA: Oid = Oid::from_static(&[1, 2, 840, 113549, 1, 1, 2]);
    pub const MD5_WITH_RSA: Oid = Oid::from_static(&[1, 2, 840, 113549, 1, 1, 4]);
    pub const SHA1_WITH_RSA: Oid = Oid::from_static(&[1, 2, 840, 113549, 1, 1, 5]);
    pub const SHA256_WITH_RSA: Oid = Oid::from_static(&[1, 2, 840, 113549, 1, 1, 11]);
    pub const SHA384_WITH_RSA: Oid = Oid::from_static(&[1, 2, 840, 113549, 1, 1, 12]);
    pub const SHA512_WITH_RSA: Oid = Oid::from_static(&[1, 2, 840, 113549, 1, 1, 13]);
    pub const SHA224_WITH_RSA: Oid = Oid::from_static(&[1, 2, 840, 113549, 1, 1, 14]);
    pub const ECDSA_WITH_SHA1: Oid = Oid::from_static(&[1, 2, 840, 10045, 4, 1]);
    pub const ECDSA_WITH_SHA224: Oid = Oid::from_static(&[1, 2, 840, 10045, 4, 3, 1]);
    pub const ECDSA_WITH_SHA256: Oid = Oid::from_static(&[1, 2, 840, 10045, 4, 3, 2]);
    pub const ECDSA_WITH_SHA384: Oid = Oid::from_static(&[1, 2, 840, 10045, 4, 3, 3]);
    pub const ECDSA_WITH_SHA512: Oid = Oid::from_static(&[1, 2, 840, 10045, 4, 3, 4]);
    pub const DSA_WITH_SHA1: Oid = Oid::from_static(&[1, 2, 840, 10040, 4, 3]);
    pub const DSA_WITH_SHA224: Oid = Oid::from_static(&[2, 16, 840, 1, 101, 3, 4, 3, 1]);
    pub const DSA_WITH_SHA256: Oid = Oid::from_static(&[2, 16, 840, 1, 101, 3, 4, 3, 2]);

    // Named curves
    pub const SECP256R1: Oid = Oid::from_static(&[1, 2, 840, 10045, 3, 1, 7]);
    pub const SECP384R1: Oid = Oid::from_static(&[1, 3, 132, 0, 34]);

    // Certificate and CRL extensions
    pub const SUBJECT_KEY_IDENTIFIER: Oid = Oid::from_static(&[2, 5, 29, 14]);
    pub const KEY_USAGE: Oid = Oid::from_static(&[2, 5, 29, 15]);
    pub const PRIVATE_KEY_USAGE_PERIOD: Oid = Oid::from_static(&[2, 5, 29, 16]);
    pub const BASIC_CONSTRAINTS: Oid = Oid::from_static(&[2, 5, 29, 19]);
    pub const CRL_REASON_CODE: Oid = Oid::from_static(&[2, 5, 29, 21]);
    pub const INVALIDITY_DATE: Oid = Oid::from_static(&[2, 5, 29, 24]);
    pub const DELTA_CRL_INDICATOR: Oid = Oid::from_static(&[2, 5, 29, 27]);
    pub const EXTENDED_KEY_USAGE: Oid = Oid::from_static(&[2, 5, 29, 37]);
    pub const OCSP_NO_CHECK: Oid = Oid::from_static(&[1, 3, 6, 1, 5, 5, 7, 48, 1, 5]);

    // Extended key usage purposes
    pub const ANY_EXTENDED_KEY_USAGE: Oid = Oid::from_static(&[2, 5, 29, 37, 0]);
    pub const KP_SERVER_AUTH: Oid = Oid::from_static(&[1, 3, 6, 1, 5, 5, 7, 3, 1]);
    pub const KP_CLIENT_AUTH: Oid = Oid::from_static(&[1, 3, 6, 1, 5, 5, 7, 3, 2]);
    pub const KP_CODE_SIGNING: Oid = Oid::from_static(&[1, 3, 6, 1, 5, 5, 7, 3, 3]);
    pub const KP_EMAIL_PROTECTION: Oid = Oid::from_static(&[1, 3, 6, 1, 5, 5, 7, 3, 4]);
    pub const KP_IPSEC_END_SYSTEM: Oid = Oid::from_static(&[1, 3, 6, 1, 5, 5, 7, 3, 5]);
    pub const KP_IPSEC_TUNNEL: Oid = Oid::from_static(&[1, 3, 6, 1, 5, 5, 7, 3, 6]);
    pub const KP_IPSEC_USER: Oid = Oid::from_static(&[1, 3, 6, 1, 5, 5, 7, 3, 7]);
    pub const KP_TIME_STAMPING: Oid = Oid::from_static(&[1, 3, 6, 1, 5, 5, 7, 3, 8]);
    pub const KP_OCSP_SIGNING: Oid = Oid::from_static(&[1, 3, 6, 1, 5, 5, 7, 3, 9]);

    // Name attributes
    pub const COMMON_NAME: Oid = Oid::from_static(&[2, 5, 4, 3]);
    pub const SURNAME: Oid = Oid::from_static(&[2, 5, 4, 4]);
    pub const SERIAL_NUMBER: Oid = Oid::from_static(&[2, 5, 4, 5]);
    pub const COUNTRY: Oid = Oid::from_static(&[2, 5, 4, 6]);
    pub const LOCALITY: Oid = Oid::from_static(&[2, 5, 4, 7]);
    pub const STATE: Oid = Oid::from_static(&[2, 5, 4, 8]);
    pub const STREET: Oid = Oid::from_static(&[2, 5, 4, 9]);
    pub const ORGANIZATION: Oid = Oid::from_static(&[2, 5, 4, 10]);
    pub const ORGANIZATIONAL_UNIT: Oid = Oid::from_static(&[2, 5, 4, 11]);
    pub const TITLE: Oid = Oid::from_static(&[2, 5, 4, 12]);
    pub const DOMAIN_COMPONENT: Oid =
        Oid::from_static(&[0, 9, 2342, 19200300, 100, 1, 25]);
    pub const USER_ID: Oid = Oid::from_static(&[0, 9, 2342, 19200300, 100, 1, 1]);
}
