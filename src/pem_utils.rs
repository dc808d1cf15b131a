use crate::error::{Result, TrustKitError};

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(&pem, pem::EncodeConfig::new())
}

/// Convert a PEM‑encoded string to DER‑encoded bytes.
pub fn pem_to_der(pem_str: &str) -> Result<Vec<u8>> {
    let pem = pem::parse(pem_str)?;
    Ok(pem.contents().to_vec())
}

/// Like [`pem_to_der`], but the armor must carry `label`.
pub fn pem_to_der_with_label(pem_str: &str, label: &str) -> Result<Vec<u8>> {
    let pem = pem::parse(pem_str)?;
    if pem.tag() != label {
        return Err(TrustKitError::InvalidInput(format!(
            "expected PEM label {label}, found {}",
            pem.tag()
        )));
    }
    Ok(pem.contents().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_checked() {
        let pem = der_to_pem(&[0x05, 0x00], "PKCS7");
        assert!(pem.starts_with("-----BEGIN PKCS7-----"));
        assert_eq!(pem_to_der_with_label(&pem, "PKCS7").unwrap(), vec![0x05, 0x00]);
        assert!(matches!(
            pem_to_der_with_label(&pem, "CERTIFICATE"),
            Err(TrustKitError::InvalidInput(_))
        ));
        assert!(pem_to_der("not pem").is_err());
    }
}
