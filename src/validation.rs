use bs58;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid Bitcoin address format: {0}")]
    InvalidBitcoinAddress(String),

    #[error("Label too long (max {0} characters)")]
    LabelTooLong(usize),
}

const MAX_LABEL_LEN: usize = 100;

const BECH32_CHARSET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Format check performed when an address is submitted, before anything
/// is enqueued for syncing. Accepts legacy Base58Check (P2PKH version 0,
/// P2SH version 5) and bech32 addresses with the `bc1` prefix.
pub fn validate_bitcoin_address(address: &str) -> Result<(), ValidationError> {
    if address.trim().is_empty() {
        return Err(ValidationError::MissingParameter("address".to_string()));
    }

    let lower = address.to_lowercase();
    if lower.starts_with("bc1") {
        return validate_bech32(address, &lower);
    }

    // Legacy: 25 bytes once decoded (version + hash160 + 4-byte checksum)
    let decoded = match bs58::decode(address).into_vec() {
        Ok(bytes) => bytes,
        Err(_) => return Err(ValidationError::InvalidBitcoinAddress(address.to_string())),
    };

    if decoded.len() != 25 {
        return Err(ValidationError::InvalidBitcoinAddress(address.to_string()));
    }

    match decoded[0] {
        0 | 5 => Ok(()),
        _ => Err(ValidationError::InvalidBitcoinAddress(address.to_string())),
    }
}

fn validate_bech32(original: &str, lower: &str) -> Result<(), ValidationError> {
    // Mixed case is invalid in bech32
    if original != lower && original != original.to_uppercase() {
        return Err(ValidationError::InvalidBitcoinAddress(original.to_string()));
    }

    let data = &lower[3..];
    if data.len() < 6 || lower.len() > 90 {
        return Err(ValidationError::InvalidBitcoinAddress(original.to_string()));
    }

    if data.chars().all(|c| BECH32_CHARSET.contains(c)) {
        Ok(())
    } else {
        Err(ValidationError::InvalidBitcoinAddress(original.to_string()))
    }
}

pub fn validate_label(label: &str) -> Result<(), ValidationError> {
    if label.chars().count() > MAX_LABEL_LEN {
        return Err(ValidationError::LabelTooLong(MAX_LABEL_LEN));
    }
    Ok(())
}
