use std::str::FromStr;

use alloy_primitives::{Address, B256};

use crate::error::EthError;

/// Parses a 0x-prefixed EVM address.
///
/// All-lowercase and all-uppercase addresses carry no checksum and are
/// accepted as-is. Mixed-case input must match its EIP-55 checksum, which
/// catches most single-character typos in pasted addresses.
pub fn parse_address(address: &str) -> Result<Address, EthError> {
    let hex_part = strip_hex_prefix(address)
        .ok_or_else(|| EthError::InvalidAddress("address must start with 0x".into()))?;

    if hex_part.len() != 40 {
        return Err(EthError::InvalidAddress(format!(
            "expected 40 hex characters, got {}",
            hex_part.len()
        )));
    }

    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(EthError::InvalidAddress(
            "address contains non-hex characters".into(),
        ));
    }

    let is_all_lower = hex_part.chars().all(|c| !c.is_ascii_uppercase());
    let is_all_upper = hex_part.chars().all(|c| !c.is_ascii_lowercase());

    if is_all_lower || is_all_upper {
        return Address::from_str(hex_part)
            .map_err(|e| EthError::InvalidAddress(e.to_string()));
    }

    Address::parse_checksummed(format!("0x{hex_part}"), None)
        .map_err(|_| EthError::InvalidAddress(format!("checksum mismatch for {address}")))
}

/// Returns the EIP-55 checksummed form of an address.
pub fn checksum_address(address: &Address) -> String {
    address.to_checksum(None)
}

/// Parses a 0x-prefixed 32-byte transaction hash.
pub fn parse_tx_hash(hash: &str) -> Result<B256, EthError> {
    let hex_part =
        strip_hex_prefix(hash).ok_or_else(|| EthError::InvalidHash("hash must start with 0x".into()))?;

    if hex_part.len() != 64 {
        return Err(EthError::InvalidHash(format!(
            "expected 64 hex characters, got {}",
            hex_part.len()
        )));
    }

    let bytes = hex::decode(hex_part).map_err(|e| EthError::InvalidHash(format!("invalid hex: {e}")))?;
    Ok(B256::from_slice(&bytes))
}

fn strip_hex_prefix(value: &str) -> Option<&str> {
    value.strip_prefix("0x").or_else(|| value.strip_prefix("0X"))
}
