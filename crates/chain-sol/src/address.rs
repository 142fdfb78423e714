//! Solana address and signature encoding.
//!
//! Solana addresses are Base58-encoded 32-byte keys (wallet public keys or
//! program-derived addresses). Transaction signatures are Base58-encoded
//! 64-byte Ed25519 signatures and double as the transaction id.

use crate::error::SolError;

/// Validate a Solana address string.
///
/// Returns an error unless the string is Base58 that decodes to exactly
/// 32 bytes.
pub fn validate_address(address: &str) -> Result<(), SolError> {
    address_to_bytes(address).map(|_| ())
}

/// Decode a Solana address string to its 32-byte representation.
pub fn address_to_bytes(address: &str) -> Result<[u8; 32], SolError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| SolError::InvalidAddress(format!("base58 decode failed: {e}")))?;

    bytes.try_into().map_err(|v: Vec<u8>| {
        SolError::InvalidAddress(format!("expected 32 bytes, got {}", v.len()))
    })
}

/// Encode 32 bytes as a Solana address (Base58 string).
pub fn bytes_to_address(bytes: &[u8; 32]) -> String {
    bs58::encode(bytes).into_string()
}

/// Encode a 64-byte transaction signature as its Base58 transaction id.
pub fn signature_to_string(signature: &[u8; 64]) -> String {
    bs58::encode(signature).into_string()
}

/// Decode a Base58 transaction signature.
pub fn parse_signature(signature: &str) -> Result<[u8; 64], SolError> {
    let bytes = bs58::decode(signature)
        .into_vec()
        .map_err(|e| SolError::InvalidSignature(format!("base58 decode failed: {e}")))?;

    bytes.try_into().map_err(|v: Vec<u8>| {
        SolError::InvalidSignature(format!("expected 64 bytes, got {}", v.len()))
    })
}
