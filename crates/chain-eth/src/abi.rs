//! Minimal ABI encoding for EVM function calls.
//!
//! Just enough to build and decode ERC-20 calls without pulling in a full
//! ABI parser: every parameter and return value used here is a single
//! static 32-byte word.

use alloy_primitives::{Address, U256};
use sha3::{Digest, Keccak256};

use crate::error::EthError;

/// Size of one ABI word.
pub const WORD: usize = 32;

/// A single ABI-encoded parameter.
#[derive(Debug, Clone)]
pub enum AbiParam {
    /// A 20-byte address, left-padded to 32 bytes.
    Address(Address),
    /// A 256-bit unsigned integer, big-endian.
    Uint256(U256),
}

/// Computes the 4-byte function selector for a canonical signature such as
/// `transfer(address,uint256)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// Encodes a function call: `selector || word(params[0]) || word(params[1]) || ...`.
pub fn encode_function_call(selector: [u8; 4], params: &[AbiParam]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + params.len() * WORD);
    data.extend_from_slice(&selector);

    for param in params {
        data.extend_from_slice(&encode_param(param));
    }

    data
}

/// Encodes a single [`AbiParam`] as a 32-byte ABI word.
fn encode_param(param: &AbiParam) -> [u8; WORD] {
    match param {
        AbiParam::Address(addr) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(addr.as_slice());
            word
        }
        AbiParam::Uint256(value) => value.to_be_bytes::<WORD>(),
    }
}

/// Decodes the first 32-byte word of `data` as a uint256.
pub fn decode_uint256(data: &[u8]) -> Result<U256, EthError> {
    if data.len() < WORD {
        return Err(EthError::EncodingError(format!(
            "expected at least 32 bytes for uint256, got {}",
            data.len()
        )));
    }

    Ok(U256::from_be_slice(&data[..WORD]))
}

/// Decodes a 0x-prefixed hex return value (as produced by `eth_call`).
pub fn decode_hex_data(data: &str) -> Result<Vec<u8>, EthError> {
    let hex_part = data.strip_prefix("0x").unwrap_or(data);
    hex::decode(hex_part).map_err(|e| EthError::EncodingError(format!("invalid hex: {e}")))
}
