use alloy_primitives::{Address, U256};

use crate::abi::{decode_uint256, encode_function_call, AbiParam};
use crate::error::EthError;

/// Function selector for `transfer(address,uint256)`: `0xa9059cbb`.
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Function selector for `balanceOf(address)`: `0x70a08231`.
pub const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

/// Function selector for `decimals()`: `0x313ce567`.
pub const DECIMALS_SELECTOR: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];

/// Encodes an ERC-20 `transfer(address,uint256)` call.
///
/// Returns the complete calldata (4-byte selector + 64 bytes of params).
pub fn encode_transfer(to: Address, amount: U256) -> Vec<u8> {
    let params = [AbiParam::Address(to), AbiParam::Uint256(amount)];
    encode_function_call(TRANSFER_SELECTOR, &params)
}

/// Encodes an ERC-20 `balanceOf(address)` call.
pub fn encode_balance_of(owner: Address) -> Vec<u8> {
    encode_function_call(BALANCE_OF_SELECTOR, &[AbiParam::Address(owner)])
}

/// Encodes an ERC-20 `decimals()` call.
pub fn encode_decimals() -> Vec<u8> {
    encode_function_call(DECIMALS_SELECTOR, &[])
}

/// Decodes the return value of `balanceOf`.
pub fn decode_balance(data: &[u8]) -> Result<U256, EthError> {
    decode_uint256(data)
}

/// Decodes the return value of `decimals()`.
///
/// The ABI type is `uint8` padded to a full word; anything above 255 means
/// the contract is not a conforming token.
pub fn decode_decimals(data: &[u8]) -> Result<u8, EthError> {
    let value = decode_uint256(data)?;
    if value > U256::from(u8::MAX) {
        return Err(EthError::EncodingError(format!(
            "decimals out of range: {value}"
        )));
    }
    Ok(value.to::<u8>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::selector;
    use crate::address::parse_address;

    fn dead() -> Address {
        parse_address("0x000000000000000000000000000000000000dEaD").unwrap()
    }

    #[test]
    fn selectors_match_signatures() {
        assert_eq!(selector("transfer(address,uint256)"), TRANSFER_SELECTOR);
        assert_eq!(selector("balanceOf(address)"), BALANCE_OF_SELECTOR);
        assert_eq!(selector("decimals()"), DECIMALS_SELECTOR);
    }

    #[test]
    fn encode_transfer_layout() {
        let data = encode_transfer(dead(), U256::from(100u64));

        assert_eq!(data.len(), 68);
        assert_eq!(&data[..4], &TRANSFER_SELECTOR);
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(data[34], 0xde);
        assert_eq!(data[35], 0xad);
        assert_eq!(data[67], 0x64);
        assert_eq!(&data[36..67], &[0u8; 31]);
    }

    #[test]
    fn encode_transfer_full_calldata_matches_expected() {
        // 10 USDC (6 decimals) = 10_000_000 = 0x989680.
        let data = encode_transfer(dead(), U256::from(10_000_000u64));

        assert_eq!(hex::encode(&data[..4]), "a9059cbb");
        assert!(hex::encode(&data[4..36]).ends_with("dead"));
        assert!(hex::encode(&data[36..68]).ends_with("989680"));
    }

    #[test]
    fn encode_balance_of_layout() {
        let data = encode_balance_of(dead());
        assert_eq!(data.len(), 36);
        assert_eq!(&data[..4], &BALANCE_OF_SELECTOR);
    }

    #[test]
    fn encode_decimals_is_selector_only() {
        assert_eq!(encode_decimals(), DECIMALS_SELECTOR.to_vec());
    }

    #[test]
    fn decode_decimals_six() {
        let mut word = [0u8; 32];
        word[31] = 6;
        assert_eq!(decode_decimals(&word).unwrap(), 6);
    }

    #[test]
    fn decode_decimals_rejects_oversized_value() {
        let mut word = [0u8; 32];
        word[30] = 1;
        assert!(decode_decimals(&word).is_err());
    }

    #[test]
    fn decode_balance_reads_word() {
        let mut word = [0u8; 32];
        word[29] = 0x98;
        word[30] = 0x96;
        word[31] = 0x80;
        assert_eq!(decode_balance(&word).unwrap(), U256::from(10_000_000u64));
    }

    #[test]
    fn decode_balance_too_short() {
        assert!(decode_balance(&[0u8; 8]).is_err());
    }
}
