//! EVM chain support for the deposit pipeline.
//!
//! This crate provides:
//! - Address parsing with EIP-55 checksum verification
//! - ERC-20 call encoding (transfer, balanceOf, decimals) and return decoding
//! - The EVM network table with each network's USDC contract
//! - Minimal ABI encoding utilities
//!
//! Nothing here touches the network; RPC access lives in `deposit-core`.

pub mod abi;
pub mod address;
pub mod chains;
pub mod erc20;
pub mod error;

pub use address::{parse_address, parse_tx_hash};
pub use chains::{network_for_caip2, EvmNetwork, BASE, BASE_SEPOLIA};
pub use error::EthError;
