//! Solana chain support for the deposit pipeline.
//!
//! This crate handles Solana addresses, associated token account derivation,
//! the SPL `TransferChecked` instruction and the transaction wire format,
//! all without pulling in `solana-sdk` (which drags in 200+ transitive
//! dependencies).
//!
//! Signing is never done here: the connected wallet signs the serialized
//! message and this crate verifies and assembles the result.

pub mod address;
pub mod clusters;
pub mod error;
pub mod spl_token;
pub mod transaction;

pub use address::{address_to_bytes, bytes_to_address, signature_to_string, validate_address};
pub use clusters::{cluster_for_caip2, SolanaCluster, DEVNET, MAINNET_BETA};
pub use error::SolError;
pub use spl_token::{
    build_transfer_checked, derive_associated_token_address, ASSOCIATED_TOKEN_PROGRAM_ID,
    TOKEN_PROGRAM_ID,
};
pub use transaction::{
    assemble_signed_transaction, compile_message, decode_compact_u16, encode_compact_u16,
    serialize_message, verify_signature, CompiledInstruction, SolAccountMeta, SolInstruction,
    SolMessage,
};
