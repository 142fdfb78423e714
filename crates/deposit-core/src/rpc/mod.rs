//! Read-side chain access over JSON-RPC.

pub mod evm;
pub mod jsonrpc;
pub mod solana;

pub use evm::{EvmRpc, HttpEvmRpc, TransactionReceipt};
pub use jsonrpc::JsonRpcClient;
pub use solana::{
    BlockhashInfo, HttpSolanaRpc, SignatureOutcome, SolanaRpc, TokenAccountBalance,
};
