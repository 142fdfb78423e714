//! Stablecoin deposit pipeline.
//!
//! Moves USDC from a user's connected wallet to the platform's address on
//! Base or Solana, waits for the chain to confirm it and reports the
//! confirmed transfer to the backend so the user's balance is credited.
//!
//! The entry point is [`DepositOrchestrator`]. Chain encoding lives in the
//! `chain-eth` and `chain-sol` crates; this crate owns the async side:
//! RPC clients, wallet and backend collaborators, and the state machine.

pub mod amount;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod mocks;
pub mod oracle;
pub mod orchestrator;
pub mod report;
pub mod resolver;
pub mod rpc;
pub mod types;
pub mod wallet;

pub use amount::{denormalize, normalize, parse_decimal, TokenAmount};
pub use config::DepositConfig;
pub use error::{
    ConfigError, DepositError, DepositErrorKind, ReportError, RpcError, WalletError,
};
pub use executor::{EvmExecutor, PendingTransfer, PreparedTransfer, SolanaExecutor, TransferExecutor};
pub use oracle::TokenBalance;
pub use orchestrator::{DepositOrchestrator, DepositOutcome, DepositSurface, PendingReport};
pub use report::{DepositReporter, HttpDepositReporter, ReportAck};
pub use resolver::{AddressResolver, ResolvedToken};
pub use types::{
    ChainNamespace, ChainSelection, DepositAttempt, DepositReceipt, DepositReport, DepositStatus,
    Environment, TransactionProof,
};
pub use wallet::{EvmCall, WalletHandle, WalletProvider};
