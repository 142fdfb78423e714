//! Per-chain transfer execution.
//!
//! An executor runs the three chain-facing stages of a deposit:
//! [`check_balance`](TransferExecutor::check_balance) (read-only),
//! [`submit`](TransferExecutor::submit) (the single irreversible step) and
//! [`confirm`](TransferExecutor::confirm). The orchestrator picks one by
//! [`ChainSelection`].

pub mod evm;
pub mod solana;

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::amount::TokenAmount;
use crate::error::DepositError;
use crate::resolver::ResolvedToken;
use crate::types::{ChainSelection, TransactionProof};
use crate::wallet::WalletHandle;

pub use evm::EvmExecutor;
pub use solana::SolanaExecutor;

/// A transfer that passed the balance check and can be submitted.
#[derive(Debug, Clone)]
pub struct PreparedTransfer {
    pub chain: ChainSelection,
    /// Amount converted at the token's current on-chain precision.
    pub amount: TokenAmount,
    pub source_address: String,
    pub recipient_address: String,
    pub token: ResolvedToken,
    pub available: U256,
    pub detail: PreparedDetail,
}

#[derive(Debug, Clone)]
pub enum PreparedDetail {
    Evm {
        token: Address,
        recipient: Address,
    },
    Solana {
        owner: [u8; 32],
        mint: [u8; 32],
        source_account: [u8; 32],
        recipient_account: [u8; 32],
    },
}

/// A transfer that left the wallet and awaits confirmation.
#[derive(Debug, Clone)]
pub struct PendingTransfer {
    pub chain: ChainSelection,
    /// Transaction hash or signature.
    pub reference: String,
    pub detail: PendingDetail,
}

#[derive(Debug, Clone)]
pub enum PendingDetail {
    Evm {
        hash: B256,
    },
    Solana {
        blockhash: String,
        last_valid_block_height: u64,
    },
}

#[async_trait]
pub trait TransferExecutor: Send + Sync {
    fn chain(&self) -> ChainSelection;

    /// Platform address deposits are sent to.
    fn recipient(&self) -> String;

    /// Resolves the token, reads decimals and balance, converts `amount`.
    /// Never writes to the chain.
    async fn check_balance(
        &self,
        wallet: &dyn WalletHandle,
        amount: Decimal,
    ) -> Result<PreparedTransfer, DepositError>;

    /// Has the wallet sign the transfer and gets it broadcast.
    async fn submit(
        &self,
        wallet: &dyn WalletHandle,
        prepared: &PreparedTransfer,
    ) -> Result<PendingTransfer, DepositError>;

    /// Waits for the chain's verdict on a broadcast transfer.
    async fn confirm(&self, pending: &PendingTransfer) -> Result<TransactionProof, DepositError>;
}

/// Proof for a confirmed transfer. An empty reference cannot prove anything.
pub(crate) fn proof_for(pending: &PendingTransfer) -> Result<TransactionProof, DepositError> {
    TransactionProof::new(pending.chain, pending.reference.clone()).ok_or_else(|| {
        DepositError::ChainConfirmationError {
            reference: pending.reference.clone(),
            reason: "confirmed transaction has an empty reference".into(),
        }
    })
}

pub(crate) fn wrong_chain(expected: ChainSelection) -> DepositError {
    DepositError::UnsupportedNetwork(format!("transfer was not prepared for {expected}"))
}
