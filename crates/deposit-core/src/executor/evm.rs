//! ERC-20 deposits on EVM networks.

use std::sync::Arc;

use alloy_primitives::Address;
use async_trait::async_trait;
use chain_eth::erc20;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::{
    proof_for, wrong_chain, PendingDetail, PendingTransfer, PreparedDetail, PreparedTransfer,
    TransferExecutor,
};
use crate::amount::TokenAmount;
use crate::error::{DepositError, WalletError};
use crate::oracle;
use crate::resolver::AddressResolver;
use crate::rpc::EvmRpc;
use crate::types::{ChainNamespace, ChainSelection, TransactionProof};
use crate::wallet::{EvmCall, WalletHandle};

/// Reference reported when the wallet failed before returning a hash.
pub const UNKNOWN_REFERENCE: &str = "unknown";

pub struct EvmExecutor {
    rpc: Arc<dyn EvmRpc>,
    resolver: AddressResolver,
    recipient: Address,
}

impl EvmExecutor {
    pub fn new(rpc: Arc<dyn EvmRpc>, resolver: AddressResolver, recipient: Address) -> Self {
        Self {
            rpc,
            resolver,
            recipient,
        }
    }
}

/// The wallet broadcasts EVM transfers itself, so only an explicit refusal
/// proves nothing went out.
fn send_failure(err: WalletError) -> DepositError {
    match err {
        WalletError::UserRejected | WalletError::Unsupported(_) => {
            DepositError::SubmissionRejected(err.to_string())
        }
        WalletError::Connection(_) | WalletError::Other(_) => {
            warn!(error = %err, "wallet failed after the transfer request; outcome unknown");
            DepositError::ChainConfirmationError {
                reference: UNKNOWN_REFERENCE.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl TransferExecutor for EvmExecutor {
    fn chain(&self) -> ChainSelection {
        ChainSelection::Base
    }

    fn recipient(&self) -> String {
        chain_eth::address::checksum_address(&self.recipient)
    }

    async fn check_balance(
        &self,
        wallet: &dyn WalletHandle,
        amount: Decimal,
    ) -> Result<PreparedTransfer, DepositError> {
        if wallet.namespace() != ChainNamespace::Eip155 {
            return Err(wrong_chain(self.chain()));
        }

        let token = self.resolver.resolve(wallet.chain_id())?;
        let token_address = chain_eth::parse_address(token.token_address)
            .map_err(|e| DepositError::UnsupportedNetwork(e.to_string()))?;
        let owner = chain_eth::parse_address(wallet.address())
            .map_err(|e| DepositError::WalletConnectionFailed(e.to_string()))?;

        let balance = oracle::evm_balance(self.rpc.as_ref(), token_address, owner).await?;
        let amount = TokenAmount::new(amount, balance.decimals)?;
        balance.ensure_covers(&amount)?;

        Ok(PreparedTransfer {
            chain: self.chain(),
            amount,
            source_address: wallet.address().to_string(),
            recipient_address: self.recipient(),
            token,
            available: balance.amount,
            detail: PreparedDetail::Evm {
                token: token_address,
                recipient: self.recipient,
            },
        })
    }

    async fn submit(
        &self,
        wallet: &dyn WalletHandle,
        prepared: &PreparedTransfer,
    ) -> Result<PendingTransfer, DepositError> {
        let PreparedDetail::Evm { token, recipient } = &prepared.detail else {
            return Err(wrong_chain(self.chain()));
        };

        let call = EvmCall {
            to: *token,
            data: erc20::encode_transfer(*recipient, prepared.amount.base_units()),
        };
        let raw_hash = wallet.send_transaction(&call).await.map_err(send_failure)?;

        // From here on the transfer may be live, so every failure is ambiguous.
        let hash = chain_eth::parse_tx_hash(&raw_hash).map_err(|e| {
            warn!(reference = %raw_hash, "wallet returned a malformed transaction hash");
            DepositError::ChainConfirmationError {
                reference: raw_hash.clone(),
                reason: e.to_string(),
            }
        })?;

        info!(chain = %self.chain(), reference = %hash, "transfer submitted");
        Ok(PendingTransfer {
            chain: self.chain(),
            reference: hash.to_string(),
            detail: PendingDetail::Evm { hash },
        })
    }

    async fn confirm(&self, pending: &PendingTransfer) -> Result<TransactionProof, DepositError> {
        let PendingDetail::Evm { hash } = &pending.detail else {
            return Err(DepositError::ChainConfirmationError {
                reference: pending.reference.clone(),
                reason: "pending transfer is not an EVM transaction".into(),
            });
        };

        match self.rpc.wait_for_receipt(*hash).await {
            Ok(receipt) if receipt.status => {
                info!(chain = %self.chain(), reference = %pending.reference, block = receipt.block_number, "transfer confirmed");
                proof_for(pending)
            }
            Ok(receipt) => Err(DepositError::ChainExecutionFailed {
                reference: pending.reference.clone(),
                reason: format!("transaction reverted in block {}", receipt.block_number),
            }),
            Err(e) => Err(DepositError::ChainConfirmationError {
                reference: pending.reference.clone(),
                reason: e.to_string(),
            }),
        }
    }
}
