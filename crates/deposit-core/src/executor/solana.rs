//! SPL token deposits on Solana.
//!
//! The wallet only signs. This executor builds the `TransferChecked`
//! transaction, verifies the returned signature, broadcasts the wire bytes
//! itself and confirms against the blockhash expiry height.

use std::sync::Arc;

use alloy_primitives::U256;
use async_trait::async_trait;
use chain_sol::SolError;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::{
    proof_for, wrong_chain, PendingDetail, PendingTransfer, PreparedDetail, PreparedTransfer,
    TransferExecutor,
};
use crate::amount::{normalize, TokenAmount};
use crate::error::{DepositError, RpcError};
use crate::oracle;
use crate::resolver::AddressResolver;
use crate::rpc::SolanaRpc;
use crate::types::{ChainNamespace, ChainSelection, TransactionProof};
use crate::wallet::WalletHandle;

/// USDC precision, used only to express the requested amount when the
/// sender has no token account to read decimals from.
const USDC_DECIMALS: u8 = 6;

pub struct SolanaExecutor {
    rpc: Arc<dyn SolanaRpc>,
    resolver: AddressResolver,
    /// Platform wallet; deposits go to its associated token account.
    recipient: [u8; 32],
}

impl SolanaExecutor {
    pub fn new(rpc: Arc<dyn SolanaRpc>, resolver: AddressResolver, recipient: [u8; 32]) -> Self {
        Self {
            rpc,
            resolver,
            recipient,
        }
    }

    fn unavailable(err: RpcError) -> DepositError {
        DepositError::ChainUnavailable(err.to_string())
    }

    fn rejected(err: SolError) -> DepositError {
        DepositError::SubmissionRejected(err.to_string())
    }
}

#[async_trait]
impl TransferExecutor for SolanaExecutor {
    fn chain(&self) -> ChainSelection {
        ChainSelection::Solana
    }

    fn recipient(&self) -> String {
        chain_sol::bytes_to_address(&self.recipient)
    }

    async fn check_balance(
        &self,
        wallet: &dyn WalletHandle,
        amount: Decimal,
    ) -> Result<PreparedTransfer, DepositError> {
        if wallet.namespace() != ChainNamespace::Solana {
            return Err(wrong_chain(self.chain()));
        }

        let token = self.resolver.resolve(wallet.chain_id())?;
        let mint = chain_sol::address_to_bytes(token.token_address)
            .map_err(|e| DepositError::UnsupportedNetwork(e.to_string()))?;
        let owner = chain_sol::address_to_bytes(wallet.address())
            .map_err(|e| DepositError::WalletConnectionFailed(e.to_string()))?;

        let source_account = chain_sol::derive_associated_token_address(&owner, &mint)
            .map_err(|e| DepositError::WalletConnectionFailed(e.to_string()))?;
        let recipient_account = chain_sol::derive_associated_token_address(&self.recipient, &mint)
            .map_err(|e| DepositError::UnsupportedNetwork(e.to_string()))?;
        let recipient_ata = chain_sol::bytes_to_address(&recipient_account);
        let source_ata = chain_sol::bytes_to_address(&source_account);

        let exists = self
            .rpc
            .account_exists(&recipient_ata)
            .await
            .map_err(Self::unavailable)?;
        if !exists {
            warn!(account = %recipient_ata, "recipient token account missing");
            return Err(DepositError::RecipientAccountMissing {
                account: recipient_ata,
            });
        }

        let Some(balance) = oracle::solana_balance(self.rpc.as_ref(), &source_ata).await? else {
            return Err(DepositError::InsufficientBalance {
                requested: normalize(amount, USDC_DECIMALS)?,
                available: U256::ZERO,
            });
        };
        let amount = TokenAmount::new(amount, balance.decimals)?;
        balance.ensure_covers(&amount)?;

        Ok(PreparedTransfer {
            chain: self.chain(),
            amount,
            source_address: wallet.address().to_string(),
            recipient_address: self.recipient(),
            token,
            available: balance.amount,
            detail: PreparedDetail::Solana {
                owner,
                mint,
                source_account,
                recipient_account,
            },
        })
    }

    async fn submit(
        &self,
        wallet: &dyn WalletHandle,
        prepared: &PreparedTransfer,
    ) -> Result<PendingTransfer, DepositError> {
        let PreparedDetail::Solana {
            owner,
            mint,
            source_account,
            recipient_account,
        } = &prepared.detail
        else {
            return Err(wrong_chain(self.chain()));
        };

        let latest = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(Self::unavailable)?;
        let blockhash = chain_sol::address_to_bytes(&latest.blockhash)
            .map_err(|e| DepositError::ChainUnavailable(format!("bad blockhash: {e}")))?;

        let instruction = chain_sol::build_transfer_checked(
            source_account,
            mint,
            recipient_account,
            owner,
            prepared.amount.base_units_u64()?,
            prepared.amount.precision(),
        )
        .map_err(Self::rejected)?;
        let message = chain_sol::compile_message(&[instruction], owner, &blockhash)
            .map_err(Self::rejected)?;
        let message_bytes = chain_sol::serialize_message(&message);

        let signature = wallet
            .sign_message(&message_bytes)
            .await
            .map_err(|e| DepositError::SubmissionRejected(e.to_string()))?;
        chain_sol::verify_signature(owner, &message_bytes, &signature).map_err(Self::rejected)?;

        let reference = chain_sol::signature_to_string(&signature);
        let wire = chain_sol::assemble_signed_transaction(&message_bytes, &signature);
        debug!(reference = %reference, bytes = wire.len(), "broadcasting transaction");

        match self.rpc.send_raw_transaction(&wire).await {
            Ok(returned) => {
                if returned != reference {
                    warn!(reference = %reference, returned = %returned, "node returned a different signature");
                }
            }
            Err(RpcError::Rpc { code, message }) => {
                return Err(DepositError::ChainExecutionFailed {
                    reference,
                    reason: format!("rejected by node ({code}): {message}"),
                })
            }
            Err(e) => {
                return Err(DepositError::ChainConfirmationError {
                    reference,
                    reason: e.to_string(),
                })
            }
        }

        info!(chain = %self.chain(), reference = %reference, "transfer submitted");
        Ok(PendingTransfer {
            chain: self.chain(),
            reference,
            detail: PendingDetail::Solana {
                blockhash: latest.blockhash,
                last_valid_block_height: latest.last_valid_block_height,
            },
        })
    }

    async fn confirm(&self, pending: &PendingTransfer) -> Result<TransactionProof, DepositError> {
        let PendingDetail::Solana {
            blockhash,
            last_valid_block_height,
        } = &pending.detail
        else {
            return Err(DepositError::ChainConfirmationError {
                reference: pending.reference.clone(),
                reason: "pending transfer is not a Solana transaction".into(),
            });
        };

        match self
            .rpc
            .confirm_transaction(&pending.reference, blockhash, *last_valid_block_height)
            .await
        {
            Ok(outcome) => match outcome.err {
                Some(err) => Err(DepositError::ChainExecutionFailed {
                    reference: pending.reference.clone(),
                    reason: err.to_string(),
                }),
                None => {
                    info!(chain = %self.chain(), reference = %pending.reference, "transfer confirmed");
                    proof_for(pending)
                }
            },
            Err(e) => Err(DepositError::ChainConfirmationError {
                reference: pending.reference.clone(),
                reason: e.to_string(),
            }),
        }
    }
}
