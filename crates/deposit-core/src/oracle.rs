//! Token decimals and sender balance reads.

use alloy_primitives::{Address, U256};
use tracing::debug;

use crate::amount::{denormalize, TokenAmount};
use crate::error::{DepositError, RpcError};
use crate::rpc::{EvmRpc, SolanaRpc};

/// A sender's token balance with the precision it was read at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBalance {
    pub amount: U256,
    pub decimals: u8,
}

impl TokenBalance {
    /// Fails with `InsufficientBalance` when `requested` exceeds the balance.
    pub fn ensure_covers(&self, requested: &TokenAmount) -> Result<(), DepositError> {
        if requested.precision() != self.decimals {
            return Err(DepositError::InvalidAmount(format!(
                "amount converted at {} decimals but the token has {}",
                requested.precision(),
                self.decimals
            )));
        }
        if requested.base_units() > self.amount {
            return Err(DepositError::InsufficientBalance {
                requested: requested.base_units(),
                available: self.amount,
            });
        }
        Ok(())
    }
}

fn unavailable(err: RpcError) -> DepositError {
    DepositError::ChainUnavailable(err.to_string())
}

/// Reads `decimals()` and `balanceOf(owner)` from an ERC-20 contract.
pub async fn evm_balance(
    rpc: &dyn EvmRpc,
    token: Address,
    owner: Address,
) -> Result<TokenBalance, DepositError> {
    let decimals = rpc.decimals(token).await.map_err(unavailable)?;
    let amount = rpc.balance_of(token, owner).await.map_err(unavailable)?;
    debug!(%token, %owner, %amount, decimals, "read EVM token balance");
    Ok(TokenBalance { amount, decimals })
}

/// Reads an SPL token account. `None` means the account does not exist,
/// which is a zero balance.
pub async fn solana_balance(
    rpc: &dyn SolanaRpc,
    token_account: &str,
) -> Result<Option<TokenBalance>, DepositError> {
    match rpc.get_token_account_balance(token_account).await {
        Ok(balance) => {
            debug!(token_account, amount = balance.amount, decimals = balance.decimals, "read SPL token balance");
            Ok(Some(TokenBalance {
                amount: U256::from(balance.amount),
                decimals: balance.decimals,
            }))
        }
        Err(RpcError::AccountNotFound(_)) => {
            debug!(token_account, "token account missing, balance is zero");
            Ok(None)
        }
        Err(e) => Err(unavailable(e)),
    }
}

impl std::fmt::Display for TokenBalance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match denormalize(self.amount, self.decimals) {
            Ok(value) => write!(f, "{}", value.normalize()),
            Err(_) => write!(f, "{} base units", self.amount),
        }
    }
}
