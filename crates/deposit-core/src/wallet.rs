//! Wallet collaborator traits.
//!
//! The pipeline never holds keys. A [`WalletProvider`] hands out a
//! [`WalletHandle`] bound to one address on one chain namespace; the handle
//! signs (Solana) or signs and broadcasts (EVM) on the user's behalf.

use std::fmt;
use std::sync::Arc;

use alloy_primitives::Address;
use async_trait::async_trait;

use crate::error::WalletError;
use crate::types::ChainNamespace;

/// A contract call for the wallet to sign and broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmCall {
    pub to: Address,
    pub data: Vec<u8>,
}

/// A connected wallet account.
#[async_trait]
pub trait WalletHandle: Send + Sync + fmt::Debug {
    /// Address in the chain's native text form.
    fn address(&self) -> &str;

    /// CAIP-2 chain id the account is connected on, e.g. `eip155:8453`.
    fn chain_id(&self) -> &str;

    fn namespace(&self) -> ChainNamespace;

    /// Signs and broadcasts an EVM call, returning the transaction hash.
    async fn send_transaction(&self, _call: &EvmCall) -> Result<String, WalletError> {
        Err(WalletError::Unsupported(format!(
            "{} wallets cannot send EVM transactions",
            self.namespace()
        )))
    }

    /// Signs raw message bytes with the account's Ed25519 key.
    async fn sign_message(&self, _message: &[u8]) -> Result<[u8; 64], WalletError> {
        Err(WalletError::Unsupported(format!(
            "{} wallets cannot sign Solana messages",
            self.namespace()
        )))
    }
}

/// Opens and closes wallet connections.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Runs the connect flow scoped to `namespace`.
    async fn connect(&self, namespace: ChainNamespace) -> Result<Arc<dyn WalletHandle>, WalletError>;

    async fn disconnect(&self, namespace: ChainNamespace) -> Result<(), WalletError>;
}
