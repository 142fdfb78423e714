//! EVM reads: ERC-20 balance and decimals, transaction receipts.

use std::time::Duration;

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use chain_eth::abi::decode_hex_data;
use chain_eth::erc20;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::jsonrpc::JsonRpcClient;
use crate::error::RpcError;

/// Outcome of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionReceipt {
    /// `true` when the transaction executed successfully.
    pub status: bool,
    pub block_number: u64,
}

#[async_trait]
pub trait EvmRpc: Send + Sync {
    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, RpcError>;

    async fn decimals(&self, token: Address) -> Result<u8, RpcError>;

    /// Waits until `hash` is mined (one confirmation).
    async fn wait_for_receipt(&self, hash: B256) -> Result<TransactionReceipt, RpcError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    status: Option<String>,
    block_number: Option<String>,
}

pub struct HttpEvmRpc {
    client: JsonRpcClient,
    poll_interval: Duration,
    receipt_timeout: Duration,
}

impl HttpEvmRpc {
    pub fn new(client: JsonRpcClient, poll_interval: Duration, receipt_timeout: Duration) -> Self {
        Self {
            client,
            poll_interval,
            receipt_timeout,
        }
    }

    async fn eth_call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, RpcError> {
        let params = json!([
            { "to": to.to_string(), "data": format!("0x{}", hex::encode(data)) },
            "latest"
        ]);
        let raw: String = self.client.call("eth_call", params).await?;
        decode_hex_data(&raw).map_err(|e| RpcError::InvalidResponse(e.to_string()))
    }

    async fn fetch_receipt(&self, hash: B256) -> Result<Option<TransactionReceipt>, RpcError> {
        let raw: Option<RawReceipt> = self
            .client
            .call("eth_getTransactionReceipt", json!([hash.to_string()]))
            .await?;

        let Some(receipt) = raw else {
            return Ok(None);
        };
        let Some(block) = receipt.block_number.as_deref() else {
            return Ok(None);
        };
        Ok(Some(TransactionReceipt {
            status: receipt.status.as_deref() == Some("0x1"),
            block_number: parse_quantity(block)?,
        }))
    }

    /// Polls until mined. Failed polls are retried; the caller owns the deadline.
    async fn poll_receipt(&self, hash: B256) -> TransactionReceipt {
        loop {
            match self.fetch_receipt(hash).await {
                Ok(Some(receipt)) => return receipt,
                Ok(None) => {}
                Err(e) => warn!(reference = %hash, error = %e, "receipt poll failed, retrying"),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl EvmRpc for HttpEvmRpc {
    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, RpcError> {
        let data = self.eth_call(token, erc20::encode_balance_of(owner)).await?;
        erc20::decode_balance(&data).map_err(|e| RpcError::InvalidResponse(e.to_string()))
    }

    async fn decimals(&self, token: Address) -> Result<u8, RpcError> {
        let data = self.eth_call(token, erc20::encode_decimals()).await?;
        erc20::decode_decimals(&data).map_err(|e| RpcError::InvalidResponse(e.to_string()))
    }

    async fn wait_for_receipt(&self, hash: B256) -> Result<TransactionReceipt, RpcError> {
        debug!(reference = %hash, "waiting for receipt");
        match tokio::time::timeout(self.receipt_timeout, self.poll_receipt(hash)).await {
            Ok(receipt) => Ok(receipt),
            Err(_) => {
                warn!(reference = %hash, timeout = ?self.receipt_timeout, "receipt wait timed out");
                Err(RpcError::Timeout(format!(
                    "no receipt for {hash} after {:?}",
                    self.receipt_timeout
                )))
            }
        }
    }
}

/// Parses a hex `QUANTITY` such as `0x1b4`.
pub(crate) fn parse_quantity(value: &str) -> Result<u64, RpcError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    u64::from_str_radix(digits, 16)
        .map_err(|e| RpcError::InvalidResponse(format!("bad quantity {value:?}: {e}")))
}
