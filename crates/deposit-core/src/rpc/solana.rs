//! Solana reads, raw transaction submission and confirmation.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::jsonrpc::JsonRpcClient;
use crate::error::RpcError;

/// JSON-RPC "invalid params", which nodes return for unknown token accounts.
const INVALID_PARAMS: i64 = -32602;

/// Upper bound on confirmation when the node cannot report block height.
const MAX_CONFIRM_WAIT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq)]
pub struct TokenAccountBalance {
    /// Balance in base units.
    pub amount: u64,
    pub decimals: u8,
    pub ui_amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockhashInfo {
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

/// Final state of a confirmed signature. `err` is the program error, if any.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureOutcome {
    pub err: Option<Value>,
}

#[async_trait]
pub trait SolanaRpc: Send + Sync {
    async fn account_exists(&self, account: &str) -> Result<bool, RpcError>;

    /// Fails with [`RpcError::AccountNotFound`] when the token account does
    /// not exist.
    async fn get_token_account_balance(&self, account: &str)
        -> Result<TokenAccountBalance, RpcError>;

    async fn get_latest_blockhash(&self) -> Result<BlockhashInfo, RpcError>;

    /// Submits a signed wire transaction and returns its signature.
    async fn send_raw_transaction(&self, transaction: &[u8]) -> Result<String, RpcError>;

    /// Waits until `signature` is confirmed or the blockhash expires.
    async fn confirm_transaction(
        &self,
        signature: &str,
        blockhash: &str,
        last_valid_block_height: u64,
    ) -> Result<SignatureOutcome, RpcError>;
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTokenAmount {
    amount: String,
    decimals: u8,
    ui_amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBlockhash {
    blockhash: String,
    last_valid_block_height: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSignatureStatus {
    confirmation_status: Option<String>,
    #[serde(default)]
    err: Option<Value>,
}

impl RawSignatureStatus {
    fn is_confirmed(&self) -> bool {
        matches!(
            self.confirmation_status.as_deref(),
            Some("confirmed") | Some("finalized")
        )
    }
}

pub struct HttpSolanaRpc {
    client: JsonRpcClient,
    poll_interval: Duration,
}

impl HttpSolanaRpc {
    pub fn new(client: JsonRpcClient, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }

    async fn signature_status(&self, signature: &str) -> Result<Option<RawSignatureStatus>, RpcError> {
        let statuses: WithContext<Vec<Option<RawSignatureStatus>>> = self
            .client
            .call(
                "getSignatureStatuses",
                json!([[signature], { "searchTransactionHistory": false }]),
            )
            .await?;
        Ok(statuses.value.into_iter().next().flatten())
    }

    async fn block_height(&self) -> Result<u64, RpcError> {
        self.client
            .call("getBlockHeight", json!([{ "commitment": "confirmed" }]))
            .await
    }

    /// The outcome once `signature` is confirmed or failed. A failed poll
    /// counts as not settled yet.
    async fn settled(&self, signature: &str) -> Option<SignatureOutcome> {
        match self.signature_status(signature).await {
            Ok(Some(status)) if status.is_confirmed() || status.err.is_some() => {
                Some(SignatureOutcome { err: status.err })
            }
            Ok(_) => None,
            Err(e) => {
                warn!(reference = signature, error = %e, "signature status poll failed, retrying");
                None
            }
        }
    }

    async fn poll_signature(
        &self,
        signature: &str,
        last_valid_block_height: u64,
    ) -> Result<SignatureOutcome, RpcError> {
        loop {
            if let Some(outcome) = self.settled(signature).await {
                return Ok(outcome);
            }

            match self.block_height().await {
                Ok(height) if height > last_valid_block_height => {
                    // It may have landed at the last valid height.
                    if let Some(outcome) = self.settled(signature).await {
                        return Ok(outcome);
                    }
                    warn!(reference = signature, height, last_valid_block_height, "blockhash expired");
                    return Err(RpcError::BlockHeightExceeded {
                        signature: signature.to_string(),
                        last_valid_block_height,
                    });
                }
                Ok(_) => {}
                Err(e) => warn!(reference = signature, error = %e, "block height poll failed, retrying"),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl SolanaRpc for HttpSolanaRpc {
    async fn account_exists(&self, account: &str) -> Result<bool, RpcError> {
        let info: WithContext<Option<Value>> = self
            .client
            .call(
                "getAccountInfo",
                json!([account, { "encoding": "base64", "commitment": "confirmed" }]),
            )
            .await?;
        Ok(info.value.is_some())
    }

    async fn get_token_account_balance(
        &self,
        account: &str,
    ) -> Result<TokenAccountBalance, RpcError> {
        let result: Result<WithContext<RawTokenAmount>, RpcError> = self
            .client
            .call(
                "getTokenAccountBalance",
                json!([account, { "commitment": "confirmed" }]),
            )
            .await;

        let raw = match result {
            Ok(raw) => raw.value,
            Err(RpcError::Rpc { code, .. }) if code == INVALID_PARAMS => {
                return Err(RpcError::AccountNotFound(account.to_string()))
            }
            Err(e) => return Err(e),
        };

        let amount = raw
            .amount
            .parse::<u64>()
            .map_err(|e| RpcError::InvalidResponse(format!("token amount {:?}: {e}", raw.amount)))?;
        Ok(TokenAccountBalance {
            amount,
            decimals: raw.decimals,
            ui_amount: raw.ui_amount,
        })
    }

    async fn get_latest_blockhash(&self) -> Result<BlockhashInfo, RpcError> {
        let raw: WithContext<RawBlockhash> = self
            .client
            .call("getLatestBlockhash", json!([{ "commitment": "confirmed" }]))
            .await?;
        Ok(BlockhashInfo {
            blockhash: raw.value.blockhash,
            last_valid_block_height: raw.value.last_valid_block_height,
        })
    }

    async fn send_raw_transaction(&self, transaction: &[u8]) -> Result<String, RpcError> {
        self.client
            .call(
                "sendTransaction",
                json!([
                    BASE64.encode(transaction),
                    { "encoding": "base64", "preflightCommitment": "confirmed" }
                ]),
            )
            .await
    }

    async fn confirm_transaction(
        &self,
        signature: &str,
        blockhash: &str,
        last_valid_block_height: u64,
    ) -> Result<SignatureOutcome, RpcError> {
        debug!(reference = signature, blockhash, last_valid_block_height, "confirming signature");
        let poll = self.poll_signature(signature, last_valid_block_height);
        match tokio::time::timeout(MAX_CONFIRM_WAIT, poll).await {
            Ok(result) => result,
            Err(_) => {
                warn!(reference = signature, timeout = ?MAX_CONFIRM_WAIT, "confirmation wait timed out");
                Err(RpcError::Timeout(format!(
                    "signature {signature} unresolved after {MAX_CONFIRM_WAIT:?}"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::jsonrpc::decode_response;

    #[test]
    fn token_balance_shape() {
        let raw: WithContext<RawTokenAmount> = decode_response(
            br#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":1},
                "value":{"amount":"2500000","decimals":6,"uiAmount":2.5,"uiAmountString":"2.5"}}}"#,
        )
        .unwrap();
        assert_eq!(raw.value.amount, "2500000");
        assert_eq!(raw.value.decimals, 6);
        assert_eq!(raw.value.ui_amount, Some(2.5));
    }

    #[test]
    fn blockhash_shape() {
        let raw: WithContext<RawBlockhash> = decode_response(
            br#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":1},
                "value":{"blockhash":"11111111111111111111111111111111","lastValidBlockHeight":150}}}"#,
        )
        .unwrap();
        assert_eq!(raw.value.last_valid_block_height, 150);
    }

    #[test]
    fn signature_status_confirmation() {
        let statuses: WithContext<Vec<Option<RawSignatureStatus>>> = decode_response(
            br#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":1},"value":[
                {"slot":5,"confirmations":null,"err":null,"confirmationStatus":"finalized"}
            ]}}"#,
        )
        .unwrap();
        let status = statuses.value.into_iter().next().flatten().unwrap();
        assert!(status.is_confirmed());
        assert!(status.err.is_none());
    }

    #[test]
    fn processed_is_not_confirmed() {
        let status = RawSignatureStatus {
            confirmation_status: Some("processed".into()),
            err: None,
        };
        assert!(!status.is_confirmed());
    }
}
