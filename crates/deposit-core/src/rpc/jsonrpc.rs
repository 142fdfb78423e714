//! Minimal JSON-RPC 2.0 client over `reqwest`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::error::RpcError;

#[derive(Debug, Serialize)]
struct Request<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ErrorObject>,
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug)]
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call<P, R>(&self, method: &str, params: P) -> Result<R, RpcError>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        trace!(method, id, url = %self.url, "json-rpc request");

        let body = Request {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        if !status.is_success() && bytes.is_empty() {
            return Err(RpcError::Transport(format!("http status {status}")));
        }

        decode_response(&bytes)
    }
}

/// Decodes a JSON-RPC response envelope into its `result`.
pub(crate) fn decode_response<R: DeserializeOwned>(bytes: &[u8]) -> Result<R, RpcError> {
    let envelope: Response =
        serde_json::from_slice(bytes).map_err(|e| RpcError::InvalidResponse(e.to_string()))?;

    if let Some(err) = envelope.error {
        return Err(RpcError::Rpc {
            code: err.code,
            message: err.message,
        });
    }

    serde_json::from_value(envelope.result.unwrap_or(Value::Null))
        .map_err(|e| RpcError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_result() {
        let value: String = decode_response(br#"{"jsonrpc":"2.0","id":1,"result":"0x10"}"#).unwrap();
        assert_eq!(value, "0x10");
    }

    #[test]
    fn null_result_decodes_as_none() {
        let value: Option<String> =
            decode_response(br#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn error_object_wins() {
        let err = decode_response::<String>(
            br#"{"jsonrpc":"2.0","id":1,"error":{"code":-32002,"message":"preflight failed"}}"#,
        )
        .unwrap_err();
        match err {
            RpcError::Rpc { code, message } => {
                assert_eq!(code, -32002);
                assert_eq!(message, "preflight failed");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn garbage_is_invalid_response() {
        assert!(matches!(
            decode_response::<String>(b"<html>"),
            Err(RpcError::InvalidResponse(_))
        ));
    }
}
