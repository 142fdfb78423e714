//! Backend deposit reporting.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::BackendConfig;
use crate::error::ReportError;
use crate::types::DepositReport;

/// Backend acknowledgement of a recorded deposit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportAck {
    pub message: Option<String>,
}

/// Credits confirmed deposits to the user's platform balance.
///
/// Implementations must be idempotent by `tx_identifier`: the same report
/// may be sent again when reconciling a failed attempt.
#[async_trait]
pub trait DepositReporter: Send + Sync {
    async fn report(&self, report: &DepositReport) -> Result<ReportAck, ReportError>;
}

/// Reports deposits with `POST {url}{deposit_path}`.
pub struct HttpDepositReporter {
    http: reqwest::Client,
    url: String,
    auth_token: Option<String>,
}

impl HttpDepositReporter {
    pub fn new(config: &BackendConfig) -> Result<Self, ReportError> {
        Self::with_timeout(config, config.timeout())
    }

    pub fn with_timeout(config: &BackendConfig, timeout: Duration) -> Result<Self, ReportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReportError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            url: config.deposit_url(),
            auth_token: config.auth_token.clone(),
        })
    }
}

#[async_trait]
impl DepositReporter for HttpDepositReporter {
    async fn report(&self, report: &DepositReport) -> Result<ReportAck, ReportError> {
        debug!(chain = %report.chain, reference = %report.tx_identifier, url = %self.url, "reporting deposit");

        let mut request = self.http.post(&self.url).json(report);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ReportError::Transport(e.to_string()))?;
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        interpret_response(status, &body)
    }
}

fn interpret_response(status: StatusCode, body: &Value) -> Result<ReportAck, ReportError> {
    if status == StatusCode::UNAUTHORIZED {
        warn!("backend rejected the session");
        return Err(ReportError::Unauthorized);
    }

    let message = extract_message(body);
    if !status.is_success() {
        return Err(ReportError::Rejected {
            status: status.as_u16(),
            message: message.unwrap_or_else(|| status.to_string()),
        });
    }
    Ok(ReportAck { message })
}

/// Backend messages are either a string or a list of validation errors;
/// for a list the first entry is shown, capitalized.
pub fn extract_message(body: &Value) -> Option<String> {
    match body.get("message")? {
        Value::String(message) => Some(message.clone()),
        Value::Array(items) => items.first().and_then(Value::as_str).map(capitalize),
        _ => None,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
