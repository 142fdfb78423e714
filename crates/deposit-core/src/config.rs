//! Deposit pipeline configuration.
//!
//! Loaded from TOML, then overridden from the process environment so a
//! deployment can set addresses and endpoints without a file:
//!
//! ```toml
//! environment = "testnet"
//!
//! [backend]
//! url = "https://api.example.com"
//!
//! [evm]
//! recipient = "0x..."
//!
//! [solana]
//! recipient = "..."
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::Environment;

pub const ENV_ENVIRONMENT: &str = "DEPOSIT_ENVIRONMENT";
pub const ENV_BACKEND_URL: &str = "BACKEND_API_URL";
pub const ENV_BACKEND_TOKEN: &str = "BACKEND_API_TOKEN";
pub const ENV_BASE_RECIPIENT: &str = "BASE_PLATFORM_WALLET_ADDRESS";
pub const ENV_SOLANA_RECIPIENT: &str = "SOLANA_PLATFORM_WALLET_ADDRESS";
pub const ENV_BASE_RPC_URL: &str = "BASE_RPC_URL";
pub const ENV_SOLANA_RPC_URL: &str = "SOLANA_RPC_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositConfig {
    #[serde(default)]
    pub environment: Environment,
    /// Per-request timeout for chain RPC calls.
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub evm: EvmConfig,
    #[serde(default)]
    pub solana: SolanaConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_deposit_path")]
    pub deposit_path: String,
    /// Bearer token of the signed-in user.
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_backend_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvmConfig {
    /// Platform address that receives deposits.
    #[serde(default)]
    pub recipient: String,
    /// Overrides the environment's default RPC endpoint.
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolanaConfig {
    /// Platform wallet (owner, not token account) that receives deposits.
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default = "default_confirm_poll_interval_ms")]
    pub confirm_poll_interval_ms: u64,
}

fn default_deposit_path() -> String {
    "/wallet/deposit".to_string()
}

fn default_backend_timeout_secs() -> u64 {
    30
}

fn default_receipt_poll_interval_ms() -> u64 {
    2_000
}

fn default_receipt_timeout_secs() -> u64 {
    300
}

fn default_confirm_poll_interval_ms() -> u64 {
    1_000
}

fn default_rpc_timeout_secs() -> u64 {
    30
}

impl Default for DepositConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
            backend: BackendConfig::default(),
            evm: EvmConfig::default(),
            solana: SolanaConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            deposit_path: default_deposit_path(),
            auth_token: None,
            timeout_secs: default_backend_timeout_secs(),
        }
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("deposit_path", &self.deposit_path)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for EvmConfig {
    fn default() -> Self {
        Self {
            recipient: String::new(),
            rpc_url: None,
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
            receipt_timeout_secs: default_receipt_timeout_secs(),
        }
    }
}

impl Default for SolanaConfig {
    fn default() -> Self {
        Self {
            recipient: String::new(),
            rpc_url: None,
            confirm_poll_interval_ms: default_confirm_poll_interval_ms(),
        }
    }
}

impl BackendConfig {
    /// Full URL of the deposit report endpoint.
    pub fn deposit_url(&self) -> String {
        format!(
            "{}/{}",
            self.url.trim_end_matches('/'),
            self.deposit_path.trim_start_matches('/')
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DepositConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Reads `path`, applies environment overrides and validates.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let mut config = Self::from_toml_str(&raw)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a configuration from environment variables alone.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from `lookup` (normally the process environment).
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(env) = lookup(ENV_ENVIRONMENT) {
            self.environment = env.parse().map_err(ConfigError::Invalid)?;
        }
        if let Some(url) = lookup(ENV_BACKEND_URL) {
            self.backend.url = url;
        }
        if let Some(token) = lookup(ENV_BACKEND_TOKEN) {
            self.backend.auth_token = Some(token);
        }
        if let Some(recipient) = lookup(ENV_BASE_RECIPIENT) {
            self.evm.recipient = recipient;
        }
        if let Some(recipient) = lookup(ENV_SOLANA_RECIPIENT) {
            self.solana.recipient = recipient;
        }
        if let Some(url) = lookup(ENV_BASE_RPC_URL) {
            self.evm.rpc_url = Some(url);
        }
        if let Some(url) = lookup(ENV_SOLANA_RPC_URL) {
            self.solana.rpc_url = Some(url);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.backend.url.starts_with("http://") || self.backend.url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "backend url must be http(s), got {:?}",
                self.backend.url
            )));
        }

        chain_eth::parse_address(&self.evm.recipient)?;
        chain_sol::validate_address(&self.solana.recipient)?;

        if self.evm.receipt_poll_interval_ms == 0
            || self.solana.confirm_poll_interval_ms == 0
            || self.rpc_timeout_secs == 0
        {
            return Err(ConfigError::Invalid(
                "poll intervals and timeouts must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    /// EVM RPC endpoint: the override, else the environment's network default.
    pub fn evm_rpc_url(&self) -> String {
        self.evm.rpc_url.clone().unwrap_or_else(|| {
            chain_eth::chains::network_for_environment(self.environment.is_testnet())
                .rpc_url
                .to_string()
        })
    }

    /// Solana RPC endpoint: the override, else the environment's cluster default.
    pub fn solana_rpc_url(&self) -> String {
        self.solana.rpc_url.clone().unwrap_or_else(|| {
            chain_sol::clusters::cluster_for_environment(self.environment.is_testnet())
                .rpc_url
                .to_string()
        })
    }
}
