use alloy_primitives::U256;
use thiserror::Error;

use crate::types::TransactionProof;

/// Everything a deposit attempt can end in, other than success.
#[derive(Debug, Error)]
pub enum DepositError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("insufficient balance: requested {requested} base units, available {available}")]
    InsufficientBalance { requested: U256, available: U256 },

    #[error("wallet connection failed: {0}")]
    WalletConnectionFailed(String),

    #[error("recipient token account {account} does not exist")]
    RecipientAccountMissing { account: String },

    /// The chain rejected the transfer; no funds moved.
    #[error("transaction {reference} failed on chain: {reason}")]
    ChainExecutionFailed { reference: String, reason: String },

    /// The transfer may or may not have landed. Must never be retried
    /// automatically; reconcile against the chain using `reference`.
    #[error("outcome of transaction {reference} is unknown: {reason}")]
    ChainConfirmationError { reference: String, reason: String },

    /// Funds moved but the backend was not told. The proof is kept.
    #[error("deposit {} confirmed on chain but the backend report failed: {reason}", .proof.reference)]
    BackendReportFailed {
        proof: TransactionProof,
        reason: String,
    },

    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),

    #[error("wallet did not submit the transfer: {0}")]
    SubmissionRejected(String),

    #[error("chain unavailable: {0}")]
    ChainUnavailable(String),

    #[error("deposit {0} is confirmed but not yet reported")]
    ReportPending(String),
}

/// Flat classification of [`DepositError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositErrorKind {
    InvalidAmount,
    InsufficientBalance,
    WalletConnectionFailed,
    RecipientAccountMissing,
    ChainExecutionFailed,
    ChainConfirmationError,
    BackendReportFailed,
    UnsupportedNetwork,
    SubmissionRejected,
    ChainUnavailable,
    ReportPending,
}

impl DepositError {
    pub fn kind(&self) -> DepositErrorKind {
        match self {
            DepositError::InvalidAmount(_) => DepositErrorKind::InvalidAmount,
            DepositError::InsufficientBalance { .. } => DepositErrorKind::InsufficientBalance,
            DepositError::WalletConnectionFailed(_) => DepositErrorKind::WalletConnectionFailed,
            DepositError::RecipientAccountMissing { .. } => {
                DepositErrorKind::RecipientAccountMissing
            }
            DepositError::ChainExecutionFailed { .. } => DepositErrorKind::ChainExecutionFailed,
            DepositError::ChainConfirmationError { .. } => {
                DepositErrorKind::ChainConfirmationError
            }
            DepositError::BackendReportFailed { .. } => DepositErrorKind::BackendReportFailed,
            DepositError::UnsupportedNetwork(_) => DepositErrorKind::UnsupportedNetwork,
            DepositError::SubmissionRejected(_) => DepositErrorKind::SubmissionRejected,
            DepositError::ChainUnavailable(_) => DepositErrorKind::ChainUnavailable,
            DepositError::ReportPending(_) => DepositErrorKind::ReportPending,
        }
    }

    /// True when nothing was broadcast, so the user may simply try again.
    pub fn is_side_effect_free(&self) -> bool {
        !matches!(
            self.kind(),
            DepositErrorKind::ChainExecutionFailed
                | DepositErrorKind::ChainConfirmationError
                | DepositErrorKind::BackendReportFailed
        )
    }
}

/// JSON-RPC client errors.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),

    /// The node answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("signature {signature} not confirmed before block height {last_valid_block_height}")]
    BlockHeightExceeded {
        signature: String,
        last_valid_block_height: u64,
    },
}

/// Wallet provider and wallet handle errors.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("user rejected the request")]
    UserRejected,

    #[error("wallet connection failed: {0}")]
    Connection(String),

    #[error("operation not supported by this wallet: {0}")]
    Unsupported(String),

    #[error("wallet error: {0}")]
    Other(String),
}

/// Backend report errors.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("session expired")]
    Unauthorized,

    #[error("backend rejected the report ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<chain_eth::EthError> for ConfigError {
    fn from(e: chain_eth::EthError) -> Self {
        ConfigError::Invalid(format!("EVM: {e}"))
    }
}

impl From<chain_sol::SolError> for ConfigError {
    fn from(e: chain_sol::SolError) -> Self {
        ConfigError::Invalid(format!("Solana: {e}"))
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}
