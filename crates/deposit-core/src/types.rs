use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::amount::TokenAmount;

/// Network a deposit is sent on. Fixed for the lifetime of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChainSelection {
    /// Base, an EVM network.
    Base,
    Solana,
}

impl ChainSelection {
    /// Wallet namespace that can sign for this chain.
    pub fn namespace(&self) -> ChainNamespace {
        match self {
            ChainSelection::Base => ChainNamespace::Eip155,
            ChainSelection::Solana => ChainNamespace::Solana,
        }
    }

    /// Name the backend knows this chain by.
    pub fn wire_name(&self) -> &'static str {
        match self {
            ChainSelection::Base => "BASE",
            ChainSelection::Solana => "SOLANA",
        }
    }
}

impl fmt::Display for ChainSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for ChainSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BASE" => Ok(ChainSelection::Base),
            "SOLANA" => Ok(ChainSelection::Solana),
            other => Err(format!("unknown network {other}")),
        }
    }
}

/// CAIP-2 namespace of a wallet connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainNamespace {
    Eip155,
    Solana,
}

impl ChainNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainNamespace::Eip155 => "eip155",
            ChainNamespace::Solana => "solana",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "eip155" => Some(ChainNamespace::Eip155),
            "solana" => Some(ChainNamespace::Solana),
            _ => None,
        }
    }
}

impl fmt::Display for ChainNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deployment environment. Selects the address tables and default RPC
/// endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Mainnet,
    Testnet,
}

impl Environment {
    pub fn is_testnet(&self) -> bool {
        matches!(self, Environment::Testnet)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "production" => Ok(Environment::Mainnet),
            "testnet" | "development" => Ok(Environment::Testnet),
            other => Err(format!("unknown environment {other}")),
        }
    }
}

/// Pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DepositStatus {
    Idle,
    AwaitingConnection,
    Validating,
    CheckingBalance,
    Submitting,
    Confirming,
    Reporting,
    Failed,
}

impl DepositStatus {
    /// True while an attempt is running and the form should stay disabled.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            DepositStatus::Validating
                | DepositStatus::CheckingBalance
                | DepositStatus::Submitting
                | DepositStatus::Confirming
                | DepositStatus::Reporting
        )
    }
}

impl fmt::Display for DepositStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One in-memory deposit attempt. Never persisted.
#[derive(Debug, Clone)]
pub struct DepositAttempt {
    pub chain: ChainSelection,
    pub amount: TokenAmount,
    pub source_address: String,
    pub recipient_address: String,
    pub status: DepositStatus,
}

/// Evidence that the chain included a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionProof {
    pub chain: ChainSelection,
    /// EVM transaction hash or Solana transaction signature.
    pub reference: String,
}

impl TransactionProof {
    /// Returns `None` for an empty reference; an empty proof proves nothing.
    pub fn new(chain: ChainSelection, reference: impl Into<String>) -> Option<Self> {
        let reference = reference.into();
        if reference.trim().is_empty() {
            return None;
        }
        Some(Self { chain, reference })
    }
}

/// Body of the backend deposit report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositReport {
    pub chain: ChainSelection,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub depositor: String,
    pub tx_identifier: String,
}

impl DepositReport {
    pub fn new(proof: &TransactionProof, amount: &TokenAmount, depositor: &str) -> Self {
        Self {
            chain: proof.chain,
            amount: amount.decimal(),
            depositor: depositor.to_string(),
            tx_identifier: proof.reference.clone(),
        }
    }
}

/// Successful outcome of a deposit.
#[derive(Debug, Clone)]
pub struct DepositReceipt {
    pub proof: TransactionProof,
    pub amount: TokenAmount,
    /// Acknowledgement text returned by the backend, if any.
    pub message: Option<String>,
}
