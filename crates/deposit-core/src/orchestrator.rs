//! The deposit state machine shared by every chain.
//!
//! ```text
//! Idle -> AwaitingConnection -> Validating -> CheckingBalance
//!      -> Submitting -> Confirming -> Reporting -> Idle
//! ```
//!
//! Any stage may end in `Failed`. Failures that happen before a transfer is
//! broadcast return to `Idle` instead, since nothing needs reconciling.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::amount::{parse_decimal, TokenAmount};
use crate::config::DepositConfig;
use crate::error::{ConfigError, DepositError};
use crate::executor::{EvmExecutor, SolanaExecutor, TransferExecutor};
use crate::report::{DepositReporter, HttpDepositReporter, ReportAck};
use crate::resolver::AddressResolver;
use crate::rpc::{HttpEvmRpc, HttpSolanaRpc, JsonRpcClient};
use crate::types::{
    ChainNamespace, ChainSelection, DepositAttempt, DepositReceipt, DepositReport, DepositStatus,
    TransactionProof,
};
use crate::wallet::{WalletHandle, WalletProvider};

/// The UI the deposit form lives in.
#[async_trait]
pub trait DepositSurface: Send + Sync {
    /// Reloads balances and history after a credited deposit.
    async fn refresh(&self);

    async fn close(&self);
}

/// Result of a `submit` call that did not fail.
#[derive(Debug)]
pub enum DepositOutcome {
    /// A wallet was connected; submit again with it to start the deposit.
    AwaitingConnection(Arc<dyn WalletHandle>),
    Completed(DepositReceipt),
}

/// A confirmed deposit the backend has not acknowledged yet.
#[derive(Debug, Clone)]
pub struct PendingReport {
    pub proof: TransactionProof,
    pub amount: TokenAmount,
    pub report: DepositReport,
}

pub struct DepositOrchestrator {
    executors: HashMap<ChainSelection, Arc<dyn TransferExecutor>>,
    wallets: Arc<dyn WalletProvider>,
    reporter: Arc<dyn DepositReporter>,
    surface: Arc<dyn DepositSurface>,
    status: DepositStatus,
    amount_field: String,
    attempt: Option<DepositAttempt>,
    unreported: Option<PendingReport>,
}

impl DepositOrchestrator {
    pub fn new(
        wallets: Arc<dyn WalletProvider>,
        reporter: Arc<dyn DepositReporter>,
        surface: Arc<dyn DepositSurface>,
    ) -> Self {
        Self {
            executors: HashMap::new(),
            wallets,
            reporter,
            surface,
            status: DepositStatus::Idle,
            amount_field: String::new(),
            attempt: None,
            unreported: None,
        }
    }

    /// Registers the executor for its chain, replacing any previous one.
    pub fn with_executor(mut self, executor: Arc<dyn TransferExecutor>) -> Self {
        self.executors.insert(executor.chain(), executor);
        self
    }

    /// Wires HTTP RPC clients, both executors and the HTTP reporter from
    /// configuration.
    pub fn from_config(
        config: &DepositConfig,
        wallets: Arc<dyn WalletProvider>,
        surface: Arc<dyn DepositSurface>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let resolver = AddressResolver::new(config.environment);
        let rpc_timeout = config.rpc_timeout();

        let evm_client = JsonRpcClient::new(config.evm_rpc_url(), rpc_timeout)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let evm_rpc = HttpEvmRpc::new(
            evm_client,
            Duration::from_millis(config.evm.receipt_poll_interval_ms),
            Duration::from_secs(config.evm.receipt_timeout_secs),
        );
        let evm = EvmExecutor::new(
            Arc::new(evm_rpc),
            resolver,
            chain_eth::parse_address(&config.evm.recipient)?,
        );

        let sol_client = JsonRpcClient::new(config.solana_rpc_url(), rpc_timeout)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let sol_rpc = HttpSolanaRpc::new(
            sol_client,
            Duration::from_millis(config.solana.confirm_poll_interval_ms),
        );
        let solana = SolanaExecutor::new(
            Arc::new(sol_rpc),
            resolver,
            chain_sol::address_to_bytes(&config.solana.recipient)?,
        );

        let reporter = HttpDepositReporter::new(&config.backend)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        info!(environment = ?config.environment, "deposit pipeline configured");
        Ok(Self::new(wallets, Arc::new(reporter), surface)
            .with_executor(Arc::new(evm))
            .with_executor(Arc::new(solana)))
    }

    pub fn status(&self) -> DepositStatus {
        self.status
    }

    pub fn amount_field(&self) -> &str {
        &self.amount_field
    }

    pub fn set_amount_field(&mut self, value: impl Into<String>) {
        self.amount_field = value.into();
    }

    /// The attempt in progress, or the one that ended in `Failed`.
    pub fn attempt(&self) -> Option<&DepositAttempt> {
        self.attempt.as_ref()
    }

    pub fn unreported(&self) -> Option<&PendingReport> {
        self.unreported.as_ref()
    }

    /// Runs one deposit attempt.
    ///
    /// Without a wallet on the selection's namespace this only runs the
    /// connect flow and returns [`DepositOutcome::AwaitingConnection`].
    pub async fn submit(
        &mut self,
        chain: ChainSelection,
        amount: &str,
        wallet: Option<Arc<dyn WalletHandle>>,
    ) -> Result<DepositOutcome, DepositError> {
        if let Some(pending) = &self.unreported {
            return Err(DepositError::ReportPending(pending.proof.reference.clone()));
        }
        self.amount_field = amount.to_string();
        self.attempt = None;

        let namespace = chain.namespace();
        let wallet = match wallet.filter(|w| w.namespace() == namespace) {
            Some(wallet) => wallet,
            None => return self.connect(namespace).await,
        };

        match self.run(chain, amount, wallet).await {
            Ok(receipt) => Ok(DepositOutcome::Completed(receipt)),
            Err(err) => Err(self.settle_failure(err)),
        }
    }

    /// Sends the retained report again. `Ok(None)` when nothing is pending.
    pub async fn retry_report(&mut self) -> Result<Option<DepositReceipt>, DepositError> {
        let Some(pending) = self.unreported.take() else {
            return Ok(None);
        };
        info!(chain = %pending.proof.chain, reference = %pending.proof.reference, "retrying deposit report");
        self.deliver(pending).await.map(Some)
    }

    /// Hands the unreported deposit to the caller for manual reconciliation.
    pub fn take_unreported(&mut self) -> Option<PendingReport> {
        let pending = self.unreported.take()?;
        warn!(reference = %pending.proof.reference, "unreported deposit handed off for reconciliation");
        self.attempt = None;
        self.transition(DepositStatus::Idle);
        Some(pending)
    }

    /// The user picked another network; drop the old wallet connection.
    pub async fn switch_network(&mut self, previous: ChainSelection) {
        let namespace = previous.namespace();
        if let Err(e) = self.wallets.disconnect(namespace).await {
            warn!(%namespace, error = %e, "wallet disconnect failed");
        }
        if self.status == DepositStatus::AwaitingConnection {
            self.transition(DepositStatus::Idle);
        }
    }

    async fn connect(&mut self, namespace: ChainNamespace) -> Result<DepositOutcome, DepositError> {
        self.transition(DepositStatus::AwaitingConnection);
        match self.wallets.connect(namespace).await {
            Ok(handle) => {
                info!(%namespace, address = handle.address(), "wallet connected");
                Ok(DepositOutcome::AwaitingConnection(handle))
            }
            Err(e) => {
                self.transition(DepositStatus::Idle);
                Err(DepositError::WalletConnectionFailed(e.to_string()))
            }
        }
    }

    async fn run(
        &mut self,
        chain: ChainSelection,
        amount: &str,
        wallet: Arc<dyn WalletHandle>,
    ) -> Result<DepositReceipt, DepositError> {
        self.transition(DepositStatus::Validating);
        let requested = parse_decimal(amount)?;
        let executor = self
            .executors
            .get(&chain)
            .cloned()
            .ok_or_else(|| DepositError::UnsupportedNetwork(format!("no executor for {chain}")))?;

        self.transition(DepositStatus::CheckingBalance);
        let prepared = executor.check_balance(wallet.as_ref(), requested).await?;
        self.attempt = Some(DepositAttempt {
            chain,
            amount: prepared.amount.clone(),
            source_address: prepared.source_address.clone(),
            recipient_address: prepared.recipient_address.clone(),
            status: DepositStatus::CheckingBalance,
        });

        self.transition(DepositStatus::Submitting);
        let pending = executor.submit(wallet.as_ref(), &prepared).await?;

        self.transition(DepositStatus::Confirming);
        let proof = executor.confirm(&pending).await?;

        let report = DepositReport::new(&proof, &prepared.amount, &prepared.source_address);
        self.deliver(PendingReport {
            proof,
            amount: prepared.amount,
            report,
        })
        .await
    }

    /// Exactly one backend call; success runs the completion sequence.
    async fn deliver(&mut self, pending: PendingReport) -> Result<DepositReceipt, DepositError> {
        self.transition(DepositStatus::Reporting);

        match self.reporter.report(&pending.report).await {
            Ok(ack) => Ok(self.complete(pending, ack).await),
            Err(e) => {
                error!(
                    chain = %pending.proof.chain,
                    reference = %pending.proof.reference,
                    error = %e,
                    "deposit confirmed on chain but not reported"
                );
                let proof = pending.proof.clone();
                self.unreported = Some(pending);
                self.transition(DepositStatus::Failed);
                Err(DepositError::BackendReportFailed {
                    proof,
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn complete(&mut self, pending: PendingReport, ack: ReportAck) -> DepositReceipt {
        info!(chain = %pending.proof.chain, reference = %pending.proof.reference, "deposit credited");

        self.surface.refresh().await;
        self.surface.close().await;

        let namespace = pending.proof.chain.namespace();
        if let Err(e) = self.wallets.disconnect(namespace).await {
            warn!(%namespace, error = %e, "wallet disconnect after deposit failed");
        }

        self.attempt = None;
        self.amount_field.clear();
        self.transition(DepositStatus::Idle);

        DepositReceipt {
            proof: pending.proof,
            amount: pending.amount,
            message: ack.message,
        }
    }

    fn settle_failure(&mut self, err: DepositError) -> DepositError {
        if err.is_side_effect_free() {
            debug!(kind = ?err.kind(), error = %err, "attempt ended before broadcast");
            self.attempt = None;
            self.transition(DepositStatus::Idle);
        } else if self.status != DepositStatus::Failed {
            error!(kind = ?err.kind(), error = %err, "deposit failed after broadcast");
            self.transition(DepositStatus::Failed);
        }
        err
    }

    fn transition(&mut self, status: DepositStatus) {
        debug!(from = %self.status, to = %status, "deposit status");
        self.status = status;
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.status = status;
        }
    }
}
