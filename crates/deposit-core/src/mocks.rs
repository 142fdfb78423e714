//! In-memory collaborators for tests and demos.
//!
//! Every mock writes to a shared [`EventLog`] so callers can assert not only
//! what happened but in which order.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};

use crate::error::{ReportError, RpcError, WalletError};
use crate::orchestrator::DepositSurface;
use crate::report::{DepositReporter, ReportAck};
use crate::rpc::{
    BlockhashInfo, EvmRpc, SignatureOutcome, SolanaRpc, TokenAccountBalance, TransactionReceipt,
};
use crate::types::{ChainNamespace, DepositReport};
use crate::wallet::{EvmCall, WalletHandle, WalletProvider};

pub const EVM_WALLET_ADDRESS: &str = "0x1111111111111111111111111111111111111111";
pub const EVM_PLATFORM_ADDRESS: &str = "0x2222222222222222222222222222222222222222";
pub const EVM_TX_HASH: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const SOLANA_PLATFORM_ADDRESS: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
/// Base58 of 32 `0x01` bytes.
pub const SOLANA_BLOCKHASH: &str = "4vJ9JU1bJJE96FWSJKvHsmmFADCg4gpZQff4P3bkLKi";

const SOLANA_WALLET_SEED: [u8; 32] = [9; 32];

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Something a collaborator was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect(ChainNamespace),
    Disconnect(ChainNamespace),
    EvmDecimals,
    EvmBalanceOf,
    EvmSendTransaction(EvmCall),
    EvmWaitReceipt(String),
    SolAccountExists(String),
    SolTokenBalance(String),
    SolLatestBlockhash,
    SolSignMessage,
    SolSendTransaction,
    SolConfirm(String),
    Report(String),
    Refresh,
    Close,
}

impl Event {
    /// True for events that change chain state.
    pub fn is_chain_write(&self) -> bool {
        matches!(self, Event::EvmSendTransaction(_) | Event::SolSendTransaction)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: Event) {
        lock(&self.0).push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        lock(&self.0).clone()
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        lock(&self.0).iter().filter(|e| predicate(e)).count()
    }

    /// Index of the first event matching `predicate`.
    pub fn position(&self, predicate: impl Fn(&Event) -> bool) -> Option<usize> {
        lock(&self.0).iter().position(predicate)
    }

    pub fn clear(&self) {
        lock(&self.0).clear();
    }
}

// ---------------------------------------------------------------------------
// Wallets
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct MockWallet {
    address: String,
    chain_id: String,
    namespace: ChainNamespace,
    log: EventLog,
    signing_key: Option<SigningKey>,
    tx_hash: String,
    reject: bool,
    relay_failure: Option<String>,
    corrupt_signature: bool,
}

impl MockWallet {
    /// EVM wallet that returns [`EVM_TX_HASH`] for every transaction.
    pub fn evm(chain_id: &str, log: EventLog) -> Self {
        Self {
            address: EVM_WALLET_ADDRESS.to_string(),
            chain_id: chain_id.to_string(),
            namespace: ChainNamespace::Eip155,
            log,
            signing_key: None,
            tx_hash: EVM_TX_HASH.to_string(),
            reject: false,
            relay_failure: None,
            corrupt_signature: false,
        }
    }

    /// Solana wallet backed by a fixed Ed25519 key.
    pub fn solana(chain_id: &str, log: EventLog) -> Self {
        let key = SigningKey::from_bytes(&SOLANA_WALLET_SEED);
        Self {
            address: bs58::encode(key.verifying_key().as_bytes()).into_string(),
            chain_id: chain_id.to_string(),
            namespace: ChainNamespace::Solana,
            log,
            signing_key: Some(key),
            tx_hash: String::new(),
            reject: false,
            relay_failure: None,
            corrupt_signature: false,
        }
    }

    pub fn with_tx_hash(mut self, hash: impl Into<String>) -> Self {
        self.tx_hash = hash.into();
        self
    }

    /// The user declines every request.
    pub fn rejecting(mut self) -> Self {
        self.reject = true;
        self
    }

    /// The transfer request goes out but the wallet reports a connection
    /// failure instead of a hash.
    pub fn with_relay_failure(mut self, reason: impl Into<String>) -> Self {
        self.relay_failure = Some(reason.into());
        self
    }

    /// Signatures come back with a flipped byte.
    pub fn with_corrupt_signatures(mut self) -> Self {
        self.corrupt_signature = true;
        self
    }
}

#[async_trait]
impl WalletHandle for MockWallet {
    fn address(&self) -> &str {
        &self.address
    }

    fn chain_id(&self) -> &str {
        &self.chain_id
    }

    fn namespace(&self) -> ChainNamespace {
        self.namespace
    }

    async fn send_transaction(&self, call: &EvmCall) -> Result<String, WalletError> {
        if self.namespace != ChainNamespace::Eip155 {
            return Err(WalletError::Unsupported("not an EVM wallet".into()));
        }
        if self.reject {
            return Err(WalletError::UserRejected);
        }
        self.log.record(Event::EvmSendTransaction(call.clone()));
        if let Some(reason) = &self.relay_failure {
            return Err(WalletError::Connection(reason.clone()));
        }
        Ok(self.tx_hash.clone())
    }

    async fn sign_message(&self, message: &[u8]) -> Result<[u8; 64], WalletError> {
        let key = self
            .signing_key
            .as_ref()
            .ok_or_else(|| WalletError::Unsupported("not a Solana wallet".into()))?;
        if self.reject {
            return Err(WalletError::UserRejected);
        }
        self.log.record(Event::SolSignMessage);

        let mut signature = key.sign(message).to_bytes();
        if self.corrupt_signature {
            signature[0] ^= 0xff;
        }
        Ok(signature)
    }
}

#[derive(Default)]
pub struct MockWalletProvider {
    log: EventLog,
    wallets: HashMap<ChainNamespace, Arc<dyn WalletHandle>>,
    fail_disconnect: bool,
}

impl MockWalletProvider {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    /// Wallet handed out when `connect` is called for its namespace.
    pub fn with_wallet(mut self, wallet: Arc<dyn WalletHandle>) -> Self {
        self.wallets.insert(wallet.namespace(), wallet);
        self
    }

    pub fn failing_disconnect(mut self) -> Self {
        self.fail_disconnect = true;
        self
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    async fn connect(&self, namespace: ChainNamespace) -> Result<Arc<dyn WalletHandle>, WalletError> {
        self.log.record(Event::Connect(namespace));
        self.wallets
            .get(&namespace)
            .cloned()
            .ok_or_else(|| WalletError::Connection(format!("no {namespace} wallet available")))
    }

    async fn disconnect(&self, namespace: ChainNamespace) -> Result<(), WalletError> {
        self.log.record(Event::Disconnect(namespace));
        if self.fail_disconnect {
            return Err(WalletError::Other("disconnect failed".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// EVM RPC
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptBehavior {
    Success,
    Reverted,
    Timeout,
}

#[derive(Debug)]
pub struct MockEvmRpc {
    log: EventLog,
    decimals: u8,
    balance: U256,
    receipt: ReceiptBehavior,
    unavailable: bool,
}

impl MockEvmRpc {
    /// USDC-like token (6 decimals) with a zero balance and successful receipts.
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            decimals: 6,
            balance: U256::ZERO,
            receipt: ReceiptBehavior::Success,
            unavailable: false,
        }
    }

    pub fn with_balance(mut self, base_units: u64) -> Self {
        self.balance = U256::from(base_units);
        self
    }

    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn with_receipt(mut self, receipt: ReceiptBehavior) -> Self {
        self.receipt = receipt;
        self
    }

    /// Every read fails with a transport error.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }
}

#[async_trait]
impl EvmRpc for MockEvmRpc {
    async fn balance_of(&self, _token: Address, _owner: Address) -> Result<U256, RpcError> {
        self.log.record(Event::EvmBalanceOf);
        if self.unavailable {
            return Err(RpcError::Transport("connection refused".into()));
        }
        Ok(self.balance)
    }

    async fn decimals(&self, _token: Address) -> Result<u8, RpcError> {
        self.log.record(Event::EvmDecimals);
        if self.unavailable {
            return Err(RpcError::Transport("connection refused".into()));
        }
        Ok(self.decimals)
    }

    async fn wait_for_receipt(&self, hash: B256) -> Result<TransactionReceipt, RpcError> {
        self.log.record(Event::EvmWaitReceipt(hash.to_string()));
        match self.receipt {
            ReceiptBehavior::Success => Ok(TransactionReceipt {
                status: true,
                block_number: 100,
            }),
            ReceiptBehavior::Reverted => Ok(TransactionReceipt {
                status: false,
                block_number: 100,
            }),
            ReceiptBehavior::Timeout => Err(RpcError::Timeout(format!("no receipt for {hash}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Solana RPC
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendBehavior {
    Accept,
    /// The node answers with a JSON-RPC error (preflight failure).
    Reject,
    /// The request is lost in transit.
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmBehavior {
    Confirmed,
    ProgramError,
    Expired,
}

#[derive(Debug)]
pub struct MockSolanaRpc {
    log: EventLog,
    accounts: HashSet<String>,
    balances: HashMap<String, TokenAccountBalance>,
    blockhash: BlockhashInfo,
    send: SendBehavior,
    confirm: ConfirmBehavior,
    sent: Mutex<Vec<Vec<u8>>>,
}

impl MockSolanaRpc {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            accounts: HashSet::new(),
            balances: HashMap::new(),
            blockhash: BlockhashInfo {
                blockhash: SOLANA_BLOCKHASH.to_string(),
                last_valid_block_height: 1_000,
            },
            send: SendBehavior::Accept,
            confirm: ConfirmBehavior::Confirmed,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Marks `account` as existing, e.g. a recipient token account.
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.accounts.insert(account.into());
        self
    }

    /// Creates a token account holding `amount` base units.
    pub fn with_token_balance(mut self, account: impl Into<String>, amount: u64, decimals: u8) -> Self {
        let account = account.into();
        self.accounts.insert(account.clone());
        self.balances.insert(
            account,
            TokenAccountBalance {
                amount,
                decimals,
                ui_amount: None,
            },
        );
        self
    }

    pub fn with_send(mut self, send: SendBehavior) -> Self {
        self.send = send;
        self
    }

    pub fn with_confirm(mut self, confirm: ConfirmBehavior) -> Self {
        self.confirm = confirm;
        self
    }

    /// Wire transactions received by `send_raw_transaction`.
    pub fn sent_transactions(&self) -> Vec<Vec<u8>> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl SolanaRpc for MockSolanaRpc {
    async fn account_exists(&self, account: &str) -> Result<bool, RpcError> {
        self.log.record(Event::SolAccountExists(account.to_string()));
        Ok(self.accounts.contains(account))
    }

    async fn get_token_account_balance(
        &self,
        account: &str,
    ) -> Result<TokenAccountBalance, RpcError> {
        self.log.record(Event::SolTokenBalance(account.to_string()));
        self.balances
            .get(account)
            .cloned()
            .ok_or_else(|| RpcError::AccountNotFound(account.to_string()))
    }

    async fn get_latest_blockhash(&self) -> Result<BlockhashInfo, RpcError> {
        self.log.record(Event::SolLatestBlockhash);
        Ok(self.blockhash.clone())
    }

    async fn send_raw_transaction(&self, transaction: &[u8]) -> Result<String, RpcError> {
        self.log.record(Event::SolSendTransaction);
        match self.send {
            SendBehavior::Accept => {
                lock(&self.sent).push(transaction.to_vec());
                let signature = transaction
                    .get(1..65)
                    .ok_or_else(|| RpcError::InvalidResponse("truncated transaction".into()))?;
                Ok(bs58::encode(signature).into_string())
            }
            SendBehavior::Reject => Err(RpcError::Rpc {
                code: -32002,
                message: "Transaction simulation failed: insufficient funds".into(),
            }),
            SendBehavior::Drop => Err(RpcError::Transport("connection reset".into())),
        }
    }

    async fn confirm_transaction(
        &self,
        signature: &str,
        _blockhash: &str,
        last_valid_block_height: u64,
    ) -> Result<SignatureOutcome, RpcError> {
        self.log.record(Event::SolConfirm(signature.to_string()));
        match self.confirm {
            ConfirmBehavior::Confirmed => Ok(SignatureOutcome::default()),
            ConfirmBehavior::ProgramError => Ok(SignatureOutcome {
                err: Some(serde_json::json!({ "InstructionError": [0, { "Custom": 1 }] })),
            }),
            ConfirmBehavior::Expired => Err(RpcError::BlockHeightExceeded {
                signature: signature.to_string(),
                last_valid_block_height,
            }),
        }
    }
}

/// Associated token account of `owner` for `mint`, in base58.
pub fn associated_token_account(owner: &str, mint: &str) -> Result<String, chain_sol::SolError> {
    let owner = chain_sol::address_to_bytes(owner)?;
    let mint = chain_sol::address_to_bytes(mint)?;
    let ata = chain_sol::derive_associated_token_address(&owner, &mint)?;
    Ok(chain_sol::bytes_to_address(&ata))
}

// ---------------------------------------------------------------------------
// Backend and UI
// ---------------------------------------------------------------------------

/// Backend that credits each `tx_identifier` at most once.
#[derive(Debug)]
pub struct MockReporter {
    log: EventLog,
    failures_remaining: AtomicUsize,
    credited: Mutex<HashSet<String>>,
    reports: Mutex<Vec<DepositReport>>,
}

impl MockReporter {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            failures_remaining: AtomicUsize::new(0),
            credited: Mutex::new(HashSet::new()),
            reports: Mutex::new(Vec::new()),
        }
    }

    /// The next `times` reports fail with a server error.
    pub fn failing(self, times: usize) -> Self {
        self.failures_remaining.store(times, Ordering::SeqCst);
        self
    }

    /// Every report received, including failed and duplicate ones.
    pub fn reports(&self) -> Vec<DepositReport> {
        lock(&self.reports).clone()
    }

    /// Number of distinct deposits credited.
    pub fn credited(&self) -> usize {
        lock(&self.credited).len()
    }
}

#[async_trait]
impl DepositReporter for MockReporter {
    async fn report(&self, report: &DepositReport) -> Result<ReportAck, ReportError> {
        self.log.record(Event::Report(report.tx_identifier.clone()));
        lock(&self.reports).push(report.clone());

        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ReportError::Rejected {
                status: 503,
                message: "Service unavailable".into(),
            });
        }

        let fresh = lock(&self.credited).insert(report.tx_identifier.clone());
        let message = if fresh {
            "Deposit recorded"
        } else {
            "Deposit already recorded"
        };
        Ok(ReportAck {
            message: Some(message.to_string()),
        })
    }
}

#[derive(Debug)]
pub struct MockSurface {
    log: EventLog,
}

impl MockSurface {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }
}

#[async_trait]
impl DepositSurface for MockSurface {
    async fn refresh(&self) {
        self.log.record(Event::Refresh);
    }

    async fn close(&self) {
        self.log.record(Event::Close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blockhash_constant_decodes() {
        assert_eq!(
            chain_sol::address_to_bytes(SOLANA_BLOCKHASH).unwrap(),
            [1u8; 32]
        );
    }

    #[test]
    fn solana_wallet_address_is_valid() {
        let wallet = MockWallet::solana("solana:EtWTRABZaYq6iMfeYKouRu166VU2xqa1", EventLog::new());
        chain_sol::validate_address(wallet.address()).unwrap();
        chain_sol::validate_address(SOLANA_PLATFORM_ADDRESS).unwrap();
    }

    #[tokio::test]
    async fn reporter_credits_once() {
        let log = EventLog::new();
        let reporter = MockReporter::new(log.clone());
        let report = DepositReport {
            chain: crate::types::ChainSelection::Solana,
            amount: rust_decimal::Decimal::ONE,
            depositor: "depositor".into(),
            tx_identifier: "sig".into(),
        };

        reporter.report(&report).await.unwrap();
        let second = reporter.report(&report).await.unwrap();

        assert_eq!(reporter.credited(), 1);
        assert_eq!(second.message.as_deref(), Some("Deposit already recorded"));
        assert_eq!(log.count(|e| matches!(e, Event::Report(_))), 2);
    }

    #[tokio::test]
    async fn reporter_fails_then_recovers() {
        let reporter = MockReporter::new(EventLog::new()).failing(1);
        let report = DepositReport {
            chain: crate::types::ChainSelection::Base,
            amount: rust_decimal::Decimal::ONE,
            depositor: "depositor".into(),
            tx_identifier: "0xhash".into(),
        };

        assert!(reporter.report(&report).await.is_err());
        assert!(reporter.report(&report).await.is_ok());
        assert_eq!(reporter.credited(), 1);
    }
}
