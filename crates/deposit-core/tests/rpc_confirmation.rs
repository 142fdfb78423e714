//! Confirmation polling against a live JSON-RPC endpoint.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::B256;
use deposit_core::executor::{PendingDetail, PendingTransfer};
use deposit_core::mocks::SOLANA_BLOCKHASH;
use deposit_core::rpc::{EvmRpc, HttpEvmRpc, HttpSolanaRpc, SolanaRpc};
use deposit_core::{
    AddressResolver, ChainSelection, DepositErrorKind, Environment, RpcError, SolanaExecutor,
    TransferExecutor,
};
use serde_json::{json, Value};

mod support;
use support::{ok, with_context, Reply, RpcServer};

const POLL: Duration = Duration::from_millis(10);
const SIGNATURE: &str =
    "5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnbJLgp8uirBgmQpjKhoR4tjF3ZpRzrFmBV6UjKdiSZkQUW";

fn tx_hash() -> B256 {
    B256::repeat_byte(0xaa)
}

fn receipt(status: &str, block: &str) -> Reply {
    ok(json!({ "status": status, "blockNumber": block, "logs": [] }))
}

fn evm_rpc(server: &RpcServer, timeout: Duration) -> HttpEvmRpc {
    HttpEvmRpc::new(server.client(), POLL, timeout)
}

fn solana_rpc(server: &RpcServer) -> HttpSolanaRpc {
    HttpSolanaRpc::new(server.client(), POLL)
}

fn status(confirmation: &str, err: Value) -> Reply {
    with_context(json!([{
        "slot": 10,
        "confirmations": null,
        "err": err,
        "confirmationStatus": confirmation,
    }]))
}

fn unknown_signature() -> Reply {
    with_context(json!([null]))
}

#[tokio::test]
async fn evm_receipt_survives_a_gateway_error() {
    let server = RpcServer::spawn().await;
    server.on(
        "eth_getTransactionReceipt",
        [Reply::Status(502), receipt("0x1", "0x10")],
    );

    let receipt = evm_rpc(&server, Duration::from_secs(30))
        .wait_for_receipt(tx_hash())
        .await
        .unwrap();

    assert!(receipt.status);
    assert_eq!(receipt.block_number, 16);
    assert_eq!(server.calls("eth_getTransactionReceipt"), 2);
}

#[tokio::test]
async fn evm_receipt_arrives_late() {
    let server = RpcServer::spawn().await;
    server.on(
        "eth_getTransactionReceipt",
        [ok(Value::Null), ok(Value::Null), receipt("0x1", "0x1b4")],
    );

    let receipt = evm_rpc(&server, Duration::from_secs(30))
        .wait_for_receipt(tx_hash())
        .await
        .unwrap();

    assert_eq!(receipt.block_number, 436);
    assert_eq!(server.calls("eth_getTransactionReceipt"), 3);
}

#[tokio::test]
async fn evm_reverted_receipt_reports_failure_status() {
    let server = RpcServer::spawn().await;
    server.on("eth_getTransactionReceipt", [receipt("0x0", "0x20")]);

    let receipt = evm_rpc(&server, Duration::from_secs(30))
        .wait_for_receipt(tx_hash())
        .await
        .unwrap();

    assert!(!receipt.status);
    assert_eq!(receipt.block_number, 32);
}

#[tokio::test]
async fn evm_receipt_wait_times_out() {
    let server = RpcServer::spawn().await;
    server.on("eth_getTransactionReceipt", [ok(Value::Null)]);

    let err = evm_rpc(&server, Duration::from_millis(200))
        .wait_for_receipt(tx_hash())
        .await
        .unwrap_err();

    assert!(matches!(err, RpcError::Timeout(_)), "unexpected {err:?}");
    assert!(server.calls("eth_getTransactionReceipt") >= 1);
}

#[tokio::test]
async fn solana_confirmation_arrives_late() {
    let server = RpcServer::spawn().await;
    server
        .on(
            "getSignatureStatuses",
            [
                unknown_signature(),
                status("processed", Value::Null),
                status("confirmed", Value::Null),
            ],
        )
        .on("getBlockHeight", [ok(json!(100))]);

    let outcome = solana_rpc(&server)
        .confirm_transaction(SIGNATURE, SOLANA_BLOCKHASH, 150)
        .await
        .unwrap();

    assert!(outcome.err.is_none());
    assert_eq!(server.calls("getSignatureStatuses"), 3);
}

#[tokio::test]
async fn solana_program_error_settles_the_signature() {
    let server = RpcServer::spawn().await;
    server
        .on(
            "getSignatureStatuses",
            [status("processed", json!({ "InstructionError": [0, { "Custom": 1 }] }))],
        )
        .on("getBlockHeight", [ok(json!(100))]);

    let outcome = solana_rpc(&server)
        .confirm_transaction(SIGNATURE, SOLANA_BLOCKHASH, 150)
        .await
        .unwrap();

    assert_eq!(outcome.err, Some(json!({ "InstructionError": [0, { "Custom": 1 }] })));
}

#[tokio::test]
async fn solana_expires_past_last_valid_height() {
    let server = RpcServer::spawn().await;
    server
        .on("getSignatureStatuses", [unknown_signature()])
        .on("getBlockHeight", [ok(json!(140)), ok(json!(150)), ok(json!(151))]);

    let err = solana_rpc(&server)
        .confirm_transaction(SIGNATURE, SOLANA_BLOCKHASH, 150)
        .await
        .unwrap_err();

    match err {
        RpcError::BlockHeightExceeded {
            signature,
            last_valid_block_height,
        } => {
            assert_eq!(signature, SIGNATURE);
            assert_eq!(last_valid_block_height, 150);
        }
        other => panic!("unexpected {other:?}"),
    }
    // Three polls plus one last look after expiry.
    assert_eq!(server.calls("getBlockHeight"), 3);
    assert_eq!(server.calls("getSignatureStatuses"), 4);
}

#[tokio::test]
async fn solana_landing_at_the_last_valid_height_is_confirmed() {
    let server = RpcServer::spawn().await;
    server
        .on(
            "getSignatureStatuses",
            [unknown_signature(), status("finalized", Value::Null)],
        )
        .on("getBlockHeight", [ok(json!(151))]);

    let outcome = solana_rpc(&server)
        .confirm_transaction(SIGNATURE, SOLANA_BLOCKHASH, 150)
        .await
        .unwrap();

    assert!(outcome.err.is_none());
    assert_eq!(server.calls("getBlockHeight"), 1);
}

#[tokio::test]
async fn solana_polling_survives_transient_errors() {
    let server = RpcServer::spawn().await;
    server
        .on(
            "getSignatureStatuses",
            [
                Reply::Status(503),
                unknown_signature(),
                status("confirmed", Value::Null),
            ],
        )
        .on("getBlockHeight", [Reply::Status(502), ok(json!(100))]);

    let outcome = solana_rpc(&server)
        .confirm_transaction(SIGNATURE, SOLANA_BLOCKHASH, 150)
        .await
        .unwrap();

    assert!(outcome.err.is_none());
    assert_eq!(server.calls("getSignatureStatuses"), 3);
}

#[tokio::test]
async fn expired_solana_transfer_is_ambiguous_at_the_executor() {
    let server = RpcServer::spawn().await;
    server
        .on("getSignatureStatuses", [unknown_signature()])
        .on("getBlockHeight", [ok(json!(151))]);

    let executor = SolanaExecutor::new(
        Arc::new(solana_rpc(&server)),
        AddressResolver::new(Environment::Mainnet),
        [7; 32],
    );
    let pending = PendingTransfer {
        chain: ChainSelection::Solana,
        reference: SIGNATURE.to_string(),
        detail: PendingDetail::Solana {
            blockhash: SOLANA_BLOCKHASH.to_string(),
            last_valid_block_height: 150,
        },
    };

    let err = executor.confirm(&pending).await.unwrap_err();

    assert_eq!(err.kind(), DepositErrorKind::ChainConfirmationError);
    assert!(err.to_string().contains(SIGNATURE));
    assert_eq!(server.calls("sendTransaction"), 0);
}
