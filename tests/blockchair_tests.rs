//! Blockchair Tests: the HTTP adapter against a local fake provider
//!
//! These tests verify:
//! 1. Dashboard responses decode into UTXOs, summaries and history
//! 2. Addresses are requested without their CashAddr prefix
//! 3. Push outcomes map to accepted / rejected / status errors
//! 4. Slow providers surface as timeouts, and the monitor fails open
//! 5. A monitor poll costs one dashboard request

use axum::extract::{Form, Path};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use cashdrop::chain::{BlockchairClient, ChainConfig, ChainData};
use cashdrop::{Broadcaster, CashAddress, ChainError, Network, PaymentMonitor, WalletError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const FUNDED: &str = "bitcoincash:qqyx49mu0kkn9ftfj6hje6g2wfer34yfnq5tahq3q6";

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{}", addr)
}

async fn dashboard(Path(key): Path<String>) -> (StatusCode, Json<Value>) {
    if key.contains(':') {
        return (StatusCode::BAD_REQUEST, Json(json!({"data": null, "context": {"code": 400, "error": "prefix"}})));
    }
    if key != FUNDED.trim_start_matches("bitcoincash:") {
        return (StatusCode::OK, Json(json!({"data": {}, "context": {"code": 200}})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "data": {
                key: {
                    "address": {"type": "pubkeyhash", "balance": 150000, "received": 200000, "transaction_count": 3},
                    "transactions": [
                        {"block_id": -1, "hash": "t3", "time": "2024-05-01 12:00:00", "balance_change": 100000},
                        {"block_id": 800000, "hash": "t2", "time": "2024-04-01 12:00:00", "balance_change": -50000},
                        {"block_id": 799990, "hash": "t1", "time": "2024-03-30 08:15:00", "balance_change": 100000}
                    ],
                    "utxo": [
                        {"block_id": -1, "transaction_hash": "t3", "index": 0, "value": 100000},
                        {"block_id": 799990, "transaction_hash": "t1", "index": 1, "value": 50000}
                    ]
                }
            },
            "context": {"code": 200, "state": 800002}
        })),
    )
}

async fn stats() -> Json<Value> {
    Json(json!({"data": {"blocks": 800003, "best_block_height": 800002}, "context": {"code": 200}}))
}

async fn push(Form(form): Form<HashMap<String, String>>) -> (StatusCode, String) {
    let data = form.get("data").cloned().unwrap_or_default();
    match &data[..2.min(data.len())] {
        "00" => (StatusCode::OK, json!({"data": {"transaction_hash": "accepted"}, "context": {"code": 200}}).to_string()),
        "dd" => (StatusCode::OK, json!({"data": {}, "context": {"code": 200}}).to_string()),
        "ff" => (
            StatusCode::BAD_REQUEST,
            json!({"data": null, "context": {"code": 400, "error": "bad-txns-inputs-missingorspent"}}).to_string(),
        ),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>".to_string()),
    }
}

fn provider() -> Router {
    Router::new()
        .route("/dashboards/address/:key", get(dashboard))
        .route("/stats", get(stats))
        .route("/push/transaction", post(push))
}

async fn client() -> BlockchairClient {
    let base = spawn(provider()).await;
    BlockchairClient::new(ChainConfig::default().with_base_url(Network::Mainnet, base)).expect("client")
}

fn funded() -> CashAddress {
    CashAddress::parse(FUNDED).unwrap()
}

/// Test: UTXOs keep provider order and carry the queried address
#[tokio::test]
async fn utxos_decode() {
    let utxos = client().await.fetch_utxos(&funded()).await.expect("utxos");
    assert_eq!(utxos.len(), 2);
    assert_eq!((utxos[0].txid.as_str(), utxos[0].output_index, utxos[0].value_sats), ("t3", 0, 100_000));
    assert_eq!((utxos[1].txid.as_str(), utxos[1].output_index, utxos[1].value_sats), ("t1", 1, 50_000));
    assert!(utxos.iter().all(|u| u.address == funded()));
}

/// Test: summary and history decode, block_id -1 is mempool
#[tokio::test]
async fn summary_and_history_decode() {
    let chain = client().await;
    let summary = chain.fetch_address_summary(&funded()).await.expect("summary");
    assert_eq!((summary.balance_sats, summary.received_sats, summary.transaction_count), (150_000, 200_000, 3));

    let history = chain.fetch_address_transactions(&funded()).await.expect("history");
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].block_height, None);
    assert_eq!(history[1].balance_change, -50_000);
    assert_eq!(history[2].block_height, Some(799_990));
    assert_eq!(history[2].time.map(|t| t.to_rfc3339()).as_deref(), Some("2024-03-30T08:15:00+00:00"));

    assert_eq!(chain.fetch_best_block_height(Network::Mainnet).await.expect("height"), 800_002);
}

/// Test: an address the provider knows nothing about is empty, not an error
#[tokio::test]
async fn unknown_address_is_empty() {
    let chain = client().await;
    let empty = CashAddress::new([0x42; 20], Network::Mainnet);
    assert!(chain.fetch_utxos(&empty).await.expect("utxos").is_empty());
    assert_eq!(chain.fetch_address_summary(&empty).await.expect("summary").transaction_count, 0);
}

/// Test: push outcomes
#[tokio::test]
async fn push_outcomes() {
    let chain = client().await;
    assert_eq!(chain.push_transaction("00aa", Network::Mainnet).await, Ok(Some("accepted".into())));
    assert_eq!(chain.push_transaction("ddaa", Network::Mainnet).await, Ok(None));
    assert_eq!(
        chain.push_transaction("ffaa", Network::Mainnet).await,
        Err(ChainError::Rejected("bad-txns-inputs-missingorspent".into()))
    );
    assert_eq!(chain.push_transaction("abcd", Network::Mainnet).await, Err(ChainError::Status(500)));
}

/// Test: the broadcaster distinguishes rejection from an unusable provider
#[tokio::test]
async fn broadcaster_over_http() {
    let broadcaster = Broadcaster::new(Arc::new(client().await));
    assert_eq!(broadcaster.broadcast("00aa", Network::Mainnet).await.expect("accepted"), "accepted");
    assert!(matches!(
        broadcaster.broadcast("ffaa", Network::Mainnet).await,
        Err(WalletError::BroadcastRejected(reason)) if reason.contains("missingorspent")
    ));
    assert!(matches!(
        broadcaster.broadcast("abcd", Network::Mainnet).await,
        Err(WalletError::BroadcastUnreachable(_))
    ));
}

/// Test: monitor over HTTP uses the newest incoming transaction
#[tokio::test]
async fn monitor_over_http() {
    let monitor = PaymentMonitor::new(Arc::new(client().await));
    let verdict = monitor.poll(&funded(), Some(100_000)).await;
    assert!(verdict.paid);
    assert_eq!(verdict.amount_sats, 100_000);
    assert_eq!(verdict.tx_hash.as_deref(), Some("t3"));
    assert_eq!(verdict.confirmations, 0);
}

/// Test: one poll reads the address dashboard once
#[tokio::test]
async fn monitor_reads_dashboard_once() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counted = hits.clone();
    let router = Router::new().route(
        "/dashboards/address/:key",
        get(move |key: Path<String>| {
            let counted = counted.clone();
            async move {
                counted.fetch_add(1, Ordering::SeqCst);
                dashboard(key).await
            }
        }),
    );
    let base = spawn(router).await;
    let chain = BlockchairClient::new(ChainConfig::default().with_base_url(Network::Mainnet, base)).expect("client");

    let verdict = PaymentMonitor::new(Arc::new(chain)).poll(&funded(), None).await;
    assert!(verdict.paid);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

/// Test: a provider slower than the timeout is a Timeout, and the monitor reports unpaid
#[tokio::test]
async fn slow_provider_times_out() {
    let slow = Router::new().route(
        "/dashboards/address/:key",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"data": {}}))
        }),
    );
    let base = spawn(slow).await;
    let config = ChainConfig::default()
        .with_base_url(Network::Mainnet, base)
        .with_timeout(Duration::from_millis(200));
    let chain = Arc::new(BlockchairClient::new(config).expect("client"));

    assert_eq!(chain.fetch_utxos(&funded()).await, Err(ChainError::Timeout));

    let verdict = PaymentMonitor::new(chain).poll(&funded(), None).await;
    assert!(!verdict.paid);
    assert_eq!(verdict.confirmations, 0);
}

/// Test: an unreachable provider is a transport error
#[tokio::test]
async fn unreachable_provider() {
    let config = ChainConfig::default()
        .with_base_url(Network::Mainnet, "http://127.0.0.1:1")
        .with_timeout(Duration::from_secs(2));
    let chain = BlockchairClient::new(config).expect("client");
    assert!(matches!(chain.fetch_best_block_height(Network::Mainnet).await, Err(ChainError::Transport(_))));
}
