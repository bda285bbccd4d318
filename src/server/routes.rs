//! HTTP handlers

use axum::{extract::{Path, Query, State}, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::AppState;
use crate::cashaddr::CashAddress;
use crate::error::WalletError;
use crate::monitor::PaymentStatus;
use crate::paths::routes as paths;
use crate::units::{bch_to_sats, format_bch};
use crate::wallet::payment_uri;

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(paths::HEALTH, get(health))
        .route(paths::CHECK_PAYMENT, get(check_payment))
        .route(paths::ADDRESS, get(address_at))
        .route(paths::DECODE, get(decode))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn bad_request(e: WalletError) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, e.to_string())
}

async fn health(State(s): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "cashdrop",
        "network": s.network,
        "wallet": s.wallet.is_some(),
    }))
}

#[derive(Deserialize)]
struct CheckQuery {
    address: String,
    /// BCH
    amount: Option<f64>,
}

#[derive(Serialize)]
struct CheckResponse {
    address: CashAddress,
    status: PaymentStatus,
    paid: bool,
    amount_sats: u64,
    amount_bch: String,
    tx_hash: Option<String>,
    confirmations: u64,
}

async fn check_payment(State(s): State<AppState>, Query(q): Query<CheckQuery>) -> ApiResult<CheckResponse> {
    let address = CashAddress::parse_for(&q.address, s.network).map_err(bad_request)?;
    let expected = match q.amount {
        Some(bch) => Some(
            bch_to_sats(bch).ok_or_else(|| (StatusCode::BAD_REQUEST, format!("invalid amount: {}", bch)))?,
        ),
        None => None,
    };

    let verdict = s.monitor.poll(&address, expected).await;
    Ok(Json(CheckResponse {
        address,
        status: verdict.status(),
        paid: verdict.paid,
        amount_bch: format_bch(verdict.amount_sats),
        amount_sats: verdict.amount_sats,
        tx_hash: verdict.tx_hash,
        confirmations: verdict.confirmations,
    }))
}

#[derive(Serialize)]
struct AddressResponse {
    index: u32,
    address: CashAddress,
    uri: String,
}

async fn address_at(State(s): State<AppState>, Path(index): Path<u32>) -> ApiResult<AddressResponse> {
    let wallet = s
        .wallet
        .as_ref()
        .ok_or_else(|| (StatusCode::NOT_FOUND, "no wallet configured".to_string()))?;
    let address = wallet.address_at(index).map_err(bad_request)?;
    Ok(Json(AddressResponse { index, uri: payment_uri(&address, None), address }))
}

#[derive(Serialize)]
struct DecodeResponse {
    address: CashAddress,
    network: crate::network::Network,
    payload: String,
    hash160: String,
}

async fn decode(Path(raw): Path<String>) -> ApiResult<DecodeResponse> {
    let address = CashAddress::parse(&raw).map_err(bad_request)?;
    Ok(Json(DecodeResponse {
        network: address.network,
        payload: address.payload(),
        hash160: address.hash_hex(),
        address,
    }))
}
