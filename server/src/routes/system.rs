use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use streamgate_core::ConnectionRegistry;

use super::JsonBody;
use crate::state::AppState;

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn status(State(state): State<AppState>) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "chainId": config.chain_id,
        "rpcUrl": config.rpc_url,
        "hasWallet": state.pipeline.has_wallet(),
        "backend": state.remote.name(),
        "subscriptions": state.subscriptions.len(),
        "connections": state.hub.len(),
        "metrics": state.metrics.snapshot(),
    }))
}

pub async fn publisher(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "ok": true, "address": state.remote.publisher() }))
}

pub async fn ping() -> Json<Value> {
    Json(json!({ "ok": true, "ts": now_ms() }))
}

#[derive(Debug, Default, Deserialize)]
pub struct TestEmitBody {
    data: Option<Value>,
}

/// Broadcast straight to every client, bypassing subscriptions and filters.
pub async fn test_emit(
    State(state): State<AppState>,
    JsonBody(b): JsonBody<TestEmitBody>,
) -> Json<Value> {
    let data = b
        .data
        .unwrap_or_else(|| json!({ "hello": "world", "ts": now_ms() }));
    state.router.broadcast(&json!({ "type": "event", "data": data }));
    Json(json!({ "ok": true }))
}
