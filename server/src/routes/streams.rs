use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use streamgate_core::{bounded, sanitize_for_transport, SubscribeParams};
use streamgate_stream::{FilterPolicy, FilterRequest};
use tracing::info;

use super::{present, JsonBody};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Body of `POST /subscribe`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeBody {
    event_id: Option<String>,
    context: Option<String>,
    only_push_changes: Option<bool>,
    #[serde(flatten)]
    filter: FilterRequest,
}

/// Body of `POST /streams/subscribe`, which mirrors the upstream parameter names.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamsSubscribeBody {
    somnia_streams_event_id: Option<String>,
    eth_calls: Option<Vec<Value>>,
    context: Option<String>,
    only_push_changes: Option<bool>,
    #[serde(flatten)]
    filter: FilterRequest,
}

async fn open(state: &AppState, filter: FilterRequest, params: SubscribeParams) -> ApiResult<Json<Value>> {
    let policy = FilterPolicy::snapshot(filter, &state.registry);
    let id = state.subscriptions.create(policy, params).await?;
    info!(subscription = %id, "subscription created");
    Ok(Json(json!({ "subscriptionId": id })))
}

pub async fn subscribe(
    State(state): State<AppState>,
    JsonBody(b): JsonBody<SubscribeBody>,
) -> ApiResult<Json<Value>> {
    let defaults = SubscribeParams::default();
    let params = SubscribeParams {
        event_id: present(b.event_id),
        context: present(b.context).unwrap_or(defaults.context),
        only_push_changes: b.only_push_changes.unwrap_or(defaults.only_push_changes),
        eth_calls: defaults.eth_calls,
    };
    open(&state, b.filter, params).await
}

pub async fn streams_subscribe(
    State(state): State<AppState>,
    JsonBody(b): JsonBody<StreamsSubscribeBody>,
) -> ApiResult<Json<Value>> {
    let defaults = SubscribeParams::default();
    let params = SubscribeParams {
        event_id: present(b.somnia_streams_event_id),
        eth_calls: b.eth_calls.unwrap_or_default(),
        context: present(b.context).unwrap_or(defaults.context),
        only_push_changes: b.only_push_changes.unwrap_or(defaults.only_push_changes),
    };
    open(&state, b.filter, params).await
}

pub async fn list(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "subscriptions": state.subscriptions.list() }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeBody {
    subscription_id: Option<String>,
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    JsonBody(b): JsonBody<UnsubscribeBody>,
) -> ApiResult<Json<Value>> {
    let id = present(b.subscription_id).ok_or_else(|| ApiError::not_found("not_found"))?;
    state.subscriptions.cancel(&id)?;
    info!(subscription = %id, "subscription cancelled");
    Ok(Json(json!({ "ok": true })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmitBody {
    data_streams: Option<Value>,
    event_streams: Option<Value>,
}

pub async fn emit(
    State(state): State<AppState>,
    JsonBody(b): JsonBody<EmitBody>,
) -> ApiResult<Json<Value>> {
    let data = b.data_streams.unwrap_or_else(|| json!([]));
    let events = b.event_streams.unwrap_or_else(|| json!([]));
    let result = bounded(
        state.config.remote_timeout(),
        state.remote.set_and_emit_events(data, events),
    )
    .await?;
    Ok(Json(json!({ "ok": true, "result": sanitize_for_transport(result) })))
}
