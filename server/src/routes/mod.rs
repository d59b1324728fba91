//! HTTP and WebSocket routes.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::routing::{get, post};
use axum::{async_trait, Json, Router};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

mod data;
mod schemas;
mod streams;
mod system;
mod ws;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/status", get(system::status))
        .route("/publisher", get(system::publisher))
        .route("/test/ping", get(system::ping))
        .route("/test/emit", post(system::test_emit))
        .route("/ws", get(ws::upgrade))
        .route("/subscribe", post(streams::subscribe))
        .route("/streams/subscribe", post(streams::streams_subscribe))
        .route("/subscriptions", get(streams::list))
        .route("/unsubscribe", post(streams::unsubscribe))
        .route("/emit", post(streams::emit))
        .route("/streams/emit", post(streams::emit))
        .route("/schemas", get(schemas::list))
        .route("/schemas/compute", post(schemas::compute))
        .route("/schemas/register", post(schemas::register))
        .route("/schemas/registerVersion", post(schemas::register_version))
        .route("/schemas/setLatest", post(schemas::set_latest))
        .route("/schemas/deprecate", post(schemas::deprecate))
        .route("/schemas/diff", post(schemas::diff))
        .route("/schemas/encode", post(schemas::encode))
        .route("/schemas/versions/:label", get(schemas::versions))
        .route("/schemas/version/:label/:version", get(schemas::version))
        .route("/schemas/:label", get(schemas::latest))
        .route("/data/publish", post(data::publish))
        .route("/data/getByKey", post(data::get_by_key))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// JSON request body. An empty body reads as all-defaults so the handler
/// reports which field is absent; a body that does not parse as `T` is
/// rejected with `invalid_body`. The content type is not checked.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|_| ApiError::validation("invalid_body"))?;
        parse_body(&bytes).map(JsonBody)
    }
}

fn parse_body<T: DeserializeOwned + Default>(bytes: &[u8]) -> Result<T, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes).map_err(|err| {
        debug!(%err, "rejecting request body");
        ApiError::validation("invalid_body")
    })
}

/// Empty strings count as absent.
pub(crate) fn present(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.is_empty())
}

/// `{ ok: true, ...head, ...entry }`, with `head` keys first.
pub(crate) fn ok_with(head: Value, entry: impl Serialize) -> Json<Value> {
    let mut out = Map::new();
    out.insert("ok".into(), Value::Bool(true));
    if let Value::Object(head) = head {
        out.extend(head);
    }
    if let Ok(Value::Object(fields)) = serde_json::to_value(entry) {
        out.extend(fields);
    }
    Json(Value::Object(out))
}
