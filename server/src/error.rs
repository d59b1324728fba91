//! HTTP rendering of [`GatewayError`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use streamgate_core::GatewayError;
use tracing::warn;

/// Handler error: every failure leaves as `{ ok: false, error: <code> }`.
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn validation(code: &str) -> Self {
        Self(GatewayError::Validation(code.to_string()))
    }

    pub fn not_found(code: &str) -> Self {
        Self(GatewayError::NotFound(code.to_string()))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl<E: Into<GatewayError>> From<E> for ApiError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self.0, "request failed");
        }
        let body = json!({ "ok": false, "error": self.0.error_code() });
        (status, Json(body)).into_response()
    }
}
