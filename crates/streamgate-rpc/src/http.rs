//! HTTP JSON-RPC transport backed by `reqwest`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::Value;
use streamgate_core::RemoteError;
use tracing::debug;

use crate::request::{JsonRpcRequest, JsonRpcResponse};

/// One JSON-RPC endpoint. Failures are returned to the caller as-is; the
/// gateway does not retry remote calls.
pub struct HttpTransport {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self, RemoteError> {
        let url = url.into();
        url::Url::parse(&url).map_err(|e| RemoteError::Transport(format!("invalid url {url}: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self {
            url,
            http,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one request and return its `result`.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RemoteError> {
        let req = JsonRpcRequest::new(self.next_id.fetch_add(1, Ordering::Relaxed), method, params);
        debug!(method = %method, url = %self.url, "rpc call");

        let resp = self
            .http
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Transport(format!("HTTP {status}: {body}")));
        }

        resp.json::<JsonRpcResponse>()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?
            .into_result()
    }
}
