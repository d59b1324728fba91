//! The `StreamsClient` trait: the remote streams ledger the gateway fronts.
//!
//! One collaborator covers both halves of the remote: request/response calls
//! (schema ids, schema registration, record submission, reads) and push
//! subscriptions that produce an [`UpstreamFeed`].

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RemoteError;

/// A stream of raw upstream push payloads for one subscription.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<Value, RemoteError>> + Send>>;

/// Capability that tears down one upstream subscription.
///
/// Idempotency of repeated calls is the implementation's concern.
pub trait CancelHandle: Send + Sync {
    fn cancel(&self) -> Result<(), RemoteError>;
}

/// An opened upstream subscription.
pub struct UpstreamFeed {
    pub events: EventStream,
    pub cancel: Box<dyn CancelHandle>,
}

impl std::fmt::Debug for UpstreamFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamFeed").finish_non_exhaustive()
    }
}

/// Parameters forwarded to the remote when opening a subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeParams {
    /// Remote event identifier; `None` subscribes to the default feed.
    #[serde(rename = "somniaStreamsEventId")]
    pub event_id: Option<String>,
    #[serde(default)]
    pub eth_calls: Vec<Value>,
    #[serde(default = "default_context")]
    pub context: String,
    #[serde(default = "bool_true")]
    pub only_push_changes: bool,
}

fn default_context() -> String {
    "data".into()
}

fn bool_true() -> bool {
    true
}

impl Default for SubscribeParams {
    fn default() -> Self {
        Self {
            event_id: None,
            eth_calls: Vec::new(),
            context: default_context(),
            only_push_changes: true,
        }
    }
}

/// One schema submitted for remote registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaRegistration {
    /// `label` for latest-mode registration, `label:version` for versioned.
    pub id: String,
    pub schema: String,
    pub parent_schema_id: String,
}

/// One encoded record submitted to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataRecord {
    pub id: String,
    pub schema_id: String,
    /// `0x`-prefixed hex of the encoded values.
    pub data: String,
}

/// The remote streams ledger.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` for use across Tokio tasks and are
/// stored as `Arc<dyn StreamsClient>`.
#[async_trait]
pub trait StreamsClient: Send + Sync + 'static {
    /// Content-derived identifier of a raw schema description.
    async fn compute_schema_id(&self, raw_schema: &str) -> Result<String, RemoteError>;

    /// Register schemas remotely. With `ignore_if_registered`, already
    /// registered ids are skipped instead of failing.
    async fn register_schemas(
        &self,
        entries: Vec<SchemaRegistration>,
        ignore_if_registered: bool,
    ) -> Result<(), RemoteError>;

    /// Store encoded records. Requires a write identity.
    async fn submit_records(&self, records: Vec<DataRecord>) -> Result<Value, RemoteError>;

    /// Store data streams and emit event streams in one remote call.
    async fn set_and_emit_events(
        &self,
        data_streams: Value,
        event_streams: Value,
    ) -> Result<Value, RemoteError>;

    /// Read one record by `(schema_id, publisher, record_id)`.
    async fn fetch_by_key(
        &self,
        schema_id: &str,
        publisher: &str,
        record_id: &str,
    ) -> Result<Value, RemoteError>;

    /// Open an upstream push subscription.
    async fn subscribe(&self, params: SubscribeParams) -> Result<UpstreamFeed, RemoteError>;

    /// Address of the configured write identity, if any.
    fn publisher(&self) -> Option<String>;

    /// Short backend name for status reporting.
    fn name(&self) -> &str;
}
