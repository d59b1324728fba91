//! `MemoryStreams`: an in-process streams ledger.
//!
//! Backs the `memory` backend for local development and tests. Schema ids
//! are computed locally; submitted records and emitted events are pushed to
//! every open subscription.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::channel::mpsc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use streamgate_core::{
    CancelHandle, DataRecord, RemoteError, SchemaRegistration, StreamsClient, SubscribeParams,
    UpstreamFeed,
};
use streamgate_evm::{random_record_id, schema_id};
use tracing::debug;

type Sink = mpsc::UnboundedSender<Result<Value, RemoteError>>;

#[derive(Default)]
struct Ledger {
    /// schema id (lower-case) → registration
    schemas: HashMap<String, SchemaRegistration>,
    /// (schema id lower-case, publisher lower-case, record id) → data
    records: HashMap<(String, String, String), String>,
}

#[derive(Default)]
struct Feeds {
    next_id: AtomicU64,
    sinks: Mutex<HashMap<u64, Sink>>,
    fail_cancel: AtomicBool,
}

struct MemoryCancel {
    id: u64,
    feeds: Arc<Feeds>,
}

impl CancelHandle for MemoryCancel {
    fn cancel(&self) -> Result<(), RemoteError> {
        if self.feeds.fail_cancel.load(Ordering::SeqCst) {
            return Err(RemoteError::Other("unsubscribe rejected".into()));
        }
        self.feeds.sinks.lock().remove(&self.id);
        Ok(())
    }
}

/// In-memory [`StreamsClient`].
#[derive(Default)]
pub struct MemoryStreams {
    publisher: Option<String>,
    ledger: Mutex<Ledger>,
    feeds: Arc<Feeds>,
}

impl MemoryStreams {
    /// Read-only ledger: no write identity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger that accepts writes from `publisher`.
    pub fn with_publisher(publisher: impl Into<String>) -> Self {
        Self {
            publisher: Some(publisher.into()),
            ..Self::default()
        }
    }

    /// Push `payload` to every open subscription. Returns how many received it.
    pub fn emit(&self, payload: Value) -> usize {
        let sinks = self.feeds.sinks.lock();
        sinks
            .values()
            .filter(|sink| sink.unbounded_send(Ok(payload.clone())).is_ok())
            .count()
    }

    /// Push an upstream error to every open subscription.
    pub fn emit_error(&self, error: RemoteError) {
        for sink in self.feeds.sinks.lock().values() {
            let _ = sink.unbounded_send(Err(error.clone()));
        }
    }

    /// Number of open upstream feeds.
    pub fn open_feeds(&self) -> usize {
        self.feeds.sinks.lock().len()
    }

    /// End every open feed, as a node dropping its connections would.
    pub fn close_feeds(&self) {
        self.feeds.sinks.lock().clear();
    }

    /// Make cancel handles fail until reset.
    pub fn set_fail_cancel(&self, fail: bool) {
        self.feeds.fail_cancel.store(fail, Ordering::SeqCst);
    }

    /// Whether a schema with this content id has been registered.
    pub fn is_registered(&self, schema_id: &str) -> bool {
        self.ledger
            .lock()
            .schemas
            .contains_key(&schema_id.to_ascii_lowercase())
    }

    fn writer(&self) -> Result<&str, RemoteError> {
        self.publisher
            .as_deref()
            .ok_or_else(|| RemoteError::Other("no write identity configured".into()))
    }

    fn store(&self, publisher: &str, records: &[DataRecord]) {
        let mut ledger = self.ledger.lock();
        for r in records {
            ledger.records.insert(
                (
                    r.schema_id.to_ascii_lowercase(),
                    publisher.to_ascii_lowercase(),
                    r.id.clone(),
                ),
                r.data.clone(),
            );
        }
    }
}

#[async_trait]
impl StreamsClient for MemoryStreams {
    async fn compute_schema_id(&self, raw_schema: &str) -> Result<String, RemoteError> {
        Ok(schema_id(raw_schema))
    }

    async fn register_schemas(
        &self,
        entries: Vec<SchemaRegistration>,
        ignore_if_registered: bool,
    ) -> Result<(), RemoteError> {
        let mut ledger = self.ledger.lock();
        for entry in entries {
            let id = schema_id(&entry.schema);
            if ledger.schemas.contains_key(&id) {
                if ignore_if_registered {
                    continue;
                }
                return Err(RemoteError::Rpc {
                    code: -32000,
                    message: format!("schema {id} already registered"),
                });
            }
            debug!(schema_id = %id, name = %entry.id, "registered schema");
            ledger.schemas.insert(id, entry);
        }
        Ok(())
    }

    async fn submit_records(&self, records: Vec<DataRecord>) -> Result<Value, RemoteError> {
        let publisher = self.writer()?.to_string();
        self.store(&publisher, &records);
        for r in &records {
            self.emit(json!({
                "schemaId": r.schema_id,
                "dataId": r.id,
                "data": r.data,
                "publisher": publisher,
            }));
        }
        Ok(json!({ "txHash": random_record_id(), "records": records.len() }))
    }

    async fn set_and_emit_events(
        &self,
        data_streams: Value,
        event_streams: Value,
    ) -> Result<Value, RemoteError> {
        let publisher = self.writer()?.to_string();
        let records: Vec<DataRecord> = serde_json::from_value(data_streams)
            .map_err(|e| RemoteError::Other(format!("invalid dataStreams: {e}")))?;
        self.store(&publisher, &records);

        let events = match event_streams {
            Value::Array(events) => events,
            Value::Null => Vec::new(),
            other => vec![other],
        };
        for event in &events {
            self.emit(event.clone());
        }
        Ok(json!({
            "txHash": random_record_id(),
            "records": records.len(),
            "events": events.len(),
        }))
    }

    async fn fetch_by_key(
        &self,
        schema_id: &str,
        publisher: &str,
        record_id: &str,
    ) -> Result<Value, RemoteError> {
        let key = (
            schema_id.to_ascii_lowercase(),
            publisher.to_ascii_lowercase(),
            record_id.to_string(),
        );
        Ok(self
            .ledger
            .lock()
            .records
            .get(&key)
            .map(|d| Value::String(d.clone()))
            .unwrap_or(Value::Null))
    }

    async fn subscribe(&self, params: SubscribeParams) -> Result<UpstreamFeed, RemoteError> {
        let (tx, rx) = mpsc::unbounded();
        let id = self.feeds.next_id.fetch_add(1, Ordering::Relaxed);
        self.feeds.sinks.lock().insert(id, tx);
        debug!(feed = id, event_id = ?params.event_id, "opened memory feed");
        Ok(UpstreamFeed {
            events: Box::pin(rx),
            cancel: Box::new(MemoryCancel {
                id,
                feeds: Arc::clone(&self.feeds),
            }),
        })
    }

    fn publisher(&self) -> Option<String> {
        self.publisher.clone()
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn writes_require_publisher() {
        let streams = MemoryStreams::new();
        let err = streams.submit_records(vec![]).await.unwrap_err();
        assert!(matches!(err, RemoteError::Other(_)));
    }

    #[tokio::test]
    async fn submitted_records_are_readable_and_pushed() {
        let streams = MemoryStreams::with_publisher("0xPub");
        let mut feed = streams.subscribe(SubscribeParams::default()).await.unwrap();

        let record = DataRecord {
            id: "0x01".into(),
            schema_id: "0xAA".into(),
            data: "0xbeef".into(),
        };
        streams.submit_records(vec![record]).await.unwrap();

        let got = streams.fetch_by_key("0xaa", "0xpub", "0x01").await.unwrap();
        assert_eq!(got, json!("0xbeef"));
        let pushed = feed.events.next().await.unwrap().unwrap();
        assert_eq!(pushed["schemaId"], "0xAA");
    }

    #[tokio::test]
    async fn duplicate_registration_respects_ignore_flag() {
        let streams = MemoryStreams::new();
        let reg = SchemaRegistration {
            id: "temp".into(),
            schema: "uint8 a".into(),
            parent_schema_id: streamgate_core::ZERO_BYTES32.into(),
        };
        streams.register_schemas(vec![reg.clone()], true).await.unwrap();
        streams.register_schemas(vec![reg.clone()], true).await.unwrap();
        assert!(streams.register_schemas(vec![reg], false).await.is_err());
        assert!(streams.is_registered(&schema_id("uint8 a")));
    }

    #[tokio::test]
    async fn cancel_closes_the_feed() {
        let streams = MemoryStreams::new();
        let mut feed = streams.subscribe(SubscribeParams::default()).await.unwrap();
        assert_eq!(streams.open_feeds(), 1);
        feed.cancel.cancel().unwrap();
        feed.cancel.cancel().unwrap();
        assert_eq!(streams.open_feeds(), 0);
        assert!(feed.events.next().await.is_none());
    }
}
