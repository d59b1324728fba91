//! `RpcStreamsClient`: the remote streams ledger over JSON-RPC.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use streamgate_core::{
    DataRecord, RemoteError, SchemaRegistration, StreamsClient, SubscribeParams, UpstreamFeed,
};

use crate::http::HttpTransport;
use crate::ws::WsFeed;

/// Connection settings for [`RpcStreamsClient`].
#[derive(Debug, Clone)]
pub struct RpcClientConfig {
    /// HTTP JSON-RPC endpoint for request/response calls.
    pub rpc_url: String,
    /// WebSocket endpoint for subscriptions; subscribing fails without one.
    pub streams_url: Option<String>,
    /// Address of the node-side signing identity, if writes are allowed.
    pub publisher: Option<String>,
    pub request_timeout: Duration,
}

pub struct RpcStreamsClient {
    http: HttpTransport,
    streams_url: Option<String>,
    publisher: Option<String>,
}

impl RpcStreamsClient {
    pub fn new(config: RpcClientConfig) -> Result<Self, RemoteError> {
        Ok(Self {
            http: HttpTransport::new(config.rpc_url, config.request_timeout)?,
            streams_url: config.streams_url,
            publisher: config.publisher,
        })
    }

    pub fn rpc_url(&self) -> &str {
        self.http.url()
    }
}

fn to_param<T: serde::Serialize>(v: &T) -> Result<Value, RemoteError> {
    serde_json::to_value(v).map_err(|e| RemoteError::Other(e.to_string()))
}

#[async_trait]
impl StreamsClient for RpcStreamsClient {
    async fn compute_schema_id(&self, raw_schema: &str) -> Result<String, RemoteError> {
        match self
            .http
            .call("streams_computeSchemaId", vec![json!(raw_schema)])
            .await?
        {
            Value::String(id) => Ok(id),
            other => Err(RemoteError::Transport(format!(
                "unexpected schema id result: {other}"
            ))),
        }
    }

    async fn register_schemas(
        &self,
        entries: Vec<SchemaRegistration>,
        ignore_if_registered: bool,
    ) -> Result<(), RemoteError> {
        self.http
            .call(
                "streams_registerDataSchemas",
                vec![to_param(&entries)?, json!(ignore_if_registered)],
            )
            .await?;
        Ok(())
    }

    async fn submit_records(&self, records: Vec<DataRecord>) -> Result<Value, RemoteError> {
        self.http.call("streams_set", vec![to_param(&records)?]).await
    }

    async fn set_and_emit_events(
        &self,
        data_streams: Value,
        event_streams: Value,
    ) -> Result<Value, RemoteError> {
        self.http
            .call("streams_setAndEmitEvents", vec![data_streams, event_streams])
            .await
    }

    async fn fetch_by_key(
        &self,
        schema_id: &str,
        publisher: &str,
        record_id: &str,
    ) -> Result<Value, RemoteError> {
        self.http
            .call(
                "streams_getByKey",
                vec![json!(schema_id), json!(publisher), json!(record_id)],
            )
            .await
    }

    async fn subscribe(&self, params: SubscribeParams) -> Result<UpstreamFeed, RemoteError> {
        let url = self
            .streams_url
            .as_deref()
            .ok_or_else(|| RemoteError::Other("no streams websocket url configured".into()))?;
        WsFeed::open(url, to_param(&params)?).await
    }

    fn publisher(&self) -> Option<String> {
        self.publisher.clone()
    }

    fn name(&self) -> &str {
        "rpc"
    }
}
