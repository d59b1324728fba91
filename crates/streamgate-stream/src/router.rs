//! `BroadcastRouter`: filters upstream events and fans them out to every
//! connected downstream client.

use std::sync::Arc;

use serde_json::{json, Value};
use streamgate_core::ConnectionRegistry;
use streamgate_observability::GatewayMetrics;
use streamgate_registry::SchemaRegistry;
use tracing::{debug, trace};

use crate::filter::{FilterPolicy, Verdict};

/// Locate the schema id of an upstream payload.
///
/// Checks `schemaId`, then `stream.schemaId`, then `data.schemaId`; the first
/// non-empty string wins. Non-string values count as absent.
pub fn extract_schema_id(payload: &Value) -> Option<&str> {
    let candidates = [
        payload.get("schemaId"),
        payload.get("stream").and_then(|s| s.get("schemaId")),
        payload.get("data").and_then(|d| d.get("schemaId")),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find(|s| !s.is_empty())
}

pub struct BroadcastRouter {
    connections: Arc<dyn ConnectionRegistry>,
    registry: Arc<SchemaRegistry>,
    metrics: GatewayMetrics,
}

impl BroadcastRouter {
    pub fn new(
        connections: Arc<dyn ConnectionRegistry>,
        registry: Arc<SchemaRegistry>,
        metrics: GatewayMetrics,
    ) -> Self {
        Self {
            connections,
            registry,
            metrics,
        }
    }

    pub fn connections(&self) -> &Arc<dyn ConnectionRegistry> {
        &self.connections
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.metrics
    }

    /// Filter one upstream event and deliver it as `{type:"event", data}`.
    pub fn route(&self, subscription: &str, policy: &FilterPolicy, payload: Value) -> Verdict {
        self.metrics.record_received();
        let verdict = policy.evaluate(extract_schema_id(&payload), |id| {
            self.registry.is_deprecated(id)
        });
        match verdict {
            Verdict::Deliver => {
                self.broadcast(&json!({ "type": "event", "data": payload }));
            }
            Verdict::Deprecated => {
                self.metrics.record_filtered_deprecated();
                trace!(subscription = %subscription, "dropped event for deprecated schema");
            }
            Verdict::NotLatest => {
                self.metrics.record_filtered_not_latest();
                trace!(subscription = %subscription, "dropped event for non-latest schema");
            }
        }
        verdict
    }

    /// Send `envelope` to every client connected right now. Returns the
    /// number of clients that accepted it; failures are logged and skipped.
    pub fn broadcast(&self, envelope: &Value) -> usize {
        let frame = envelope.to_string();
        let mut delivered = 0;
        for client in self.connections.snapshot() {
            match client.send(&frame) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    self.metrics.record_delivery_failure();
                    debug!(client = client.id(), error = %e, "dropped frame for client");
                }
            }
        }
        self.metrics.record_delivered(delivered as u64);
        delivered
    }
}
