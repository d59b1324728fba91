//! # streamgate-observability
//!
//! Logging and metrics for StreamGate.
//!
//! ## Counters
//! - `events_received`: upstream push events seen by the router
//! - `events_delivered`: frames queued to downstream clients
//! - `filtered_deprecated`: events dropped by `excludeDeprecated`
//! - `filtered_not_latest`: events dropped by `latestOnly`
//! - `delivery_failures`: frames a client could not accept
//! - `records_published`: records submitted through the publish pipeline
//!
//! ## Structured logging
//! Text or JSON logs through `tracing-subscriber`, with per-component levels.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::{GatewayMetrics, MetricsSnapshot};
pub use tracing_setup::{init_tracing, LogConfig};
