//! Gateway counters.
//!
//! Plain atomics shared behind an `Arc`; `/status` reports a snapshot.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Counters {
    events_received: AtomicU64,
    events_delivered: AtomicU64,
    filtered_deprecated: AtomicU64,
    filtered_not_latest: AtomicU64,
    delivery_failures: AtomicU64,
    records_published: AtomicU64,
}

/// Central metrics handle. Cloning shares the same counters.
#[derive(Debug, Clone, Default)]
pub struct GatewayMetrics {
    inner: Arc<Counters>,
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub events_received: u64,
    pub events_delivered: u64,
    pub filtered_deprecated: u64,
    pub filtered_not_latest: u64,
    pub delivery_failures: u64,
    pub records_published: u64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.inner.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self, n: u64) {
        self.inner.events_delivered.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_filtered_deprecated(&self) {
        self.inner.filtered_deprecated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_filtered_not_latest(&self) {
        self.inner.filtered_not_latest.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery_failure(&self) {
        self.inner.delivery_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.inner.records_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = &self.inner;
        MetricsSnapshot {
            events_received: c.events_received.load(Ordering::Relaxed),
            events_delivered: c.events_delivered.load(Ordering::Relaxed),
            filtered_deprecated: c.filtered_deprecated.load(Ordering::Relaxed),
            filtered_not_latest: c.filtered_not_latest.load(Ordering::Relaxed),
            delivery_failures: c.delivery_failures.load(Ordering::Relaxed),
            records_published: c.records_published.load(Ordering::Relaxed),
        }
    }
}
