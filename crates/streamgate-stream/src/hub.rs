//! `ClientHub`: in-process registry of downstream push connections.
//!
//! The transport registers a connection and drains the returned receiver
//! into its socket; the broadcast router only ever sees [`snapshot`]s.
//!
//! [`snapshot`]: ConnectionRegistry::snapshot

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use streamgate_core::{error::DeliveryError, ConnectionRegistry, DownstreamClient};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

/// Frames queued per connection before further frames are dropped.
pub const DEFAULT_CLIENT_QUEUE: usize = 256;

/// Sending half of one registered connection.
#[derive(Debug)]
pub struct HubClient {
    id: u64,
    tx: mpsc::Sender<String>,
}

impl DownstreamClient for HubClient {
    fn id(&self) -> u64 {
        self.id
    }

    fn send(&self, frame: &str) -> Result<(), DeliveryError> {
        self.tx.try_send(frame.to_string()).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Backlogged { id: self.id },
            TrySendError::Closed(_) => DeliveryError::Disconnected { id: self.id },
        })
    }
}

#[derive(Debug)]
pub struct ClientHub {
    clients: RwLock<BTreeMap<u64, Arc<HubClient>>>,
    next_id: AtomicU64,
    queue: usize,
}

impl Default for ClientHub {
    fn default() -> Self {
        Self::with_queue(DEFAULT_CLIENT_QUEUE)
    }
}

impl ClientHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hub whose connections each buffer at most `queue` frames; a client
    /// that falls further behind misses frames until it drains.
    pub fn with_queue(queue: usize) -> Self {
        Self {
            clients: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(0),
            queue: queue.max(1),
        }
    }

    /// Add a connection. Frames sent to it arrive on the returned receiver.
    pub fn register(&self) -> (u64, mpsc::Receiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::channel(self.queue);
        self.clients.write().insert(id, Arc::new(HubClient { id, tx }));
        debug!(client = id, "client connected");
        (id, rx)
    }

    /// Drop a connection. Unknown ids are ignored.
    pub fn remove(&self, id: u64) {
        if self.clients.write().remove(&id).is_some() {
            debug!(client = id, "client disconnected");
        }
    }
}

impl ConnectionRegistry for ClientHub {
    fn snapshot(&self) -> Vec<Arc<dyn DownstreamClient>> {
        self.clients
            .read()
            .values()
            .map(|c| Arc::clone(c) as Arc<dyn DownstreamClient>)
            .collect()
    }

    fn len(&self) -> usize {
        self.clients.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_send_remove() {
        let hub = ClientHub::new();
        let (a, mut rx_a) = hub.register();
        let (b, _rx_b) = hub.register();
        assert_ne!(a, b);
        assert_eq!(hub.len(), 2);

        for client in hub.snapshot() {
            if client.id() == a {
                client.send("hello").unwrap();
            }
        }
        assert_eq!(rx_a.try_recv().unwrap(), "hello");

        hub.remove(a);
        hub.remove(a);
        assert_eq!(hub.len(), 1);
    }

    #[test]
    fn slow_reader_drops_frames_past_its_queue() {
        let hub = ClientHub::with_queue(2);
        let (id, mut rx) = hub.register();
        let client = hub.snapshot().pop().unwrap();
        client.send("1").unwrap();
        client.send("2").unwrap();
        let err = client.send("3").unwrap_err();
        assert!(matches!(err, DeliveryError::Backlogged { id: full } if full == id));

        assert_eq!(rx.try_recv().unwrap(), "1");
        client.send("4").unwrap();
        assert_eq!(rx.try_recv().unwrap(), "2");
        assert_eq!(rx.try_recv().unwrap(), "4");
    }

    #[test]
    fn send_to_dropped_receiver_reports_disconnect() {
        let hub = ClientHub::new();
        let (id, rx) = hub.register();
        drop(rx);
        let client = hub.snapshot().pop().unwrap();
        let err = client.send("x").unwrap_err();
        assert!(matches!(err, DeliveryError::Disconnected { id: gone } if gone == id));
    }
}
