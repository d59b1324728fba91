//! Downstream connection abstractions consumed by the broadcast router.
//!
//! The transport owns the sockets; the router only sees a snapshot of
//! [`DownstreamClient`] handles, so filter logic can be tested without a
//! socket layer.

use std::sync::Arc;

use crate::error::DeliveryError;

/// One live downstream push connection.
pub trait DownstreamClient: Send + Sync {
    /// Connection identifier, unique for the process lifetime.
    fn id(&self) -> u64;

    /// Queue a text frame for this client.
    fn send(&self, frame: &str) -> Result<(), DeliveryError>;
}

/// Accessor for the set of currently connected clients.
pub trait ConnectionRegistry: Send + Sync {
    /// Point-in-time copy of the connected clients.
    fn snapshot(&self) -> Vec<Arc<dyn DownstreamClient>>;

    /// Number of connected clients.
    fn len(&self) -> usize {
        self.snapshot().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
