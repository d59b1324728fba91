//! # streamgate-stream
//!
//! Upstream subscriptions and filtered fan-out for StreamGate.
//!
//! ## Architecture
//! ```text
//! StreamsClient::subscribe (one upstream feed per subscription)
//!       │
//!       ▼
//! pump task (per subscription, Tokio, preserves arrival order)
//!       │
//!       ▼
//! BroadcastRouter: schema id extraction → FilterPolicy
//!       │
//!       ▼
//! ConnectionRegistry snapshot → DownstreamClient::send   ← every live socket
//! ```

pub mod filter;
pub mod hub;
pub mod memory;
pub mod router;
pub mod subscription;

pub use filter::{FilterPolicy, FilterRequest, Verdict};
pub use hub::{ClientHub, HubClient};
pub use memory::MemoryStreams;
pub use router::{extract_schema_id, BroadcastRouter};
pub use subscription::SubscriptionRegistry;
