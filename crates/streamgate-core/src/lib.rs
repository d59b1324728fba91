//! # streamgate-core
//!
//! Shared types, errors, and collaborator traits for StreamGate.
//! The schema registry, the subscription engine, and the gateway binary are
//! all built on the interfaces defined here.
//!
//! ## Collaborators
//! - [`StreamsClient`]: the remote streams ledger (schema ids, registration,
//!   record submission, upstream subscriptions)
//! - [`KvStorage`]: durable key-value storage for the schema stores
//! - [`ConnectionRegistry`]: the set of live downstream push connections
//! - [`ValueEncoder`]: the record encoding primitive

pub mod connection;
pub mod encoding;
pub mod error;
pub mod sanitize;
pub mod schema;
pub mod storage;
pub mod streams;
pub mod timeout;

pub use connection::{ConnectionRegistry, DownstreamClient};
pub use encoding::{is_hex_data, ValueEncoder};
pub use error::{DeliveryError, GatewayError, RegistryError, RemoteError, StorageError, StreamError};
pub use sanitize::sanitize_for_transport;
pub use schema::{EncodeValue, SchemaEntry, SchemaField, SchemaVersion, ZERO_BYTES32};
pub use storage::KvStorage;
pub use streams::{
    CancelHandle, DataRecord, EventStream, SchemaRegistration, StreamsClient, SubscribeParams,
    UpstreamFeed,
};
pub use timeout::bounded;
