//! # streamgate-rpc
//!
//! Provides [`RpcStreamsClient`], a [`StreamsClient`](streamgate_core::StreamsClient)
//! that talks JSON-RPC 2.0 to a streams node.
//!
//! Request/response calls go over HTTP (`reqwest`). Each upstream
//! subscription owns one WebSocket connection (`tokio-tungstenite`) that
//! issues `streams_subscribe` and forwards `streams_subscription`
//! notifications until cancelled.
//!
//! | Operation | Method |
//! |---|---|
//! | compute schema id | `streams_computeSchemaId` |
//! | register schemas | `streams_registerDataSchemas` |
//! | submit records | `streams_set` |
//! | data + events | `streams_setAndEmitEvents` |
//! | read a record | `streams_getByKey` |
//! | subscribe / cancel | `streams_subscribe` / `streams_unsubscribe` |

pub mod client;
pub mod http;
pub mod request;
pub mod ws;

pub use client::{RpcClientConfig, RpcStreamsClient};
pub use http::HttpTransport;
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
pub use ws::WsFeed;
