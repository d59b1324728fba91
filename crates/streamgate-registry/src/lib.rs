//! # streamgate-registry
//!
//! Versioned schema registry for StreamGate.
//!
//! ## Pieces
//! 1. **Descriptor codec**: parses `"type name, type:name"` strings into an
//!    ordered field list and builds encoder-ready value lists
//! 2. **Label store**: label → latest schema entry
//! 3. **Version store**: label → ordered versions with deprecation state
//! 4. **Diff engine**: added / removed / changed fields between two schemas
//!
//! Both stores keep an in-memory cache loaded eagerly at startup and write
//! the full map through a [`KvStorage`](streamgate_core::KvStorage) on every
//! mutation.

pub mod descriptor;
pub mod diff;
mod persist;
pub mod registry;
pub mod storage;
pub mod store;
pub mod versions;

pub use descriptor::{build_encode_values, SchemaDescriptor};
pub use diff::{diff, FieldChange, SchemaDiff};
pub use registry::{ResolvedSchema, SchemaRef, SchemaRegistry};
pub use storage::{FsStorage, MemoryStorage};
pub use store::SchemaStore;
pub use versions::SchemaVersionStore;
