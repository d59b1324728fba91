//! `KvStorage`: the durable key-value collaborator behind the schema stores.

use async_trait::async_trait;

use crate::error::StorageError;

/// Path-keyed durable storage.
///
/// Implementations live in `streamgate-registry` (`FsStorage`,
/// `MemoryStorage`).
#[async_trait]
pub trait KvStorage: Send + Sync {
    /// Read the full contents at `path`. `Ok(None)` means the key is absent.
    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the contents at `path`.
    ///
    /// Either the whole value is stored or the previous value is left intact.
    async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Make sure the parent location of `path` exists.
    async fn ensure_directory(&self, path: &str) -> Result<(), StorageError>;
}
