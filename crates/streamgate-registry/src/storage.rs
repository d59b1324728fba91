//! `KvStorage` implementations: file-backed and in-memory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use streamgate_core::{error::StorageError, KvStorage};

/// File-backed storage rooted at a directory.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// failed write never truncates the previous contents.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

fn io_err(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl KvStorage for FsStorage {
    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let full = self.resolve(path);
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(&full, e)),
        }
    }

    async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let full = self.resolve(path);
        let mut tmp = full.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| io_err(&tmp, e))?;
        tokio::fs::rename(&tmp, &full)
            .await
            .map_err(|e| io_err(&full, e))
    }

    async fn ensure_directory(&self, path: &str) -> Result<(), StorageError> {
        let full = self.resolve(path);
        let dir = full.parent().unwrap_or(&self.root);
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| io_err(dir, e))
    }
}

/// In-memory storage for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: Mutex<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without going through `write`.
    pub fn insert(&self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.data.lock().insert(path.into(), bytes.into());
    }

    /// Current raw value at `path`.
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.data.lock().get(path).cloned()
    }

    /// Make every subsequent `write` fail (simulates a full disk).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl KvStorage for MemoryStorage {
    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.get(path))
    }

    async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Other(format!("write to {path} rejected")));
        }
        self.data.lock().insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn ensure_directory(&self, _path: &str) -> Result<(), StorageError> {
        Ok(())
    }
}
