//! Write-through persisted map shared by the label and version stores.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use streamgate_core::{error::RegistryError, KvStorage};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

pub(crate) type LabelMap<V> = IndexMap<String, V>;

/// Label-keyed map cached in memory and persisted as one JSON document.
///
/// Mutations are serialized by `write_lock` and run against a copy of the
/// cache; the copy replaces the cache only after it has been persisted.
pub(crate) struct PersistedMap<V> {
    storage: Arc<dyn KvStorage>,
    path: String,
    cache: RwLock<LabelMap<V>>,
    write_lock: Mutex<()>,
}

impl<V> PersistedMap<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    /// Load the map at `path`. An absent or unreadable document is replaced
    /// by a freshly persisted empty map.
    pub(crate) async fn load(
        storage: Arc<dyn KvStorage>,
        path: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        let path = path.into();
        storage.ensure_directory(&path).await?;

        let loaded = match storage.read(&path).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<LabelMap<V>>(&bytes) {
                Ok(map) => Some(map),
                Err(e) => {
                    warn!(path = %path, error = %e, "unreadable schema store, resetting");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(path = %path, error = %e, "schema store read failed, resetting");
                None
            }
        };

        let map = match loaded {
            Some(map) => map,
            None => {
                let empty = LabelMap::<V>::new();
                storage
                    .write(&path, &serde_json::to_vec_pretty(&empty)?)
                    .await?;
                empty
            }
        };
        info!(path = %path, labels = map.len(), "schema store loaded");

        Ok(Self {
            storage,
            path,
            cache: RwLock::new(map),
            write_lock: Mutex::new(()),
        })
    }

    pub(crate) fn get(&self, label: &str) -> Option<V> {
        self.cache.read().get(label).cloned()
    }

    pub(crate) fn snapshot(&self) -> LabelMap<V> {
        self.cache.read().clone()
    }

    /// Run `f` under the read lock without cloning the map.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&LabelMap<V>) -> R) -> R {
        f(&self.cache.read())
    }

    /// Atomic load-modify-persist-swap. If `f` or the write fails, neither
    /// the cache nor the persisted document changes.
    pub(crate) async fn update<R>(
        &self,
        f: impl FnOnce(&mut LabelMap<V>) -> Result<R, RegistryError>,
    ) -> Result<R, RegistryError> {
        let _guard = self.write_lock.lock().await;
        let mut next = self.cache.read().clone();
        let out = f(&mut next)?;
        let bytes = serde_json::to_vec_pretty(&next)?;
        if let Err(e) = self.storage.write(&self.path, &bytes).await {
            error!(path = %self.path, error = %e, "failed to persist schema store");
            return Err(e.into());
        }
        *self.cache.write() = next;
        Ok(out)
    }
}
