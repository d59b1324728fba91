//! `SchemaStore`: label → latest schema entry.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use streamgate_core::{error::RegistryError, KvStorage, SchemaEntry};

use crate::persist::PersistedMap;

/// Default document path of the label store.
pub const LATEST_STORE_PATH: &str = "schemas.json";

/// Persistent label → latest entry map.
pub struct SchemaStore {
    map: PersistedMap<SchemaEntry>,
}

impl SchemaStore {
    /// Load (or bootstrap) the store at [`LATEST_STORE_PATH`].
    pub async fn open(storage: Arc<dyn KvStorage>) -> Result<Self, RegistryError> {
        Self::open_at(storage, LATEST_STORE_PATH).await
    }

    pub async fn open_at(
        storage: Arc<dyn KvStorage>,
        path: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        Ok(Self {
            map: PersistedMap::load(storage, path).await?,
        })
    }

    pub fn get(&self, label: &str) -> Option<SchemaEntry> {
        self.map.get(label)
    }

    /// All labels with their latest entries, in first-registration order.
    pub fn all(&self) -> IndexMap<String, SchemaEntry> {
        self.map.snapshot()
    }

    /// Unconditionally set the latest entry for `label`.
    pub async fn put(&self, label: &str, entry: SchemaEntry) -> Result<(), RegistryError> {
        self.map
            .update(|m| {
                m.insert(label.to_string(), entry);
                Ok(())
            })
            .await
    }

    /// Set the latest entry only if `label` has none. Returns whether the
    /// entry was written.
    pub async fn put_if_absent(
        &self,
        label: &str,
        entry: SchemaEntry,
    ) -> Result<bool, RegistryError> {
        if self.get(label).is_some() {
            return Ok(false);
        }
        self.map
            .update(|m| {
                if m.contains_key(label) {
                    return Ok(false);
                }
                m.insert(label.to_string(), entry);
                Ok(true)
            })
            .await
    }

    /// Lower-cased latest schema ids for `labels`, or for every label when
    /// `labels` is empty. Unknown labels contribute nothing.
    pub fn latest_ids(&self, labels: &[String]) -> HashSet<String> {
        self.map.with(|m| {
            let pick = |entry: &SchemaEntry| {
                (!entry.schema_id.is_empty()).then(|| entry.schema_id.to_ascii_lowercase())
            };
            if labels.is_empty() {
                m.values().filter_map(pick).collect()
            } else {
                labels.iter().filter_map(|l| m.get(l)).filter_map(pick).collect()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn entry(id: &str) -> SchemaEntry {
        SchemaEntry {
            schema_id: id.into(),
            raw_schema: "uint256 value".into(),
            parent_schema_id: streamgate_core::ZERO_BYTES32.into(),
        }
    }

    #[tokio::test]
    async fn bootstrap_persists_empty_map() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SchemaStore::open(storage.clone()).await.unwrap();
        assert!(store.all().is_empty());
        assert_eq!(storage.get(LATEST_STORE_PATH).unwrap(), b"{}");
    }

    #[tokio::test]
    async fn corrupt_document_self_heals() {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert(LATEST_STORE_PATH, b"not json".to_vec());
        let store = SchemaStore::open(storage.clone()).await.unwrap();
        assert!(store.all().is_empty());
        assert_eq!(storage.get(LATEST_STORE_PATH).unwrap(), b"{}");
    }

    #[tokio::test]
    async fn writes_survive_reload() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SchemaStore::open(storage.clone()).await.unwrap();
        store.put("temp", entry("0xA")).await.unwrap();

        let reopened = SchemaStore::open(storage).await.unwrap();
        assert_eq!(reopened.get("temp").unwrap().schema_id, "0xA");
    }

    #[tokio::test]
    async fn put_if_absent_never_overwrites() {
        let store = SchemaStore::open(Arc::new(MemoryStorage::new())).await.unwrap();
        assert!(store.put_if_absent("l", entry("0x1")).await.unwrap());
        assert!(!store.put_if_absent("l", entry("0x2")).await.unwrap());
        assert_eq!(store.get("l").unwrap().schema_id, "0x1");
    }

    #[tokio::test]
    async fn failed_persist_leaves_cache_intact() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SchemaStore::open(storage.clone()).await.unwrap();
        store.put("l", entry("0x1")).await.unwrap();

        storage.set_fail_writes(true);
        assert!(store.put("l", entry("0x2")).await.is_err());
        assert_eq!(store.get("l").unwrap().schema_id, "0x1");
    }

    #[tokio::test]
    async fn latest_ids_are_lowercased_and_scoped() {
        let store = SchemaStore::open(Arc::new(MemoryStorage::new())).await.unwrap();
        store.put("a", entry("0xAB")).await.unwrap();
        store.put("b", entry("0xCD")).await.unwrap();

        let all = store.latest_ids(&[]);
        assert!(all.contains("0xab") && all.contains("0xcd"));

        let only_a = store.latest_ids(&["a".into(), "missing".into()]);
        assert_eq!(only_a.len(), 1);
        assert!(only_a.contains("0xab"));
    }
}
