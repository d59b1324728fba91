//! `SchemaVersionStore`: label → ordered list of schema versions.

use std::sync::Arc;

use indexmap::IndexMap;
use streamgate_core::{error::RegistryError, KvStorage, SchemaVersion};

use crate::persist::PersistedMap;

/// Default document path of the version store.
pub const VERSION_STORE_PATH: &str = "schemas.versions.json";

/// Persistent label → versions map. Versions keep insertion order and are
/// never removed.
pub struct SchemaVersionStore {
    map: PersistedMap<Vec<SchemaVersion>>,
}

fn labelled(label: &str, mut v: SchemaVersion) -> SchemaVersion {
    if v.label.is_empty() {
        v.label = label.to_string();
    }
    v
}

impl SchemaVersionStore {
    /// Load (or bootstrap) the store at [`VERSION_STORE_PATH`].
    pub async fn open(storage: Arc<dyn KvStorage>) -> Result<Self, RegistryError> {
        Self::open_at(storage, VERSION_STORE_PATH).await
    }

    pub async fn open_at(
        storage: Arc<dyn KvStorage>,
        path: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        Ok(Self {
            map: PersistedMap::load(storage, path).await?,
        })
    }

    /// Versions of `label` in registration order; empty for unknown labels.
    pub fn list(&self, label: &str) -> Vec<SchemaVersion> {
        self.map
            .get(label)
            .unwrap_or_default()
            .into_iter()
            .map(|v| labelled(label, v))
            .collect()
    }

    pub fn get(&self, label: &str, version: &str) -> Option<SchemaVersion> {
        self.map.with(|m| {
            m.get(label)?
                .iter()
                .find(|v| v.version == version)
                .cloned()
                .map(|v| labelled(label, v))
        })
    }

    /// Every label with its versions.
    pub fn all(&self) -> IndexMap<String, Vec<SchemaVersion>> {
        self.map.snapshot()
    }

    /// Replace the entry with the same version string, or append. Returns
    /// the replaced entry, if any.
    pub async fn upsert(&self, version: SchemaVersion) -> Result<Option<SchemaVersion>, RegistryError> {
        self.map
            .update(|m| {
                let list = m.entry(version.label.clone()).or_default();
                Ok(match list.iter_mut().find(|v| v.version == version.version) {
                    Some(existing) => Some(std::mem::replace(existing, version)),
                    None => {
                        list.push(version);
                        None
                    }
                })
            })
            .await
    }

    /// Undo an [`upsert`](Self::upsert): put back `previous`, or drop the
    /// appended version when there was none.
    pub async fn restore(
        &self,
        label: &str,
        version: &str,
        previous: Option<SchemaVersion>,
    ) -> Result<(), RegistryError> {
        self.map
            .update(|m| {
                let Some(list) = m.get_mut(label) else {
                    return Ok(());
                };
                let pos = list.iter().position(|v| v.version == version);
                match (pos, previous) {
                    (Some(i), Some(prev)) => list[i] = prev,
                    (Some(i), None) => {
                        list.remove(i);
                    }
                    (None, Some(prev)) => list.push(prev),
                    (None, None) => {}
                }
                if list.is_empty() {
                    m.shift_remove(label);
                }
                Ok(())
            })
            .await
    }

    /// Flip the deprecation flag of one version.
    ///
    /// `at` is the Unix-millisecond timestamp recorded when deprecating;
    /// restoring clears it.
    pub async fn set_deprecated(
        &self,
        label: &str,
        version: &str,
        deprecated: bool,
        at: i64,
    ) -> Result<SchemaVersion, RegistryError> {
        self.map
            .update(|m| {
                let entry = m
                    .get_mut(label)
                    .and_then(|list| list.iter_mut().find(|v| v.version == version))
                    .ok_or_else(|| RegistryError::VersionNotFound {
                        label: label.to_string(),
                        version: version.to_string(),
                    })?;
                entry.deprecated = deprecated;
                entry.deprecated_at = deprecated.then_some(at);
                Ok(labelled(label, entry.clone()))
            })
            .await
    }

    /// Deprecation status of a schema id across every label.
    ///
    /// Ids compare case-insensitively; the first matching version decides.
    /// Unknown ids are not deprecated.
    pub fn is_deprecated(&self, schema_id: &str) -> bool {
        self.map.with(|m| {
            m.values()
                .flatten()
                .find(|v| v.has_schema_id(schema_id))
                .map(|v| v.deprecated)
                .unwrap_or(false)
        })
    }
}
