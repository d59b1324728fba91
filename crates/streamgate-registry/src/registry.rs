//! `SchemaRegistry`: label and version registration against the remote
//! streams ledger, promotion, deprecation, and schema resolution.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;
use streamgate_core::{
    bounded, error::RegistryError, KvStorage, SchemaEntry, SchemaRegistration, SchemaVersion,
    StreamsClient, ZERO_BYTES32,
};
use tracing::{error, info};

use crate::diff::{diff, SchemaDiff};
use crate::store::SchemaStore;
use crate::versions::SchemaVersionStore;

/// A reference to a schema: raw text, a label's latest, or a label version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SchemaRef {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, rename = "schema")]
    pub raw_schema: Option<String>,
}

/// Everything known about a schema reference after lookup.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSchema {
    /// Effective raw schema: explicit > version entry > label latest.
    pub raw_schema: Option<String>,
    /// The version entry, when both label and version were given and exist.
    pub version: Option<SchemaVersion>,
    /// The label's latest entry, when a label was given and has one.
    pub latest: Option<SchemaEntry>,
}

impl ResolvedSchema {
    /// Known schema id: version entry's id, else the latest entry's id.
    pub fn known_schema_id(&self) -> Option<&str> {
        self.version
            .as_ref()
            .map(|v| v.schema_id.as_str())
            .or_else(|| self.latest.as_ref().map(|e| e.schema_id.as_str()))
    }

    pub fn is_deprecated_version(&self) -> bool {
        self.version.as_ref().map(|v| v.deprecated).unwrap_or(false)
    }
}

/// The schema registry.
///
/// Owns the label store and the version store; each serializes its own
/// writes. Remote registration always happens before any local write, so a
/// remote failure leaves both stores untouched.
pub struct SchemaRegistry {
    latest: Arc<SchemaStore>,
    versions: Arc<SchemaVersionStore>,
    remote: Arc<dyn StreamsClient>,
    remote_timeout: Duration,
}

impl SchemaRegistry {
    pub fn new(
        latest: Arc<SchemaStore>,
        versions: Arc<SchemaVersionStore>,
        remote: Arc<dyn StreamsClient>,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            latest,
            versions,
            remote,
            remote_timeout,
        }
    }

    /// Load both stores from `storage` and build the registry.
    pub async fn open(
        storage: Arc<dyn KvStorage>,
        remote: Arc<dyn StreamsClient>,
        remote_timeout: Duration,
    ) -> Result<Self, RegistryError> {
        let latest = Arc::new(SchemaStore::open(storage.clone()).await?);
        let versions = Arc::new(SchemaVersionStore::open(storage).await?);
        Ok(Self::new(latest, versions, remote, remote_timeout))
    }

    pub fn latest_store(&self) -> &Arc<SchemaStore> {
        &self.latest
    }

    pub fn version_store(&self) -> &Arc<SchemaVersionStore> {
        &self.versions
    }

    /// Content-derived id of `raw_schema`, computed by the remote.
    pub async fn compute_schema_id(&self, raw_schema: &str) -> Result<String, RegistryError> {
        Ok(bounded(self.remote_timeout, self.remote.compute_schema_id(raw_schema)).await?)
    }

    async fn register_remote(
        &self,
        remote_id: String,
        raw_schema: &str,
        parent_schema_id: &str,
        ignore_if_registered: bool,
    ) -> Result<String, RegistryError> {
        let schema_id = self.compute_schema_id(raw_schema).await?;
        let registration = SchemaRegistration {
            id: remote_id,
            schema: raw_schema.to_string(),
            parent_schema_id: parent_schema_id.to_string(),
        };
        bounded(
            self.remote_timeout,
            self.remote
                .register_schemas(vec![registration], ignore_if_registered),
        )
        .await?;
        Ok(schema_id)
    }

    /// Label-only registration: always overwrites the label's latest entry
    /// and records no version.
    pub async fn register_latest(
        &self,
        label: &str,
        raw_schema: &str,
        parent_schema_id: Option<&str>,
        ignore_if_registered: bool,
    ) -> Result<SchemaEntry, RegistryError> {
        let parent = parent_schema_id.unwrap_or(ZERO_BYTES32);
        let schema_id = self
            .register_remote(label.to_string(), raw_schema, parent, ignore_if_registered)
            .await?;
        let entry = SchemaEntry {
            schema_id,
            raw_schema: raw_schema.to_string(),
            parent_schema_id: parent.to_string(),
        };
        self.latest.put(label, entry.clone()).await?;
        info!(label = %label, schema_id = %entry.schema_id, "registered latest schema");
        Ok(entry)
    }

    /// Versioned registration, keyed `label:version` remotely.
    ///
    /// Replaces an existing entry with the same version, else appends. The
    /// first version of a label also becomes its latest, but an existing
    /// latest is never overwritten here.
    pub async fn register_version(
        &self,
        label: &str,
        version: &str,
        raw_schema: &str,
        parent_schema_id: Option<&str>,
        ignore_if_registered: bool,
    ) -> Result<SchemaVersion, RegistryError> {
        let parent = parent_schema_id.unwrap_or(ZERO_BYTES32);
        let schema_id = self
            .register_remote(
                format!("{label}:{version}"),
                raw_schema,
                parent,
                ignore_if_registered,
            )
            .await?;
        let entry = SchemaVersion {
            label: label.to_string(),
            version: version.to_string(),
            schema_id,
            raw_schema: raw_schema.to_string(),
            parent_schema_id: parent.to_string(),
            created_at: chrono::Utc::now().timestamp_millis(),
            deprecated: false,
            deprecated_at: None,
        };
        let previous = self.versions.upsert(entry.clone()).await?;
        match self.latest.put_if_absent(label, entry.entry()).await {
            Ok(true) => info!(label = %label, version = %version, "first version seeded as latest"),
            Ok(false) => {}
            Err(e) => {
                if let Err(undo) = self.versions.restore(label, version, previous).await {
                    error!(label = %label, version = %version, error = %undo, "could not roll back version after latest write failed");
                }
                return Err(e);
            }
        }
        info!(label = %label, version = %version, schema_id = %entry.schema_id, "registered schema version");
        Ok(entry)
    }

    /// Promote an existing version to be the label's latest.
    pub async fn set_latest(&self, label: &str, version: &str) -> Result<SchemaVersion, RegistryError> {
        let found = self
            .versions
            .get(label, version)
            .ok_or_else(|| RegistryError::VersionNotFound {
                label: label.to_string(),
                version: version.to_string(),
            })?;
        self.latest.put(label, found.entry()).await?;
        info!(label = %label, version = %version, "promoted version to latest");
        Ok(found)
    }

    /// Deprecate (or restore) one version.
    pub async fn deprecate(
        &self,
        label: &str,
        version: &str,
        deprecated: bool,
    ) -> Result<SchemaVersion, RegistryError> {
        let now = chrono::Utc::now().timestamp_millis();
        let v = self
            .versions
            .set_deprecated(label, version, deprecated, now)
            .await?;
        info!(label = %label, version = %version, deprecated, "updated deprecation");
        Ok(v)
    }

    pub fn latest(&self, label: &str) -> Option<SchemaEntry> {
        self.latest.get(label)
    }

    pub fn all_latest(&self) -> IndexMap<String, SchemaEntry> {
        self.latest.all()
    }

    pub fn versions(&self, label: &str) -> Vec<SchemaVersion> {
        self.versions.list(label)
    }

    pub fn version(&self, label: &str, version: &str) -> Option<SchemaVersion> {
        self.versions.get(label, version)
    }

    pub fn is_deprecated(&self, schema_id: &str) -> bool {
        self.versions.is_deprecated(schema_id)
    }

    /// Schema text registered under `schema_id`, from either store.
    pub fn schema_text(&self, schema_id: &str) -> Option<String> {
        self.latest
            .all()
            .into_values()
            .find(|e| e.schema_id.eq_ignore_ascii_case(schema_id))
            .map(|e| e.raw_schema)
            .or_else(|| {
                self.versions
                    .all()
                    .into_values()
                    .flatten()
                    .find(|v| v.has_schema_id(schema_id))
                    .map(|v| v.raw_schema)
            })
    }

    /// Lower-cased latest ids for `labels` (all labels when empty).
    pub fn latest_ids(&self, labels: &[String]) -> HashSet<String> {
        self.latest.latest_ids(labels)
    }

    /// Look up everything a reference points at.
    pub fn resolve(&self, r: &SchemaRef) -> ResolvedSchema {
        let version = match (&r.label, &r.version) {
            (Some(label), Some(version)) => self.versions.get(label, version),
            _ => None,
        };
        let latest = r.label.as_deref().and_then(|l| self.latest.get(l));
        let raw_schema = r
            .raw_schema
            .clone()
            .or_else(|| version.as_ref().map(|v| v.raw_schema.clone()))
            .or_else(|| latest.as_ref().map(|e| e.raw_schema.clone()));
        ResolvedSchema {
            raw_schema,
            version,
            latest,
        }
    }

    /// Effective raw schema: explicit raw > label version > label latest.
    pub fn resolve_effective_schema(
        &self,
        label: Option<&str>,
        version: Option<&str>,
        raw_schema: Option<&str>,
    ) -> Option<String> {
        self.resolve(&SchemaRef {
            label: label.map(String::from),
            version: version.map(String::from),
            raw_schema: raw_schema.map(String::from),
        })
        .raw_schema
    }

    /// Raw schema for one side of a diff. A label with a version resolves
    /// only to that version; a bare label resolves to its latest.
    pub fn resolve_for_diff(&self, r: &SchemaRef) -> Option<String> {
        if let Some(raw) = &r.raw_schema {
            return Some(raw.clone());
        }
        let label = r.label.as_deref()?;
        match r.version.as_deref() {
            Some(version) => self.versions.get(label, version).map(|v| v.raw_schema),
            None => self.latest.get(label).map(|e| e.raw_schema),
        }
    }

    /// Diff two references. `None` when either side does not resolve.
    pub fn diff_refs(&self, left: &SchemaRef, right: &SchemaRef) -> Option<(String, String, SchemaDiff)> {
        let l = self.resolve_for_diff(left)?;
        let r = self.resolve_for_diff(right)?;
        let d = diff(&l, &r);
        Some((l, r, d))
    }
}
