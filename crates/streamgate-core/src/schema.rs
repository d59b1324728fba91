//! Schema types: descriptors, registry entries, and encoder inputs.

use serde::{Deserialize, Serialize};

/// The zero 32-byte identifier used when no parent schema is given.
pub const ZERO_BYTES32: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000000";

/// One `(name, type)` pair of a parsed schema descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

/// The current ("latest") schema stored under a label.
///
/// `schema_id` is always a deterministic function of `raw_schema`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaEntry {
    pub schema_id: String,
    #[serde(rename = "schema")]
    pub raw_schema: String,
    pub parent_schema_id: String,
}

/// One registered version of a labelled schema.
///
/// Versions are never deleted; `deprecated` flips through
/// `SchemaVersionStore::deprecate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaVersion {
    /// Filled from the store key; not part of the persisted entry.
    #[serde(default, skip_serializing)]
    pub label: String,
    pub version: String,
    pub schema_id: String,
    #[serde(rename = "schema")]
    pub raw_schema: String,
    pub parent_schema_id: String,
    /// Unix milliseconds.
    pub created_at: i64,
    #[serde(default)]
    pub deprecated: bool,
    /// Unix milliseconds; absent while the version is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated_at: Option<i64>,
}

impl SchemaVersion {
    /// The latest-entry view of this version.
    pub fn entry(&self) -> SchemaEntry {
        SchemaEntry {
            schema_id: self.schema_id.clone(),
            raw_schema: self.raw_schema.clone(),
            parent_schema_id: self.parent_schema_id.clone(),
        }
    }

    /// Case-insensitive schema id comparison.
    pub fn has_schema_id(&self, schema_id: &str) -> bool {
        self.schema_id.eq_ignore_ascii_case(schema_id)
    }
}

/// An encoder-ready value paired with its descriptor field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeValue {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub value: serde_json::Value,
}
