//! Field-level diff between two raw schemas.
//!
//! Fields are aligned by name, not position. Pure function, no I/O.

use serde::{Deserialize, Serialize};
use streamgate_core::SchemaField;

use crate::descriptor::SchemaDescriptor;

/// A field present on both sides with different types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub name: String,
    pub left_type: String,
    pub right_type: String,
}

/// Result of comparing `left` against `right`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDiff {
    /// Only in right, in right's order.
    pub added: Vec<SchemaField>,
    /// Only in left, in left's order.
    pub removed: Vec<SchemaField>,
    /// In both with different types, in right's order.
    pub changed: Vec<FieldChange>,
}

impl SchemaDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Compare two raw schema descriptions.
pub fn diff(left_raw: &str, right_raw: &str) -> SchemaDiff {
    let left_desc = SchemaDescriptor::parse(left_raw);
    let right_desc = SchemaDescriptor::parse(right_raw);
    let left = left_desc.field_types();
    let right = right_desc.field_types();

    let mut out = SchemaDiff::default();
    for (&name, &ty) in &right {
        match left.get(name) {
            None => out.added.push(SchemaField::new(name, ty)),
            Some(&left_ty) if left_ty != ty => out.changed.push(FieldChange {
                name: name.to_string(),
                left_type: left_ty.to_string(),
                right_type: ty.to_string(),
            }),
            Some(_) => {}
        }
    }
    for (&name, &ty) in &left {
        if !right.contains_key(name) {
            out.removed.push(SchemaField::new(name, ty));
        }
    }
    out
}
