//! Schema descriptor parsing and encoder value building.
//!
//! A descriptor is a comma-separated list of `type name` or `type:name`
//! tokens, e.g. `"uint256 value, string unit, bool:verified"`. Tokens that do
//! not have that shape are skipped, not rejected.

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use streamgate_core::{error::RegistryError, EncodeValue, SchemaField};

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([^:\s]+)[\s:]+(.+)$").expect("descriptor token pattern is valid")
    })
}

/// Ordered field list parsed from a raw schema string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDescriptor {
    fields: Vec<SchemaField>,
}

impl SchemaDescriptor {
    /// Parse a raw descriptor. Never fails; malformed tokens are dropped.
    pub fn parse(raw: &str) -> Self {
        let pattern = token_pattern();
        let fields = raw
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .filter_map(|token| {
                let caps = pattern.captures(token)?;
                let ty = caps.get(1)?.as_str().trim();
                let name = caps.get(2)?.as_str().trim();
                if ty.is_empty() || name.is_empty() {
                    return None;
                }
                Some(SchemaField::new(name, ty))
            })
            .collect();
        Self { fields }
    }

    /// Fields in declaration order (the encoding order).
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// name → type lookup. A repeated name keeps its first position and its
    /// last type.
    pub fn field_types(&self) -> IndexMap<&str, &str> {
        let mut map = IndexMap::with_capacity(self.fields.len());
        for f in &self.fields {
            map.insert(f.name.as_str(), f.ty.as_str());
        }
        map
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Convert caller values into an ordered `{name, type, value}` list.
///
/// - A JSON array is positional: element `i` belongs to field `i`. Elements
///   that are already `{name, type, value}` objects pass through as given.
/// - A JSON object is looked up by field name; the first absent field fails
///   with [`RegistryError::MissingField`] and nothing is encoded.
pub fn build_encode_values(
    descriptor: &SchemaDescriptor,
    values: &Value,
) -> Result<Vec<EncodeValue>, RegistryError> {
    match values {
        Value::Array(items) => {
            if items.len() != descriptor.len() {
                return Err(RegistryError::EncodingFailed {
                    reason: format!(
                        "value count mismatch: schema has {}, got {}",
                        descriptor.len(),
                        items.len()
                    ),
                });
            }
            Ok(descriptor
                .fields()
                .iter()
                .zip(items)
                .map(|(field, item)| positional_value(field, item))
                .collect())
        }
        Value::Object(map) => descriptor
            .fields()
            .iter()
            .map(|field| {
                let value = map.get(&field.name).ok_or_else(|| RegistryError::MissingField {
                    field: field.name.clone(),
                })?;
                Ok(EncodeValue {
                    name: field.name.clone(),
                    ty: field.ty.clone(),
                    value: value.clone(),
                })
            })
            .collect(),
        _ => Err(RegistryError::EncodingFailed {
            reason: "values must be an array or an object".into(),
        }),
    }
}

fn positional_value(field: &SchemaField, item: &Value) -> EncodeValue {
    if let Value::Object(obj) = item {
        if let Some(value) = obj.get("value") {
            let name = obj.get("name").and_then(Value::as_str);
            let ty = obj.get("type").and_then(Value::as_str);
            if name.is_some() || ty.is_some() {
                return EncodeValue {
                    name: name.unwrap_or(&field.name).to_string(),
                    ty: ty.unwrap_or(&field.ty).to_string(),
                    value: value.clone(),
                };
            }
        }
    }
    EncodeValue {
        name: field.name.clone(),
        ty: field.ty.clone(),
        value: item.clone(),
    }
}
