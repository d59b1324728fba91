//! Transport sanitization for collaborator results.
//!
//! Integers outside the range a JSON consumer can represent exactly
//! (±2^53 − 1) are rendered as decimal strings, recursively through arrays
//! and objects. Everything else passes through unchanged.

use serde_json::{Map, Value};

/// Largest integer exactly representable as an IEEE-754 double.
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Render large integers as strings, recursively.
pub fn sanitize_for_transport(input: Value) -> Value {
    match input {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                if u > MAX_SAFE_INTEGER {
                    return Value::String(u.to_string());
                }
            } else if let Some(i) = n.as_i64() {
                if i.unsigned_abs() > MAX_SAFE_INTEGER {
                    return Value::String(i.to_string());
                }
            }
            Value::Number(n)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_for_transport).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, sanitize_for_transport(v)))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}
