//! The encoding primitive behind schema-typed record publishing.

use crate::error::RegistryError;
use crate::schema::EncodeValue;

/// Turns an ordered `{name, type, value}` list into the ledger's record
/// payload. A well-behaved encoder returns `0x`-prefixed hex; callers still
/// verify the shape with [`is_hex_data`].
pub trait ValueEncoder: Send + Sync {
    fn encode(&self, values: &[EncodeValue]) -> Result<String, RegistryError>;
}

/// `true` for `0x`-prefixed, even-length hex strings (including `"0x"`).
pub fn is_hex_data(s: &str) -> bool {
    match s.strip_prefix("0x") {
        Some(body) => body.len() % 2 == 0 && body.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}
