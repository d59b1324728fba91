//! Content-derived schema identifiers and random record identifiers.

use tiny_keccak::{Hasher, Keccak};

pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(bytes);
    hasher.finalize(&mut output);
    output
}

/// Schema identifier: keccak256 of the raw schema text, `0x`-prefixed.
///
/// The text is hashed verbatim, so whitespace differences yield different ids.
pub fn schema_id(raw_schema: &str) -> String {
    format!("0x{}", hex::encode(keccak256(raw_schema.as_bytes())))
}

/// Fresh random 32-byte record identifier as `0x` hex.
pub fn random_record_id() -> String {
    format!("0x{}", hex::encode(rand::random::<[u8; 32]>()))
}
