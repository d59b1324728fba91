//! # streamgate-evm
//!
//! The EVM side of StreamGate's schema contract.
//!
//! - [`AbiEncoder`] encodes `{name, type, value}` lists as Solidity ABI
//!   parameters and renders them as `0x` hex
//! - [`schema_id`] derives the content identifier of a raw schema
//! - [`random_record_id`] generates 32-byte record identifiers

pub mod encoder;
pub mod ids;

pub use encoder::{json_to_dyn_value, AbiEncoder};
pub use ids::{keccak256, random_record_id, schema_id};
