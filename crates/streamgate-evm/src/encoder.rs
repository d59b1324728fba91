//! Schema value encoder.
//!
//! Converts the JSON values of an ordered `{name, type, value}` list into
//! alloy `DynSolValue`s and ABI-encodes them as a parameter tuple, the layout
//! the streams ledger expects for record data.
//!
//! Accepted JSON shapes per Solidity type:
//! - `bool`: JSON bool or `"true"`/`"false"`
//! - `uintN`/`intN`: JSON integer, or a decimal/`0x` string for values
//!   beyond 2^53
//! - `address`, `bytesN`, `bytes`: hex string
//! - `string`: JSON string
//! - `T[]`, `T[k]`, tuples: JSON arrays, recursively

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{B256, I256, U256};
use serde_json::Value;
use streamgate_core::{error::RegistryError, EncodeValue, ValueEncoder};

/// Solidity ABI parameter encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbiEncoder;

impl AbiEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encode `values` in order and return the bytes.
    pub fn encode_bytes(&self, values: &[EncodeValue]) -> Result<Vec<u8>, RegistryError> {
        let mut dyn_values = Vec::with_capacity(values.len());
        for v in values {
            let sol_type = DynSolType::parse(&v.ty).map_err(|e| RegistryError::EncodingFailed {
                reason: format!("field '{}': unknown type '{}': {e}", v.name, v.ty),
            })?;
            let dyn_val =
                json_to_dyn_value(&v.value, &sol_type).map_err(|e| RegistryError::EncodingFailed {
                    reason: format!("field '{}': {e}", v.name),
                })?;
            dyn_values.push(dyn_val);
        }
        Ok(DynSolValue::Tuple(dyn_values).abi_encode_params())
    }
}

impl ValueEncoder for AbiEncoder {
    fn encode(&self, values: &[EncodeValue]) -> Result<String, RegistryError> {
        Ok(format!("0x{}", hex::encode(self.encode_bytes(values)?)))
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>, String> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s)).map_err(|e| format!("hex parse: {e}"))
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn collect(elems: &[Value], inner: &DynSolType) -> Result<Vec<DynSolValue>, String> {
    elems.iter().map(|e| json_to_dyn_value(e, inner)).collect()
}

/// Convert a JSON value to the alloy `DynSolValue` for the given expected type.
pub fn json_to_dyn_value(val: &Value, expected: &DynSolType) -> Result<DynSolValue, String> {
    match (val, expected) {
        (Value::Bool(b), DynSolType::Bool) => Ok(DynSolValue::Bool(*b)),

        (Value::Number(n), DynSolType::Uint(bits)) => {
            let u = n
                .as_u64()
                .ok_or_else(|| format!("uint{bits}: expected a non-negative integer, got {n}"))?;
            let u = U256::from(u);
            if *bits < 256 && u.bit_len() > *bits {
                return Err(format!("uint{bits}: {u} out of range"));
            }
            Ok(DynSolValue::Uint(u, *bits))
        }

        (Value::Number(n), DynSolType::Int(bits)) => {
            let i = n
                .as_i64()
                .ok_or_else(|| format!("int{bits}: expected an integer, got {n}"))?;
            let i = i128::from(i);
            if *bits < 128 {
                let max = (1i128 << (*bits - 1)) - 1;
                if i < -max - 1 || i > max {
                    return Err(format!("int{bits}: {i} out of range"));
                }
            }
            let i = I256::try_from(i).map_err(|e| e.to_string())?;
            Ok(DynSolValue::Int(i, *bits))
        }

        (Value::String(s), DynSolType::String) => Ok(DynSolValue::String(s.clone())),

        (Value::String(s), DynSolType::Bytes) => Ok(DynSolValue::Bytes(decode_hex(s)?)),

        (Value::String(s), DynSolType::FixedBytes(n)) => {
            let b = decode_hex(s)?;
            if b.len() > *n {
                return Err(format!("bytes{n}: got {} bytes", b.len()));
            }
            Ok(DynSolValue::FixedBytes(B256::right_padding_from(&b), *n))
        }

        // Numbers beyond 2^53, addresses, and string-typed bools.
        (Value::String(s), _) => expected.coerce_str(s).map_err(|e| e.to_string()),

        (Value::Array(elems), DynSolType::Array(inner)) => {
            Ok(DynSolValue::Array(collect(elems, inner)?))
        }

        (Value::Array(elems), DynSolType::FixedArray(inner, len)) => {
            if elems.len() != *len {
                return Err(format!(
                    "fixed array length mismatch: expected {len}, got {}",
                    elems.len()
                ));
            }
            Ok(DynSolValue::FixedArray(collect(elems, inner)?))
        }

        (Value::Array(elems), DynSolType::Tuple(types)) => {
            if elems.len() != types.len() {
                return Err(format!(
                    "tuple length mismatch: expected {}, got {}",
                    types.len(),
                    elems.len()
                ));
            }
            let fields = elems
                .iter()
                .zip(types.iter())
                .map(|(v, t)| json_to_dyn_value(v, t))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(DynSolValue::Tuple(fields))
        }

        _ => Err(format!(
            "cannot convert {} to {}",
            json_kind(val),
            expected.sol_type_name()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ev(name: &str, ty: &str, value: Value) -> EncodeValue {
        EncodeValue {
            name: name.into(),
            ty: ty.into(),
            value,
        }
    }

    fn word(hex_str: &str) -> String {
        format!("{hex_str:0>64}")
    }

    #[test]
    fn encodes_static_and_dynamic_params() {
        let hex_out = AbiEncoder
            .encode(&[
                ev("value", "uint256", json!(1)),
                ev("unit", "string", json!("C")),
            ])
            .unwrap();
        let body = hex_out.strip_prefix("0x").unwrap();
        // head: value, offset of unit; tail: length, padded bytes
        assert_eq!(body.len(), 4 * 64);
        assert_eq!(&body[..64], word("1"));
        assert_eq!(&body[64..128], word("40"));
        assert_eq!(&body[128..192], word("1"));
        assert!(body[192..].starts_with("43"));
    }

    #[test]
    fn string_inputs_coerce_to_numeric_and_address_types() {
        let bytes = AbiEncoder
            .encode_bytes(&[
                ev("big", "uint256", json!("18446744073709551616")),
                ev("who", "address", json!("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045")),
                ev("ok", "bool", json!("true")),
            ])
            .unwrap();
        assert_eq!(bytes.len(), 96);
        // 2^64
        assert_eq!(hex::encode(&bytes[..32]), word("10000000000000000"));
        assert_eq!(
            hex::encode(&bytes[32..64]),
            word("d8da6bf26964af9d7eed9e03e53415d37aa96045")
        );
        assert_eq!(bytes[95], 1);
    }

    #[test]
    fn negative_ints_are_twos_complement() {
        let bytes = AbiEncoder
            .encode_bytes(&[ev("t", "int256", json!(-1))])
            .unwrap();
        assert!(bytes.iter().all(|b| *b == 0xff));
    }

    #[test]
    fn fixed_bytes_are_right_padded() {
        let bytes = AbiEncoder
            .encode_bytes(&[ev("tag", "bytes4", json!("0xdeadbeef"))])
            .unwrap();
        assert_eq!(&bytes[..4], &[0xde, 0xad, 0xbe, 0xef]);
        assert!(bytes[4..].iter().all(|b| *b == 0));
    }

    #[test]
    fn arrays_encode_recursively() {
        let bytes = AbiEncoder
            .encode_bytes(&[ev("xs", "uint8[]", json!([1, 2, 3]))])
            .unwrap();
        // offset, length, three elements
        assert_eq!(bytes.len(), 5 * 32);
        assert_eq!(bytes[63], 3);
        assert_eq!(bytes[159], 3);
    }

    #[test]
    fn rejects_unknown_types_and_bad_values() {
        let cases = [
            ev("x", "uint257", json!(1)),
            ev("x", "uint256", json!(-5)),
            ev("x", "uint8", json!(256)),
            ev("x", "int8", json!(300)),
            ev("x", "int8", json!(-129)),
            ev("x", "int8", json!(128)),
            ev("x", "address", json!("0x1234")),
            ev("x", "string", json!(12)),
            ev("x", "bytes2", json!("0xdeadbeef")),
            ev("x", "uint8[2]", json!([1])),
        ];
        for case in cases {
            let err = AbiEncoder.encode(&[case.clone()]).unwrap_err();
            match err {
                RegistryError::EncodingFailed { reason } => {
                    assert!(reason.starts_with("field 'x'"), "{reason}")
                }
                other => panic!("unexpected error for {case:?}: {other}"),
            }
        }
    }

    #[test]
    fn signed_bounds_are_inclusive() {
        for v in [json!(127), json!(-128), json!(0)] {
            assert!(AbiEncoder.encode(&[ev("x", "int8", v.clone())]).is_ok(), "{v}");
        }
        assert!(AbiEncoder.encode(&[ev("x", "int64", json!(i64::MIN))]).is_ok());
    }

    #[test]
    fn empty_value_list_encodes_to_bare_prefix() {
        assert_eq!(AbiEncoder.encode(&[]).unwrap(), "0x");
    }
}
