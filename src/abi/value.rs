//! Typed ABI values.

use alloy_primitives::{Address, I256, U256};
use serde::{Serialize, Serializer};
use std::fmt;

/// A decoded (or to-be-encoded) ABI value
///
/// Integers keep their full 256-bit width; the declared bit size rides along
/// so a decoded `uint8` stays distinguishable from a `uint256`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    Address(Address),
    Bool(bool),
    Uint(U256, usize),
    Int(I256, usize),
    FixedBytes(Vec<u8>),
    Bytes(Vec<u8>),
    String(String),
    Array(Vec<AbiValue>),
    FixedArray(Vec<AbiValue>),
    Tuple(Vec<TupleField>),
}

/// Tuple member, named when the ABI carries component names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleField {
    pub name: Option<String>,
    pub value: AbiValue,
}

impl AbiValue {
    /// Shorthand for a `uint256`
    pub fn uint(value: impl Into<U256>) -> Self {
        AbiValue::Uint(value.into(), 256)
    }

    /// JSON rendering for reports
    ///
    /// Integers become decimal strings so nothing is truncated to a JSON
    /// double; tuples with all members named become objects.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            AbiValue::Address(a) => Value::String(a.to_checksum(None)),
            AbiValue::Bool(b) => Value::Bool(*b),
            AbiValue::Uint(v, _) => Value::String(v.to_string()),
            AbiValue::Int(v, _) => Value::String(v.to_string()),
            AbiValue::FixedBytes(b) | AbiValue::Bytes(b) => {
                Value::String(format!("0x{}", hex::encode(b)))
            }
            AbiValue::String(s) => Value::String(s.clone()),
            AbiValue::Array(items) | AbiValue::FixedArray(items) => {
                Value::Array(items.iter().map(AbiValue::to_json).collect())
            }
            AbiValue::Tuple(fields) => {
                if !fields.is_empty() && fields.iter().all(|f| f.name.is_some()) {
                    let map = fields
                        .iter()
                        .map(|f| (f.name.clone().unwrap_or_default(), f.value.to_json()))
                        .collect();
                    Value::Object(map)
                } else {
                    Value::Array(fields.iter().map(|f| f.value.to_json()).collect())
                }
            }
        }
    }
}

impl Serialize for AbiValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Display for AbiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiValue::Address(a) => write!(f, "{}", a.to_checksum(None)),
            AbiValue::Bool(b) => write!(f, "{}", b),
            AbiValue::Uint(v, _) => write!(f, "{}", v),
            AbiValue::Int(v, _) => write!(f, "{}", v),
            AbiValue::FixedBytes(b) | AbiValue::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            AbiValue::String(s) => write!(f, "{:?}", s),
            AbiValue::Array(items) | AbiValue::FixedArray(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            AbiValue::Tuple(fields) => {
                write!(f, "(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match &field.name {
                        Some(name) => write!(f, "{}: {}", name, field.value)?,
                        None => write!(f, "{}", field.value)?,
                    }
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_display_checksummed_address() {
        let a = AbiValue::Address(address!("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"));
        assert_eq!(a.to_string(), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
    }

    #[test]
    fn test_display_large_uint_not_truncated() {
        let v = AbiValue::uint(U256::MAX);
        assert_eq!(
            v.to_string(),
            "115792089237316195423570985008687907853269984665640564039457584007913129639935"
        );
    }

    #[test]
    fn test_display_tuple_with_names() {
        let v = AbiValue::Tuple(vec![
            TupleField {
                name: Some("ok".into()),
                value: AbiValue::Bool(true),
            },
            TupleField {
                name: None,
                value: AbiValue::String("hi".into()),
            },
        ]);
        assert_eq!(v.to_string(), "(ok: true, \"hi\")");
    }

    #[test]
    fn test_to_json() {
        let v = AbiValue::Array(vec![AbiValue::uint(U256::from(7u64)), AbiValue::Bytes(vec![0xab])]);
        assert_eq!(v.to_json(), serde_json::json!(["7", "0xab"]));
    }
}
