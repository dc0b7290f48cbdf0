//! Parsing of JSON-RPC quantities.
//!
//! Nodes disagree on how they print numbers: plain JSON numbers, decimal
//! strings and `0x` hex strings all show up in the wild.

use crate::utils::error::ParseError;
use alloy_primitives::U256;
use serde::{Deserialize, Deserializer};

/// Parse a quantity from hex or decimal string
pub fn parse_u64(value: &str) -> Result<u64, ParseError> {
    if let Some(hex_str) = value.strip_prefix("0x") {
        if hex_str.is_empty() {
            return Ok(0);
        }
        u64::from_str_radix(hex_str, 16)
            .map_err(|e| ParseError::InvalidFormat(format!("Invalid hex quantity: {}", e)))
    } else {
        value
            .parse::<u64>()
            .map_err(|e| ParseError::InvalidFormat(format!("Invalid decimal quantity: {}", e)))
    }
}

/// Parse a quantity from a JSON number or string
pub fn json_u64(val: &serde_json::Value) -> Result<u64, ParseError> {
    if let Some(n) = val.as_u64() {
        Ok(n)
    } else if let Some(s) = val.as_str() {
        parse_u64(s)
    } else {
        Err(ParseError::InvalidFormat(format!(
            "Expected number or string, found {}",
            val
        )))
    }
}

/// Parse a 256-bit word written as hex, with or without `0x`
///
/// Struct loggers print stack words either as padded 64-digit hex or as
/// compact `0x` quantities.
pub fn parse_word(value: &str) -> Result<U256, ParseError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| ParseError::InvalidFormat(format!("Invalid word '{}': {}", value, e)))
}

/// Decode a hex byte string, with or without `0x`
pub fn parse_bytes(value: &str) -> Result<Vec<u8>, ParseError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(digits).map_err(|e| ParseError::InvalidFormat(format!("Invalid hex bytes: {}", e)))
}

/// Serde adapter for optional `u64` quantities in any of the accepted forms
pub mod opt_u64 {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
        match value {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(v) => json_u64(&v).map(Some).map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u64() {
        assert_eq!(parse_u64("1000").unwrap(), 1000);
        assert_eq!(parse_u64("0x3e8").unwrap(), 1000);
        assert_eq!(parse_u64("0x").unwrap(), 0);
        assert!(parse_u64("invalid").is_err());
    }

    #[test]
    fn test_json_u64() {
        assert_eq!(json_u64(&serde_json::json!(42)).unwrap(), 42);
        assert_eq!(json_u64(&serde_json::json!("0x2a")).unwrap(), 42);
        assert!(json_u64(&serde_json::json!([1])).is_err());
    }

    #[test]
    fn test_parse_word_both_forms() {
        let padded = "00000000000000000000000000000000000000000000000000000000000000ff";
        assert_eq!(parse_word(padded).unwrap(), U256::from(255u64));
        assert_eq!(parse_word("0xff").unwrap(), U256::from(255u64));
        assert_eq!(parse_word("0x").unwrap(), U256::ZERO);
        assert!(parse_word("0xzz").is_err());
    }

    #[test]
    fn test_parse_bytes() {
        assert_eq!(parse_bytes("0xdead").unwrap(), vec![0xde, 0xad]);
        assert_eq!(parse_bytes("beef").unwrap(), vec![0xbe, 0xef]);
        assert!(parse_bytes("0xabc").is_err());
    }
}
