//! Revert payload classification.

use crate::abi::{decode, decode_params, AbiValue, ContractAbi, NamedValue, ParamType};
use crate::registry::RegistrySnapshot;
use crate::utils::config::{ERROR_STRING_SELECTOR, PANIC_SELECTOR};
use alloy_primitives::{Bytes, U256};
use log::debug;
use serde::Serialize;
use std::fmt;

/// Why a frame reverted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RevertReason {
    /// `Error(string)`, as emitted by `require(cond, "...")` and `revert("...")`
    StringReason(String),
    /// `Panic(uint256)` with its standard description
    PanicCode(U256, String),
    /// Custom error declared in an ABI
    CustomError(String, Vec<NamedValue>),
    /// Empty revert payload
    NoReason,
    /// Anything that could not be classified
    RawData(Bytes),
}

impl fmt::Display for RevertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevertReason::StringReason(text) => f.write_str(text),
            RevertReason::PanicCode(code, description) => match u64::try_from(*code) {
                Ok(small) => write!(f, "Panic(0x{:02x}): {}", small, description),
                Err(_) => write!(f, "Panic({}): {}", code, description),
            },
            RevertReason::CustomError(name, args) => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if arg.name.is_empty() {
                        write!(f, "{}", arg.value)?;
                    } else {
                        write!(f, "{}: {}", arg.name, arg.value)?;
                    }
                }
                write!(f, ")")
            }
            RevertReason::NoReason => f.write_str("reverted without a reason"),
            RevertReason::RawData(data) => write!(f, "0x{}", hex::encode(data)),
        }
    }
}

/// Classify a revert payload
///
/// **Public** - used by the query surface for every failed frame
///
/// # Arguments
/// * `data` - Return data of the reverted frame
/// * `abi` - ABI of the reverting contract, if known
/// * `registry` - Searched for custom errors the callee ABI does not declare
///   (errors bubbled up from libraries or other contracts)
pub fn decode_revert(
    data: &[u8],
    abi: Option<&ContractAbi>,
    registry: &RegistrySnapshot,
) -> RevertReason {
    if data.is_empty() {
        return RevertReason::NoReason;
    }
    let Some((selector, body)) = data.split_first_chunk::<4>() else {
        return RevertReason::RawData(Bytes::copy_from_slice(data));
    };

    if *selector == ERROR_STRING_SELECTOR {
        if let Ok(mut values) = decode(&[ParamType::String], body) {
            if let Some(AbiValue::String(text)) = values.pop() {
                return RevertReason::StringReason(text);
            }
        }
    } else if *selector == PANIC_SELECTOR {
        if let Ok(mut values) = decode(&[ParamType::Uint(256)], body) {
            if let Some(AbiValue::Uint(code, _)) = values.pop() {
                return RevertReason::PanicCode(code, panic_description(code).to_string());
            }
        }
    } else {
        let error = abi
            .and_then(|abi| abi.error_by_selector(selector))
            .or_else(|| registry.find_error(selector).map(|(_, entry)| entry));
        if let Some(error) = error {
            match decode_params(&error.inputs, body) {
                Ok(args) => return RevertReason::CustomError(error.name.clone(), args),
                Err(e) => debug!("Custom error {} did not decode: {}", error.name, e),
            }
        }
    }

    RevertReason::RawData(Bytes::copy_from_slice(data))
}

/// Description of a compiler-inserted panic code
pub fn panic_description(code: U256) -> &'static str {
    let Ok(code) = u64::try_from(code) else {
        return "unknown panic code";
    };
    match code {
        0x00 => "generic compiler panic",
        0x01 => "assertion failed",
        0x11 => "arithmetic overflow or underflow",
        0x12 => "division or modulo by zero",
        0x21 => "invalid enum conversion",
        0x22 => "incorrectly encoded storage byte array",
        0x31 => "pop on empty array",
        0x32 => "array index out of bounds",
        0x41 => "memory allocation overflow",
        0x51 => "call to zero-initialized internal function",
        _ => "unknown panic code",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{encode_call, AbiEntry, AbiParam};

    fn string_payload(text: &str) -> Vec<u8> {
        encode_call(
            ERROR_STRING_SELECTOR,
            &[ParamType::String],
            &[AbiValue::String(text.to_string())],
        )
        .unwrap()
    }

    #[test]
    fn test_string_reason() {
        let reason = decode_revert(
            &string_payload("Insufficient balance"),
            None,
            &RegistrySnapshot::default(),
        );
        assert_eq!(reason, RevertReason::StringReason("Insufficient balance".into()));
        assert_eq!(reason.to_string(), "Insufficient balance");
    }

    #[test]
    fn test_panic_overflow() {
        let data =
            encode_call(PANIC_SELECTOR, &[ParamType::Uint(256)], &[AbiValue::uint(U256::from(0x11u64))]).unwrap();
        let reason = decode_revert(&data, None, &RegistrySnapshot::default());
        assert_eq!(
            reason,
            RevertReason::PanicCode(U256::from(0x11u64), "arithmetic overflow or underflow".into())
        );
        assert_eq!(reason.to_string(), "Panic(0x11): arithmetic overflow or underflow");
    }

    #[test]
    fn test_empty_and_raw() {
        let registry = RegistrySnapshot::default();
        assert_eq!(decode_revert(&[], None, &registry), RevertReason::NoReason);
        assert_eq!(
            decode_revert(&[0xde, 0xad], None, &registry),
            RevertReason::RawData(Bytes::from(vec![0xde, 0xad]))
        );
        // right selector, truncated body
        assert!(matches!(
            decode_revert(&ERROR_STRING_SELECTOR, None, &registry),
            RevertReason::RawData(_)
        ));
    }

    #[test]
    fn test_custom_error_from_abi() {
        let mut abi = ContractAbi::default();
        let error = AbiEntry::error(
            "InsufficientBalance",
            vec![
                AbiParam::new("available", ParamType::Uint(256)),
                AbiParam::new("required", ParamType::Uint(256)),
            ],
        );
        let data = encode_call(
            error.selector,
            &error.input_types(),
            &[AbiValue::uint(U256::from(5u64)), AbiValue::uint(U256::from(9u64))],
        )
        .unwrap();
        abi.errors.push(error);

        let reason = decode_revert(&data, Some(&abi), &RegistrySnapshot::default());
        assert_eq!(reason.to_string(), "InsufficientBalance(available: 5, required: 9)");
    }
}
