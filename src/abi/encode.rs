//! Head/tail ABI encoder.
//!
//! Static values occupy 32-byte head slots in argument order. Dynamic values
//! leave an offset in the head and append their encoding to the tail; nested
//! sequences apply the same rule relative to their own head.

use super::param::ParamType;
use super::value::AbiValue;
use crate::utils::error::AbiError;
use alloy_primitives::U256;

/// Encode calldata: 4-byte selector followed by the encoded arguments
///
/// **Public** - used to build call payloads and in codec tests
///
/// # Errors
/// * `AbiError::LengthMismatch` - Value count differs from type count
/// * `AbiError::TypeMismatch` - A value does not fit its declared type
pub fn encode_call(
    selector: [u8; 4],
    types: &[ParamType],
    values: &[AbiValue],
) -> Result<Vec<u8>, AbiError> {
    let mut out = selector.to_vec();
    out.extend(encode(types, values)?);
    Ok(out)
}

/// Encode a sequence of values as a tuple body
pub fn encode(types: &[ParamType], values: &[AbiValue]) -> Result<Vec<u8>, AbiError> {
    encode_sequence(types, values)
}

fn encode_sequence(types: &[ParamType], values: &[AbiValue]) -> Result<Vec<u8>, AbiError> {
    if types.len() != values.len() {
        return Err(AbiError::LengthMismatch {
            expected: types.len(),
            found: values.len(),
        });
    }

    let head_len = types
        .iter()
        .fold(0usize, |size, kind| size.saturating_add(kind.head_size()));
    let mut head = Vec::new();
    let mut tail = Vec::new();

    for (kind, value) in types.iter().zip(values) {
        let encoded = encode_value(kind, value)?;
        if kind.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            tail.extend(encoded);
        } else {
            head.extend(encoded);
        }
    }

    head.extend(tail);
    Ok(head)
}

fn encode_value(kind: &ParamType, value: &AbiValue) -> Result<Vec<u8>, AbiError> {
    let mismatch = || AbiError::TypeMismatch {
        expected: kind.canonical(),
        value: value.to_string(),
    };

    match (kind, value) {
        (ParamType::Address, AbiValue::Address(address)) => {
            Ok(address.into_word().to_vec())
        }
        (ParamType::Bool, AbiValue::Bool(b)) => Ok(usize_word(usize::from(*b)).to_vec()),
        (ParamType::Uint(bits), AbiValue::Uint(v, _)) => {
            if v.bit_len() > *bits {
                return Err(mismatch());
            }
            Ok(v.to_be_bytes::<32>().to_vec())
        }
        (ParamType::Int(bits), AbiValue::Int(v, _)) => {
            let raw = v.into_raw();
            // two's complement magnitude must fit in bits - 1
            let magnitude = if v.is_negative() { !raw } else { raw };
            if *bits < 256 && magnitude.bit_len() >= *bits {
                return Err(mismatch());
            }
            Ok(raw.to_be_bytes::<32>().to_vec())
        }
        (ParamType::FixedBytes(n), AbiValue::FixedBytes(bytes)) => {
            if bytes.len() != *n {
                return Err(mismatch());
            }
            Ok(pad_right(bytes))
        }
        (ParamType::Function, AbiValue::FixedBytes(bytes)) => {
            if bytes.len() != 24 {
                return Err(mismatch());
            }
            Ok(pad_right(bytes))
        }
        (ParamType::Bytes, AbiValue::Bytes(bytes)) => Ok(encode_packed_bytes(bytes)),
        (ParamType::String, AbiValue::String(s)) => Ok(encode_packed_bytes(s.as_bytes())),
        (ParamType::Array(inner), AbiValue::Array(items)) => {
            let types = vec![inner.as_ref().clone(); items.len()];
            let mut out = usize_word(items.len()).to_vec();
            out.extend(encode_sequence(&types, items)?);
            Ok(out)
        }
        (ParamType::FixedArray(inner, n), AbiValue::FixedArray(items)) => {
            if items.len() != *n {
                return Err(mismatch());
            }
            let types = vec![inner.as_ref().clone(); *n];
            encode_sequence(&types, items)
        }
        (ParamType::Tuple(components), AbiValue::Tuple(fields)) => {
            if components.len() != fields.len() {
                return Err(mismatch());
            }
            let types: Vec<ParamType> = components.iter().map(|c| c.kind.clone()).collect();
            let values: Vec<AbiValue> = fields.iter().map(|f| f.value.clone()).collect();
            encode_sequence(&types, &values)
        }
        _ => Err(mismatch()),
    }
}

/// Length word followed by the data padded to a word boundary
fn encode_packed_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = usize_word(bytes.len()).to_vec();
    out.extend(pad_right(bytes));
    out
}

fn pad_right(bytes: &[u8]) -> Vec<u8> {
    let padded_len = bytes.len().div_ceil(32) * 32;
    let mut out = bytes.to_vec();
    out.resize(padded_len, 0);
    out
}

fn usize_word(n: usize) -> [u8; 32] {
    U256::from(n as u64).to_be_bytes::<32>()
}
