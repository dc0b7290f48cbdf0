//! ABI decoder for call data, return data and event logs.
//!
//! Every read is bounds-checked; short or inconsistent input yields a
//! `DecodeError` that callers turn into a raw-hex fallback.

use super::entry::{AbiEntry, AbiParam};
use super::param::ParamType;
use super::value::{AbiValue, TupleField};
use crate::utils::error::DecodeError;
use alloy_primitives::{Address, B256, I256, U256};
use serde::Serialize;
use std::fmt;

/// A decoded parameter with its declared name and type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedValue {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: AbiValue,
}

/// One event parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventParam {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: AbiValue,
    pub indexed: bool,
    /// False when only the topic hash of an indexed reference type is known
    pub decoded: bool,
}

/// A log decoded against its event ABI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedEvent {
    pub name: String,
    pub address: Option<Address>,
    pub params: Vec<EventParam>,
}

impl fmt::Display for DecodedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if param.name.is_empty() {
                write!(f, "{}", param.value)?;
            } else {
                write!(f, "{}: {}", param.name, param.value)?;
            }
        }
        write!(f, ")")
    }
}

/// Decode a tuple body into values
///
/// **Public** - inverse of `encode`
///
/// # Errors
/// * `DecodeError::InsufficientData` - Data ends before a declared value
/// * `DecodeError::InvalidOffset` - An offset or length points outside the data
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<AbiValue>, DecodeError> {
    decode_sequence(types, data, 0)
}

/// Decode a tuple body against named parameters
pub fn decode_params(params: &[AbiParam], data: &[u8]) -> Result<Vec<NamedValue>, DecodeError> {
    let types: Vec<ParamType> = params.iter().map(|p| p.kind.clone()).collect();
    let values = decode(&types, data)?;
    Ok(params
        .iter()
        .zip(values)
        .map(|(param, value)| NamedValue {
            name: param.name.clone(),
            kind: param.kind.canonical(),
            value,
        })
        .collect())
}

/// Decode an event log
///
/// Indexed parameters are read from `topics[1..]` (or `topics[0..]` for an
/// anonymous event), one word each, in declaration order. Indexed reference
/// types only expose their hash and are flagged `decoded = false`.
/// Non-indexed parameters are decoded from `data` as one tuple.
///
/// # Errors
/// * `DecodeError::MissingTopic` - Fewer topics than indexed parameters
/// * Any error from decoding `data`
pub fn decode_event(
    topics: &[B256],
    data: &[u8],
    event: &AbiEntry,
) -> Result<DecodedEvent, DecodeError> {
    let mut topic_index = usize::from(!event.anonymous);

    let body_types: Vec<ParamType> = event
        .inputs
        .iter()
        .filter(|p| !p.indexed)
        .map(|p| p.kind.clone())
        .collect();
    let mut body = decode(&body_types, data)?.into_iter();

    let mut params = Vec::with_capacity(event.inputs.len());
    for input in &event.inputs {
        let (value, decoded) = if input.indexed {
            let topic = topics
                .get(topic_index)
                .ok_or(DecodeError::MissingTopic(topic_index))?;
            topic_index += 1;
            if input.kind.is_value_type() {
                (decode_value(&input.kind, topic.as_slice(), 0)?, true)
            } else {
                (AbiValue::FixedBytes(topic.to_vec()), false)
            }
        } else {
            let value = body.next().ok_or(DecodeError::InsufficientData {
                offset: data.len(),
                needed: 32,
                available: data.len(),
            })?;
            (value, true)
        };

        params.push(EventParam {
            name: input.name.clone(),
            kind: input.kind.canonical(),
            value,
            indexed: input.indexed,
            decoded,
        });
    }

    Ok(DecodedEvent {
        name: event.name.clone(),
        address: None,
        params,
    })
}

/// Decode a sequence whose head starts at `base`; offsets are relative to it
fn decode_sequence(
    types: &[ParamType],
    data: &[u8],
    base: usize,
) -> Result<Vec<AbiValue>, DecodeError> {
    let mut values = Vec::with_capacity(types.len());
    let mut cursor = base;

    for kind in types {
        let value = if kind.is_dynamic() {
            let offset = read_usize(data, cursor)?;
            let at = base
                .checked_add(offset)
                .ok_or_else(|| DecodeError::InvalidOffset(format!("offset {} overflows", offset)))?;
            decode_value(kind, data, at)?
        } else {
            decode_value(kind, data, cursor)?
        };
        values.push(value);
        cursor = cursor.saturating_add(kind.head_size());
    }

    Ok(values)
}

fn decode_value(kind: &ParamType, data: &[u8], at: usize) -> Result<AbiValue, DecodeError> {
    match kind {
        ParamType::Address => {
            let word = read_word(data, at)?;
            Ok(AbiValue::Address(Address::from_word(B256::from(word))))
        }
        ParamType::Bool => Ok(AbiValue::Bool(read_word(data, at)?.iter().any(|b| *b != 0))),
        ParamType::Uint(bits) => Ok(AbiValue::Uint(
            U256::from_be_bytes(read_word(data, at)?),
            *bits,
        )),
        ParamType::Int(bits) => Ok(AbiValue::Int(
            I256::from_raw(U256::from_be_bytes(read_word(data, at)?)),
            *bits,
        )),
        ParamType::FixedBytes(n) => {
            let word = read_word(data, at)?;
            Ok(AbiValue::FixedBytes(word[..(*n).min(32)].to_vec()))
        }
        ParamType::Function => Ok(AbiValue::FixedBytes(read_word(data, at)?[..24].to_vec())),
        ParamType::Bytes => Ok(AbiValue::Bytes(read_dynamic_bytes(data, at)?.to_vec())),
        ParamType::String => Ok(AbiValue::String(
            String::from_utf8_lossy(read_dynamic_bytes(data, at)?).into_owned(),
        )),
        ParamType::Array(inner) => {
            let len = read_usize(data, at)?;
            let start = at + 32;
            // every element needs at least one head word
            let room = data.len().saturating_sub(start) / inner.head_size().max(32);
            if len > room {
                return Err(DecodeError::InvalidOffset(format!(
                    "array length {} exceeds remaining data",
                    len
                )));
            }
            let types: Vec<ParamType> = std::iter::repeat(inner.as_ref().clone()).take(len).collect();
            decode_sequence(&types, data, start).map(AbiValue::Array)
        }
        ParamType::FixedArray(inner, n) => {
            let needed = inner.head_size().checked_mul(*n).ok_or_else(|| {
                DecodeError::InvalidOffset(format!("fixed array of {} elements is too large", n))
            })?;
            read_slice(data, at, needed)?;
            let types = vec![inner.as_ref().clone(); *n];
            decode_sequence(&types, data, at).map(AbiValue::FixedArray)
        }
        ParamType::Tuple(components) => {
            let types: Vec<ParamType> = components.iter().map(|c| c.kind.clone()).collect();
            let values = decode_sequence(&types, data, at)?;
            Ok(AbiValue::Tuple(
                components
                    .iter()
                    .zip(values)
                    .map(|(c, value)| TupleField {
                        name: c.name.clone(),
                        value,
                    })
                    .collect(),
            ))
        }
    }
}

fn read_word(data: &[u8], at: usize) -> Result<[u8; 32], DecodeError> {
    let slice = read_slice(data, at, 32)?;
    let mut word = [0u8; 32];
    word.copy_from_slice(slice);
    Ok(word)
}

fn read_usize(data: &[u8], at: usize) -> Result<usize, DecodeError> {
    let value = U256::from_be_bytes(read_word(data, at)?);
    usize::try_from(value)
        .map_err(|_| DecodeError::InvalidOffset(format!("{} does not fit in memory", value)))
}

fn read_slice(data: &[u8], at: usize, len: usize) -> Result<&[u8], DecodeError> {
    let insufficient = || DecodeError::InsufficientData {
        offset: at,
        needed: len,
        available: data.len().saturating_sub(at),
    };
    let end = at.checked_add(len).ok_or_else(insufficient)?;
    data.get(at..end).ok_or_else(insufficient)
}

/// Length-prefixed byte string at `at`
fn read_dynamic_bytes(data: &[u8], at: usize) -> Result<&[u8], DecodeError> {
    let len = read_usize(data, at)?;
    read_slice(data, at + 32, len)
}
