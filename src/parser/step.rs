//! Step normalizer for struct-logger traces.
//!
//! Parses raw JSON from `debug_traceTransaction` into an indexed, immutable
//! `Step` sequence. Individual bad records are dropped and counted; only a
//! trace whose top-level shape is unusable is an error.

use super::opcode::OpKind;
use crate::utils::anomaly::Anomaly;
use crate::utils::config::{
    GAS_FIELD_NAMES, MAX_CALL_DEPTH, MAX_MEMORY_READ, RETURN_VALUE_FIELD_NAMES, STEP_FIELD_NAMES,
};
use crate::utils::error::ParseError;
use crate::utils::quantity::{self, opt_u64};
use alloy_primitives::{Bytes, U256};
use log::{debug, warn};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Raw trace as handed over by the transport
#[derive(Debug, Clone)]
pub enum TraceSource {
    /// Struct-logger output (object with `structLogs`, or a bare step array)
    Available(serde_json::Value),

    /// The node cannot produce a detailed trace
    Unavailable { reason: String },
}

/// Raw execution step as printed by the struct logger
///
/// Every field is optional here so that a single bad record can be reported
/// instead of failing the whole array.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStep {
    #[serde(default, deserialize_with = "opt_u64::deserialize")]
    pc: Option<u64>,

    #[serde(default)]
    op: Option<String>,

    #[serde(default, deserialize_with = "opt_u64::deserialize")]
    depth: Option<u64>,

    #[serde(default, deserialize_with = "opt_u64::deserialize")]
    gas: Option<u64>,

    #[serde(default, alias = "gas_cost", deserialize_with = "opt_u64::deserialize")]
    gas_cost: Option<u64>,

    #[serde(default)]
    stack: Option<Vec<String>>,

    #[serde(default)]
    memory: Option<RawMemory>,

    #[serde(default)]
    storage: Option<BTreeMap<String, String>>,

    #[serde(default, alias = "return_data")]
    return_data: Option<String>,

    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Memory is either a list of 32-byte words or one flat hex string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawMemory {
    Words(Vec<String>),
    Flat(String),
}

/// One executed instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Position in the normalized sequence
    pub index: usize,
    pub pc: u64,
    pub op: String,
    pub kind: OpKind,
    /// Call depth as reported by the VM (1 for the outermost call)
    pub depth: u32,
    pub gas: u64,
    pub gas_cost: u64,
    /// Stack words, top of stack last
    pub stack: Vec<U256>,
    pub memory: Option<Bytes>,
    pub storage: Option<BTreeMap<U256, U256>>,
    /// Return buffer of the most recent call, when the tracer reports it
    pub return_data: Option<Bytes>,
    pub error: Option<String>,
}

impl Step {
    /// Stack word `n` positions below the top (0 is the top)
    pub fn stack_top(&self, n: usize) -> Option<U256> {
        self.stack.len().checked_sub(n + 1).map(|i| self.stack[i])
    }

    /// Read `len` bytes of memory at `offset`
    ///
    /// Bytes past the end of the snapshot read as zero, matching EVM memory
    /// expansion. Returns `None` if memory was not captured or the region is
    /// absurdly large.
    pub fn read_memory(&self, offset: U256, len: U256) -> Option<Bytes> {
        let len = usize::try_from(len).ok()?;
        if len == 0 {
            return Some(Bytes::new());
        }
        if len > MAX_MEMORY_READ {
            return None;
        }
        let memory = self.memory.as_ref()?;
        let offset = usize::try_from(offset).ok()?;
        let end = offset.checked_add(len)?;

        let mut out = vec![0u8; len];
        if offset < memory.len() {
            let available = memory.len().min(end);
            out[..available - offset].copy_from_slice(&memory[offset..available]);
        }
        Some(Bytes::from(out))
    }
}

/// Normalized trace (internal representation)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTrace {
    pub steps: Vec<Step>,
    pub anomalies: Vec<Anomaly>,
    /// Gas used as reported by the tracer, if present
    pub gas_used: Option<u64>,
    /// Top-level failure flag, if present
    pub failed: Option<bool>,
    /// Return value of the outermost call, if present
    pub return_value: Option<Bytes>,
}

/// Normalize a raw struct-logger trace
///
/// **Public** - main entry point for the step normalizer
///
/// # Arguments
/// * `raw_trace` - Raw JSON from debug_traceTransaction
///
/// # Returns
/// Indexed steps in original order plus anomalies for dropped records
///
/// # Errors
/// * `ParseError::InvalidFormat` - The trace is neither an object nor an array
pub fn normalize_trace(raw_trace: &serde_json::Value) -> Result<NormalizedTrace, ParseError> {
    let (trace_obj, steps_array) = detect_trace_format(raw_trace)?;

    let mut anomalies = Vec::new();
    let steps = match steps_array {
        Some(array) => parse_steps_array(array, &mut anomalies),
        None => {
            warn!("No execution steps found in trace");
            Vec::new()
        }
    };

    let gas_used = trace_obj.and_then(|obj| {
        GAS_FIELD_NAMES
            .iter()
            .find_map(|field| obj.get(*field).and_then(|v| quantity::json_u64(v).ok()))
    });
    let failed = trace_obj.and_then(|obj| obj.get("failed")).and_then(|v| v.as_bool());
    let return_value = trace_obj.and_then(|obj| {
        RETURN_VALUE_FIELD_NAMES.iter().find_map(|field| {
            obj.get(*field)
                .and_then(|v| v.as_str())
                .and_then(|s| quantity::parse_bytes(s).ok())
                .map(Bytes::from)
        })
    });

    debug!(
        "Normalized {} steps ({} dropped)",
        steps.len(),
        anomalies.len()
    );

    Ok(NormalizedTrace {
        steps,
        anomalies,
        gas_used,
        failed,
        return_value,
    })
}

type TraceParts<'a> = (
    Option<&'a serde_json::Map<String, serde_json::Value>>,
    Option<&'a Vec<serde_json::Value>>,
);

/// Locate the top-level object and the step array
///
/// **Private** - internal helper for normalize_trace
fn detect_trace_format(raw_trace: &serde_json::Value) -> Result<TraceParts<'_>, ParseError> {
    match raw_trace {
        serde_json::Value::Object(obj) => {
            // Some clients hand back the whole JSON-RPC envelope
            if let Some(inner) = obj.get("result").filter(|v| v.is_object()) {
                return detect_trace_format(inner);
            }
            let steps = STEP_FIELD_NAMES
                .iter()
                .find_map(|field| obj.get(*field).and_then(|v| v.as_array()));
            Ok((Some(obj), steps))
        }
        serde_json::Value::Array(steps) => {
            debug!("Trace is a bare step array");
            Ok((None, Some(steps)))
        }
        _ => Err(ParseError::InvalidFormat(
            "Trace must be a JSON object or array".to_string(),
        )),
    }
}

/// Parse array of execution steps, dropping malformed records
///
/// **Private** - internal parsing logic
fn parse_steps_array(steps_array: &[serde_json::Value], anomalies: &mut Vec<Anomaly>) -> Vec<Step> {
    let mut steps = Vec::with_capacity(steps_array.len());

    for (raw_index, step_value) in steps_array.iter().enumerate() {
        let converted = serde_json::from_value::<RawStep>(step_value.clone())
            .map_err(|e| e.to_string())
            .and_then(|raw| convert_step(steps.len(), raw));

        match converted {
            Ok(step) => steps.push(step),
            Err(reason) => {
                // Log but don't fail - some steps may be malformed
                warn!("Dropping step {}: {}", raw_index, reason);
                anomalies.push(Anomaly::MalformedStep { raw_index, reason });
            }
        }
    }

    steps
}

/// Validate a raw record and convert it into a `Step`
///
/// **Private** - internal conversion
fn convert_step(index: usize, raw: RawStep) -> Result<Step, String> {
    let pc = raw.pc.ok_or("missing pc")?;
    let op = raw.op.ok_or("missing op")?;
    let depth = raw.depth.ok_or("missing depth")?;
    // the outermost frame runs at 1, its deepest callee at MAX_CALL_DEPTH + 1
    let depth = u32::try_from(depth)
        .ok()
        .filter(|d| *d <= MAX_CALL_DEPTH + 1)
        .ok_or_else(|| format!("depth {} out of range", depth))?;
    let gas = raw.gas.ok_or("missing gas")?;
    let gas_cost = raw.gas_cost.ok_or("missing gasCost")?;

    let stack = raw
        .stack
        .unwrap_or_default()
        .iter()
        .map(|word| quantity::parse_word(word))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;

    let memory = match raw.memory {
        Some(RawMemory::Words(words)) => {
            let mut buf = Vec::with_capacity(words.len() * 32);
            for word in &words {
                buf.extend(quantity::parse_bytes(word).map_err(|e| e.to_string())?);
            }
            Some(Bytes::from(buf))
        }
        Some(RawMemory::Flat(flat)) => Some(Bytes::from(
            quantity::parse_bytes(&flat).map_err(|e| e.to_string())?,
        )),
        None => None,
    };

    let storage = match raw.storage {
        Some(map) => {
            let mut parsed = BTreeMap::new();
            for (slot, value) in &map {
                let slot = quantity::parse_word(slot).map_err(|e| e.to_string())?;
                let value = quantity::parse_word(value).map_err(|e| e.to_string())?;
                parsed.insert(slot, value);
            }
            Some(parsed)
        }
        None => None,
    };

    let return_data = match raw.return_data.as_deref() {
        Some(hex_str) => Some(Bytes::from(
            quantity::parse_bytes(hex_str).map_err(|e| e.to_string())?,
        )),
        None => None,
    };

    let error = raw.error.and_then(|value| match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    });

    Ok(Step {
        index,
        pc,
        kind: OpKind::classify(&op),
        op,
        depth,
        gas,
        gas_cost,
        stack,
        memory,
        storage,
        return_data,
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step_json(pc: u64, op: &str, depth: u64) -> serde_json::Value {
        json!({ "pc": pc, "op": op, "depth": depth, "gas": 1000, "gasCost": 3, "stack": [] })
    }

    #[test]
    fn test_normalize_minimal() {
        let raw = json!({ "gas": 21000, "failed": false, "returnValue": "", "structLogs": [] });
        let trace = normalize_trace(&raw).unwrap();
        assert!(trace.steps.is_empty());
        assert_eq!(trace.gas_used, Some(21000));
        assert_eq!(trace.failed, Some(false));
        assert_eq!(trace.return_value, Some(Bytes::new()));
    }

    #[test]
    fn test_malformed_step_is_dropped_and_counted() {
        let raw = json!({
            "structLogs": [
                step_json(0, "PUSH1", 1),
                { "pc": 2, "depth": 1, "gas": 997, "gasCost": 3 },
                step_json(4, "STOP", 1)
            ]
        });
        let trace = normalize_trace(&raw).unwrap();
        assert_eq!(trace.steps.len(), 2);
        assert_eq!(trace.steps[1].index, 1);
        assert_eq!(trace.steps[1].pc, 4);
        assert_eq!(trace.anomalies.len(), 1);
        assert!(matches!(
            trace.anomalies[0],
            Anomaly::MalformedStep { raw_index: 1, .. }
        ));
    }

    #[test]
    fn test_bad_stack_word_is_malformed() {
        let raw = json!([{ "pc": 0, "op": "ADD", "depth": 1, "gas": 10, "gasCost": 3, "stack": ["0xnothex"] }]);
        let trace = normalize_trace(&raw).unwrap();
        assert!(trace.steps.is_empty());
        assert_eq!(trace.anomalies.len(), 1);
    }

    #[test]
    fn test_depth_beyond_call_limit_is_malformed() {
        let raw = json!([step_json(0, "PUSH1", 1), step_json(2, "STOP", u64::from(u32::MAX))]);
        let trace = normalize_trace(&raw).unwrap();
        assert_eq!(trace.steps.len(), 1);
        assert!(matches!(
            &trace.anomalies[..],
            [Anomaly::MalformedStep { raw_index: 1, reason }] if reason.contains("out of range")
        ));
    }

    #[test]
    fn test_memory_words_and_read() {
        let raw = json!([{
            "pc": 0, "op": "RETURN", "depth": 1, "gas": "0x10", "gasCost": "0",
            "stack": ["0x20", "0x0"],
            "memory": [
                "0000000000000000000000000000000000000000000000000000000000000001",
                "00000000000000000000000000000000000000000000000000000000000000ff"
            ]
        }]);
        let trace = normalize_trace(&raw).unwrap();
        let step = &trace.steps[0];
        assert_eq!(step.gas, 16);
        assert_eq!(step.stack_top(0), Some(U256::ZERO));
        assert_eq!(step.stack_top(1), Some(U256::from(0x20u64)));
        assert_eq!(step.stack_top(2), None);

        let word = step.read_memory(U256::from(32u64), U256::from(32u64)).unwrap();
        assert_eq!(word[31], 0xff);

        // reading past the snapshot zero-fills
        let tail = step.read_memory(U256::from(60u64), U256::from(8u64)).unwrap();
        assert_eq!(&tail[..], &[0, 0, 0, 0xff, 0, 0, 0, 0]);
    }

    #[test]
    fn test_read_memory_without_snapshot() {
        let raw = json!([step_json(0, "CALL", 1)]);
        let trace = normalize_trace(&raw).unwrap();
        let step = &trace.steps[0];
        assert_eq!(step.read_memory(U256::ZERO, U256::from(4u64)), None);
        assert_eq!(step.read_memory(U256::ZERO, U256::ZERO), Some(Bytes::new()));
    }

    #[test]
    fn test_storage_and_error_fields() {
        let raw = json!([{
            "pc": 7, "op": "SSTORE", "depth": 1, "gas": 5000, "gasCost": 5000,
            "storage": { "0x01": "0x02" },
            "error": "out of gas"
        }]);
        let trace = normalize_trace(&raw).unwrap();
        let step = &trace.steps[0];
        let storage = step.storage.as_ref().unwrap();
        assert_eq!(storage.get(&U256::from(1u64)), Some(&U256::from(2u64)));
        assert_eq!(step.error.as_deref(), Some("out of gas"));
    }

    #[test]
    fn test_invalid_top_level() {
        assert!(normalize_trace(&json!("nope")).is_err());
    }

    #[test]
    fn test_rpc_envelope_is_unwrapped() {
        let raw = json!({ "jsonrpc": "2.0", "id": 1, "result": { "structLogs": [step_json(0, "STOP", 1)] } });
        let trace = normalize_trace(&raw).unwrap();
        assert_eq!(trace.steps.len(), 1);
    }
}
