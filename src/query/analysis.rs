//! Per-transaction analysis result.
//!
//! Everything is computed once in `TransactionAnalysis::build` and only read
//! afterwards. A missing trace is not an error: trace-derived accessors
//! return `None` and the rest (receipt events, receipt status) still works.

use super::render::{render_call_trace, render_failure};
use crate::abi::{decode_event, AbiValue, DecodedEvent, EventParam, NamedValue};
use crate::aggregator::{
    build_call_tree, calculate_gas_profile, CallFrame, CallTree, FrameId, FrameStatus, FunctionGas,
};
use crate::diagnostics::{decode_revert, locate_fault, RevertReason};
use crate::parser::{
    normalize_trace, RawLog, SourceLocation, Step, TraceSource, TransactionHeader,
};
use crate::registry::RegistrySnapshot;
use crate::utils::anomaly::Anomaly;
use crate::utils::config::UNKNOWN_FUNCTION;
use alloy_primitives::{Address, Bytes};
use log::{debug, info, warn};

/// Transaction status as reported to callers
pub const STATUS_PENDING: i8 = -1;
pub const STATUS_FAILED: i8 = 0;
pub const STATUS_SUCCESS: i8 = 1;

/// Trace-derived part of an analysis
#[derive(Debug, Clone, PartialEq, Eq)]
struct TraceAnalysis {
    steps: Vec<Step>,
    tree: CallTree,
    fault: Option<FrameId>,
    revert_reason: Option<RevertReason>,
}

/// A step with the frame, contract and source it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedStep<'a> {
    pub step: &'a Step,
    pub frame: FrameId,
    pub address: Option<Address>,
    pub contract: Option<&'a str>,
    pub function: &'a str,
    pub source: Option<SourceLocation>,
}

/// Immutable result of analyzing one transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionAnalysis {
    header: TransactionHeader,
    registry: RegistrySnapshot,
    trace: Option<TraceAnalysis>,
    unavailable_reason: Option<String>,
    events: Vec<DecodedEvent>,
    anomalies: Vec<Anomaly>,
}

impl TransactionAnalysis {
    /// Analyze a transaction
    ///
    /// **Public** - main entry point of the engine
    ///
    /// # Arguments
    /// * `header` - Transaction header (and receipt, if known)
    /// * `source` - Raw trace or the reason there is none
    /// * `registry` - Contract metadata snapshot; not modified
    ///
    /// # Returns
    /// The complete analysis. Never fails: an unavailable or unusable trace
    /// leaves the trace-derived fields empty.
    pub fn build(
        header: &TransactionHeader,
        source: &TraceSource,
        registry: &RegistrySnapshot,
    ) -> Self {
        let mut anomalies = Vec::new();
        let mut unavailable_reason = None;

        let trace = match source {
            TraceSource::Available(raw) => match normalize_trace(raw) {
                Ok(normalized) => {
                    anomalies.extend(normalized.anomalies.iter().cloned());
                    let output = build_call_tree(header, &normalized, registry);
                    anomalies.extend(output.anomalies);

                    let fault = locate_fault(&output.tree);
                    let revert_reason = output
                        .tree
                        .root()
                        .status
                        .is_failure()
                        .then_some(fault)
                        .flatten()
                        .and_then(|id| output.tree.frame(id))
                        .map(|frame| frame_revert_reason(frame, registry));

                    Some(TraceAnalysis {
                        steps: normalized.steps,
                        tree: output.tree,
                        fault,
                        revert_reason,
                    })
                }
                Err(e) => {
                    warn!("Trace unusable: {}", e);
                    anomalies.push(Anomaly::InvalidTrace {
                        reason: e.to_string(),
                    });
                    None
                }
            },
            TraceSource::Unavailable { reason } => {
                info!("Trace unavailable: {}", reason);
                unavailable_reason = Some(reason.clone());
                None
            }
        };

        let events = match &trace {
            Some(trace) => decode_trace_events(&trace.tree, registry, &mut anomalies),
            None => decode_receipt_events(header, registry, &mut anomalies),
        };

        debug!(
            "Analysis complete: {} events, {} anomalies",
            events.len(),
            anomalies.len()
        );

        Self {
            header: header.clone(),
            registry: registry.clone(),
            trace,
            unavailable_reason,
            events,
            anomalies,
        }
    }

    pub fn header(&self) -> &TransactionHeader {
        &self.header
    }

    pub fn is_trace_available(&self) -> bool {
        self.trace.is_some()
    }

    /// Why the node could not trace, if it could not
    pub fn unavailable_reason(&self) -> Option<&str> {
        self.unavailable_reason.as_deref()
    }

    /// Decoded events in emission order
    ///
    /// Taken from the trace when there is one, otherwise from the receipt.
    /// Logs that do not match any known event are listed with raw topics
    /// and data, flagged `decoded = false`.
    pub fn events(&self) -> &[DecodedEvent] {
        &self.events
    }

    /// Raw return data of the outermost call, if it succeeded
    pub fn return_value(&self) -> Option<&Bytes> {
        let root = self.trace.as_ref()?.tree.root();
        (root.status == FrameStatus::Success).then_some(&root.return_data)
    }

    /// Return value decoded against the root function's outputs
    pub fn decoded_return_value(&self) -> Option<&[NamedValue]> {
        let root = self.trace.as_ref()?.tree.root();
        (root.status == FrameStatus::Success)
            .then_some(root.decoded_output.as_deref())
            .flatten()
    }

    /// Revert reason of the fault origin, when the transaction failed
    pub fn revert_reason(&self) -> Option<&RevertReason> {
        self.trace.as_ref()?.revert_reason.as_ref()
    }

    /// Revert reason as text; the VM error for an exceptional halt
    pub fn revert_msg(&self) -> Option<String> {
        let reason = self.revert_reason()?;
        let frame = self.fault_frame()?;
        match (&frame.error, reason) {
            (Some(error), RevertReason::NoReason) if frame.status == FrameStatus::Invalid => {
                Some(error.clone())
            }
            _ => Some(reason.to_string()),
        }
    }

    /// Rendered call tree
    pub fn call_trace(&self) -> Option<String> {
        Some(render_call_trace(&self.trace.as_ref()?.tree))
    }

    /// Source excerpt (with `pad` lines of context) where the fault originated
    pub fn error(&self, pad: usize) -> Option<String> {
        let trace = self.trace.as_ref()?;
        render_failure(&trace.tree, &trace.steps, &self.registry, trace.fault?, pad)
    }

    /// Normalized steps annotated with their frame and source location
    pub fn trace(&self) -> Option<Vec<AnnotatedStep<'_>>> {
        let trace = self.trace.as_ref()?;
        Some(
            trace
                .steps
                .iter()
                .filter_map(|step| {
                    let frame = trace.tree.owner_of(step.index)?;
                    let source = self
                        .registry
                        .contract_of(frame)
                        .zip(usize::try_from(step.pc).ok())
                        .and_then(|(info, pc)| info.locate_in(frame.call_type, pc));
                    Some(AnnotatedStep {
                        step,
                        frame: frame.id,
                        address: frame.callee_address,
                        contract: frame.contract_name.as_deref(),
                        function: &frame.function_name,
                        source,
                    })
                })
                .collect(),
        )
    }

    /// Normalized steps without annotations
    pub fn steps(&self) -> Option<&[Step]> {
        Some(&self.trace.as_ref()?.steps)
    }

    /// `-1` pending or unknown, `0` failed, `1` success
    ///
    /// Derived from the root frame; falls back to the receipt when the trace
    /// is missing or ended early.
    pub fn status(&self) -> i8 {
        let root_status = self.trace.as_ref().map(|t| t.tree.root().status);
        match root_status {
            Some(FrameStatus::Success) => STATUS_SUCCESS,
            Some(FrameStatus::Reverted | FrameStatus::Invalid) => STATUS_FAILED,
            Some(FrameStatus::Unknown) | None => match &self.header.receipt {
                Some(receipt) if receipt.status => STATUS_SUCCESS,
                Some(_) => STATUS_FAILED,
                None => STATUS_PENDING,
            },
        }
    }

    /// Frame the failure originated in
    pub fn fault_frame(&self) -> Option<&CallFrame> {
        let trace = self.trace.as_ref()?;
        trace.tree.frame(trace.fault?)
    }

    pub fn call_tree(&self) -> Option<&CallTree> {
        Some(&self.trace.as_ref()?.tree)
    }

    /// Revert reason of any failed frame
    pub fn frame_revert_reason(&self, id: FrameId) -> Option<RevertReason> {
        let frame = self.trace.as_ref()?.tree.frame(id)?;
        frame
            .status
            .is_failure()
            .then(|| frame_revert_reason(frame, &self.registry))
    }

    /// Soft problems found while analyzing
    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    pub fn gas_profile(&self) -> Option<Vec<FunctionGas>> {
        Some(calculate_gas_profile(&self.trace.as_ref()?.tree))
    }
}

/// **Private** - revert reason of one frame against its contract ABI
fn frame_revert_reason(frame: &CallFrame, registry: &RegistrySnapshot) -> RevertReason {
    let abi = registry.contract_of(frame).map(|info| &info.abi);
    decode_revert(&frame.return_data, abi, registry)
}

/// Decode the logs recorded on trace frames, in emission order
fn decode_trace_events(
    tree: &CallTree,
    registry: &RegistrySnapshot,
    anomalies: &mut Vec<Anomaly>,
) -> Vec<DecodedEvent> {
    let mut logs: Vec<(&CallFrame, &RawLog)> = tree
        .frames()
        .iter()
        .flat_map(|frame| frame.logs.iter().map(move |log| (frame, log)))
        .collect();
    logs.sort_by_key(|(_, log)| log.step);

    logs.into_iter()
        .map(|(frame, log)| {
            let code_address = frame.callee_address.unwrap_or(log.address);
            decode_log(log, code_address, registry, anomalies)
        })
        .collect()
}

/// Decode receipt logs when no trace is available
fn decode_receipt_events(
    header: &TransactionHeader,
    registry: &RegistrySnapshot,
    anomalies: &mut Vec<Anomaly>,
) -> Vec<DecodedEvent> {
    let Some(receipt) = &header.receipt else {
        return Vec::new();
    };
    receipt
        .logs
        .iter()
        .map(|log| decode_log(log, log.address, registry, anomalies))
        .collect()
}

/// Decode one log against the emitting code's ABI, then any registered ABI
fn decode_log(
    log: &RawLog,
    code_address: Address,
    registry: &RegistrySnapshot,
    anomalies: &mut Vec<Anomaly>,
) -> DecodedEvent {
    let Some(topic0) = log.topics.first() else {
        return raw_event(log);
    };
    let event = registry
        .resolve(&code_address)
        .and_then(|info| info.abi.event_by_topic(topic0))
        .or_else(|| registry.find_event(topic0).map(|(_, event)| event));

    let Some(event) = event else {
        return raw_event(log);
    };

    match decode_event(&log.topics, &log.data, event) {
        Ok(mut decoded) => {
            decoded.address = Some(log.address);
            decoded
        }
        Err(e) => {
            let anomaly = Anomaly::UndecodedEvent {
                step: log.step,
                reason: format!("{}: {}", event.name, e),
            };
            warn!("{}", anomaly);
            anomalies.push(anomaly);
            raw_event(log)
        }
    }
}

/// Undecoded log: topics and data as raw bytes
fn raw_event(log: &RawLog) -> DecodedEvent {
    let mut params: Vec<EventParam> = log
        .topics
        .iter()
        .enumerate()
        .map(|(i, topic)| EventParam {
            name: format!("topic{}", i),
            kind: "bytes32".to_string(),
            value: AbiValue::FixedBytes(topic.to_vec()),
            indexed: true,
            decoded: false,
        })
        .collect();
    params.push(EventParam {
        name: "data".to_string(),
        kind: "bytes".to_string(),
        value: AbiValue::Bytes(log.data.to_vec()),
        indexed: false,
        decoded: false,
    });
    DecodedEvent {
        name: UNKNOWN_FUNCTION.to_string(),
        address: Some(log.address),
        params,
    }
}
