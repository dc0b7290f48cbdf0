//! Call-frame builder.
//!
//! One linear pass over the normalized steps with an explicit stack of open
//! frames; nesting can reach the VM's call-depth limit, so nothing here
//! recurses.
//!
//! Depth handling, per step:
//! - same depth as the open frame: normal execution
//! - one level shallower without a terminal opcode: the open frame halted
//!   exceptionally (out of gas, stack underflow, ...) and closes as INVALID
//! - anything else: inconsistent trace, realign and record `DepthJump`

use super::frame::{CallFrame, CallTree, FrameId, FrameStatus};
use crate::abi::decode_params;
use crate::parser::{
    CallType, NormalizedTrace, OpKind, RawLog, Step, Terminal, TransactionHeader,
};
use crate::registry::{ContractInfo, RegistrySnapshot};
use crate::utils::anomaly::Anomaly;
use crate::utils::config::{
    CONSTRUCTOR_FUNCTION, FALLBACK_FUNCTION, MAX_CALL_DEPTH, RECEIVE_FUNCTION, UNKNOWN_FUNCTION,
};
use alloy_primitives::{Address, Bytes, B256, U256};
use log::{debug, warn};

/// Result of a build: the tree plus everything that looked wrong on the way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    pub tree: CallTree,
    pub anomalies: Vec<Anomaly>,
}

/// Build the call tree for one transaction
///
/// **Public** - main entry point for the call-frame builder
///
/// # Arguments
/// * `header` - Transaction header (root callee, input, value)
/// * `trace` - Normalized steps
/// * `registry` - Contract metadata as of the analysis
///
/// # Returns
/// The call tree and the anomalies found while building. Never fails: bad
/// data degrades the affected frame and is reported as an anomaly.
pub fn build_call_tree(
    header: &TransactionHeader,
    trace: &NormalizedTrace,
    registry: &RegistrySnapshot,
) -> BuildOutput {
    debug!("Building call tree from {} steps", trace.steps.len());

    let mut builder = FrameBuilder::new(&trace.steps);
    builder.open_root(header);
    for step in &trace.steps {
        builder.process(step);
    }
    let mut output = builder.finish(trace.return_value.as_ref(), trace.failed);

    annotate_frames(&mut output.tree.frames, registry, &mut output.anomalies);

    debug!(
        "Built call tree: {} frames, {} anomalies",
        output.tree.frames.len(),
        output.anomalies.len()
    );
    output
}

/// Frame on the builder's stack, with the VM depth its steps run at
#[derive(Debug, Clone, Copy)]
struct OpenFrame {
    id: FrameId,
    depth: u32,
}

/// A frame that just closed; the caller's next step still has something to
/// tell about it (success word, created address, return buffer)
#[derive(Debug, Clone, Copy)]
struct Settlement {
    id: FrameId,
    needs_return_data: bool,
}

/// Call operands read from the stack snapshot of a call-family step
struct CallOperands {
    target: Option<Address>,
    value: U256,
    input_offset: U256,
    input_len: U256,
}

impl CallOperands {
    /// Operand order is fixed per opcode; top of stack first
    fn read(step: &Step, call_type: CallType) -> Option<Self> {
        let arg = |n: usize| step.stack_top(n);
        match call_type {
            CallType::Call | CallType::CallCode => Some(Self {
                target: Some(word_to_address(arg(1)?)),
                value: arg(2)?,
                input_offset: arg(3)?,
                input_len: arg(4)?,
            }),
            CallType::DelegateCall | CallType::StaticCall => Some(Self {
                target: Some(word_to_address(arg(1)?)),
                value: U256::ZERO,
                input_offset: arg(2)?,
                input_len: arg(3)?,
            }),
            CallType::Create => Some(Self {
                target: None,
                value: arg(0)?,
                input_offset: arg(1)?,
                input_len: arg(2)?,
            }),
            CallType::Create2 => {
                // salt sits below the length
                arg(3)?;
                Some(Self {
                    target: None,
                    value: arg(0)?,
                    input_offset: arg(1)?,
                    input_len: arg(2)?,
                })
            }
        }
    }
}

struct FrameBuilder<'a> {
    steps: &'a [Step],
    frames: Vec<CallFrame>,
    open: Vec<OpenFrame>,
    step_owner: Vec<FrameId>,
    anomalies: Vec<Anomaly>,
    settlement: Option<Settlement>,
    trailing: Option<(usize, usize)>,
}

impl<'a> FrameBuilder<'a> {
    fn new(steps: &'a [Step]) -> Self {
        Self {
            steps,
            frames: Vec::new(),
            open: Vec::new(),
            step_owner: Vec::with_capacity(steps.len()),
            anomalies: Vec::new(),
            settlement: None,
            trailing: None,
        }
    }

    /// Push the frame for the externally submitted transaction
    fn open_root(&mut self, header: &TransactionHeader) {
        let call_type = if header.is_creation() {
            CallType::Create
        } else {
            CallType::Call
        };
        let mut root = CallFrame::new(0, None, call_type);
        root.callee_address = header.target();
        root.context_address = root.callee_address;
        root.value = header.value;
        root.input_data = header.input.clone();

        let depth = self.steps.first().map_or(1, |s| s.depth);
        self.frames.push(root);
        self.open.push(OpenFrame { id: 0, depth });
    }

    fn process(&mut self, step: &Step) {
        if self.open.is_empty() {
            // root already closed
            let trailing = self.trailing.get_or_insert((step.index, 0));
            trailing.1 += 1;
            self.step_owner.push(0);
            return;
        }

        self.align_depth(step);
        if let Some(settlement) = self.settlement.take() {
            self.settle(settlement, step);
        }

        let top = self.top();
        self.step_owner.push(top.id);

        match step.kind {
            OpKind::Call(call_type) => self.open_call(step, call_type),
            OpKind::Terminal(terminal) => self.close_terminal(step, terminal),
            OpKind::Log(topic_count) => self.record_log(step, topic_count),
            OpKind::Other => {}
        }
    }

    fn top(&self) -> OpenFrame {
        // open is never empty while steps are being assigned
        self.open.last().copied().unwrap_or(OpenFrame { id: 0, depth: 0 })
    }

    /// Bring the open-frame stack in line with the depth of `step`
    fn align_depth(&mut self, step: &Step) {
        loop {
            let top = self.top();
            if step.depth == top.depth {
                return;
            }

            if step.depth.checked_add(1) == Some(top.depth) && self.open.len() > 1 {
                let error = step
                    .index
                    .checked_sub(1)
                    .and_then(|prev| self.steps.get(prev))
                    .and_then(|prev| prev.error.clone());
                debug!(
                    "Frame {} halted at step {} ({})",
                    top.id,
                    step.index,
                    error.as_deref().unwrap_or("no error reported")
                );
                let id = self.close_top(
                    step.index.checked_sub(1),
                    FrameStatus::Invalid,
                    Some(Bytes::new()),
                );
                self.frames[id].error = error;
                continue;
            }

            self.record(Anomaly::DepthJump {
                step: step.index,
                from: top.depth,
                to: step.depth,
            });

            if step.depth < top.depth {
                while self.open.len() > 1 && self.top().depth > step.depth {
                    self.close_top(step.index.checked_sub(1), FrameStatus::Unknown, None);
                }
            } else {
                let target = step.depth.min(MAX_CALL_DEPTH + 1);
                while self.top().depth < target {
                    self.open_synthetic(step.index);
                }
            }

            if let Some(open) = self.open.last_mut() {
                open.depth = step.depth;
            }
            return;
        }
    }

    /// Frame entered without a call opcode we saw
    fn open_synthetic(&mut self, start: usize) {
        let parent = self.top();
        let id = self.frames.len();
        let mut frame = CallFrame::new(id, Some(parent.id), CallType::Call);
        frame.jump_depth = self.frames[parent.id].jump_depth + 1;
        frame.start_step = start;
        self.frames[parent.id].children.push(id);
        self.frames.push(frame);
        self.open.push(OpenFrame {
            id,
            depth: parent.depth.saturating_add(1),
        });
    }

    fn open_call(&mut self, step: &Step, call_type: CallType) {
        // the call instruction itself halted the caller; the next step's
        // depth drop closes it as INVALID
        let steps = self.steps;
        let next = steps.get(step.index + 1);
        if step.error.is_some() || next.is_some_and(|n| n.depth < step.depth) {
            debug!("{} at step {} never entered its callee", step.op, step.index);
            return;
        }

        let parent = self.top();
        let id = self.frames.len();
        let mut frame = CallFrame::new(id, Some(parent.id), call_type);
        frame.jump_depth = self.frames[parent.id].jump_depth + 1;
        frame.call_step = Some(step.index);
        frame.start_step = step.index + 1;

        match CallOperands::read(step, call_type) {
            Some(operands) => {
                frame.callee_address = operands.target;
                frame.value = operands.value;
                frame.input_data = step
                    .read_memory(operands.input_offset, operands.input_len)
                    .unwrap_or_default();
            }
            None => self.record(Anomaly::MissingOperands {
                step: step.index,
                op: step.op.clone(),
            }),
        }
        frame.context_address = if call_type.borrows_context() {
            self.frames[parent.id].context_address
        } else {
            frame.callee_address
        };

        self.frames[parent.id].children.push(id);

        match next {
            // the callee ran no code: EOA, precompile or a failed pre-check
            Some(next) if next.depth == step.depth => {
                frame.status = match next.stack_top(0) {
                    Some(word) if !word.is_zero() => FrameStatus::Success,
                    Some(_) => FrameStatus::Invalid,
                    None => FrameStatus::Unknown,
                };
                self.frames.push(frame);
                self.settlement = Some(Settlement {
                    id,
                    needs_return_data: true,
                });
            }
            _ => {
                self.frames.push(frame);
                self.open.push(OpenFrame {
                    id,
                    depth: step.depth.saturating_add(1),
                });
            }
        }
    }

    fn close_terminal(&mut self, step: &Step, terminal: Terminal) {
        let status = match terminal {
            Terminal::Return | Terminal::Stop | Terminal::SelfDestruct => FrameStatus::Success,
            Terminal::Revert => FrameStatus::Reverted,
            Terminal::Invalid => FrameStatus::Invalid,
        };
        let return_data = match terminal {
            Terminal::Return | Terminal::Revert => step
                .stack_top(0)
                .zip(step.stack_top(1))
                .and_then(|(offset, len)| step.read_memory(offset, len)),
            _ => Some(Bytes::new()),
        };

        let id = self.close_top(Some(step.index), status, return_data);
        if terminal == Terminal::Invalid {
            self.frames[id].error = step.error.clone();
        }
    }

    /// Pop the top frame and finalize its range, status and gas
    ///
    /// `return_data == None` means it could not be read from memory and is
    /// taken from the caller's next step if possible.
    fn close_top(
        &mut self,
        end: Option<usize>,
        status: FrameStatus,
        return_data: Option<Bytes>,
    ) -> FrameId {
        let Some(open) = self.open.pop() else {
            return 0;
        };
        let steps = self.steps;
        let frame = &mut self.frames[open.id];
        frame.end_step = end.filter(|end| *end >= frame.start_step);
        frame.status = status;
        let needs_return_data = return_data.is_none();
        frame.return_data = return_data.unwrap_or_default();
        frame.gas_used = frame_gas(steps, frame.start_step, frame.end_step);

        if !self.open.is_empty() {
            self.settlement = Some(Settlement {
                id: open.id,
                needs_return_data,
            });
        }
        open.id
    }

    /// Apply what the caller's first step after a call reveals
    fn settle(&mut self, settlement: Settlement, step: &Step) {
        let frame = &mut self.frames[settlement.id];
        if frame.call_type.is_create() {
            if let Some(word) = step.stack_top(0).filter(|w| !w.is_zero()) {
                let address = word_to_address(word);
                frame.callee_address = Some(address);
                frame.context_address = Some(address);
            }
        }
        if settlement.needs_return_data {
            if let Some(data) = &step.return_data {
                frame.return_data = data.clone();
            }
        }
    }

    fn record_log(&mut self, step: &Step, topic_count: u8) {
        let operands = step.stack_top(0).zip(step.stack_top(1));
        let topics: Option<Vec<B256>> = (0..usize::from(topic_count))
            .map(|k| step.stack_top(2 + k).map(word_to_b256))
            .collect();

        let (Some((offset, len)), Some(topics)) = (operands, topics) else {
            self.record(Anomaly::MissingOperands {
                step: step.index,
                op: step.op.clone(),
            });
            return;
        };

        let id = self.top().id;
        let frame = &mut self.frames[id];
        frame.logs.push(RawLog {
            address: frame.context_address.unwrap_or_default(),
            topics,
            data: step.read_memory(offset, len).unwrap_or_default(),
            step: Some(step.index),
        });
    }

    fn finish(mut self, root_return: Option<&Bytes>, failed: Option<bool>) -> BuildOutput {
        // a transaction that ran no code (plain transfer) has no steps at all
        if self.steps.is_empty() {
            let status = match failed {
                Some(false) => FrameStatus::Success,
                Some(true) => FrameStatus::Invalid,
                None => FrameStatus::Unknown,
            };
            self.open.clear();
            self.frames[0].status = status;
        }

        // an error on the final step halts whatever frame it ran in
        if let Some(last) = self.steps.last() {
            if last.error.is_some() && !self.open.is_empty() && self.top().depth == last.depth {
                let id = self.close_top(Some(last.index), FrameStatus::Invalid, Some(Bytes::new()));
                self.frames[id].error = last.error.clone();
            }
        }

        if !self.open.is_empty() {
            let open_frames = self.open.len();
            let end = self.steps.len().checked_sub(1);
            while !self.open.is_empty() {
                self.close_top(end, FrameStatus::Unknown, None);
            }
            self.record(Anomaly::TruncatedTrace { open_frames });
        }

        if let Some((first, count)) = self.trailing {
            let root = &mut self.frames[0];
            root.end_step = Some(first + count - 1);
            root.gas_used = frame_gas(self.steps, root.start_step, root.end_step);
            self.record(Anomaly::TrailingSteps { first, count });
        }

        let root = &mut self.frames[0];
        if root.return_data.is_empty() {
            if let Some(value) = root_return {
                root.return_data = value.clone();
            }
        }

        BuildOutput {
            tree: CallTree {
                frames: self.frames,
                step_owner: self.step_owner,
            },
            anomalies: self.anomalies,
        }
    }

    fn record(&mut self, anomaly: Anomaly) {
        warn!("{}", anomaly);
        self.anomalies.push(anomaly);
    }
}

/// Resolve contract and function names and decode call data
///
/// **Private** - runs once over the finished arena, in pre-order
fn annotate_frames(
    frames: &mut [CallFrame],
    registry: &RegistrySnapshot,
    anomalies: &mut Vec<Anomaly>,
) {
    for frame in frames.iter_mut() {
        let Some(info) = registry.contract_of(frame) else {
            frame.function_name = if frame.call_type.is_create() {
                CONSTRUCTOR_FUNCTION
            } else {
                UNKNOWN_FUNCTION
            }
            .to_string();
            continue;
        };
        frame.contract_name = Some(info.name.clone());

        if frame.call_type.is_create() {
            annotate_constructor(frame, info, anomalies);
        } else {
            annotate_call(frame, info, anomalies);
        }
    }
}

fn annotate_constructor(frame: &mut CallFrame, info: &ContractInfo, anomalies: &mut Vec<Anomaly>) {
    frame.function_name = CONSTRUCTOR_FUNCTION.to_string();
    let (Some(constructor), Some(code)) = (&info.abi.constructor, &info.creation_code) else {
        return;
    };
    let Some(args) = frame.input_data.strip_prefix(code.as_slice()) else {
        return;
    };
    match decode_params(&constructor.inputs, args) {
        Ok(values) => frame.decoded_input = Some(values),
        Err(e) => push_anomaly(
            anomalies,
            Anomaly::UndecodedInput {
                frame: frame.id,
                reason: e.to_string(),
            },
        ),
    }
}

fn annotate_call(frame: &mut CallFrame, info: &ContractInfo, anomalies: &mut Vec<Anomaly>) {
    if frame.input_data.is_empty() {
        frame.function_name = if info.abi.has_receive {
            RECEIVE_FUNCTION
        } else if info.abi.has_fallback {
            FALLBACK_FUNCTION
        } else {
            UNKNOWN_FUNCTION
        }
        .to_string();
        return;
    }

    let Some(function) = frame
        .selector()
        .and_then(|selector| info.abi.function_by_selector(&selector))
    else {
        frame.function_name = if info.abi.has_fallback {
            FALLBACK_FUNCTION
        } else {
            UNKNOWN_FUNCTION
        }
        .to_string();
        return;
    };
    frame.function_name = function.name.clone();

    match decode_params(&function.inputs, &frame.input_data[4..]) {
        Ok(values) => frame.decoded_input = Some(values),
        Err(e) => push_anomaly(
            anomalies,
            Anomaly::UndecodedInput {
                frame: frame.id,
                reason: e.to_string(),
            },
        ),
    }

    if frame.status == FrameStatus::Success {
        match decode_params(&function.outputs, &frame.return_data) {
            Ok(values) => frame.decoded_output = Some(values),
            Err(e) => push_anomaly(
                anomalies,
                Anomaly::UndecodedOutput {
                    frame: frame.id,
                    reason: e.to_string(),
                },
            ),
        }
    }
}

fn push_anomaly(anomalies: &mut Vec<Anomaly>, anomaly: Anomaly) {
    warn!("{}", anomaly);
    anomalies.push(anomaly);
}

/// Gas between the first step and the end of the last one
fn frame_gas(steps: &[Step], start: usize, end: Option<usize>) -> u64 {
    let Some(end) = end else {
        return 0;
    };
    match (steps.get(start), steps.get(end)) {
        (Some(first), Some(last)) => first
            .gas
            .saturating_sub(last.gas)
            .saturating_add(last.gas_cost),
        _ => 0,
    }
}

fn word_to_b256(word: U256) -> B256 {
    B256::from(word.to_be_bytes::<32>())
}

/// Low 20 bytes of a stack word
fn word_to_address(word: U256) -> Address {
    Address::from_word(word_to_b256(word))
}
