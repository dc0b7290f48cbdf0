//! Call tree data model.
//!
//! Frames live in one arena (`Vec<CallFrame>`) in the order they were opened,
//! which is depth-first pre-order. Children are referenced by id and the
//! parent link is a plain back-reference, so walking the tree never needs
//! recursion or reference counting.

use crate::abi::NamedValue;
use crate::parser::{CallType, RawLog};
use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Position of a frame in `CallTree::frames`
pub type FrameId = usize;

/// How a frame ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrameStatus {
    Success,
    Reverted,
    /// INVALID opcode or an exceptional halt (out of gas, stack error, ...)
    Invalid,
    /// The trace ended before the frame did
    Unknown,
}

impl FrameStatus {
    pub fn is_failure(self) -> bool {
        matches!(self, FrameStatus::Reverted | FrameStatus::Invalid)
    }
}

impl fmt::Display for FrameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameStatus::Success => "SUCCESS",
            FrameStatus::Reverted => "REVERTED",
            FrameStatus::Invalid => "INVALID",
            FrameStatus::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// One logical call or creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    pub id: FrameId,
    pub parent: Option<FrameId>,
    /// In call order
    pub children: Vec<FrameId>,

    pub call_type: CallType,
    /// Code address; for a creation, the created address once known
    pub callee_address: Option<Address>,
    /// Address whose storage and logs the code acts on
    pub context_address: Option<Address>,
    /// `None` when the callee is not registered
    pub contract_name: Option<String>,
    pub function_name: String,

    /// 0 for the root, parent + 1 below it
    pub jump_depth: u32,
    /// Step that opened the frame (`None` for the root)
    pub call_step: Option<usize>,
    pub start_step: usize,
    /// Inclusive; `None` when the frame executed no steps
    pub end_step: Option<usize>,

    pub status: FrameStatus,
    pub value: U256,
    pub input_data: Bytes,
    pub return_data: Bytes,
    pub decoded_input: Option<Vec<NamedValue>>,
    pub decoded_output: Option<Vec<NamedValue>>,
    /// Logs emitted directly by this frame, in step order
    pub logs: Vec<RawLog>,
    pub gas_used: u64,
    /// Error string reported by the VM for an exceptional halt
    pub error: Option<String>,
}

impl CallFrame {
    pub(crate) fn new(id: FrameId, parent: Option<FrameId>, call_type: CallType) -> Self {
        Self {
            id,
            parent,
            children: Vec::new(),
            call_type,
            callee_address: None,
            context_address: None,
            contract_name: None,
            function_name: crate::utils::config::UNKNOWN_FUNCTION.to_string(),
            jump_depth: 0,
            call_step: None,
            start_step: 0,
            end_step: None,
            status: FrameStatus::Unknown,
            value: U256::ZERO,
            input_data: Bytes::new(),
            return_data: Bytes::new(),
            decoded_input: None,
            decoded_output: None,
            logs: Vec::new(),
            gas_used: 0,
            error: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_resolved(&self) -> bool {
        self.contract_name.is_some()
    }

    /// Inclusive step range, `None` for a frame that ran no code
    pub fn step_range(&self) -> Option<RangeInclusive<usize>> {
        self.end_step.map(|end| self.start_step..=end)
    }

    /// `Contract.function`, falling back to the address when unresolved
    pub fn label(&self) -> String {
        let contract = match (&self.contract_name, &self.callee_address) {
            (Some(name), _) => name.clone(),
            (None, Some(address)) => address.to_checksum(None),
            (None, None) => "<unknown>".to_string(),
        };
        format!("{}.{}", contract, self.function_name)
    }

    /// 4-byte selector of the input, if there is one
    pub fn selector(&self) -> Option<[u8; 4]> {
        if self.call_type.is_create() {
            return None;
        }
        self.input_data.get(..4).and_then(|s| s.try_into().ok())
    }
}

/// Hierarchical call record of one transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTree {
    pub(crate) frames: Vec<CallFrame>,
    /// Innermost frame executing each step
    pub(crate) step_owner: Vec<FrameId>,
}

impl CallTree {
    pub fn root(&self) -> &CallFrame {
        &self.frames[0]
    }

    pub fn frame(&self, id: FrameId) -> Option<&CallFrame> {
        self.frames.get(id)
    }

    /// All frames in depth-first pre-order (execution order of entry)
    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn children(&self, id: FrameId) -> impl Iterator<Item = &CallFrame> + '_ {
        self.frames
            .get(id)
            .into_iter()
            .flat_map(move |frame| {
                frame
                    .children
                    .iter()
                    .filter_map(move |c| self.frames.get(*c))
            })
    }

    pub fn parent(&self, id: FrameId) -> Option<&CallFrame> {
        self.frames.get(id)?.parent.and_then(|p| self.frames.get(p))
    }

    /// Parent, grandparent, ... up to the root
    pub fn ancestors(&self, id: FrameId) -> impl Iterator<Item = &CallFrame> + '_ {
        std::iter::successors(self.parent(id), move |frame| self.parent(frame.id))
    }

    /// Frame that executed the given step
    pub fn owner_of(&self, step: usize) -> Option<&CallFrame> {
        self.step_owner.get(step).and_then(|id| self.frames.get(*id))
    }

    pub fn step_count(&self) -> usize {
        self.step_owner.len()
    }
}
