//! Soft anomalies recorded while normalizing and building.
//!
//! An anomaly never aborts analysis; the affected value degrades to its raw
//! form and the rest of the result still builds.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// Raw record dropped during normalization (position in the raw trace)
    MalformedStep { raw_index: usize, reason: String },

    /// Consecutive steps changed depth by more than one level
    DepthJump { step: usize, from: u32, to: u32 },

    /// A call-family step whose stack was too short for its operands
    MissingOperands { step: usize, op: String },

    /// Frames still open when the trace ended
    TruncatedTrace { open_frames: usize },

    /// Steps seen after the root frame had already closed
    TrailingSteps { first: usize, count: usize },

    /// Known selector but the calldata did not decode
    UndecodedInput { frame: usize, reason: String },

    /// Known selector but the return data did not decode
    UndecodedOutput { frame: usize, reason: String },

    /// Known event signature but the log did not decode
    UndecodedEvent { step: Option<usize>, reason: String },

    /// The raw trace had an unusable top-level shape
    InvalidTrace { reason: String },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::MalformedStep { raw_index, reason } => {
                write!(f, "dropped malformed step {}: {}", raw_index, reason)
            }
            Anomaly::DepthJump { step, from, to } => {
                write!(f, "depth jumped from {} to {} at step {}", from, to, step)
            }
            Anomaly::MissingOperands { step, op } => {
                write!(f, "{} at step {} has too few stack operands", op, step)
            }
            Anomaly::TruncatedTrace { open_frames } => {
                write!(f, "trace ended with {} open frame(s)", open_frames)
            }
            Anomaly::TrailingSteps { first, count } => {
                write!(f, "{} step(s) after the root frame closed, from step {}", count, first)
            }
            Anomaly::UndecodedInput { frame, reason } => {
                write!(f, "input of frame {} not decoded: {}", frame, reason)
            }
            Anomaly::UndecodedOutput { frame, reason } => {
                write!(f, "output of frame {} not decoded: {}", frame, reason)
            }
            Anomaly::UndecodedEvent { step, reason } => match step {
                Some(step) => write!(f, "event at step {} not decoded: {}", step, reason),
                None => write!(f, "receipt event not decoded: {}", reason),
            },
            Anomaly::InvalidTrace { reason } => write!(f, "trace unusable: {}", reason),
        }
    }
}
