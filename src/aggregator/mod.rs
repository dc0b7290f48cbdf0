//! Aggregation of normalized steps into a call tree and metrics.
//!
//! This module transforms normalized execution steps into:
//! - A hierarchical call tree (one frame per call or creation)
//! - Decoded call inputs and outputs per frame
//! - A per-function gas profile

pub mod builder;
pub mod frame;
pub mod metrics;

// Re-export main types and functions
pub use builder::{build_call_tree, BuildOutput};
pub use frame::{CallFrame, CallTree, FrameId, FrameStatus};
pub use metrics::{calculate_gas_profile, FunctionGas};
