//! Fault localization.
//!
//! A revert deep in the call tree usually makes every caller revert too, so
//! the outermost failed frame is rarely the cause. The fault origin is found
//! by walking down from a failed root as long as the call that finished last
//! also failed.

use crate::aggregator::{CallFrame, CallTree, FrameId};
use log::debug;
use std::cmp::Reverse;

/// Frame where the failure originated
///
/// **Public** - used by the query surface
///
/// # Returns
/// * Failed root: the innermost frame of the propagation chain
/// * Successful root: the first failed frame to terminate (a failure the
///   caller caught), or `None` if nothing failed
pub fn locate_fault(tree: &CallTree) -> Option<FrameId> {
    let root = tree.root();
    if !root.status.is_failure() {
        return tree
            .frames()
            .iter()
            .filter(|f| f.status.is_failure())
            .min_by_key(|f| (termination_key(f), Reverse(f.jump_depth)))
            .map(|f| f.id);
    }

    let mut current = root;
    while let Some(last) = tree.children(current.id).max_by_key(|c| termination_key(c)) {
        if !last.status.is_failure() {
            break;
        }
        current = last;
    }

    debug!("Fault origin: frame {} ({})", current.id, current.label());
    Some(current.id)
}

/// Step at which a frame stopped executing
///
/// Frames that ran no code terminate at their call step.
fn termination_key(frame: &CallFrame) -> usize {
    frame
        .end_step
        .or(frame.call_step)
        .unwrap_or(frame.start_step)
}
