//! Text rendering of call trees and source excerpts.

use crate::aggregator::{CallTree, FrameId, FrameStatus};
use crate::parser::source_map::render_excerpt;
use crate::parser::Step;
use crate::registry::RegistrySnapshot;
use std::fmt::Write as _;

/// Render the call tree, one frame per line, indented by call depth
///
/// Frames are listed in pre-order, so no recursion is needed. Failed or
/// unfinished frames carry their status.
pub fn render_call_trace(tree: &CallTree) -> String {
    let mut out = String::new();
    for frame in tree.frames() {
        let indent = "    ".repeat(frame.jump_depth as usize);
        let range = match frame.step_range() {
            Some(range) => format!("{}:{}", range.start(), range.end()),
            None => "-".to_string(),
        };
        let _ = write!(
            out,
            "{}{} [{}] steps {} gas {}",
            indent,
            frame.label(),
            frame.call_type,
            range,
            frame.gas_used
        );
        if frame.status.is_failure() {
            let _ = write!(out, "  ✗ {}", frame.status);
        } else if frame.status != FrameStatus::Success {
            let _ = write!(out, "  ? {}", frame.status);
        }
        out.push('\n');
    }
    out
}

/// Render where a frame failed, as a source excerpt when possible
///
/// The failing instruction is the frame's last step; a frame that ran no code
/// is located at the call site in its caller. Without a source map the
/// location is described by contract and bytecode offset.
pub fn render_failure(
    tree: &CallTree,
    steps: &[Step],
    registry: &RegistrySnapshot,
    frame_id: FrameId,
    pad: usize,
) -> Option<String> {
    let frame = tree.frame(frame_id)?;
    let step_index = frame.end_step.or(frame.call_step)?;
    let step = steps.get(step_index)?;
    let owner = tree.owner_of(step_index)?;

    let info = registry.contract_of(owner);
    let pc = usize::try_from(step.pc).ok()?;

    if let Some(location) = info.and_then(|info| info.locate_in(owner.call_type, pc)) {
        let text = info.and_then(|info| info.source_text(&location.file));
        if let (Some(text), Some(line)) = (text, location.line) {
            let mut out = format!("File \"{}\", line {}, in {}:\n", location.file, line, owner.label());
            out.push_str(&render_excerpt(text, location.offset, location.length, pad));
            return Some(out);
        }
        return Some(format!(
            "File \"{}\", offset {}:{}, in {}",
            location.file,
            location.offset,
            location.length,
            owner.label()
        ));
    }

    Some(format!(
        "{} at bytecode offset {:#06x} ({})",
        owner.label(),
        step.pc,
        step.op
    ))
}
