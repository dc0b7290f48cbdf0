//! Revert diagnostics.
//!
//! This module handles:
//! - Classifying revert payloads (string, panic, custom error, raw)
//! - Locating the frame a failure originated in

pub mod fault;
pub mod revert;

pub use fault::locate_fault;
pub use revert::{decode_revert, panic_description, RevertReason};
