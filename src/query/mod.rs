//! Query surface over an analyzed transaction.
//!
//! This module handles:
//! - Building the immutable per-transaction analysis
//! - Rendering call trees and failure locations as text

pub mod analysis;
pub mod render;

pub use analysis::{
    AnnotatedStep, TransactionAnalysis, STATUS_FAILED, STATUS_PENDING, STATUS_SUCCESS,
};
pub use render::{render_call_trace, render_failure};
