//! Report output.
//!
//! This module handles:
//! - Summarizing an analysis into a serializable report
//! - Writing and reading reports as JSON

pub mod json;
pub mod report;

pub use json::{read_report, report_to_string, write_report};
pub use report::AnalysisReport;
