//! Trace parsing and schema definitions.
//!
//! This module handles:
//! - Normalizing raw struct-logger JSON into indexed steps
//! - Classifying opcodes
//! - Expanding compiler source maps
//! - Defining the boundary schema (transaction header, receipt, logs)

pub mod opcode;
pub mod schema;
pub mod source_map;
pub mod step;

// Re-export main types
pub use opcode::{CallType, OpKind, Terminal};
pub use schema::{RawLog, Receipt, TransactionHeader};
pub use source_map::{SourceLocation, SourceMap, SourceMapEntry};
pub use step::{normalize_trace, NormalizedTrace, Step, TraceSource};
