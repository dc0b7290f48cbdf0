//! EVM Trace Studio
//!
//! Call-tree reconstruction, ABI decoding and revert diagnostics for EVM
//! transaction traces.
//!
//! This crate provides the analysis engine behind the `evm-trace` CLI.
//! The engine takes a struct-logger trace, a transaction header and a
//! snapshot of known contracts, and produces an immutable
//! [`TransactionAnalysis`]:
//!
//! ```ignore
//! let registry = load_registry("contracts.json")?;
//! let analysis = TransactionAnalysis::build(&header, &source, &registry.snapshot());
//! println!("{}", analysis.call_trace().unwrap_or_default());
//! ```

pub mod abi;
pub mod aggregator;
pub mod commands;
pub mod diagnostics;
pub mod output;
pub mod parser;
pub mod query;
pub mod registry;
pub mod rpc;
pub mod utils;

pub use query::TransactionAnalysis;
pub use registry::{load_registry, ContractInfo, ContractRegistry, RegistrySnapshot};
