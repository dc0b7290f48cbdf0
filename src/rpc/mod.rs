//! RPC client for fetching transactions and traces from an Ethereum node.
//!
//! This module handles:
//! - `debug_traceTransaction` with the struct logger
//! - `eth_getTransactionByHash` and `eth_getTransactionReceipt`
//! - Degrading to `TraceSource::Unavailable` when the node cannot trace

pub mod client;
pub mod types;

pub use client::RpcClient;
pub use types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RawTraceData};
