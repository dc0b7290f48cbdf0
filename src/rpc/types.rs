//! Types for JSON-RPC communication with an Ethereum node.
//!
//! Based on the Ethereum JSON-RPC spec and the geth `debug_traceTransaction`
//! struct logger.

use crate::parser::{RawLog, Receipt, TransactionHeader};
use crate::utils::quantity::opt_u64;
use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// JSON-RPC 2.0 request structure
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: serde_json::Value,
    pub id: u64,
}

impl JsonRpcRequest {
    pub fn new(method: &str, params: serde_json::Value, id: u64) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id,
        }
    }

    /// Create a request for `debug_traceTransaction` with the struct logger
    ///
    /// # Arguments
    /// * `tx_hash` - Transaction hash (with 0x prefix)
    /// * `id` - Request ID (for response correlation)
    pub fn debug_trace_transaction(tx_hash: &str, id: u64) -> Self {
        Self::new(
            "debug_traceTransaction",
            serde_json::json!([
                tx_hash,
                {
                    "enableMemory": true,
                    "enableReturnData": true
                }
            ]),
            id,
        )
    }
}

/// JSON-RPC 2.0 response structure
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<T> {
    pub jsonrpc: String,
    pub id: u64,
    /// Missing and `null` both read as `None`
    pub result: Option<T>,
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error object
#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Raw struct-logger output (validated later by the parser)
pub type RawTraceData = serde_json::Value;

/// Result of `eth_getTransactionByHash`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    pub hash: B256,
    pub from: Address,
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(default)]
    pub input: Bytes,
    #[serde(default)]
    pub value: U256,
    #[serde(default, deserialize_with = "opt_u64::deserialize")]
    pub gas: Option<u64>,
    #[serde(default)]
    pub gas_price: Option<U256>,
    #[serde(default, deserialize_with = "opt_u64::deserialize")]
    pub nonce: Option<u64>,
}

/// Result of `eth_getTransactionReceipt`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    #[serde(default, deserialize_with = "opt_u64::deserialize")]
    pub status: Option<u64>,
    #[serde(default, deserialize_with = "opt_u64::deserialize")]
    pub gas_used: Option<u64>,
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(default)]
    pub logs: Vec<RpcLog>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcLog {
    pub address: Address,
    #[serde(default)]
    pub topics: Vec<B256>,
    #[serde(default)]
    pub data: Bytes,
}

impl RpcTransaction {
    /// Combine with the receipt (absent while pending) into a header
    pub fn into_header(self, receipt: Option<RpcReceipt>) -> TransactionHeader {
        TransactionHeader {
            hash: Some(self.hash),
            sender: self.from,
            receiver: self.to,
            input: self.input,
            value: self.value,
            gas_limit: self.gas.unwrap_or_default(),
            gas_price: self.gas_price.unwrap_or_default(),
            nonce: self.nonce,
            receipt: receipt.map(RpcReceipt::into_receipt),
        }
    }
}

impl RpcReceipt {
    pub fn into_receipt(self) -> Receipt {
        Receipt {
            status: self.status == Some(1),
            gas_used: self.gas_used.unwrap_or_default(),
            contract_address: self.contract_address,
            logs: self
                .logs
                .into_iter()
                .map(|log| RawLog {
                    address: log.address,
                    topics: log.topics,
                    data: log.data,
                    step: None,
                })
                .collect(),
        }
    }
}
