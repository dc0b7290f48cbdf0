//! HTTP client for communicating with an Ethereum node RPC endpoint.

use super::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcReceipt, RpcTransaction};
use crate::parser::{TraceSource, TransactionHeader};
use crate::utils::config::{DEFAULT_RPC_TIMEOUT, RPC_METHOD_NOT_FOUND};
use crate::utils::error::RpcError;
use log::{debug, info, warn};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;

/// RPC client for fetching transactions and traces from a node
pub struct RpcClient {
    client: Client,
    rpc_url: String,
}

impl RpcClient {
    /// Create a new RPC client
    pub fn new(rpc_url: impl Into<String>) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(DEFAULT_RPC_TIMEOUT)
            .build()
            .map_err(RpcError::RequestFailed)?;

        Ok(Self {
            client,
            rpc_url: rpc_url.into(),
        })
    }

    /// Fetch the struct-logger trace of a transaction
    ///
    /// **Public** - trace input for the analysis engine
    ///
    /// # Returns
    /// `TraceSource::Available` with the raw trace, or
    /// `TraceSource::Unavailable` when the node does not support tracing
    ///
    /// # Errors
    /// * `RpcError::RequestFailed` - transport failure
    /// * `RpcError::TransactionNotFound` - unknown transaction hash
    /// * `RpcError::JsonRpc` - any other node-side error
    pub fn debug_trace_transaction(&self, tx_hash: &str) -> Result<TraceSource, RpcError> {
        let tx_hash = normalize_tx_hash(tx_hash);

        info!("Fetching trace for transaction: {}", tx_hash);

        let request = JsonRpcRequest::debug_trace_transaction(&tx_hash, 1);
        match self.send::<serde_json::Value>(&request, &tx_hash) {
            Ok(Some(raw)) => Ok(TraceSource::Available(raw)),
            Ok(None) => Err(RpcError::InvalidResponse(
                "Missing result field".to_string(),
            )),
            Err(RpcError::JsonRpc { code, message }) if is_unsupported(code, &message) => {
                warn!("Node cannot trace transactions: {}", message);
                Ok(TraceSource::Unavailable { reason: message })
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch a transaction and, if mined, its receipt
    ///
    /// **Public** - header input for the analysis engine
    ///
    /// # Errors
    /// * `RpcError::TransactionNotFound` - the node does not know the hash
    pub fn get_transaction(&self, tx_hash: &str) -> Result<TransactionHeader, RpcError> {
        let tx_hash = normalize_tx_hash(tx_hash);
        let params = serde_json::json!([tx_hash]);

        let transaction: RpcTransaction = self
            .send(
                &JsonRpcRequest::new("eth_getTransactionByHash", params.clone(), 1),
                &tx_hash,
            )?
            .ok_or_else(|| RpcError::TransactionNotFound(tx_hash.clone()))?;

        let receipt: Option<RpcReceipt> = self.send(
            &JsonRpcRequest::new("eth_getTransactionReceipt", params, 2),
            &tx_hash,
        )?;
        if receipt.is_none() {
            info!("Transaction {} is pending", tx_hash);
        }

        Ok(transaction.into_header(receipt))
    }

    /// Send one request; a `null` result comes back as `None`
    ///
    /// **Private** - internal helper
    fn send<T: DeserializeOwned>(
        &self,
        request: &JsonRpcRequest,
        tx_hash: &str,
    ) -> Result<Option<T>, RpcError> {
        debug!("RPC request: {:?}", request);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(request)
            .send()
            .map_err(RpcError::RequestFailed)?;

        if !response.status().is_success() {
            return Err(RpcError::InvalidResponse(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().unwrap_or_default()
            )));
        }

        let rpc_response: JsonRpcResponse<T> =
            response.json().map_err(RpcError::RequestFailed)?;

        if let Some(error) = rpc_response.error {
            return Err(map_rpc_error(error, tx_hash));
        }

        Ok(rpc_response.result)
    }
}

/// Normalize transaction hash to include 0x prefix
pub fn normalize_tx_hash(tx_hash: &str) -> String {
    if tx_hash.starts_with("0x") {
        tx_hash.to_string()
    } else {
        format!("0x{}", tx_hash)
    }
}

/// Map JSON-RPC error to our error type
fn map_rpc_error(error: JsonRpcError, tx_hash: &str) -> RpcError {
    if error.code == -32000 && error.message.to_lowercase().contains("not found") {
        return RpcError::TransactionNotFound(tx_hash.to_string());
    }
    RpcError::JsonRpc {
        code: error.code,
        message: error.message,
    }
}

/// Whether a node error means the trace capability is missing
fn is_unsupported(code: i64, message: &str) -> bool {
    let message = message.to_lowercase();
    code == RPC_METHOD_NOT_FOUND
        || message.contains("not supported")
        || message.contains("does not exist")
        || message.contains("not available")
}
