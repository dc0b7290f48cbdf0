//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.
//!
//! None of these describe a reverted call: a revert is a normal outcome and is
//! carried as frame status plus a `RevertReason`. Soft data problems found
//! while building are recorded as `Anomaly` values instead.

use thiserror::Error;

/// Errors that can occur during RPC communication
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("JSON-RPC error {code}: {message}")]
    JsonRpc { code: i64, message: String },
}

/// Errors that can occur during trace normalization
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("JSON deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid trace format: {0}")]
    InvalidFormat(String),
}

/// Errors raised while parsing ABI definitions or encoding values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error("Invalid ABI type '{0}'")]
    InvalidType(String),

    #[error("Tuple type '{0}' has no components")]
    MissingComponents(String),

    #[error("Expected {expected} values, got {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("Value {value} does not match type {expected}")]
    TypeMismatch { expected: String, value: String },

    #[error("Invalid ABI JSON: {0}")]
    InvalidJson(String),
}

/// Errors raised while decoding ABI-encoded bytes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Insufficient data: need {needed} bytes at offset {offset}, have {available}")]
    InsufficientData {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Offset or length out of range: {0}")]
    InvalidOffset(String),

    #[error("Missing topic {0} for indexed parameter")]
    MissingTopic(usize),
}

/// Errors that can occur while loading compiler artifacts
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Failed to read artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse artifact JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid ABI: {0}")]
    Abi(#[from] AbiError),

    #[error("Invalid bytecode: {0}")]
    InvalidBytecode(String),

    #[error("Invalid source map at entry {index}: {reason}")]
    InvalidSourceMap { index: usize, reason: String },

    #[error("Invalid contract address '{0}'")]
    InvalidAddress(String),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
