//! Utility modules for configuration, error handling, and anomaly records.

pub mod anomaly;
pub mod config;
pub mod error;
pub mod quantity;

// Re-export commonly used error types for convenience
pub use anomaly::Anomaly;
pub use error::{AbiError, ArtifactError, DecodeError, OutputError, ParseError, RpcError};
