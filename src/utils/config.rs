//! Configuration and constants for the analysis engine and CLI.

use std::time::Duration;

/// Default timeout for RPC requests
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Current report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

// Field names for trace parsing (different RPC implementations use different names)
pub const STEP_FIELD_NAMES: &[&str] = &["structLogs", "struct_logs", "steps"];
pub const GAS_FIELD_NAMES: &[&str] = &["gas", "gasUsed", "gas_used"];
pub const RETURN_VALUE_FIELD_NAMES: &[&str] = &["returnValue", "return_value"];

/// Selector of `Error(string)`
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Selector of `Panic(uint256)`
pub const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

/// Hard call-depth limit of the EVM
pub const MAX_CALL_DEPTH: u32 = 1024;

/// Upper bound for a single memory read taken from a step snapshot.
/// Offsets beyond this are treated as garbage rather than zero-filled.
pub const MAX_MEMORY_READ: usize = 16 * 1024 * 1024;

/// Lines of context shown around a source excerpt
pub const DEFAULT_ERROR_PAD: usize = 3;

/// Placeholder names used when a frame cannot be resolved
pub const UNKNOWN_FUNCTION: &str = "unknown";
pub const CONSTRUCTOR_FUNCTION: &str = "constructor";
pub const FALLBACK_FUNCTION: &str = "fallback";
pub const RECEIVE_FUNCTION: &str = "receive";

/// JSON-RPC error code for "method not found"
pub const RPC_METHOD_NOT_FOUND: i64 = -32601;
