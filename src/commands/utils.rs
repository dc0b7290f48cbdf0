//! Small commands that do not touch the network.

use crate::output::read_report;
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{Context, Result};
use std::path::Path;

/// Validate a report JSON file
pub fn validate_report_file(file_path: &Path) -> Result<()> {
    println!("Validating report: {}", file_path.display());

    let report = read_report(file_path)
        .with_context(|| format!("Invalid report file {}", file_path.display()))?;

    println!("✓ Valid report JSON");
    println!("  Version: {}", report.version);
    println!("  Transaction: {}", report.transaction_hash);
    println!("  Status: {}", report.status);
    println!("  Trace available: {}", report.trace_available);
    println!("  Events: {}", report.events.len());
    println!("  Profiled functions: {}", report.gas_profile.len());
    println!("  Anomalies: {}", report.anomalies.len());

    Ok(())
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("EVM Trace Studio Report Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  version: string             - Schema version (e.g., '1.0.0')");
        println!("  transaction_hash: string    - Transaction hash");
        println!("  status: number              - 1 success, 0 failed, -1 pending");
        println!("  trace_available: bool       - Whether the node produced a trace");
        println!("  unavailable_reason: string? - Why it did not");
        println!("  call_trace: string?         - Rendered call tree");
        println!("  events: array               - Decoded events in emission order");
        println!("  return_value: string?       - Hex return data of a successful call");
        println!("  revert_msg: string?         - Revert reason of the fault origin");
        println!("  error: string?              - Source excerpt of the fault origin");
        println!("  gas_profile: array          - Gas per Contract.function");
        println!("  anomalies: array            - Data problems met while building");
        println!("  generated_at: string        - ISO 8601 timestamp");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("EVM Trace Studio v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Call-tree reconstruction and ABI decoding for EVM transaction traces.");
}
