//! Analyze command implementation.
//!
//! The analyze command:
//! 1. Loads the contract registry
//! 2. Fetches the transaction and its trace from RPC
//! 3. Builds the analysis
//! 4. Prints status, call trace, events and failure details
//! 5. Writes the JSON report (optional)

use crate::output::{write_report, AnalysisReport};
use crate::query::{TransactionAnalysis, STATUS_FAILED, STATUS_SUCCESS};
use crate::registry::{load_registry, ContractRegistry};
use crate::rpc::RpcClient;
use crate::utils::config::DEFAULT_ERROR_PAD;
use anyhow::{bail, Context, Result};
use log::{debug, info};
use std::path::PathBuf;
use std::time::Instant;

/// Arguments for the analyze command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    /// RPC endpoint URL
    pub rpc_url: String,

    /// Transaction hash to analyze
    pub transaction_hash: String,

    /// Contract registry file (address -> compiler artifact)
    pub contracts: Option<PathBuf>,

    /// Output path for the JSON report (optional)
    pub output: Option<PathBuf>,

    /// Lines of context around the source excerpt
    pub pad: usize,

    /// Print every step with its frame and source location
    pub print_steps: bool,
}

impl Default for AnalyzeArgs {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            transaction_hash: String::new(),
            contracts: None,
            output: None,
            pad: DEFAULT_ERROR_PAD,
            print_steps: false,
        }
    }
}

/// Execute the analyze command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Registry file failures
/// * RPC connection failures
/// * File write errors
///
/// A reverted transaction is not an error; neither is a node that
/// cannot trace.
pub fn execute_analyze(args: AnalyzeArgs) -> Result<()> {
    let start_time = Instant::now();

    info!("Starting analysis for transaction: {}", args.transaction_hash);
    info!("RPC endpoint: {}", args.rpc_url);

    info!("Step 1/4: Loading contract registry...");
    let registry = match &args.contracts {
        Some(path) => load_registry(path)
            .with_context(|| format!("Failed to load contracts from {}", path.display()))?,
        None => ContractRegistry::new(),
    };
    debug!("Registry holds {} contract(s)", registry.len());

    info!("Step 2/4: Fetching transaction and trace...");
    let client = RpcClient::new(&args.rpc_url).context("Failed to create RPC client")?;
    let header = client
        .get_transaction(&args.transaction_hash)
        .context("Failed to fetch transaction")?;
    let source = client
        .debug_trace_transaction(&args.transaction_hash)
        .context("Failed to fetch trace from RPC")?;

    info!("Step 3/4: Building analysis...");
    let analysis = TransactionAnalysis::build(&header, &source, &registry.snapshot());

    print_analysis(&analysis, &args);

    if let Some(output) = &args.output {
        info!("Step 4/4: Writing report...");
        let report = AnalysisReport::from_analysis(&analysis, args.pad);
        write_report(&report, output).context("Failed to write JSON report")?;
        println!("\nReport: {}", output.display());
    }

    info!("Analysis complete in {:.2}s", start_time.elapsed().as_secs_f64());

    Ok(())
}

/// Validate analyze arguments before execution
///
/// **Public** - called by main.rs before execute_analyze
pub fn validate_args(args: &AnalyzeArgs) -> Result<()> {
    let hash = args
        .transaction_hash
        .strip_prefix("0x")
        .unwrap_or(&args.transaction_hash);
    if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!(
            "Invalid transaction hash '{}': expected 32 bytes of hex",
            args.transaction_hash
        );
    }

    if args.rpc_url.is_empty() {
        bail!("RPC URL cannot be empty");
    }

    if let Some(path) = &args.contracts {
        if !path.is_file() {
            bail!("Contracts file not found: {}", path.display());
        }
    }

    Ok(())
}

/// Print the human-readable analysis
///
/// **Private** - output formatting
fn print_analysis(analysis: &TransactionAnalysis, args: &AnalyzeArgs) {
    let status = match analysis.status() {
        STATUS_SUCCESS => "success",
        STATUS_FAILED => "failed",
        _ => "pending",
    };
    println!("\nTransaction {}: {}", args.transaction_hash, status);

    if let Some(reason) = analysis.unavailable_reason() {
        println!("Trace unavailable: {}", reason);
    }

    if let Some(call_trace) = analysis.call_trace() {
        println!("\nCall trace:");
        print!("{}", call_trace);
    }

    if !analysis.events().is_empty() {
        println!("\nEvents:");
        for event in analysis.events() {
            println!("  {}", event);
        }
    }

    if let Some(message) = analysis.revert_msg() {
        println!("\nRevert: {}", message);
    }
    if let Some(excerpt) = analysis.error(args.pad) {
        println!("\n{}", excerpt);
    }

    if args.print_steps {
        if let Some(steps) = analysis.trace() {
            println!("\nSteps:");
            for annotated in steps {
                let location = annotated
                    .source
                    .as_ref()
                    .map(|s| match s.line {
                        Some(line) => format!(" {}:{}", s.file, line),
                        None => format!(" {}", s.file),
                    })
                    .unwrap_or_default();
                println!(
                    "  {:>6} {:>6} {:<14} {}.{}{}",
                    annotated.step.index,
                    annotated.step.pc,
                    annotated.step.op,
                    annotated.contract.unwrap_or("?"),
                    annotated.function,
                    location
                );
            }
        }
    }

    if !analysis.anomalies().is_empty() {
        println!("\nAnomalies:");
        for anomaly in analysis.anomalies() {
            println!("  {}", anomaly);
        }
    }
}
