//! EVM Trace Studio CLI
//!
//! Reconstructs the call tree of an EVM transaction from its struct-logger
//! trace and explains what happened: decoded calls, events and reverts.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use evm_trace_studio::commands::{
    display_schema, display_version, execute_analyze, validate_args, validate_report_file,
    AnalyzeArgs,
};
use evm_trace_studio::utils::config::DEFAULT_ERROR_PAD;

/// EVM Trace Studio - transaction trace analysis
#[derive(Parser, Debug)]
#[command(name = "evm-trace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a transaction
    Analyze {
        /// RPC endpoint URL
        #[arg(short, long, env = "EVM_TRACE_RPC", default_value = "http://localhost:8545")]
        rpc: String,

        /// Transaction hash to analyze
        #[arg(short, long)]
        tx: String,

        /// Contract registry JSON (address -> compiler artifact)
        #[arg(short, long)]
        contracts: Option<PathBuf>,

        /// Output path for the JSON report (optional)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Lines of source context around the failing statement
        #[arg(long, default_value_t = DEFAULT_ERROR_PAD)]
        pad: usize,

        /// Print every execution step with its source location
        #[arg(long)]
        steps: bool,
    },

    /// Validate a report JSON file
    Validate {
        /// Path to report JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display report schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Analyze {
            rpc,
            tx,
            contracts,
            output,
            pad,
            steps,
        } => {
            let args = AnalyzeArgs {
                rpc_url: rpc,
                transaction_hash: tx,
                contracts,
                output,
                pad,
                print_steps: steps,
            };

            validate_args(&args)?;
            execute_analyze(args)?;
        }

        Commands::Validate { file } => {
            validate_report_file(&file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
