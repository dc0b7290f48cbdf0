mod common;

use common::*;
use evm_trace_studio::output::{read_report, report_to_string, write_report, AnalysisReport};
use evm_trace_studio::parser::TraceSource;
use evm_trace_studio::query::{TransactionAnalysis, STATUS_FAILED};
use evm_trace_studio::utils::config::SCHEMA_VERSION;
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

fn failed_analysis() -> TransactionAnalysis {
    let registry = registry();
    TransactionAnalysis::build(
        &router_header(),
        &TraceSource::Available(revert_chain_trace()),
        &registry.snapshot(),
    )
}

#[test]
fn test_report_from_failed_analysis() {
    let report = AnalysisReport::from_analysis(&failed_analysis(), 2);

    assert_eq!(report.version, SCHEMA_VERSION);
    assert_eq!(report.status, STATUS_FAILED);
    assert!(report.trace_available);
    assert_eq!(report.revert_msg.as_deref(), Some("Insufficient balance"));
    assert!(report.error.unwrap().contains("line 5, in Token.withdraw"));
    assert!(report.call_trace.unwrap().starts_with("Router.fallback [CALL]"));
    assert!(chrono::DateTime::parse_from_rfc3339(&report.generated_at).is_ok());

    let labels: Vec<&str> = report.gas_profile.iter().map(|g| g.label.as_str()).collect();
    assert_eq!(labels, vec!["Router.fallback", "Vault.fallback", "Token.withdraw"]);
}

#[test]
fn test_write_and_read_report() {
    let report = AnalysisReport::from_analysis(&failed_analysis(), 3);
    let temp_file = NamedTempFile::new().unwrap();

    write_report(&report, temp_file.path()).unwrap();
    let loaded = read_report(temp_file.path()).unwrap();

    assert_eq!(loaded.transaction_hash, report.transaction_hash);
    assert_eq!(loaded.call_trace, report.call_trace);
    assert_eq!(loaded.events, report.events);
    assert_eq!(loaded.revert_msg, report.revert_msg);
    assert_eq!(loaded.error, report.error);
    assert_eq!(loaded.generated_at, report.generated_at);

    let totals = |r: &AnalysisReport| -> Vec<(String, u64)> {
        r.gas_profile.iter().map(|g| (g.label.clone(), g.total_gas)).collect()
    };
    assert_eq!(totals(&loaded), totals(&report));
}

#[test]
fn test_report_json_shape() {
    let report = AnalysisReport::from_analysis(&failed_analysis(), 3);
    let json: serde_json::Value = serde_json::from_str(&report_to_string(&report).unwrap()).unwrap();

    assert_eq!(json["status"], 0);
    assert!(json.get("return_value").is_none());
    assert!(json.get("unavailable_reason").is_none());
    assert_eq!(json["gas_profile"][0]["calls"], 1);
}

#[test]
fn test_read_report_rejects_garbage() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(temp_file.path(), "{ not json").unwrap();
    assert!(read_report(temp_file.path()).is_err());
}
