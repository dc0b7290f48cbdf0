mod common;

use common::*;
use evm_trace_studio::parser::TraceSource;
use evm_trace_studio::query::TransactionAnalysis;
use evm_trace_studio::registry::load_registry;
use evm_trace_studio::utils::ArtifactError;
use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;

fn registry_file(contracts: serde_json::Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", json!({ "contracts": contracts })).unwrap();
    file
}

fn token_artifact() -> serde_json::Value {
    let offset = TOKEN_SOURCE.find("require").unwrap();
    let length = TOKEN_SOURCE[offset..].find(';').unwrap();
    json!({
        "contractName": "Token",
        "abi": serde_json::from_str::<serde_json::Value>(TOKEN_ABI).unwrap(),
        "deployedBytecode": TOKEN_RUNTIME,
        "deployedSourceMap": format!("0:{}:0;;;{}:{}:0", TOKEN_SOURCE.len(), offset, length),
        "sourceList": [TOKEN_SOURCE_PATH],
        "sources": { TOKEN_SOURCE_PATH: TOKEN_SOURCE }
    })
}

#[test]
fn test_loaded_artifacts_drive_the_analysis() {
    let file = registry_file(json!({
        "0x00000000000000000000000000000000000000aa": {
            "contractName": "Router", "abi": [{"type": "fallback", "stateMutability": "nonpayable"}]
        },
        "0x00000000000000000000000000000000000000bb": {
            "contractName": "Vault", "abi": [{"type": "fallback", "stateMutability": "nonpayable"}]
        },
        "0x00000000000000000000000000000000000000cc": token_artifact()
    }));
    let registry = load_registry(file.path()).unwrap();
    assert_eq!(registry.len(), 3);

    let analysis = TransactionAnalysis::build(
        &router_header(),
        &TraceSource::Available(revert_chain_trace()),
        &registry.snapshot(),
    );

    // same result as the hand-built registry
    let expected = TransactionAnalysis::build(
        &router_header(),
        &TraceSource::Available(revert_chain_trace()),
        &common::registry().snapshot(),
    );
    assert_eq!(analysis.call_trace(), expected.call_trace());
    assert_eq!(analysis.error(2), expected.error(2));
    assert!(analysis.error(2).unwrap().contains("> 5 |"));
}

#[test]
fn test_bad_address_key_rejected() {
    let file = registry_file(json!({ "0x1234": token_artifact() }));
    assert!(matches!(
        load_registry(file.path()),
        Err(ArtifactError::InvalidAddress(key)) if key == "0x1234"
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    assert!(matches!(
        load_registry("/nonexistent/contracts.json"),
        Err(ArtifactError::Io(_))
    ));
}
