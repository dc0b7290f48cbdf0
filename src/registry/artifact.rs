//! Compiler artifact loading.
//!
//! A registry file maps deployed addresses to solc-style artifacts:
//!
//! ```json
//! { "contracts": { "0x…": { "contractName": "Token", "abi": [...],
//!   "bytecode": "0x…", "sourceMap": "…",
//!   "deployedBytecode": "0x…", "deployedSourceMap": "…",
//!   "sourceList": ["contracts/Token.sol"], "sources": { "contracts/Token.sol": "…" } } } }
//! ```

use super::{ContractInfo, ContractRegistry};
use crate::abi::ContractAbi;
use crate::parser::source_map::{parse_bytecode, SourceMap};
use crate::utils::error::ArtifactError;
use alloy_primitives::Address;
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Compiled contract as emitted by the build pipeline
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    pub contract_name: String,

    #[serde(default)]
    pub abi: serde_json::Value,

    /// Creation bytecode
    #[serde(default)]
    pub bytecode: Option<String>,

    /// Source map of the creation bytecode
    #[serde(default)]
    pub source_map: Option<String>,

    /// Runtime bytecode the source map describes
    #[serde(default)]
    pub deployed_bytecode: Option<String>,

    #[serde(default)]
    pub deployed_source_map: Option<String>,

    #[serde(default)]
    pub source_list: Vec<String>,

    /// Source text by path
    #[serde(default)]
    pub sources: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    contracts: BTreeMap<String, ContractArtifact>,
}

impl ContractInfo {
    /// Build registry metadata from a compiler artifact
    ///
    /// **Public** - used by `load_registry` and by callers that compile in-process
    ///
    /// # Errors
    /// * `ArtifactError::Abi` - The ABI JSON is invalid
    /// * `ArtifactError::InvalidBytecode` - Bytecode is not hex
    /// * `ArtifactError::InvalidSourceMap` - The source map cannot be expanded
    pub fn from_artifact(artifact: ContractArtifact) -> Result<Self, ArtifactError> {
        let abi = if artifact.abi.is_null() {
            ContractAbi::default()
        } else {
            ContractAbi::from_json(&artifact.abi)?
        };

        let creation_code = non_empty(artifact.bytecode.as_deref())
            .map(parse_bytecode)
            .transpose()?;
        let runtime_code = non_empty(artifact.deployed_bytecode.as_deref())
            .map(parse_bytecode)
            .transpose()?;

        let source_map = match (non_empty(artifact.deployed_source_map.as_deref()), &runtime_code) {
            (Some(map), Some(code)) => Some(SourceMap::from_compressed(
                map,
                code,
                artifact.source_list.clone(),
            )?),
            (Some(_), None) => {
                warn!(
                    "{}: source map without runtime bytecode, ignoring it",
                    artifact.contract_name
                );
                None
            }
            _ => None,
        };

        let creation_source_map = match (non_empty(artifact.source_map.as_deref()), &creation_code) {
            (Some(map), Some(code)) => Some(SourceMap::from_compressed(
                map,
                code,
                artifact.source_list.clone(),
            )?),
            (Some(_), None) => {
                warn!(
                    "{}: creation source map without bytecode, ignoring it",
                    artifact.contract_name
                );
                None
            }
            _ => None,
        };

        debug!(
            "Loaded artifact {} ({} functions, source map: {})",
            artifact.contract_name,
            abi.functions.len(),
            source_map.is_some()
        );

        Ok(ContractInfo {
            name: artifact.contract_name,
            abi,
            source_map,
            creation_source_map,
            sources: artifact.sources,
            creation_code,
        })
    }
}

/// Load a registry file
///
/// **Public** - used by the analyze command
///
/// # Arguments
/// * `path` - JSON file with a `contracts` object keyed by address
///
/// # Errors
/// * `ArtifactError::Io` / `ArtifactError::Json` - Unreadable file
/// * `ArtifactError::InvalidAddress` - A key is not a 20-byte hex address
/// * Any error from `ContractInfo::from_artifact`
pub fn load_registry(path: impl AsRef<Path>) -> Result<ContractRegistry, ArtifactError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let file: RegistryFile = serde_json::from_str(&content)?;

    let registry = ContractRegistry::new();
    for (key, artifact) in file.contracts {
        let address =
            Address::from_str(&key).map_err(|_| ArtifactError::InvalidAddress(key.clone()))?;
        registry.register(address, ContractInfo::from_artifact(artifact)?);
    }

    info!(
        "Loaded {} contracts from {}",
        registry.len(),
        path.display()
    );
    Ok(registry)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty() && s.trim() != "0x")
}
