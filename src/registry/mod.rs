//! Contract registry: address → name, ABI and source map.
//!
//! Registration happens up front (or between analyses). Every build works
//! against a `RegistrySnapshot`, an immutable copy of the map taken under a
//! short read lock, so concurrent builds never observe a half-registered
//! contract.

pub mod artifact;

pub use artifact::{load_registry, ContractArtifact};

use crate::abi::{AbiEntry, ContractAbi};
use crate::aggregator::CallFrame;
use crate::parser::opcode::CallType;
use crate::parser::source_map::{line_column, SourceLocation, SourceMap};
use alloy_primitives::{Address, B256};
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

/// Everything known about one deployed contract
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractInfo {
    pub name: String,
    pub abi: ContractAbi,
    /// Runtime source map, absent for unverified code
    pub source_map: Option<SourceMap>,
    /// Source map of the creation bytecode (constructor execution)
    pub creation_source_map: Option<SourceMap>,
    /// Source text keyed by the paths in the source map's file list
    pub sources: HashMap<String, String>,
    /// Creation bytecode, used to split constructor arguments off init code
    pub creation_code: Option<Vec<u8>>,
}

impl ContractInfo {
    pub fn new(name: impl Into<String>, abi: ContractAbi) -> Self {
        Self {
            name: name.into(),
            abi,
            ..Default::default()
        }
    }

    pub fn with_source_map(mut self, source_map: SourceMap) -> Self {
        self.source_map = Some(source_map);
        self
    }

    pub fn with_creation_source_map(mut self, source_map: SourceMap) -> Self {
        self.creation_source_map = Some(source_map);
        self
    }

    pub fn with_source(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.sources.insert(path.into(), text.into());
        self
    }

    pub fn source_text(&self, file: &str) -> Option<&str> {
        self.sources.get(file).map(String::as_str)
    }

    /// Resolve a program counter of the runtime code, adding line/column
    /// when the source is known
    pub fn locate(&self, pc: usize) -> Option<SourceLocation> {
        self.locate_with(self.source_map.as_ref()?, pc)
    }

    /// Resolve a program counter of a frame running this contract's code
    ///
    /// CREATE and CREATE2 frames execute creation code, whose offsets only
    /// the creation source map describes.
    pub fn locate_in(&self, call_type: CallType, pc: usize) -> Option<SourceLocation> {
        if call_type.is_create() {
            self.locate_with(self.creation_source_map.as_ref()?, pc)
        } else {
            self.locate(pc)
        }
    }

    fn locate_with(&self, source_map: &SourceMap, pc: usize) -> Option<SourceLocation> {
        let mut location = source_map.resolve(pc)?;
        if let Some(text) = self.source_text(&location.file) {
            let (line, column) = line_column(text, location.offset);
            location.line = Some(line);
            location.column = Some(column);
        }
        Some(location)
    }
}

/// Shared, concurrently readable contract registry
#[derive(Debug, Default)]
pub struct ContractRegistry {
    contracts: RwLock<HashMap<Address, Arc<ContractInfo>>>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the contract at `address`
    pub fn register(&self, address: Address, info: ContractInfo) -> Option<Arc<ContractInfo>> {
        debug!("Registering {} at {}", info.name, address);
        self.contracts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address, Arc::new(info))
    }

    pub fn unregister(&self, address: &Address) -> Option<Arc<ContractInfo>> {
        self.contracts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(address)
    }

    pub fn len(&self) -> usize {
        self.contracts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Immutable view for one build
    pub fn snapshot(&self) -> RegistrySnapshot {
        let guard = self.contracts.read().unwrap_or_else(PoisonError::into_inner);
        RegistrySnapshot {
            contracts: Arc::new(
                guard
                    .iter()
                    .map(|(address, info)| (*address, Arc::clone(info)))
                    .collect(),
            ),
        }
    }
}

/// Read-only registry state as of one point in time
///
/// Cloning is cheap; lookups never block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    contracts: Arc<BTreeMap<Address, Arc<ContractInfo>>>,
}

impl RegistrySnapshot {
    pub fn resolve(&self, address: &Address) -> Option<&Arc<ContractInfo>> {
        self.contracts.get(address)
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Contract whose code a frame runs
    ///
    /// A constructor whose deployed address is not registered is matched by
    /// its creation bytecode instead.
    pub fn contract_of(&self, frame: &CallFrame) -> Option<&ContractInfo> {
        frame
            .callee_address
            .and_then(|address| self.resolve(&address))
            .map(Arc::as_ref)
            .or_else(|| {
                frame
                    .call_type
                    .is_create()
                    .then(|| self.find_by_creation_code(&frame.input_data))
                    .flatten()
            })
    }

    /// First registered event with this topic0, in address order
    pub fn find_event(&self, topic: &B256) -> Option<(&ContractInfo, &AbiEntry)> {
        self.contracts
            .values()
            .find_map(|info| info.abi.event_by_topic(topic).map(|e| (info.as_ref(), e)))
    }

    /// Contract whose creation bytecode prefixes the given init code
    pub fn find_by_creation_code(&self, init_code: &[u8]) -> Option<&ContractInfo> {
        self.contracts.values().map(Arc::as_ref).find(|info| {
            info.creation_code
                .as_deref()
                .is_some_and(|code| !code.is_empty() && init_code.starts_with(code))
        })
    }

    /// First registered custom error with this selector, in address order
    pub fn find_error(&self, selector: &[u8]) -> Option<(&ContractInfo, &AbiEntry)> {
        self.contracts
            .values()
            .find_map(|info| info.abi.error_by_selector(selector).map(|e| (info.as_ref(), e)))
    }
}

impl FromIterator<(Address, ContractInfo)> for RegistrySnapshot {
    fn from_iter<I: IntoIterator<Item = (Address, ContractInfo)>>(iter: I) -> Self {
        Self {
            contracts: Arc::new(
                iter.into_iter()
                    .map(|(address, info)| (address, Arc::new(info)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{AbiParam, ParamType};
    use alloy_primitives::address;

    fn token() -> ContractInfo {
        let mut abi = ContractAbi::default();
        abi.events.push(AbiEntry::event(
            "Approval",
            vec![AbiParam::indexed("owner", ParamType::Address)],
        ));
        ContractInfo::new("Token", abi)
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_registration() {
        let registry = ContractRegistry::new();
        let a = address!("00000000000000000000000000000000000000aa");
        registry.register(a, token());

        let snapshot = registry.snapshot();
        registry.unregister(&a);

        assert!(registry.is_empty());
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.resolve(&a).unwrap().name, "Token");
    }

    #[test]
    fn test_find_event_across_contracts() {
        let a = address!("00000000000000000000000000000000000000aa");
        let snapshot: RegistrySnapshot = vec![(a, token())].into_iter().collect();
        let topic = snapshot.resolve(&a).unwrap().abi.events[0].topic;
        let (info, event) = snapshot.find_event(&topic).unwrap();
        assert_eq!(info.name, "Token");
        assert_eq!(event.name, "Approval");
        assert!(snapshot.find_event(&B256::ZERO).is_none());
    }

    #[test]
    fn test_locate_adds_line_and_column() {
        // PUSH1 0x01 STOP
        let map = SourceMap::from_compressed("0:3:0;4:5:0", &[0x60, 0x01, 0x00], vec!["A.sol".into()])
            .unwrap();
        let info = token()
            .with_source_map(map)
            .with_source("A.sol", "abc\ndefgh\n");
        let location = info.locate(2).unwrap();
        assert_eq!(location.line, Some(2));
        assert_eq!(location.column, Some(1));
        assert!(ContractInfo::default().locate(0).is_none());
    }

    #[test]
    fn test_constructor_frames_use_creation_map() {
        let code = [0x60, 0x01, 0x00];
        let files = vec!["A.sol".to_string()];
        let runtime = SourceMap::from_compressed("0:3:0;4:5:0", &code, files.clone()).unwrap();
        let creation = SourceMap::from_compressed("0:3:0;0:3:0", &code, files).unwrap();
        let info = token()
            .with_source_map(runtime)
            .with_source("A.sol", "abc\ndefgh\n");

        // no creation map: constructor code stays unresolved
        assert!(info.locate_in(CallType::Create, 2).is_none());
        assert_eq!(info.locate_in(CallType::Call, 2).unwrap().line, Some(2));

        let info = info.with_creation_source_map(creation);
        assert_eq!(info.locate_in(CallType::Create2, 2).unwrap().line, Some(1));
        assert_eq!(info.locate_in(CallType::DelegateCall, 2).unwrap().line, Some(2));
    }
}
