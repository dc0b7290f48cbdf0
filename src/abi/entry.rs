//! Contract ABI entries and JSON ABI loading.
//!
//! JSON ABI files are read with `alloy_json_abi`, which also supplies the
//! canonical signatures, selectors and event topics. Declared parameters are
//! converted into `ParamType` trees for the head/tail codec.

use super::param::{Component, ParamType};
use crate::utils::error::AbiError;
use alloy_json_abi as json;
use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Function,
    Event,
    Error,
    Constructor,
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiParam {
    pub name: String,
    pub kind: ParamType,
    /// Only meaningful for event parameters
    pub indexed: bool,
}

impl AbiParam {
    pub fn new(name: impl Into<String>, kind: ParamType) -> Self {
        Self {
            name: name.into(),
            kind,
            indexed: false,
        }
    }

    pub fn indexed(name: impl Into<String>, kind: ParamType) -> Self {
        Self {
            name: name.into(),
            kind,
            indexed: true,
        }
    }

    fn from_json(param: &json::Param) -> Result<Self, AbiError> {
        Ok(Self::new(
            param.name.clone(),
            convert_type(&param.ty, &param.components)?,
        ))
    }

    fn from_json_event(param: &json::EventParam) -> Result<Self, AbiError> {
        Ok(Self {
            name: param.name.clone(),
            kind: convert_type(&param.ty, &param.components)?,
            indexed: param.indexed,
        })
    }

    fn to_json(&self) -> json::Param {
        json_param(&self.name, &self.kind)
    }

    fn to_json_event(&self) -> json::EventParam {
        let param = self.to_json();
        json::EventParam {
            ty: param.ty,
            name: param.name,
            indexed: self.indexed,
            components: param.components,
            internal_type: None,
        }
    }
}

/// A function, event, error or constructor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiEntry {
    pub kind: EntryKind,
    pub name: String,
    pub inputs: Vec<AbiParam>,
    pub outputs: Vec<AbiParam>,
    pub anonymous: bool,
    /// Canonical signature, e.g. `transfer(address,uint256)`
    pub signature: String,
    /// First four bytes of the signature hash
    pub selector: [u8; 4],
    /// Event topic0; zero for the other kinds
    pub topic: B256,
}

impl AbiEntry {
    pub fn function(name: impl Into<String>, inputs: Vec<AbiParam>, outputs: Vec<AbiParam>) -> Self {
        let item = json::Function {
            name: name.into(),
            inputs: inputs.iter().map(AbiParam::to_json).collect(),
            outputs: outputs.iter().map(AbiParam::to_json).collect(),
            state_mutability: json::StateMutability::NonPayable,
        };
        Self::from_function(&item, inputs, outputs)
    }

    pub fn event(name: impl Into<String>, inputs: Vec<AbiParam>) -> Self {
        let item = json::Event {
            name: name.into(),
            inputs: inputs.iter().map(AbiParam::to_json_event).collect(),
            anonymous: false,
        };
        Self::from_event(&item, inputs)
    }

    pub fn error(name: impl Into<String>, inputs: Vec<AbiParam>) -> Self {
        let item = json::Error {
            name: name.into(),
            inputs: inputs.iter().map(AbiParam::to_json).collect(),
        };
        Self::from_error(&item, inputs)
    }

    /// Constructors have no selector; only their inputs matter
    pub fn constructor(inputs: Vec<AbiParam>) -> Self {
        let types: Vec<String> = inputs.iter().map(|p| p.kind.canonical()).collect();
        Self {
            kind: EntryKind::Constructor,
            name: "constructor".to_string(),
            signature: format!("constructor({})", types.join(",")),
            inputs,
            outputs: Vec::new(),
            anonymous: false,
            selector: [0u8; 4],
            topic: B256::ZERO,
        }
    }

    fn from_function(item: &json::Function, inputs: Vec<AbiParam>, outputs: Vec<AbiParam>) -> Self {
        Self {
            kind: EntryKind::Function,
            name: item.name.clone(),
            inputs,
            outputs,
            anonymous: false,
            signature: item.signature(),
            selector: item.selector().0,
            topic: B256::ZERO,
        }
    }

    fn from_event(item: &json::Event, inputs: Vec<AbiParam>) -> Self {
        let topic = item.selector();
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&topic[..4]);
        Self {
            kind: EntryKind::Event,
            name: item.name.clone(),
            inputs,
            outputs: Vec::new(),
            anonymous: item.anonymous,
            signature: item.signature(),
            selector,
            topic,
        }
    }

    fn from_error(item: &json::Error, inputs: Vec<AbiParam>) -> Self {
        Self {
            kind: EntryKind::Error,
            name: item.name.clone(),
            inputs,
            outputs: Vec::new(),
            anonymous: false,
            signature: item.signature(),
            selector: item.selector().0,
            topic: B256::ZERO,
        }
    }

    pub fn is_event(&self) -> bool {
        self.kind == EntryKind::Event
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn input_types(&self) -> Vec<ParamType> {
        self.inputs.iter().map(|p| p.kind.clone()).collect()
    }

    pub fn output_types(&self) -> Vec<ParamType> {
        self.outputs.iter().map(|p| p.kind.clone()).collect()
    }
}

/// A contract's full interface with selector and topic lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractAbi {
    pub functions: Vec<AbiEntry>,
    pub events: Vec<AbiEntry>,
    pub errors: Vec<AbiEntry>,
    pub constructor: Option<AbiEntry>,
    pub has_fallback: bool,
    pub has_receive: bool,
}

impl ContractAbi {
    /// Parse a standard JSON ABI (array of entries)
    ///
    /// # Errors
    /// * `AbiError::InvalidJson` - Not a JSON ABI
    /// * `AbiError::InvalidType` / `AbiError::MissingComponents` - A
    ///   parameter type the codec cannot represent
    pub fn from_json(value: &serde_json::Value) -> Result<Self, AbiError> {
        let abi = json::JsonAbi::deserialize(value)
            .map_err(|e| AbiError::InvalidJson(e.to_string()))?;
        Self::from_json_abi(&abi)
    }

    pub fn from_json_str(json: &str) -> Result<Self, AbiError> {
        let abi: json::JsonAbi =
            serde_json::from_str(json).map_err(|e| AbiError::InvalidJson(e.to_string()))?;
        Self::from_json_abi(&abi)
    }

    /// Convert a parsed `JsonAbi` into codec entries
    pub fn from_json_abi(abi: &json::JsonAbi) -> Result<Self, AbiError> {
        let functions = abi
            .functions()
            .map(|f| {
                let inputs = convert_params(&f.inputs)?;
                let outputs = convert_params(&f.outputs)?;
                Ok(AbiEntry::from_function(f, inputs, outputs))
            })
            .collect::<Result<Vec<_>, AbiError>>()?;

        let events = abi
            .events()
            .map(|e| {
                let inputs = e
                    .inputs
                    .iter()
                    .map(AbiParam::from_json_event)
                    .collect::<Result<Vec<_>, AbiError>>()?;
                Ok(AbiEntry::from_event(e, inputs))
            })
            .collect::<Result<Vec<_>, AbiError>>()?;

        let errors = abi
            .errors()
            .map(|e| Ok(AbiEntry::from_error(e, convert_params(&e.inputs)?)))
            .collect::<Result<Vec<_>, AbiError>>()?;

        let constructor = abi
            .constructor
            .as_ref()
            .map(|c| convert_params(&c.inputs).map(AbiEntry::constructor))
            .transpose()?;

        Ok(Self {
            functions,
            events,
            errors,
            constructor,
            has_fallback: abi.fallback.is_some(),
            has_receive: abi.receive.is_some(),
        })
    }

    pub fn function_by_selector(&self, selector: &[u8]) -> Option<&AbiEntry> {
        self.functions.iter().find(|f| f.selector[..] == *selector)
    }

    pub fn function_by_name(&self, name: &str) -> Option<&AbiEntry> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Non-anonymous event whose topic0 matches
    pub fn event_by_topic(&self, topic: &B256) -> Option<&AbiEntry> {
        self.events.iter().find(|e| !e.anonymous && e.topic == *topic)
    }

    pub fn error_by_selector(&self, selector: &[u8]) -> Option<&AbiEntry> {
        self.errors.iter().find(|e| e.selector[..] == *selector)
    }
}

fn convert_params(params: &[json::Param]) -> Result<Vec<AbiParam>, AbiError> {
    params.iter().map(AbiParam::from_json).collect()
}

/// `tuple`-typed parameters carry their members in `components`
fn convert_type(ty: &str, components: &[json::Param]) -> Result<ParamType, AbiError> {
    let Some(suffix) = ty.strip_prefix("tuple") else {
        return ParamType::parse(ty);
    };
    if components.is_empty() {
        return Err(AbiError::MissingComponents(ty.to_string()));
    }
    let components = components
        .iter()
        .map(|c| {
            Ok(Component {
                name: (!c.name.is_empty()).then(|| c.name.clone()),
                kind: convert_type(&c.ty, &c.components)?,
            })
        })
        .collect::<Result<Vec<_>, AbiError>>()?;
    ParamType::Tuple(components).with_array_suffix(suffix)
}

/// JSON ABI form of a parameter: tuples become `tuple[..]` with components
fn json_param(name: &str, kind: &ParamType) -> json::Param {
    match tuple_base(kind) {
        Some((members, suffix)) => json::Param {
            ty: format!("tuple{}", suffix),
            name: name.to_string(),
            components: members
                .iter()
                .map(|c| json_param(c.name.as_deref().unwrap_or_default(), &c.kind))
                .collect(),
            internal_type: None,
        },
        None => json::Param {
            ty: kind.canonical(),
            name: name.to_string(),
            components: Vec::new(),
            internal_type: None,
        },
    }
}

/// Tuple members and array suffix of a tuple or (nested) tuple array
fn tuple_base(kind: &ParamType) -> Option<(&[Component], String)> {
    match kind {
        ParamType::Tuple(components) => Some((components.as_slice(), String::new())),
        ParamType::Array(inner) => tuple_base(inner).map(|(c, suffix)| (c, suffix + "[]")),
        ParamType::FixedArray(inner, n) => {
            tuple_base(inner).map(|(c, suffix)| (c, format!("{}[{}]", suffix, n)))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ERC20_FRAGMENT: &str = r#"[
        {"type":"function","name":"transfer","stateMutability":"nonpayable",
         "inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],
         "outputs":[{"name":"","type":"bool"}]},
        {"type":"event","name":"Transfer","anonymous":false,
         "inputs":[{"name":"from","type":"address","indexed":true},
                   {"name":"to","type":"address","indexed":true},
                   {"name":"value","type":"uint256","indexed":false}]},
        {"type":"error","name":"InsufficientBalance",
         "inputs":[{"name":"available","type":"uint256"},{"name":"required","type":"uint256"}]},
        {"type":"constructor","stateMutability":"nonpayable",
         "inputs":[{"name":"supply","type":"uint256"}]},
        {"type":"receive","stateMutability":"payable"}
    ]"#;

    #[test]
    fn test_parse_erc20_fragment() {
        let abi = ContractAbi::from_json_str(ERC20_FRAGMENT).unwrap();
        let transfer = abi.function_by_name("transfer").unwrap();
        assert_eq!(transfer.signature(), "transfer(address,uint256)");
        assert_eq!(transfer.selector, [0xa9, 0x05, 0x9c, 0xbb]);
        assert!(abi.function_by_selector(&[0xa9, 0x05, 0x9c, 0xbb]).is_some());

        let event = &abi.events[0];
        assert!(event.is_event());
        assert_eq!(
            format!("{:x}", event.topic),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
        assert!(abi.event_by_topic(&event.topic).is_some());

        assert_eq!(abi.errors[0].signature(), "InsufficientBalance(uint256,uint256)");
        assert!(abi.constructor.is_some());
        assert!(abi.has_receive);
        assert!(!abi.has_fallback);
    }

    #[test]
    fn test_tuple_components() {
        let json = r#"[{"type":"function","name":"submit","stateMutability":"nonpayable","inputs":[
            {"name":"orders","type":"tuple[]","components":[
                {"name":"maker","type":"address"},{"name":"amount","type":"uint128"}]}],
            "outputs":[]}]"#;
        let abi = ContractAbi::from_json_str(json).unwrap();
        let submit = &abi.functions[0];
        assert_eq!(submit.signature(), "submit((address,uint128)[])");
        match &submit.inputs[0].kind {
            ParamType::Array(inner) => match inner.as_ref() {
                ParamType::Tuple(components) => {
                    assert_eq!(components[0].name.as_deref(), Some("maker"));
                }
                other => panic!("expected tuple, got {:?}", other),
            },
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_components() {
        let json = r#"[{"type":"function","name":"f","stateMutability":"nonpayable",
            "inputs":[{"name":"t","type":"tuple"}],"outputs":[]}]"#;
        assert!(ContractAbi::from_json_str(json).is_err());
    }

    #[test]
    fn test_function_typed_parameter_signature() {
        let entry = AbiEntry::function(
            "f",
            vec![AbiParam::new("callback", ParamType::Function)],
            Vec::new(),
        );
        assert_eq!(entry.signature(), "f(function)");

        let json = r#"[{"type":"function","name":"f","stateMutability":"nonpayable",
            "inputs":[{"name":"callback","type":"function"}],"outputs":[]}]"#;
        let abi = ContractAbi::from_json_str(json).unwrap();
        assert_eq!(abi.functions[0].inputs[0].kind, ParamType::Function);
        assert_eq!(abi.functions[0].selector, entry.selector);
    }

    #[test]
    fn test_built_entry_matches_loaded_entry() {
        let order = ParamType::parse("(address,uint128)[2]").unwrap();
        let built = AbiEntry::event(
            "Filled",
            vec![
                AbiParam::indexed("maker", ParamType::Address),
                AbiParam::new("orders", order),
            ],
        );
        assert_eq!(built.signature(), "Filled(address,(address,uint128)[2])");

        let json = r#"[{"type":"event","name":"Filled","anonymous":false,"inputs":[
            {"name":"maker","type":"address","indexed":true},
            {"name":"orders","type":"tuple[2]","indexed":false,"components":[
                {"name":"","type":"address"},{"name":"","type":"uint128"}]}]}]"#;
        let loaded = ContractAbi::from_json_str(json).unwrap();
        assert_eq!(loaded.events[0], built);
    }
}
