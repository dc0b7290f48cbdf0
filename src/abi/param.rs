//! ABI type descriptors.
//!
//! Parses Solidity type strings (`uint256`, `bytes32[]`, `(address,uint8)[2]`)
//! into a recursive `ParamType` and answers the layout questions the codec
//! needs: is the type dynamic, and how many head bytes does it occupy.

use crate::utils::error::AbiError;
use std::fmt;

/// Named member of a tuple type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Component {
    pub name: Option<String>,
    pub kind: ParamType,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    Address,
    Bool,
    /// Unsigned integer of the given bit width
    Uint(usize),
    /// Signed integer of the given bit width
    Int(usize),
    /// `bytesN`, N in 1..=32
    FixedBytes(usize),
    /// External function reference: 20-byte address followed by a 4-byte selector
    Function,
    Bytes,
    String,
    Array(Box<ParamType>),
    FixedArray(Box<ParamType>, usize),
    Tuple(Vec<Component>),
}

impl ParamType {
    /// Parse a canonical or shorthand type string
    pub fn parse(type_str: &str) -> Result<Self, AbiError> {
        let s = type_str.trim();
        let invalid = || AbiError::InvalidType(type_str.to_string());

        if let Some(stripped) = s.strip_suffix(']') {
            let open = stripped.rfind('[').ok_or_else(invalid)?;
            let inner = ParamType::parse(&stripped[..open])?;
            let size = &stripped[open + 1..];
            return if size.is_empty() {
                Ok(ParamType::Array(Box::new(inner)))
            } else {
                let n = size.parse::<usize>().map_err(|_| invalid())?;
                Ok(ParamType::FixedArray(Box::new(inner), n))
            };
        }

        if let Some(body) = s.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) {
            let components = split_top_level(body)
                .into_iter()
                .map(|part| {
                    Ok(Component {
                        name: None,
                        kind: ParamType::parse(part)?,
                    })
                })
                .collect::<Result<Vec<_>, AbiError>>()?;
            return Ok(ParamType::Tuple(components));
        }

        match s {
            "address" => Ok(ParamType::Address),
            "bool" => Ok(ParamType::Bool),
            "string" => Ok(ParamType::String),
            "bytes" => Ok(ParamType::Bytes),
            "uint" => Ok(ParamType::Uint(256)),
            "int" => Ok(ParamType::Int(256)),
            "function" => Ok(ParamType::Function),
            "tuple" => Err(AbiError::MissingComponents(type_str.to_string())),
            _ => {
                if let Some(bits) = s.strip_prefix("uint") {
                    parse_bits(bits).map(ParamType::Uint).ok_or_else(invalid)
                } else if let Some(bits) = s.strip_prefix("int") {
                    parse_bits(bits).map(ParamType::Int).ok_or_else(invalid)
                } else if let Some(size) = s.strip_prefix("bytes") {
                    match size.parse::<usize>() {
                        Ok(n) if (1..=32).contains(&n) => Ok(ParamType::FixedBytes(n)),
                        _ => Err(invalid()),
                    }
                } else {
                    Err(invalid())
                }
            }
        }
    }

    /// Wrap `self` in the array dimensions of a suffix like `[][3]`
    pub fn with_array_suffix(self, suffix: &str) -> Result<Self, AbiError> {
        let mut kind = self;
        let mut rest = suffix.trim();
        while let Some(after_open) = rest.strip_prefix('[') {
            let close = after_open
                .find(']')
                .ok_or_else(|| AbiError::InvalidType(suffix.to_string()))?;
            let size = &after_open[..close];
            kind = if size.is_empty() {
                ParamType::Array(Box::new(kind))
            } else {
                let n = size
                    .parse::<usize>()
                    .map_err(|_| AbiError::InvalidType(suffix.to_string()))?;
                ParamType::FixedArray(Box::new(kind), n)
            };
            rest = &after_open[close + 1..];
        }
        if rest.is_empty() {
            Ok(kind)
        } else {
            Err(AbiError::InvalidType(suffix.to_string()))
        }
    }

    /// Canonical type string, as used in signatures
    pub fn canonical(&self) -> String {
        match self {
            ParamType::Address => "address".to_string(),
            ParamType::Bool => "bool".to_string(),
            ParamType::Uint(bits) => format!("uint{}", bits),
            ParamType::Int(bits) => format!("int{}", bits),
            ParamType::FixedBytes(n) => format!("bytes{}", n),
            ParamType::Function => "function".to_string(),
            ParamType::Bytes => "bytes".to_string(),
            ParamType::String => "string".to_string(),
            ParamType::Array(inner) => format!("{}[]", inner.canonical()),
            ParamType::FixedArray(inner, n) => format!("{}[{}]", inner.canonical(), n),
            ParamType::Tuple(components) => {
                let inner: Vec<String> = components.iter().map(|c| c.kind.canonical()).collect();
                format!("({})", inner.join(","))
            }
        }
    }

    /// Whether the encoding lives in the tail behind an offset
    pub fn is_dynamic(&self) -> bool {
        match self {
            ParamType::Bytes | ParamType::String | ParamType::Array(_) => true,
            ParamType::FixedArray(inner, _) => inner.is_dynamic(),
            ParamType::Tuple(components) => components.iter().any(|c| c.kind.is_dynamic()),
            _ => false,
        }
    }

    /// Bytes this type occupies in the head of an enclosing sequence
    pub fn head_size(&self) -> usize {
        if self.is_dynamic() {
            return 32;
        }
        match self {
            ParamType::FixedArray(inner, n) => inner.head_size().saturating_mul(*n),
            ParamType::Tuple(components) => components
                .iter()
                .fold(0usize, |size, c| size.saturating_add(c.kind.head_size())),
            _ => 32,
        }
    }

    /// Elementary value types; anything else is hashed when indexed in an event
    pub fn is_value_type(&self) -> bool {
        matches!(
            self,
            ParamType::Address
                | ParamType::Bool
                | ParamType::Uint(_)
                | ParamType::Int(_)
                | ParamType::FixedBytes(_)
                | ParamType::Function
        )
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

fn parse_bits(bits: &str) -> Option<usize> {
    let bits = bits.parse::<usize>().ok()?;
    (bits > 0 && bits <= 256 && bits % 8 == 0).then_some(bits)
}

/// Split a tuple body on commas that are not nested in parentheses
fn split_top_level(body: &str) -> Vec<&str> {
    if body.trim().is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_elementary() {
        assert_eq!(ParamType::parse("uint").unwrap(), ParamType::Uint(256));
        assert_eq!(ParamType::parse("int8").unwrap(), ParamType::Int(8));
        assert_eq!(ParamType::parse("bytes32").unwrap(), ParamType::FixedBytes(32));
        assert_eq!(ParamType::parse("function").unwrap(), ParamType::Function);
        assert_eq!(ParamType::Function.canonical(), "function");
        assert!(ParamType::parse("uint7").is_err());
        assert!(ParamType::parse("bytes33").is_err());
        assert!(ParamType::parse("tuple").is_err());
    }

    #[test]
    fn test_parse_nested_arrays() {
        let t = ParamType::parse("uint256[2][]").unwrap();
        assert_eq!(
            t,
            ParamType::Array(Box::new(ParamType::FixedArray(
                Box::new(ParamType::Uint(256)),
                2
            )))
        );
        assert_eq!(t.canonical(), "uint256[2][]");
    }

    #[test]
    fn test_parse_tuple() {
        let t = ParamType::parse("(address,(uint8,string)[])").unwrap();
        assert_eq!(t.canonical(), "(address,(uint8,string)[])");
        assert!(t.is_dynamic());
    }

    #[test]
    fn test_array_suffix() {
        let base = ParamType::Tuple(vec![Component {
            name: Some("a".into()),
            kind: ParamType::Bool,
        }]);
        let t = base.with_array_suffix("[3][]").unwrap();
        assert_eq!(t.canonical(), "(bool)[3][]");
        assert!(ParamType::Bool.with_array_suffix("[x]").is_err());
    }

    #[test]
    fn test_head_size() {
        assert_eq!(ParamType::parse("uint256[3]").unwrap().head_size(), 96);
        assert_eq!(ParamType::parse("(uint8,bool)").unwrap().head_size(), 64);
        assert_eq!(ParamType::parse("string[3]").unwrap().head_size(), 32);
        assert_eq!(
            ParamType::parse("uint256[576460752303423488]").unwrap().head_size(),
            usize::MAX
        );
    }
}
