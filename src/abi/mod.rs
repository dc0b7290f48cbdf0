//! ABI codec.
//!
//! This module handles:
//! - Parsing Solidity type strings and JSON ABI files
//! - Head/tail encoding of typed values
//! - Decoding call data, return data and event logs

pub mod decode;
pub mod encode;
pub mod entry;
pub mod param;
pub mod value;

// Re-export main types
pub use decode::{decode, decode_event, decode_params, DecodedEvent, EventParam, NamedValue};
pub use encode::{encode, encode_call};
pub use entry::{AbiEntry, AbiParam, ContractAbi, EntryKind};
pub use param::{Component, ParamType};
pub use value::{AbiValue, TupleField};
