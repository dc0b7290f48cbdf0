//! Boundary schema shared with external collaborators.
//!
//! These are the inputs the engine consumes besides the raw trace: the
//! transaction header and, when the transport has one, the receipt.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// Transaction header as submitted to the chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHeader {
    /// Transaction hash, if known
    #[serde(default)]
    pub hash: Option<B256>,

    pub sender: Address,

    /// Receiver, `None` for a contract creation
    #[serde(default)]
    pub receiver: Option<Address>,

    #[serde(default)]
    pub input: Bytes,

    #[serde(default)]
    pub value: U256,

    #[serde(default)]
    pub gas_limit: u64,

    #[serde(default)]
    pub gas_price: U256,

    /// Sender nonce, used to derive the created address
    #[serde(default)]
    pub nonce: Option<u64>,

    #[serde(default)]
    pub receipt: Option<Receipt>,
}

impl TransactionHeader {
    pub fn is_creation(&self) -> bool {
        self.receiver.is_none()
    }

    /// Address of the contract a creation transaction deploys
    ///
    /// Prefers the receipt; falls back to deriving it from sender and nonce.
    pub fn created_address(&self) -> Option<Address> {
        if !self.is_creation() {
            return None;
        }
        self.receipt
            .as_ref()
            .and_then(|r| r.contract_address)
            .or_else(|| self.nonce.map(|nonce| self.sender.create(nonce)))
    }

    /// Address the outermost frame executes
    pub fn target(&self) -> Option<Address> {
        self.receiver.or_else(|| self.created_address())
    }
}

/// Subset of the transaction receipt the engine uses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub status: bool,

    #[serde(default)]
    pub gas_used: u64,

    #[serde(default)]
    pub contract_address: Option<Address>,

    #[serde(default)]
    pub logs: Vec<RawLog>,
}

/// An emitted log before ABI decoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,

    /// Index of the LOGn step that emitted it, when taken from a trace
    #[serde(default)]
    pub step: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_target_for_call() {
        let to = address!("00000000000000000000000000000000000000aa");
        let header = TransactionHeader {
            receiver: Some(to),
            ..Default::default()
        };
        assert!(!header.is_creation());
        assert_eq!(header.target(), Some(to));
        assert_eq!(header.created_address(), None);
    }

    #[test]
    fn test_created_address_prefers_receipt() {
        let deployed = address!("00000000000000000000000000000000000000bb");
        let header = TransactionHeader {
            nonce: Some(0),
            receipt: Some(Receipt {
                status: true,
                contract_address: Some(deployed),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(header.created_address(), Some(deployed));
    }

    #[test]
    fn test_created_address_from_nonce() {
        let sender = address!("b20a608c624ca5003905aa834de7156c68b2e1d0");
        let header = TransactionHeader {
            sender,
            nonce: Some(0),
            ..Default::default()
        };
        assert_eq!(header.created_address(), Some(sender.create(0)));
    }
}
