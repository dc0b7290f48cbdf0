//! Closed classification of EVM instructions.
//!
//! Only three groups matter to the call-frame builder: instructions that open
//! a frame, instructions that close one, and log emitters. Everything else,
//! including opcodes this crate has never heard of, is `Other` and has no
//! effect on the frame tree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of call that opened a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallType {
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
    Create,
    Create2,
}

impl CallType {
    pub fn is_create(self) -> bool {
        matches!(self, CallType::Create | CallType::Create2)
    }

    /// Whether the call carries an explicit value operand
    pub fn has_value(self) -> bool {
        matches!(
            self,
            CallType::Call | CallType::CallCode | CallType::Create | CallType::Create2
        )
    }

    /// Whether the callee runs in the caller's storage context
    pub fn borrows_context(self) -> bool {
        matches!(self, CallType::DelegateCall | CallType::CallCode)
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallType::Call => "CALL",
            CallType::CallCode => "CALLCODE",
            CallType::DelegateCall => "DELEGATECALL",
            CallType::StaticCall => "STATICCALL",
            CallType::Create => "CREATE",
            CallType::Create2 => "CREATE2",
        };
        f.write_str(name)
    }
}

/// Instruction that ends the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terminal {
    Return,
    Stop,
    Revert,
    Invalid,
    SelfDestruct,
}

/// Classification of a single instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    Call(CallType),
    Terminal(Terminal),
    /// LOG0..LOG4, carrying the topic count
    Log(u8),
    Other,
}

impl OpKind {
    /// Classify an opcode mnemonic as printed by the struct logger
    pub fn classify(op: &str) -> Self {
        match op.to_uppercase().as_str() {
            "CALL" => OpKind::Call(CallType::Call),
            "CALLCODE" => OpKind::Call(CallType::CallCode),
            "DELEGATECALL" => OpKind::Call(CallType::DelegateCall),
            "STATICCALL" => OpKind::Call(CallType::StaticCall),
            "CREATE" => OpKind::Call(CallType::Create),
            "CREATE2" => OpKind::Call(CallType::Create2),
            "RETURN" => OpKind::Terminal(Terminal::Return),
            "STOP" => OpKind::Terminal(Terminal::Stop),
            "REVERT" => OpKind::Terminal(Terminal::Revert),
            "INVALID" => OpKind::Terminal(Terminal::Invalid),
            "SELFDESTRUCT" | "SUICIDE" => OpKind::Terminal(Terminal::SelfDestruct),
            "LOG0" => OpKind::Log(0),
            "LOG1" => OpKind::Log(1),
            "LOG2" => OpKind::Log(2),
            "LOG3" => OpKind::Log(3),
            "LOG4" => OpKind::Log(4),
            _ => OpKind::Other,
        }
    }
}

/// Number of immediate bytes following a PUSH opcode byte
pub fn push_size(opcode: u8) -> usize {
    if (0x60..=0x7f).contains(&opcode) {
        (opcode - 0x5f) as usize
    } else {
        0
    }
}
