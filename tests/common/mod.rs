//! Shared fixtures: a three-contract call chain that reverts at the bottom.
//!
//! Router (0xaa) calls Vault (0xbb), which calls `Token.withdraw(5)` at 0xcc.
//! Token reverts with `Error("Insufficient balance")` and both callers
//! propagate the revert.

#![allow(dead_code)]

use alloy_primitives::{address, Address, U256};
use evm_trace_studio::abi::{encode_call, AbiValue, ContractAbi, ParamType};
use evm_trace_studio::parser::source_map::{parse_bytecode, SourceMap};
use evm_trace_studio::parser::{Receipt, TransactionHeader};
use evm_trace_studio::registry::{ContractInfo, ContractRegistry};
use evm_trace_studio::utils::config::ERROR_STRING_SELECTOR;
use serde_json::{json, Value};

pub const ROUTER: Address = address!("00000000000000000000000000000000000000aa");
pub const VAULT: Address = address!("00000000000000000000000000000000000000bb");
pub const TOKEN: Address = address!("00000000000000000000000000000000000000cc");

pub const TOKEN_SOURCE_PATH: &str = "contracts/Token.sol";
pub const TOKEN_SOURCE: &str = "contract Token {
    uint256 balance;

    function withdraw(uint256 amount) public {
        require(balance >= amount, \"Insufficient balance\");
        balance -= amount;
    }
}
";

/// PUSH1 0x80 PUSH1 0x40 MSTORE REVERT
pub const TOKEN_RUNTIME: &str = "0x6080604052fd";

/// pc of the REVERT in `TOKEN_RUNTIME`
pub const TOKEN_REVERT_PC: u64 = 5;

pub const TOKEN_ABI: &str = r#"[
    {"type": "function", "name": "withdraw", "stateMutability": "nonpayable",
     "inputs": [{"name": "amount", "type": "uint256"}], "outputs": []},
    {"type": "event", "name": "Transfer", "anonymous": false,
     "inputs": [
        {"name": "from", "type": "address", "indexed": true},
        {"name": "to", "type": "address", "indexed": true},
        {"name": "value", "type": "uint256", "indexed": false}
     ]}
]"#;

pub const TRANSFER_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

pub fn step(pc: u64, op: &str, depth: u64, gas: u64, stack: &[&str]) -> Value {
    json!({ "pc": pc, "op": op, "depth": depth, "gas": gas, "gasCost": 3, "stack": stack })
}

pub fn with_memory(mut step: Value, memory: &[u8]) -> Value {
    step["memory"] = json!(format!("0x{}", hex::encode(memory)));
    step
}

/// CALL operands, top of stack last: out_len, out_off, in_len, in_off, value, to, gas
pub fn call_stack(to: &str, input_len: usize) -> Vec<String> {
    vec![
        "0x0".to_string(),
        "0x0".to_string(),
        format!("{:#x}", input_len),
        "0x0".to_string(),
        "0x0".to_string(),
        to.to_string(),
        "0xffff".to_string(),
    ]
}

fn call_step(pc: u64, depth: u64, gas: u64, to: &str, input: &[u8]) -> Value {
    let stack = call_stack(to, input.len());
    let stack: Vec<&str> = stack.iter().map(String::as_str).collect();
    with_memory(step(pc, "CALL", depth, gas, &stack), input)
}

/// REVERT with `payload` at memory offset zero
fn revert_step(pc: u64, depth: u64, gas: u64, payload: &[u8]) -> Value {
    let len = format!("{:#x}", payload.len());
    with_memory(step(pc, "REVERT", depth, gas, &[len.as_str(), "0x0"]), payload)
}

pub fn revert_payload(message: &str) -> Vec<u8> {
    encode_call(
        ERROR_STRING_SELECTOR,
        &[ParamType::String],
        &[AbiValue::String(message.to_string())],
    )
    .unwrap()
}

pub fn withdraw_input(amount: u64) -> Vec<u8> {
    let abi = ContractAbi::from_json_str(TOKEN_ABI).unwrap();
    let withdraw = abi.function_by_name("withdraw").unwrap();
    encode_call(
        withdraw.selector,
        &withdraw.input_types(),
        &[AbiValue::uint(U256::from(amount))],
    )
    .unwrap()
}

/// Steps of the failing Router → Vault → Token chain
pub fn revert_chain_steps() -> Vec<Value> {
    let payload = revert_payload("Insufficient balance");
    vec![
        call_step(10, 1, 10_000, "0xbb", &[]),
        call_step(20, 2, 9_000, "0xcc", &withdraw_input(5)),
        step(0, "PUSH1", 3, 8_000, &[]),
        revert_step(TOKEN_REVERT_PC, 3, 7_990, &payload),
        step(21, "ISZERO", 2, 7_900, &["0x0"]),
        revert_step(30, 2, 7_890, &payload),
        step(11, "ISZERO", 1, 7_800, &["0x0"]),
        revert_step(12, 1, 7_790, &payload),
    ]
}

pub fn revert_chain_trace() -> Value {
    json!({ "gas": 2210, "failed": true, "returnValue": "", "structLogs": revert_chain_steps() })
}

pub fn router_header() -> TransactionHeader {
    TransactionHeader {
        sender: address!("1000000000000000000000000000000000000001"),
        receiver: Some(ROUTER),
        gas_limit: 100_000,
        nonce: Some(7),
        receipt: Some(Receipt {
            status: false,
            gas_used: 2210,
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn token_info() -> ContractInfo {
    let abi = ContractAbi::from_json_str(TOKEN_ABI).unwrap();
    let offset = TOKEN_SOURCE.find("require").unwrap();
    let length = TOKEN_SOURCE[offset..].find(';').unwrap();
    let map = format!("0:{}:0;;;{}:{}:0", TOKEN_SOURCE.len(), offset, length);
    let bytecode = parse_bytecode(TOKEN_RUNTIME).unwrap();
    let source_map =
        SourceMap::from_compressed(&map, &bytecode, vec![TOKEN_SOURCE_PATH.to_string()]).unwrap();

    ContractInfo::new("Token", abi)
        .with_source_map(source_map)
        .with_source(TOKEN_SOURCE_PATH, TOKEN_SOURCE)
}

pub fn registry() -> ContractRegistry {
    let fallback_only =
        ContractAbi::from_json_str(r#"[{"type": "fallback", "stateMutability": "payable"}]"#)
            .unwrap();

    let registry = ContractRegistry::new();
    registry.register(ROUTER, ContractInfo::new("Router", fallback_only.clone()));
    registry.register(VAULT, ContractInfo::new("Vault", fallback_only));
    registry.register(TOKEN, token_info());
    registry
}
