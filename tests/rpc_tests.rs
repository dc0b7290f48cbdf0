use evm_trace_studio::rpc::client::normalize_tx_hash;
use evm_trace_studio::rpc::JsonRpcRequest;

#[test]
fn test_normalize_tx_hash() {
    assert_eq!(normalize_tx_hash("abc123"), "0xabc123");
    assert_eq!(normalize_tx_hash("0xdef456"), "0xdef456");
}

#[test]
fn test_trace_request_enables_memory_and_return_data() {
    let request = JsonRpcRequest::debug_trace_transaction("0xabc", 7);
    let json = serde_json::to_value(&request).unwrap();

    assert_eq!(json["method"], "debug_traceTransaction");
    assert_eq!(json["id"], 7);
    assert_eq!(json["params"][0], "0xabc");
    assert_eq!(json["params"][1]["enableMemory"], true);
    assert_eq!(json["params"][1]["enableReturnData"], true);
}
