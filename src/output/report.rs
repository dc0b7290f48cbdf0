//! Serializable summary of one analyzed transaction.

use crate::aggregator::FunctionGas;
use crate::query::TransactionAnalysis;
use crate::utils::config::SCHEMA_VERSION;
use serde::{Deserialize, Serialize};

/// Report written by `evm-trace analyze --output`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Report schema version
    pub version: String,

    pub transaction_hash: String,

    /// 1 success, 0 failed, -1 pending
    pub status: i8,

    #[serde(default)]
    pub trace_available: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailable_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_trace: Option<String>,

    /// Decoded events, as emitted
    #[serde(default)]
    pub events: Vec<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revert_msg: Option<String>,

    /// Source excerpt of the fault origin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default)]
    pub gas_profile: Vec<FunctionGas>,

    /// Data problems met while building, one line each
    #[serde(default)]
    pub anomalies: Vec<String>,

    /// RFC 3339 timestamp
    pub generated_at: String,
}

impl AnalysisReport {
    /// Summarize an analysis
    ///
    /// # Arguments
    /// * `analysis` - Completed analysis
    /// * `pad` - Lines of context around the source excerpt
    pub fn from_analysis(analysis: &TransactionAnalysis, pad: usize) -> Self {
        let transaction_hash = analysis
            .header()
            .hash
            .map(|hash| hash.to_string())
            .unwrap_or_default();

        Self {
            version: SCHEMA_VERSION.to_string(),
            transaction_hash,
            status: analysis.status(),
            trace_available: analysis.is_trace_available(),
            unavailable_reason: analysis.unavailable_reason().map(str::to_string),
            call_trace: analysis.call_trace(),
            events: analysis
                .events()
                .iter()
                .filter_map(|event| serde_json::to_value(event).ok())
                .collect(),
            return_value: analysis
                .return_value()
                .map(|data| format!("0x{}", hex::encode(data))),
            revert_msg: analysis.revert_msg(),
            error: analysis.error(pad),
            gas_profile: analysis.gas_profile().unwrap_or_default(),
            anomalies: analysis.anomalies().iter().map(|a| a.to_string()).collect(),
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
