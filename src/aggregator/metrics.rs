//! Per-function gas profile.
//!
//! Frames are grouped by `Contract.function`; the heaviest entries are the
//! first candidates for optimization.

use super::frame::CallTree;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Gas statistics for one `Contract.function`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionGas {
    /// `Contract.function`
    pub label: String,

    /// Number of frames that ran it
    pub calls: usize,

    /// Gas including nested calls
    pub total_gas: u64,

    /// Gas excluding nested calls
    pub self_gas: u64,

    pub min_gas: u64,
    pub max_gas: u64,
    pub avg_gas: u64,

    /// Share of the root frame's gas
    pub percentage: f64,
}

/// Calculate the gas profile of a call tree
///
/// **Public** - main entry point for metrics calculation
///
/// # Arguments
/// * `tree` - Built call tree
///
/// # Returns
/// One entry per `Contract.function`, sorted by total gas (descending)
pub fn calculate_gas_profile(tree: &CallTree) -> Vec<FunctionGas> {
    let root_gas = tree.root().gas_used;
    let mut groups: BTreeMap<String, FunctionGas> = BTreeMap::new();

    for frame in tree.frames() {
        let children_gas: u64 = tree.children(frame.id).map(|c| c.gas_used).sum();
        let own = frame.gas_used.saturating_sub(children_gas);
        let label = frame.label();

        let entry = groups.entry(label.clone()).or_insert_with(|| FunctionGas {
            label,
            calls: 0,
            total_gas: 0,
            self_gas: 0,
            min_gas: u64::MAX,
            max_gas: 0,
            avg_gas: 0,
            percentage: 0.0,
        });
        entry.calls += 1;
        entry.total_gas = entry.total_gas.saturating_add(frame.gas_used);
        entry.self_gas = entry.self_gas.saturating_add(own);
        entry.min_gas = entry.min_gas.min(frame.gas_used);
        entry.max_gas = entry.max_gas.max(frame.gas_used);
    }

    let mut profile: Vec<FunctionGas> = groups
        .into_values()
        .map(|mut entry| {
            entry.avg_gas = entry.total_gas / entry.calls.max(1) as u64;
            entry.percentage = percentage(entry.total_gas, root_gas);
            entry
        })
        .collect();

    profile.sort_by(|a, b| b.total_gas.cmp(&a.total_gas).then_with(|| a.label.cmp(&b.label)));

    debug!("Gas profile: {} functions", profile.len());
    profile
}

/// **Private** - internal conversion
fn percentage(gas: u64, total: u64) -> f64 {
    if total > 0 {
        (gas as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}
