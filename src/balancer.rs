//! Reconciliation of the plant's energy-flow tree.
//!
//! Meter readings drift, so child nodes rarely sum to their parent exactly.
//! The balancer redistributes the discrepancy, preferentially onto estimated
//! readings since those carry the least confidence. The companions estimate
//! missing leaf values and flag readings that stray from their historical
//! baseline.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Relative parent/child discrepancy below which no correction is applied.
const TOLERANCE: f64 = 0.02;

pub const DEFAULT_ANOMALY_THRESHOLD_PERCENT: f64 = 15.0;

/// One node of the energy-flow tree, e.g. the plant total with
/// machine-level children.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementNode {
    pub id: String,

    pub value: f64,

    #[serde(default)]
    pub children: Vec<String>,

    #[serde(default)]
    pub parent: Option<String>,

    #[serde(default)]
    pub is_estimated: bool,
}

/// A node whose current value strays from its historical baseline.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    pub node_id: String,
    pub deviation_percent: f64,
}

fn index_by_id(nodes: &[MeasurementNode]) -> HashMap<&str, usize> {
    nodes.iter().enumerate().map(|(index, node)| (node.id.as_str(), index)).collect()
}

fn historical_values(historical: &[Vec<MeasurementNode>], id: &str) -> Vec<f64> {
    historical
        .iter()
        .filter_map(|snapshot| snapshot.iter().find(|node| node.id == id))
        .map(|node| node.value)
        .collect()
}

/// Reconcile parents with their children so that child sums match parent
/// totals within tolerance. The input is left untouched; a corrected copy is
/// returned.
///
/// For each parent, the difference `parent − Σ children` is redistributed:
/// evenly across the estimated children when any exist, otherwise across all
/// children in proportion to their share of the children's total (skipped
/// when that total is zero).
///
/// Parents are processed in input order. A tree deeper than two levels is
/// therefore only balanced top-down when listed in that order; a single pass
/// does not iterate to convergence.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub fn balance(nodes: &[MeasurementNode]) -> Vec<MeasurementNode> {
    let mut balanced = nodes.to_vec();
    let index_by_id = index_by_id(nodes);

    let parent_indexes: Vec<usize> =
        (0..balanced.len()).filter(|&index| !balanced[index].children.is_empty()).collect();
    for parent_index in parent_indexes {
        let child_indexes: Vec<usize> = balanced[parent_index]
            .children
            .iter()
            .filter_map(|id| index_by_id.get(id.as_str()).copied())
            .collect();
        if child_indexes.is_empty() {
            continue;
        }

        let parent_value = balanced[parent_index].value;
        let child_sum: f64 = child_indexes.iter().map(|&index| balanced[index].value).sum();
        let difference = parent_value - child_sum;
        if difference.abs() <= parent_value * TOLERANCE {
            continue;
        }

        let estimated_indexes: Vec<usize> =
            child_indexes.iter().copied().filter(|&index| balanced[index].is_estimated).collect();
        if estimated_indexes.is_empty() {
            if child_sum > 0.0 {
                for index in child_indexes {
                    let proportion = balanced[index].value / child_sum;
                    balanced[index].value += difference * proportion;
                }
            }
        } else {
            let adjustment = difference / estimated_indexes.len() as f64;
            for index in estimated_indexes {
                balanced[index].value += adjustment;
            }
        }
    }
    balanced
}

/// Flag nodes whose current value deviates from the historical mean.
///
/// The threshold widens with the series' relative standard deviation, so a
/// volatile node gets a wider band than a steady one. Nodes with fewer than
/// three historical samples, or a zero historical mean, cannot be judged and
/// are skipped.
#[must_use]
pub fn detect_anomalies(
    current: &[MeasurementNode],
    historical: &[Vec<MeasurementNode>],
    threshold_percent: f64,
) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();
    for node in current {
        let history = historical_values(historical, &node.id);
        if history.len() < 3 {
            continue;
        }

        #[expect(clippy::cast_precision_loss)]
        let count = history.len() as f64;
        let mean = history.iter().sum::<f64>() / count;
        if mean == 0.0 {
            continue;
        }
        let variance = history.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / count;
        let std_dev = variance.sqrt();

        let deviation_percent = (node.value - mean) / mean * 100.0;
        let dynamic_threshold = threshold_percent * (1.0 + std_dev / mean);
        if deviation_percent.abs() > dynamic_threshold {
            anomalies.push(Anomaly {
                node_id: node.id.clone(),
                deviation_percent,
            });
        }
    }
    anomalies
}

/// Fill in zero-valued readings and mark them as estimated.
///
/// First preference is the tree structure: the parent's value minus the
/// other children, clamped to zero. If the value is still zero afterwards,
/// the node's historical mean is used. A node with neither source is left
/// alone; that is a silent no-op, not an error.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub fn estimate_missing(
    nodes: &[MeasurementNode],
    historical: &[Vec<MeasurementNode>],
) -> Vec<MeasurementNode> {
    let mut estimated = nodes.to_vec();
    let index_by_id = index_by_id(nodes);

    for index in 0..estimated.len() {
        if estimated[index].value != 0.0 {
            continue;
        }

        let node_id = estimated[index].id.clone();
        let parent_index = estimated[index]
            .parent
            .as_deref()
            .and_then(|parent_id| index_by_id.get(parent_id).copied());
        if let Some(parent_index) = parent_index {
            let sibling_indexes: Vec<usize> = estimated[parent_index]
                .children
                .iter()
                .filter(|id| **id != node_id)
                .filter_map(|id| index_by_id.get(id.as_str()).copied())
                .collect();
            if !sibling_indexes.is_empty() && estimated[parent_index].value != 0.0 {
                let sibling_sum: f64 =
                    sibling_indexes.iter().map(|&sibling| estimated[sibling].value).sum();
                estimated[index].value = (estimated[parent_index].value - sibling_sum).max(0.0);
                estimated[index].is_estimated = true;
            }
        }

        // A clamped-to-zero structural estimate counts as unresolved too.
        if estimated[index].value == 0.0 {
            let history = historical_values(historical, &node_id);
            if !history.is_empty() {
                estimated[index].value = history.iter().sum::<f64>() / history.len() as f64;
                estimated[index].is_estimated = true;
            }
        }
    }
    estimated
}
