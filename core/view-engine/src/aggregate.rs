//! FILENAME: core/view-engine/src/aggregate.rs
//! Aggregation Engine - group summaries over the current descendant set.
//!
//! Aggregates are computed from the derived tree of the current recompute, so
//! a filtered-out child never contributes. Nothing is cached between recomputes.

use grid_model::{AggregationKind, AggregationSpec, CellValue, ColumnSpec};

use crate::tree::DerivedNode;

// ============================================================================
// ACCUMULATOR
// ============================================================================

/// Running state for the built-in reductions.
#[derive(Debug, Clone, Default)]
pub struct AggregateAccumulator {
    pub sum: f64,
    pub count: u64,
    pub count_numbers: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl AggregateAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_number(&mut self, value: f64) {
        self.count += 1;
        self.count_numbers += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    /// Non-numeric values only count toward `Count`.
    pub fn add_non_number(&mut self) {
        self.count += 1;
    }

    /// Final value for a built-in kind. Custom kinds never reach here.
    pub fn compute(&self, kind: &AggregationKind) -> CellValue {
        match kind {
            AggregationKind::Sum => CellValue::Number(self.sum),
            AggregationKind::Count => CellValue::Number(self.count as f64),
            AggregationKind::Average => {
                if self.count_numbers > 0 {
                    CellValue::Number(self.sum / self.count_numbers as f64)
                } else {
                    CellValue::Null
                }
            }
            AggregationKind::Min => self.min.map_or(CellValue::Null, CellValue::Number),
            AggregationKind::Max => self.max.map_or(CellValue::Null, CellValue::Number),
            AggregationKind::Custom(_) => CellValue::Null,
        }
    }
}

// ============================================================================
// REDUCTION
// ============================================================================

/// Reduces a collected value list with an aggregation spec.
pub fn reduce_values(values: &[CellValue], spec: &AggregationSpec) -> CellValue {
    if let AggregationKind::Custom(reducer) = &spec.kind {
        return reducer.reduce(values);
    }

    let mut acc = AggregateAccumulator::new();
    for value in values {
        let number = match &spec.parse_value {
            Some(parser) => parser.parse(value),
            None => value.as_number(),
        };
        match number {
            Some(n) => acc.add_number(n),
            None => acc.add_non_number(),
        }
    }
    acc.compute(&spec.kind)
}

/// Collects the leaf values under a group, in current (post-sort) order.
/// Nested groups are resolved down to their own surviving leaves.
pub fn collect_values(node: &DerivedNode<'_>, accessor: &str) -> Vec<CellValue> {
    let mut values = Vec::new();
    collect_into(node, accessor, &mut values);
    values
}

fn collect_into(node: &DerivedNode<'_>, accessor: &str, values: &mut Vec<CellValue>) {
    for child in &node.children {
        if child.is_group() {
            collect_into(child, accessor, values);
        } else {
            values.push(child.row.get(accessor).clone());
        }
    }
}

/// The aggregate of one column for a group node, or `None` when the column
/// declares no aggregation or the node is a leaf.
pub fn aggregate(node: &DerivedNode<'_>, column: &ColumnSpec) -> Option<CellValue> {
    let spec = column.aggregation.as_ref()?;
    if !node.is_group() {
        return None;
    }
    let values = collect_values(node, &column.accessor);
    Some(reduce_values(&values, spec))
}

/// Every declared aggregate for a group node, keyed by accessor.
pub fn aggregate_all(node: &DerivedNode<'_>, columns: &[ColumnSpec]) -> Vec<(String, CellValue)> {
    if !node.is_group() {
        return Vec::new();
    }
    columns
        .iter()
        .filter_map(|column| aggregate(node, column).map(|value| (column.accessor.clone(), value)))
        .collect()
}
