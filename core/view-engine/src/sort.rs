//! FILENAME: core/view-engine/src/sort.rs
//! Sort Engine - stable, per-sibling-list ordering.
//!
//! Siblings are reordered within their own list only; a child never moves to
//! another parent. Ties always fall back to the pre-sort index.

use grid_model::{find_column, CellValue, ColumnSpec, Row, RowComparator, SortDirection, SortStrategy, StrategyError};
use std::cmp::Ordering;

use crate::definition::SortState;
use crate::error::EngineError;
use crate::tree::{build_nodes, DerivedNode};

/// Sorts a derived forest in place. `None` keeps the incoming order.
pub fn sort_nodes(
    nodes: &mut Vec<DerivedNode<'_>>,
    sort: Option<&SortState>,
    columns: &[ColumnSpec],
) -> Result<(), EngineError> {
    let Some(sort) = sort else {
        return Ok(());
    };
    let column = find_column(columns, &sort.accessor)
        .ok_or_else(|| EngineError::UnknownColumn(sort.accessor.clone()))?;
    sort_siblings(nodes, column, sort.direction)
}

fn sort_siblings(
    nodes: &mut Vec<DerivedNode<'_>>,
    column: &ColumnSpec,
    direction: SortDirection,
) -> Result<(), EngineError> {
    match column.sort_strategy() {
        SortStrategy::Comparator(comparator) => {
            sort_with_comparator(nodes, comparator, direction).map_err(|source| {
                EngineError::Comparator {
                    accessor: column.accessor.clone(),
                    source,
                }
            })?;
        }
        SortStrategy::Getter(getter) => sort_by_key(nodes, direction, |row| getter.value(row)),
        SortStrategy::Raw => sort_by_key(nodes, direction, |row| row.get(&column.accessor).clone()),
    }

    for node in nodes.iter_mut() {
        if !node.children.is_empty() {
            sort_siblings(&mut node.children, column, direction)?;
        }
    }
    Ok(())
}

/// Decorate, sort, undecorate: each key is computed once per row.
fn sort_by_key<'a>(
    nodes: &mut Vec<DerivedNode<'a>>,
    direction: SortDirection,
    key: impl Fn(&Row) -> CellValue,
) {
    let mut keyed: Vec<(CellValue, DerivedNode<'a>)> = std::mem::take(nodes)
        .into_iter()
        .map(|node| (key(node.row), node))
        .collect();

    keyed.sort_by(|(ka, a), (kb, b)| {
        direction
            .apply(ka.compare(kb))
            .then_with(|| a.original_index.cmp(&b.original_index))
    });

    nodes.extend(keyed.into_iter().map(|(_, node)| node));
}

/// Stable merge sort driven by a fallible comparator. Stops at the first error
/// and leaves `nodes` in its incoming order.
fn sort_with_comparator(
    nodes: &mut Vec<DerivedNode<'_>>,
    comparator: &dyn RowComparator,
    direction: SortDirection,
) -> Result<(), StrategyError> {
    let mut order: Vec<usize> = (0..nodes.len()).collect();
    let mut compare = |a: usize, b: usize| -> Result<Ordering, StrategyError> {
        let (left, right) = (&nodes[a], &nodes[b]);
        Ok(comparator
            .compare(left.row, right.row, direction)?
            .then_with(|| left.original_index.cmp(&right.original_index)))
    };
    merge_sort(&mut order, &mut compare)?;

    let mut slots: Vec<Option<_>> = std::mem::take(nodes).into_iter().map(Some).collect();
    nodes.extend(order.into_iter().filter_map(|i| slots[i].take()));
    Ok(())
}

fn merge_sort<E>(
    items: &mut [usize],
    compare: &mut impl FnMut(usize, usize) -> Result<Ordering, E>,
) -> Result<(), E> {
    if items.len() < 2 {
        return Ok(());
    }
    let mid = items.len() / 2;
    merge_sort(&mut items[..mid], compare)?;
    merge_sort(&mut items[mid..], compare)?;

    let mut merged = Vec::with_capacity(items.len());
    let (mut i, mut j) = (0, mid);
    while i < mid && j < items.len() {
        // Take from the right only when strictly smaller, which keeps ties stable
        if compare(items[j], items[i])? == Ordering::Less {
            merged.push(items[j]);
            j += 1;
        } else {
            merged.push(items[i]);
            i += 1;
        }
    }
    merged.extend_from_slice(&items[i..mid]);
    merged.extend_from_slice(&items[j..]);
    items.copy_from_slice(&merged);
    Ok(())
}

/// Pure form of the sort stage over an owned row forest.
pub fn sort_rows(
    rows: &[Row],
    sort: Option<&SortState>,
    columns: &[ColumnSpec],
) -> Result<Vec<Row>, EngineError> {
    let mut nodes = build_nodes(rows, &[]);
    sort_nodes(&mut nodes, sort, columns)?;
    Ok(nodes.iter().map(DerivedNode::to_row).collect())
}
