//! FILENAME: core/view-engine/src/listener.rs
//! Callbacks out of the engine, and the animation boundary.
//!
//! Listeners fire after a change is committed and the view recomputed. They
//! receive copies of the new state and cannot reach back into the engine.

use grid_model::{CellValue, Row, RowId};
use rustc_hash::FxHashMap;

use crate::definition::{FilterState, SortState};

pub trait TableListener: Send + Sync {
    fn on_sort_change(&self, _sort: Option<&SortState>) {}

    fn on_filter_change(&self, _filters: &FilterState) {}

    /// A cell was edited. `row` is the row after the edit.
    fn on_cell_change(&self, _accessor: &str, _value: &CellValue, _row: &Row) {}

    fn on_page_change(&self, _page: usize) {}
}

/// Row id -> index in the flattened visible list.
pub type RowPositions = FxHashMap<RowId, usize>;

/// Receives row positions around every recompute so an external layer can
/// animate rows from their old slot to the new one. The engine does no timing.
pub trait ViewAnimator: Send + Sync {
    fn animate(&self, before: &RowPositions, after: &RowPositions);
}

/// Rows whose visible index changed, with (before, after) indices.
/// Rows that appeared or disappeared are not included.
pub fn moved_rows(before: &RowPositions, after: &RowPositions) -> Vec<(RowId, usize, usize)> {
    let mut moved: Vec<(RowId, usize, usize)> = after
        .iter()
        .filter_map(|(id, &to)| {
            before
                .get(id)
                .filter(|&&from| from != to)
                .map(|&from| (id.clone(), from, to))
        })
        .collect();
    moved.sort_by_key(|(_, _, to)| *to);
    moved
}
