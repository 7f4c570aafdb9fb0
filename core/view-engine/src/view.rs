//! FILENAME: core/view-engine/src/view.rs
//! View Output - what the rendering layer receives after each recompute.
//!
//! Every structure here is an owned snapshot. The renderer never sees the
//! row store or the derived tree directly.

use grid_model::{CellValue, RowId, RowPath};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Fetch state of a group's children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", content = "message", rename_all = "camelCase")]
pub enum GroupLoadState {
    /// Children are present (always the case for leaves and eager groups).
    #[default]
    Ready,
    /// A lazy group that has not been expanded yet.
    Pending,
    Loading,
    /// The last fetch failed. The renderer shows the message; no retry happens.
    Errored(String),
}

/// One entry of the flattened visible list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleRow {
    pub id: RowId,

    /// Location of the row in the store.
    pub path: RowPath,

    pub depth: usize,

    /// Position among the visible siblings after filter and sort.
    pub index_in_parent: usize,

    /// Position among the stored siblings before sorting.
    pub original_index: usize,

    pub is_group: bool,
    pub is_expanded: bool,

    /// Children that survived the current filter.
    pub child_count: usize,

    pub load_state: GroupLoadState,

    pub cells: FxHashMap<String, CellValue>,

    /// Group summaries keyed by accessor. Empty for leaves.
    pub aggregates: FxHashMap<String, CellValue>,
}

impl VisibleRow {
    /// The value to display for a column: the aggregate for groups that have
    /// one, otherwise the row's own cell.
    pub fn display(&self, accessor: &str) -> Option<&CellValue> {
        self.aggregates.get(accessor).or_else(|| self.cells.get(accessor))
    }
}

/// A distinct column value with the number of leaf rows holding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueValue {
    pub value: String,
    pub count: u32,
}

/// Pagination summary published alongside the visible rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub current_page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_rows: usize,
    /// Infinite mode only: more pages can still be loaded.
    pub has_more: bool,
}
