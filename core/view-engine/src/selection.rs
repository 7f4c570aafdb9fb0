//! FILENAME: core/view-engine/src/selection.rs
//! Selection Range Model - rectangular cell selection and row (checkbox) selection.
//!
//! The cell rectangle is defined only by its anchor and focus, both in the
//! flattened visible index space. Re-sorting or filtering does not move them.

use grid_model::{CellCoord, RowId};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ============================================================================
// BOUNDS
// ============================================================================

/// Normalized rectangle, inclusive on every side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionBounds {
    pub min_row: usize,
    pub max_row: usize,
    pub min_col: usize,
    pub max_col: usize,
}

impl SelectionBounds {
    pub fn new(a: CellCoord, b: CellCoord) -> Self {
        SelectionBounds {
            min_row: a.row.min(b.row),
            max_row: a.row.max(b.row),
            min_col: a.col.min(b.col),
            max_col: a.col.max(b.col),
        }
    }

    #[inline]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.row >= self.min_row
            && cell.row <= self.max_row
            && cell.col >= self.min_col
            && cell.col <= self.max_col
    }

    pub fn row_count(&self) -> usize {
        self.max_row - self.min_row + 1
    }

    pub fn col_count(&self) -> usize {
        self.max_col - self.min_col + 1
    }

    pub fn cell_count(&self) -> usize {
        self.row_count() * self.col_count()
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        (self.min_row..=self.max_row)
            .flat_map(move |row| (self.min_col..=self.max_col).map(move |col| CellCoord::new(row, col)))
    }
}

// ============================================================================
// BORDERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BorderEdge {
    Top,
    Right,
    Bottom,
    Left,
}

/// Which edges of a cell lie on the selection boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CellBorders {
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
    pub left: bool,
}

impl CellBorders {
    pub fn is_empty(&self) -> bool {
        !(self.top || self.right || self.bottom || self.left)
    }

    pub fn edges(&self) -> SmallVec<[BorderEdge; 4]> {
        let mut edges = SmallVec::new();
        if self.top {
            edges.push(BorderEdge::Top);
        }
        if self.right {
            edges.push(BorderEdge::Right);
        }
        if self.bottom {
            edges.push(BorderEdge::Bottom);
        }
        if self.left {
            edges.push(BorderEdge::Left);
        }
        edges
    }
}

/// Boundary edges of `cell` against `bounds`. Cells outside get none.
pub fn classify_borders(bounds: &SelectionBounds, cell: CellCoord) -> CellBorders {
    if !bounds.contains(cell) {
        return CellBorders::default();
    }
    CellBorders {
        top: cell.row == bounds.min_row,
        right: cell.col == bounds.max_col,
        bottom: cell.row == bounds.max_row,
        left: cell.col == bounds.min_col,
    }
}

// ============================================================================
// CELL SELECTION
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSelection {
    anchor: Option<CellCoord>,
    focus: Option<CellCoord>,
    dragging: bool,
}

impl CellSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a selection at `cell`: anchor and focus both land there.
    pub fn start(&mut self, cell: CellCoord) {
        self.anchor = Some(cell);
        self.focus = Some(cell);
        self.dragging = true;
    }

    /// Moves the focus while a drag is in progress. Ignored otherwise.
    pub fn update(&mut self, cell: CellCoord) -> bool {
        if !self.dragging || self.focus == Some(cell) {
            return false;
        }
        self.focus = Some(cell);
        true
    }

    /// Ends the drag; the rectangle stays.
    pub fn finish(&mut self) {
        self.dragging = false;
    }

    pub fn clear(&mut self) {
        self.anchor = None;
        self.focus = None;
        self.dragging = false;
    }

    pub fn anchor(&self) -> Option<CellCoord> {
        self.anchor
    }

    pub fn focus(&self) -> Option<CellCoord> {
        self.focus
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn bounds(&self) -> Option<SelectionBounds> {
        Some(SelectionBounds::new(self.anchor?, self.focus?))
    }

    pub fn is_selected(&self, cell: CellCoord) -> bool {
        self.bounds().is_some_and(|b| b.contains(cell))
    }

    pub fn borders(&self, cell: CellCoord) -> CellBorders {
        self.bounds()
            .map(|b| classify_borders(&b, cell))
            .unwrap_or_default()
    }

    /// True only for the (min_row, min_col) corner.
    pub fn is_top_left(&self, cell: CellCoord) -> bool {
        self.bounds()
            .is_some_and(|b| cell.row == b.min_row && cell.col == b.min_col)
    }

    pub fn selected_cells(&self) -> Vec<CellCoord> {
        self.bounds().map(|b| b.cells().collect()).unwrap_or_default()
    }
}

// ============================================================================
// ROW SELECTION
// ============================================================================

/// Checkbox selection, keyed by row id so it survives sort and filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSelection {
    selected: FxHashSet<RowId>,
}

impl RowSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_selected(&self, id: &RowId) -> bool {
        self.selected.contains(id)
    }

    /// Flips one row. Returns whether it is now selected.
    pub fn toggle(&mut self, id: &RowId) -> bool {
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.clone());
            true
        }
    }

    pub fn select(&mut self, id: RowId) {
        self.selected.insert(id);
    }

    pub fn deselect(&mut self, id: &RowId) {
        self.selected.remove(id);
    }

    pub fn select_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a RowId>) {
        self.selected.extend(ids.into_iter().cloned());
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected ids in visible order.
    pub fn selected_in<'a>(&self, visible: &'a [RowId]) -> Vec<&'a RowId> {
        visible.iter().filter(|id| self.selected.contains(*id)).collect()
    }

    pub fn retain(&mut self, mut exists: impl FnMut(&RowId) -> bool) {
        self.selected.retain(|id| exists(id));
    }

    /// Shift-click: selects the contiguous range between the clicked row and
    /// the nearest already-selected visible row (the lower index on a tie).
    /// With nothing selected, only the clicked row is selected.
    pub fn shift_select(&mut self, clicked: usize, visible: &[RowId]) -> usize {
        let Some(clicked_id) = visible.get(clicked) else {
            return 0;
        };

        let nearest = visible
            .iter()
            .enumerate()
            .filter(|(index, id)| *index != clicked && self.selected.contains(*id))
            .min_by_key(|(index, _)| (index.abs_diff(clicked), *index))
            .map(|(index, _)| index);

        let Some(nearest) = nearest else {
            self.selected.insert(clicked_id.clone());
            return 1;
        };

        let (from, to) = (nearest.min(clicked), nearest.max(clicked));
        for id in &visible[from..=to] {
            self.selected.insert(id.clone());
        }
        to - from + 1
    }
}
