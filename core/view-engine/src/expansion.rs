//! FILENAME: core/view-engine/src/expansion.rs
//! Expansion Controller - which groups show their children, and flattening.
//!
//! Two layers decide whether a group is expanded:
//! 1. A per-row override, when one exists for the row id.
//! 2. Otherwise, whether the row's depth is in the expanded-depth set.

use grid_model::{ColumnSpec, RowId};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

use crate::aggregate::aggregate_all;
use crate::definition::RowExpansion;
use crate::tree::DerivedNode;
use crate::view::{GroupLoadState, VisibleRow};

// ============================================================================
// EXPANSION STATE
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpansionState {
    expanded_depths: BTreeSet<usize>,
    /// Row id -> (depth, expanded). The depth lets depth-wide operations
    /// clear the overrides they supersede.
    overrides: FxHashMap<RowId, (usize, bool)>,
}

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_depths(depths: BTreeSet<usize>) -> Self {
        ExpansionState {
            expanded_depths: depths,
            overrides: FxHashMap::default(),
        }
    }

    pub fn is_expanded(&self, id: &RowId, depth: usize) -> bool {
        match self.overrides.get(id) {
            Some(&(_, expanded)) => expanded,
            None => self.expanded_depths.contains(&depth),
        }
    }

    pub fn expanded_depths(&self) -> &BTreeSet<usize> {
        &self.expanded_depths
    }

    /// Expands every given depth and drops all per-row overrides.
    pub fn expand_all(&mut self, depths: impl IntoIterator<Item = usize>) {
        self.expanded_depths = depths.into_iter().collect();
        self.overrides.clear();
    }

    pub fn collapse_all(&mut self) {
        self.expanded_depths.clear();
        self.overrides.clear();
    }

    pub fn expand_depth(&mut self, depth: usize) {
        self.expanded_depths.insert(depth);
        self.clear_overrides_at(depth);
    }

    pub fn collapse_depth(&mut self, depth: usize) {
        self.expanded_depths.remove(&depth);
        self.clear_overrides_at(depth);
    }

    pub fn toggle_depth(&mut self, depth: usize) {
        if self.expanded_depths.contains(&depth) {
            self.collapse_depth(depth);
        } else {
            self.expand_depth(depth);
        }
    }

    /// Replaces the depth defaults. Per-row overrides stay in force.
    pub fn set_expanded_depths(&mut self, depths: BTreeSet<usize>) {
        self.expanded_depths = depths;
    }

    pub fn set_row(&mut self, id: RowId, depth: usize, expanded: bool) {
        self.overrides.insert(id, (depth, expanded));
    }

    /// Flips the effective state of one row and returns the new state.
    pub fn toggle_row(&mut self, id: &RowId, depth: usize) -> bool {
        let expanded = !self.is_expanded(id, depth);
        self.overrides.insert(id.clone(), (depth, expanded));
        expanded
    }

    pub fn clear_row(&mut self, id: &RowId) {
        self.overrides.remove(id);
    }

    /// Drops overrides for rows that no longer exist.
    pub fn retain(&mut self, mut exists: impl FnMut(&RowId) -> bool) {
        self.overrides.retain(|id, _| exists(id));
    }

    fn clear_overrides_at(&mut self, depth: usize) {
        self.overrides.retain(|_, (d, _)| *d != depth);
    }

    /// Overrides in a stable order for snapshots.
    pub fn overrides(&self) -> Vec<RowExpansion> {
        let mut list: Vec<RowExpansion> = self
            .overrides
            .iter()
            .map(|(id, &(depth, expanded))| RowExpansion {
                id: id.clone(),
                depth,
                expanded,
            })
            .collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    pub fn restore(depths: BTreeSet<usize>, overrides: &[RowExpansion]) -> Self {
        ExpansionState {
            expanded_depths: depths,
            overrides: overrides
                .iter()
                .map(|o| (o.id.clone(), (o.depth, o.expanded)))
                .collect(),
        }
    }
}

// ============================================================================
// GROUPING NAMES
// ============================================================================

/// Depth of a named grouping level.
pub fn grouping_depth(grouping: &[String], property: &str) -> Option<usize> {
    grouping.iter().position(|p| p == property)
}

/// Name of the grouping level at a depth.
pub fn grouping_property(grouping: &[String], depth: usize) -> Option<&str> {
    grouping.get(depth).map(String::as_str)
}

// ============================================================================
// FLATTENING
// ============================================================================

/// Flattens the derived forest into the visible list, depth-first pre-order.
///
/// Groups are always emitted. Children are emitted only under an expanded
/// group; a collapsed subtree contributes nothing.
pub fn flatten(
    nodes: &[DerivedNode<'_>],
    expansion: &ExpansionState,
    columns: &[ColumnSpec],
    load_states: &FxHashMap<RowId, GroupLoadState>,
) -> Vec<VisibleRow> {
    let mut out = Vec::new();
    flatten_into(nodes, expansion, columns, load_states, &mut out);
    out
}

fn flatten_into(
    nodes: &[DerivedNode<'_>],
    expansion: &ExpansionState,
    columns: &[ColumnSpec],
    load_states: &FxHashMap<RowId, GroupLoadState>,
    out: &mut Vec<VisibleRow>,
) {
    for (index_in_parent, node) in nodes.iter().enumerate() {
        let row = node.row;
        let depth = node.depth();
        let is_group = node.is_group();
        // A lazy group shows collapsed until its children arrive
        let is_expanded = is_group && !row.needs_children() && expansion.is_expanded(&row.id, depth);

        let load_state = match load_states.get(&row.id) {
            Some(state) => state.clone(),
            None if row.needs_children() => GroupLoadState::Pending,
            None => GroupLoadState::Ready,
        };

        out.push(VisibleRow {
            id: row.id.clone(),
            path: node.path.clone(),
            depth,
            index_in_parent,
            original_index: node.original_index,
            is_group,
            is_expanded,
            child_count: node.children.len(),
            load_state,
            cells: row.cells.clone(),
            aggregates: aggregate_all(node, columns).into_iter().collect(),
        });

        if is_expanded {
            flatten_into(&node.children, expansion, columns, load_states, out);
        }
    }
}

/// Row id -> visible index, for the animation boundary.
pub fn positions(rows: &[VisibleRow]) -> FxHashMap<RowId, usize> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| (row.id.clone(), index))
        .collect()
}
