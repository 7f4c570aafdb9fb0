//! FILENAME: core/view-engine/src/tree.rs
//! Derived Tree - the transient, borrowed shape of the view during one recompute.
//!
//! A `DerivedNode` points at a row in the store and carries the subset and
//! order of its children that survived filtering and sorting. Nodes are built
//! fresh on every recomputation and never outlive the store borrow.

use grid_model::{Row, RowPath};

/// A row plus its post-filter, post-sort children.
#[derive(Debug, Clone)]
pub struct DerivedNode<'a> {
    pub row: &'a Row,

    /// Location of the row in the store.
    pub path: RowPath,

    /// Index among the row's siblings in the store, before sorting.
    pub original_index: usize,

    pub children: Vec<DerivedNode<'a>>,
}

impl<'a> DerivedNode<'a> {
    pub fn depth(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub fn is_group(&self) -> bool {
        self.row.is_group()
    }

    /// Materializes the derived subtree as an owned row tree.
    pub fn to_row(&self) -> Row {
        let mut row = self.row.clone();
        if row.children.is_some() {
            row.children = Some(self.children.iter().map(DerivedNode::to_row).collect());
        }
        row
    }
}

/// Builds nodes for every row unchanged (no filter, original order).
pub fn build_nodes<'a>(rows: &'a [Row], parent: &[usize]) -> Vec<DerivedNode<'a>> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let path = child_path(parent, index);
            let children = build_nodes(row.children(), &path);
            DerivedNode {
                row,
                path,
                original_index: index,
                children,
            }
        })
        .collect()
}

pub(crate) fn child_path(parent: &[usize], index: usize) -> RowPath {
    let mut path = RowPath::from_slice(parent);
    path.push(index);
    path
}

/// Counts every node in the derived forest.
pub fn count_nodes(nodes: &[DerivedNode<'_>]) -> usize {
    nodes.iter().map(|n| 1 + count_nodes(&n.children)).sum()
}
