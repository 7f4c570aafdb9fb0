//! FILENAME: core/grid-model/src/store.rs
//! PURPOSE: Owns the row forest and applies explicit structural edits to it.
//! CONTEXT: Flat data is a forest of depth-0 roots without children. Rows are
//! addressed by id, optionally narrowed by the ids of their ancestors, and
//! internally by a `RowPath` of sibling indices from the roots downward.

use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::collections::BTreeSet;

use crate::error::StoreError;
use crate::row::{Row, RowId};
use crate::value::CellValue;

/// Sibling indices from the root list down to a row. Depth is `len() - 1`.
pub type RowPath = SmallVec<[usize; 4]>;

/// The hierarchical row store.
#[derive(Debug, Clone, Default)]
pub struct RowStore {
    roots: Vec<Row>,

    /// Every id present anywhere in the forest.
    ids: FxHashSet<RowId>,
}

impl RowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store, rejecting forests that repeat a row id.
    pub fn from_rows(rows: Vec<Row>) -> Result<Self, StoreError> {
        let mut store = RowStore::new();
        store.replace_all(rows)?;
        Ok(store)
    }

    pub fn roots(&self) -> &[Row] {
        &self.roots
    }

    /// Total number of rows, descendants included.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn contains(&self, id: &RowId) -> bool {
        self.ids.contains(id)
    }

    pub fn get(&self, path: &[usize]) -> Option<&Row> {
        let (first, rest) = path.split_first()?;
        let mut row = self.roots.get(*first)?;
        for &index in rest {
            row = row.children.as_ref()?.get(index)?;
        }
        Some(row)
    }

    fn get_mut(&mut self, path: &[usize]) -> Option<&mut Row> {
        let (first, rest) = path.split_first()?;
        let mut row = self.roots.get_mut(*first)?;
        for &index in rest {
            row = row.children.as_mut()?.get_mut(index)?;
        }
        Some(row)
    }

    /// Sibling list holding the row at `path`.
    fn siblings_mut(&mut self, path: &[usize]) -> Option<&mut Vec<Row>> {
        match path.split_last() {
            Some((_, [])) => Some(&mut self.roots),
            Some((_, parent)) => self.get_mut(parent)?.children.as_mut(),
            None => None,
        }
    }

    pub fn find(&self, id: &RowId) -> Option<&Row> {
        self.path_of(id).and_then(|path| self.get(&path))
    }

    /// Depth-first search for a row id.
    pub fn path_of(&self, id: &RowId) -> Option<RowPath> {
        if !self.ids.contains(id) {
            return None;
        }
        let mut path = RowPath::new();
        if search(&self.roots, id, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    /// Resolves a row by id. When `ancestors` is given it must list the ids
    /// from a root down to the row's parent, and only that branch is searched.
    pub fn locate(&self, id: &RowId, ancestors: Option<&[RowId]>) -> Result<RowPath, StoreError> {
        let Some(ancestors) = ancestors else {
            return self
                .path_of(id)
                .ok_or_else(|| StoreError::RowNotFound(id.clone()));
        };

        let mut path = RowPath::new();
        let mut level: &[Row] = &self.roots;
        for ancestor in ancestors {
            let index = level
                .iter()
                .position(|r| &r.id == ancestor)
                .ok_or_else(|| StoreError::PathMismatch { id: id.clone() })?;
            path.push(index);
            level = level[index].children();
        }
        let index = level
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| StoreError::PathMismatch { id: id.clone() })?;
        path.push(index);
        Ok(path)
    }

    /// Inserts a row (with its subtree) under `parent`, or as a root.
    /// `index` defaults to the end of the sibling list.
    pub fn insert(
        &mut self,
        row: Row,
        parent: Option<&RowId>,
        index: Option<usize>,
    ) -> Result<RowPath, StoreError> {
        let new_ids = self.check_new_subtree(&row, None)?;

        let mut path = match parent {
            Some(parent_id) => self
                .path_of(parent_id)
                .ok_or_else(|| StoreError::RowNotFound(parent_id.clone()))?,
            None => RowPath::new(),
        };

        let siblings = if path.is_empty() {
            &mut self.roots
        } else {
            let parent_row = self
                .get_mut(&path)
                .ok_or_else(|| StoreError::RowNotFound(row.id.clone()))?;
            if !parent_row.is_group() {
                return Err(StoreError::NotAGroup(parent_row.id.clone()));
            }
            parent_row.lazy_children = false;
            parent_row.children.get_or_insert_with(Vec::new)
        };

        let at = index.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(at, row);
        path.push(at);
        self.ids.extend(new_ids);
        Ok(path)
    }

    /// Replaces a row and its subtree. The replacement must keep the same id.
    pub fn replace(
        &mut self,
        id: &RowId,
        ancestors: Option<&[RowId]>,
        row: Row,
    ) -> Result<(), StoreError> {
        if &row.id != id {
            return Err(StoreError::IdChanged {
                expected: id.clone(),
                actual: row.id.clone(),
            });
        }
        let path = self.locate(id, ancestors)?;
        let old_ids = match self.get(&path) {
            Some(old) => subtree_ids(old),
            None => return Err(StoreError::RowNotFound(id.clone())),
        };
        let new_ids = self.check_new_subtree(&row, Some(&old_ids))?;

        for old in &old_ids {
            self.ids.remove(old);
        }
        self.ids.extend(new_ids);
        if let Some(slot) = self.get_mut(&path) {
            *slot = row;
        }
        Ok(())
    }

    /// Sets a single cell and returns the updated row.
    pub fn set_cell(
        &mut self,
        id: &RowId,
        ancestors: Option<&[RowId]>,
        accessor: &str,
        value: CellValue,
    ) -> Result<&Row, StoreError> {
        let path = self.locate(id, ancestors)?;
        let row = self
            .get_mut(&path)
            .ok_or_else(|| StoreError::RowNotFound(id.clone()))?;
        row.set(accessor, value);
        Ok(row)
    }

    /// Removes a row with its whole subtree and returns it.
    pub fn remove(&mut self, id: &RowId, ancestors: Option<&[RowId]>) -> Result<Row, StoreError> {
        let path = self.locate(id, ancestors)?;
        let index = *path.last().ok_or_else(|| StoreError::RowNotFound(id.clone()))?;
        let siblings = self
            .siblings_mut(&path)
            .ok_or_else(|| StoreError::RowNotFound(id.clone()))?;
        let removed = siblings.remove(index);
        for gone in subtree_ids(&removed) {
            self.ids.remove(&gone);
        }
        Ok(removed)
    }

    /// Attaches fetched children to a group row, replacing any it had.
    pub fn attach_children(&mut self, id: &RowId, children: Vec<Row>) -> Result<(), StoreError> {
        let path = self
            .path_of(id)
            .ok_or_else(|| StoreError::RowNotFound(id.clone()))?;

        let previous: Vec<RowId> = match self.get(&path) {
            Some(row) if !row.is_group() => return Err(StoreError::NotAGroup(id.clone())),
            Some(row) => row.children().iter().flat_map(subtree_ids).collect(),
            None => return Err(StoreError::RowNotFound(id.clone())),
        };

        let mut incoming = Vec::new();
        let mut seen = FxHashSet::default();
        for child in &children {
            for child_id in subtree_ids(child) {
                let known_elsewhere = self.ids.contains(&child_id) && !previous.contains(&child_id);
                if known_elsewhere || !seen.insert(child_id.clone()) {
                    return Err(StoreError::DuplicateRowId(child_id));
                }
                incoming.push(child_id);
            }
        }

        for old in &previous {
            self.ids.remove(old);
        }
        self.ids.extend(incoming);
        if let Some(row) = self.get_mut(&path) {
            row.children = Some(children);
            row.lazy_children = false;
        }
        Ok(())
    }

    /// Appends roots, skipping rows whose id is already present.
    /// Returns how many rows were actually appended. The batch is checked as
    /// a whole first: a repeated id below a new root rejects all of it.
    pub fn append(&mut self, rows: Vec<Row>) -> Result<usize, StoreError> {
        let mut incoming = FxHashSet::default();
        let mut accepted = Vec::with_capacity(rows.len());
        for row in rows {
            if self.ids.contains(&row.id) || incoming.contains(&row.id) {
                continue;
            }
            for id in subtree_ids(&row) {
                if self.ids.contains(&id) || !incoming.insert(id.clone()) {
                    return Err(StoreError::DuplicateRowId(id));
                }
            }
            accepted.push(row);
        }

        let appended = accepted.len();
        self.ids.extend(incoming);
        self.roots.extend(accepted);
        Ok(appended)
    }

    /// Swaps the whole forest for a new one.
    pub fn replace_all(&mut self, rows: Vec<Row>) -> Result<(), StoreError> {
        let mut ids = FxHashSet::default();
        for row in &rows {
            for id in subtree_ids(row) {
                if !ids.insert(id.clone()) {
                    return Err(StoreError::DuplicateRowId(id));
                }
            }
        }
        self.roots = rows;
        self.ids = ids;
        Ok(())
    }

    /// Depths (0 = roots) at which at least one group row lives.
    pub fn group_depths(&self) -> BTreeSet<usize> {
        let mut depths = BTreeSet::new();
        collect_group_depths(&self.roots, 0, &mut depths);
        depths
    }

    /// Collects the subtree ids of `row`, failing on any id already in the
    /// store (other than those in `replacing`) or repeated within the subtree.
    fn check_new_subtree(
        &self,
        row: &Row,
        replacing: Option<&[RowId]>,
    ) -> Result<Vec<RowId>, StoreError> {
        let ids = subtree_ids(row);
        let mut seen = FxHashSet::default();
        for id in &ids {
            let replaced = replacing.is_some_and(|old| old.contains(id));
            if (self.ids.contains(id) && !replaced) || !seen.insert(id) {
                return Err(StoreError::DuplicateRowId(id.clone()));
            }
        }
        Ok(ids)
    }
}

fn search(rows: &[Row], id: &RowId, path: &mut RowPath) -> bool {
    for (index, row) in rows.iter().enumerate() {
        path.push(index);
        if &row.id == id || search(row.children(), id, path) {
            return true;
        }
        path.pop();
    }
    false
}

fn subtree_ids(row: &Row) -> Vec<RowId> {
    let mut ids = Vec::new();
    row.walk(&mut |r| ids.push(r.id.clone()));
    ids
}

fn collect_group_depths(rows: &[Row], depth: usize, out: &mut BTreeSet<usize>) {
    for row in rows {
        if row.is_group() {
            out.insert(depth);
            collect_group_depths(row.children(), depth + 1, out);
        }
    }
}
