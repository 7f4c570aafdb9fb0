//! FILENAME: core/grid-model/src/row.rs
//! PURPOSE: Defines a grid row: a stable id, its cells, and optional children.
//! CONTEXT: A row that owns a children list is a group row. A row can also be
//! declared a lazy group, meaning its children are fetched on first expand.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value::{CellValue, NULL_VALUE};

/// Stable identifier of a row. Unique within one row tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Number(n) => write!(f, "{}", n),
            RowId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RowId {
    fn from(value: i64) -> Self {
        RowId::Number(value)
    }
}

impl From<i32> for RowId {
    fn from(value: i32) -> Self {
        RowId::Number(value as i64)
    }
}

impl From<&str> for RowId {
    fn from(value: &str) -> Self {
        RowId::Text(value.to_string())
    }
}

impl From<String> for RowId {
    fn from(value: String) -> Self {
        RowId::Text(value)
    }
}

/// A single row of input data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub id: RowId,

    /// Cell values keyed by column accessor.
    #[serde(default)]
    pub cells: FxHashMap<String, CellValue>,

    /// Child rows. `Some` marks a group row, even when the list is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Row>>,

    /// The row is a group whose children have not been fetched yet.
    #[serde(default)]
    pub lazy_children: bool,
}

impl Row {
    pub fn new(id: impl Into<RowId>) -> Self {
        Row {
            id: id.into(),
            cells: FxHashMap::default(),
            children: None,
            lazy_children: false,
        }
    }

    /// Builder-style cell setter.
    pub fn with(mut self, accessor: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.cells.insert(accessor.into(), value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Row>) -> Self {
        self.children = Some(children);
        self.lazy_children = false;
        self
    }

    /// Marks the row as a group whose children arrive on first expand.
    pub fn lazy_group(mut self) -> Self {
        self.children = None;
        self.lazy_children = true;
        self
    }

    /// Returns the value for an accessor, or null when the row has none.
    pub fn get(&self, accessor: &str) -> &CellValue {
        self.cells.get(accessor).unwrap_or(&NULL_VALUE)
    }

    pub fn set(&mut self, accessor: impl Into<String>, value: CellValue) -> Option<CellValue> {
        self.cells.insert(accessor.into(), value)
    }

    pub fn is_group(&self) -> bool {
        self.children.is_some() || self.lazy_children
    }

    /// True when the row is a lazy group still waiting for its children.
    pub fn needs_children(&self) -> bool {
        self.lazy_children && self.children.is_none()
    }

    pub fn children(&self) -> &[Row] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Visits this row and every descendant in pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Row)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }
}
