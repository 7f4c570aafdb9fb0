//! FILENAME: core/grid-model/src/coord.rs
//! PURPOSE: Cell coordinates in the flattened visible-row space.
//! CONTEXT: `row` indexes the visible list the engine produces (after filter,
//! sort and expansion); `col` indexes the column set. Both are 0-based.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A cell coordinate with 0-based row and column indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CellCoord {
    pub row: usize,
    pub col: usize,
}

impl CellCoord {
    #[inline]
    pub fn new(row: usize, col: usize) -> Self {
        CellCoord { row, col }
    }
}

impl From<(usize, usize)> for CellCoord {
    fn from((row, col): (usize, usize)) -> Self {
        CellCoord { row, col }
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
