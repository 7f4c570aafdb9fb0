//! FILENAME: core/grid-model/src/error.rs

use thiserror::Error;

use crate::row::RowId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Row not found: {0}")]
    RowNotFound(RowId),

    #[error("Duplicate row id: {0}")]
    DuplicateRowId(RowId),

    #[error("Row {id} is not reachable through the given ancestor path")]
    PathMismatch { id: RowId },

    #[error("Row {0} is not a group row")]
    NotAGroup(RowId),

    #[error("Updated row must keep id {expected}, got {actual}")]
    IdChanged { expected: RowId, actual: RowId },
}

/// Failure raised by a caller-supplied column strategy (comparator, getter).
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct StrategyError(pub String);

impl StrategyError {
    pub fn new(message: impl Into<String>) -> Self {
        StrategyError(message.into())
    }
}
