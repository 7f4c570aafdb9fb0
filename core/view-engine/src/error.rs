//! FILENAME: core/view-engine/src/error.rs

use grid_model::{StoreError, StrategyError, ValueKind};
use thiserror::Error;

use crate::definition::{FilterOperator, OperandArity};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Row store error: {0}")]
    Store(#[from] StoreError),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Operator {operator:?} is not valid for {kind:?} columns")]
    IllegalOperator {
        operator: FilterOperator,
        kind: ValueKind,
    },

    #[error("Operator {operator:?} expects {expected:?} operand(s), got {actual:?}")]
    OperandMismatch {
        operator: FilterOperator,
        expected: OperandArity,
        actual: OperandArity,
    },

    #[error("Column {0} is not filterable")]
    NotFilterable(String),

    #[error("Column {0} is not sortable")]
    NotSortable(String),

    #[error("Comparator for column {accessor} failed: {source}")]
    Comparator {
        accessor: String,
        #[source]
        source: StrategyError,
    },

    #[error("Page {page} is out of range (1..={total})")]
    PageOutOfRange { page: usize, total: usize },

    #[error("Page size must be at least 1")]
    InvalidPageSize,

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Discarded stale response for request {token} (latest is {latest})")]
    StaleResponse { token: u64, latest: u64 },

    #[error("No row source configured for {0}")]
    NoRowSource(&'static str),

    #[error("Column index {0} is out of range")]
    ColumnOutOfRange(usize),
}

/// Failure reported by an external data source.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct FetchError(pub String);

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        FetchError(message.into())
    }
}

/// Why a single condition could not be evaluated against a row.
/// These never drop a row: the filter engine keeps the row and logs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConditionError {
    #[error("no column declared for accessor {0}")]
    UnknownColumn(String),

    #[error("stored value {value:?} is not a valid {kind:?}")]
    MalformedValue { value: String, kind: ValueKind },

    #[error("operand {value:?} is not a valid {kind:?}")]
    MalformedOperand { value: String, kind: ValueKind },

    #[error("operator {operator:?} cannot be evaluated for {kind:?} columns")]
    Unsupported {
        operator: FilterOperator,
        kind: ValueKind,
    },

    #[error("operator {operator:?} received the wrong number of operands")]
    Arity { operator: FilterOperator },
}
