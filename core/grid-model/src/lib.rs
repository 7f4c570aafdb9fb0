//! FILENAME: core/grid-model/src/lib.rs
//! PURPOSE: Shared data model for the grid view engine.
//! CONTEXT: Re-exports rows, the row store, column specs, cell values and
//! coordinates for use by `view-engine` and by callers building input data.

pub mod column;
pub mod coord;
pub mod error;
pub mod row;
pub mod store;
pub mod value;

// Re-export commonly used types at the crate root
pub use column::{
    find_column, AggregateReducer, AggregationKind, AggregationSpec, ColumnSpec, RowComparator,
    SortDirection, SortStrategy, ValueGetter, ValueParser,
};
pub use coord::CellCoord;
pub use error::{StoreError, StrategyError};
pub use row::{Row, RowId};
pub use store::{RowPath, RowStore};
pub use value::{compare_text, CellValue, ValueKind, NULL_VALUE};
