//! FILENAME: core/view-engine/src/lib.rs
//! Grid view engine.
//!
//! Turns a hierarchical row store plus user intent (filters, sort, expansion,
//! paging, selection) into the flat list of rows a renderer draws. It depends
//! on `grid-model` for rows, columns and values.
//!
//! Layers:
//! - `definition`: Serializable options and view state (what the user asked for)
//! - `tree`, `filter`, `sort`, `aggregate`: The derivation pipeline
//! - `expansion`, `pagination`: Shaping the derived tree into pages
//! - `view`: Renderable output (WHAT we display)
//! - `selection`, `interaction`: Pointer-driven state
//! - `source`, `listener`: The async data boundary and outbound callbacks
//! - `engine`: The controller that owns all of it

pub mod definition;
pub mod error;
pub mod tree;
pub mod filter;
pub mod sort;
pub mod aggregate;
pub mod expansion;
pub mod pagination;
pub mod view;
pub mod selection;
pub mod interaction;
pub mod source;
pub mod listener;
pub mod engine;

pub use definition::*;
pub use error::{ConditionError, EngineError, FetchError};
pub use tree::DerivedNode;
pub use filter::{evaluate, evaluate_condition, filter_rows, validate_condition};
pub use sort::sort_rows;
pub use aggregate::{reduce_values, AggregateAccumulator};
pub use expansion::ExpansionState;
pub use pagination::{page_slice, total_pages, PageTicket, Paginator};
pub use view::*;
pub use selection::{
    classify_borders, BorderEdge, CellBorders, CellSelection, RowSelection, SelectionBounds,
};
pub use interaction::{
    HitTarget, InteractionEvent, InteractionMachine, InteractionOutcome, InteractionState,
    MIN_COLUMN_WIDTH,
};
pub use source::{NextPage, PageData, RowSource};
pub use listener::{moved_rows, RowPositions, TableListener, ViewAnimator};
pub use engine::{ChildTicket, TableEngine};

pub use grid_model;
