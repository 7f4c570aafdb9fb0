//! FILENAME: core/grid-model/src/column.rs
//! PURPOSE: Column specification and the per-column pluggable strategies.
//! CONTEXT: Custom comparators, value-getters, value parsers and custom
//! aggregation reducers are trait objects held behind `Arc`, so a column set
//! can be cloned cheaply and shared across recomputations. Closures with the
//! right signature implement the traits automatically.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::error::StrategyError;
use crate::row::Row;
use crate::value::{CellValue, ValueKind};

// ============================================================================
// SORT DIRECTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Applies the direction to an ascending ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

// ============================================================================
// STRATEGY TRAITS
// ============================================================================

/// Full override of row ordering for a column. Receives the direction and is
/// responsible for honouring it.
pub trait RowComparator: Send + Sync {
    fn compare(&self, a: &Row, b: &Row, direction: SortDirection) -> Result<Ordering, StrategyError>;
}

impl<F> RowComparator for F
where
    F: Fn(&Row, &Row, SortDirection) -> Result<Ordering, StrategyError> + Send + Sync,
{
    fn compare(&self, a: &Row, b: &Row, direction: SortDirection) -> Result<Ordering, StrategyError> {
        self(a, b, direction)
    }
}

/// Extracts a derived sort/filter key distinct from the raw cell value.
pub trait ValueGetter: Send + Sync {
    fn value(&self, row: &Row) -> CellValue;
}

impl<F> ValueGetter for F
where
    F: Fn(&Row) -> CellValue + Send + Sync,
{
    fn value(&self, row: &Row) -> CellValue {
        self(row)
    }
}

/// Coerces a stored value (often a display string) into a number for
/// aggregation. `None` means the value takes no part in numeric reductions.
pub trait ValueParser: Send + Sync {
    fn parse(&self, value: &CellValue) -> Option<f64>;
}

impl<F> ValueParser for F
where
    F: Fn(&CellValue) -> Option<f64> + Send + Sync,
{
    fn parse(&self, value: &CellValue) -> Option<f64> {
        self(value)
    }
}

/// Reduces the collected descendant values of a group into one value.
pub trait AggregateReducer: Send + Sync {
    fn reduce(&self, values: &[CellValue]) -> CellValue;
}

impl<F> AggregateReducer for F
where
    F: Fn(&[CellValue]) -> CellValue + Send + Sync,
{
    fn reduce(&self, values: &[CellValue]) -> CellValue {
        self(values)
    }
}

// ============================================================================
// AGGREGATION SPEC
// ============================================================================

/// How a group reduces its descendant values for one column.
#[derive(Clone)]
pub enum AggregationKind {
    Sum,
    Average,
    Min,
    Max,
    Count,
    Custom(Arc<dyn AggregateReducer>),
}

impl fmt::Debug for AggregationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationKind::Sum => f.write_str("Sum"),
            AggregationKind::Average => f.write_str("Average"),
            AggregationKind::Min => f.write_str("Min"),
            AggregationKind::Max => f.write_str("Max"),
            AggregationKind::Count => f.write_str("Count"),
            AggregationKind::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AggregationSpec {
    pub kind: AggregationKind,
    pub parse_value: Option<Arc<dyn ValueParser>>,
}

impl AggregationSpec {
    pub fn new(kind: AggregationKind) -> Self {
        AggregationSpec {
            kind,
            parse_value: None,
        }
    }

    pub fn sum() -> Self {
        Self::new(AggregationKind::Sum)
    }

    pub fn average() -> Self {
        Self::new(AggregationKind::Average)
    }

    pub fn min() -> Self {
        Self::new(AggregationKind::Min)
    }

    pub fn max() -> Self {
        Self::new(AggregationKind::Max)
    }

    pub fn count() -> Self {
        Self::new(AggregationKind::Count)
    }

    pub fn custom(reducer: impl AggregateReducer + 'static) -> Self {
        Self::new(AggregationKind::Custom(Arc::new(reducer)))
    }

    pub fn with_parser(mut self, parser: impl ValueParser + 'static) -> Self {
        self.parse_value = Some(Arc::new(parser));
        self
    }
}

impl fmt::Debug for dyn ValueParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValueParser")
    }
}

// ============================================================================
// SORT STRATEGY
// ============================================================================

/// Which key-resolution rule a column sorts by, in precedence order.
#[derive(Clone, Copy)]
pub enum SortStrategy<'a> {
    /// The comparator decides the ordering outright, direction included.
    Comparator(&'a dyn RowComparator),
    /// Rows compare by the key the getter derives.
    Getter(&'a dyn ValueGetter),
    /// Rows compare by the raw cell value.
    Raw,
}

// ============================================================================
// COLUMN SPEC
// ============================================================================

/// Describes one column of the grid.
#[derive(Clone)]
pub struct ColumnSpec {
    /// Key into `Row::cells`.
    pub accessor: String,

    /// Header label. Defaults to the accessor.
    pub label: String,

    /// Declared kind; filter evaluation dispatches on this.
    pub kind: ValueKind,

    pub sortable: bool,
    pub filterable: bool,

    pub comparator: Option<Arc<dyn RowComparator>>,
    pub value_getter: Option<Arc<dyn ValueGetter>>,
    pub aggregation: Option<AggregationSpec>,
}

impl ColumnSpec {
    pub fn new(accessor: impl Into<String>, kind: ValueKind) -> Self {
        let accessor = accessor.into();
        ColumnSpec {
            label: accessor.clone(),
            accessor,
            kind,
            sortable: true,
            filterable: true,
            comparator: None,
            value_getter: None,
            aggregation: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_comparator(mut self, comparator: impl RowComparator + 'static) -> Self {
        self.comparator = Some(Arc::new(comparator));
        self
    }

    pub fn with_value_getter(mut self, getter: impl ValueGetter + 'static) -> Self {
        self.value_getter = Some(Arc::new(getter));
        self
    }

    pub fn with_aggregation(mut self, aggregation: AggregationSpec) -> Self {
        self.aggregation = Some(aggregation);
        self
    }

    pub fn not_sortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    pub fn not_filterable(mut self) -> Self {
        self.filterable = false;
        self
    }

    /// The value filters and sorts see: the getter's key when declared,
    /// otherwise the raw cell.
    pub fn key(&self, row: &Row) -> CellValue {
        match &self.value_getter {
            Some(getter) => getter.value(row),
            None => row.get(&self.accessor).clone(),
        }
    }

    pub fn sort_strategy(&self) -> SortStrategy<'_> {
        if let Some(comparator) = &self.comparator {
            SortStrategy::Comparator(comparator.as_ref())
        } else if let Some(getter) = &self.value_getter {
            SortStrategy::Getter(getter.as_ref())
        } else {
            SortStrategy::Raw
        }
    }
}

impl fmt::Debug for ColumnSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnSpec")
            .field("accessor", &self.accessor)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("sortable", &self.sortable)
            .field("filterable", &self.filterable)
            .field("comparator", &self.comparator.is_some())
            .field("value_getter", &self.value_getter.is_some())
            .field("aggregation", &self.aggregation)
            .finish()
    }
}

/// Finds a column by accessor.
pub fn find_column<'a>(columns: &'a [ColumnSpec], accessor: &str) -> Option<&'a ColumnSpec> {
    columns.iter().find(|c| c.accessor == accessor)
}
