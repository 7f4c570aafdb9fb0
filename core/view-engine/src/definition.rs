//! FILENAME: core/view-engine/src/definition.rs
//! View Definition - The serializable state and options.
//!
//! This module contains all the types needed to DESCRIBE a table view.
//! These structures are designed to be:
//! - Serializable (for saving/restoring user intent)
//! - Mirrored to external listeners after each committed change
//! - Immutable snapshots of user intent
//!
//! Row data and column strategies live in `grid-model`; nothing here holds rows.

use grid_model::{CellValue, RowId, SortDirection, ValueKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// FILTER OPERATORS
// ============================================================================

/// Filter operators. Which ones are legal depends on the column's declared kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    IsEmpty,
    IsNotEmpty,
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    Between,
    NotBetween,
    Before,
    After,
    In,
    NotIn,
}

/// How many operand values an operator takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandArity {
    None,
    Single,
    Pair,
    List,
}

impl FilterOperator {
    pub fn arity(self) -> OperandArity {
        use FilterOperator::*;
        match self {
            IsEmpty | IsNotEmpty => OperandArity::None,
            Between | NotBetween => OperandArity::Pair,
            In | NotIn => OperandArity::List,
            _ => OperandArity::Single,
        }
    }

    /// Operator set per declared kind. Empty checks apply to every kind.
    pub fn is_legal_for(self, kind: ValueKind) -> bool {
        use FilterOperator::*;
        if matches!(self, IsEmpty | IsNotEmpty) {
            return true;
        }
        match kind {
            ValueKind::String => matches!(
                self,
                Equals | NotEquals | Contains | NotContains | StartsWith | EndsWith
            ),
            ValueKind::Number => matches!(
                self,
                Equals
                    | NotEquals
                    | GreaterThan
                    | LessThan
                    | GreaterOrEqual
                    | LessOrEqual
                    | Between
                    | NotBetween
            ),
            ValueKind::Boolean => matches!(self, Equals),
            ValueKind::Date => matches!(
                self,
                Equals | NotEquals | Before | After | Between | NotBetween
            ),
            ValueKind::Enum => matches!(self, In | NotIn),
            ValueKind::Other => false,
        }
    }
}

// ============================================================================
// FILTER CONDITIONS
// ============================================================================

/// The operand(s) of a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "arity", content = "values", rename_all = "camelCase")]
pub enum FilterValue {
    #[default]
    None,
    Single(CellValue),
    Pair(CellValue, CellValue),
    List(Vec<CellValue>),
}

impl FilterValue {
    pub fn arity(&self) -> OperandArity {
        match self {
            FilterValue::None => OperandArity::None,
            FilterValue::Single(_) => OperandArity::Single,
            FilterValue::Pair(_, _) => OperandArity::Pair,
            FilterValue::List(_) => OperandArity::List,
        }
    }
}

/// One column condition. At most one is active per accessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCondition {
    pub accessor: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: FilterValue,
}

impl FilterCondition {
    pub fn new(accessor: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        FilterCondition {
            accessor: accessor.into(),
            operator,
            value,
        }
    }

    /// A single-operand condition such as `age greaterThan 30`.
    pub fn single(
        accessor: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<CellValue>,
    ) -> Self {
        Self::new(accessor, operator, FilterValue::Single(value.into()))
    }

    pub fn between(
        accessor: impl Into<String>,
        low: impl Into<CellValue>,
        high: impl Into<CellValue>,
    ) -> Self {
        Self::new(
            accessor,
            FilterOperator::Between,
            FilterValue::Pair(low.into(), high.into()),
        )
    }

    pub fn one_of<V: Into<CellValue>>(
        accessor: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::new(
            accessor,
            FilterOperator::In,
            FilterValue::List(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn is_empty(accessor: impl Into<String>) -> Self {
        Self::new(accessor, FilterOperator::IsEmpty, FilterValue::None)
    }

    pub fn is_not_empty(accessor: impl Into<String>) -> Self {
        Self::new(accessor, FilterOperator::IsNotEmpty, FilterValue::None)
    }
}

/// Active conditions keyed by accessor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterState {
    conditions: BTreeMap<String, FilterCondition>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the condition for its accessor, returning the one it replaced.
    pub fn set(&mut self, condition: FilterCondition) -> Option<FilterCondition> {
        self.conditions.insert(condition.accessor.clone(), condition)
    }

    pub fn remove(&mut self, accessor: &str) -> Option<FilterCondition> {
        self.conditions.remove(accessor)
    }

    pub fn clear(&mut self) {
        self.conditions.clear();
    }

    pub fn get(&self, accessor: &str) -> Option<&FilterCondition> {
        self.conditions.get(accessor)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterCondition> {
        self.conditions.values()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl FromIterator<FilterCondition> for FilterState {
    fn from_iter<I: IntoIterator<Item = FilterCondition>>(iter: I) -> Self {
        let mut state = FilterState::new();
        for condition in iter {
            state.set(condition);
        }
        state
    }
}

// ============================================================================
// SORT STATE
// ============================================================================

/// The single active sort. `None` at the call sites means original order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortState {
    pub accessor: String,
    pub direction: SortDirection,
}

impl SortState {
    pub fn ascending(accessor: impl Into<String>) -> Self {
        SortState {
            accessor: accessor.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(accessor: impl Into<String>) -> Self {
        SortState {
            accessor: accessor.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Header-click cycle: none → ascending → descending → none.
/// Clicking a different column starts that column at ascending.
pub fn next_sort_state(current: Option<&SortState>, accessor: &str) -> Option<SortState> {
    match current {
        Some(state) if state.accessor == accessor => match state.direction {
            SortDirection::Ascending => Some(SortState::descending(accessor)),
            SortDirection::Descending => None,
        },
        _ => Some(SortState::ascending(accessor)),
    }
}

// ============================================================================
// PAGINATION OPTIONS
// ============================================================================

/// Where pages come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum PaginationMode {
    /// The engine holds every row and slices pages locally.
    #[default]
    Client,
    /// The supplied rows are exactly one page fetched externally.
    Server,
    /// Pages are fetched and appended; nothing is discarded.
    Infinite,
}

// ============================================================================
// TABLE OPTIONS
// ============================================================================

/// Engine configuration supplied at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableOptions {
    pub pagination_mode: PaginationMode,

    /// In client mode, whether the visible list is sliced into pages at all.
    pub should_paginate: bool,

    pub page_size: usize,

    /// Total row count reported by the server (server mode only).
    pub server_total_rows: Option<usize>,

    /// Expand every group depth initially.
    pub expand_all: bool,

    /// Initial expanded depths. Takes precedence over `expand_all` when set.
    pub expanded_depths: Option<BTreeSet<usize>>,

    /// Names of the grouping levels, outermost first. Index = tree depth.
    pub row_grouping: Vec<String>,

    pub selectable_cells: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        TableOptions {
            pagination_mode: PaginationMode::Client,
            should_paginate: false,
            page_size: 20,
            server_total_rows: None,
            expand_all: true,
            expanded_depths: None,
            row_grouping: Vec::new(),
            selectable_cells: true,
        }
    }
}

// ============================================================================
// STATE SNAPSHOT
// ============================================================================

/// A per-row expansion override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowExpansion {
    pub id: RowId,
    pub depth: usize,
    pub expanded: bool,
}

/// Exportable snapshot of the user-controlled view state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableState {
    pub filters: FilterState,
    pub sort: Option<SortState>,
    pub expanded_depths: BTreeSet<usize>,
    pub row_overrides: Vec<RowExpansion>,
    pub current_page: usize,
    pub page_size: usize,
}
