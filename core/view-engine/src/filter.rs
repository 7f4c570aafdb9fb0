//! FILENAME: core/view-engine/src/filter.rs
//! Filter Engine - per-column conditions, AND-combined.
//!
//! Evaluation dispatches on each column's DECLARED kind. A condition that
//! cannot be evaluated (malformed stored value, bad operand) keeps the row and
//! logs a warning: a data-quality problem in one column must not hide data.

use chrono::{NaiveDate, NaiveDateTime};
use grid_model::{find_column, CellValue, ColumnSpec, Row, ValueKind};
use rustc_hash::FxHashMap;

use crate::definition::{FilterCondition, FilterOperator, FilterState, FilterValue};
use crate::error::{ConditionError, EngineError};
use crate::tree::{child_path, DerivedNode};
use crate::view::UniqueValue;

// ============================================================================
// VALIDATION
// ============================================================================

/// Checks a condition before it is accepted into the filter state.
pub fn validate_condition(
    condition: &FilterCondition,
    columns: &[ColumnSpec],
) -> Result<(), EngineError> {
    let column = find_column(columns, &condition.accessor)
        .ok_or_else(|| EngineError::UnknownColumn(condition.accessor.clone()))?;

    if !column.filterable {
        return Err(EngineError::NotFilterable(condition.accessor.clone()));
    }
    if !condition.operator.is_legal_for(column.kind) {
        return Err(EngineError::IllegalOperator {
            operator: condition.operator,
            kind: column.kind,
        });
    }

    let expected = condition.operator.arity();
    let actual = condition.value.arity();
    if expected != actual {
        return Err(EngineError::OperandMismatch {
            operator: condition.operator,
            expected,
            actual,
        });
    }
    Ok(())
}

// ============================================================================
// ROW EVALUATION
// ============================================================================

/// True when the row passes every condition. Failing conditions count as passed.
pub fn evaluate(row: &Row, filters: &FilterState, columns: &[ColumnSpec]) -> bool {
    filters.iter().all(|condition| {
        let column = find_column(columns, &condition.accessor);
        match evaluate_condition(row, condition, column) {
            Ok(passes) => passes,
            Err(err) => {
                log::warn!(
                    "filter on '{}' could not be evaluated for row {}: {}; keeping row",
                    condition.accessor,
                    row.id,
                    err
                );
                true
            }
        }
    })
}

/// Evaluates one condition, reporting why it could not be decided.
pub fn evaluate_condition(
    row: &Row,
    condition: &FilterCondition,
    column: Option<&ColumnSpec>,
) -> Result<bool, ConditionError> {
    let column = column.ok_or_else(|| ConditionError::UnknownColumn(condition.accessor.clone()))?;
    let value = column.key(row);
    let op = condition.operator;

    match op {
        FilterOperator::IsEmpty => return Ok(value.is_empty()),
        FilterOperator::IsNotEmpty => return Ok(!value.is_empty()),
        _ => {}
    }

    if op.arity() != condition.value.arity() {
        return Err(ConditionError::Arity { operator: op });
    }

    match column.kind {
        ValueKind::String => evaluate_string(&value, op, &condition.value),
        ValueKind::Number => evaluate_number(&value, op, &condition.value),
        ValueKind::Boolean => evaluate_boolean(&value, op, &condition.value),
        ValueKind::Date => evaluate_date(&value, op, &condition.value),
        ValueKind::Enum => evaluate_enum(&value, op, &condition.value),
        ValueKind::Other => Err(ConditionError::Unsupported {
            operator: op,
            kind: ValueKind::Other,
        }),
    }
}

fn unsupported(op: FilterOperator, kind: ValueKind) -> ConditionError {
    ConditionError::Unsupported { operator: op, kind }
}

fn single(operand: &FilterValue) -> Option<&CellValue> {
    match operand {
        FilterValue::Single(v) => Some(v),
        _ => None,
    }
}

fn pair(operand: &FilterValue) -> Option<(&CellValue, &CellValue)> {
    match operand {
        FilterValue::Pair(a, b) => Some((a, b)),
        _ => None,
    }
}

// ----------------------------------------------------------------------------
// String
// ----------------------------------------------------------------------------

fn evaluate_string(
    value: &CellValue,
    op: FilterOperator,
    operand: &FilterValue,
) -> Result<bool, ConditionError> {
    let needle = single(operand)
        .ok_or(ConditionError::Arity { operator: op })?
        .display_value()
        .to_lowercase();
    let text = value.display_value().to_lowercase();

    match op {
        FilterOperator::Equals => Ok(text == needle),
        FilterOperator::NotEquals => Ok(text != needle),
        FilterOperator::Contains => Ok(text.contains(&needle)),
        FilterOperator::NotContains => Ok(!text.contains(&needle)),
        FilterOperator::StartsWith => Ok(text.starts_with(&needle)),
        FilterOperator::EndsWith => Ok(text.ends_with(&needle)),
        _ => Err(unsupported(op, ValueKind::String)),
    }
}

// ----------------------------------------------------------------------------
// Number
// ----------------------------------------------------------------------------

/// Reads a stored number. Numeric text is accepted; other text is malformed.
fn stored_number(value: &CellValue) -> Result<Option<f64>, ConditionError> {
    match value {
        CellValue::Null => Ok(None),
        CellValue::Number(n) => Ok(Some(*n)),
        CellValue::Text(s) if s.trim().is_empty() => Ok(None),
        CellValue::Text(s) => s.trim().parse::<f64>().map(Some).map_err(|_| {
            ConditionError::MalformedValue {
                value: s.clone(),
                kind: ValueKind::Number,
            }
        }),
        other => Err(ConditionError::MalformedValue {
            value: other.display_value(),
            kind: ValueKind::Number,
        }),
    }
}

fn operand_number(value: &CellValue) -> Result<f64, ConditionError> {
    match value {
        CellValue::Number(n) => Ok(*n),
        CellValue::Text(s) => s.trim().parse::<f64>().map_err(|_| ConditionError::MalformedOperand {
            value: s.clone(),
            kind: ValueKind::Number,
        }),
        other => Err(ConditionError::MalformedOperand {
            value: other.display_value(),
            kind: ValueKind::Number,
        }),
    }
}

fn evaluate_number(
    value: &CellValue,
    op: FilterOperator,
    operand: &FilterValue,
) -> Result<bool, ConditionError> {
    let stored = stored_number(value)?;

    if matches!(op, FilterOperator::Between | FilterOperator::NotBetween) {
        let (low, high) = pair(operand).ok_or(ConditionError::Arity { operator: op })?;
        let (low, high) = (operand_number(low)?, operand_number(high)?);
        let inside = stored.is_some_and(|n| n >= low.min(high) && n <= low.max(high));
        return Ok(if op == FilterOperator::Between { inside } else { !inside });
    }

    let target = operand_number(single(operand).ok_or(ConditionError::Arity { operator: op })?)?;
    let Some(n) = stored else {
        // An empty cell equals nothing and compares with nothing
        return Ok(op == FilterOperator::NotEquals);
    };
    match op {
        FilterOperator::Equals => Ok(n == target),
        FilterOperator::NotEquals => Ok(n != target),
        FilterOperator::GreaterThan => Ok(n > target),
        FilterOperator::LessThan => Ok(n < target),
        FilterOperator::GreaterOrEqual => Ok(n >= target),
        FilterOperator::LessOrEqual => Ok(n <= target),
        _ => Err(unsupported(op, ValueKind::Number)),
    }
}

// ----------------------------------------------------------------------------
// Boolean
// ----------------------------------------------------------------------------

fn as_boolean(value: &CellValue) -> Option<bool> {
    match value {
        CellValue::Boolean(b) => Some(*b),
        CellValue::Text(s) if s.eq_ignore_ascii_case("true") => Some(true),
        CellValue::Text(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn evaluate_boolean(
    value: &CellValue,
    op: FilterOperator,
    operand: &FilterValue,
) -> Result<bool, ConditionError> {
    if op != FilterOperator::Equals {
        return Err(unsupported(op, ValueKind::Boolean));
    }
    let operand = single(operand).ok_or(ConditionError::Arity { operator: op })?;
    let target = as_boolean(operand).ok_or_else(|| ConditionError::MalformedOperand {
        value: operand.display_value(),
        kind: ValueKind::Boolean,
    })?;
    match value {
        CellValue::Null => Ok(false),
        other => as_boolean(other)
            .map(|b| b == target)
            .ok_or_else(|| ConditionError::MalformedValue {
                value: other.display_value(),
                kind: ValueKind::Boolean,
            }),
    }
}

// ----------------------------------------------------------------------------
// Date
// ----------------------------------------------------------------------------

/// Parses a date, dropping the time of day.
fn parse_day(value: &CellValue) -> Option<NaiveDate> {
    match value {
        CellValue::Date(d) => Some(d.date()),
        CellValue::Text(s) => {
            let s = s.trim();
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok().map(|d| d.date()))
                .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok().map(|d| d.date()))
                .or_else(|| chrono::DateTime::parse_from_rfc3339(s).ok().map(|d| d.date_naive()))
        }
        _ => None,
    }
}

fn operand_day(value: &CellValue) -> Result<NaiveDate, ConditionError> {
    parse_day(value).ok_or_else(|| ConditionError::MalformedOperand {
        value: value.display_value(),
        kind: ValueKind::Date,
    })
}

fn evaluate_date(
    value: &CellValue,
    op: FilterOperator,
    operand: &FilterValue,
) -> Result<bool, ConditionError> {
    let stored = if value.is_empty() {
        None
    } else {
        Some(parse_day(value).ok_or_else(|| ConditionError::MalformedValue {
            value: value.display_value(),
            kind: ValueKind::Date,
        })?)
    };

    if matches!(op, FilterOperator::Between | FilterOperator::NotBetween) {
        let (start, end) = pair(operand).ok_or(ConditionError::Arity { operator: op })?;
        let (start, end) = (operand_day(start)?, operand_day(end)?);
        let inside = stored.is_some_and(|d| d >= start.min(end) && d <= start.max(end));
        return Ok(if op == FilterOperator::Between { inside } else { !inside });
    }

    let target = operand_day(single(operand).ok_or(ConditionError::Arity { operator: op })?)?;
    let Some(day) = stored else {
        return Ok(op == FilterOperator::NotEquals);
    };
    match op {
        FilterOperator::Equals => Ok(day == target),
        FilterOperator::NotEquals => Ok(day != target),
        FilterOperator::Before => Ok(day < target),
        FilterOperator::After => Ok(day > target),
        _ => Err(unsupported(op, ValueKind::Date)),
    }
}

// ----------------------------------------------------------------------------
// Enum
// ----------------------------------------------------------------------------

fn evaluate_enum(
    value: &CellValue,
    op: FilterOperator,
    operand: &FilterValue,
) -> Result<bool, ConditionError> {
    let FilterValue::List(options) = operand else {
        return Err(ConditionError::Arity { operator: op });
    };
    let label = value.display_value();
    let found = options.iter().any(|o| o.display_value() == label);
    match op {
        FilterOperator::In => Ok(found),
        FilterOperator::NotIn => Ok(!found),
        _ => Err(unsupported(op, ValueKind::Enum)),
    }
}

// ============================================================================
// TREE FILTERING
// ============================================================================

/// Filters a row forest.
///
/// Leaves are kept when they pass. A group is kept when any descendant
/// survives (carrying only the survivors), or when the group row itself
/// passes (carrying whatever children survived, possibly none). A group row
/// with no value in the filtered column still passes operators that accept
/// empty cells, such as `isEmpty` or `notEquals`, and shows as a bare header.
pub fn filter_nodes<'a>(
    rows: &'a [Row],
    parent: &[usize],
    filters: &FilterState,
    columns: &[ColumnSpec],
) -> Vec<DerivedNode<'a>> {
    rows.iter()
        .enumerate()
        .filter_map(|(index, row)| {
            let path = child_path(parent, index);
            let children = filter_nodes(row.children(), &path, filters, columns);
            let keep = if row.is_group() && !children.is_empty() {
                true
            } else {
                evaluate(row, filters, columns)
            };
            keep.then(|| DerivedNode {
                row,
                path,
                original_index: index,
                children,
            })
        })
        .collect()
}

/// Pure form of the filter stage: returns the surviving rows as a new tree.
pub fn filter_rows(rows: &[Row], filters: &FilterState, columns: &[ColumnSpec]) -> Vec<Row> {
    filter_nodes(rows, &[], filters, columns)
        .iter()
        .map(DerivedNode::to_row)
        .collect()
}

// ============================================================================
// UNIQUE VALUES
// ============================================================================

/// Distinct display values of a column across all leaf rows, with counts,
/// sorted by the column's value ordering. Empty cells are reported as "".
pub fn unique_values(rows: &[Row], column: &ColumnSpec) -> Vec<UniqueValue> {
    let mut counts: FxHashMap<String, (CellValue, u32)> = FxHashMap::default();
    for root in rows {
        root.walk(&mut |row| {
            if row.is_group() {
                return;
            }
            let value = column.key(row);
            counts
                .entry(value.display_value())
                .or_insert_with(|| (value, 0))
                .1 += 1;
        });
    }

    let mut values: Vec<(CellValue, UniqueValue)> = counts
        .into_iter()
        .map(|(label, (value, count))| (value, UniqueValue { value: label, count }))
        .collect();
    values.sort_by(|(a, ua), (b, ub)| a.compare(b).then_with(|| ua.value.cmp(&ub.value)));
    values.into_iter().map(|(_, unique)| unique).collect()
}
