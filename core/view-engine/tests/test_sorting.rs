//! FILENAME: core/view-engine/tests/test_sorting.rs
//! PURPOSE: Sort behaviour, header click cycling and column strategies.

mod common;

use common::*;
use view_engine::grid_model::{CellValue, ColumnSpec, Row, SortDirection, StrategyError, ValueKind};
use view_engine::{sort_rows, EngineError, SortState, TableEngine, TableOptions};

#[test]
fn test_names_sort_case_folded() {
    let rows = vec![
        Row::new(1).with("name", "Bob"),
        Row::new(2).with("name", "alice"),
        Row::new(3).with("name", "Carl"),
    ];
    let columns = vec![ColumnSpec::new("name", ValueKind::String)];
    let mut engine = TableEngine::new(rows, columns, TableOptions::default()).unwrap();

    engine.apply_sort_state(Some(SortState::ascending("name"))).unwrap();
    let names: Vec<String> = engine
        .get_visible_rows()
        .iter()
        .map(|r| r.cells["name"].display_value())
        .collect();
    assert_eq!(names, vec!["alice", "Bob", "Carl"]);
}

#[test]
fn test_three_clicks_return_to_original_order() {
    let mut engine = TableEngine::new(people(), people_columns(), TableOptions::default()).unwrap();
    let original = ids(engine.get_visible_rows());

    engine.toggle_sort("age").unwrap();
    assert_eq!(ids(engine.get_visible_rows()), vec!["1", "4", "2", "3", "5"]);
    engine.toggle_sort("age").unwrap();
    assert_eq!(ids(engine.get_visible_rows()), vec!["5", "3", "2", "4", "1"]);
    assert_eq!(engine.toggle_sort("age").unwrap(), None);
    assert_eq!(ids(engine.get_visible_rows()), original);
}

#[test]
fn test_clicking_another_column_starts_ascending() {
    let mut engine = TableEngine::new(people(), people_columns(), TableOptions::default()).unwrap();
    engine.toggle_sort("age").unwrap();
    engine.toggle_sort("age").unwrap();
    let state = engine.toggle_sort("name").unwrap();
    assert_eq!(state, Some(SortState::ascending("name")));
}

#[test]
fn test_equal_keys_keep_original_order() {
    let rows: Vec<Row> = (0..6i64)
        .map(|i| Row::new(i).with("bucket", i % 2))
        .collect();
    let columns = vec![ColumnSpec::new("bucket", ValueKind::Number)];
    let mut engine = TableEngine::new(rows, columns, TableOptions::default()).unwrap();

    engine.apply_sort_state(Some(SortState::ascending("bucket"))).unwrap();
    assert_eq!(ids(engine.get_visible_rows()), vec!["0", "2", "4", "1", "3", "5"]);

    engine.apply_sort_state(Some(SortState::descending("bucket"))).unwrap();
    assert_eq!(ids(engine.get_visible_rows()), vec!["1", "3", "5", "0", "2", "4"]);
}

#[test]
fn test_groups_sort_their_children() {
    let mut engine = TableEngine::new(departments(), department_columns(), TableOptions::default()).unwrap();
    engine.apply_sort_state(Some(SortState::descending("salary"))).unwrap();
    // Groups carry no salary of their own, so they keep their order
    assert_eq!(
        ids(engine.get_visible_rows()),
        vec!["eng", "12", "11", "10", "ops", "21", "20"]
    );
}

#[test]
fn test_value_getter_drives_the_order() {
    let columns = vec![ColumnSpec::new("name", ValueKind::String)
        .with_value_getter(|row: &Row| CellValue::from(row.get("name").display_value().len() as f64))];
    let mut engine = TableEngine::new(people(), columns, TableOptions::default()).unwrap();
    engine.apply_sort_state(Some(SortState::ascending("name"))).unwrap();
    // Lengths: Ann 3, Bob 3, alice 5, Carl 4, Dora 4
    assert_eq!(ids(engine.get_visible_rows()), vec!["1", "2", "4", "5", "3"]);
}

#[test]
fn test_comparator_receives_direction() {
    let columns = vec![ColumnSpec::new("age", ValueKind::Number).with_comparator(
        |a: &Row, b: &Row, direction: SortDirection| {
            let ordering = b.get("age").compare(a.get("age"));
            Ok::<_, StrategyError>(direction.apply(ordering))
        },
    )];
    let mut engine = TableEngine::new(people(), columns, TableOptions::default()).unwrap();
    engine.apply_sort_state(Some(SortState::ascending("age"))).unwrap();
    assert_eq!(ids(engine.get_visible_rows()), vec!["5", "3", "2", "4", "1"]);
}

#[test]
fn test_unknown_and_unsortable_columns() {
    let columns = vec![
        ColumnSpec::new("name", ValueKind::String).not_sortable(),
        ColumnSpec::new("age", ValueKind::Number),
    ];
    let mut engine = TableEngine::new(people(), columns, TableOptions::default()).unwrap();
    assert_eq!(
        engine.apply_sort_state(Some(SortState::ascending("weight"))),
        Err(EngineError::UnknownColumn("weight".to_string()))
    );
    assert_eq!(engine.toggle_sort("name").unwrap(), None);
    assert!(engine.get_sort_state().is_none());
}

#[test]
fn test_pure_sort_over_owned_rows() {
    let sorted = sort_rows(&people(), Some(&SortState::descending("name")), &people_columns()).unwrap();
    let names: Vec<String> = sorted.iter().map(|r| r.get("name").display_value()).collect();
    assert_eq!(names, vec!["Dora", "Carl", "Bob", "Ann", "alice"]);
}
