//! FILENAME: core/view-engine/tests/test_pagination.rs
//! PURPOSE: Client, server and infinite pagination, including stale responses.

mod common;

use common::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use view_engine::grid_model::{ColumnSpec, Row, RowId, StoreError, ValueKind};
use view_engine::{
    EngineError, FetchError, NextPage, PageData, PaginationMode, TableEngine, TableOptions,
};

fn columns() -> Vec<ColumnSpec> {
    vec![ColumnSpec::new("n", ValueKind::Number)]
}

fn client(rows: usize, page_size: usize) -> TableEngine {
    let options = TableOptions {
        should_paginate: true,
        page_size,
        ..TableOptions::default()
    };
    TableEngine::new(numbered(0, rows), columns(), options).unwrap()
}

fn server_options(total: usize) -> TableOptions {
    TableOptions {
        pagination_mode: PaginationMode::Server,
        page_size: 10,
        server_total_rows: Some(total),
        ..TableOptions::default()
    }
}

fn infinite_options() -> TableOptions {
    TableOptions {
        pagination_mode: PaginationMode::Infinite,
        page_size: 10,
        ..TableOptions::default()
    }
}

// ============================================================================
// CLIENT MODE
// ============================================================================

#[test]
fn test_client_pages_and_last_page_length() {
    let mut engine = client(23, 10);
    assert_eq!(engine.get_total_pages(), 3);
    assert_eq!(engine.get_visible_rows().len(), 10);
    assert_eq!(engine.get_visible_rows()[0].id.to_string(), "0");

    engine.set_client_page(3).unwrap();
    assert_eq!(ids(engine.get_visible_rows()), vec!["20", "21", "22"]);

    let info = engine.page_info();
    assert_eq!((info.current_page, info.total_pages, info.total_rows), (3, 3, 23));
}

#[test]
fn test_client_page_out_of_range() {
    let mut engine = client(23, 10);
    assert_eq!(
        engine.set_client_page(4),
        Err(EngineError::PageOutOfRange { page: 4, total: 3 })
    );
    assert!(engine.set_client_page(0).is_err());
    assert_eq!(engine.get_current_page(), 1);
}

#[test]
fn test_empty_list_has_one_page() {
    let engine = client(0, 10);
    assert_eq!(engine.get_total_pages(), 1);
    assert!(engine.get_visible_rows().is_empty());
}

#[test]
fn test_unpaginated_client_shows_everything() {
    let engine = TableEngine::new(numbered(0, 50), columns(), TableOptions::default()).unwrap();
    assert_eq!(engine.get_total_pages(), 1);
    assert_eq!(engine.get_visible_rows().len(), 50);
}

#[test]
fn test_page_size_change_returns_to_first_page() {
    let mut engine = client(23, 10);
    engine.set_client_page(2).unwrap();
    engine.set_page_size(5).unwrap();
    assert_eq!(engine.get_current_page(), 1);
    assert_eq!(engine.get_total_pages(), 5);
    assert_eq!(engine.set_page_size(0), Err(EngineError::InvalidPageSize));
}

#[test]
fn test_deleting_rows_clamps_the_page() {
    let mut engine = client(11, 10);
    engine.set_client_page(2).unwrap();
    engine.delete_row(&row_id(10), None).unwrap();
    assert_eq!(engine.get_current_page(), 1);
    assert_eq!(engine.get_total_pages(), 1);
}

#[tokio::test]
async fn test_async_set_page_in_client_mode() {
    let mut engine = client(23, 10);
    engine.set_page(2).await.unwrap();
    assert_eq!(engine.get_visible_rows()[0].id.to_string(), "10");
}

// ============================================================================
// SERVER MODE
// ============================================================================

#[tokio::test]
async fn test_server_page_fetch_replaces_rows() {
    let source = Arc::new(PagedSource::new(25));
    let mut engine = TableEngine::new(numbered(0, 10), columns(), server_options(25))
        .unwrap()
        .with_source(source.clone());
    assert_eq!(engine.get_total_pages(), 3);

    engine.set_page(3).await.unwrap();
    assert_eq!(engine.get_current_page(), 3);
    assert_eq!(ids(engine.get_visible_rows()), vec!["20", "21", "22", "23", "24"]);
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_server_out_of_range_does_not_fetch() {
    let source = Arc::new(PagedSource::new(25));
    let mut engine = TableEngine::new(numbered(0, 10), columns(), server_options(25))
        .unwrap()
        .with_source(source.clone());
    let err = engine.set_page(4).await.unwrap_err();
    assert_eq!(err, EngineError::PageOutOfRange { page: 4, total: 3 });
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_server_failure_keeps_current_page() {
    let mut engine = TableEngine::new(numbered(0, 10), columns(), server_options(25))
        .unwrap()
        .with_source(Arc::new(PagedSource::failing(25)));

    let err = engine.set_page(2).await.unwrap_err();
    assert_eq!(err, EngineError::Fetch(FetchError::new("server unavailable")));
    assert_eq!(engine.get_current_page(), 1);
    assert_eq!(engine.get_visible_rows().len(), 10);
    assert_eq!(engine.get_visible_rows()[0].id.to_string(), "0");
}

#[tokio::test]
async fn test_server_mode_needs_a_source() {
    let mut engine = TableEngine::new(numbered(0, 10), columns(), server_options(25)).unwrap();
    assert!(matches!(engine.set_page(2).await, Err(EngineError::NoRowSource(_))));
}

#[test]
fn test_late_page_response_is_discarded() {
    let mut engine = TableEngine::new(numbered(0, 10), columns(), server_options(25)).unwrap();
    let slow = engine.begin_page_fetch(2).unwrap();
    let fast = engine.begin_page_fetch(3).unwrap();

    engine
        .complete_page_fetch(
            fast,
            Ok(PageData {
                rows: numbered(20, 5),
                total_rows: Some(25),
            }),
        )
        .unwrap();

    let stale = engine.complete_page_fetch(
        slow,
        Ok(PageData {
            rows: numbered(10, 10),
            total_rows: Some(25),
        }),
    );
    assert!(matches!(stale, Err(EngineError::StaleResponse { .. })));
    assert_eq!(engine.get_current_page(), 3);
    assert_eq!(engine.get_visible_rows()[0].id.to_string(), "20");
}

#[test]
fn test_server_total_updates_from_response() {
    let mut engine = TableEngine::new(numbered(0, 10), columns(), server_options(25)).unwrap();
    let ticket = engine.begin_page_fetch(2).unwrap();
    engine
        .complete_page_fetch(
            ticket,
            Ok(PageData {
                rows: numbered(10, 10),
                total_rows: Some(95),
            }),
        )
        .unwrap();
    assert_eq!(engine.get_total_pages(), 10);
    assert_eq!(engine.page_info().total_rows, 95);
}

// ============================================================================
// INFINITE MODE
// ============================================================================

#[tokio::test]
async fn test_load_more_appends_until_exhausted() {
    let source = Arc::new(PagedSource::new(25));
    let mut engine = TableEngine::new(numbered(0, 10), columns(), infinite_options())
        .unwrap()
        .with_source(source.clone());
    assert_eq!(engine.get_total_pages(), 1);
    assert!(engine.has_more());

    assert_eq!(engine.load_more().await.unwrap(), 10);
    assert_eq!(engine.load_more().await.unwrap(), 5);
    assert!(!engine.has_more());
    assert_eq!(engine.get_visible_rows().len(), 25);
    assert_eq!(engine.get_total_pages(), 3);
    assert_eq!(engine.get_current_page(), 3);

    // Exhausted: no further fetches
    assert_eq!(engine.load_more().await.unwrap(), 0);
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_set_page_loads_missing_pages() {
    let mut engine = TableEngine::new(numbered(0, 10), columns(), infinite_options())
        .unwrap()
        .with_source(Arc::new(PagedSource::new(25)));
    engine.set_page(3).await.unwrap();
    assert_eq!(engine.get_visible_rows().len(), 25);

    let err = engine.set_page(4).await.unwrap_err();
    assert_eq!(err, EngineError::PageOutOfRange { page: 4, total: 3 });
}

#[tokio::test]
async fn test_set_page_moves_back_to_a_loaded_page() {
    let source = Arc::new(PagedSource::new(25));
    let mut engine = TableEngine::new(numbered(0, 10), columns(), infinite_options())
        .unwrap()
        .with_source(source.clone());
    engine.set_page(3).await.unwrap();
    assert_eq!(engine.get_current_page(), 3);

    engine.set_page(1).await.unwrap();
    assert_eq!(engine.get_current_page(), 1);
    assert_eq!(engine.page_info().current_page, 1);
    engine.set_page(2).await.unwrap();
    assert_eq!(engine.get_current_page(), 2);
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);

    assert!(engine.set_page(0).await.is_err());
    assert_eq!(engine.get_current_page(), 2);
}

#[test]
fn test_batch_with_nested_duplicate_changes_nothing() {
    let mut engine = TableEngine::new(numbered(0, 10), columns(), infinite_options()).unwrap();
    let ticket = engine.begin_load_more().unwrap();
    let result = engine.complete_load_more(
        ticket,
        Ok(NextPage {
            rows: vec![
                Row::new(100).with("n", 100),
                Row::new(101).with_children(vec![Row::new(3).with("n", 3)]),
            ],
            has_more: true,
        }),
    );
    assert_eq!(
        result,
        Err(EngineError::Store(StoreError::DuplicateRowId(RowId::from(3))))
    );
    assert_eq!(engine.store().len(), 10);
    assert!(!engine.store().contains(&RowId::from(100)));
    assert_eq!(engine.get_visible_rows().len(), 10);
    assert_eq!(engine.get_total_pages(), 1);
    assert!(engine.has_more());
}

#[test]
fn test_empty_batch_marks_exhausted() {
    let mut engine = TableEngine::new(numbered(0, 10), columns(), infinite_options()).unwrap();
    let ticket = engine.begin_load_more().unwrap();
    let appended = engine
        .complete_load_more(
            ticket,
            Ok(NextPage {
                rows: Vec::new(),
                has_more: true,
            }),
        )
        .unwrap();
    assert_eq!(appended, 0);
    assert!(!engine.has_more());
    assert!(engine.begin_load_more().is_none());
}

#[test]
fn test_duplicate_ids_in_batch_are_skipped() {
    let mut engine = TableEngine::new(numbered(0, 10), columns(), infinite_options()).unwrap();
    let ticket = engine.begin_load_more().unwrap();
    let appended = engine
        .complete_load_more(
            ticket,
            Ok(NextPage {
                rows: numbered(5, 10),
                has_more: true,
            }),
        )
        .unwrap();
    assert_eq!(appended, 5);
    assert_eq!(engine.get_visible_rows().len(), 15);
    assert!(engine.has_more());
}

#[test]
fn test_stale_load_more_leaves_rows_alone() {
    let mut engine = TableEngine::new(numbered(0, 10), columns(), infinite_options()).unwrap();
    let first = engine.begin_load_more().unwrap();
    let second = engine.begin_load_more().unwrap();

    let stale = engine.complete_load_more(
        first,
        Ok(NextPage {
            rows: numbered(10, 10),
            has_more: true,
        }),
    );
    assert!(matches!(stale, Err(EngineError::StaleResponse { token: 1, latest: 2 })));
    assert_eq!(engine.get_visible_rows().len(), 10);

    engine
        .complete_load_more(
            second,
            Ok(NextPage {
                rows: numbered(10, 10),
                has_more: false,
            }),
        )
        .unwrap();
    assert_eq!(engine.get_visible_rows().len(), 20);
}

#[tokio::test]
async fn test_failed_load_more_keeps_rows() {
    let mut engine = TableEngine::new(numbered(0, 10), columns(), infinite_options())
        .unwrap()
        .with_source(Arc::new(PagedSource::failing(25)));
    assert!(matches!(engine.load_more().await, Err(EngineError::Fetch(_))));
    assert_eq!(engine.get_visible_rows().len(), 10);
    assert!(engine.has_more());
}
