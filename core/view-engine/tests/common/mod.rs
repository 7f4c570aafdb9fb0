//! FILENAME: core/view-engine/tests/common/mod.rs
//! Fixtures and fake row sources shared by the view-engine integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use view_engine::grid_model::{AggregationSpec, ColumnSpec, Row, RowId, ValueKind};
use view_engine::{FetchError, NextPage, PageData, RowSource, VisibleRow};

/// Flat people table: ids 1..=5, ages [20, 35, 40, 25, 50].
pub fn people() -> Vec<Row> {
    [("Ann", 20), ("Bob", 35), ("alice", 40), ("Carl", 25), ("Dora", 50)]
        .into_iter()
        .enumerate()
        .map(|(i, (name, age))| {
            Row::new(i as i64 + 1)
                .with("name", name)
                .with("age", age)
                .with("active", age % 2 == 0)
        })
        .collect()
}

pub fn people_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("name", ValueKind::String),
        ColumnSpec::new("age", ValueKind::Number),
        ColumnSpec::new("active", ValueKind::Boolean),
    ]
}

/// Two departments with three and two employees.
pub fn departments() -> Vec<Row> {
    vec![
        Row::new("eng").with("dept", "Engineering").with_children(vec![
            Row::new(10).with("name", "Ivy").with("salary", 10),
            Row::new(11).with("name", "Jon").with("salary", 20),
            Row::new(12).with("name", "Kim").with("salary", 30),
        ]),
        Row::new("ops").with("dept", "Operations").with_children(vec![
            Row::new(20).with("name", "Lee").with("salary", 5),
            Row::new(21).with("name", "Max").with("salary", 7),
        ]),
    ]
}

pub fn department_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("dept", ValueKind::String),
        ColumnSpec::new("name", ValueKind::String),
        ColumnSpec::new("salary", ValueKind::Number).with_aggregation(AggregationSpec::sum()),
    ]
}

/// Numbered rows `start..start + count` with a `n` column.
pub fn numbered(start: i64, count: usize) -> Vec<Row> {
    (start..start + count as i64)
        .map(|i| Row::new(i).with("n", i))
        .collect()
}

pub fn ids(rows: &[VisibleRow]) -> Vec<String> {
    rows.iter().map(|r| r.id.to_string()).collect()
}

pub fn row_id(id: i64) -> RowId {
    RowId::from(id)
}

// ============================================================================
// FAKE SOURCES
// ============================================================================

/// Serves `total` numbered rows in pages, or fails every call when `failing`.
pub struct PagedSource {
    pub total: usize,
    pub failing: bool,
    pub calls: AtomicUsize,
}

impl PagedSource {
    pub fn new(total: usize) -> Self {
        PagedSource {
            total,
            failing: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(total: usize) -> Self {
        PagedSource {
            failing: true,
            ..Self::new(total)
        }
    }

    fn slice(&self, start: usize, page_size: usize) -> Vec<Row> {
        let end = (start + page_size).min(self.total);
        if start >= end {
            return Vec::new();
        }
        numbered(start as i64, end - start)
    }
}

#[async_trait]
impl RowSource for PagedSource {
    async fn fetch_page(&self, page: usize, page_size: usize) -> Result<PageData, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(FetchError::new("server unavailable"));
        }
        Ok(PageData {
            rows: self.slice((page - 1) * page_size, page_size),
            total_rows: Some(self.total),
        })
    }

    async fn fetch_next(&self, page_index: usize, page_size: usize) -> Result<NextPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(FetchError::new("server unavailable"));
        }
        let start = page_index * page_size;
        Ok(NextPage {
            rows: self.slice(start, page_size),
            has_more: start + page_size < self.total,
        })
    }
}

/// Serves children for lazy groups; ids listed in `broken` fail.
pub struct ChildSource {
    pub broken: Mutex<Vec<RowId>>,
}

impl ChildSource {
    pub fn new() -> Self {
        ChildSource {
            broken: Mutex::new(Vec::new()),
        }
    }

    pub fn breaking(id: RowId) -> Self {
        ChildSource {
            broken: Mutex::new(vec![id]),
        }
    }
}

#[async_trait]
impl RowSource for ChildSource {
    async fn fetch_children(&self, row: &Row) -> Result<Vec<Row>, FetchError> {
        if self.broken.lock().unwrap().contains(&row.id) {
            return Err(FetchError::new(format!("children of {} unavailable", row.id)));
        }
        Ok(vec![
            Row::new(format!("{}-1", row.id)).with("salary", 1),
            Row::new(format!("{}-2", row.id)).with("salary", 2),
        ])
    }
}
