//! FILENAME: core/view-engine/src/source.rs
//! External row sources: server pages, infinite pages and lazy group children.
//!
//! Every method has a default that reports the capability as missing, so a
//! source implements only what its pagination mode and data shape need.

use async_trait::async_trait;
use grid_model::Row;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// One server page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    pub rows: Vec<Row>,
    /// Total rows on the server, when the server reports it.
    pub total_rows: Option<usize>,
}

/// One batch for infinite loading.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextPage {
    pub rows: Vec<Row>,
    pub has_more: bool,
}

#[async_trait]
pub trait RowSource: Send + Sync {
    /// Fetches 1-indexed `page` of `page_size` rows (server mode).
    async fn fetch_page(&self, page: usize, page_size: usize) -> Result<PageData, FetchError> {
        let _ = (page, page_size);
        Err(FetchError::new("this source does not serve pages"))
    }

    /// Fetches the batch at 0-indexed `page_index` (infinite mode).
    async fn fetch_next(&self, page_index: usize, page_size: usize) -> Result<NextPage, FetchError> {
        let _ = (page_index, page_size);
        Err(FetchError::new("this source does not serve incremental pages"))
    }

    /// Fetches the children of a lazy group row.
    async fn fetch_children(&self, row: &Row) -> Result<Vec<Row>, FetchError> {
        Err(FetchError::new(format!("no children available for row {}", row.id)))
    }
}
