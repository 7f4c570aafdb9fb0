//! FILENAME: core/view-engine/src/pagination.rs
//! Pagination Controller - client slicing, server pass-through, infinite append.
//!
//! Page numbers are 1-indexed everywhere. Server and infinite modes commit a
//! page change only through a ticket: `begin_*` issues a ticket carrying a
//! fresh token, `complete_*` rejects any ticket older than the latest issued.

use serde::{Deserialize, Serialize};

use crate::definition::{PaginationMode, TableOptions};
use crate::error::EngineError;
use crate::view::PageInfo;

/// Number of pages needed for `count` rows. Never less than 1.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    count.div_ceil(page_size).max(1)
}

/// Rows of 1-indexed page `page`. Out-of-range pages yield an empty slice.
pub fn page_slice<T>(rows: &[T], page: usize, page_size: usize) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(page_size).min(rows.len());
    let end = start.saturating_add(page_size).min(rows.len());
    &rows[start..end]
}

/// Handle for an outstanding page or load-more request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageTicket {
    pub token: u64,
    /// Target page (server mode) or page index to fetch (infinite mode).
    pub page: usize,
}

#[derive(Debug, Clone)]
pub struct Paginator {
    mode: PaginationMode,
    should_paginate: bool,
    page_size: usize,
    current_page: usize,

    /// Server mode: the externally reported row count.
    server_total_rows: Option<usize>,

    /// Infinite mode: pages appended so far, and whether more exist.
    loaded_pages: usize,
    has_more: bool,

    latest_token: u64,
}

impl Paginator {
    pub fn new(options: &TableOptions) -> Self {
        Paginator {
            mode: options.pagination_mode,
            should_paginate: options.should_paginate,
            page_size: options.page_size.max(1),
            current_page: 1,
            server_total_rows: options.server_total_rows,
            loaded_pages: 0,
            has_more: true,
            latest_token: 0,
        }
    }

    pub fn mode(&self) -> PaginationMode {
        self.mode
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn has_more(&self) -> bool {
        self.mode == PaginationMode::Infinite && self.has_more
    }

    pub fn loaded_pages(&self) -> usize {
        self.loaded_pages
    }

    /// Whether the visible list is cut into pages locally.
    fn slices_locally(&self) -> bool {
        self.mode == PaginationMode::Client && self.should_paginate
    }

    /// Row count pages are derived from.
    pub fn total_rows(&self, visible: usize) -> usize {
        match self.mode {
            PaginationMode::Server => self.server_total_rows.unwrap_or(visible),
            _ => visible,
        }
    }

    pub fn total_pages(&self, visible: usize) -> usize {
        match self.mode {
            PaginationMode::Client if !self.should_paginate => 1,
            PaginationMode::Client => total_pages(visible, self.page_size),
            PaginationMode::Server => total_pages(self.total_rows(visible), self.page_size),
            PaginationMode::Infinite => self.loaded_pages.max(1),
        }
    }

    /// The part of the visible list the renderer shows.
    pub fn slice<'a, T>(&self, rows: &'a [T]) -> &'a [T] {
        if self.slices_locally() {
            page_slice(rows, self.current_page, self.page_size)
        } else {
            rows
        }
    }

    pub fn info(&self, visible: usize) -> PageInfo {
        PageInfo {
            current_page: self.current_page,
            page_size: self.page_size,
            total_pages: self.total_pages(visible),
            total_rows: self.total_rows(visible),
            has_more: self.has_more(),
        }
    }

    // ------------------------------------------------------------------------
    // Client mode
    // ------------------------------------------------------------------------

    /// Moves to a page of the locally held list.
    pub fn set_page(&mut self, page: usize, visible: usize) -> Result<(), EngineError> {
        let total = self.total_pages(visible);
        if page == 0 || page > total {
            return Err(EngineError::PageOutOfRange { page, total });
        }
        self.current_page = page;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.current_page = 1;
    }

    /// Pulls the current page back in range after the list shrank.
    pub fn clamp(&mut self, visible: usize) {
        if self.mode == PaginationMode::Client {
            self.current_page = self.current_page.min(self.total_pages(visible)).max(1);
        }
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), EngineError> {
        if page_size == 0 {
            return Err(EngineError::InvalidPageSize);
        }
        self.page_size = page_size;
        self.current_page = 1;
        Ok(())
    }

    /// Restores a snapshot page position without range checks; callers clamp.
    pub(crate) fn restore(&mut self, page: usize, page_size: usize) {
        if page_size > 0 {
            self.page_size = page_size;
        }
        self.current_page = page.max(1);
    }

    // ------------------------------------------------------------------------
    // Server mode
    // ------------------------------------------------------------------------

    /// Issues a ticket for fetching `page`. The current page is unchanged
    /// until the ticket completes.
    pub fn begin_page(&mut self, page: usize) -> Result<PageTicket, EngineError> {
        if page == 0 {
            return Err(EngineError::PageOutOfRange {
                page,
                total: self.total_pages(0),
            });
        }
        if let Some(total_rows) = self.server_total_rows {
            let total = total_pages(total_rows, self.page_size);
            if page > total {
                return Err(EngineError::PageOutOfRange { page, total });
            }
        }
        Ok(self.issue(page))
    }

    /// Commits a fetched page. Stale tickets are rejected.
    pub fn complete_page(&mut self, ticket: PageTicket, total_rows: Option<usize>) -> Result<(), EngineError> {
        self.check_latest(ticket)?;
        self.current_page = ticket.page;
        if total_rows.is_some() {
            self.server_total_rows = total_rows;
        }
        Ok(())
    }

    pub fn set_server_total_rows(&mut self, total_rows: Option<usize>) {
        self.server_total_rows = total_rows;
    }

    // ------------------------------------------------------------------------
    // Infinite mode
    // ------------------------------------------------------------------------

    /// Issues a ticket for the next page, or `None` once exhausted.
    pub fn begin_load_more(&mut self) -> Option<PageTicket> {
        if !self.has_more() {
            return None;
        }
        let next = self.loaded_pages;
        Some(self.issue(next))
    }

    /// Records an appended page. A fetch that adds no new rows, or reports no
    /// more data, marks the list exhausted.
    pub fn complete_load_more(
        &mut self,
        ticket: PageTicket,
        appended: usize,
        has_more: bool,
    ) -> Result<(), EngineError> {
        self.check_latest(ticket)?;
        self.loaded_pages += 1;
        self.current_page = self.loaded_pages;
        self.has_more = has_more && appended > 0;
        Ok(())
    }

    /// Moves to a page that has already been appended.
    pub fn commit_loaded_page(&mut self, page: usize) -> Result<(), EngineError> {
        let total = self.loaded_pages.max(1);
        if page == 0 || page > total {
            return Err(EngineError::PageOutOfRange { page, total });
        }
        self.current_page = page;
        Ok(())
    }

    /// Marks the list as already holding its first page (the initial rows).
    pub fn mark_initial_page(&mut self, rows: usize) {
        if self.mode == PaginationMode::Infinite && rows > 0 && self.loaded_pages == 0 {
            self.loaded_pages = 1;
        }
    }

    // ------------------------------------------------------------------------
    // Tokens
    // ------------------------------------------------------------------------

    fn issue(&mut self, page: usize) -> PageTicket {
        self.latest_token += 1;
        PageTicket {
            token: self.latest_token,
            page,
        }
    }

    pub fn is_latest(&self, ticket: PageTicket) -> bool {
        ticket.token == self.latest_token
    }

    pub(crate) fn check_latest(&self, ticket: PageTicket) -> Result<(), EngineError> {
        if self.is_latest(ticket) {
            Ok(())
        } else {
            log::warn!(
                "discarding stale page response (token {}, latest {})",
                ticket.token,
                self.latest_token
            );
            Err(EngineError::StaleResponse {
                token: ticket.token,
                latest: self.latest_token,
            })
        }
    }
}
