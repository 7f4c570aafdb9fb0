//! FILENAME: core/view-engine/src/engine.rs
//! Table Engine - owns the view state and runs the pipeline.
//!
//! Every committed change runs a full recompute before returning:
//!   store -> filter -> sort -> flatten (with aggregates) -> paginate
//!
//! A change that makes the recompute fail (a comparator error) is rolled back:
//! filter, sort, expansion and page state return to what they were and the
//! previous visible list stays in place. Row edits put the previous rows back.

use grid_model::{find_column, CellCoord, CellValue, ColumnSpec, Row, RowId, RowStore, StoreError};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::aggregate;
use crate::definition::{
    next_sort_state, FilterCondition, FilterState, PaginationMode, SortState, TableOptions, TableState,
};
use crate::error::{EngineError, FetchError};
use crate::expansion::{flatten, grouping_depth, grouping_property, positions, ExpansionState};
use crate::filter::{filter_nodes, unique_values, validate_condition};
use crate::interaction::{InteractionEvent, InteractionMachine, InteractionOutcome};
use crate::listener::{TableListener, ViewAnimator};
use crate::pagination::{PageTicket, Paginator};
use crate::selection::{CellBorders, CellSelection, RowSelection};
use crate::sort::sort_nodes;
use crate::source::{NextPage, PageData, RowSource};
use crate::tree::{count_nodes, DerivedNode};
use crate::view::{GroupLoadState, PageInfo, UniqueValue, VisibleRow};

/// Handle for an outstanding lazy-children fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChildTicket {
    pub id: RowId,
    pub token: u64,
}

/// State restored when a change fails to recompute.
struct Checkpoint {
    filters: FilterState,
    sort: Option<SortState>,
    expansion: ExpansionState,
    paginator: Paginator,
}

pub struct TableEngine {
    columns: Vec<ColumnSpec>,
    options: TableOptions,
    store: RowStore,

    filters: FilterState,
    sort: Option<SortState>,
    expansion: ExpansionState,
    paginator: Paginator,

    cell_selection: CellSelection,
    row_selection: RowSelection,
    interaction: InteractionMachine,

    /// Fetch state of lazy groups that are loading or failed.
    load_states: FxHashMap<RowId, GroupLoadState>,
    /// Latest child-fetch token issued per row.
    child_requests: FxHashMap<RowId, u64>,
    next_child_token: u64,

    /// The flattened list from the last successful recompute.
    visible: Vec<VisibleRow>,

    listeners: Vec<Arc<dyn TableListener>>,
    animator: Option<Arc<dyn ViewAnimator>>,
    source: Option<Arc<dyn RowSource>>,
}

impl TableEngine {
    // ========================================================================
    // CONSTRUCTION
    // ========================================================================

    pub fn new(rows: Vec<Row>, columns: Vec<ColumnSpec>, options: TableOptions) -> Result<Self, EngineError> {
        let store = RowStore::from_rows(rows)?;

        let depths = match &options.expanded_depths {
            Some(depths) => depths.clone(),
            None if options.expand_all => store.group_depths(),
            None => BTreeSet::new(),
        };

        let mut paginator = Paginator::new(&options);
        paginator.mark_initial_page(store.roots().len());

        let mut engine = TableEngine {
            interaction: InteractionMachine::new(options.selectable_cells),
            columns,
            store,
            filters: FilterState::new(),
            sort: None,
            expansion: ExpansionState::with_depths(depths),
            paginator,
            cell_selection: CellSelection::new(),
            row_selection: RowSelection::new(),
            load_states: FxHashMap::default(),
            child_requests: FxHashMap::default(),
            next_child_token: 0,
            visible: Vec::new(),
            listeners: Vec::new(),
            animator: None,
            source: None,
            options,
        };
        engine.recompute()?;
        Ok(engine)
    }

    pub fn with_source(mut self, source: Arc<dyn RowSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn TableListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn with_animator(mut self, animator: Arc<dyn ViewAnimator>) -> Self {
        self.animator = Some(animator);
        self
    }

    pub fn add_listener(&mut self, listener: Arc<dyn TableListener>) {
        self.listeners.push(listener);
    }

    pub fn set_row_source(&mut self, source: Option<Arc<dyn RowSource>>) {
        self.source = source;
    }

    pub fn set_animator(&mut self, animator: Option<Arc<dyn ViewAnimator>>) {
        self.animator = animator;
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn store(&self) -> &RowStore {
        &self.store
    }

    // ========================================================================
    // PIPELINE
    // ========================================================================

    /// Filter then sort the store into a derived tree.
    fn derive(&self) -> Result<Vec<DerivedNode<'_>>, EngineError> {
        let mut nodes = filter_nodes(self.store.roots(), &[], &self.filters, &self.columns);
        sort_nodes(&mut nodes, self.sort.as_ref(), &self.columns)?;
        Ok(nodes)
    }

    fn recompute(&mut self) -> Result<(), EngineError> {
        let (visible, derived) = {
            let nodes = self.derive()?;
            let visible = flatten(&nodes, &self.expansion, &self.columns, &self.load_states);
            (visible, count_nodes(&nodes))
        };

        let before = self.animator.as_ref().map(|_| positions(&self.visible));
        self.visible = visible;
        self.paginator.clamp(self.visible.len());

        log::debug!(
            "recomputed view: {} visible, {} matched of {} stored rows, {} filter(s), sort {:?}, page {}/{}",
            self.visible.len(),
            derived,
            self.store.len(),
            self.filters.len(),
            self.sort.as_ref().map(|s| (&s.accessor, s.direction)),
            self.paginator.current_page(),
            self.paginator.total_pages(self.visible.len())
        );

        if let (Some(animator), Some(before)) = (&self.animator, before) {
            animator.animate(&before, &positions(&self.visible));
        }
        Ok(())
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            filters: self.filters.clone(),
            sort: self.sort.clone(),
            expansion: self.expansion.clone(),
            paginator: self.paginator.clone(),
        }
    }

    fn rollback(&mut self, checkpoint: Checkpoint) {
        self.filters = checkpoint.filters;
        self.sort = checkpoint.sort;
        self.expansion = checkpoint.expansion;
        self.paginator = checkpoint.paginator;
    }

    /// Applies a view-state change and recomputes, undoing the change on failure.
    fn transact<T>(&mut self, change: impl FnOnce(&mut Self) -> T) -> Result<T, EngineError> {
        let checkpoint = self.checkpoint();
        let value = change(self);
        match self.recompute() {
            Ok(()) => Ok(value),
            Err(err) => {
                log::warn!("view change rolled back: {}", err);
                self.rollback(checkpoint);
                Err(err)
            }
        }
    }

    fn reset_client_page(&mut self) {
        if self.paginator.mode() == PaginationMode::Client {
            self.paginator.reset();
        }
    }

    fn notify(&self, event: impl Fn(&dyn TableListener)) {
        for listener in &self.listeners {
            event(listener.as_ref());
        }
    }

    fn column(&self, accessor: &str) -> Result<&ColumnSpec, EngineError> {
        find_column(&self.columns, accessor).ok_or_else(|| EngineError::UnknownColumn(accessor.to_string()))
    }

    // ========================================================================
    // FILTERING
    // ========================================================================

    /// Sets the condition for its column, replacing any previous one.
    pub fn apply_filter(&mut self, condition: FilterCondition) -> Result<(), EngineError> {
        validate_condition(&condition, &self.columns)?;
        self.transact(|engine| {
            engine.filters.set(condition);
            engine.reset_client_page();
        })?;
        self.notify(|l| l.on_filter_change(&self.filters));
        Ok(())
    }

    /// Removes the condition on one column. Returns whether one was active.
    pub fn clear_filter(&mut self, accessor: &str) -> Result<bool, EngineError> {
        if self.filters.get(accessor).is_none() {
            return Ok(false);
        }
        self.transact(|engine| {
            engine.filters.remove(accessor);
            engine.reset_client_page();
        })?;
        self.notify(|l| l.on_filter_change(&self.filters));
        Ok(true)
    }

    pub fn clear_all_filters(&mut self) -> Result<(), EngineError> {
        if self.filters.is_empty() {
            return Ok(());
        }
        self.transact(|engine| {
            engine.filters.clear();
            engine.reset_client_page();
        })?;
        self.notify(|l| l.on_filter_change(&self.filters));
        Ok(())
    }

    pub fn get_filter_state(&self) -> &FilterState {
        &self.filters
    }

    /// Distinct values of a column across the stored leaves.
    pub fn unique_values(&self, accessor: &str) -> Result<Vec<UniqueValue>, EngineError> {
        let column = self.column(accessor)?;
        Ok(unique_values(self.store.roots(), column))
    }

    // ========================================================================
    // SORTING
    // ========================================================================

    /// Sets (or with `None`, clears) the active sort.
    pub fn apply_sort_state(&mut self, sort: Option<SortState>) -> Result<(), EngineError> {
        if let Some(state) = &sort {
            let column = self.column(&state.accessor)?;
            if !column.sortable {
                return Err(EngineError::NotSortable(state.accessor.clone()));
            }
        }
        if sort == self.sort {
            return Ok(());
        }
        self.transact(|engine| {
            engine.sort = sort;
            engine.reset_client_page();
        })?;
        self.notify(|l| l.on_sort_change(self.sort.as_ref()));
        Ok(())
    }

    /// Header click: advances the column through none -> asc -> desc -> none.
    /// Non-sortable columns ignore the click.
    pub fn toggle_sort(&mut self, accessor: &str) -> Result<Option<SortState>, EngineError> {
        if !self.column(accessor)?.sortable {
            return Ok(self.sort.clone());
        }
        let next = next_sort_state(self.sort.as_ref(), accessor);
        self.apply_sort_state(next)?;
        Ok(self.sort.clone())
    }

    pub fn get_sort_state(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    // ========================================================================
    // EXPANSION
    // ========================================================================

    pub fn expand_all(&mut self) -> Result<(), EngineError> {
        let depths = self.store.group_depths();
        self.transact(|engine| engine.expansion.expand_all(depths))
    }

    pub fn collapse_all(&mut self) -> Result<(), EngineError> {
        self.transact(|engine| engine.expansion.collapse_all())
    }

    pub fn expand_depth(&mut self, depth: usize) -> Result<(), EngineError> {
        self.transact(|engine| engine.expansion.expand_depth(depth))
    }

    pub fn collapse_depth(&mut self, depth: usize) -> Result<(), EngineError> {
        self.transact(|engine| engine.expansion.collapse_depth(depth))
    }

    pub fn toggle_depth(&mut self, depth: usize) -> Result<(), EngineError> {
        self.transact(|engine| engine.expansion.toggle_depth(depth))
    }

    pub fn set_expanded_depths(&mut self, depths: BTreeSet<usize>) -> Result<(), EngineError> {
        self.transact(|engine| engine.expansion.set_expanded_depths(depths))
    }

    pub fn get_expanded_depths(&self) -> &BTreeSet<usize> {
        self.expansion.expanded_depths()
    }

    pub fn get_grouping_depth(&self, property: &str) -> Option<usize> {
        grouping_depth(&self.options.row_grouping, property)
    }

    pub fn get_grouping_property(&self, depth: usize) -> Option<&str> {
        grouping_property(&self.options.row_grouping, depth)
    }

    /// Depth of a stored group row.
    fn group_depth(&self, id: &RowId) -> Result<usize, EngineError> {
        let path = self
            .store
            .path_of(id)
            .ok_or_else(|| StoreError::RowNotFound(id.clone()))?;
        match self.store.get(&path) {
            Some(row) if row.is_group() => Ok(path.len() - 1),
            _ => Err(StoreError::NotAGroup(id.clone()).into()),
        }
    }

    pub fn is_row_expanded(&self, id: &RowId) -> Result<bool, EngineError> {
        let depth = self.group_depth(id)?;
        Ok(self.expansion.is_expanded(id, depth))
    }

    /// Overrides one group's expansion. Lazy groups are not fetched here;
    /// use `expand_row` for those.
    pub fn set_row_expanded(&mut self, id: &RowId, expanded: bool) -> Result<(), EngineError> {
        let depth = self.group_depth(id)?;
        self.transact(|engine| engine.expansion.set_row(id.clone(), depth, expanded))
    }

    /// Drops a group's override so its depth default applies again.
    pub fn clear_row_expansion(&mut self, id: &RowId) -> Result<(), EngineError> {
        self.group_depth(id)?;
        self.transact(|engine| engine.expansion.clear_row(id))
    }

    /// Flips one group. Returns the new state.
    pub fn toggle_row(&mut self, id: &RowId) -> Result<bool, EngineError> {
        let depth = self.group_depth(id)?;
        self.transact(|engine| engine.expansion.toggle_row(id, depth))
    }

    // ------------------------------------------------------------------------
    // Lazy children
    // ------------------------------------------------------------------------

    /// First half of expanding a group. Returns a ticket when the group's
    /// children must be fetched first; otherwise expands it immediately.
    pub fn begin_expand_row(&mut self, id: &RowId) -> Result<Option<ChildTicket>, EngineError> {
        let depth = self.group_depth(id)?;
        let needs_children = self.store.find(id).is_some_and(Row::needs_children);
        if !needs_children {
            self.transact(|engine| engine.expansion.set_row(id.clone(), depth, true))?;
            return Ok(None);
        }

        self.next_child_token += 1;
        let ticket = ChildTicket {
            id: id.clone(),
            token: self.next_child_token,
        };
        self.child_requests.insert(id.clone(), ticket.token);
        self.load_states.insert(id.clone(), GroupLoadState::Loading);
        self.recompute()?;
        Ok(Some(ticket))
    }

    /// Second half: attaches fetched children and expands the group, or
    /// marks the group errored. Superseded tickets are discarded.
    pub fn complete_expand_row(
        &mut self,
        ticket: ChildTicket,
        result: Result<Vec<Row>, FetchError>,
    ) -> Result<(), EngineError> {
        let latest = self.child_requests.get(&ticket.id).copied().unwrap_or(0);
        if latest != ticket.token {
            log::warn!(
                "discarding stale children for row {} (token {}, latest {})",
                ticket.id,
                ticket.token,
                latest
            );
            return Err(EngineError::StaleResponse {
                token: ticket.token,
                latest,
            });
        }
        self.child_requests.remove(&ticket.id);

        match result {
            Ok(children) => {
                let depth = self.group_depth(&ticket.id)?;
                if let Err(err) = self.store.attach_children(&ticket.id, children) {
                    self.load_states
                        .insert(ticket.id.clone(), GroupLoadState::Errored(err.to_string()));
                    self.recompute()?;
                    return Err(err.into());
                }
                self.load_states.remove(&ticket.id);
                log::debug!("attached children to row {}", ticket.id);
                self.transact(|engine| engine.expansion.set_row(ticket.id.clone(), depth, true))
            }
            Err(err) => {
                log::error!("fetching children of row {} failed: {}", ticket.id, err);
                self.load_states
                    .insert(ticket.id.clone(), GroupLoadState::Errored(err.to_string()));
                self.recompute()?;
                Err(err.into())
            }
        }
    }

    /// Expands a group, fetching its children from the row source first when
    /// it is a lazy group that has none yet.
    pub async fn expand_row(&mut self, id: &RowId) -> Result<(), EngineError> {
        let lazy = self.store.find(id).filter(|row| row.needs_children()).cloned();
        let source = match (&lazy, &self.source) {
            (Some(_), None) => return Err(EngineError::NoRowSource("lazy group children")),
            (_, source) => source.clone(),
        };

        let Some(ticket) = self.begin_expand_row(id)? else {
            return Ok(());
        };
        let (Some(row), Some(source)) = (lazy, source) else {
            return Ok(());
        };
        let result = source.fetch_children(&row).await;
        self.complete_expand_row(ticket, result)
    }

    // ========================================================================
    // PAGINATION
    // ========================================================================

    pub fn get_current_page(&self) -> usize {
        self.paginator.current_page()
    }

    pub fn get_total_pages(&self) -> usize {
        self.paginator.total_pages(self.visible.len())
    }

    pub fn page_info(&self) -> PageInfo {
        self.paginator.info(self.visible.len())
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), EngineError> {
        let mut paginator = self.paginator.clone();
        paginator.set_page_size(page_size)?;
        self.transact(|engine| engine.paginator = paginator)
    }

    /// Client-mode page change. Server and infinite modes go through `set_page`.
    pub fn set_client_page(&mut self, page: usize) -> Result<(), EngineError> {
        self.paginator.set_page(page, self.visible.len())?;
        self.notify(|l| l.on_page_change(page));
        Ok(())
    }

    /// Moves to a page. Server mode fetches the page and commits only on
    /// success; infinite mode loads batches until the page is present.
    pub async fn set_page(&mut self, page: usize) -> Result<(), EngineError> {
        match self.paginator.mode() {
            PaginationMode::Client => self.set_client_page(page),
            PaginationMode::Server => {
                let source = self.source.clone().ok_or(EngineError::NoRowSource("server pages"))?;
                let ticket = self.begin_page_fetch(page)?;
                let result = source.fetch_page(page, self.paginator.page_size()).await;
                self.complete_page_fetch(ticket, result)
            }
            PaginationMode::Infinite => {
                while page > 0 && self.paginator.loaded_pages() < page {
                    if self.load_more().await? == 0 && !self.paginator.has_more() {
                        break;
                    }
                }
                self.paginator.commit_loaded_page(page)?;
                self.notify(|l| l.on_page_change(page));
                Ok(())
            }
        }
    }

    /// Server mode: issues a ticket for fetching `page`.
    pub fn begin_page_fetch(&mut self, page: usize) -> Result<PageTicket, EngineError> {
        self.paginator.begin_page(page)
    }

    /// Server mode: installs a fetched page as the row set.
    pub fn complete_page_fetch(
        &mut self,
        ticket: PageTicket,
        result: Result<PageData, FetchError>,
    ) -> Result<(), EngineError> {
        self.paginator.check_latest(ticket)?;
        let data = result.map_err(|err| {
            log::error!("fetching page {} failed: {}", ticket.page, err);
            EngineError::from(err)
        })?;

        let mut store = RowStore::from_rows(data.rows)?;
        std::mem::swap(&mut self.store, &mut store);
        let checkpoint = self.checkpoint();
        if let Err(err) = self.paginator.complete_page(ticket, data.total_rows) {
            std::mem::swap(&mut self.store, &mut store);
            return Err(err);
        }
        self.forget_missing_rows();
        if let Err(err) = self.recompute() {
            std::mem::swap(&mut self.store, &mut store);
            self.rollback(checkpoint);
            return Err(err);
        }
        self.notify(|l| l.on_page_change(ticket.page));
        Ok(())
    }

    /// Infinite mode: issues a ticket for the next batch, `None` once exhausted.
    pub fn begin_load_more(&mut self) -> Option<PageTicket> {
        self.paginator.begin_load_more()
    }

    /// Infinite mode: appends a fetched batch. Returns how many new root rows
    /// were added; rows whose id is already loaded are skipped.
    pub fn complete_load_more(
        &mut self,
        ticket: PageTicket,
        result: Result<NextPage, FetchError>,
    ) -> Result<usize, EngineError> {
        self.paginator.check_latest(ticket)?;
        let batch = result.map_err(|err| {
            log::error!("loading page index {} failed: {}", ticket.page, err);
            EngineError::from(err)
        })?;

        let appended = self.edit_store(|store| store.append(batch.rows))?;
        self.paginator.complete_load_more(ticket, appended, batch.has_more)?;
        self.notify(|l| l.on_page_change(self.paginator.current_page()));
        Ok(appended)
    }

    /// Infinite mode: fetches and appends the next batch.
    pub async fn load_more(&mut self) -> Result<usize, EngineError> {
        let source = self.source.clone().ok_or(EngineError::NoRowSource("infinite loading"))?;
        let Some(ticket) = self.begin_load_more() else {
            return Ok(0);
        };
        let result = source.fetch_next(ticket.page, self.paginator.page_size()).await;
        self.complete_load_more(ticket, result)
    }

    /// Server mode: updates the externally reported row count.
    pub fn set_server_total_rows(&mut self, total_rows: Option<usize>) {
        self.paginator.set_server_total_rows(total_rows);
    }

    pub fn has_more(&self) -> bool {
        self.paginator.has_more()
    }

    // ========================================================================
    // ROW EDITS
    // ========================================================================

    /// Applies a store edit and recomputes. When the recompute fails the
    /// previous rows are put back, so the store never disagrees with the view.
    fn edit_store<T>(&mut self, edit: impl FnOnce(&mut RowStore) -> Result<T, StoreError>) -> Result<T, EngineError> {
        let previous = self.store.clone();
        let value = edit(&mut self.store)?;
        if let Err(err) = self.recompute() {
            log::warn!("row edit rolled back: {}", err);
            self.store = previous;
            return Err(err);
        }
        self.forget_missing_rows();
        Ok(value)
    }

    /// Inserts a row under `parent` (or as a root) at `index` (default: end).
    pub fn add_row(&mut self, row: Row, parent: Option<&RowId>, index: Option<usize>) -> Result<(), EngineError> {
        self.edit_store(|store| store.insert(row, parent, index).map(|_| ()))
    }

    /// Replaces a row and its subtree; the id must not change.
    pub fn update_row(&mut self, id: &RowId, ancestors: Option<&[RowId]>, row: Row) -> Result<(), EngineError> {
        self.edit_store(|store| store.replace(id, ancestors, row))
    }

    /// Edits one cell and notifies listeners with the updated row.
    pub fn update_cell(
        &mut self,
        id: &RowId,
        ancestors: Option<&[RowId]>,
        accessor: &str,
        value: CellValue,
    ) -> Result<(), EngineError> {
        let row = self.edit_store(|store| store.set_cell(id, ancestors, accessor, value.clone()).cloned())?;
        self.notify(|l| l.on_cell_change(accessor, &value, &row));
        Ok(())
    }

    /// Removes a row with its subtree and returns it.
    pub fn delete_row(&mut self, id: &RowId, ancestors: Option<&[RowId]>) -> Result<Row, EngineError> {
        self.edit_store(|store| store.remove(id, ancestors))
    }

    /// Replaces every row.
    pub fn set_rows(&mut self, rows: Vec<Row>) -> Result<(), EngineError> {
        self.edit_store(|store| store.replace_all(rows))
    }

    /// Drops per-row state for ids no longer in the store.
    fn forget_missing_rows(&mut self) {
        let store = &self.store;
        self.expansion.retain(|id| store.contains(id));
        self.row_selection.retain(|id| store.contains(id));
        self.load_states.retain(|id, _| store.contains(id));
        self.child_requests.retain(|id, _| store.contains(id));
    }

    /// Replaces the column set. Filters and sort on removed columns are dropped.
    pub fn set_columns(&mut self, columns: Vec<ColumnSpec>) -> Result<(), EngineError> {
        let previous = std::mem::replace(&mut self.columns, columns);
        let result = self.transact(|engine| {
            let columns = &engine.columns;
            let stale: Vec<String> = engine
                .filters
                .iter()
                .filter(|c| find_column(columns, &c.accessor).is_none())
                .map(|c| c.accessor.clone())
                .collect();
            for accessor in stale {
                engine.filters.remove(&accessor);
            }
            if let Some(sort) = &engine.sort {
                if find_column(columns, &sort.accessor).is_none() {
                    engine.sort = None;
                }
            }
        });
        if result.is_err() {
            self.columns = previous;
        }
        result
    }

    /// Moves a column to another position.
    pub fn move_column(&mut self, from: usize, to: usize) -> Result<(), EngineError> {
        let len = self.columns.len();
        if from >= len {
            return Err(EngineError::ColumnOutOfRange(from));
        }
        if to >= len {
            return Err(EngineError::ColumnOutOfRange(to));
        }
        let column = self.columns.remove(from);
        self.columns.insert(to, column);
        Ok(())
    }

    // ========================================================================
    // VIEW OUTPUT
    // ========================================================================

    /// The rows to render: the current page in client mode, everything loaded
    /// in server and infinite modes.
    pub fn get_visible_rows(&self) -> &[VisibleRow] {
        self.paginator.slice(&self.visible)
    }

    /// The whole flattened list, before pagination.
    pub fn flattened_rows(&self) -> &[VisibleRow] {
        &self.visible
    }

    /// Aggregate of a group over its current descendants. `None` when the
    /// column declares no aggregation or the group is filtered out.
    pub fn aggregate(&self, id: &RowId, accessor: &str) -> Result<Option<CellValue>, EngineError> {
        let column = self.column(accessor)?;
        if !self.store.contains(id) {
            return Err(StoreError::RowNotFound(id.clone()).into());
        }
        let nodes = self.derive()?;
        Ok(find_node(&nodes, id).and_then(|node| aggregate::aggregate(node, column)))
    }

    // ========================================================================
    // SELECTION
    // ========================================================================

    pub fn cell_selection(&self) -> &CellSelection {
        &self.cell_selection
    }

    pub fn start_selection(&mut self, cell: CellCoord) {
        if self.options.selectable_cells {
            self.cell_selection.start(cell);
        }
    }

    pub fn update_selection(&mut self, cell: CellCoord) -> bool {
        self.cell_selection.update(cell)
    }

    pub fn finish_selection(&mut self) {
        self.cell_selection.finish();
    }

    pub fn clear_selection(&mut self) {
        self.cell_selection.clear();
    }

    pub fn is_cell_selected(&self, cell: CellCoord) -> bool {
        self.cell_selection.is_selected(cell)
    }

    pub fn cell_borders(&self, cell: CellCoord) -> CellBorders {
        self.cell_selection.borders(cell)
    }

    pub fn is_top_left_cell(&self, cell: CellCoord) -> bool {
        self.cell_selection.is_top_left(cell)
    }

    pub fn row_selection(&self) -> &RowSelection {
        &self.row_selection
    }

    pub fn toggle_row_selection(&mut self, id: &RowId) -> Result<bool, EngineError> {
        if !self.store.contains(id) {
            return Err(StoreError::RowNotFound(id.clone()).into());
        }
        Ok(self.row_selection.toggle(id))
    }

    /// Shift-click on the flattened row at `index`.
    pub fn shift_select_row(&mut self, index: usize) -> usize {
        let ids = self.visible_ids();
        self.row_selection.shift_select(index, &ids)
    }

    /// Selects every row in the flattened list.
    pub fn select_all_rows(&mut self) {
        self.row_selection.select_all(self.visible.iter().map(|r| &r.id));
    }

    pub fn clear_row_selection(&mut self) {
        self.row_selection.clear();
    }

    /// Selected row ids in visible order.
    pub fn selected_row_ids(&self) -> Vec<RowId> {
        let ids = self.visible_ids();
        self.row_selection.selected_in(&ids).into_iter().cloned().collect()
    }

    fn visible_ids(&self) -> Vec<RowId> {
        self.visible.iter().map(|r| r.id.clone()).collect()
    }

    // ========================================================================
    // INTERACTION
    // ========================================================================

    /// Feeds one pointer event through the interaction machine. Header clicks
    /// toggle sorting and header drags reorder columns.
    pub fn handle_interaction(&mut self, event: InteractionEvent) -> Result<InteractionOutcome, EngineError> {
        let outcome = self.interaction.handle(event, &mut self.cell_selection);
        match outcome {
            InteractionOutcome::HeaderClicked { col } => {
                if let Some(accessor) = self.columns.get(col).map(|c| c.accessor.clone()) {
                    self.toggle_sort(&accessor)?;
                }
            }
            InteractionOutcome::ColumnMoved { from, to } => self.move_column(from, to)?,
            _ => {}
        }
        Ok(outcome)
    }

    // ========================================================================
    // STATE SNAPSHOT
    // ========================================================================

    pub fn state_snapshot(&self) -> TableState {
        TableState {
            filters: self.filters.clone(),
            sort: self.sort.clone(),
            expanded_depths: self.expansion.expanded_depths().clone(),
            row_overrides: self.expansion.overrides(),
            current_page: self.paginator.current_page(),
            page_size: self.paginator.page_size(),
        }
    }

    /// Restores a snapshot. Every condition and the sort are validated first;
    /// an invalid snapshot changes nothing.
    pub fn restore_state(&mut self, state: TableState) -> Result<(), EngineError> {
        for condition in state.filters.iter() {
            validate_condition(condition, &self.columns)?;
        }
        if let Some(sort) = &state.sort {
            if !self.column(&sort.accessor)?.sortable {
                return Err(EngineError::NotSortable(sort.accessor.clone()));
            }
        }

        self.transact(|engine| {
            engine.filters = state.filters;
            engine.sort = state.sort;
            engine.expansion = ExpansionState::restore(state.expanded_depths, &state.row_overrides);
            engine.paginator.restore(state.current_page, state.page_size);
        })?;
        self.notify(|l| {
            l.on_filter_change(&self.filters);
            l.on_sort_change(self.sort.as_ref());
        });
        Ok(())
    }
}

fn find_node<'n, 'a>(nodes: &'n [DerivedNode<'a>], id: &RowId) -> Option<&'n DerivedNode<'a>> {
    nodes.iter().find_map(|node| {
        if &node.row.id == id {
            Some(node)
        } else {
            find_node(&node.children, id)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::FilterOperator;
    use grid_model::{AggregationSpec, ValueKind};
    use std::sync::Mutex;

    fn columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("name", ValueKind::String),
            ColumnSpec::new("amount", ValueKind::Number).with_aggregation(AggregationSpec::sum()),
        ]
    }

    fn grouped() -> Vec<Row> {
        vec![
            Row::new("a").with("name", "Alpha").with_children(vec![
                Row::new(1).with("name", "one").with("amount", 10),
                Row::new(2).with("name", "two").with("amount", 20),
            ]),
            Row::new("b").with("name", "Beta").with_children(vec![Row::new(3).with("name", "three").with("amount", 5)]),
        ]
    }

    fn ids(rows: &[VisibleRow]) -> Vec<String> {
        rows.iter().map(|r| r.id.to_string()).collect()
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl TableListener for Recorder {
        fn on_sort_change(&self, sort: Option<&SortState>) {
            self.events.lock().unwrap().push(format!("sort:{:?}", sort.map(|s| s.direction)));
        }

        fn on_filter_change(&self, filters: &FilterState) {
            self.events.lock().unwrap().push(format!("filter:{}", filters.len()));
        }

        fn on_cell_change(&self, accessor: &str, value: &CellValue, row: &Row) {
            self.events
                .lock()
                .unwrap()
                .push(format!("cell:{}:{}:{}", row.id, accessor, value));
        }
    }

    #[test]
    fn test_initial_view_expands_all_groups() {
        let engine = TableEngine::new(grouped(), columns(), TableOptions::default()).unwrap();
        assert_eq!(ids(engine.get_visible_rows()), vec!["a", "1", "2", "b", "3"]);
        assert_eq!(engine.get_visible_rows()[0].display("amount"), Some(&CellValue::Number(30.0)));
    }

    #[test]
    fn test_filter_recomputes_aggregates() {
        let mut engine = TableEngine::new(grouped(), columns(), TableOptions::default()).unwrap();
        engine
            .apply_filter(FilterCondition::single("amount", FilterOperator::LessThan, 15))
            .unwrap();
        assert_eq!(ids(engine.get_visible_rows()), vec!["a", "1", "b", "3"]);
        assert_eq!(
            engine.aggregate(&RowId::from("a"), "amount").unwrap(),
            Some(CellValue::Number(10.0))
        );
        engine.clear_all_filters().unwrap();
        assert_eq!(
            engine.aggregate(&RowId::from("a"), "amount").unwrap(),
            Some(CellValue::Number(30.0))
        );
    }

    #[test]
    fn test_illegal_filter_leaves_state_unchanged() {
        let mut engine = TableEngine::new(grouped(), columns(), TableOptions::default()).unwrap();
        let err = engine
            .apply_filter(FilterCondition::single("amount", FilterOperator::Contains, "1"))
            .unwrap_err();
        assert!(matches!(err, EngineError::IllegalOperator { .. }));
        assert!(engine.get_filter_state().is_empty());
    }

    #[test]
    fn test_toggle_sort_cycles_and_notifies() {
        let recorder = Arc::new(Recorder::default());
        let mut engine = TableEngine::new(grouped(), columns(), TableOptions::default())
            .unwrap()
            .with_listener(recorder.clone());

        assert_eq!(engine.toggle_sort("name").unwrap(), Some(SortState::ascending("name")));
        assert_eq!(engine.toggle_sort("name").unwrap(), Some(SortState::descending("name")));
        assert_eq!(ids(engine.get_visible_rows()), vec!["b", "3", "a", "2", "1"]);
        assert_eq!(engine.toggle_sort("name").unwrap(), None);
        assert_eq!(ids(engine.get_visible_rows()), vec!["a", "1", "2", "b", "3"]);

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec!["sort:Some(Ascending)", "sort:Some(Descending)", "sort:None"]
        );
    }

    #[test]
    fn test_non_sortable_column_ignores_toggle() {
        let columns = vec![ColumnSpec::new("name", ValueKind::String).not_sortable()];
        let mut engine = TableEngine::new(grouped(), columns, TableOptions::default()).unwrap();
        assert_eq!(engine.toggle_sort("name").unwrap(), None);
        assert!(matches!(
            engine.apply_sort_state(Some(SortState::ascending("name"))),
            Err(EngineError::NotSortable(_))
        ));
    }

    #[test]
    fn test_failed_sort_rolls_back() {
        let columns = vec![
            ColumnSpec::new("name", ValueKind::String),
            ColumnSpec::new("bad", ValueKind::Number).with_comparator(
                |_: &Row, _: &Row, _: grid_model::SortDirection| {
                    Err::<std::cmp::Ordering, _>(grid_model::StrategyError::new("no"))
                },
            ),
        ];
        let mut engine = TableEngine::new(grouped(), columns, TableOptions::default()).unwrap();
        engine.apply_sort_state(Some(SortState::descending("name"))).unwrap();
        let before = ids(engine.get_visible_rows());

        let err = engine.apply_sort_state(Some(SortState::ascending("bad"))).unwrap_err();
        assert!(matches!(err, EngineError::Comparator { .. }));
        assert_eq!(engine.get_sort_state(), Some(&SortState::descending("name")));
        assert_eq!(ids(engine.get_visible_rows()), before);
    }

    #[test]
    fn test_row_expansion_overrides() {
        let mut engine = TableEngine::new(grouped(), columns(), TableOptions::default()).unwrap();
        assert!(!engine.toggle_row(&RowId::from("a")).unwrap());
        assert_eq!(ids(engine.get_visible_rows()), vec!["a", "b", "3"]);

        engine.collapse_all().unwrap();
        assert_eq!(ids(engine.get_visible_rows()), vec!["a", "b"]);
        engine.set_row_expanded(&RowId::from("b"), true).unwrap();
        assert_eq!(ids(engine.get_visible_rows()), vec!["a", "b", "3"]);

        assert!(matches!(
            engine.toggle_row(&RowId::from(3)),
            Err(EngineError::Store(StoreError::NotAGroup(_)))
        ));
    }

    #[test]
    fn test_update_cell_notifies_with_updated_row() {
        let recorder = Arc::new(Recorder::default());
        let mut engine = TableEngine::new(grouped(), columns(), TableOptions::default())
            .unwrap()
            .with_listener(recorder.clone());
        engine
            .update_cell(&RowId::from(2), Some(&[RowId::from("a")]), "amount", CellValue::from(40))
            .unwrap();
        assert_eq!(
            engine.aggregate(&RowId::from("a"), "amount").unwrap(),
            Some(CellValue::Number(50.0))
        );
        assert_eq!(recorder.events.lock().unwrap().as_slice(), &["cell:2:amount:40".to_string()]);
    }

    #[test]
    fn test_failed_edit_restores_rows() {
        let columns = vec![ColumnSpec::new("n", ValueKind::Number).with_comparator(
            |a: &Row, b: &Row, _: grid_model::SortDirection| match (a.get("n"), b.get("n")) {
                (CellValue::Number(x), CellValue::Number(y)) => Ok(x.total_cmp(y)),
                _ => Err(grid_model::StrategyError::new("not a number")),
            },
        )];
        let rows = vec![Row::new(1).with("n", 2), Row::new(2).with("n", 1)];
        let recorder = Arc::new(Recorder::default());
        let mut engine = TableEngine::new(rows, columns, TableOptions::default())
            .unwrap()
            .with_listener(recorder.clone());
        engine.apply_sort_state(Some(SortState::ascending("n"))).unwrap();

        let err = engine
            .update_cell(&RowId::from(1), None, "n", CellValue::from("x"))
            .unwrap_err();
        assert!(matches!(err, EngineError::Comparator { .. }));
        assert_eq!(engine.store().find(&RowId::from(1)).unwrap().get("n"), &CellValue::Number(2.0));
        assert!(recorder.events.lock().unwrap().iter().all(|e| !e.starts_with("cell:")));

        assert!(engine.add_row(Row::new(3).with("n", "y"), None, None).is_err());
        assert!(!engine.store().contains(&RowId::from(3)));
        assert!(engine.delete_row(&RowId::from(2), None).is_ok());
        assert_eq!(ids(engine.get_visible_rows()), vec!["1"]);
    }

    #[test]
    fn test_delete_row_forgets_its_state() {
        let mut engine = TableEngine::new(grouped(), columns(), TableOptions::default()).unwrap();
        engine.toggle_row_selection(&RowId::from(3)).unwrap();
        engine.set_row_expanded(&RowId::from("b"), false).unwrap();
        engine.delete_row(&RowId::from("b"), None).unwrap();
        assert!(engine.row_selection().is_empty());
        assert!(engine.state_snapshot().row_overrides.is_empty());
        assert_eq!(ids(engine.get_visible_rows()), vec!["a", "1", "2"]);
    }

    #[test]
    fn test_header_click_through_interaction() {
        let mut engine = TableEngine::new(grouped(), columns(), TableOptions::default()).unwrap();
        let target = crate::interaction::HitTarget::Header { col: 0 };
        engine
            .handle_interaction(InteractionEvent::PointerDown { target, x: 0.0 })
            .unwrap();
        let outcome = engine.handle_interaction(InteractionEvent::PointerUp).unwrap();
        assert_eq!(outcome, InteractionOutcome::HeaderClicked { col: 0 });
        assert_eq!(engine.get_sort_state(), Some(&SortState::ascending("name")));
    }

    #[test]
    fn test_grouping_names() {
        let options = TableOptions {
            row_grouping: vec!["team".to_string()],
            ..TableOptions::default()
        };
        let engine = TableEngine::new(grouped(), columns(), options).unwrap();
        assert_eq!(engine.get_grouping_depth("team"), Some(0));
        assert_eq!(engine.get_grouping_property(0), Some("team"));
    }
}
