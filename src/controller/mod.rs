//! The grid data controller.
//!
//! Turns paging, sort and filter changes of a grid into fetches against a
//! [`ResultSetStore`], keeps the server-side cache key of the grid current,
//! and hands the returned rows to the [`GridView`].
//!
//! At most one fetch is in flight per controller. A refresh issued while one
//! is running is only tracked; when the running fetch returns, its response
//! is no longer current, so it is not shown. Its cache key is adopted anyway
//! and the tracked request is dispatched right away with that key.

pub mod collaborators;
pub mod state;


use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::columns::{ColumnDefinition, ColumnRegistry, ColumnsSnapshot, translate_sort};
use crate::error::{GridError, Result};
use crate::export::{ExportTrigger, build_export_request};
use crate::fetch::{
    CacheHandle, DEFAULT_PAGE_SIZE, FetchRequest, FetchResult, FetchTicket, PendingFetchTracker,
    RefreshTrigger,
};
use crate::filter::{FILTER_DEBOUNCE, FilterCriterion, FilterSet};
use crate::store::ResultSetStore;
use crate::types::{CacheKey, DownloadToken, GridRow};

pub use collaborators::{
    ColumnSchemaProvider, CompletionHandler, ErrorReporter, FilterEvent, GridView, PagingEvent,
    RefreshCompletion, RowModelFactory, SortState, ToolbarControl, TracingErrorReporter,
};
pub use state::{LoadState, PagingState, RefreshOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSettings {
    pub page_size: usize,
    pub filter_debounce: Duration,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            filter_debounce: FILTER_DEBOUNCE,
        }
    }
}

struct ControllerState {
    load: LoadState,
    columns: ColumnRegistry,
    filters: FilterSet,
    cache: CacheHandle,
    pending: PendingFetchTracker,
    paging: PagingState,
    last_sort: SortState,
    next_sequence: u64,
    in_flight: bool,
    /// Filter generation included in the last built request.
    sent_filter_generation: u64,
}

struct Dispatch {
    ticket: FetchTicket,
    released: Option<CacheKey>,
    queued: bool,
}

enum Completion {
    Applied {
        rows: Vec<GridRow>,
        total_length: usize,
        trigger: RefreshTrigger,
        released: Option<CacheKey>,
    },
    Failed {
        error: GridError,
        trigger: RefreshTrigger,
        released: Option<CacheKey>,
    },
    Retry {
        ticket: FetchTicket,
        released: Option<CacheKey>,
    },
    Discarded {
        released: Option<CacheKey>,
    },
}

pub struct GridDataController<M> {
    store: Arc<dyn ResultSetStore>,
    view: Arc<dyn GridView<M>>,
    factory: Arc<dyn RowModelFactory<M>>,
    reporter: Arc<dyn ErrorReporter>,
    schema: Option<Arc<dyn ColumnSchemaProvider>>,
    exporter: ExportTrigger,
    settings: GridSettings,
    state: Mutex<ControllerState>,
    handlers: RwLock<Vec<CompletionHandler>>,
    debounce: Mutex<Option<JoinHandle<()>>>,
}

pub struct GridControllerBuilder<M> {
    store: Arc<dyn ResultSetStore>,
    view: Arc<dyn GridView<M>>,
    factory: Arc<dyn RowModelFactory<M>>,
    reporter: Arc<dyn ErrorReporter>,
    schema: Option<Arc<dyn ColumnSchemaProvider>>,
    settings: GridSettings,
    columns: Vec<ColumnDefinition>,
}

impl<M: Send + 'static> GridControllerBuilder<M> {
    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn schema_provider(mut self, schema: Arc<dyn ColumnSchemaProvider>) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn settings(mut self, settings: GridSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn columns(mut self, columns: Vec<ColumnDefinition>) -> Self {
        self.columns = columns;
        self
    }

    pub fn build(self) -> Result<Arc<GridDataController<M>>> {
        if self.settings.page_size == 0 {
            return Err(GridError::InvalidRequest(
                "page size must be greater than zero".to_string(),
            ));
        }
        let columns = ColumnRegistry::with_columns(self.columns)?;
        let paging = PagingState {
            offset: 0,
            limit: self.settings.page_size,
        };

        Ok(Arc::new(GridDataController {
            exporter: ExportTrigger::new(Arc::clone(&self.store)),
            store: self.store,
            view: self.view,
            factory: self.factory,
            reporter: self.reporter,
            schema: self.schema,
            settings: self.settings,
            state: Mutex::new(ControllerState {
                load: LoadState::Idle,
                columns,
                filters: FilterSet::new(),
                cache: CacheHandle::new(),
                pending: PendingFetchTracker::new(),
                paging,
                last_sort: SortState::default(),
                next_sequence: 0,
                in_flight: false,
                sent_filter_generation: 0,
            }),
            handlers: RwLock::new(Vec::new()),
            debounce: Mutex::new(None),
        }))
    }
}

impl<M: Send + 'static> GridDataController<M> {
    pub fn builder(
        store: Arc<dyn ResultSetStore>,
        view: Arc<dyn GridView<M>>,
        factory: Arc<dyn RowModelFactory<M>>,
    ) -> GridControllerBuilder<M> {
        GridControllerBuilder {
            store,
            view,
            factory,
            reporter: Arc::new(TracingErrorReporter),
            schema: None,
            settings: GridSettings::default(),
            columns: Vec::new(),
        }
    }

    pub fn settings(&self) -> GridSettings {
        self.settings
    }

    pub fn load_state(&self) -> LoadState {
        self.state.lock().load
    }

    pub fn cache_key(&self) -> Option<CacheKey> {
        self.state.lock().cache.current_key().cloned()
    }

    pub fn has_pending_fetch(&self) -> bool {
        self.state.lock().pending.has_pending()
    }

    pub fn paging(&self) -> PagingState {
        self.state.lock().paging
    }

    pub fn columns(&self) -> Arc<ColumnsSnapshot> {
        self.state.lock().columns.snapshot()
    }

    pub fn filters(&self) -> Vec<FilterCriterion> {
        self.state.lock().filters.to_fetch_list()
    }

    /// Dropdown choices for a column, from the distinct values of the last fetch.
    pub fn filter_choices(&self, column: &str) -> Option<Vec<String>> {
        let state = self.state.lock();
        let column = state.columns.lookup(column).ok()?.id().clone();
        state.filters.choices(&column).map(<[String]>::to_vec)
    }

    pub fn last_download_token(&self) -> Option<DownloadToken> {
        self.exporter.last_token()
    }

    /// Replace the column set. The caller decides when to refresh.
    pub fn register_columns(&self, columns: Vec<ColumnDefinition>) -> Result<Arc<ColumnsSnapshot>> {
        self.state.lock().columns.register(columns)
    }

    /// Add a handler run after every refresh, after those added before it.
    pub fn on_refresh_complete<F>(&self, handler: F)
    where
        F: Fn(&RefreshCompletion) + Send + Sync + 'static,
    {
        self.handlers.write().push(Box::new(handler));
    }

    /// Fetch the current page.
    ///
    /// Returns `Err` only when the request cannot be built (unknown sort or
    /// visible column, failing schema provider, zero limit); nothing is sent
    /// in that case. Failures of the fetch itself are reported through the
    /// error reporter and show up as [`RefreshOutcome::Failed`].
    pub async fn refresh(&self, trigger: RefreshTrigger) -> Result<RefreshOutcome> {
        let sort = self.view.live_sort();
        self.dispatch(trigger, &sort, None).await
    }

    /// Fetch the window and sort the grid just emitted.
    ///
    /// The event is committed to the paging state only once its request has
    /// been built; a rejected event leaves the previous window in place.
    pub async fn on_paging_change(&self, event: PagingEvent) -> Result<RefreshOutcome> {
        let trigger = if self.state.lock().last_sort != event.sort {
            RefreshTrigger::SortChanged
        } else {
            RefreshTrigger::PageChanged
        };
        self.dispatch(trigger, &event.sort, Some(&event)).await
    }

    async fn dispatch(
        &self,
        trigger: RefreshTrigger,
        sort: &SortState,
        event: Option<&PagingEvent>,
    ) -> Result<RefreshOutcome> {
        let dispatch = self.prepare(trigger, sort, event)?;

        self.view.set_toolbar_enabled(ToolbarControl::Refresh, false);
        self.view.set_toolbar_enabled(ToolbarControl::Export, false);
        self.release(dispatch.released).await;

        if dispatch.queued {
            tracing::debug!(
                sequence = dispatch.ticket.sequence,
                trigger = %trigger,
                "fetch queued behind the one in flight"
            );
            return Ok(RefreshOutcome::Queued);
        }
        Ok(self.drive(dispatch.ticket).await)
    }

    /// Record a keystroke in a column filter and (re)arm the debounce timer.
    ///
    /// Only when no further change arrives within the debounce window is a
    /// single `FiltersChanged` refresh issued. The timer runs on the calling
    /// Tokio runtime; outside one the keystroke is rejected with a
    /// precondition error and the filter is left unchanged.
    pub fn on_filter_change(self: &Arc<Self>, event: FilterEvent) -> Result<()> {
        let runtime = Handle::try_current().map_err(|_| {
            GridError::Precondition(
                "filter changes must be sent from within a Tokio runtime".to_string(),
            )
        })?;
        let generation = {
            let mut state = self.state.lock();
            let column = state.columns.lookup(&event.column)?.id().clone();
            if !state.filters.set_filter(column, event.pattern.as_deref()) {
                return Ok(());
            }
            state.filters.generation()
        };
        self.arm_debounce(&runtime, generation);
        Ok(())
    }

    /// Set a text filter without scheduling a refresh.
    pub fn set_filter(&self, column: &str, pattern: Option<&str>) -> Result<bool> {
        let mut state = self.state.lock();
        let column = state.columns.lookup(column)?.id().clone();
        Ok(state.filters.set_filter(column, pattern))
    }

    /// Pick a dropdown value without scheduling a refresh.
    pub fn select_value(&self, column: &str, value: Option<&str>) -> Result<bool> {
        let mut state = self.state.lock();
        let column = state.columns.lookup(column)?.id().clone();
        Ok(state.filters.select_value(column, value))
    }

    pub fn clear_filters(&self) -> bool {
        self.state.lock().filters.clear_all()
    }

    /// Export what the grid shows, using the cached result set.
    pub async fn export(&self) -> Result<DownloadToken> {
        let live_sort = self.view.live_sort();
        let visible = self.view.visible_column_ids();
        let request = {
            let state = self.state.lock();
            build_export_request(
                state.cache.current_key(),
                &state.columns.snapshot(),
                &live_sort,
                state.filters.to_fetch_list(),
                visible.as_deref(),
            )?
        };
        self.exporter.export(&request).await
    }

    /// Release the cached result set and stop tracking fetches.
    pub async fn dispose(&self) {
        if let Some(timer) = self.debounce.lock().take() {
            timer.abort();
        }
        let released = {
            let mut state = self.state.lock();
            state.pending.pop();
            state.cache.release()
        };
        tracing::debug!(key = ?released, "disposing grid controller");
        self.release(released).await;
    }

    /// Build and validate the request for `trigger`, then commit it.
    ///
    /// Nothing in the controller state changes before the request is known
    /// to be valid: a schema rebuild is staged, translated against and only
    /// then installed, and the window of a paging event replaces the current
    /// one only after validation.
    fn prepare(
        &self,
        trigger: RefreshTrigger,
        sort: &SortState,
        event: Option<&PagingEvent>,
    ) -> Result<Dispatch> {
        let visible = self.view.visible_column_ids();

        let mut state = self.state.lock();
        let staged = match &self.schema {
            Some(schema) if trigger.rebuilds_columns() || state.columns.is_empty() => {
                let fresh = schema.build_columns_definition()?;
                Some(state.columns.stage_rebuild(fresh)?)
            }
            _ => None,
        };

        let snapshot = staged.clone().unwrap_or_else(|| state.columns.snapshot());
        let translated = translate_sort(&snapshot, sort.column.as_deref(), sort.dir)?;
        let columns = snapshot.resolve_visible(visible.as_deref())?;

        let window = match event {
            Some(event) => PagingState {
                offset: event.offset,
                limit: event.limit,
            },
            None => state.paging,
        };
        let offset = if trigger == RefreshTrigger::FiltersChanged {
            0
        } else {
            window.offset
        };
        let mut request = FetchRequest {
            offset,
            limit: window.limit,
            sort: translated,
            filters: state.filters.to_fetch_list(),
            columns,
            cache_key: None,
            recompute_mode: state.cache.choose_recompute_mode(false),
        };
        request.validate()?;

        if let Some(staged) = staged {
            state.columns.install(staged);
        }
        state.paging = PagingState {
            offset,
            limit: window.limit,
        };
        if event.is_some() {
            state.last_sort = sort.clone();
        }

        let released = if trigger.invalidates_cache() {
            state.cache.release()
        } else {
            None
        };
        let filters_changed = state.filters.generation() != state.sent_filter_generation;
        let recompute = trigger.demands_recompute() || filters_changed;
        request.cache_key = state.cache.current_key().cloned();
        request.recompute_mode = state.cache.choose_recompute_mode(recompute);

        state.sent_filter_generation = state.filters.generation();
        state.next_sequence += 1;
        let ticket = FetchTicket {
            sequence: state.next_sequence,
            trigger,
            recompute,
            request,
        };
        state.pending.push(ticket.clone());

        let queued = state.in_flight;
        if !queued {
            state.in_flight = true;
            state.load = LoadState::Loading;
        }
        Ok(Dispatch {
            ticket,
            released,
            queued,
        })
    }

    async fn drive(&self, mut ticket: FetchTicket) -> RefreshOutcome {
        loop {
            tracing::debug!(
                sequence = ticket.sequence,
                trigger = %ticket.trigger,
                mode = %ticket.request.recompute_mode,
                offset = ticket.request.offset,
                limit = ticket.request.limit,
                "dispatching fetch"
            );
            let response = self.store.fetch(&ticket.request).await;

            match self.complete(ticket.sequence, response) {
                Completion::Applied {
                    rows,
                    total_length,
                    trigger,
                    released,
                } => return self.apply(rows, total_length, trigger, released).await,
                Completion::Failed {
                    error,
                    trigger,
                    released,
                } => return self.fail(error, trigger, released).await,
                Completion::Retry {
                    ticket: next,
                    released,
                } => {
                    self.release(released).await;
                    ticket = next;
                }
                Completion::Discarded { released } => {
                    self.release(released).await;
                    return RefreshOutcome::Discarded;
                }
            }
        }
    }

    fn complete(&self, sequence: u64, response: Result<FetchResult>) -> Completion {
        let mut state = self.state.lock();

        if state.pending.is_current(sequence) {
            let trigger = state
                .pending
                .pop()
                .map(|t| t.trigger)
                .unwrap_or(RefreshTrigger::Initial);
            state.in_flight = false;

            return match response {
                Ok(result) => {
                    // Adopt even an inconsistent result so its key gets released later.
                    let released = state.cache.adopt(result.new_cache_key.clone());
                    if let Err(error) = result.check_consistency() {
                        state.load = LoadState::Failed;
                        return Completion::Failed {
                            error,
                            trigger,
                            released,
                        };
                    }
                    state.filters.update_choices(result.distinct_column_values);
                    state.load = LoadState::Idle;
                    Completion::Applied {
                        rows: result.rows,
                        total_length: result.total_length,
                        trigger,
                        released,
                    }
                }
                Err(error) => {
                    state.load = LoadState::Failed;
                    Completion::Failed {
                        error,
                        trigger,
                        released: None,
                    }
                }
            };
        }

        if !state.pending.has_pending() {
            state.in_flight = false;
            state.load = LoadState::Idle;
            let released = response.ok().map(|result| result.new_cache_key);
            tracing::debug!(sequence, "dropping response of a disposed grid");
            return Completion::Discarded { released };
        }

        let released = match response {
            Ok(result) => {
                tracing::debug!(
                    sequence,
                    key = %result.new_cache_key,
                    "superseded response, adopting its cache key"
                );
                state.cache.adopt(result.new_cache_key)
            }
            Err(error) => {
                tracing::warn!(sequence, error = %error, "superseded fetch failed");
                None
            }
        };

        let cache_key = state.cache.current_key().cloned();
        let ControllerState { pending, cache, .. } = &mut *state;
        match pending.try_peek_mut() {
            Some(tracked) => {
                tracked.request.recompute_mode = cache.choose_recompute_mode(tracked.recompute);
                tracked.request.cache_key = cache_key;
                Completion::Retry {
                    ticket: tracked.clone(),
                    released,
                }
            }
            None => Completion::Discarded { released },
        }
    }

    async fn apply(
        &self,
        rows: Vec<GridRow>,
        total_length: usize,
        trigger: RefreshTrigger,
        released: Option<CacheKey>,
    ) -> RefreshOutcome {
        self.release(released).await;

        let row_count = rows.len();
        let models = rows
            .into_iter()
            .map(|row| self.factory.create_row_model(row))
            .collect();
        self.view.set_rows(models, total_length);
        self.view.set_toolbar_enabled(ToolbarControl::Refresh, true);
        self.view.set_toolbar_enabled(ToolbarControl::Export, true);

        tracing::info!(trigger = %trigger, row_count, total_length, "grid refreshed");
        self.notify(RefreshCompletion {
            trigger,
            success: true,
        });
        RefreshOutcome::Applied {
            total_length,
            row_count,
        }
    }

    async fn fail(
        &self,
        error: GridError,
        trigger: RefreshTrigger,
        released: Option<CacheKey>,
    ) -> RefreshOutcome {
        self.release(released).await;

        self.view.set_toolbar_enabled(ToolbarControl::Refresh, true);
        let user_error = error.is_user_error();
        if user_error {
            self.reporter.report_user_error(&error.to_string());
        } else {
            self.reporter.report_unexpected_failure(&error);
        }
        self.notify(RefreshCompletion {
            trigger,
            success: false,
        });

        {
            let mut state = self.state.lock();
            if state.load == LoadState::Failed {
                state.load = LoadState::Idle;
            }
        }
        RefreshOutcome::Failed {
            message: error.to_string(),
            user_error,
        }
    }

    async fn release(&self, key: Option<CacheKey>) {
        let Some(key) = key else {
            return;
        };
        tracing::debug!(key = %key, "releasing cache key");
        if let Err(e) = self.store.release_cache(&key).await {
            tracing::warn!(key = %key, error = %e, "failed to release cache key");
        }
    }

    fn notify(&self, completion: RefreshCompletion) {
        for handler in self.handlers.read().iter() {
            handler(&completion);
        }
    }

    fn arm_debounce(self: &Arc<Self>, runtime: &Handle, generation: u64) {
        let this = Arc::clone(self);
        let delay = self.settings.filter_debounce;
        let timer = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if !this.filters_settled(generation) {
                return;
            }
            // Run the refresh on its own task so a later keystroke aborting
            // this timer cannot cut a fetch short.
            tokio::spawn(async move {
                if let Err(e) = this.refresh(RefreshTrigger::FiltersChanged).await {
                    this.reporter.report_unexpected_failure(&e);
                }
            });
        });

        if let Some(previous) = self.debounce.lock().replace(timer) {
            previous.abort();
        }
    }

    fn filters_settled(&self, generation: u64) -> bool {
        let state = self.state.lock();
        state.filters.generation() == generation && state.sent_filter_generation != generation
    }
}
