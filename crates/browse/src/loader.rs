//! Incremental, cancellable loading of a browse collection.
//!
//! A loader owns the paging cursor, the loading flag, the backing set and the
//! visible rows of one list. Each load fetches (once per epoch), sorts and
//! slices the next page on the blocking pool, enriches it item by item and
//! commits it on the UI thread. Invalidation bumps the epoch and cancels the
//! token; anything an older epoch produces is discarded at commit time.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use common::{DisplayEntity, ResourceTag};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::enrich::{CoverResource, Enricher, Row, VisibilityHints};
use crate::error::SourceError;
use crate::selection::SelectionSet;
use crate::sort::{KeySorter, SortKeys, SortSpec, Sorter};
use crate::ui::UiExecutor;

const CHANGE_CAPACITY: usize = 256;

/// Returns the complete entity set; the loader sorts and slices it.
pub trait CollectionSource<T>: Send + Sync {
    fn get_all(&self) -> Result<Vec<T>, SourceError>;
}

/// Returns one already sorted page. `page` starts at 1.
pub trait PagedSource<T>: Send + Sync {
    fn get_page(&self, page: usize, size: usize, sort: SortSpec) -> Result<Vec<T>, SourceError>;
}

pub enum Paging<T> {
    InMemory(Arc<dyn CollectionSource<T>>),
    Paged(Arc<dyn PagedSource<T>>),
}

impl<T> Clone for Paging<T> {
    fn clone(&self) -> Self {
        match self {
            Paging::InMemory(source) => Paging::InMemory(Arc::clone(source)),
            Paging::Paged(source) => Paging::Paged(Arc::clone(source)),
        }
    }
}

/// What happens to `loading_progress` once a page is committed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressOnFinish {
    Hold,
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoaderOptions {
    pub page_size: usize,
    pub sort: SortSpec,
    pub progress_on_finish: ProgressOnFinish,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            page_size: 50,
            sort: SortSpec::default(),
            progress_on_finish: ProgressOnFinish::Hold,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { page: usize, count: usize },
    /// Nothing left past the current page.
    Exhausted,
    /// Another load was already running; this call did nothing.
    Busy,
    Cancelled,
    /// Finished after an invalidation; results were dropped.
    Stale,
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SortOutcome {
    /// Recorded; takes effect with the next load.
    Deferred,
    Resorted { count: usize },
    Reloaded(LoadOutcome),
}

/// Change notifications for whatever is bound to the list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CollectionChange {
    Appended { start: usize, count: usize },
    Reset,
    Resorted,
    Progress(u8),
    Loading(bool),
    Selection { has_selection: bool, count: usize },
    CoverUpgraded { key: String },
}

struct CollectionState<T> {
    items: Vec<Row<T>>,
    all_items: Option<Arc<Vec<T>>>,
    sorted: Option<(SortSpec, Arc<Vec<T>>)>,
    current_page: usize,
    page_size: usize,
    is_loading: bool,
    loading_progress: u8,
    is_initialized: bool,
    sort: SortSpec,
    selection: SelectionSet,
}

impl<T> CollectionState<T> {
    fn new(options: &LoaderOptions) -> Self {
        Self {
            items: Vec::new(),
            all_items: None,
            sorted: None,
            current_page: 1,
            page_size: options.page_size.max(1),
            is_loading: false,
            loading_progress: 0,
            is_initialized: false,
            sort: options.sort,
            selection: SelectionSet::new(),
        }
    }
}

/// Point-in-time copy of a loader's state.
#[derive(Clone, Debug)]
pub struct LoaderSnapshot<T> {
    pub items: Vec<Row<T>>,
    pub backing_len: Option<usize>,
    pub current_page: usize,
    pub page_size: usize,
    pub is_loading: bool,
    pub loading_progress: u8,
    pub is_initialized: bool,
    pub sort: SortSpec,
    pub selected: Vec<String>,
    pub has_selection: bool,
    pub epoch: u64,
}

struct LoadRequest<T> {
    epoch: u64,
    token: CancellationToken,
    page: usize,
    page_size: usize,
    sort: SortSpec,
    all_items: Option<Arc<Vec<T>>>,
    sorted: Option<(SortSpec, Arc<Vec<T>>)>,
}

struct PageData<T> {
    rows: Vec<Row<T>>,
    all_items: Option<Arc<Vec<T>>>,
    sorted: Option<(SortSpec, Arc<Vec<T>>)>,
}

enum FetchError {
    Cancelled,
    Source(SourceError),
}

impl From<SourceError> for FetchError {
    fn from(err: SourceError) -> Self {
        FetchError::Source(err)
    }
}

enum SortPlan<T> {
    Deferred,
    Reload,
    Resort {
        epoch: u64,
        all: Arc<Vec<T>>,
        visible: HashSet<String>,
        count: usize,
    },
}

struct Inner<T> {
    name: String,
    ui: UiExecutor,
    paging: Paging<T>,
    sorter: Arc<dyn Sorter<T>>,
    enricher: Option<Arc<dyn Enricher<T>>>,
    hints: Option<Arc<dyn VisibilityHints>>,
    progress_on_finish: ProgressOnFinish,
    state: Mutex<CollectionState<T>>,
    epoch: AtomicU64,
    cancel: Mutex<CancellationToken>,
    closed: AtomicBool,
    changes: broadcast::Sender<CollectionChange>,
}

pub struct LoaderBuilder<T> {
    name: String,
    ui: UiExecutor,
    paging: Paging<T>,
    sorter: Arc<dyn Sorter<T>>,
    enricher: Option<Arc<dyn Enricher<T>>>,
    hints: Option<Arc<dyn VisibilityHints>>,
    options: LoaderOptions,
}

impl<T: SortKeys> LoaderBuilder<T> {
    pub fn new(name: &str, ui: UiExecutor, paging: Paging<T>) -> Self {
        Self {
            name: name.to_string(),
            ui,
            paging,
            sorter: Arc::new(KeySorter),
            enricher: None,
            hints: None,
            options: LoaderOptions::default(),
        }
    }
}

impl<T: DisplayEntity> LoaderBuilder<T> {
    pub fn sorter(mut self, sorter: Arc<dyn Sorter<T>>) -> Self {
        self.sorter = sorter;
        self
    }

    pub fn enricher(mut self, enricher: Arc<dyn Enricher<T>>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn hints(mut self, hints: Arc<dyn VisibilityHints>) -> Self {
        self.hints = Some(hints);
        self
    }

    pub fn options(mut self, options: LoaderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> IncrementalLoader<T> {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        IncrementalLoader {
            inner: Arc::new(Inner {
                name: self.name,
                ui: self.ui,
                paging: self.paging,
                sorter: self.sorter,
                enricher: self.enricher,
                hints: self.hints,
                progress_on_finish: self.options.progress_on_finish,
                state: Mutex::new(CollectionState::new(&self.options)),
                epoch: AtomicU64::new(0),
                cancel: Mutex::new(CancellationToken::new()),
                closed: AtomicBool::new(false),
                changes,
            }),
        }
    }
}

pub struct IncrementalLoader<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for IncrementalLoader<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: DisplayEntity> IncrementalLoader<T> {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn ui(&self) -> &UiExecutor {
        &self.inner.ui
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CollectionChange> {
        self.inner.changes.subscribe()
    }

    pub fn epoch(&self) -> u64 {
        self.inner.current_epoch()
    }

    /// Load and append the next page. Returns [`LoadOutcome::Busy`] right away
    /// when a load is already running; calls are dropped, not queued.
    pub async fn load_more(&self) -> LoadOutcome {
        if self.inner.closed.load(Ordering::SeqCst) {
            return LoadOutcome::Cancelled;
        }
        let inner = Arc::clone(&self.inner);
        let request = match self.inner.ui.run(move || inner.begin_load()).await {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!("{}: load already running", self.inner.name);
                return LoadOutcome::Busy;
            }
            Err(err) => {
                warn!("{}: load not started: {}", self.inner.name, err);
                return LoadOutcome::Failed(err.to_string());
            }
        };
        let epoch = request.epoch;
        let page = request.page;
        let token = request.token.clone();

        let inner = Arc::clone(&self.inner);
        let fetched = tokio::task::spawn_blocking(move || inner.fetch_page(&request)).await;

        match fetched {
            Ok(Ok(data)) => self.commit(epoch, token, data).await,
            Ok(Err(FetchError::Cancelled)) => {
                debug!("{}: page {} cancelled", self.inner.name, page);
                self.abort(epoch).await;
                LoadOutcome::Cancelled
            }
            Ok(Err(FetchError::Source(err))) => {
                warn!("{}: failed to load page {}: {}", self.inner.name, page, err);
                self.abort(epoch).await;
                LoadOutcome::Failed(err.to_string())
            }
            Err(err) => {
                warn!("{}: page {} worker failed: {}", self.inner.name, page, err);
                self.abort(epoch).await;
                LoadOutcome::Failed(err.to_string())
            }
        }
    }

    /// Record a new sort. Visible rows are re-materialized only for a user
    /// action on an already loaded backing set; anything else is deferred to
    /// the next load.
    pub async fn apply_sort(&self, spec: SortSpec, user_initiated: bool) -> SortOutcome {
        let inner = Arc::clone(&self.inner);
        let plan = match self
            .inner
            .ui
            .run(move || inner.plan_sort(spec, user_initiated))
            .await
        {
            Ok(plan) => plan,
            Err(err) => {
                warn!("{}: could not apply sort: {}", self.inner.name, err);
                return SortOutcome::Deferred;
            }
        };

        match plan {
            SortPlan::Deferred => SortOutcome::Deferred,
            SortPlan::Reload => {
                self.reset().await;
                SortOutcome::Reloaded(self.load_more().await)
            }
            SortPlan::Resort {
                epoch,
                all,
                visible,
                count,
            } => {
                let inner = Arc::clone(&self.inner);
                let prepared = tokio::task::spawn_blocking(move || {
                    inner.prepare_resort(&all, spec, count, &visible)
                })
                .await;
                let (sorted, slots) = match prepared {
                    Ok(prepared) => prepared,
                    Err(err) => {
                        warn!("{}: resort worker failed: {}", self.inner.name, err);
                        return SortOutcome::Deferred;
                    }
                };
                let inner = Arc::clone(&self.inner);
                self.inner
                    .ui
                    .run(move || inner.commit_resort(epoch, spec, sorted, slots))
                    .await
                    .unwrap_or(SortOutcome::Deferred)
            }
        }
    }

    /// Start a new epoch: cancel in-flight work and clear rows, backing set,
    /// cursor and selection.
    pub async fn reset(&self) {
        let inner = Arc::clone(&self.inner);
        if let Err(err) = self.inner.ui.run(move || inner.reset_on_ui()).await {
            warn!("{}: reset not applied: {}", self.inner.name, err);
        }
    }

    /// Reset and immediately load the first page again.
    pub async fn invalidate(&self) -> LoadOutcome {
        self.reset().await;
        self.load_more().await
    }

    /// Cancel in-flight work for good. Later loads return `Cancelled`.
    pub fn cancel(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.cancel.lock().cancel();
    }

    /// Mark a row selected or not. UI-thread operation; queued when called
    /// elsewhere.
    pub fn set_selected(&self, key: &str, selected: bool) {
        let inner = Arc::clone(&self.inner);
        let key = key.to_string();
        self.inner.ui.dispatch(move || {
            inner.update_selection(|state| {
                let Some(row) = state.items.iter_mut().find(|row| row.key() == key) else {
                    return false;
                };
                row.selected = selected;
                state.selection.sync(&key, selected)
            });
        });
    }

    /// Flip a row's selected flag and sync the selection set with it.
    pub fn toggle_selection(&self, key: &str) {
        let inner = Arc::clone(&self.inner);
        let key = key.to_string();
        self.inner.ui.dispatch(move || {
            inner.update_selection(|state| {
                let Some(row) = state.items.iter_mut().find(|row| row.key() == key) else {
                    return false;
                };
                row.selected = !row.selected;
                let selected = row.selected;
                state.selection.sync(&key, selected)
            });
        });
    }

    pub fn clear_selection(&self) {
        let inner = Arc::clone(&self.inner);
        self.inner.ui.dispatch(move || {
            inner.update_selection(|state| {
                for row in state.items.iter_mut() {
                    row.selected = false;
                }
                let changed = state.selection.has_selection();
                state.selection.clear();
                changed
            });
        });
    }

    /// Forward a viewport visibility change to the resource loader.
    pub fn notify_visible(&self, key: &str, is_visible: bool) {
        let Some(hints) = self.inner.hints.clone() else {
            return;
        };
        let cover_ref = {
            let state = self.inner.state.lock();
            state
                .items
                .iter()
                .find(|row| row.key() == key)
                .and_then(|row| row.entity.cover_ref().cloned())
        };
        if let Some(cover_ref) = cover_ref {
            hints.notify_visible(&cover_ref, is_visible);
        }
    }

    /// Upgrade artwork of the given rows to high resolution. Rows already at
    /// high resolution are skipped. Returns how many rows were upgraded.
    pub async fn load_high_res(&self, keys: &[String]) -> usize {
        let Some(enricher) = self.inner.enricher.clone() else {
            return 0;
        };
        let wanted: HashSet<String> = keys.iter().cloned().collect();
        let (epoch, token, pending) = {
            let state = self.inner.state.lock();
            let pending: Vec<Row<T>> = state
                .items
                .iter()
                .filter(|row| wanted.contains(row.key()) && row.needs_high_res())
                .cloned()
                .collect();
            (
                self.inner.current_epoch(),
                self.inner.cancel.lock().clone(),
                pending,
            )
        };
        if pending.is_empty() {
            return 0;
        }

        let name = self.inner.name.clone();
        let upgraded = tokio::task::spawn_blocking(move || {
            let mut out = Vec::with_capacity(pending.len());
            for mut row in pending {
                if token.is_cancelled() {
                    break;
                }
                match enricher.enrich(&mut row, ResourceTag::High, true) {
                    Ok(()) => {
                        if let Some(cover) = row.cover.take() {
                            out.push((row.key().to_string(), cover));
                        }
                    }
                    Err(err) => {
                        warn!("{}: high resolution for {} failed: {}", name, row.key(), err)
                    }
                }
            }
            out
        })
        .await;
        let upgraded = match upgraded {
            Ok(upgraded) => upgraded,
            Err(err) => {
                warn!("{}: high resolution worker failed: {}", self.inner.name, err);
                return 0;
            }
        };

        let inner = Arc::clone(&self.inner);
        self.inner
            .ui
            .run(move || inner.commit_covers(epoch, upgraded))
            .await
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> LoaderSnapshot<T> {
        let state = self.inner.state.lock();
        LoaderSnapshot {
            items: state.items.clone(),
            backing_len: state.all_items.as_ref().map(|all| all.len()),
            current_page: state.current_page,
            page_size: state.page_size,
            is_loading: state.is_loading,
            loading_progress: state.loading_progress,
            is_initialized: state.is_initialized,
            sort: state.sort,
            selected: state.selection.keys().to_vec(),
            has_selection: state.selection.has_selection(),
            epoch: self.inner.current_epoch(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().items.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner
            .state
            .lock()
            .items
            .iter()
            .map(|row| row.key().to_string())
            .collect()
    }

    pub fn current_page(&self) -> usize {
        self.inner.state.lock().current_page
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.lock().is_loading
    }

    pub fn loading_progress(&self) -> u8 {
        self.inner.state.lock().loading_progress
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.state.lock().is_initialized
    }

    pub fn has_selection(&self) -> bool {
        self.inner.state.lock().selection.has_selection()
    }

    pub fn sort(&self) -> SortSpec {
        self.inner.state.lock().sort
    }

    /// Selected entities in selection order.
    pub fn selected_entities(&self) -> Vec<T> {
        let state = self.inner.state.lock();
        let rows: HashMap<&str, &Row<T>> = state.items.iter().map(|row| (row.key(), row)).collect();
        state
            .selection
            .keys()
            .iter()
            .filter_map(|key| rows.get(key.as_str()).map(|row| row.entity.clone()))
            .collect()
    }

    pub fn entity(&self, key: &str) -> Option<T> {
        self.inner
            .state
            .lock()
            .items
            .iter()
            .find(|row| row.key() == key)
            .map(|row| row.entity.clone())
    }

    async fn commit(&self, epoch: u64, token: CancellationToken, data: PageData<T>) -> LoadOutcome {
        let inner = Arc::clone(&self.inner);
        match self
            .inner
            .ui
            .run(move || inner.commit_page(epoch, token, data))
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("{}: page not committed: {}", self.inner.name, err);
                self.inner.finish_if_current(epoch);
                LoadOutcome::Failed(err.to_string())
            }
        }
    }

    async fn abort(&self, epoch: u64) {
        let inner = Arc::clone(&self.inner);
        if self
            .inner
            .ui
            .run(move || inner.abort_on_ui(epoch))
            .await
            .is_err()
        {
            self.inner.finish_if_current(epoch);
        }
    }
}

impl<T: DisplayEntity> Inner<T> {
    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    fn emit(&self, change: CollectionChange) {
        let _ = self.changes.send(change);
    }

    /// Runs on the UI thread. `None` when a load is already running.
    fn begin_load(&self) -> Option<LoadRequest<T>> {
        let mut state = self.state.lock();
        if state.is_loading {
            return None;
        }
        state.is_loading = true;
        let request = LoadRequest {
            epoch: self.current_epoch(),
            token: self.cancel.lock().clone(),
            page: state.current_page,
            page_size: state.page_size,
            sort: state.sort,
            all_items: state.all_items.clone(),
            sorted: state.sorted.clone(),
        };
        drop(state);
        self.emit(CollectionChange::Loading(true));
        Some(request)
    }

    fn post_progress(self: &Arc<Self>, epoch: u64, progress: u8) {
        let inner = Arc::clone(self);
        self.ui.dispatch(move || {
            if inner.current_epoch() != epoch {
                return;
            }
            inner.state.lock().loading_progress = progress;
            inner.emit(CollectionChange::Progress(progress));
        });
    }

    /// Runs on the blocking pool.
    fn fetch_page(self: &Arc<Self>, request: &LoadRequest<T>) -> Result<PageData<T>, FetchError> {
        if request.token.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        let mut data = PageData {
            rows: Vec::new(),
            all_items: None,
            sorted: None,
        };

        let entities = match &self.paging {
            Paging::InMemory(source) => {
                let all = match &request.all_items {
                    Some(all) => Arc::clone(all),
                    None => {
                        let all = Arc::new(source.get_all()?);
                        debug!("{}: fetched {} items", self.name, all.len());
                        data.all_items = Some(Arc::clone(&all));
                        all
                    }
                };
                let sorted = match &request.sorted {
                    Some((spec, sorted)) if *spec == request.sort && data.all_items.is_none() => {
                        Arc::clone(sorted)
                    }
                    _ => {
                        let sorted = Arc::new(self.sorter.sort_items(&all, request.sort));
                        data.sorted = Some((request.sort, Arc::clone(&sorted)));
                        sorted
                    }
                };
                page_slice(&sorted, request.page, request.page_size).to_vec()
            }
            Paging::Paged(source) => {
                source.get_page(request.page, request.page_size, request.sort)?
            }
        };

        let total = entities.len();
        let mut rows = Vec::with_capacity(total);
        for (idx, entity) in entities.into_iter().enumerate() {
            if request.token.is_cancelled() {
                debug!("{}: cancelled after {} of {} items", self.name, idx, total);
                return Err(FetchError::Cancelled);
            }
            let mut row = Row::new(entity);
            if let Some(enricher) = &self.enricher {
                if let Err(err) = enricher.enrich(&mut row, ResourceTag::Low, false) {
                    warn!("{}: skipping artwork for {}: {}", self.name, row.key(), err);
                }
            }
            rows.push(row);
            self.post_progress(request.epoch, progress_percent(idx + 1, total));
        }
        data.rows = rows;
        Ok(data)
    }

    /// Runs on the UI thread.
    fn commit_page(&self, epoch: u64, token: CancellationToken, data: PageData<T>) -> LoadOutcome {
        let mut state = self.state.lock();
        if self.current_epoch() != epoch {
            debug!("{}: dropping page from epoch {}", self.name, epoch);
            return LoadOutcome::Stale;
        }
        if token.is_cancelled() {
            state.is_loading = false;
            state.loading_progress = 0;
            drop(state);
            self.emit(CollectionChange::Loading(false));
            return LoadOutcome::Cancelled;
        }

        if let Some(all) = data.all_items {
            state.all_items = Some(all);
        }
        if let Some(sorted) = data.sorted {
            state.sorted = Some(sorted);
        }
        state.is_loading = false;
        state.is_initialized = true;

        let count = data.rows.len();
        if count == 0 {
            state.loading_progress = 0;
            drop(state);
            self.emit(CollectionChange::Loading(false));
            return LoadOutcome::Exhausted;
        }

        let start = state.items.len();
        let page = state.current_page;
        state.items.extend(data.rows);
        state.current_page += 1;
        let progress = match self.progress_on_finish {
            ProgressOnFinish::Hold => 100,
            ProgressOnFinish::Reset => 0,
        };
        state.loading_progress = progress;
        drop(state);

        info!("{}: page {} committed ({} items)", self.name, page, count);
        self.emit(CollectionChange::Appended { start, count });
        self.emit(CollectionChange::Progress(progress));
        self.emit(CollectionChange::Loading(false));
        LoadOutcome::Loaded { page, count }
    }

    fn abort_on_ui(&self, epoch: u64) {
        if self.finish_if_current(epoch) {
            self.emit(CollectionChange::Progress(0));
            self.emit(CollectionChange::Loading(false));
        }
    }

    fn finish_if_current(&self, epoch: u64) -> bool {
        let mut state = self.state.lock();
        if self.current_epoch() != epoch {
            return false;
        }
        state.is_loading = false;
        state.loading_progress = 0;
        true
    }

    /// Caller must hold the state lock.
    fn advance_epoch(&self) -> u64 {
        let mut token = self.cancel.lock();
        token.cancel();
        if !self.closed.load(Ordering::SeqCst) {
            *token = CancellationToken::new();
        }
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn reset_on_ui(&self) {
        let mut state = self.state.lock();
        let epoch = self.advance_epoch();
        state.items.clear();
        state.all_items = None;
        state.sorted = None;
        state.current_page = 1;
        state.is_loading = false;
        state.loading_progress = 0;
        state.is_initialized = false;
        state.selection.clear();
        drop(state);

        info!("{}: reset to epoch {}", self.name, epoch);
        self.emit(CollectionChange::Reset);
        self.emit(CollectionChange::Selection {
            has_selection: false,
            count: 0,
        });
        self.emit(CollectionChange::Progress(0));
        self.emit(CollectionChange::Loading(false));
    }

    fn update_selection<F>(&self, apply: F)
    where
        F: FnOnce(&mut CollectionState<T>) -> bool,
    {
        let mut state = self.state.lock();
        if !apply(&mut *state) {
            return;
        }
        let change = CollectionChange::Selection {
            has_selection: state.selection.has_selection(),
            count: state.selection.len(),
        };
        drop(state);
        self.emit(change);
    }

    fn plan_sort(&self, spec: SortSpec, user_initiated: bool) -> SortPlan<T> {
        let mut state = self.state.lock();
        state.sort = spec;
        if !user_initiated {
            return SortPlan::Deferred;
        }
        match &self.paging {
            Paging::Paged(_) if state.is_initialized => SortPlan::Reload,
            Paging::Paged(_) => SortPlan::Deferred,
            Paging::InMemory(_) => match &state.all_items {
                Some(all) => SortPlan::Resort {
                    epoch: self.current_epoch(),
                    all: Arc::clone(all),
                    visible: state.items.iter().map(|row| row.key().to_string()).collect(),
                    count: state.items.len(),
                },
                None => SortPlan::Deferred,
            },
        }
    }

    /// Runs on the blocking pool. Rows that were not visible before the
    /// resort are enriched here; visible ones are reused at commit.
    fn prepare_resort(
        &self,
        all: &[T],
        spec: SortSpec,
        count: usize,
        visible: &HashSet<String>,
    ) -> (Arc<Vec<T>>, Vec<(String, Option<Row<T>>)>) {
        let sorted = Arc::new(self.sorter.sort_items(all, spec));
        let slots = sorted
            .iter()
            .take(count)
            .map(|entity| {
                let key = entity.key().to_string();
                if visible.contains(&key) {
                    return (key, None);
                }
                let mut row = Row::new(entity.clone());
                if let Some(enricher) = &self.enricher {
                    if let Err(err) = enricher.enrich(&mut row, ResourceTag::Low, false) {
                        warn!("{}: skipping artwork for {}: {}", self.name, key, err);
                    }
                }
                (key, Some(row))
            })
            .collect();
        (sorted, slots)
    }

    fn commit_resort(
        &self,
        epoch: u64,
        spec: SortSpec,
        sorted: Arc<Vec<T>>,
        slots: Vec<(String, Option<Row<T>>)>,
    ) -> SortOutcome {
        let mut state = self.state.lock();
        if self.current_epoch() != epoch || state.sort != spec {
            debug!("{}: resort superseded", self.name);
            return SortOutcome::Deferred;
        }
        let was_loading = state.is_loading;
        self.advance_epoch();

        let mut previous: HashMap<String, Row<T>> = state
            .items
            .drain(..)
            .map(|row| (row.key().to_string(), row))
            .collect();
        let items: Vec<Row<T>> = slots
            .into_iter()
            .filter_map(|(key, fresh)| previous.remove(&key).or(fresh))
            .collect();
        let count = items.len();
        let visible: HashSet<String> = items.iter().map(|row| row.key().to_string()).collect();
        state.items = items;
        state.sorted = Some((spec, sorted));
        if was_loading {
            state.is_loading = false;
            state.loading_progress = 0;
        }
        let selection_changed = state.selection.retain(|key| visible.contains(key));
        let selection = CollectionChange::Selection {
            has_selection: state.selection.has_selection(),
            count: state.selection.len(),
        };
        drop(state);

        info!("{}: resorted {} visible items by {:?}", self.name, count, spec);
        self.emit(CollectionChange::Resorted);
        if selection_changed {
            self.emit(selection);
        }
        if was_loading {
            self.emit(CollectionChange::Progress(0));
            self.emit(CollectionChange::Loading(false));
        }
        SortOutcome::Resorted { count }
    }

    fn commit_covers(&self, epoch: u64, upgraded: Vec<(String, CoverResource)>) -> usize {
        if self.current_epoch() != epoch {
            return 0;
        }
        let mut state = self.state.lock();
        let mut changed = Vec::new();
        for (key, cover) in upgraded {
            let Some(row) = state.items.iter_mut().find(|row| row.key() == key) else {
                continue;
            };
            if row.cover_tag() == Some(ResourceTag::High) {
                continue;
            }
            row.cover = Some(cover);
            changed.push(key);
        }
        drop(state);
        let count = changed.len();
        for key in changed {
            self.emit(CollectionChange::CoverUpgraded { key });
        }
        count
    }
}

fn page_slice<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (completed.min(total) * 100 / total) as u8
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use common::ResourceTag;
    use parking_lot::{Condvar, Mutex};
    use tokio::sync::Notify;

    use crate::enrich::{Enricher, Row};
    use crate::error::EnrichError;

    /// Parks the enricher on its `block_at`-th call until released.
    pub struct GateEnricher {
        block_at: usize,
        calls: AtomicUsize,
        pub reached: Notify,
        released: Mutex<bool>,
        resume: Condvar,
    }

    impl GateEnricher {
        pub fn new(block_at: usize) -> std::sync::Arc<Self> {
            std::sync::Arc::new(Self {
                block_at,
                calls: AtomicUsize::new(0),
                reached: Notify::new(),
                released: Mutex::new(false),
                resume: Condvar::new(),
            })
        }

        pub fn release(&self) {
            *self.released.lock() = true;
            self.resume.notify_all();
        }
    }

    impl<T> Enricher<T> for GateEnricher {
        fn enrich(
            &self,
            _row: &mut Row<T>,
            _quality: ResourceTag,
            _mark_visible: bool,
        ) -> Result<(), EnrichError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.block_at {
                self.reached.notify_one();
                let mut released = self.released.lock();
                while !*released {
                    self.resume.wait(&mut released);
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;

    use common::{Album, CoverRef};
    use library::{Catalog, CoverLocation, LibrarySnapshot};

    use super::testing::GateEnricher;
    use crate::enrich::CoverEnricher;
    use crate::error::EnrichError;
    use crate::sort::SortKind;

    fn album(idx: usize) -> Album {
        Album {
            id: format!("al{:03}", idx),
            artist_id: "ar".to_string(),
            artist_name: "Artist".to_string(),
            title: format!("Album {:03}", idx),
            year: None,
            folder_relpath: format!("Artist/Album {:03}", idx),
            cover_ref: Some(CoverRef::File {
                relpath: format!("Artist/Album {:03}/cover.jpg", idx),
            }),
            genres: Vec::new(),
            added_at: None,
            track_count: 10,
        }
    }

    fn albums(count: usize) -> Vec<Album> {
        (0..count).map(album).collect()
    }

    struct TestSource {
        items: Vec<Album>,
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    impl TestSource {
        fn new(items: Vec<Album>) -> Arc<Self> {
            Arc::new(Self {
                items,
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            })
        }
    }

    impl CollectionSource<Album> for TestSource {
        fn get_all(&self) -> Result<Vec<Album>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(SourceError::Unavailable("offline".to_string()));
            }
            Ok(self.items.clone())
        }
    }

    struct PagedAlbums {
        items: Vec<Album>,
        requests: Mutex<Vec<(usize, usize, SortSpec)>>,
    }

    impl PagedSource<Album> for PagedAlbums {
        fn get_page(
            &self,
            page: usize,
            size: usize,
            sort: SortSpec,
        ) -> Result<Vec<Album>, SourceError> {
            self.requests.lock().push((page, size, sort));
            let sorted = KeySorter.sort_items(&self.items, sort);
            Ok(page_slice(&sorted, page, size).to_vec())
        }
    }

    /// Fails for every album whose index is odd.
    struct FlakyEnricher;

    impl Enricher<Album> for FlakyEnricher {
        fn enrich(
            &self,
            row: &mut Row<Album>,
            quality: ResourceTag,
            _mark_visible: bool,
        ) -> Result<(), EnrichError> {
            let odd = row
                .key()
                .ends_with(|c: char| c.to_digit(10).map(|d| d % 2 == 1).unwrap_or(false));
            if odd {
                return Err(EnrichError::Unavailable("decode failed".to_string()));
            }
            let reference = row
                .entity
                .cover_ref
                .clone()
                .ok_or_else(|| EnrichError::Unavailable("no cover".to_string()))?;
            row.cover = Some(CoverResource {
                reference,
                tag: quality,
                location: CoverLocation {
                    source: PathBuf::from("/music/cover.jpg"),
                    embedded: false,
                    max_edge: None,
                },
            });
            Ok(())
        }
    }

    fn ui() -> UiExecutor {
        let (ui, _thread) = UiExecutor::spawn("loader-test-ui").unwrap();
        ui
    }

    fn options(page_size: usize) -> LoaderOptions {
        LoaderOptions {
            page_size,
            ..LoaderOptions::default()
        }
    }

    fn in_memory(source: &Arc<TestSource>, page_size: usize) -> LoaderBuilder<Album> {
        let paging = Paging::InMemory(Arc::clone(source) as Arc<dyn CollectionSource<Album>>);
        LoaderBuilder::new("albums", ui(), paging).options(options(page_size))
    }

    fn drain(rx: &mut broadcast::Receiver<CollectionChange>) -> Vec<CollectionChange> {
        let mut out = Vec::new();
        while let Ok(change) = rx.try_recv() {
            out.push(change);
        }
        out
    }

    #[test]
    fn page_slice_bounds() {
        let items: Vec<usize> = (0..120).collect();
        assert_eq!(page_slice(&items, 1, 50).len(), 50);
        assert_eq!(page_slice(&items, 3, 50), &items[100..120]);
        assert!(page_slice(&items, 4, 50).is_empty());
        assert_eq!(progress_percent(30, 50), 60);
        assert_eq!(progress_percent(0, 0), 100);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn loads_pages_until_exhausted() {
        let source = TestSource::new(albums(120));
        let loader = in_memory(&source, 50).build();
        let mut changes = loader.subscribe();

        assert_eq!(loader.load_more().await, LoadOutcome::Loaded { page: 1, count: 50 });
        assert_eq!(loader.load_more().await, LoadOutcome::Loaded { page: 2, count: 50 });
        assert_eq!(loader.load_more().await, LoadOutcome::Loaded { page: 3, count: 20 });
        assert_eq!(loader.load_more().await, LoadOutcome::Exhausted);
        loader.ui().flush().await.unwrap();

        let snapshot = loader.snapshot();
        assert_eq!(snapshot.items.len(), 120);
        assert_eq!(snapshot.current_page, 4);
        assert_eq!(snapshot.loading_progress, 0);
        assert!(snapshot.is_initialized);
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.backing_len, Some(120));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let keys = loader.keys();
        assert_eq!(keys.first().map(String::as_str), Some("al000"));
        assert_eq!(keys.last().map(String::as_str), Some("al119"));

        let changes = drain(&mut changes);
        let second = changes
            .iter()
            .position(|c| *c == CollectionChange::Appended { start: 50, count: 50 })
            .unwrap();
        let third = changes
            .iter()
            .position(|c| *c == CollectionChange::Appended { start: 100, count: 20 })
            .unwrap();
        assert!(changes[second..third].contains(&CollectionChange::Progress(100)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn progress_holds_or_resets_after_a_page() {
        let source = TestSource::new(albums(10));
        let loader = in_memory(&source, 4).build();
        loader.load_more().await;
        assert_eq!(loader.loading_progress(), 100);

        let loader = in_memory(&source, 4)
            .options(LoaderOptions {
                page_size: 4,
                sort: SortSpec::default(),
                progress_on_finish: ProgressOnFinish::Reset,
            })
            .build();
        loader.load_more().await;
        assert_eq!(loader.loading_progress(), 0);
        assert_eq!(loader.len(), 4);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_load_reports_busy() {
        let source = TestSource::new(albums(20));
        let gate = GateEnricher::new(1);
        let loader = in_memory(&source, 10)
            .enricher(Arc::clone(&gate) as Arc<dyn Enricher<Album>>)
            .build();

        let running = loader.clone();
        let first = tokio::spawn(async move { running.load_more().await });
        gate.reached.notified().await;

        assert!(loader.is_loading());
        assert_eq!(loader.load_more().await, LoadOutcome::Busy);
        gate.release();

        assert_eq!(first.await.unwrap(), LoadOutcome::Loaded { page: 1, count: 10 });
        assert!(!loader.is_loading());
        assert_eq!(loader.current_page(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn invalidation_discards_in_flight_page() {
        let source = TestSource::new(albums(120));
        let gate = GateEnricher::new(30);
        let loader = in_memory(&source, 50)
            .enricher(Arc::clone(&gate) as Arc<dyn Enricher<Album>>)
            .build();

        let running = loader.clone();
        let first = tokio::spawn(async move { running.load_more().await });
        gate.reached.notified().await;

        loader.reset().await;
        let snapshot = loader.snapshot();
        assert!(snapshot.items.is_empty());
        assert_eq!(snapshot.current_page, 1);
        assert!(!snapshot.is_loading);
        assert!(!snapshot.is_initialized);
        assert_eq!(snapshot.loading_progress, 0);

        gate.release();
        assert_eq!(first.await.unwrap(), LoadOutcome::Cancelled);
        loader.ui().flush().await.unwrap();
        assert!(loader.is_empty());
        assert!(!loader.is_loading());
        assert_eq!(loader.loading_progress(), 0);

        assert_eq!(loader.load_more().await, LoadOutcome::Loaded { page: 1, count: 50 });
        assert_eq!(loader.len(), 50);
        assert_eq!(loader.keys()[0], "al000");
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn loading_flag_is_set_on_the_ui_thread() {
        let source = TestSource::new(albums(5));
        let loader = in_memory(&source, 10).build();
        let (hold_tx, hold_rx) = std::sync::mpsc::channel::<()>();
        loader.ui().dispatch(move || {
            let _ = hold_rx.recv();
        });

        let running = loader.clone();
        let load = tokio::spawn(async move { running.load_more().await });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!loader.is_loading());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);

        hold_tx.send(()).unwrap();
        assert_eq!(load.await.unwrap(), LoadOutcome::Loaded { page: 1, count: 5 });
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn user_sort_during_load_clears_progress() {
        let source = TestSource::new(albums(120));
        let gate = GateEnricher::new(80);
        let loader = in_memory(&source, 50)
            .enricher(Arc::clone(&gate) as Arc<dyn Enricher<Album>>)
            .build();
        loader.load_more().await;

        let running = loader.clone();
        let second = tokio::spawn(async move { running.load_more().await });
        gate.reached.notified().await;
        loader.ui().flush().await.unwrap();
        assert!(loader.is_loading());
        assert_eq!(loader.loading_progress(), 58);

        let mut changes = loader.subscribe();
        let outcome = loader
            .apply_sort(SortSpec::descending(SortKind::Title), true)
            .await;
        assert_eq!(outcome, SortOutcome::Resorted { count: 50 });
        assert!(!loader.is_loading());
        assert_eq!(loader.loading_progress(), 0);
        let seen = drain(&mut changes);
        assert!(seen.contains(&CollectionChange::Progress(0)));
        assert_eq!(seen.last(), Some(&CollectionChange::Loading(false)));

        gate.release();
        assert_eq!(second.await.unwrap(), LoadOutcome::Cancelled);
        loader.ui().flush().await.unwrap();
        assert_eq!(loader.len(), 50);
        assert_eq!(loader.keys()[0], "al119");
        assert_eq!(loader.loading_progress(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn non_user_sort_is_deferred_until_next_load() {
        let source = TestSource::new(albums(30));
        let loader = in_memory(&source, 10).build();
        let spec = SortSpec::descending(SortKind::Title);

        assert_eq!(loader.apply_sort(spec, false).await, SortOutcome::Deferred);
        assert!(loader.is_empty());
        assert!(!loader.is_initialized());
        assert_eq!(loader.sort(), spec);

        loader.load_more().await;
        assert_eq!(loader.keys()[0], "al029");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn non_user_sort_after_load_keeps_visible_rows() {
        let source = TestSource::new(albums(30));
        let loader = in_memory(&source, 10).build();
        loader.load_more().await;

        let spec = SortSpec::descending(SortKind::Title);
        assert_eq!(loader.apply_sort(spec, false).await, SortOutcome::Deferred);
        assert_eq!(loader.keys()[0], "al000");
        assert_eq!(loader.sort(), spec);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn user_sort_resorts_loaded_rows() {
        let source = TestSource::new(albums(120));
        let loader = in_memory(&source, 50).build();
        loader.load_more().await;
        loader.set_selected("al010", true);
        loader.set_selected("al100", true);
        loader.ui().flush().await.unwrap();
        assert!(loader.has_selection());

        let outcome = loader
            .apply_sort(SortSpec::descending(SortKind::Title), true)
            .await;
        assert_eq!(outcome, SortOutcome::Resorted { count: 50 });
        let keys = loader.keys();
        assert_eq!(keys.len(), 50);
        assert_eq!(keys[0], "al119");
        assert_eq!(keys[49], "al070");

        // al010 left the visible window; al100 never was in it.
        assert!(!loader.has_selection());

        assert_eq!(loader.load_more().await, LoadOutcome::Loaded { page: 2, count: 50 });
        assert_eq!(loader.keys()[50], "al069");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn user_sort_keeps_selection_of_rows_still_visible() {
        let source = TestSource::new(albums(10));
        let loader = in_memory(&source, 10).build();
        loader.load_more().await;
        loader.toggle_selection("al003");
        loader.ui().flush().await.unwrap();

        loader
            .apply_sort(SortSpec::descending(SortKind::Title), true)
            .await;
        let snapshot = loader.snapshot();
        assert_eq!(snapshot.selected, vec!["al003".to_string()]);
        let row = snapshot.items.iter().find(|row| row.key() == "al003").unwrap();
        assert!(row.selected);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn source_failure_leaves_loader_retryable() {
        let source = TestSource::new(albums(5));
        source.fail.store(true, Ordering::SeqCst);
        let loader = in_memory(&source, 10).build();

        assert!(matches!(loader.load_more().await, LoadOutcome::Failed(_)));
        assert!(!loader.is_loading());
        assert!(!loader.is_initialized());
        assert_eq!(loader.current_page(), 1);

        source.fail.store(false, Ordering::SeqCst);
        assert_eq!(loader.load_more().await, LoadOutcome::Loaded { page: 1, count: 5 });
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn enrichment_failures_skip_only_the_resource() {
        let source = TestSource::new(albums(6));
        let loader = in_memory(&source, 10)
            .enricher(Arc::new(FlakyEnricher) as Arc<dyn Enricher<Album>>)
            .build();

        assert_eq!(loader.load_more().await, LoadOutcome::Loaded { page: 1, count: 6 });
        let snapshot = loader.snapshot();
        let with_cover: Vec<&str> = snapshot
            .items
            .iter()
            .filter(|row| row.cover.is_some())
            .map(|row| row.key())
            .collect();
        assert_eq!(with_cover, vec!["al000", "al002", "al004"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn high_res_upgrade_runs_once_per_row() {
        let catalog =
            Catalog::from_snapshot(PathBuf::from("/music"), LibrarySnapshot::default()).unwrap();
        let source = TestSource::new(albums(5));
        let loader = in_memory(&source, 10)
            .enricher(Arc::new(CoverEnricher::new(catalog.clone())) as Arc<dyn Enricher<Album>>)
            .build();
        loader.load_more().await;
        assert!(loader
            .snapshot()
            .items
            .iter()
            .all(|row| row.cover_tag() == Some(ResourceTag::Low)));

        let keys = vec!["al000".to_string(), "al001".to_string(), "nope".to_string()];
        assert_eq!(loader.load_high_res(&keys).await, 2);
        assert_eq!(loader.load_high_res(&keys).await, 0);
        assert_eq!(catalog.visible_count(), 2);

        let snapshot = loader.snapshot();
        assert_eq!(snapshot.items[0].cover_tag(), Some(ResourceTag::High));
        assert_eq!(snapshot.items[2].cover_tag(), Some(ResourceTag::Low));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn paged_source_reloads_on_user_sort() {
        let source = Arc::new(PagedAlbums {
            items: albums(7),
            requests: Mutex::new(Vec::new()),
        });
        let paging = Paging::Paged(Arc::clone(&source) as Arc<dyn PagedSource<Album>>);
        let loader = LoaderBuilder::new("artists", ui(), paging)
            .options(options(3))
            .build();

        assert_eq!(loader.load_more().await, LoadOutcome::Loaded { page: 1, count: 3 });
        assert_eq!(loader.load_more().await, LoadOutcome::Loaded { page: 2, count: 3 });
        assert_eq!(loader.snapshot().backing_len, None);

        let spec = SortSpec::descending(SortKind::Title);
        assert_eq!(
            loader.apply_sort(spec, true).await,
            SortOutcome::Reloaded(LoadOutcome::Loaded { page: 1, count: 3 })
        );
        assert_eq!(loader.keys(), vec!["al006", "al005", "al004"]);
        let requests = source.requests.lock().clone();
        assert_eq!(requests.last(), Some(&(1, 3, spec)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn selection_follows_row_flags() {
        let source = TestSource::new(albums(5));
        let loader = in_memory(&source, 10).build();
        loader.load_more().await;
        let mut changes = loader.subscribe();

        loader.toggle_selection("al004");
        loader.toggle_selection("al001");
        loader.set_selected("missing", true);
        loader.ui().flush().await.unwrap();
        let picked: Vec<String> = loader.selected_entities().into_iter().map(|a| a.id).collect();
        assert_eq!(picked, vec!["al004", "al001"]);

        loader.toggle_selection("al004");
        loader.ui().flush().await.unwrap();
        assert_eq!(loader.snapshot().selected, vec!["al001".to_string()]);

        loader.clear_selection();
        loader.ui().flush().await.unwrap();
        assert!(!loader.has_selection());
        assert!(loader.snapshot().items.iter().all(|row| !row.selected));

        let changes = drain(&mut changes);
        assert_eq!(
            changes.last(),
            Some(&CollectionChange::Selection {
                has_selection: false,
                count: 0
            })
        );
        assert_eq!(changes.len(), 4);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reset_clears_selection() {
        let source = TestSource::new(albums(5));
        let loader = in_memory(&source, 10).build();
        loader.load_more().await;
        loader.set_selected("al002", true);
        loader.ui().flush().await.unwrap();

        let before = loader.epoch();
        loader.reset().await;
        assert!(!loader.has_selection());
        assert!(loader.epoch() > before);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cancelled_loader_stops_loading() {
        let source = TestSource::new(albums(5));
        let loader = in_memory(&source, 10).build();
        loader.cancel();
        assert_eq!(loader.load_more().await, LoadOutcome::Cancelled);
        assert!(loader.is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }
}
