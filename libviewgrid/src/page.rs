//! Controller of one mounted view.
//!
//! The page owns the drafts, pager, matrix cache, selection and collapse state of exactly
//! one view. Backend requests run as spawned tasks and come back as [`ViewMessage`]
//! completions through an internal channel; [`ViewPage::handle_async_messages`] feeds them
//! into the same update path as [`ViewPage::update`] on the owner's side, so all state changes happen in one place.
//! Completions are tagged with the mount they were requested in and dropped after a
//! remount.
use serde_json::json;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use viewgrid_types::{
    ColumnOverrides, Control, ControlGuid, DropdownMaps, MatrixMeta, MatrixRequest,
    MatrixResponse, MatrixTotals, Row, RowUid, SortDirection, SortSpec, TableState, ViewDefinition,
    ViewId, ViewState,
};

use crate::backend::{BackendError, ViewBackend};
use crate::cache::{MatrixCache, MatrixCacheKey};
use crate::config::GridConfig;
use crate::draft::{AutosaveController, DraftState, SaveRequest, SaveStatus};
use crate::format::ValueFormatter;
use crate::message::ViewMessage;
use crate::projector::{self, CollapseState, RenderRow};
use crate::query_key::{Pager, build_key};
use crate::schema::{self, base_schema, resolve_all, resolve_visible};
use crate::selection::{Selection, selection_on_click};
use crate::signals::{AsOfDateChanged, RowAction, SignalHub, ViewEvent};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewStatus {
    #[default]
    Unmounted,
    Loading,
    Ready,
    /// Definition, state or matrix could not be loaded. The grid keeps showing what it has.
    LoadFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCell {
    pub text: String,
    /// "as of" annotation of historicized values.
    pub tooltip: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridRow {
    Group {
        key: String,
        label: String,
        count: u64,
        sum: Option<String>,
        collapsed: bool,
    },
    Data {
        base_index: usize,
        uid: RowUid,
        selected: bool,
        cells: Vec<GridCell>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridTotals {
    pub count: Option<u64>,
    pub sum: Option<String>,
}

/// Display-ready snapshot of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct GridView {
    /// Visible columns in display order. Never empty.
    pub columns: Vec<Control>,
    pub rows: Vec<GridRow>,
    pub totals: Option<GridTotals>,
    pub meta: Option<MatrixMeta>,
    pub status: ViewStatus,
    pub save_status: SaveStatus,
    pub dirty: bool,
    pub offset: u32,
    pub selected: usize,
}

pub struct ViewPage<B: ViewBackend> {
    view_id: ViewId,
    backend: Arc<B>,
    hub: SignalHub,
    formatter: ValueFormatter,

    sender: mpsc::UnboundedSender<(u64, ViewMessage)>,
    receiver: mpsc::UnboundedReceiver<(u64, ViewMessage)>,
    as_of_date: Option<broadcast::Receiver<AsOfDateChanged>>,
    /// Spawned requests whose completion has not been handled yet.
    outstanding: usize,

    mounted: bool,
    /// Bumped on every mount.
    mount_epoch: u64,
    status: ViewStatus,
    definition: Option<ViewDefinition>,
    state: Option<ViewState>,
    autosave: AutosaveController,
    /// The saved state could not be loaded; edits stay local and are never saved.
    state_unavailable: bool,

    pager: Pager,
    cache: MatrixCache,
    inflight: HashSet<MatrixCacheKey>,
    wanted: Option<MatrixCacheKey>,
    shown: Option<MatrixCacheKey>,
    matrix: Option<Arc<MatrixResponse>>,
    matrix_failed: bool,

    selection: Selection,
    collapse: CollapseState,
    expert: bool,
    include_historical: bool,
}

impl<B: ViewBackend> std::fmt::Debug for ViewPage<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewPage")
            .field("view_id", &self.view_id)
            .field("mounted", &self.mounted)
            .field("mount_epoch", &self.mount_epoch)
            .field("status", &self.status)
            .field("outstanding", &self.outstanding)
            .field("autosave", &self.autosave.phase())
            .field("shown", &self.shown)
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

impl<B: ViewBackend> ViewPage<B> {
    #[must_use]
    pub fn new(view_id: ViewId, backend: Arc<B>, hub: SignalHub, config: &GridConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            view_id,
            backend,
            hub,
            formatter: ValueFormatter::new(&config.format),
            sender,
            receiver,
            as_of_date: None,
            outstanding: 0,
            mounted: false,
            mount_epoch: 0,
            status: ViewStatus::Unmounted,
            definition: None,
            state: None,
            autosave: AutosaveController::new(config.debounce()),
            state_unavailable: false,
            pager: Pager::new(config.pager.page_size),
            cache: MatrixCache::new(config.matrix.cache_pages),
            inflight: HashSet::new(),
            wanted: None,
            shown: None,
            matrix: None,
            matrix_failed: false,
            selection: Selection::new(),
            collapse: CollapseState::default(),
            expert: config.format.expert_mode,
            include_historical: config.matrix.include_historical,
        }
    }

    /// Replaces the formatter, e.g. to inject another date decoder.
    #[must_use]
    pub fn with_formatter(mut self, formatter: ValueFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    // ========================
    // Lifecycle
    // ========================

    /// Subscribes to the as-of date signal and starts loading definition and state.
    /// Everything loaded by an earlier mount is dropped.
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        info!("mounting view {}", self.view_id);
        self.mounted = true;
        self.mount_epoch += 1;
        self.status = ViewStatus::Loading;
        self.definition = None;
        self.state = None;
        self.autosave.reset();
        self.state_unavailable = false;
        self.matrix = None;
        self.matrix_failed = false;
        self.selection = Selection::new();
        self.collapse = CollapseState::default();
        self.as_of_date = Some(self.hub.subscribe_as_of_date());

        let backend = Arc::clone(&self.backend);
        let view = self.view_id.clone();
        self.spawn_request(async move {
            ViewMessage::DefinitionLoaded(backend.get_definition(&view).await)
        });

        let backend = Arc::clone(&self.backend);
        let view = self.view_id.clone();
        self.spawn_request(async move { ViewMessage::StateLoaded(backend.get_state(&view).await) });
    }

    /// Stops the debounce timer and drops the signal subscription. Completions of
    /// requests still in flight are ignored.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        info!("unmounting view {}", self.view_id);
        self.mounted = false;
        self.autosave.cancel();
        self.as_of_date = None;
        self.status = ViewStatus::Unmounted;
        // Requests of this mount never complete from the page's point of view
        self.inflight.clear();
        self.wanted = None;
        self.shown = None;
        self.cache.invalidate();
    }

    fn spawn_request<F>(&mut self, request: F)
    where
        F: Future<Output = ViewMessage> + Send + 'static,
    {
        self.outstanding += 1;
        let sender = self.sender.clone();
        let epoch = self.mount_epoch;
        tokio::spawn(async move {
            let message = request.await;
            // The page may be gone already
            let _ = sender.send((epoch, message));
        });
    }

    /// Handles completed requests and as-of date changes without waiting.
    pub fn handle_async_messages(&mut self) {
        self.drain_as_of_date();
        while let Ok((epoch, message)) = self.receiver.try_recv() {
            self.handle_completion(epoch, message, Instant::now());
        }
    }

    /// Waits until every spawned request has completed and been handled.
    pub async fn settle(&mut self) {
        self.handle_async_messages();
        while self.outstanding > 0 {
            let Some((epoch, message)) = self.receiver.recv().await else {
                break;
            };
            self.handle_completion(epoch, message, Instant::now());
            self.drain_as_of_date();
        }
    }

    fn handle_completion(&mut self, epoch: u64, message: ViewMessage, now: Instant) {
        self.outstanding = self.outstanding.saturating_sub(1);
        if epoch != self.mount_epoch {
            debug!(epoch, ?message, "ignoring completion of an earlier mount");
            return;
        }
        self.update_at(message, now);
    }

    /// Fires the autosave debounce timer if it expired.
    pub fn tick(&mut self, now: Instant) {
        if !self.mounted {
            return;
        }
        if let Some(request) = self.autosave.poll(now) {
            self.spawn_save(request);
        }
    }

    pub fn update(&mut self, message: ViewMessage) {
        self.update_at(message, Instant::now());
    }

    pub fn update_at(&mut self, message: ViewMessage, now: Instant) {
        if !self.mounted {
            debug!(?message, "ignoring message for unmounted view");
            return;
        }
        self.handle_message(message, now);
    }

    fn handle_message(&mut self, message: ViewMessage, now: Instant) -> Option<()> {
        match message {
            ViewMessage::SetColumnVisible { guid, show } => {
                self.edit_drafts(now, |drafts| {
                    schema::set_visible(&mut drafts.column_overrides, &guid, show);
                });
            }
            ViewMessage::SetColumnWidth { guid, width } => {
                self.edit_drafts(now, |drafts| {
                    schema::set_width(&mut drafts.column_overrides, &guid, width);
                });
            }
            ViewMessage::MoveColumn { guid, position } => {
                let base = self.base_columns();
                self.edit_drafts(now, |drafts| {
                    if !schema::move_column(&base, &mut drafts.column_overrides, &guid, position) {
                        debug!("cannot move unknown column {guid}");
                    }
                });
            }
            ViewMessage::ResetColumn { guid } => {
                self.edit_drafts(now, |drafts| {
                    schema::reset_column(&mut drafts.column_overrides, &guid);
                });
            }
            ViewMessage::ToggleSort { guid } => self.toggle_sort(guid, now)?,
            ViewMessage::SetFilter { guid, text } => self.set_filter(guid, text, now)?,
            ViewMessage::SetGroupingEnabled(enabled) => {
                self.edit_drafts(now, |drafts| drafts.table_state.group.enabled = enabled);
            }
            ViewMessage::SetGroupBy(by) => {
                self.edit_drafts(now, |drafts| drafts.table_state.group.by = by);
            }
            ViewMessage::SetSumColumn(sum) => {
                self.edit_drafts(now, |drafts| {
                    drafts.table_state.group.sum_control_guid = sum;
                });
            }
            ViewMessage::ToggleGroupCollapsed { key } => {
                self.collapse.toggle(&key);
            }
            ViewMessage::CollapseAllGroups => {
                let matrix = self.matrix.clone()?;
                self.collapse.collapse_all(projector::group_keys(&matrix.rows));
            }
            ViewMessage::ExpandAllGroups => self.collapse.expand_all(),
            ViewMessage::NextPage => {
                let has_more = self.matrix.as_ref()?.meta.has_more;
                if self.pager.next_page(has_more) {
                    self.refresh_matrix();
                }
            }
            ViewMessage::PrevPage => {
                if self.pager.prev_page() {
                    self.refresh_matrix();
                }
            }
            ViewMessage::SetPageOffset(offset) => {
                if self.pager.set_offset(offset) {
                    self.refresh_matrix();
                }
            }
            ViewMessage::RowClicked { index, modifiers } => {
                let page = self.page_uids();
                let update = selection_on_click(&self.selection, &page, index, modifiers);
                if update.changed {
                    self.selection = update.selection;
                    self.publish_selection(&page);
                }
            }
            ViewMessage::RowDoubleClicked { index } => {
                let uid = self.page_uids().get(index)?.clone();
                self.hub.publish(ViewEvent::RowActivated {
                    view_id: self.view_id.clone(),
                    uid,
                    action: RowAction::DoubleClick,
                });
            }
            ViewMessage::SelectAll => {
                let page = self.page_uids();
                let all = Selection::all(&page);
                let changed = all.rows != self.selection.rows;
                self.selection = all;
                if changed {
                    self.publish_selection(&page);
                }
            }
            ViewMessage::ClearSelection => {
                if !self.selection.is_empty() {
                    self.selection.clear();
                    self.publish_selection(&[]);
                }
            }
            ViewMessage::SetExpertMode(expert) => self.expert = expert,
            ViewMessage::SetIncludeHistorical(include) => {
                if self.include_historical != include {
                    self.include_historical = include;
                    self.refresh_matrix();
                }
            }
            ViewMessage::SaveNow => {
                let request = self.autosave.save_now()?;
                self.spawn_save(request);
            }
            ViewMessage::RevertDraft => {
                if self.autosave.revert() {
                    self.after_draft_change();
                }
            }
            ViewMessage::DefinitionLoaded(result) => match result {
                Ok(definition) => {
                    self.definition = Some(definition);
                    self.loaded();
                }
                Err(err) => self.load_failed("definition", &err),
            },
            ViewMessage::StateLoaded(result) => match result {
                Ok(state) => {
                    self.autosave.load(DraftState::from_view_state(&state));
                    self.state = Some(state);
                    self.loaded();
                }
                Err(err) => {
                    self.load_failed("state", &err);
                    // Show the unsaved default layout read-only
                    self.state_unavailable = true;
                    self.autosave.load(DraftState::default());
                    self.loaded();
                }
            },
            ViewMessage::MatrixLoaded { key, result } => self.handle_matrix_loaded(key, result)?,
            ViewMessage::StateSaved(result) => match result {
                Ok(state) => {
                    info!("saved state of view {}", self.view_id);
                    self.autosave
                        .save_succeeded(DraftState::from_view_state(&state), now);
                    self.state = Some(state);
                    self.after_draft_change();
                }
                Err(err) => self.autosave.save_failed(err.to_string()),
            },
            ViewMessage::Batch(messages) => {
                for message in messages {
                    self.update_at(message, now);
                }
            }
        }
        Some(())
    }

    fn load_failed(&mut self, what: &str, err: &BackendError) {
        warn!("failed to load {what} of view {}: {err}", self.view_id);
        self.status = ViewStatus::LoadFailed(format!("failed to load {what}: {err}"));
    }

    /// Becomes ready once both definition and drafts are there.
    fn loaded(&mut self) {
        if self.definition.is_none() || !self.autosave.is_loaded() {
            return;
        }
        if matches!(self.status, ViewStatus::Loading) {
            self.status = ViewStatus::Ready;
        }
        self.after_draft_change();
    }

    // ========================
    // Drafts
    // ========================

    fn edit_drafts(&mut self, now: Instant, f: impl FnOnce(&mut DraftState)) {
        if self.autosave.edit(now, f) {
            self.after_draft_change();
        }
    }

    fn after_draft_change(&mut self) {
        if let Some(drafts) = self.autosave.drafts() {
            let group = drafts.table_state.group.clone();
            self.collapse.sync(&group);
        }
        self.refresh_matrix();
    }

    fn toggle_sort(&mut self, guid: ControlGuid, now: Instant) -> Option<()> {
        let column = self.find_column(&guid)?;
        if !column.sortable {
            debug!("column {guid} is not sortable");
            return None;
        }
        self.edit_drafts(now, |drafts| {
            let sort = &mut drafts.table_state.sort;
            *sort = match sort.direction_for(&guid) {
                None => SortSpec::by(guid, SortDirection::Asc),
                Some(SortDirection::Asc) => SortSpec::by(guid, SortDirection::Desc),
                Some(SortDirection::Desc) => SortSpec::default(),
            };
        });
        Some(())
    }

    fn set_filter(&mut self, guid: ControlGuid, text: String, now: Instant) -> Option<()> {
        let column = self.find_column(&guid)?;
        if !column.searchable {
            debug!("column {guid} is not searchable");
            return None;
        }
        self.edit_drafts(now, |drafts| {
            if text.trim().is_empty() {
                drafts.table_state.filters.remove(&guid);
            } else {
                drafts.table_state.filters.insert(guid, text);
            }
        });
        Some(())
    }

    fn spawn_save(&mut self, request: SaveRequest) {
        if self.state_unavailable {
            self.autosave
                .save_failed("saved state could not be loaded".to_string());
            return;
        }
        debug!("saving state of view {}", self.view_id);
        let backend = Arc::clone(&self.backend);
        let view = self.view_id.clone();
        let put = request.drafts.to_put();
        self.spawn_request(async move {
            ViewMessage::StateSaved(backend.put_state(&view, put).await)
        });
    }

    // ========================
    // Matrix
    // ========================

    /// Fetches the page the current drafts ask for, unless it is shown, cached or
    /// already requested.
    fn refresh_matrix(&mut self) -> Option<()> {
        if !self.mounted || self.definition.is_none() {
            return None;
        }
        let drafts = self.autosave.drafts()?;
        let query = build_key(Some(&drafts.column_overrides), Some(&drafts.table_state))?;
        let controls = drafts.column_overrides.normalized();
        let table_state = drafts.table_state.normalized();

        if self.pager.observe(Some(query.clone())) {
            debug!("matrix query of view {} changed", self.view_id);
        }
        let key = self.cache.key_for(
            query,
            self.pager.offset(),
            self.pager.limit(),
            self.include_historical,
        );
        self.wanted = Some(key.clone());
        if self.shown.as_ref() == Some(&key) {
            return Some(());
        }
        if let Some(response) = self.cache.get(&key) {
            debug!("matrix page served from cache");
            self.apply_matrix(key, response);
            return Some(());
        }
        if !self.inflight.insert(key.clone()) {
            return Some(());
        }

        let request = MatrixRequest {
            controls_source: Some(controls),
            table_state_source: Some(table_state),
            include_historical: key.include_historical,
            limit: key.limit,
            offset: key.offset,
        };
        let backend = Arc::clone(&self.backend);
        let view = self.view_id.clone();
        self.spawn_request(async move {
            let result = backend.post_matrix(&view, request).await.map(Arc::new);
            ViewMessage::MatrixLoaded { key, result }
        });
        Some(())
    }

    fn handle_matrix_loaded(
        &mut self,
        key: MatrixCacheKey,
        result: Result<Arc<MatrixResponse>, BackendError>,
    ) -> Option<()> {
        self.inflight.remove(&key);
        match result {
            Ok(response) => {
                let cached = self.cache.insert(key.clone(), Arc::clone(&response));
                // Discard results that are no longer wanted
                if !cached || self.wanted.as_ref() != Some(&key) {
                    debug!("discarding stale matrix page of view {}", self.view_id);
                    return None;
                }
                self.apply_matrix(key, response);
            }
            Err(err) => {
                if self.wanted.as_ref() == Some(&key) {
                    self.load_failed("matrix", &err);
                    self.matrix_failed = true;
                }
            }
        }
        Some(())
    }

    fn apply_matrix(&mut self, key: MatrixCacheKey, response: Arc<MatrixResponse>) {
        let page = response.page_uids();
        if response.meta.table_truncated {
            warn!("matrix of view {} was truncated by the server", self.view_id);
        }
        self.matrix = Some(response);
        self.shown = Some(key);
        if self.matrix_failed {
            self.matrix_failed = false;
            self.status = ViewStatus::Ready;
        }
        if let Some(pruned) = self.selection.pruned(&page) {
            let changed = pruned.rows != self.selection.rows;
            self.selection = pruned;
            if changed {
                self.publish_selection(&page);
            }
        }
    }

    fn drain_as_of_date(&mut self) {
        let Some(receiver) = self.as_of_date.as_mut() else {
            return;
        };
        let mut changed = false;
        loop {
            match receiver.try_recv() {
                Ok(AsOfDateChanged { as_of }) => {
                    info!(?as_of, "as-of date changed");
                    changed = true;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "missed as-of date changes");
                    changed = true;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        if changed {
            self.cache.invalidate();
            self.shown = None;
            self.refresh_matrix();
        }
    }

    // ========================
    // Selection
    // ========================

    fn page_uids(&self) -> Vec<RowUid> {
        self.matrix
            .as_ref()
            .map(|matrix| matrix.page_uids())
            .unwrap_or_default()
    }

    fn publish_selection(&self, page: &[RowUid]) {
        self.hub.publish(ViewEvent::SelectionChanged {
            view_id: self.view_id.clone(),
            selected_uids: self.selection.ordered_uids(page),
        });
    }

    // ========================
    // Accessors
    // ========================

    #[must_use]
    pub fn view_id(&self) -> &ViewId {
        &self.view_id
    }

    #[must_use]
    pub fn status(&self) -> &ViewStatus {
        &self.status
    }

    #[must_use]
    pub fn save_status(&self) -> &SaveStatus {
        self.autosave.status()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.autosave.is_dirty()
    }

    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.autosave.is_saving()
    }

    /// When [`Self::tick`] should be called next.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.autosave.next_deadline()
    }

    #[must_use]
    pub fn drafts(&self) -> Option<&DraftState> {
        self.autosave.drafts()
    }

    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    #[must_use]
    pub fn collapse_state(&self) -> &CollapseState {
        &self.collapse
    }

    #[must_use]
    pub fn matrix(&self) -> Option<&MatrixResponse> {
        self.matrix.as_deref()
    }

    #[must_use]
    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    #[must_use]
    pub fn expert_mode(&self) -> bool {
        self.expert
    }

    #[must_use]
    pub fn include_historical(&self) -> bool {
        self.include_historical
    }

    #[must_use]
    pub fn formatter(&self) -> &ValueFormatter {
        &self.formatter
    }

    fn base_columns(&self) -> Vec<Control> {
        self.definition
            .as_ref()
            .map(|definition| base_schema(definition, self.state.as_ref()))
            .unwrap_or_default()
    }

    fn find_column(&self, guid: &ControlGuid) -> Option<Control> {
        let column = self
            .all_columns()
            .into_iter()
            .find(|column| &column.control_guid == guid);
        if column.is_none() {
            debug!("unknown column {guid}");
        }
        column
    }

    /// All columns including hidden ones, for the column picker.
    #[must_use]
    pub fn all_columns(&self) -> Vec<Control> {
        let empty = ColumnOverrides::default();
        let overrides = self
            .autosave
            .drafts()
            .map_or(&empty, |drafts| &drafts.column_overrides);
        resolve_all(&self.base_columns(), overrides)
    }

    #[must_use]
    pub fn visible_columns(&self) -> Vec<Control> {
        let empty = ColumnOverrides::default();
        let overrides = self
            .autosave
            .drafts()
            .map_or(&empty, |drafts| &drafts.column_overrides);
        resolve_visible(&self.base_columns(), overrides)
    }

    // ========================
    // Rendering
    // ========================

    fn format_sum(&self, sum: Option<f64>) -> Option<String> {
        sum.map(|sum| self.formatter.format_number(&json!(sum)))
    }

    fn grid_cells(&self, columns: &[Control], row: &Row, dropdowns: &DropdownMaps) -> Vec<GridCell> {
        columns
            .iter()
            .map(|column| GridCell {
                text: self
                    .formatter
                    .format_cell(column, row, dropdowns, self.expert),
                tooltip: self.formatter.historical_tooltip(row, column),
            })
            .collect()
    }

    fn grid_totals(&self, totals: &MatrixTotals) -> GridTotals {
        GridTotals {
            count: totals.count,
            sum: self.format_sum(totals.sum),
        }
    }

    /// Display-ready snapshot: visible columns, projected rows and totals.
    #[must_use]
    pub fn grid(&self) -> GridView {
        let columns = self.visible_columns();
        let table_state = self
            .autosave
            .drafts()
            .map(|drafts| drafts.table_state.clone())
            .unwrap_or_else(TableState::default);

        let (rows, totals, meta) = match &self.matrix {
            Some(matrix) => {
                let all_columns = self.all_columns();
                let rows = projector::project(
                    &matrix.rows,
                    &table_state,
                    &all_columns,
                    &self.collapse,
                    &matrix.dropdowns,
                    &self.formatter,
                )
                .into_iter()
                .map(|row| match row {
                    RenderRow::Group(group) => GridRow::Group {
                        sum: self.format_sum(group.sum),
                        key: group.key,
                        label: group.label,
                        count: group.count,
                        collapsed: group.collapsed,
                    },
                    RenderRow::Data(data) => GridRow::Data {
                        cells: self.grid_cells(&columns, &data.row, &matrix.dropdowns),
                        selected: self.selection.contains(&data.uid),
                        base_index: data.base_index,
                        uid: data.uid,
                    },
                })
                .collect();
                let totals = self.grid_totals(&projector::totals(matrix));
                (rows, Some(totals), Some(matrix.meta.clone()))
            }
            None => (Vec::new(), None, None),
        };

        GridView {
            columns,
            rows,
            totals,
            meta,
            status: self.status.clone(),
            save_status: self.autosave.status().clone(),
            dirty: self.autosave.is_dirty(),
            offset: self.pager.offset(),
            selected: self.selection.len(),
        }
    }
}
