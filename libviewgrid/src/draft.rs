//! Draft layout state with dirty tracking and debounced, single-flight autosave.
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use viewgrid_types::{ColumnOverrides, StatePut, TableState, ViewState};

/// Debounce delay for autosave (milliseconds).
pub const AUTOSAVE_DEBOUNCE_MS: u64 = 600;

/// The two uncommitted draft structures of a view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftState {
    pub column_overrides: ColumnOverrides,
    pub table_state: TableState,
}

impl DraftState {
    /// Drafts from a persisted state, preferring the source documents.
    #[must_use]
    pub fn from_view_state(state: &ViewState) -> Self {
        Self {
            column_overrides: state.controls_source.clone().unwrap_or_default(),
            table_state: state
                .table_state_source
                .clone()
                .or_else(|| state.table_state_effective.clone())
                .unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn to_put(&self) -> StatePut {
        StatePut {
            controls_source: self.column_overrides.clone(),
            table_state_source: self.table_state.clone(),
        }
    }

    /// Semantically equivalent drafts with no-op entries removed.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            column_overrides: self.column_overrides.normalized(),
            table_state: self.table_state.normalized(),
        }
    }

    /// Deterministic serialization used for dirty detection and query keys.
    pub fn canonical(&self) -> serde_json::Result<String> {
        let normalized = self.normalized();
        canonical_json(&serde_json::json!({
            "controls": serde_json::to_value(&normalized.column_overrides)?,
            "table_state": serde_json::to_value(&normalized.table_state)?,
        }))
    }
}

/// Serializes `value` as JSON with object keys sorted at every level.
pub fn canonical_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    fn sort(value: Value) -> Value {
        match value {
            Value::Object(object) => {
                let mut entries: Vec<(String, Value)> = object.into_iter().collect();
                entries.sort_by(|(a, _), (b, _)| a.cmp(b));
                Value::Object(
                    entries
                        .into_iter()
                        .map(|(key, value)| (key, sort(value)))
                        .collect::<Map<String, Value>>(),
                )
            }
            Value::Array(values) => Value::Array(values.into_iter().map(sort).collect()),
            other => other,
        }
    }
    serde_json::to_string(&sort(serde_json::to_value(value)?))
}

/// Autosave scheduling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutosavePhase {
    Idle,
    /// Debounce timer armed.
    Pending { deadline: Instant },
    /// One save in flight, drafts unchanged since it was sent.
    Saving,
    /// One save in flight and the drafts changed after it was sent. `deadline` is the
    /// re-armed debounce timer, `None` once it expired during the save.
    SavingWithPendingEdit { deadline: Option<Instant> },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Failed(String),
}

/// A save to send to the state service.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub drafts: DraftState,
}

#[derive(Debug)]
pub struct AutosaveController {
    drafts: Option<DraftState>,
    baseline: Option<DraftState>,
    last_saved: Option<String>,
    phase: AutosavePhase,
    status: SaveStatus,
    debounce: Duration,
}

impl Default for AutosaveController {
    fn default() -> Self {
        Self::new(Duration::from_millis(AUTOSAVE_DEBOUNCE_MS))
    }
}

impl AutosaveController {
    #[must_use]
    pub fn new(debounce: Duration) -> Self {
        Self {
            drafts: None,
            baseline: None,
            last_saved: None,
            phase: AutosavePhase::Idle,
            status: SaveStatus::Idle,
            debounce,
        }
    }

    /// Forgets drafts, baseline and any save in flight, keeping the debounce.
    pub fn reset(&mut self) {
        *self = Self::new(self.debounce);
    }

    /// Initializes drafts after load and takes them as the saved baseline.
    pub fn load(&mut self, drafts: DraftState) {
        self.last_saved = match drafts.canonical() {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                warn!("could not serialize loaded drafts: {err}");
                None
            }
        };
        self.baseline = Some(drafts.clone());
        self.drafts = Some(drafts);
        self.phase = AutosavePhase::Idle;
        self.status = SaveStatus::Idle;
    }

    #[must_use]
    pub fn drafts(&self) -> Option<&DraftState> {
        self.drafts.as_ref()
    }

    #[must_use]
    pub fn phase(&self) -> AutosavePhase {
        self.phase
    }

    #[must_use]
    pub fn status(&self) -> &SaveStatus {
        &self.status
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.drafts.is_some()
    }

    /// True iff the canonical drafts differ from the last saved snapshot.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        let Some(drafts) = &self.drafts else {
            return false;
        };
        match drafts.canonical() {
            Ok(snapshot) => self.last_saved.as_deref() != Some(snapshot.as_str()),
            Err(_) => true,
        }
    }

    #[must_use]
    pub fn is_saving(&self) -> bool {
        matches!(
            self.phase,
            AutosavePhase::Saving | AutosavePhase::SavingWithPendingEdit { .. }
        )
    }

    /// Time at which [`Self::poll`] will next produce a save.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.phase {
            AutosavePhase::Pending { deadline } => Some(deadline),
            AutosavePhase::SavingWithPendingEdit { deadline } => deadline,
            AutosavePhase::Idle | AutosavePhase::Saving => None,
        }
    }

    /// Mutates the drafts and reschedules the debounce timer.
    ///
    /// Returns true if the drafts changed semantically. Does nothing before load.
    pub fn edit(&mut self, now: Instant, f: impl FnOnce(&mut DraftState)) -> bool {
        let Some(drafts) = self.drafts.as_mut() else {
            return false;
        };
        let before = drafts.canonical().ok();
        f(drafts);
        let after = drafts.canonical().ok();
        let changed = before.is_none() || after.is_none() || before != after;
        if changed {
            self.reschedule(now);
        }
        changed
    }

    fn reschedule(&mut self, now: Instant) {
        let dirty = self.is_dirty();
        let deadline = now + self.debounce;
        self.phase = match self.phase {
            AutosavePhase::Idle | AutosavePhase::Pending { .. } if dirty => {
                AutosavePhase::Pending { deadline }
            }
            AutosavePhase::Idle | AutosavePhase::Pending { .. } => AutosavePhase::Idle,
            AutosavePhase::Saving | AutosavePhase::SavingWithPendingEdit { .. } => {
                AutosavePhase::SavingWithPendingEdit {
                    deadline: Some(deadline),
                }
            }
        };
        debug!(phase = ?self.phase, dirty, "autosave rescheduled");
    }

    /// Fires the debounce timer if it has expired.
    ///
    /// While a save is in flight an expired timer is dropped, not queued.
    pub fn poll(&mut self, now: Instant) -> Option<SaveRequest> {
        match self.phase {
            AutosavePhase::Pending { deadline } if now >= deadline => self.begin_save(),
            AutosavePhase::SavingWithPendingEdit {
                deadline: Some(deadline),
            } if now >= deadline => {
                debug!("autosave skipped, save already in flight");
                self.phase = AutosavePhase::SavingWithPendingEdit { deadline: None };
                None
            }
            _ => None,
        }
    }

    /// Saves immediately, bypassing the debounce but not the in-flight guard.
    pub fn save_now(&mut self) -> Option<SaveRequest> {
        if self.is_saving() {
            debug!("manual save skipped, save already in flight");
            return None;
        }
        self.begin_save()
    }

    fn begin_save(&mut self) -> Option<SaveRequest> {
        let drafts = self.drafts.as_ref()?;
        if let Err(err) = drafts.canonical() {
            warn!("drafts not serializable, skipping autosave: {err}");
            self.phase = AutosavePhase::Idle;
            return None;
        }
        let request = SaveRequest {
            drafts: drafts.clone(),
        };
        self.phase = AutosavePhase::Saving;
        self.status = SaveStatus::Saving;
        Some(request)
    }

    /// Takes the server's echo as the new baseline.
    ///
    /// Drafts are replaced by the echo unless they were edited while the save was in
    /// flight; in that case the edits are kept and the timer is re-armed.
    pub fn save_succeeded(&mut self, echo: DraftState, now: Instant) {
        let snapshot = match echo.canonical() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!("could not serialize saved state: {err}");
                self.save_failed(err.to_string());
                return;
            }
        };
        self.last_saved = Some(snapshot);
        self.baseline = Some(echo.clone());
        self.status = SaveStatus::Saved;
        match self.phase {
            AutosavePhase::SavingWithPendingEdit { .. } => {
                self.phase = AutosavePhase::Idle;
                self.reschedule(now);
            }
            _ => {
                self.drafts = Some(echo);
                self.phase = AutosavePhase::Idle;
            }
        }
    }

    /// Keeps the drafts and the dirty flag; the next edit or a manual save retries.
    pub fn save_failed(&mut self, error: String) {
        warn!("saving view state failed: {error}");
        self.status = SaveStatus::Failed(error);
        self.phase = AutosavePhase::Idle;
    }

    /// Restores the drafts to the last saved state and drops a pending timer.
    ///
    /// Returns false while a save is in flight.
    pub fn revert(&mut self) -> bool {
        if self.is_saving() {
            return false;
        }
        let Some(baseline) = self.baseline.clone() else {
            return false;
        };
        let status = self.status.clone();
        self.load(baseline);
        self.status = status;
        true
    }

    /// Drops any pending timer, e.g. when the view is left.
    pub fn cancel(&mut self) {
        self.phase = match self.phase {
            AutosavePhase::Saving | AutosavePhase::SavingWithPendingEdit { .. } => {
                AutosavePhase::Saving
            }
            AutosavePhase::Idle | AutosavePhase::Pending { .. } => AutosavePhase::Idle,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewgrid_types::{SortDirection, SortSpec};

    const DEBOUNCE: Duration = Duration::from_millis(AUTOSAVE_DEBOUNCE_MS);

    fn loaded() -> (AutosaveController, Instant) {
        let mut controller = AutosaveController::default();
        controller.load(DraftState::default());
        (controller, Instant::now())
    }

    fn hide(guid: &'static str) -> impl FnOnce(&mut DraftState) {
        move |drafts: &mut DraftState| {
            drafts.column_overrides.entry_mut(&guid.into()).show = Some(false);
        }
    }

    #[test]
    fn clean_after_load() {
        let (controller, _) = loaded();
        assert!(!controller.is_dirty());
        assert_eq!(controller.phase(), AutosavePhase::Idle);
    }

    #[test]
    fn canonical_form_ignores_insertion_order_and_noop_entries() {
        let mut a = DraftState::default();
        a.table_state.filters.insert("x".into(), "1".to_string());
        a.table_state.filters.insert("y".into(), "2".to_string());
        let mut b = DraftState::default();
        b.table_state.filters.insert("y".into(), "2".to_string());
        b.table_state.filters.insert("x".into(), "1".to_string());
        b.table_state.filters.insert("z".into(), String::new());
        b.column_overrides.entry_mut(&"c".into());
        assert_eq!(a.canonical().unwrap(), b.canonical().unwrap());
    }

    #[test]
    fn canonical_json_sorts_nested_keys() {
        let value = serde_json::json!({"b": {"z": 1, "a": 2}, "a": [{"y": 1, "x": 2}]});
        assert_eq!(
            canonical_json(&value).unwrap(),
            r#"{"a":[{"x":2,"y":1}],"b":{"a":2,"z":1}}"#
        );
    }

    #[test]
    fn dirty_follows_semantics_not_identity() {
        let (mut controller, now) = loaded();
        assert!(controller.edit(now, hide("a")));
        assert!(controller.is_dirty());

        assert!(controller.edit(now, |drafts| {
            drafts.column_overrides.remove(&"a".into());
        }));
        assert!(!controller.is_dirty());
        assert_eq!(controller.phase(), AutosavePhase::Idle);

        // same content, new objects
        assert!(!controller.edit(now, |drafts| *drafts = DraftState::default()));
    }

    #[test]
    fn edits_within_window_coalesce_into_one_save() {
        let (mut controller, t0) = loaded();
        let mut saves = 0;
        for step in 0..5u64 {
            let now = t0 + Duration::from_millis(step * 100);
            controller.edit(now, move |drafts| {
                drafts.column_overrides.entry_mut(&"a".into()).width = Some(100.0 + step as f32);
            });
            saves += usize::from(controller.poll(now).is_some());
        }
        let last_edit = t0 + Duration::from_millis(400);
        assert_eq!(controller.next_deadline(), Some(last_edit + DEBOUNCE));
        assert!(controller.poll(last_edit + DEBOUNCE - Duration::from_millis(1)).is_none());
        saves += usize::from(controller.poll(last_edit + DEBOUNCE).is_some());
        saves += usize::from(controller.poll(last_edit + DEBOUNCE * 3).is_some());
        assert_eq!(saves, 1);
        assert!(controller.is_saving());
    }

    #[test]
    fn timer_expiring_during_save_is_skipped() {
        let (mut controller, t0) = loaded();
        controller.edit(t0, hide("a"));
        let request = controller.poll(t0 + DEBOUNCE).expect("save");

        let t1 = t0 + DEBOUNCE + Duration::from_millis(10);
        controller.edit(t1, hide("b"));
        assert!(controller.poll(t1 + DEBOUNCE).is_none());
        assert_eq!(
            controller.phase(),
            AutosavePhase::SavingWithPendingEdit { deadline: None }
        );
        assert!(controller.save_now().is_none());

        // the in-flight save completes; the later edit is kept and rescheduled
        let t2 = t1 + DEBOUNCE * 2;
        controller.save_succeeded(request.drafts, t2);
        assert!(controller.is_dirty());
        assert!(
            controller
                .drafts()
                .unwrap()
                .column_overrides
                .get(&"b".into())
                .is_some()
        );
        let retry = controller.poll(t2 + DEBOUNCE).expect("eventual save");
        controller.save_succeeded(retry.drafts, t2 + DEBOUNCE);
        assert!(!controller.is_dirty());
    }

    #[test]
    fn success_adopts_server_echo() {
        let (mut controller, t0) = loaded();
        controller.edit(t0, |drafts| {
            drafts.table_state.sort = SortSpec::by("a", SortDirection::Asc);
        });
        let request = controller.save_now().expect("save");
        let mut echo = request.drafts.clone();
        echo.table_state.filters.insert("server".into(), "normalized".to_string());

        controller.save_succeeded(echo.clone(), t0);
        assert_eq!(controller.drafts(), Some(&echo));
        assert!(!controller.is_dirty());
        assert_eq!(controller.status(), &SaveStatus::Saved);
    }

    #[test]
    fn failure_keeps_drafts_dirty() {
        let (mut controller, t0) = loaded();
        controller.edit(t0, hide("a"));
        let request = controller.save_now().expect("save");
        controller.save_failed("503".to_string());

        assert!(controller.is_dirty());
        assert_eq!(controller.drafts(), Some(&request.drafts));
        assert_eq!(controller.status(), &SaveStatus::Failed("503".to_string()));
        assert!(controller.save_now().is_some());
    }

    #[test]
    fn nothing_happens_before_load() {
        let mut controller = AutosaveController::default();
        let now = Instant::now();
        assert!(!controller.edit(now, hide("a")));
        assert!(!controller.is_dirty());
        assert!(controller.save_now().is_none());
    }

    #[test]
    fn revert_restores_last_saved_state() {
        let (mut controller, t0) = loaded();
        controller.edit(t0, hide("a"));
        let request = controller.save_now().expect("save");
        controller.save_succeeded(request.drafts, t0);
        controller.edit(t0, hide("b"));
        assert!(controller.is_dirty());

        assert!(controller.revert());
        assert!(!controller.is_dirty());
        assert_eq!(controller.next_deadline(), None);
        let drafts = controller.drafts().unwrap();
        assert!(drafts.column_overrides.get(&"a".into()).is_some());
        assert!(drafts.column_overrides.get(&"b".into()).is_none());
    }

    #[test]
    fn reset_forgets_save_in_flight() {
        let (mut controller, t0) = loaded();
        controller.edit(t0, hide("a"));
        assert!(controller.save_now().is_some());
        controller.reset();

        assert!(!controller.is_loaded());
        assert!(!controller.is_saving());
        assert_eq!(controller.phase(), AutosavePhase::Idle);
        assert_eq!(controller.status(), &SaveStatus::Idle);
    }

    #[test]
    fn cancel_drops_pending_timer() {
        let (mut controller, t0) = loaded();
        controller.edit(t0, hide("a"));
        controller.cancel();
        assert!(controller.poll(t0 + DEBOUNCE).is_none());
        assert_eq!(controller.next_deadline(), None);
    }
}
