//! Shared helpers for view page integration tests.
#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Semaphore;

use libviewgrid::{BackendError, ViewBackend};
use viewgrid_types::{
    MatrixRequest, MatrixResponse, StatePut, TableState, ViewDefinition, ViewId, ViewState,
};

/// Three columns: A (string), B (number), C (dropdown).
pub const DEFINITION: &str = r#"{
    "name": "Orders",
    "root": {"table": "orders"},
    "daten": {
        "ROOT": [{"control_guid": "root", "field": "id"}],
        "head": [
            {"control_guid": "A", "field": "a", "label": "A", "type": "string"},
            {"control_guid": "B", "field": "b", "label": "B", "type": "number"},
            {"control_guid": "C", "field": "c", "label": "C", "type": "dropdown", "sortable": false}
        ]
    }
}"#;

/// Two rows grouped by A with the sum of B.
pub const MATRIX: &str = r#"{
    "rows": [
        {"type": "group", "key": "x", "raw": "x", "count": 2, "sum": 30},
        {"type": "data", "group_key": "x",
         "row": {"uid": "r1", "daten": {"head": {"a": "x", "b": 10, "c": "1"}}}},
        {"type": "data", "group_key": "x",
         "row": {"uid": "r2", "daten": {"head": {"a": "x", "b": 20, "c": "2"}}}}
    ],
    "dropdowns": {"C": {"1": "Yes", "2": "No"}},
    "totals": {"count": 2, "sum": 30},
    "meta": {"total_after_filter": 2, "has_more": false, "table_truncated": false, "base_loaded": 2},
    "table": "orders"
}"#;

pub struct FakeBackend {
    pub definition: Option<ViewDefinition>,
    pub state: Mutex<ViewState>,
    pub matrix: Mutex<MatrixResponse>,
    pub matrix_requests: Mutex<Vec<MatrixRequest>>,
    pub put_calls: AtomicUsize,
    pub fail_saves: AtomicBool,
    pub fail_state_loads: AtomicBool,
    /// Each save consumes one permit before it completes.
    pub save_gate: Semaphore,
    /// Each matrix page consumes one permit before it is returned.
    pub matrix_gate: Semaphore,
}

impl FakeBackend {
    pub fn orders() -> Self {
        Self {
            definition: Some(serde_json::from_str(DEFINITION).unwrap()),
            state: Mutex::new(ViewState::default()),
            matrix: Mutex::new(serde_json::from_str(MATRIX).unwrap()),
            matrix_requests: Mutex::new(Vec::new()),
            put_calls: AtomicUsize::new(0),
            fail_saves: AtomicBool::new(false),
            fail_state_loads: AtomicBool::new(false),
            save_gate: Semaphore::new(Semaphore::MAX_PERMITS),
            matrix_gate: Semaphore::new(Semaphore::MAX_PERMITS),
        }
    }

    /// Saved state with the given table state as source.
    pub fn with_table_state(self, table_state: TableState) -> Self {
        *self.state.lock().unwrap() = ViewState {
            table_state_source: Some(table_state),
            ..ViewState::default()
        };
        self
    }

    /// Loading the saved state fails.
    pub fn without_state(self) -> Self {
        self.fail_state_loads.store(true, Ordering::SeqCst);
        self
    }

    /// Matrix pages block until [`Self::release_matrix`] is called.
    pub fn with_held_matrix(mut self) -> Self {
        self.matrix_gate = Semaphore::new(0);
        self
    }

    pub fn release_matrix(&self, count: usize) {
        self.matrix_gate.add_permits(count);
    }

    /// Saves block until [`Self::release_saves`] is called.
    pub fn with_held_saves(mut self) -> Self {
        self.save_gate = Semaphore::new(0);
        self
    }

    pub fn without_definition(mut self) -> Self {
        self.definition = None;
        self
    }

    pub fn release_saves(&self, count: usize) {
        self.save_gate.add_permits(count);
    }

    pub fn puts(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn matrix_request_count(&self) -> usize {
        self.matrix_requests.lock().unwrap().len()
    }

    pub fn last_matrix_request(&self) -> Option<MatrixRequest> {
        self.matrix_requests.lock().unwrap().last().cloned()
    }
}

impl ViewBackend for FakeBackend {
    async fn get_definition(&self, view: &ViewId) -> Result<ViewDefinition, BackendError> {
        self.definition
            .clone()
            .ok_or_else(|| BackendError::NotFound(view.clone()))
    }

    async fn get_state(&self, _view: &ViewId) -> Result<ViewState, BackendError> {
        if self.fail_state_loads.load(Ordering::SeqCst) {
            return Err(BackendError::Rejected("state service unavailable".to_string()));
        }
        Ok(self.state.lock().unwrap().clone())
    }

    async fn put_state(&self, _view: &ViewId, state: StatePut) -> Result<ViewState, BackendError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(permit) = self.save_gate.acquire().await {
            permit.forget();
        }
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(BackendError::Rejected("storage unavailable".to_string()));
        }
        let stored = ViewState {
            controls_source: Some(state.controls_source),
            controls_effective: None,
            table_state_source: Some(state.table_state_source.clone()),
            table_state_effective: Some(state.table_state_source),
        };
        *self.state.lock().unwrap() = stored.clone();
        Ok(stored)
    }

    async fn post_matrix(
        &self,
        _view: &ViewId,
        request: MatrixRequest,
    ) -> Result<MatrixResponse, BackendError> {
        self.matrix_requests.lock().unwrap().push(request);
        if let Ok(permit) = self.matrix_gate.acquire().await {
            permit.forget();
        }
        Ok(self.matrix.lock().unwrap().clone())
    }
}
