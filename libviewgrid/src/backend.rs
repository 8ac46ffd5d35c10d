//! Service contracts the view page consumes, and a file based implementation.
use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};
use viewgrid_types::{
    MatrixEvent, MatrixRequest, MatrixResponse, StatePut, ViewDefinition, ViewId, ViewState,
};

use crate::schema::{base_schema, resolve_all};

pub const DEFINITION_FILE: &str = "definition.json";
pub const STATE_FILE: &str = "state.json";
pub const MATRIX_FILE: &str = "matrix.json";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("view {0} not found")]
    NotFound(ViewId),
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode {what}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Definition, state and matrix services of one backend.
pub trait ViewBackend: Send + Sync + 'static {
    /// Read-only view definition.
    fn get_definition(
        &self,
        view: &ViewId,
    ) -> impl Future<Output = Result<ViewDefinition, BackendError>> + Send;

    fn get_state(&self, view: &ViewId)
    -> impl Future<Output = Result<ViewState, BackendError>> + Send;

    /// Persists both draft structures and echoes the stored state. Must be idempotent.
    fn put_state(
        &self,
        view: &ViewId,
        state: StatePut,
    ) -> impl Future<Output = Result<ViewState, BackendError>> + Send;

    /// One page of server computed rows.
    fn post_matrix(
        &self,
        view: &ViewId,
        request: MatrixRequest,
    ) -> impl Future<Output = Result<MatrixResponse, BackendError>> + Send;
}

/// Backend serving `<dir>/<view>/{definition,state,matrix}.json`.
///
/// Saved states are kept in memory; the files are never written.
#[derive(Debug)]
pub struct FixtureBackend {
    dir: PathBuf,
    saved: Mutex<HashMap<ViewId, ViewState>>,
}

impl FixtureBackend {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            saved: Mutex::new(HashMap::new()),
        }
    }

    fn view_file(&self, view: &ViewId, file: &str) -> PathBuf {
        self.dir.join(view.0.as_str()).join(file)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, BackendError> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(BackendError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| BackendError::Decode {
                what: path.display().to_string(),
                source,
            })
    }

    async fn definition(&self, view: &ViewId) -> Result<ViewDefinition, BackendError> {
        Self::read_json(&self.view_file(view, DEFINITION_FILE))
            .await?
            .ok_or_else(|| BackendError::NotFound(view.clone()))
    }
}

/// Keeps the events whose data rows fall into `[offset, offset + limit)`. A group event
/// belongs to the data row that follows it.
fn page_window(events: Vec<MatrixEvent>, offset: u64, limit: u64) -> (Vec<MatrixEvent>, u64) {
    let mut next_data = 0u64;
    let mut page = Vec::new();
    for event in events {
        let index = next_data;
        if matches!(event, MatrixEvent::Data(_)) {
            next_data += 1;
        }
        if index >= offset && index < offset.saturating_add(limit) {
            page.push(event);
        }
    }
    (page, next_data)
}

impl ViewBackend for FixtureBackend {
    async fn get_definition(&self, view: &ViewId) -> Result<ViewDefinition, BackendError> {
        self.definition(view).await
    }

    async fn get_state(&self, view: &ViewId) -> Result<ViewState, BackendError> {
        if let Some(state) = self.saved.lock().await.get(view) {
            return Ok(state.clone());
        }
        Ok(Self::read_json(&self.view_file(view, STATE_FILE))
            .await?
            .unwrap_or_default())
    }

    async fn put_state(&self, view: &ViewId, state: StatePut) -> Result<ViewState, BackendError> {
        let definition = self.definition(view).await?;
        let controls = state.controls_source.normalized();
        let table_state = state.table_state_source.normalized();
        let effective = resolve_all(&base_schema(&definition, None), &controls)
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| BackendError::Decode {
                what: format!("effective controls of {view}"),
                source,
            })?;
        let stored = ViewState {
            controls_source: Some(controls),
            controls_effective: Some(effective),
            table_state_source: Some(table_state.clone()),
            table_state_effective: Some(table_state),
        };
        info!("stored state of view {view}");
        self.saved.lock().await.insert(view.clone(), stored.clone());
        Ok(stored)
    }

    async fn post_matrix(
        &self,
        view: &ViewId,
        request: MatrixRequest,
    ) -> Result<MatrixResponse, BackendError> {
        let mut response: MatrixResponse = Self::read_json(&self.view_file(view, MATRIX_FILE))
            .await?
            .ok_or_else(|| BackendError::NotFound(view.clone()))?;
        let (rows, total) = page_window(
            std::mem::take(&mut response.rows),
            u64::from(request.offset),
            u64::from(request.limit),
        );
        debug!(
            view = %view,
            offset = request.offset,
            limit = request.limit,
            total,
            "serving fixture matrix page"
        );
        response.rows = rows;
        if response.meta.total_after_filter == 0 {
            response.meta.total_after_filter = total;
        }
        if response.meta.base_loaded == 0 {
            response.meta.base_loaded = total;
        }
        response.meta.has_more = u64::from(request.offset) + u64::from(request.limit) < total;
        Ok(response)
    }
}
