use std::sync::Arc;
use viewgrid_types::{ControlGuid, MatrixResponse, ViewDefinition, ViewState};

use crate::backend::BackendError;
use crate::cache::MatrixCacheKey;
use crate::selection::ClickModifiers;

/// Everything that can happen to a mounted view page.
#[derive(Debug)]
pub enum ViewMessage {
    // Column picker
    SetColumnVisible {
        guid: ControlGuid,
        show: bool,
    },
    /// `None` restores automatic width.
    SetColumnWidth {
        guid: ControlGuid,
        width: Option<f32>,
    },
    /// Move a column to `position` in the list of all columns.
    MoveColumn {
        guid: ControlGuid,
        position: usize,
    },
    /// Drop every draft override of a column.
    ResetColumn {
        guid: ControlGuid,
    },

    /// Cycle the sort of a column through ascending, descending and unsorted.
    ToggleSort {
        guid: ControlGuid,
    },
    /// Set the filter text of a column. Blank text removes the filter.
    SetFilter {
        guid: ControlGuid,
        text: String,
    },

    // Grouping panel
    SetGroupingEnabled(bool),
    SetGroupBy(Option<ControlGuid>),
    SetSumColumn(Option<ControlGuid>),
    ToggleGroupCollapsed {
        key: String,
    },
    CollapseAllGroups,
    ExpandAllGroups,

    // Pager
    NextPage,
    PrevPage,
    SetPageOffset(u32),

    // Rows. Indices are base indices into the current page.
    RowClicked {
        index: usize,
        modifiers: ClickModifiers,
    },
    RowDoubleClicked {
        index: usize,
    },
    SelectAll,
    ClearSelection,

    /// Render raw values instead of type aware formatting.
    SetExpertMode(bool),
    SetIncludeHistorical(bool),

    /// Save the drafts immediately, unless a save is already in flight.
    SaveNow,
    /// Throw away unsaved drafts.
    RevertDraft,

    // Completions of backend requests
    DefinitionLoaded(Result<ViewDefinition, BackendError>),
    StateLoaded(Result<ViewState, BackendError>),
    MatrixLoaded {
        key: MatrixCacheKey,
        result: Result<Arc<MatrixResponse>, BackendError>,
    },
    StateSaved(Result<ViewState, BackendError>),

    /// Run more than one message in sequence
    Batch(Vec<ViewMessage>),
}
