mod control;
mod ids;
mod row;
mod service;
mod table_state;

pub use crate::control::{ColumnOverride, ColumnOverrides, ColumnType, Control};
pub use crate::ids::{ControlGuid, RowUid, ViewId};
pub use crate::row::{DataEvent, DropdownMaps, FieldMap, GroupEvent, MatrixEvent, Row};
pub use crate::service::{
    DefinitionRoot, MatrixMeta, MatrixRequest, MatrixResponse, MatrixTotals, ROOT_SECTION,
    SectionEntries, StatePut, ViewDefinition, ViewState,
};
pub use crate::table_state::{GroupSpec, SortDirection, SortSpec, TableState};
