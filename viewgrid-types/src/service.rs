//! Payloads exchanged with the definition, state and matrix services.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::control::ColumnOverrides;
use crate::ids::RowUid;
use crate::row::{DropdownMaps, MatrixEvent, Row};
use crate::table_state::TableState;

/// Reserved definition section that never contributes columns.
pub const ROOT_SECTION: &str = "ROOT";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefinitionRoot {
    #[serde(default)]
    pub table: String,
}

/// Entries of one definition section, either as a list or keyed by field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionEntries {
    List(Vec<Value>),
    Named(IndexMap<String, Value>),
    Other(Value),
}

impl SectionEntries {
    /// Entries in document order, with the entry key where the section has one.
    #[must_use]
    pub fn entries(&self) -> Vec<(Option<&str>, &Value)> {
        match self {
            Self::List(values) => values.iter().map(|value| (None, value)).collect(),
            Self::Named(values) => values
                .iter()
                .map(|(key, value)| (Some(key.as_str()), value))
                .collect(),
            Self::Other(_) => vec![],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub root: DefinitionRoot,
    #[serde(default)]
    pub daten: IndexMap<String, SectionEntries>,
}

/// Persisted per-user state of a view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewState {
    pub controls_source: Option<ColumnOverrides>,
    /// Server-computed effective column list; wins over the raw definition.
    pub controls_effective: Option<Vec<Value>>,
    pub table_state_source: Option<TableState>,
    pub table_state_effective: Option<TableState>,
}

/// Body of a state save: exactly the two draft structures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatePut {
    pub controls_source: ColumnOverrides,
    pub table_state_source: TableState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controls_source: Option<ColumnOverrides>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_state_source: Option<TableState>,
    pub include_historical: bool,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixMeta {
    pub total_after_filter: u64,
    pub has_more: bool,
    pub table_truncated: bool,
    pub base_loaded: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixTotals {
    pub count: Option<u64>,
    pub sum: Option<f64>,
}

/// One page of server-computed rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixResponse {
    pub rows: Vec<MatrixEvent>,
    pub dropdowns: DropdownMaps,
    pub totals: Option<MatrixTotals>,
    pub meta: MatrixMeta,
    pub table: String,
}

impl MatrixResponse {
    /// Data rows in server order; position equals the row's base index.
    pub fn data_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter_map(MatrixEvent::data_row)
    }

    #[must_use]
    pub fn page_uids(&self) -> Vec<RowUid> {
        self.data_rows().map(|row| row.uid.clone()).collect()
    }
}
