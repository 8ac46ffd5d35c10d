use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::ids::{ControlGuid, RowUid};

pub type FieldMap = serde_json::Map<String, Value>;

/// Per-column mapping from raw coded value to its display label, valid for one page.
pub type DropdownMaps = BTreeMap<ControlGuid, BTreeMap<String, String>>;

/// One data row. Values live in `daten[group][field]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub uid: RowUid,
    #[serde(default)]
    pub daten: BTreeMap<String, FieldMap>,
}

impl Row {
    #[must_use]
    pub fn new(uid: impl Into<RowUid>) -> Self {
        Self {
            uid: uid.into(),
            daten: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_value(mut self, group: &str, field: &str, value: Value) -> Self {
        self.daten
            .entry(group.to_string())
            .or_default()
            .insert(field.to_string(), value);
        self
    }

    #[must_use]
    pub fn value(&self, group: &str, field: &str) -> Option<&Value> {
        self.daten.get(group)?.get(field)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEvent {
    pub key: String,
    /// Representative raw value of the grouping column.
    #[serde(default)]
    pub raw: Value,
    #[serde(default)]
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEvent {
    pub row: Row,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_key: Option<String>,
}

/// One entry of the server-ordered matrix sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatrixEvent {
    Group(GroupEvent),
    Data(DataEvent),
}

impl MatrixEvent {
    #[must_use]
    pub fn data_row(&self) -> Option<&Row> {
        match self {
            Self::Data(data) => Some(&data.row),
            Self::Group(_) => None,
        }
    }
}
