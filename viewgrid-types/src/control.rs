use derive_more::Display;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::ids::ControlGuid;

/// Semantic format of a column, used to pick a value formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ColumnType {
    #[display("string")]
    String,
    #[display("date")]
    Date,
    #[display("datetime")]
    Datetime,
    #[display("number")]
    Number,
    #[display("dropdown")]
    Dropdown,
}

impl ColumnType {
    /// Parses an explicit `type` attribute. Unknown names yield `None`.
    #[must_use]
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "string" | "text" => Some(Self::String),
            "date" => Some(Self::Date),
            "datetime" => Some(Self::Datetime),
            "number" | "float" | "int" | "integer" | "decimal" => Some(Self::Number),
            "dropdown" => Some(Self::Dropdown),
            _ => None,
        }
    }

    /// Compatibility mapping for the older `control_type` attribute.
    #[must_use]
    pub fn from_control_type(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "dropdown" => Self::Dropdown,
            "datetime" => Self::Datetime,
            _ => Self::String,
        }
    }
}

/// A single column of a view schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub control_guid: ControlGuid,
    pub group: String,
    pub field: String,
    pub label: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_type: Option<String>,
    pub show: bool,
    pub display_order: i64,
    /// Pixel width, `None` means the renderer picks one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    pub sortable: bool,
    pub searchable: bool,
    /// Extra metadata passed through untouched.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub configs: Value,
}

impl Control {
    /// Creates a visible, sortable and searchable string column.
    pub fn new(
        control_guid: impl Into<ControlGuid>,
        group: impl Into<String>,
        field: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            control_guid: control_guid.into(),
            group: group.into(),
            field: field.into(),
            label: label.into(),
            type_name: None,
            control_type: None,
            show: true,
            display_order: 0,
            width: None,
            sortable: true,
            searchable: true,
            configs: Value::Null,
        }
    }

    #[must_use]
    pub fn with_type(mut self, type_name: &str) -> Self {
        self.type_name = Some(type_name.to_string());
        self
    }

    #[must_use]
    pub fn with_display_order(mut self, display_order: i64) -> Self {
        self.display_order = display_order;
        self
    }

    /// An explicit `type` wins, otherwise `control_type` is consulted.
    #[must_use]
    pub fn resolved_type(&self) -> ColumnType {
        match self.type_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {
                ColumnType::from_type_name(name).unwrap_or(ColumnType::String)
            }
            _ => self
                .control_type
                .as_deref()
                .map_or(ColumnType::String, ColumnType::from_control_type),
        }
    }

    /// Applies the presentation fields of a draft override.
    pub fn apply_override(&mut self, over: &ColumnOverride) {
        if let Some(show) = over.show {
            self.show = show;
        }
        if let Some(display_order) = over.display_order {
            self.display_order = display_order;
        }
        if over.width.is_some() {
            self.width = over.width;
        }
    }
}

/// Partial presentation override for one column. Absent fields inherit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
}

impl ColumnOverride {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.show.is_none() && self.display_order.is_none() && self.width.is_none()
    }

    /// Reads an override from loosely typed JSON, ignoring fields of the wrong type.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let display_order = object.get("display_order").and_then(|order| {
            order.as_i64().or_else(|| {
                order
                    .as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        });
        Some(Self {
            show: object.get("show").and_then(Value::as_bool),
            display_order,
            width: object
                .get("width")
                .and_then(Value::as_f64)
                .filter(|w| w.is_finite() && *w > 0.0)
                .map(|w| w as f32),
        })
    }
}

/// Draft column overrides keyed by column identity.
///
/// Deserialization is lenient: malformed entries are dropped instead of failing the
/// whole state document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ColumnOverrides(pub BTreeMap<ControlGuid, ColumnOverride>);

impl<'de> Deserialize<'de> for ColumnOverrides {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

impl ColumnOverrides {
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };
        Self(
            object
                .iter()
                .filter(|(guid, _)| !guid.trim().is_empty())
                .filter_map(|(guid, entry)| {
                    ColumnOverride::from_value(entry).map(|over| (ControlGuid::from(guid.as_str()), over))
                })
                .collect(),
        )
    }

    #[must_use]
    pub fn get(&self, guid: &ControlGuid) -> Option<&ColumnOverride> {
        self.0.get(guid)
    }

    pub fn entry_mut(&mut self, guid: &ControlGuid) -> &mut ColumnOverride {
        self.0.entry(guid.clone()).or_default()
    }

    pub fn remove(&mut self, guid: &ControlGuid) -> Option<ColumnOverride> {
        self.0.remove(guid)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drops entries that carry no override at all.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(_, over)| !over.is_empty())
                .map(|(guid, over)| (guid.clone(), *over))
                .collect(),
        )
    }
}
