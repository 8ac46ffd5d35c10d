//! Projection of the server-ordered matrix events into display rows.
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;
use viewgrid_types::{
    Control, DropdownMaps, GroupEvent, GroupSpec, MatrixEvent, MatrixResponse, MatrixTotals, Row,
    RowUid, TableState,
};

use crate::format::{ValueFormatter, raw_string};

/// Summary row of one server-side group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub key: String,
    pub label: String,
    pub count: u64,
    pub sum: Option<f64>,
    pub collapsed: bool,
}

/// One data row. `base_index` counts data events only and is what selection ranges use.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
    pub base_index: usize,
    pub uid: RowUid,
    pub group_key: Option<String>,
    pub row: Row,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderRow {
    Group(GroupRow),
    Data(DataRow),
}

impl RenderRow {
    #[must_use]
    pub fn as_data(&self) -> Option<&DataRow> {
        match self {
            Self::Data(data) => Some(data),
            Self::Group(_) => None,
        }
    }
}

/// Locally collapsed group keys, valid for one grouping configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollapseState {
    grouping: GroupSpec,
    keys: BTreeSet<String>,
}

impl CollapseState {
    /// Clears all collapsed keys if the grouping configuration changed.
    pub fn sync(&mut self, grouping: &GroupSpec) -> bool {
        if &self.grouping == grouping {
            return false;
        }
        debug!(?grouping, "grouping changed, expanding all groups");
        self.grouping = grouping.clone();
        let had_keys = !self.keys.is_empty();
        self.keys.clear();
        had_keys
    }

    #[must_use]
    pub fn is_collapsed(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    #[must_use]
    pub fn keys(&self) -> &BTreeSet<String> {
        &self.keys
    }

    /// Flips a group. Returns true if it is collapsed afterwards.
    pub fn toggle(&mut self, key: &str) -> bool {
        if self.keys.remove(key) {
            false
        } else {
            self.keys.insert(key.to_string());
            true
        }
    }

    pub fn collapse_all<'a>(&mut self, keys: impl IntoIterator<Item = &'a str>) {
        self.keys.extend(keys.into_iter().map(str::to_string));
    }

    pub fn expand_all(&mut self) {
        self.keys.clear();
    }
}

/// Keys of all group events in `events`, in server order.
pub fn group_keys(events: &[MatrixEvent]) -> impl Iterator<Item = &str> {
    events.iter().filter_map(|event| match event {
        MatrixEvent::Group(group) => Some(group.key.as_str()),
        MatrixEvent::Data(_) => None,
    })
}

fn group_label(
    group: &GroupEvent,
    column: Option<&Control>,
    dropdowns: &DropdownMaps,
    formatter: &ValueFormatter,
) -> String {
    match column {
        Some(_) if group.raw.is_null() => formatter.empty_group_label().to_string(),
        Some(column) => {
            let label = formatter.format_normal(column, Some(&group.raw), dropdowns);
            if label.trim().is_empty() {
                formatter.empty_group_label().to_string()
            } else {
                label
            }
        }
        None => match &group.raw {
            Value::Null => group.key.clone(),
            raw => raw_string(raw),
        },
    }
}

/// Walks `events` in order and produces the display rows.
///
/// Data rows of collapsed groups are omitted but still advance the base index.
#[must_use]
pub fn project(
    events: &[MatrixEvent],
    table_state: &TableState,
    all_columns: &[Control],
    collapsed: &CollapseState,
    dropdowns: &DropdownMaps,
    formatter: &ValueFormatter,
) -> Vec<RenderRow> {
    let group_column = table_state
        .group
        .active_by()
        .and_then(|guid| all_columns.iter().find(|column| &column.control_guid == guid));

    let mut rows = Vec::with_capacity(events.len());
    let mut base_index = 0;
    let mut current_group: Option<&str> = None;
    for event in events {
        match event {
            MatrixEvent::Group(group) => {
                current_group = Some(group.key.as_str());
                rows.push(RenderRow::Group(GroupRow {
                    key: group.key.clone(),
                    label: group_label(group, group_column, dropdowns, formatter),
                    count: group.count,
                    sum: group.sum,
                    collapsed: collapsed.is_collapsed(&group.key),
                }));
            }
            MatrixEvent::Data(data) => {
                let index = base_index;
                base_index += 1;
                let group_key = data
                    .group_key
                    .clone()
                    .or_else(|| current_group.map(str::to_string));
                if group_key
                    .as_deref()
                    .is_some_and(|key| collapsed.is_collapsed(key))
                {
                    continue;
                }
                rows.push(RenderRow::Data(DataRow {
                    base_index: index,
                    uid: data.row.uid.clone(),
                    group_key,
                    row: data.row.clone(),
                }));
            }
        }
    }
    rows
}

/// Overall totals: the server's when supplied, otherwise summed over the page.
#[must_use]
pub fn totals(response: &MatrixResponse) -> MatrixTotals {
    if let Some(totals) = &response.totals {
        return totals.clone();
    }
    let groups: Vec<&GroupEvent> = response
        .rows
        .iter()
        .filter_map(|event| match event {
            MatrixEvent::Group(group) => Some(group),
            MatrixEvent::Data(_) => None,
        })
        .collect();
    if groups.is_empty() {
        return MatrixTotals {
            count: Some(response.data_rows().count() as u64),
            sum: None,
        };
    }
    let sums: Vec<f64> = groups.iter().filter_map(|group| group.sum).collect();
    MatrixTotals {
        count: Some(groups.iter().map(|group| group.count).sum()),
        sum: (!sums.is_empty()).then(|| sums.iter().sum()),
    }
}
