use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ids::ControlGuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SortSpec {
    pub control_guid: Option<ControlGuid>,
    pub direction: Option<SortDirection>,
}

impl SortSpec {
    #[must_use]
    pub fn by(control_guid: impl Into<ControlGuid>, direction: SortDirection) -> Self {
        Self {
            control_guid: Some(control_guid.into()),
            direction: Some(direction),
        }
    }

    /// Returns the direction if this spec sorts by `guid`.
    #[must_use]
    pub fn direction_for(&self, guid: &ControlGuid) -> Option<SortDirection> {
        match (&self.control_guid, self.direction) {
            (Some(sorted), Some(direction)) if sorted == guid => Some(direction),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupSpec {
    pub enabled: bool,
    pub by: Option<ControlGuid>,
    pub sum_control_guid: Option<ControlGuid>,
}

impl GroupSpec {
    /// The grouping column, only when grouping is switched on.
    #[must_use]
    pub fn active_by(&self) -> Option<&ControlGuid> {
        self.by.as_ref().filter(|_| self.enabled)
    }
}

/// Sort, filter and grouping configuration computed by the matrix service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableState {
    pub sort: SortSpec,
    pub filters: BTreeMap<ControlGuid, String>,
    pub group: GroupSpec,
}

impl TableState {
    /// Semantically equivalent state with blank filters and half-set sorts removed.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let sort = match (&self.sort.control_guid, self.sort.direction) {
            (Some(guid), Some(direction)) if !guid.is_empty() => SortSpec::by(guid.clone(), direction),
            _ => SortSpec::default(),
        };
        let filters = self
            .filters
            .iter()
            .filter(|(guid, text)| !guid.is_empty() && !text.trim().is_empty())
            .map(|(guid, text)| (guid.clone(), text.clone()))
            .collect();
        Self {
            sort,
            filters,
            group: self.group.clone(),
        }
    }
}
