//! Canonical matrix query keys and page offset tracking.
use derive_more::Display;
use serde_json::json;
use tracing::{debug, warn};
use viewgrid_types::{ColumnOverrides, TableState};

use crate::draft::canonical_json;

/// Canonical form of the draft configuration that drives a matrix fetch.
///
/// Two keys are equal iff the drafts are semantically equal, so identity churn of the
/// draft objects never causes a refetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub struct MatrixQueryKey(String);

impl MatrixQueryKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Builds the query key, or `None` while either draft is not initialized.
#[must_use]
pub fn build_key(
    overrides: Option<&ColumnOverrides>,
    table_state: Option<&TableState>,
) -> Option<MatrixQueryKey> {
    let (overrides, table_state) = (overrides?, table_state?);
    let value = json!({
        "controls_source": overrides.normalized(),
        "table_state_source": table_state.normalized(),
    });
    match canonical_json(&value) {
        Ok(key) => Some(MatrixQueryKey(key)),
        Err(err) => {
            warn!("could not build matrix query key: {err}");
            None
        }
    }
}

/// Page window into the matrix. The offset is only meaningful for one query key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    key: Option<MatrixQueryKey>,
    offset: u32,
    limit: u32,
}

impl Pager {
    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self {
            key: None,
            offset: 0,
            limit: limit.max(1),
        }
    }

    #[must_use]
    pub fn key(&self) -> Option<&MatrixQueryKey> {
        self.key.as_ref()
    }

    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Records the current key. Returns true if it changed, in which case the offset
    /// is back at zero.
    pub fn observe(&mut self, key: Option<MatrixQueryKey>) -> bool {
        if self.key == key {
            return false;
        }
        debug!(offset = self.offset, "matrix query key changed, resetting offset");
        self.key = key;
        self.offset = 0;
        true
    }

    pub fn next_page(&mut self, has_more: bool) -> bool {
        if !has_more {
            return false;
        }
        self.offset = self.offset.saturating_add(self.limit);
        true
    }

    pub fn prev_page(&mut self) -> bool {
        if self.offset == 0 {
            return false;
        }
        self.offset = self.offset.saturating_sub(self.limit);
        true
    }

    pub fn set_offset(&mut self, offset: u32) -> bool {
        let changed = self.offset != offset;
        self.offset = offset;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewgrid_types::{ColumnOverride, SortDirection, SortSpec};

    fn state_with_filters(filters: &[(&str, &str)]) -> TableState {
        let mut state = TableState::default();
        for (guid, text) in filters {
            state.filters.insert((*guid).into(), (*text).to_string());
        }
        state
    }

    #[test]
    fn no_key_until_both_drafts_exist() {
        let overrides = ColumnOverrides::default();
        let state = TableState::default();
        assert_eq!(build_key(None, Some(&state)), None);
        assert_eq!(build_key(Some(&overrides), None), None);
        assert!(build_key(Some(&overrides), Some(&state)).is_some());
    }

    #[test]
    fn equal_semantics_give_equal_keys() {
        let overrides = ColumnOverrides::default();
        let a = state_with_filters(&[("x", "1"), ("y", "2")]);
        let b = state_with_filters(&[("y", "2"), ("x", "1"), ("z", "  ")]);
        let mut padded = ColumnOverrides::default();
        padded.0.insert("c".into(), ColumnOverride::default());
        assert_eq!(
            build_key(Some(&overrides), Some(&a)),
            build_key(Some(&padded), Some(&b.clone()))
        );
    }

    #[test]
    fn semantic_change_changes_key() {
        let overrides = ColumnOverrides::default();
        let mut state = TableState::default();
        let before = build_key(Some(&overrides), Some(&state));
        state.sort = SortSpec::by("a", SortDirection::Desc);
        assert_ne!(before, build_key(Some(&overrides), Some(&state)));
    }

    #[test]
    fn key_change_resets_offset() {
        let overrides = ColumnOverrides::default();
        let mut pager = Pager::new(50);
        assert!(pager.observe(build_key(Some(&overrides), Some(&TableState::default()))));
        assert!(pager.next_page(true));
        assert!(pager.next_page(true));
        assert_eq!(pager.offset(), 100);

        // same semantics, fresh objects
        assert!(!pager.observe(build_key(
            Some(&ColumnOverrides::default()),
            Some(&TableState::default())
        )));
        assert_eq!(pager.offset(), 100);

        assert!(pager.observe(build_key(
            Some(&overrides),
            Some(&state_with_filters(&[("a", "x")]))
        )));
        assert_eq!(pager.offset(), 0);
    }

    #[test]
    fn paging_stays_in_bounds() {
        let mut pager = Pager::new(10);
        assert!(!pager.prev_page());
        assert!(!pager.next_page(false));
        assert!(pager.set_offset(25));
        assert!(pager.prev_page());
        assert!(pager.prev_page());
        assert_eq!(pager.offset(), 0);
    }
}
