//! Multi-row selection keyed by row identity, anchored by base index.
use std::collections::{BTreeSet, HashSet};
use viewgrid_types::RowUid;

/// Runtime selection state (never persisted).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    pub rows: BTreeSet<RowUid>,
    /// Base index used as the reference point of range selection.
    pub anchor: Option<usize>,
}

/// Modifier keys held during a row click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClickModifiers {
    pub shift: bool,
    /// Ctrl on most platforms, Cmd on macOS.
    pub toggle: bool,
}

impl ClickModifiers {
    pub const NONE: Self = Self {
        shift: false,
        toggle: false,
    };
    pub const SHIFT: Self = Self {
        shift: true,
        toggle: false,
    };
    pub const TOGGLE: Self = Self {
        shift: false,
        toggle: true,
    };
}

/// Result of a selection operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionUpdate {
    pub selection: Selection,
    pub changed: bool,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn contains(&self, uid: &RowUid) -> bool {
        self.rows.contains(uid)
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.anchor = None;
    }

    /// Selects every row of the page, anchored at the first one.
    #[must_use]
    pub fn all(page: &[RowUid]) -> Self {
        Self {
            rows: page.iter().cloned().collect(),
            anchor: (!page.is_empty()).then_some(0),
        }
    }

    /// Selected uids in page order.
    #[must_use]
    pub fn ordered_uids(&self, page: &[RowUid]) -> Vec<RowUid> {
        page.iter()
            .filter(|uid| self.rows.contains(uid))
            .cloned()
            .collect()
    }

    /// Restricts the selection to `page`.
    ///
    /// Returns `None` when nothing changes so callers can keep the current value. The
    /// anchor survives unless it no longer points into the page.
    #[must_use]
    pub fn pruned(&self, page: &[RowUid]) -> Option<Self> {
        let present: HashSet<&RowUid> = page.iter().collect();
        let anchor = self.anchor.filter(|&index| index < page.len());
        if anchor == self.anchor && self.rows.iter().all(|uid| present.contains(uid)) {
            return None;
        }
        Some(Self {
            rows: self
                .rows
                .iter()
                .filter(|uid| present.contains(uid))
                .cloned()
                .collect(),
            anchor,
        })
    }
}

/// Applies a click on the row at base index `index` of `page`.
#[must_use]
pub fn selection_on_click(
    current: &Selection,
    page: &[RowUid],
    index: usize,
    modifiers: ClickModifiers,
) -> SelectionUpdate {
    let Some(clicked) = page.get(index) else {
        return SelectionUpdate {
            selection: current.clone(),
            changed: false,
        };
    };

    let selection = match (modifiers.shift, current.anchor) {
        (true, Some(anchor)) => {
            let (low, high) = (anchor.min(index), anchor.max(index));
            let range = page[low..=high.min(page.len() - 1)].iter().cloned();
            let rows = if modifiers.toggle {
                current.rows.iter().cloned().chain(range).collect()
            } else {
                range.collect()
            };
            Selection {
                rows,
                anchor: current.anchor,
            }
        }
        (false, _) if modifiers.toggle => {
            let mut next = current.clone();
            if next.rows.remove(clicked) {
                if next.rows.is_empty() {
                    next.anchor = None;
                }
            } else {
                next.rows.insert(clicked.clone());
                if next.anchor.is_none() || next.rows.len() == 1 {
                    next.anchor = Some(index);
                }
            }
            next
        }
        // Plain click, or shift without an anchor.
        _ => Selection {
            rows: BTreeSet::from([clicked.clone()]),
            anchor: Some(index),
        },
    };

    SelectionUpdate {
        changed: selection != *current,
        selection,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: usize) -> Vec<RowUid> {
        (0..n).map(|i| RowUid(format!("r{i}"))).collect()
    }

    fn uids(selection: &Selection, page: &[RowUid]) -> Vec<String> {
        selection
            .ordered_uids(page)
            .into_iter()
            .map(|uid| uid.0)
            .collect()
    }

    #[test]
    fn plain_click_selects_only_the_row() {
        let rows = page(5);
        let mut current = Selection::new();
        current.rows.insert(rows[0].clone());
        current.rows.insert(rows[4].clone());

        let result = selection_on_click(&current, &rows, 2, ClickModifiers::NONE);
        assert!(result.changed);
        assert_eq!(uids(&result.selection, &rows), ["r2"]);
        assert_eq!(result.selection.anchor, Some(2));
    }

    #[test]
    fn clicking_the_only_selected_row_is_unchanged() {
        let rows = page(3);
        let first = selection_on_click(&Selection::new(), &rows, 1, ClickModifiers::NONE);
        let again = selection_on_click(&first.selection, &rows, 1, ClickModifiers::NONE);
        assert!(!again.changed);
    }

    #[test]
    fn shift_click_selects_inclusive_range_in_both_directions() {
        let rows = page(8);
        let forward = selection_on_click(&Selection::new(), &rows, 2, ClickModifiers::NONE);
        let forward = selection_on_click(&forward.selection, &rows, 5, ClickModifiers::SHIFT);
        assert_eq!(uids(&forward.selection, &rows), ["r2", "r3", "r4", "r5"]);
        assert_eq!(forward.selection.anchor, Some(2));

        let backward = selection_on_click(&Selection::new(), &rows, 5, ClickModifiers::NONE);
        let backward = selection_on_click(&backward.selection, &rows, 2, ClickModifiers::SHIFT);
        assert_eq!(backward.selection.rows, forward.selection.rows);
    }

    #[test]
    fn shift_click_replaces_previous_selection() {
        let rows = page(6);
        let mut current = Selection::new();
        current.rows.insert(rows[5].clone());
        current.rows.insert(rows[0].clone());
        current.anchor = Some(0);

        let result = selection_on_click(&current, &rows, 1, ClickModifiers::SHIFT);
        assert_eq!(uids(&result.selection, &rows), ["r0", "r1"]);
    }

    #[test]
    fn shift_toggle_adds_range() {
        let rows = page(8);
        let mut current = Selection::new();
        current.rows.insert(rows[7].clone());
        current.anchor = Some(1);

        let modifiers = ClickModifiers {
            shift: true,
            toggle: true,
        };
        let result = selection_on_click(&current, &rows, 3, modifiers);
        assert_eq!(uids(&result.selection, &rows), ["r1", "r2", "r3", "r7"]);
    }

    #[test]
    fn shift_without_anchor_acts_like_plain_click() {
        let rows = page(4);
        let result = selection_on_click(&Selection::new(), &rows, 3, ClickModifiers::SHIFT);
        assert_eq!(uids(&result.selection, &rows), ["r3"]);
        assert_eq!(result.selection.anchor, Some(3));
    }

    #[test]
    fn toggle_flips_membership() {
        let rows = page(4);
        let first = selection_on_click(&Selection::new(), &rows, 1, ClickModifiers::TOGGLE);
        assert_eq!(first.selection.anchor, Some(1));

        let second = selection_on_click(&first.selection, &rows, 3, ClickModifiers::TOGGLE);
        assert_eq!(uids(&second.selection, &rows), ["r1", "r3"]);
        assert_eq!(second.selection.anchor, Some(1));

        let third = selection_on_click(&second.selection, &rows, 1, ClickModifiers::TOGGLE);
        assert_eq!(uids(&third.selection, &rows), ["r3"]);

        let cleared = selection_on_click(&third.selection, &rows, 3, ClickModifiers::TOGGLE);
        assert!(cleared.selection.is_empty());
        assert_eq!(cleared.selection.anchor, None);
    }

    #[test]
    fn out_of_range_click_is_ignored() {
        let rows = page(2);
        let result = selection_on_click(&Selection::new(), &rows, 9, ClickModifiers::NONE);
        assert!(!result.changed);
    }

    #[test]
    fn pruning_removes_exactly_the_missing_rows() {
        let rows = page(4);
        let selection = Selection::all(&rows);
        let refreshed: Vec<RowUid> = rows.iter().filter(|uid| uid.0 != "r2").cloned().collect();

        let pruned = selection.pruned(&refreshed).expect("changed");
        assert_eq!(uids(&pruned, &refreshed), ["r0", "r1", "r3"]);
        assert_eq!(pruned.anchor, Some(0));
    }

    #[test]
    fn pruning_keeps_unchanged_selection() {
        let rows = page(4);
        let mut selection = Selection::new();
        selection.rows.insert(rows[1].clone());
        selection.anchor = Some(1);
        assert_eq!(selection.pruned(&rows), None);
    }

    #[test]
    fn pruning_drops_anchor_that_no_longer_resolves() {
        let rows = page(6);
        let mut selection = Selection::new();
        selection.anchor = Some(5);
        let pruned = selection.pruned(&rows[..3]).expect("anchor dropped");
        assert_eq!(pruned.anchor, None);
    }
}
