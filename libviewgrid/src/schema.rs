//! Reconciles the remote column schema with persisted and draft layout.
use itertools::Itertools;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;
use viewgrid_types::{
    ColumnOverrides, Control, ControlGuid, ROOT_SECTION, ViewDefinition, ViewState,
};

/// Builds a validated column from a loosely typed schema entry.
///
/// `section` and `key_hint` provide defaults for `group` and `field`; `position` is the
/// default `display_order`. Returns `None` for non-objects and entries without a guid.
#[must_use]
pub fn normalize_control(
    raw: &Value,
    section: Option<&str>,
    key_hint: Option<&str>,
    position: usize,
) -> Option<Control> {
    let object = raw.as_object()?;
    let guid = text(object, "control_guid")?;
    let field = text(object, "field").or_else(|| key_hint.map(str::to_string))?;
    let group = text(object, "group")
        .or_else(|| section.map(str::to_string))
        .unwrap_or_default();
    let label = text(object, "label").unwrap_or_else(|| field.clone());

    let display_order = object
        .get("display_order")
        .and_then(|order| {
            order.as_i64().or_else(|| {
                order
                    .as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.round() as i64)
            })
        })
        .unwrap_or(position as i64);

    Some(Control {
        control_guid: ControlGuid(guid),
        group,
        field,
        label,
        type_name: text(object, "type"),
        control_type: text(object, "control_type"),
        show: object.get("show").and_then(Value::as_bool).unwrap_or(true),
        display_order,
        width: object
            .get("width")
            .and_then(Value::as_f64)
            .filter(|w| w.is_finite() && *w > 0.0)
            .map(|w| w as f32),
        sortable: object.get("sortable").and_then(Value::as_bool).unwrap_or(true),
        searchable: object
            .get("searchable")
            .and_then(Value::as_bool)
            .unwrap_or(true),
        configs: object.get("configs").cloned().unwrap_or(Value::Null),
    })
}

fn text(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(value) if !value.trim().is_empty() => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

/// Keeps the first entry of every guid.
fn dedup(controls: impl IntoIterator<Item = Control>) -> Vec<Control> {
    let mut seen = HashSet::new();
    controls
        .into_iter()
        .filter(|control| {
            let fresh = seen.insert(control.control_guid.clone());
            if !fresh {
                debug!(guid = %control.control_guid, "dropping duplicate column");
            }
            fresh
        })
        .collect()
}

/// Columns of a raw view definition, in document order.
#[must_use]
pub fn extract_definition_schema(definition: &ViewDefinition) -> Vec<Control> {
    let entries = definition
        .daten
        .iter()
        .filter(|(section, _)| section.as_str() != ROOT_SECTION)
        .flat_map(|(section, entries)| {
            entries
                .entries()
                .into_iter()
                .map(move |(key, raw)| (section.as_str(), key, raw))
        })
        .enumerate()
        .filter_map(|(position, (section, key, raw))| {
            normalize_control(raw, Some(section), key, position)
        });
    dedup(entries)
}

/// Columns of the persisted effective list.
#[must_use]
pub fn extract_effective_schema(effective: &[Value]) -> Vec<Control> {
    dedup(
        effective
            .iter()
            .enumerate()
            .filter_map(|(position, raw)| normalize_control(raw, None, None, position)),
    )
}

/// The base schema of a view.
///
/// A non-empty persisted effective list wins over the raw definition. Columns known only
/// to the definition are appended hidden, so a column picker can still surface them.
#[must_use]
pub fn base_schema(definition: &ViewDefinition, state: Option<&ViewState>) -> Vec<Control> {
    let from_definition = extract_definition_schema(definition);
    let effective = state
        .and_then(|state| state.controls_effective.as_deref())
        .map(extract_effective_schema)
        .filter(|effective| !effective.is_empty());

    let Some(mut effective) = effective else {
        return from_definition;
    };

    let known: HashSet<ControlGuid> = effective
        .iter()
        .map(|control| control.control_guid.clone())
        .collect();
    let next_order = effective
        .iter()
        .map(|control| control.display_order)
        .max()
        .map_or(0, |max| max + 1);
    effective.extend(
        from_definition
            .into_iter()
            .filter(|control| !known.contains(&control.control_guid))
            .enumerate()
            .map(|(offset, mut control)| {
                control.show = false;
                control.display_order = next_order + offset as i64;
                control
            }),
    );
    effective
}

/// Minimal identity/name schema used when nothing else resolves.
#[must_use]
pub fn fallback_schema() -> Vec<Control> {
    vec![
        Control::new("__id", "", "id", "ID").with_display_order(0),
        Control::new("__name", "", "name", "Name").with_display_order(1),
    ]
}

/// All columns with draft overrides applied, in display order, hidden ones included.
#[must_use]
pub fn resolve_all(base: &[Control], overrides: &ColumnOverrides) -> Vec<Control> {
    let base = if base.is_empty() {
        fallback_schema()
    } else {
        base.to_vec()
    };
    base.into_iter()
        .map(|mut control| {
            if let Some(over) = overrides.get(&control.control_guid) {
                control.apply_override(over);
            }
            control
        })
        // `sorted_by_key` is stable: ties keep their original order.
        .sorted_by_key(|control| control.display_order)
        .collect()
}

/// Visible columns in display order.
#[must_use]
pub fn resolve_visible(base: &[Control], overrides: &ColumnOverrides) -> Vec<Control> {
    let visible: Vec<Control> = resolve_all(base, overrides)
        .into_iter()
        .filter(|control| control.show)
        .collect();
    if visible.is_empty() {
        fallback_schema()
    } else {
        visible
    }
}

// ========================
// Column picker edits
// ========================

pub fn set_visible(overrides: &mut ColumnOverrides, guid: &ControlGuid, show: bool) {
    overrides.entry_mut(guid).show = Some(show);
}

/// Sets or clears (with `None`) the width override.
pub fn set_width(overrides: &mut ColumnOverrides, guid: &ControlGuid, width: Option<f32>) {
    let width = width.filter(|w| w.is_finite() && *w > 0.0);
    overrides.entry_mut(guid).width = width;
}

/// Moves `guid` to `position` among all columns and renumbers every column's order.
///
/// Returns false if the column is unknown.
pub fn move_column(
    base: &[Control],
    overrides: &mut ColumnOverrides,
    guid: &ControlGuid,
    position: usize,
) -> bool {
    let mut order: Vec<ControlGuid> = resolve_all(base, overrides)
        .into_iter()
        .map(|control| control.control_guid)
        .collect();
    let Some(current) = order.iter().position(|candidate| candidate == guid) else {
        return false;
    };
    let moved = order.remove(current);
    order.insert(position.min(order.len()), moved);
    for (index, guid) in order.iter().enumerate() {
        overrides.entry_mut(guid).display_order = Some(index as i64);
    }
    true
}

/// Drops every override for `guid`.
pub fn reset_column(overrides: &mut ColumnOverrides, guid: &ControlGuid) {
    overrides.remove(guid);
}
