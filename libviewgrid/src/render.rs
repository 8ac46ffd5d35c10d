//! Plain text output of a [`GridView`]: an aligned grid and TSV export.
use itertools::Itertools;
use std::fmt::Write;

use crate::draft::SaveStatus;
use crate::page::{GridRow, GridView, ViewStatus};

fn escape_cell(text: &str) -> String {
    text.replace(['\t', '\n'], " ")
}

/// Formats the selected data rows as tab-separated values, in display order.
///
/// Only visible columns are exported. Returns an empty string when nothing is selected.
#[must_use]
pub fn format_rows_as_tsv(grid: &GridView, include_header: bool) -> String {
    let rows: Vec<String> = grid
        .rows
        .iter()
        .filter_map(|row| match row {
            GridRow::Data {
                selected: true,
                cells,
                ..
            } => Some(cells.iter().map(|cell| escape_cell(&cell.text)).join("\t")),
            _ => None,
        })
        .collect();
    if rows.is_empty() {
        return String::new();
    }
    let header = include_header.then(|| {
        grid.columns
            .iter()
            .map(|column| escape_cell(&column.label))
            .join("\t")
    });
    header.into_iter().chain(rows).join("\n")
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{text}{}", " ".repeat(width.saturating_sub(len)))
}

/// Renders the grid as aligned text, one line per row.
#[must_use]
pub fn render_text(grid: &GridView) -> String {
    let mut widths: Vec<usize> = grid
        .columns
        .iter()
        .map(|column| column.label.chars().count())
        .collect();
    for row in &grid.rows {
        if let GridRow::Data { cells, .. } = row {
            for (width, cell) in widths.iter_mut().zip(cells) {
                *width = (*width).max(cell.text.chars().count());
            }
        }
    }

    let mut out = String::new();
    let header = grid
        .columns
        .iter()
        .zip(&widths)
        .map(|(column, width)| pad(&column.label, *width))
        .join(" | ");
    let _ = writeln!(out, "  {}", header.trim_end());
    let _ = writeln!(out, "  {}", "-".repeat(header.trim_end().chars().count()));

    for row in &grid.rows {
        match row {
            GridRow::Group {
                label,
                count,
                sum,
                collapsed,
                ..
            } => {
                let marker = if *collapsed { '+' } else { '-' };
                let _ = write!(out, "{marker} {label} ({count})");
                if let Some(sum) = sum {
                    let _ = write!(out, " sum {sum}");
                }
                out.push('\n');
            }
            GridRow::Data {
                selected, cells, ..
            } => {
                let marker = if *selected { '*' } else { ' ' };
                let line = cells
                    .iter()
                    .zip(&widths)
                    .map(|(cell, width)| pad(&cell.text, *width))
                    .join(" | ");
                let _ = writeln!(out, "{marker} {}", line.trim_end());
            }
        }
    }

    if let Some(totals) = &grid.totals {
        let _ = write!(out, "total");
        if let Some(count) = totals.count {
            let _ = write!(out, " {count} rows");
        }
        if let Some(sum) = &totals.sum {
            let _ = write!(out, ", sum {sum}");
        }
        out.push('\n');
    }
    if let Some(meta) = &grid.meta {
        let _ = writeln!(
            out,
            "offset {} of {}{}{}",
            grid.offset,
            meta.total_after_filter,
            if meta.has_more { ", more available" } else { "" },
            if meta.table_truncated { ", truncated" } else { "" },
        );
    }
    match &grid.status {
        ViewStatus::LoadFailed(err) => {
            let _ = writeln!(out, "error: {err}");
        }
        ViewStatus::Unmounted | ViewStatus::Loading | ViewStatus::Ready => {}
    }
    if let SaveStatus::Failed(err) = &grid.save_status {
        let _ = writeln!(out, "save failed: {err}");
    }
    out
}
