mod support;

use std::fs;
use std::sync::Arc;
use test_log::test;

use libviewgrid::backend::{DEFINITION_FILE, MATRIX_FILE};
use libviewgrid::render::{format_rows_as_tsv, render_text};
use libviewgrid::{
    ClickModifiers, FixtureBackend, GridConfig, SignalHub, ViewMessage, ViewPage, ViewStatus,
};

fn fixture_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let view = dir.path().join("orders");
    fs::create_dir(&view).unwrap();
    fs::write(view.join(DEFINITION_FILE), support::DEFINITION).unwrap();
    fs::write(view.join(MATRIX_FILE), support::MATRIX).unwrap();
    dir
}

fn page(backend: &Arc<FixtureBackend>) -> ViewPage<FixtureBackend> {
    ViewPage::new(
        "orders".into(),
        Arc::clone(backend),
        SignalHub::default(),
        &GridConfig::default(),
    )
}

#[test(tokio::test)]
async fn saved_layout_survives_remount() {
    let dir = fixture_dir();
    let backend = Arc::new(FixtureBackend::new(dir.path()));

    let mut first = page(&backend);
    first.mount();
    first.settle().await;
    first.update(ViewMessage::Batch(vec![
        ViewMessage::SetColumnVisible {
            guid: "B".into(),
            show: false,
        },
        ViewMessage::MoveColumn {
            guid: "C".into(),
            position: 0,
        },
        ViewMessage::SaveNow,
    ]));
    first.settle().await;
    assert!(!first.is_dirty());
    first.unmount();

    let mut second = page(&backend);
    second.mount();
    second.settle().await;
    assert_eq!(second.status(), &ViewStatus::Ready);
    let labels: Vec<String> = second
        .visible_columns()
        .into_iter()
        .map(|column| column.label)
        .collect();
    assert_eq!(labels, vec!["C", "A"]);
    assert!(!second.is_dirty());
}

#[test(tokio::test)]
async fn selected_rows_export_as_tsv() {
    let dir = fixture_dir();
    let backend = Arc::new(FixtureBackend::new(dir.path()));
    let mut page = page(&backend);
    page.mount();
    page.settle().await;
    page.update(ViewMessage::RowClicked {
        index: 1,
        modifiers: ClickModifiers::NONE,
    });

    let grid = page.grid();
    assert_eq!(format_rows_as_tsv(&grid, true), "A\tB\tC\nx\t20\tNo");
    let text = render_text(&grid);
    assert!(text.contains("* x | 20 | No"));
    assert!(text.contains("total 2 rows, sum 30"));
}
