//! Code for the `viewgrid` executable.
use chrono::NaiveDate;
use clap::Parser;
use eyre::{Context, Result, bail};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder;
use tracing::{info, warn};

use libviewgrid::logs::start_logging;
use libviewgrid::render::{format_rows_as_tsv, render_text};
use libviewgrid::try_log_error;
use libviewgrid::{
    ClickModifiers, FixtureBackend, GridConfig, SignalHub, ViewMessage, ViewPage, ViewStatus,
};
use viewgrid_types::ControlGuid;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Directory with one `<view>/definition.json`, `state.json`, `matrix.json` per view
    #[clap(long)]
    fixtures: PathBuf,
    /// View to open
    #[clap(long)]
    view: String,
    /// Row offset of the page to show
    #[clap(long)]
    offset: Option<u32>,
    /// Show raw values instead of formatted ones
    #[clap(long)]
    expert: bool,
    /// Ask for historicized values
    #[clap(long)]
    historical: bool,
    /// Group by this column
    #[clap(long)]
    group_by: Option<String>,
    /// Sum this column per group
    #[clap(long, requires = "group_by")]
    sum: Option<String>,
    /// Sort by this column, ascending
    #[clap(long)]
    sort: Option<String>,
    /// Sort descending instead
    #[clap(long, requires = "sort")]
    descending: bool,
    /// Column filter as `COLUMN=TEXT`, may be repeated
    #[clap(long)]
    filter: Vec<String>,
    /// Row indices to select, e.g. `0,2`
    #[clap(long, value_delimiter = ',')]
    select: Vec<usize>,
    /// As-of date (YYYY-MM-DD) announced after loading
    #[clap(long)]
    as_of: Option<NaiveDate>,
    /// Persist the layout changes made through the options above
    #[clap(long)]
    save: bool,
    /// Print the selected rows as tab separated values instead of the grid
    #[clap(long)]
    tsv: bool,
    /// Print published selection and activation events as JSON lines to stderr
    #[clap(long)]
    events: bool,
    /// Only use the built-in default configuration
    #[clap(long)]
    default_config: bool,
    /// Configuration file layered over the defaults
    #[clap(long, conflicts_with = "default_config")]
    config: Option<PathBuf>,
}

fn parse_filter(filter: &str) -> Result<ViewMessage> {
    let Some((column, text)) = filter.split_once('=') else {
        bail!("Filter must look like COLUMN=TEXT, got {filter}");
    };
    Ok(ViewMessage::SetFilter {
        guid: ControlGuid::from(column.trim()),
        text: text.to_string(),
    })
}

/// Translates the command line options into page messages.
fn layout_messages(args: &Args) -> Result<Vec<ViewMessage>> {
    let mut messages = vec![
        ViewMessage::SetExpertMode(args.expert),
        ViewMessage::SetIncludeHistorical(args.historical),
    ];
    if let Some(group_by) = &args.group_by {
        messages.push(ViewMessage::SetGroupingEnabled(true));
        messages.push(ViewMessage::SetGroupBy(Some(group_by.as_str().into())));
        messages.push(ViewMessage::SetSumColumn(
            args.sum.as_deref().map(ControlGuid::from),
        ));
    }
    if let Some(sort) = &args.sort {
        let toggles = if args.descending { 2 } else { 1 };
        for _ in 0..toggles {
            messages.push(ViewMessage::ToggleSort {
                guid: sort.as_str().into(),
            });
        }
    }
    for filter in &args.filter {
        messages.push(parse_filter(filter)?);
    }
    Ok(messages)
}

async fn run(args: Args, config: GridConfig) -> Result<()> {
    if !args.fixtures.is_dir() {
        bail!(
            "Fixture directory does not exist: {}",
            args.fixtures.display()
        );
    }
    let backend = Arc::new(FixtureBackend::new(&args.fixtures));
    let hub = SignalHub::default();
    let mut events = hub.subscribe_events();
    let mut page = ViewPage::new(args.view.as_str().into(), backend, hub.clone(), &config);

    page.mount();
    page.settle().await;
    if let ViewStatus::LoadFailed(err) = page.status() {
        if page.matrix().is_none() {
            bail!("Could not open view {}: {err}", args.view);
        }
        warn!("showing view {} read-only: {err}", args.view);
    }

    page.update(ViewMessage::Batch(layout_messages(&args)?));
    page.settle().await;
    if let Some(as_of) = args.as_of {
        info!("announcing as-of date {as_of}");
        hub.announce_as_of_date(Some(as_of));
        page.settle().await;
    }
    if let Some(offset) = args.offset {
        page.update(ViewMessage::SetPageOffset(offset));
        page.settle().await;
    }
    for (n, index) in args.select.iter().enumerate() {
        let modifiers = if n == 0 {
            ClickModifiers::NONE
        } else {
            ClickModifiers::TOGGLE
        };
        page.update(ViewMessage::RowClicked {
            index: *index,
            modifiers,
        });
    }
    if args.save && page.is_dirty() {
        page.update(ViewMessage::SaveNow);
        page.settle().await;
    }

    let grid = page.grid();
    if args.tsv {
        println!("{}", format_rows_as_tsv(&grid, true));
    } else {
        print!("{}", render_text(&grid));
    }
    page.unmount();

    if args.events {
        while let Ok(event) = events.try_recv() {
            try_log_error!(
                serde_json::to_string(&event).map(|line| eprintln!("{line}")),
                "Failed to serialize view event"
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    start_logging()?;

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => GridConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => GridConfig::new(args.default_config).context("Failed to load config")?,
    };

    let runtime = Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(run(args, config))
}
