mod app;
mod color;
mod config;
mod data;
mod export;
mod format;
mod state;
mod ui;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use app::ZoneMapApp;
use clap::Parser;
use config::{DashboardConfig, MapBackend};
use data::filter::{FilterCriteria, Selection};
use eframe::egui;
use state::AppState;

/// Interactive map of delivery visits by zone, weekday and month.
#[derive(Parser, Debug)]
#[command(name = "zone-map", version, about)]
struct Cli {
    /// Sheet to open (.xlsx, .xls, .ods, .csv, .json, .parquet)
    file: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Write the map page to this file and exit instead of opening a window
    #[arg(long, value_name = "OUT.html")]
    export: Option<PathBuf>,

    #[arg(long)]
    weekday: Option<String>,

    #[arg(long)]
    zone: Option<String>,

    #[arg(long)]
    month: Option<String>,

    /// Only visits lighter than this (kg); 0 disables the bound
    #[arg(long, default_value_t = 0.0)]
    max_weight: f64,

    /// Disable marker clustering
    #[arg(long)]
    no_clusters: bool,

    /// Map widget for the exported page
    #[arg(long, value_enum)]
    backend: Option<MapBackend>,
}

impl Cli {
    fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            weekday: Selection::from_option(self.weekday.clone()),
            zone: Selection::from_option(self.zone.clone()),
            month: Selection::from_option(self.month.clone()),
            max_weight: self.max_weight,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut config = DashboardConfig::load(cli.config.as_deref())?;
    if cli.no_clusters {
        config.map.clustering = false;
    }
    if let Some(backend) = cli.backend {
        config.map.backend = backend;
    }
    let file = cli.file.clone().or_else(|| config.data_path.clone());

    match &cli.export {
        Some(out) => {
            let file = file.context("no input sheet given (pass FILE or set data_path)")?;
            export_headless(&cli, config, &file, out)
        }
        None => run_window(&cli, config, file),
    }
}

fn export_headless(cli: &Cli, config: DashboardConfig, file: &Path, out: &Path) -> Result<()> {
    let mut state = AppState::new(config);
    state.open(file)?;
    if cli.max_weight > 0.0 && state.table.as_ref().is_some_and(|t| !t.has_weight) {
        log::warn!("{}: no weight column, --max-weight ignored", file.display());
    }
    state.criteria = cli.criteria();
    state.refilter();

    let Some(summary) = state.summary else {
        return Err(anyhow!("no data for the selected filters ({:?})", state.criteria));
    };
    state.export_map(out)?;
    log::info!(
        "{} documents, amount {}{}",
        summary.documents,
        format::money(summary.amount),
        summary
            .weight
            .map(|w| format!(", weight {} (avg {})", format::weight(Some(w.sum)), format::weight(Some(w.mean))))
            .unwrap_or_default()
    );
    Ok(())
}

fn run_window(cli: &Cli, config: DashboardConfig, file: Option<PathBuf>) -> Result<()> {
    let mut state = AppState::new(config);
    if let Some(path) = &file {
        state.open_or_report(path);
        if state.table.is_some() {
            state.criteria = cli.criteria();
            state.refilter();
        }
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Zone Map – Visits by zone, day and month",
        options,
        Box::new(|_cc| Ok(Box::new(ZoneMapApp::new(state)))),
    )
    .map_err(|e| anyhow!("UI error: {e}"))
}
