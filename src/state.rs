use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::color::ZoneColors;
use crate::config::DashboardConfig;
use crate::data::cache::TableCache;
use crate::data::filter::{filtered_indices, FilterCriteria};
use crate::data::markers::{build_markers, MarkerSet};
use crate::data::model::VisitTable;
use crate::data::summary::{sorted_by_amount, summarize, Summary};
use crate::export::{export_html, MapView};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// Loaded sheets, reused while the file is unchanged.
    pub cache: TableCache,

    /// Path of the current sheet.
    pub source: Option<PathBuf>,

    /// Loaded table (None until user loads a file).
    pub table: Option<Arc<VisitTable>>,

    pub criteria: FilterCriteria,

    /// Group nearby markers visually (does not change the markers).
    pub use_clusters: bool,

    /// Indices of visits passing the current filters.
    pub visible_indices: Vec<usize>,

    /// One marker per coordinate; `None` when nothing passes the filters.
    pub markers: Option<MarkerSet>,

    /// Aggregates over the visible rows; `None` when nothing passes.
    pub summary: Option<Summary>,

    /// Visible rows ordered by amount, largest first.
    pub table_rows: Vec<usize>,

    pub zone_colors: ZoneColors,

    /// Index into `markers.groups` of the marker whose detail is open.
    pub selected_marker: Option<usize>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        let use_clusters = config.map.clustering;
        Self {
            config,
            cache: TableCache::new(),
            source: None,
            table: None,
            criteria: FilterCriteria::default(),
            use_clusters,
            visible_indices: Vec::new(),
            markers: None,
            summary: None,
            table_rows: Vec::new(),
            zone_colors: ZoneColors::default(),
            selected_marker: None,
            status_message: None,
        }
    }

    /// Load (or fetch from cache) a sheet and make it current.
    pub fn open(&mut self, path: &Path) -> Result<()> {
        let table = self.cache.load(path, &self.config.columns)?;
        log::debug!("{} sheet(s) cached", self.cache.len());
        self.source = Some(path.to_path_buf());
        self.set_table(table);
        Ok(())
    }

    /// Like [`open`](Self::open) but reports failures in the status line.
    pub fn open_or_report(&mut self, path: &Path) {
        if let Err(e) = self.open(path) {
            log::error!("Failed to load file: {e:#}");
            self.status_message = Some(format!("Error: {e:#}"));
        }
    }

    /// Re-read the current sheet from disk.
    pub fn reload(&mut self) {
        if let Some(path) = self.source.clone() {
            self.cache.invalidate(&path);
            self.open_or_report(&path);
        }
    }

    /// Ingest a newly loaded table and reset filters that no longer apply.
    pub fn set_table(&mut self, table: Arc<VisitTable>) {
        self.zone_colors = ZoneColors::new(&table.zones);
        self.status_message = (table.skipped_rows > 0)
            .then(|| format!("{} rows skipped (unreadable date, coordinates or amount)", table.skipped_rows));
        self.table = Some(table);
        self.reset_filters();
    }

    pub fn reset_filters(&mut self) {
        self.criteria = FilterCriteria::default();
        self.refilter();
    }

    /// Recompute everything derived from the filters: visible rows, markers,
    /// summary and table order.
    pub fn refilter(&mut self) {
        self.selected_marker = None;
        let Some(table) = &self.table else {
            self.visible_indices.clear();
            self.markers = None;
            self.summary = None;
            self.table_rows.clear();
            return;
        };

        self.visible_indices = filtered_indices(table, &self.criteria);
        self.markers = build_markers(table, &self.visible_indices);
        self.summary = self
            .markers
            .as_ref()
            .map(|_| summarize(table, &self.visible_indices));
        self.table_rows = sorted_by_amount(table, &self.visible_indices);
        log::debug!(
            "{:?}: {} visits, {} markers",
            self.criteria,
            self.visible_indices.len(),
            self.markers.as_ref().map_or(0, |m| m.groups.len())
        );
    }

    /// Map payload for the current filters.
    pub fn map_view(&self) -> Option<MapView> {
        let table = self.table.as_ref()?;
        let markers = self.markers.as_ref()?;
        Some(MapView::from_markers(
            table,
            markers,
            self.config.map.zoom,
            self.use_clusters,
        ))
    }

    /// Write the current map as an HTML page.
    pub fn export_map(&self, path: &Path) -> Result<()> {
        let view = self
            .map_view()
            .context("no data for the selected filters, nothing to export")?;
        export_html(path, &view, &self.config.map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::Selection;
    use std::io::Write;

    fn sheet() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(
            "Номер документа,Дата документа,День недели,Зона,\"Холдинг, контрагент\",группа,Сумма с НДС,lat,lon,Вес\n\
             1,2024-03-01,Пятница,Север,A,Г,10,55.0,37.0,10\n\
             2,2024-03-10,Воскресенье,Север,B,Г,30,55.0,37.0,\n\
             3,2024-03-05,Вторник,Юг,C,Г,20,54.0,36.0,20\n"
                .as_bytes(),
        )
        .unwrap();
        file
    }

    #[test]
    fn open_shows_everything() {
        let file = sheet();
        let mut state = AppState::new(DashboardConfig::default());
        state.open(file.path()).unwrap();

        assert_eq!(state.visible_indices, vec![0, 1, 2]);
        assert_eq!(state.markers.as_ref().unwrap().groups.len(), 2);
        assert_eq!(state.summary.unwrap().documents, 3);
        assert_eq!(state.table_rows, vec![1, 2, 0]);
        assert!(state.use_clusters);
    }

    #[test]
    fn empty_filter_skips_map_and_summary() {
        let file = sheet();
        let mut state = AppState::new(DashboardConfig::default());
        state.open(file.path()).unwrap();

        state.criteria.weekday = Selection::Only("Понедельник".into());
        state.refilter();
        assert!(state.visible_indices.is_empty());
        assert!(state.markers.is_none());
        assert!(state.summary.is_none());
        assert!(state.map_view().is_none());
        assert!(state.export_map(Path::new("unused.html")).is_err());
    }

    #[test]
    fn weight_bound_narrows_rows() {
        let file = sheet();
        let mut state = AppState::new(DashboardConfig::default());
        state.open(file.path()).unwrap();

        state.criteria.max_weight = 15.0;
        state.refilter();
        assert_eq!(state.visible_indices, vec![0]);

        state.reset_filters();
        assert_eq!(state.visible_indices.len(), 3);
    }

    #[test]
    fn weight_bound_without_weight_column_keeps_rows() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(
            "Номер документа,Дата документа,День недели,Зона,\"Холдинг, контрагент\",группа,Сумма с НДС,lat,lon\n\
             1,2024-03-01,Пятница,Север,A,Г,10,55.0,37.0\n\
             2,2024-03-05,Вторник,Юг,C,Г,20,54.0,36.0\n"
                .as_bytes(),
        )
        .unwrap();
        let mut state = AppState::new(DashboardConfig::default());
        state.open(file.path()).unwrap();

        state.criteria.max_weight = 5.0;
        state.refilter();
        assert_eq!(state.visible_indices, vec![0, 1]);
        assert!(state.summary.unwrap().weight.is_none());

        let dir = tempfile::tempdir().unwrap();
        state.export_map(&dir.path().join("map.html")).unwrap();
    }

    #[test]
    fn failed_open_reports_status() {
        let mut state = AppState::new(DashboardConfig::default());
        state.open_or_report(Path::new("/nonexistent/visits.csv"));
        assert!(state.table.is_none());
        assert!(state.status_message.unwrap().starts_with("Error:"));
    }
}
