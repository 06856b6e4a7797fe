use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Dashboard configuration
// ---------------------------------------------------------------------------

/// Runtime configuration: defaults, then an optional JSON file, then
/// environment overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Sheet opened at startup when no file is given on the command line.
    pub data_path: Option<PathBuf>,
    pub columns: ColumnConfig,
    pub map: MapConfig,
    /// Externally hosted route map, shown as a plain link.
    pub routes_url: Option<String>,
}

/// Names of the source columns. Presence of the weight column is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub date: String,
    pub weekday: String,
    pub zone: String,
    pub counterparty: String,
    pub category: String,
    pub document: String,
    pub amount: String,
    pub lat: String,
    pub lon: String,
    pub weight: Option<String>,
    /// Name of the derived month column in the table view.
    pub month: String,
    /// Name of the derived numeric weight column in the table view.
    pub weight_numeric: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            date: "Дата документа".into(),
            weekday: "День недели".into(),
            zone: "Зона".into(),
            counterparty: "Холдинг, контрагент".into(),
            category: "группа".into(),
            document: "Номер документа".into(),
            amount: "Сумма с НДС".into(),
            lat: "lat".into(),
            lon: "lon".into(),
            weight: Some("Вес".into()),
            month: "Месяц".into(),
            weight_numeric: "Вес, кг".into(),
        }
    }
}

/// Which JS widget the exported page embeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MapBackend {
    #[default]
    Yandex,
    Leaflet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub zoom: u8,
    pub clustering: bool,
    pub backend: MapBackend,
    pub yandex_api_key: Option<String>,
    pub height_px: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            zoom: 7,
            clustering: true,
            backend: MapBackend::Yandex,
            yandex_api_key: None,
            height_px: 600,
        }
    }
}

impl DashboardConfig {
    /// Build the configuration from an optional JSON file plus environment.
    ///
    /// Recognised variables: `ZONE_MAP_DATA`, `ZONE_MAP_ROUTES_URL`,
    /// `YANDEX_MAPS_API_KEY`, `ZONE_MAP_WEIGHT_COLUMN` (empty disables weight).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(data) = var("ZONE_MAP_DATA") {
            self.data_path = Some(PathBuf::from(data));
        }
        if let Some(url) = var("ZONE_MAP_ROUTES_URL") {
            self.routes_url = Some(url);
        }
        if let Some(key) = var("YANDEX_MAPS_API_KEY") {
            self.map.yandex_api_key = Some(key);
        }
        if let Some(col) = var("ZONE_MAP_WEIGHT_COLUMN") {
            self.columns.weight = if col.trim().is_empty() { None } else { Some(col) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"columns": {{"zone": "Region"}}, "map": {{"backend": "leaflet"}}}}"#
        )
        .unwrap();

        let config = DashboardConfig::from_file(file.path()).unwrap();
        assert_eq!(config.columns.zone, "Region");
        assert_eq!(config.columns.lat, "lat");
        assert_eq!(config.map.backend, MapBackend::Leaflet);
        assert_eq!(config.map.zoom, 7);
        assert!(config.map.clustering);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = DashboardConfig::default();
        config.apply_env(|key| match key {
            "ZONE_MAP_ROUTES_URL" => Some("https://example.org/routes".into()),
            "ZONE_MAP_WEIGHT_COLUMN" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.routes_url.as_deref(), Some("https://example.org/routes"));
        assert_eq!(config.columns.weight, None);
        assert_eq!(config.data_path, None);
    }

    #[test]
    fn missing_file_names_path() {
        let err = DashboardConfig::from_file(Path::new("/nonexistent/zone-map.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/zone-map.json"));
    }
}
