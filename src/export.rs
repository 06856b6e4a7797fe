use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use html_escape::encode_text;
use serde::Serialize;

use crate::config::{MapBackend, MapConfig};
use crate::data::markers::{MarkerDetail, MarkerSet};
use crate::data::model::{Visit, VisitTable};
use crate::format;

// ---------------------------------------------------------------------------
// Map page export: markers → self-contained HTML for a JS map widget
// ---------------------------------------------------------------------------

/// One placemark as the page script sees it.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MapPoint {
    pub lat: f64,
    pub lon: f64,
    /// Short markup shown on hover.
    pub hint: String,
    /// Markup shown when the marker is opened.
    pub balloon: String,
}

/// Everything the map widget needs: centre, zoom, clustering and points.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub center: [f64; 2],
    pub zoom: u8,
    pub clustering: bool,
    pub points: Vec<MapPoint>,
}

impl MapView {
    pub fn from_markers(table: &VisitTable, markers: &MarkerSet, zoom: u8, clustering: bool) -> Self {
        let points = markers
            .groups
            .iter()
            .map(|g| {
                let hint = encode_text(&format::marker_label(&g.label, table.has_weight)).into_owned();
                let balloon = match g.detail(table) {
                    MarkerDetail::Record(v) => record_html(v, table.has_weight),
                    listing => listing_html(&listing.visits(), table.has_weight),
                };
                MapPoint { lat: g.lat, lon: g.lon, hint, balloon }
            })
            .collect();

        Self {
            center: markers.center,
            zoom,
            clustering,
            points,
        }
    }
}

fn record_html(v: &Visit, with_weight: bool) -> String {
    let mut html = String::new();
    let mut field = |name: &str, value: &str| {
        let _ = write!(html, "<b>{name}:</b> {}<br>", encode_text(value));
    };
    field("Document", &v.document);
    field("Date", &v.date.date().to_string());
    field("Amount incl. VAT", &format::money(v.amount));
    if with_weight {
        field("Weight", &format::weight(v.weight));
    }
    field("Category", &v.category);
    field("Counterparty", &v.counterparty);
    field("Zone", &v.zone);
    html
}

fn listing_html(visits: &[&Visit], with_weight: bool) -> String {
    const TH: &str = "text-align:left;padding:6px 8px";
    let mut html = String::new();
    let _ = write!(
        html,
        "<div style=\"font-weight:600;margin-bottom:6px\">Visits to this point: {}</div>\
         <div style=\"max-height:260px;overflow:auto;border:1px solid #eee;border-radius:8px\">\
         <table style=\"border-collapse:collapse;width:100%;font-size:13px\">\
         <thead><tr style=\"background:#f7f7f7\">\
         <th style=\"{TH}\">Date</th><th style=\"{TH}\">Document</th>\
         <th style=\"text-align:right;padding:6px 8px\">Amount</th>",
        visits.len()
    );
    if with_weight {
        let _ = write!(html, "<th style=\"text-align:right;padding:6px 8px\">Weight</th>");
    }
    let _ = write!(
        html,
        "<th style=\"{TH}\">Category</th><th style=\"{TH}\">Counterparty</th>\
         <th style=\"{TH}\">Zone</th></tr></thead><tbody>"
    );

    for v in visits {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td style=\"text-align:right\">{}</td>",
            v.date.date(),
            encode_text(&v.document),
            format::money(v.amount)
        );
        if with_weight {
            let _ = write!(html, "<td style=\"text-align:right\">{}</td>", format::weight(v.weight));
        }
        let _ = write!(
            html,
            "<td>{}</td><td>{}</td><td>{}</td></tr>",
            encode_text(&v.category),
            encode_text(&v.counterparty),
            encode_text(&v.zone)
        );
    }
    html.push_str("</tbody></table></div>");
    html
}

// ---------------------------------------------------------------------------
// Page templates
// ---------------------------------------------------------------------------

/// Render the full HTML page for the configured backend.
pub fn render_page(view: &MapView, config: &MapConfig) -> Result<String> {
    let points = serde_json::to_string(&view.points).context("serialising map points")?;
    // Keep the JSON from closing the surrounding <script>.
    let points = points.replace("</", "<\\/");
    let [lat, lon] = view.center;

    let page = match config.backend {
        MapBackend::Yandex => {
            let key = config
                .yandex_api_key
                .as_deref()
                .map(|k| format!("apikey={}&", html_escape::encode_double_quoted_attribute(k)))
                .unwrap_or_default();
            YANDEX_TEMPLATE.replace("{{API_KEY}}", &key)
        }
        MapBackend::Leaflet => LEAFLET_TEMPLATE.to_string(),
    };

    Ok(page
        .replace("{{HEIGHT}}", &config.height_px.to_string())
        .replace("{{CENTER}}", &format!("[{lat}, {lon}]"))
        .replace("{{ZOOM}}", &view.zoom.to_string())
        .replace("{{USE_CLUSTERS}}", if view.clustering { "true" } else { "false" })
        .replace("{{POINTS}}", &points))
}

/// Write the page for `view` to `path`.
pub fn export_html(path: &Path, view: &MapView, config: &MapConfig) -> Result<()> {
    let page = render_page(view, config)?;
    std::fs::write(path, page).with_context(|| format!("writing map page {}", path.display()))?;
    log::info!(
        "Exported {} markers ({:?}, clustering: {}) to {}",
        view.points.len(),
        config.backend,
        view.clustering,
        path.display()
    );
    Ok(())
}

const YANDEX_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<script src="https://api-maps.yandex.ru/2.1/?{{API_KEY}}lang=ru_RU" type="text/javascript"></script>
<style>
  html, body, #map { width: 100%; height: {{HEIGHT}}px; margin: 0; padding: 0; }
</style>
</head>
<body>
<div id="map"></div>
<script>
  const CENTER = {{CENTER}};
  const USE_CLUSTERS = {{USE_CLUSTERS}};
  const POINTS = {{POINTS}};

  ymaps.ready(init);
  function init() {
    const map = new ymaps.Map('map', {
      center: CENTER,
      zoom: {{ZOOM}},
      controls: ['zoomControl', 'typeSelector', 'fullscreenControl']
    });

    const geoObjects = POINTS.map(p => new ymaps.Placemark(
      [p.lat, p.lon],
      { hintContent: p.hint, balloonContent: p.balloon },
      { preset: 'islands#blueIcon' }
    ));

    // Points are already one per coordinate.
    const container = USE_CLUSTERS
      ? new ymaps.Clusterer({
          preset: 'islands#invertedBlueClusterIcons',
          groupByCoordinates: false,
          clusterDisableClickZoom: false,
          clusterOpenBalloonOnClick: true,
          clusterBalloonContentLayout: 'cluster#balloonCarousel'
        })
      : new ymaps.GeoObjectCollection();
    geoObjects.forEach(go => container.add(go));
    map.geoObjects.add(container);
    if (geoObjects.length) {
      map.setBounds(container.getBounds(), { checkZoomRange: true, zoomMargin: 50 });
    }
  }
</script>
</body>
</html>
"#;

const LEAFLET_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
<link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.css" />
<link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.Default.css" />
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<script src="https://unpkg.com/leaflet.markercluster@1.5.3/dist/leaflet.markercluster.js"></script>
<style>
  html, body, #map { width: 100%; height: {{HEIGHT}}px; margin: 0; padding: 0; }
</style>
</head>
<body>
<div id="map"></div>
<script>
  const CENTER = {{CENTER}};
  const USE_CLUSTERS = {{USE_CLUSTERS}};
  const POINTS = {{POINTS}};

  const map = L.map('map').setView(CENTER, {{ZOOM}});
  L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
    maxZoom: 19,
    attribution: '&copy; OpenStreetMap contributors'
  }).addTo(map);

  const layer = USE_CLUSTERS ? L.markerClusterGroup() : L.featureGroup();
  POINTS.forEach(p => {
    L.marker([p.lat, p.lon])
      .bindTooltip(p.hint)
      .bindPopup(p.balloon, { maxWidth: 600 })
      .addTo(layer);
  });
  layer.addTo(map);
  if (POINTS.length) {
    map.fitBounds(layer.getBounds(), { padding: [50, 50] });
  }
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::markers::build_markers;
    use crate::data::test_support::{table, visit};

    fn fixture() -> (VisitTable, MarkerSet) {
        let t = table(vec![
            visit("A<1>", "2024-03-01", "Пт", "Север", 55.0, 37.0, Some(10.0), 1234.5),
            visit("B", "2024-03-10", "Вс", "Север", 55.0, 37.0, None, 10.0),
            visit("C", "2024-03-05", "Вт", "Юг", 54.0, 36.0, Some(20.0), 99.0),
        ]);
        let markers = build_markers(&t, &[0, 1, 2]).unwrap();
        (t, markers)
    }

    #[test]
    fn view_has_one_point_per_group() {
        let (t, markers) = fixture();
        let view = MapView::from_markers(&t, &markers, 7, true);
        assert_eq!(view.points.len(), 2);
        assert_eq!(view.center, markers.center);

        let repeated = &view.points[0];
        assert_eq!(repeated.hint, "visits: 2 (avg weight: 10.00 kg)");
        assert!(repeated.balloon.contains("Visits to this point: 2"));
        // Newest first, with escaped document numbers.
        let b = repeated.balloon.find("<td>B</td>").unwrap();
        let a = repeated.balloon.find("A&lt;1&gt;").unwrap();
        assert!(b < a);

        let single = &view.points[1];
        assert_eq!(single.hint, "Контрагент C | Март | Вт");
        assert!(single.balloon.contains("<b>Amount incl. VAT:</b> 99.00 ₽"));
        assert!(single.balloon.contains("<b>Weight:</b> 20.00 kg"));
    }

    #[test]
    fn yandex_page_embeds_points() {
        let (t, markers) = fixture();
        let view = MapView::from_markers(&t, &markers, 7, false);
        let config = MapConfig {
            yandex_api_key: Some("key-123".into()),
            ..MapConfig::default()
        };
        let page = render_page(&view, &config).unwrap();
        assert!(page.contains("api-maps.yandex.ru/2.1/?apikey=key-123&lang=ru_RU"));
        assert!(page.contains("const USE_CLUSTERS = false;"));
        assert!(page.contains("zoom: 7,"));
        assert!(!page.contains("{{"));
        assert!(!page.contains("</td>"), "closing tags must be escaped inside the script");
    }

    #[test]
    fn leaflet_page_uses_cluster_group() {
        let (t, markers) = fixture();
        let view = MapView::from_markers(&t, &markers, 9, true);
        let config = MapConfig { backend: MapBackend::Leaflet, ..MapConfig::default() };
        let page = render_page(&view, &config).unwrap();
        assert!(page.contains("L.markerClusterGroup()"));
        assert!(page.contains("const USE_CLUSTERS = true;"));
        assert!(page.contains("setView(CENTER, 9)"));
        assert!(!page.contains("{{"));
    }

    #[test]
    fn export_writes_file() {
        let (t, markers) = fixture();
        let view = MapView::from_markers(&t, &markers, 7, true);
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("map.html");
        export_html(&out, &view, &MapConfig::default()).unwrap();
        let written = std::fs::read_to_string(out).unwrap();
        assert!(written.starts_with("<!DOCTYPE html>"));
    }
}
