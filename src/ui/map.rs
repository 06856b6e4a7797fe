use std::collections::{BTreeMap, HashMap};

use eframe::egui::{Color32, RichText, Ui};
use egui_plot::{MarkerShape, Plot, PlotPoint, PlotPoints, Points, Text};

use crate::format;
use crate::state::AppState;

/// Grid cells across the visible width used for visual clustering.
const CLUSTER_CELLS: f64 = 24.0;

/// Hover/click radius around a marker, in pixels.
const PICK_RADIUS: f32 = 10.0;

// ---------------------------------------------------------------------------
// Visual clustering (presentation only)
// ---------------------------------------------------------------------------

/// Markers that fall into one grid cell of the current view.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Mean position of the members, `[lon, lat]`.
    pub position: [f64; 2],
    /// Indices into the marker list.
    pub members: Vec<usize>,
}

/// Bucket `[lon, lat]` positions into a grid of `cells` columns over the
/// visible bounds. Cells with one marker come back as single-member clusters.
pub fn cluster_positions(positions: &[[f64; 2]], min: [f64; 2], max: [f64; 2], cells: f64) -> Vec<Cluster> {
    let cell_w = ((max[0] - min[0]) / cells).max(f64::EPSILON);
    let cell_h = ((max[1] - min[1]) / cells).max(f64::EPSILON);

    let mut buckets: BTreeMap<(i64, i64), Vec<usize>> = BTreeMap::new();
    for (i, p) in positions.iter().enumerate() {
        let key = (
            ((p[0] - min[0]) / cell_w).floor() as i64,
            ((p[1] - min[1]) / cell_h).floor() as i64,
        );
        buckets.entry(key).or_default().push(i);
    }

    buckets
        .into_values()
        .map(|members| {
            let n = members.len() as f64;
            let (x, y) = members
                .iter()
                .fold((0.0, 0.0), |(x, y), &i| (x + positions[i][0], y + positions[i][1]));
            Cluster {
                position: [x / n, y / n],
                members,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Map plot (central panel)
// ---------------------------------------------------------------------------

/// Render the marker map in the central panel.
pub fn map_plot(ui: &mut Ui, state: &mut AppState) {
    let Some(table) = state.table.clone() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a sheet to view visits  (File → Open…)");
        });
        return;
    };
    let Some(markers) = &state.markers else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading(RichText::new("No data for the selected filters.").color(Color32::YELLOW));
        });
        return;
    };

    let center_lat = markers.center[0];
    // A degree of longitude shrinks with latitude.
    let aspect = 1.0 / center_lat.to_radians().cos().max(0.1);
    let positions: Vec<[f64; 2]> = markers.groups.iter().map(|g| [g.lon, g.lat]).collect();
    let use_clusters = state.use_clusters;
    let zone_colors = &state.zone_colors;

    let response = Plot::new("visit_map")
        .legend(egui_plot::Legend::default())
        .x_axis_label("Longitude")
        .y_axis_label("Latitude")
        .data_aspect(aspect as f32)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            let bounds = plot_ui.plot_bounds();
            let clusters = if use_clusters {
                cluster_positions(&positions, bounds.min(), bounds.max(), CLUSTER_CELLS)
            } else {
                (0..positions.len())
                    .map(|i| Cluster { position: positions[i], members: vec![i] })
                    .collect()
            };

            // One series per zone so the legend doubles as a zone key.
            let mut by_zone: HashMap<&str, Vec<[f64; 2]>> = HashMap::new();
            let mut grouped: Vec<[f64; 2]> = Vec::new();
            for cluster in &clusters {
                match cluster.members.as_slice() {
                    [only] => {
                        let group = &markers.groups[*only];
                        let zone = table.visits[group.rows[0]].zone.as_str();
                        by_zone.entry(zone).or_default().push(positions[*only]);
                    }
                    members => {
                        grouped.push(cluster.position);
                        let visits: usize = members.iter().map(|&m| markers.groups[m].len()).sum();
                        plot_ui.text(
                            Text::new(
                                PlotPoint::new(cluster.position[0], cluster.position[1]),
                                RichText::new(visits.to_string()).strong().color(Color32::WHITE),
                            )
                            .name("Clusters"),
                        );
                    }
                }
            }

            let mut zones: Vec<_> = by_zone.into_iter().collect();
            zones.sort_by(|a, b| a.0.cmp(b.0));
            for (zone, points) in zones {
                plot_ui.points(
                    Points::new(PlotPoints::from(points))
                        .name(zone)
                        .color(zone_colors.color_for(zone))
                        .shape(MarkerShape::Circle)
                        .filled(true)
                        .radius(5.0),
                );
            }
            if !grouped.is_empty() {
                plot_ui.points(
                    Points::new(PlotPoints::from(grouped))
                        .name("Clusters")
                        .color(Color32::from_rgb(30, 98, 200))
                        .shape(MarkerShape::Circle)
                        .filled(true)
                        .radius(14.0),
                );
            }

            // Nearest cluster under the pointer, in screen space.
            let pointer = plot_ui.response().hover_pos()?;
            clusters
                .into_iter()
                .map(|c| {
                    let screen = plot_ui.screen_from_plot(PlotPoint::new(c.position[0], c.position[1]));
                    (screen.distance(pointer), c)
                })
                .filter(|(d, c)| *d <= if c.members.len() > 1 { PICK_RADIUS * 1.6 } else { PICK_RADIUS })
                .min_by(|a, b| a.0.total_cmp(&b.0))
                .map(|(_, c)| c)
        });

    let Some(hovered) = response.inner else {
        return;
    };
    let clicked = response.response.clicked();
    let hint = match hovered.members.as_slice() {
        [only] => format::marker_label(&markers.groups[*only].label, table.has_weight),
        members => {
            let visits: usize = members.iter().map(|&m| markers.groups[m].len()).sum();
            format!("{} points, {visits} visits (zoom in to separate)", members.len())
        }
    };
    if clicked {
        if let [only] = hovered.members.as_slice() {
            state.selected_marker = Some(*only);
        }
    }
    response.response.on_hover_text(hint);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearby_positions_share_a_cell() {
        let positions = [[37.0, 55.0], [37.01, 55.01], [39.0, 57.0]];
        let clusters = cluster_positions(&positions, [36.0, 54.0], [40.0, 58.0], 4.0);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members, vec![0, 1]);
        assert_eq!(clusters[1].members, vec![2]);
        assert!((clusters[0].position[0] - 37.005).abs() < 1e-9);
    }

    #[test]
    fn every_marker_lands_in_one_cluster() {
        let positions: Vec<[f64; 2]> = (0..50).map(|i| [i as f64 * 0.1, (i % 7) as f64]).collect();
        let clusters = cluster_positions(&positions, [0.0, 0.0], [5.0, 7.0], 10.0);
        let mut members: Vec<usize> = clusters.into_iter().flat_map(|c| c.members).collect();
        members.sort_unstable();
        assert_eq!(members, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn degenerate_bounds_do_not_divide_by_zero() {
        let positions = [[37.0, 55.0], [37.0, 55.0]];
        let clusters = cluster_positions(&positions, [37.0, 55.0], [37.0, 55.0], 24.0);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members.len(), 2);
    }
}
