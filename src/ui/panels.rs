use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::filter::Selection;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(table) = state.table.clone() else {
        ui.label("No data loaded.");
        return;
    };

    if table.is_empty() {
        ui.label("The sheet has no readable rows.");
        return;
    }

    let before = state.criteria.clone();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.strong("📅 Weekday");
            selector(
                ui,
                "weekday",
                "All weekdays",
                table.weekdays.iter().map(String::as_str),
                &mut state.criteria.weekday,
            );
            ui.add_space(4.0);

            ui.strong("📍 Zone");
            selector(
                ui,
                "zone",
                "All zones",
                table.zones.iter().map(String::as_str),
                &mut state.criteria.zone,
            );
            ui.add_space(4.0);

            ui.strong("📆 Month");
            selector(
                ui,
                "month",
                "All months",
                table.months.iter().copied(),
                &mut state.criteria.month,
            );
            ui.add_space(4.0);

            if table.has_weight {
                ui.strong("⚖ Weight below");
                ui.horizontal(|ui: &mut Ui| {
                    ui.add(
                        egui::DragValue::new(&mut state.criteria.max_weight)
                            .range(0.0..=f64::MAX)
                            .speed(10.0)
                            .suffix(" kg"),
                    );
                    if state.criteria.max_weight > 0.0 && ui.small_button("✖").clicked() {
                        state.criteria.max_weight = 0.0;
                    }
                });
                ui.small("0 = no limit; visits without weight are hidden when set");
                ui.add_space(4.0);
            }

            ui.separator();
            ui.checkbox(&mut state.use_clusters, "🧲 Clustering");

            if ui.button("Reset filters").clicked() {
                state.criteria = Default::default();
            }

            ui.separator();
            ui.strong("Zones");
            for (zone, color) in state.zone_colors.legend_entries() {
                ui.label(RichText::new(format!("● {zone}")).color(color));
            }
        });

    if state.criteria != before {
        state.refilter();
    }
}

/// Dropdown with an "all" sentinel followed by every value.
fn selector<'a>(
    ui: &mut Ui,
    id: &str,
    all_label: &str,
    values: impl Iterator<Item = &'a str>,
    current: &mut Selection,
) {
    let text = |s: &Selection| match s {
        Selection::All => all_label.to_string(),
        Selection::Only(v) => v.clone(),
    };
    egui::ComboBox::from_id_salt(id)
        .selected_text(text(&*current))
        .width(ui.available_width())
        .show_ui(ui, |ui: &mut Ui| {
            for option in Selection::options(values) {
                let label = text(&option);
                ui.selectable_value(&mut *current, option, label);
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.source.is_some(), egui::Button::new("Reload"))
                .clicked()
            {
                state.reload();
                ui.close_menu();
            }
            if ui
                .add_enabled(state.markers.is_some(), egui::Button::new("Export map…"))
                .clicked()
            {
                export_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(table) = &state.table {
            ui.label(format!(
                "{} visits loaded, {} visible",
                table.len(),
                state.visible_indices.len()
            ));
        }

        if let Some(url) = &state.config.routes_url {
            ui.separator();
            ui.hyperlink_to("🗺 Route map", url);
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open visits sheet")
        .add_filter("Supported files", &["xlsx", "xlsm", "xls", "ods", "csv", "json", "parquet", "pq"])
        .add_filter("Excel / ODS", &["xlsx", "xlsm", "xls", "ods"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.open_or_report(&path);
    }
}

pub fn export_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export map page")
        .set_file_name("map.html")
        .add_filter("HTML", &["html"])
        .save_file();

    if let Some(path) = file {
        match state.export_map(&path) {
            Ok(()) => state.status_message = None,
            Err(e) => {
                log::error!("Failed to export map: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
