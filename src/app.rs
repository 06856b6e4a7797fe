use eframe::egui;

use crate::state::AppState;
use crate::ui::{detail, map, panels, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct ZoneMapApp {
    pub state: AppState,
}

impl ZoneMapApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for ZoneMapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Bottom panel: totals and table (skipped when nothing matches) ----
        if self.state.summary.is_some() {
            egui::TopBottomPanel::bottom("table_panel")
                .resizable(true)
                .default_height(280.0)
                .show(ctx, |ui| {
                    table::summary_and_table(ui, &self.state);
                });
        }

        // ---- Central panel: map ----
        egui::CentralPanel::default().show(ctx, |ui| {
            map::map_plot(ui, &mut self.state);
        });

        detail::marker_window(ctx, &mut self.state);
    }
}
