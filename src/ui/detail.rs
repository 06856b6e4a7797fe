use eframe::egui::{self, Grid, RichText, ScrollArea, Ui};

use crate::data::markers::MarkerDetail;
use crate::format;
use crate::state::AppState;

/// Window with the full content of the clicked marker.
pub fn marker_window(ctx: &egui::Context, state: &mut AppState) {
    let Some(index) = state.selected_marker else {
        return;
    };
    let (Some(table), Some(markers)) = (&state.table, &state.markers) else {
        return;
    };
    let Some(group) = markers.groups.get(index) else {
        state.selected_marker = None;
        return;
    };

    let mut open = true;
    let title = format::marker_label(&group.label, table.has_weight);
    egui::Window::new(title)
        .id(egui::Id::new("marker_detail"))
        .open(&mut open)
        .resizable(true)
        .default_width(560.0)
        .show(ctx, |ui: &mut Ui| match group.detail(table) {
            MarkerDetail::Record(v) => {
                Grid::new("record").num_columns(2).striped(true).show(ui, |ui: &mut Ui| {
                    let mut row = |name: &str, value: String| {
                        ui.strong(name);
                        ui.label(value);
                        ui.end_row();
                    };
                    row("Document", v.document.clone());
                    row("Date", v.date.date().to_string());
                    row("Amount incl. VAT", format::money(v.amount));
                    if table.has_weight {
                        row("Weight", format::weight(v.weight));
                    }
                    row("Category", v.category.clone());
                    row("Counterparty", v.counterparty.clone());
                    row("Zone", v.zone.clone());
                });
            }
            listing => {
                let visits = listing.visits();
                ui.label(RichText::new(format!("Visits to this point: {}", visits.len())).strong());
                ScrollArea::vertical().max_height(320.0).show(ui, |ui: &mut Ui| {
                    Grid::new("listing").striped(true).show(ui, |ui: &mut Ui| {
                        for header in ["Date", "Document", "Amount"] {
                            ui.strong(header);
                        }
                        if table.has_weight {
                            ui.strong("Weight");
                        }
                        for header in ["Category", "Counterparty", "Zone"] {
                            ui.strong(header);
                        }
                        ui.end_row();

                        for v in visits {
                            ui.label(v.date.date().to_string());
                            ui.label(v.document.as_str());
                            ui.label(format::money(v.amount));
                            if table.has_weight {
                                ui.label(format::weight(v.weight));
                            }
                            ui.label(v.category.as_str());
                            ui.label(v.counterparty.as_str());
                            ui.label(v.zone.as_str());
                            ui.end_row();
                        }
                    });
                });
            }
        });

    if !open {
        state.selected_marker = None;
    }
}
