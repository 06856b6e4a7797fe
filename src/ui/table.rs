use eframe::egui::{self, Ui};
use egui_extras::{Column, TableBuilder};

use crate::format;
use crate::state::AppState;

const ROW_HEIGHT: f32 = 18.0;

/// Aggregates for the visible rows, followed by the rows themselves sorted by
/// amount. Nothing is drawn when no rows pass the filters.
pub fn summary_and_table(ui: &mut Ui, state: &AppState) {
    let (Some(table), Some(summary)) = (&state.table, &state.summary) else {
        return;
    };

    ui.heading("📊 Filter totals");
    ui.horizontal_wrapped(|ui: &mut Ui| {
        ui.label(format!("Documents: {}", summary.documents));
        ui.separator();
        ui.label(format!("Amount incl. VAT: {}", format::money(summary.amount)));
        if let Some(w) = summary.weight {
            ui.separator();
            ui.label(format!("Total weight: {}", format::weight(Some(w.sum))));
            ui.separator();
            ui.label(format!(
                "Average weight: {} ({} weighed)",
                format::weight(Some(w.mean)),
                w.weighed
            ));
        }
    });
    ui.separator();

    ui.heading("📋 Filtered visits");
    let columns = &table.display_columns;
    egui::ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .columns(Column::auto().at_least(60.0).clip(true), columns.len())
            .min_scrolled_height(0.0)
            .header(ROW_HEIGHT + 4.0, |mut header| {
                for column in columns {
                    header.col(|ui: &mut Ui| {
                        ui.strong(column.name());
                    });
                }
            })
            .body(|body| {
                body.rows(ROW_HEIGHT, state.table_rows.len(), |mut row| {
                    let visit = &table.visits[state.table_rows[row.index()]];
                    for column in columns {
                        row.col(|ui: &mut Ui| {
                            ui.label(column.cell_text(visit));
                        });
                    }
                });
            });
    });
}
