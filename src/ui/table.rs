use eframe::egui::{self, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::table::{SelectMode, ANGLE_COLUMN, INTENSITY_COLUMN};
use crate::windows::TableView;

const ROW_HEIGHT: f32 = 20.0;

/// Render a table sub-window. Returns `true` when "Plot" was chosen.
pub fn table_view(ui: &mut Ui, id: u64, view: &mut TableView) -> bool {
    let mut plot_requested = false;
    let data = &mut view.data;

    ui.horizontal(|ui: &mut Ui| {
        if ui.button("Plot").clicked() {
            plot_requested = true;
        }
        let selected = data.selected_rows().count();
        if selected > 0 {
            ui.label(format!("{selected} of {} rows selected", data.len()));
            if ui.small_button("Clear").clicked() {
                data.clear_selection();
            }
        } else {
            ui.label(format!("{} rows", data.len()));
        }
    });
    ui.separator();

    if data.is_empty() {
        ui.weak("No rows");
        return plot_requested;
    }

    let modifiers = ui.input(|i| i.modifiers);
    let mode = if modifiers.shift {
        SelectMode::Range
    } else if modifiers.command {
        SelectMode::Toggle
    } else {
        SelectMode::Replace
    };

    TableBuilder::new(ui)
        .id_salt(("table_view", id))
        .striped(true)
        .column(Column::auto().at_least(40.0)) // Row number
        .column(Column::initial(110.0).resizable(true)) // 2θ
        .column(Column::remainder()) // Intensity
        .header(ROW_HEIGHT, |mut header| {
            header.col(|ui| {
                ui.label("");
            });
            header.col(|ui| {
                ui.strong(ANGLE_COLUMN);
            });
            header.col(|ui| {
                ui.strong(INTENSITY_COLUMN);
            });
        })
        .body(|body| {
            body.rows(ROW_HEIGHT, data.len(), |mut row| {
                let i = row.index();
                let selected = data.is_selected(i);
                row.set_selected(selected);

                row.col(|ui| {
                    let text = RichText::new((i + 1).to_string()).weak();
                    let number = ui.selectable_label(selected, text);
                    if number.clicked() {
                        data.click(i, mode);
                    }
                    number.context_menu(|ui: &mut Ui| {
                        if !data.is_selected(i) {
                            data.click(i, SelectMode::Replace);
                        }
                        if ui.button("Plot").clicked() {
                            plot_requested = true;
                            ui.close_menu();
                        }
                    });
                });
                for cell in data.rows[i].iter_mut() {
                    row.col(|ui| {
                        ui.add(egui::TextEdit::singleline(cell).frame(false));
                    });
                }
            });
        });

    plot_requested
}
