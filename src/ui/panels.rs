use eframe::egui::{self, Key, KeyboardShortcut, Modifiers, RichText, Ui};

use crate::state::AppState;
use crate::ui::dialogs::SavePattern;

pub const OPEN_SHORTCUT: KeyboardShortcut = KeyboardShortcut::new(Modifiers::COMMAND, Key::O);
pub const EXIT_SHORTCUT: KeyboardShortcut = KeyboardShortcut::new(Modifiers::COMMAND, Key::Q);
pub const FULLSCREEN_SHORTCUT: KeyboardShortcut = KeyboardShortcut::new(Modifiers::NONE, Key::F11);

/// Flip the main window between full screen and windowed.
pub fn toggle_fullscreen(ctx: &egui::Context) {
    let fullscreen = ctx.input(|i| i.viewport().fullscreen.unwrap_or(false));
    ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(!fullscreen));
}

// ---------------------------------------------------------------------------
// Menu bar
// ---------------------------------------------------------------------------

pub fn menu_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        let ctx = ui.ctx().clone();

        ui.menu_button("File", |ui: &mut Ui| {
            let open = egui::Button::new("Open file")
                .shortcut_text(ctx.format_shortcut(&OPEN_SHORTCUT));
            if ui.add(open).clicked() {
                state.show_open_dialog();
                ui.close_menu();
            }
            ui.separator();
            let exit =
                egui::Button::new("Exit").shortcut_text(ctx.format_shortcut(&EXIT_SHORTCUT));
            if ui.add(exit).clicked() {
                state.exit_prompt = true;
                ui.close_menu();
            }
        });

        ui.menu_button("Table", |ui: &mut Ui| {
            save_buttons(
                ui,
                state,
                &[
                    (SavePattern::Table, "Save table"),
                    (SavePattern::Tables, "Save tables"),
                ],
            );
        });

        ui.menu_button("Plot", |ui: &mut Ui| {
            save_buttons(
                ui,
                state,
                &[
                    (SavePattern::Plot, "Save plot"),
                    (SavePattern::Plots, "Save plots"),
                ],
            );
            ui.separator();
            if ui.button("Overlay tables").clicked() {
                state.show_overlay_dialog();
                ui.close_menu();
            }
        });

        ui.menu_button("Window", |ui: &mut Ui| {
            let full = egui::Button::new("Full screen")
                .shortcut_text(ctx.format_shortcut(&FULLSCREEN_SHORTCUT));
            if ui.add(full).clicked() {
                toggle_fullscreen(&ctx);
                ui.close_menu();
            }
            if ui.button("Cascade").clicked() {
                state.cascade_requested = true;
                ui.close_menu();
            }
        });

        ui.menu_button("Help", |ui: &mut Ui| {
            if ui.button("About program").clicked() {
                state.about_open = true;
                ui.close_menu();
            }
        });
    });
}

fn save_buttons(ui: &mut Ui, state: &mut AppState, items: &[(SavePattern, &str)]) {
    for &(pattern, label) in items {
        if ui.button(label).clicked() {
            state.show_save_dialog(pattern);
            ui.close_menu();
        }
    }
}

// ---------------------------------------------------------------------------
// Toolbar
// ---------------------------------------------------------------------------

/// Open plus the four save actions, and the loading indicator.
pub fn toolbar(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        if ui.button("📂").on_hover_text("Open file").clicked() {
            state.show_open_dialog();
        }
        ui.separator();
        let actions = [
            ("💾 Table", "Save table", SavePattern::Table),
            ("💾 Tables", "Save tables", SavePattern::Tables),
            ("💾 Plot", "Save plot", SavePattern::Plot),
            ("💾 Plots", "Save plots", SavePattern::Plots),
        ];
        for (text, hover, pattern) in actions {
            if ui.button(text).on_hover_text(hover).clicked() {
                state.show_save_dialog(pattern);
            }
        }

        ui.separator();
        ui.label(format!("{} window(s)", state.windows.len()));

        if state.is_loading() {
            ui.separator();
            ui.spinner();
            let files: Vec<String> = state
                .imports
                .iter()
                .map(|task| task.path().display().to_string())
                .collect();
            ui.label(RichText::new(format!("Loading {} file(s)…", files.len())).italics())
                .on_hover_text(files.join("\n"));
        }
    });
}
