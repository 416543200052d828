use std::time::Duration;

use eframe::egui;

use crate::state::AppState;
use crate::ui::{dialogs, panels, plot, table};
use crate::windows::WindowBody;

/// Offset between stacked sub-windows.
const CASCADE_STEP: f32 = 28.0;

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct FishXApp {
    pub state: AppState,
}

impl FishXApp {
    /// Starts with the Open-file dialog showing.
    pub fn new(state: AppState) -> Self {
        let mut app = Self { state };
        app.state.show_open_dialog();
        app
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let modal_open = self.state.open_dialog.is_some()
            || self.state.save_dialog.is_some()
            || self.state.overlay_dialog.is_some()
            || !self.state.notifications.is_empty();

        if ctx.input_mut(|i| i.consume_shortcut(&panels::FULLSCREEN_SHORTCUT)) {
            panels::toggle_fullscreen(ctx);
        }
        if modal_open {
            return;
        }
        if ctx.input_mut(|i| i.consume_shortcut(&panels::OPEN_SHORTCUT)) {
            self.state.show_open_dialog();
        }
        if ctx.input_mut(|i| i.consume_shortcut(&panels::EXIT_SHORTCUT)) {
            self.state.exit_prompt = true;
        }
    }

    /// Every table and plot as a floating window inside `area`.
    fn sub_windows(&mut self, ctx: &egui::Context, area: egui::Rect) {
        let cascade = std::mem::take(&mut self.state.cascade_requested);
        let mut plot_requests = Vec::new();

        for (i, record) in self.state.windows.iter_mut().enumerate() {
            let offset = CASCADE_STEP * (i % 12) as f32;
            let mut window = egui::Window::new(record.title.as_str())
                .id(egui::Id::new(("sub_window", record.kind().label(), record.id)))
                .open(&mut record.open)
                .constrain_to(area)
                .default_pos(area.min + egui::vec2(offset, offset))
                .default_size([360.0, 420.0])
                .resizable(true);
            if cascade {
                window = window.current_pos(area.min + egui::vec2(offset, offset));
            }

            let title = record.title.clone();
            let id = record.id;
            match &mut record.body {
                WindowBody::Table(view) => {
                    window.show(ctx, |ui| {
                        if table::table_view(ui, id, view) {
                            plot_requests.push(title.clone());
                        }
                    });
                }
                WindowBody::Plot(view) => {
                    window.show(ctx, |ui| plot::plot_view(ui, id, view));
                }
            }
        }

        self.state.windows.retain_open();
        for title in plot_requests {
            self.state.plot_table(&title);
        }
    }
}

impl Default for FishXApp {
    fn default() -> Self {
        Self::new(AppState::default())
    }
}

impl eframe::App for FishXApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.viewport().close_requested()) && !self.state.exit_confirmed {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.state.exit_prompt = true;
        }

        self.handle_shortcuts(ctx);

        self.state.poll_imports();
        if self.state.is_loading() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }

        // ---- Top panel: menu bar and toolbar ----
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            panels::menu_bar(ui, &mut self.state);
        });
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            panels::toolbar(ui, &mut self.state);
        });

        // ---- Central area: sub-windows ----
        let area = egui::CentralPanel::default()
            .show(ctx, |ui| {
                if self.state.windows.is_empty() {
                    ui.centered_and_justified(|ui| {
                        ui.weak("Open a scan to get started  (File → Open file)");
                    });
                }
                ui.max_rect()
            })
            .inner;
        self.sub_windows(ctx, area);

        // ---- Dialogs, notifications last so they stack on top ----
        dialogs::open_file_dialog(ctx, &mut self.state);
        dialogs::save_dialog(ctx, &mut self.state);
        dialogs::overlay_dialog(ctx, &mut self.state);
        dialogs::about_dialog(ctx, &mut self.state);
        dialogs::exit_prompt(ctx, &mut self.state);
        dialogs::notifications(ctx, &mut self.state);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        let joined = self.state.shutdown();
        if joined > 0 {
            log::info!("Joined {joined} running import(s) on exit");
        }
    }
}
