use std::path::{Path, PathBuf};

use eframe::egui::{self, Color32, RichText, Ui};
use thiserror::Error;

use crate::data::export::{PlotFormat, TableFormat};
use crate::data::import::ImportRequest;
use crate::data::model::{CalibrationParameters, Delimiter};
use crate::settings::{OpenFileSettings, SaveSettings};
use crate::state::{AppState, Level, Notification};

/// Why a dialog refuses to close.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("The \"{0}\" field cannot be empty")]
    EmptyField(&'static str),
    #[error("The \"{field}\" field must be a number, got \"{text}\"")]
    NotANumber { field: &'static str, text: String },
    #[error("No {0} to save")]
    NoWindows(&'static str),
    #[error("Select at least one {0}")]
    NothingSelected(&'static str),
}

// ---------------------------------------------------------------------------
// Open file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct OpenFileDialog {
    pub file: String,
    pub two_theta_start: String,
    pub two_theta_end: String,
    pub delimiter: Delimiter,
}

impl OpenFileDialog {
    pub fn from_settings(s: &OpenFileSettings) -> Self {
        Self {
            file: s.file.clone(),
            two_theta_start: s.two_theta_start.clone(),
            two_theta_end: s.two_theta_end.clone(),
            delimiter: s.delimiter,
        }
    }

    pub fn to_settings(&self) -> OpenFileSettings {
        OpenFileSettings {
            file: self.file.clone(),
            delimiter: self.delimiter,
            two_theta_start: self.two_theta_start.clone(),
            two_theta_end: self.two_theta_end.clone(),
        }
    }

    /// Check the fields in dialog order and build the import request.
    pub fn validate(&self) -> Result<ImportRequest, InputError> {
        if self.file.trim().is_empty() {
            return Err(InputError::EmptyField("File"));
        }
        let min_angle = parse_bound(&self.two_theta_start, "2θ start")?;
        let max_angle = parse_bound(&self.two_theta_end, "2θ end")?;
        Ok(ImportRequest {
            path: PathBuf::from(self.file.trim()),
            delimiter: self.delimiter,
            params: CalibrationParameters::new(min_angle, max_angle),
        })
    }
}

/// Browse filters, in picker order. The first one is preselected.
pub const OPEN_FILTERS: [(&str, &[&str]); 4] = [
    ("All files", &["*"]),
    ("Scan files", &["csv", "txt", "dat"]),
    ("CSV files", &["csv"]),
    ("Text files", &["txt"]),
];

fn parse_bound(text: &str, field: &'static str) -> Result<f64, InputError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(InputError::EmptyField(field));
    }
    text.parse().map_err(|_| InputError::NotANumber {
        field,
        text: text.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Save
// ---------------------------------------------------------------------------

/// Which of the four save actions opened the dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePattern {
    Table,
    Tables,
    Plot,
    Plots,
}

impl SavePattern {
    fn noun(self) -> &'static str {
        match self {
            SavePattern::Table => "table",
            SavePattern::Tables => "tables",
            SavePattern::Plot => "plot",
            SavePattern::Plots => "plots",
        }
    }

    fn is_batch(self) -> bool {
        matches!(self, SavePattern::Tables | SavePattern::Plots)
    }

    fn is_table(self) -> bool {
        matches!(self, SavePattern::Table | SavePattern::Tables)
    }
}

/// What an accepted save dialog asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveAction {
    Single { title: String, path: PathBuf },
    Batch {
        titles: Vec<String>,
        dir: PathBuf,
        extension: String,
    },
}

#[derive(Debug, Clone)]
pub struct SaveDialog {
    pub pattern: SavePattern,
    pub path: String,
    pub file_name: String,
    pub format: usize,
    /// Window titles of the matching kind.
    pub candidates: Vec<String>,
    /// Combo choice for single saves.
    pub chosen: usize,
    /// Check boxes for batch saves, parallel to `candidates`.
    pub checked: Vec<bool>,
}

impl SaveDialog {
    pub fn new(pattern: SavePattern, candidates: Vec<String>, s: &SaveSettings) -> Self {
        let format = if pattern.is_table() {
            s.format_table.min(TableFormat::ALL.len() - 1)
        } else {
            s.format_plot.min(PlotFormat::ALL.len() - 1)
        };
        Self {
            pattern,
            path: s.path.clone(),
            file_name: s.file_name.clone(),
            format,
            checked: vec![false; candidates.len()],
            candidates,
            chosen: 0,
        }
    }

    pub fn title(&self) -> String {
        format!("Save {}", self.pattern.noun())
    }

    fn format_labels(&self) -> Vec<&'static str> {
        if self.pattern.is_table() {
            TableFormat::ALL.iter().map(|f| f.label()).collect()
        } else {
            PlotFormat::ALL.iter().map(|f| f.label()).collect()
        }
    }

    fn extension(&self) -> &'static str {
        if self.pattern.is_table() {
            TableFormat::from_index(self.format).extension()
        } else {
            PlotFormat::from_index(self.format).extension()
        }
    }

    /// Write back the fields this pattern shows.
    pub fn apply_to(&self, s: &mut SaveSettings) {
        s.path = self.path.clone();
        if self.pattern.is_table() {
            s.format_table = self.format;
        } else {
            s.format_plot = self.format;
        }
        if !self.pattern.is_batch() {
            s.file_name = self.file_name.clone();
        }
    }

    pub fn validate(&self) -> Result<SaveAction, InputError> {
        let kind = if self.pattern.is_table() { "tables" } else { "plots" };
        if self.candidates.is_empty() {
            return Err(InputError::NoWindows(kind));
        }
        if self.path.trim().is_empty() {
            return Err(InputError::EmptyField("Path"));
        }
        let dir = PathBuf::from(self.path.trim());

        if self.pattern.is_batch() {
            let titles: Vec<String> = self
                .candidates
                .iter()
                .zip(&self.checked)
                .filter(|(_, checked)| **checked)
                .map(|(t, _)| t.clone())
                .collect();
            if titles.is_empty() {
                return Err(InputError::NothingSelected(self.pattern.noun().trim_end_matches('s')));
            }
            Ok(SaveAction::Batch {
                titles,
                dir,
                extension: self.extension().to_string(),
            })
        } else {
            if self.file_name.trim().is_empty() {
                return Err(InputError::EmptyField("Name"));
            }
            let title = self
                .candidates
                .get(self.chosen)
                .or(self.candidates.first())
                .cloned()
                .ok_or(InputError::NoWindows(kind))?;
            Ok(SaveAction::Single {
                title,
                path: dir.join(format!("{}.{}", self.file_name.trim(), self.extension())),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Overlay
// ---------------------------------------------------------------------------

/// Picks the tables drawn together in one plot window.
#[derive(Debug, Clone)]
pub struct OverlayDialog {
    pub candidates: Vec<String>,
    pub checked: Vec<bool>,
}

impl OverlayDialog {
    /// All tables start checked.
    pub fn new(candidates: Vec<String>) -> Self {
        Self {
            checked: vec![true; candidates.len()],
            candidates,
        }
    }

    pub fn validate(&self) -> Result<Vec<String>, InputError> {
        let titles: Vec<String> = self
            .candidates
            .iter()
            .zip(&self.checked)
            .filter(|(_, checked)| **checked)
            .map(|(t, _)| t.clone())
            .collect();
        if titles.is_empty() {
            return Err(InputError::NothingSelected("table"));
        }
        Ok(titles)
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

enum Choice {
    Ok,
    Cancel,
}

fn ok_cancel(ui: &mut Ui) -> Option<Choice> {
    let mut choice = None;
    ui.separator();
    ui.horizontal(|ui: &mut Ui| {
        if ui.button("OK").clicked() {
            choice = Some(Choice::Ok);
        }
        if ui.button("Cancel").clicked() {
            choice = Some(Choice::Cancel);
        }
    });
    choice
}

fn parent_dir(text: &str) -> Option<PathBuf> {
    let path = Path::new(text.trim());
    if path.is_dir() {
        return Some(path.to_path_buf());
    }
    path.parent()
        .filter(|p| p.is_dir())
        .map(Path::to_path_buf)
}

/// Render the Open-file dialog; starts the import on OK.
pub fn open_file_dialog(ctx: &egui::Context, state: &mut AppState) {
    let Some(dialog) = state.open_dialog.as_mut() else {
        return;
    };

    let mut choice = None;
    let modal = egui::Modal::new(egui::Id::new("open_file_dialog")).show(ctx, |ui: &mut Ui| {
        ui.set_width(450.0);
        ui.heading("Open file");
        ui.add_space(8.0);

        egui::Grid::new("open_file_grid")
            .num_columns(2)
            .spacing([8.0, 8.0])
            .show(ui, |ui: &mut Ui| {
                ui.label("File:");
                ui.horizontal(|ui: &mut Ui| {
                    ui.add(egui::TextEdit::singleline(&mut dialog.file).desired_width(300.0));
                    if ui.button("Open").clicked() {
                        let mut picker = rfd::FileDialog::new().set_title("Open file");
                        for (name, extensions) in OPEN_FILTERS {
                            picker = picker.add_filter(name, extensions);
                        }
                        if let Some(dir) = parent_dir(&dialog.file) {
                            picker = picker.set_directory(dir);
                        }
                        if let Some(path) = picker.pick_file() {
                            dialog.file = path.display().to_string();
                        }
                    }
                });
                ui.end_row();

                ui.label("2θ start:");
                ui.text_edit_singleline(&mut dialog.two_theta_start);
                ui.end_row();

                ui.label("2θ end:");
                ui.text_edit_singleline(&mut dialog.two_theta_end);
                ui.end_row();

                ui.label("Delimiter");
                egui::ComboBox::from_id_salt("delimiter")
                    .selected_text(dialog.delimiter.label())
                    .show_ui(ui, |ui: &mut Ui| {
                        for d in Delimiter::ALL {
                            ui.selectable_value(&mut dialog.delimiter, d, d.label());
                        }
                    });
                ui.end_row();
            });

        choice = ok_cancel(ui);
    });

    if modal.should_close() {
        choice = Some(Choice::Cancel);
    }

    match choice {
        Some(Choice::Ok) => match dialog.validate() {
            Ok(request) => {
                let settings = dialog.to_settings();
                state.settings.update(|s| s.open_file = settings);
                state.open_dialog = None;
                state.start_import(request);
            }
            Err(e) => state.notify(Level::Warning, "Warning", e.to_string()),
        },
        Some(Choice::Cancel) => state.open_dialog = None,
        None => {}
    }
}

/// Render the save dialog; runs the save on OK.
pub fn save_dialog(ctx: &egui::Context, state: &mut AppState) {
    let Some(dialog) = state.save_dialog.as_mut() else {
        return;
    };

    let mut choice = None;
    let modal = egui::Modal::new(egui::Id::new("save_dialog")).show(ctx, |ui: &mut Ui| {
        ui.set_width(400.0);
        ui.heading(dialog.title());
        ui.add_space(8.0);

        egui::Grid::new("save_grid")
            .num_columns(2)
            .spacing([8.0, 8.0])
            .show(ui, |ui: &mut Ui| {
                if !dialog.pattern.is_batch() {
                    ui.label("Name");
                    ui.horizontal(|ui: &mut Ui| {
                        ui.text_edit_singleline(&mut dialog.file_name);
                        if ui
                            .button("…")
                            .on_hover_text("Take the name of an existing file")
                            .clicked()
                        {
                            let mut picker = rfd::FileDialog::new().set_title("Get file name");
                            if let Some(dir) = parent_dir(&dialog.path) {
                                picker = picker.set_directory(dir);
                            }
                            if let Some(stem) = picker
                                .pick_file()
                                .and_then(|p| {
                                    p.file_stem().map(|s| s.to_string_lossy().into_owned())
                                })
                            {
                                dialog.file_name = stem;
                            }
                        }
                    });
                    ui.end_row();
                }

                ui.label("Path");
                ui.horizontal(|ui: &mut Ui| {
                    ui.text_edit_singleline(&mut dialog.path);
                    if ui.button("📁").on_hover_text("Choose a folder").clicked() {
                        let mut picker = rfd::FileDialog::new().set_title("Choose folder");
                        if let Some(dir) = parent_dir(&dialog.path) {
                            picker = picker.set_directory(dir);
                        }
                        if let Some(dir) = picker.pick_folder() {
                            dialog.path = dir.display().to_string();
                        }
                    }
                });
                ui.end_row();

                ui.label("Format");
                let labels = dialog.format_labels();
                let current = labels.get(dialog.format).copied().unwrap_or_default();
                egui::ComboBox::from_id_salt("save_format")
                    .selected_text(current)
                    .show_ui(ui, |ui: &mut Ui| {
                        for (i, label) in labels.iter().enumerate() {
                            ui.selectable_value(&mut dialog.format, i, *label);
                        }
                    });
                ui.end_row();
            });

        ui.add_space(6.0);
        if dialog.candidates.is_empty() {
            ui.label(RichText::new("Nothing to save.").italics());
        } else if dialog.pattern.is_batch() {
            ui.strong(if dialog.pattern.is_table() { "Tables" } else { "Plots" });
            egui::ScrollArea::vertical()
                .max_height(180.0)
                .show(ui, |ui: &mut Ui| {
                    let rows = dialog.candidates.iter().zip(dialog.checked.iter_mut());
                    for (title, checked) in rows {
                        ui.checkbox(checked, title);
                    }
                });
        } else {
            let current = dialog.candidates.get(dialog.chosen).cloned().unwrap_or_default();
            egui::ComboBox::from_id_salt("save_window")
                .selected_text(current)
                .width(380.0)
                .show_ui(ui, |ui: &mut Ui| {
                    for (i, title) in dialog.candidates.iter().enumerate() {
                        ui.selectable_value(&mut dialog.chosen, i, title);
                    }
                });
        }

        choice = ok_cancel(ui);
    });

    if modal.should_close() {
        choice = Some(Choice::Cancel);
    }

    match choice {
        Some(Choice::Ok) => match dialog.validate() {
            Ok(action) => {
                let dialog = dialog.clone();
                state.settings.update(|s| dialog.apply_to(&mut s.save));
                state.save_dialog = None;
                state.save(action);
            }
            Err(e) => state.notify(Level::Warning, "Warning", e.to_string()),
        },
        Some(Choice::Cancel) => state.save_dialog = None,
        None => {}
    }
}

pub fn overlay_dialog(ctx: &egui::Context, state: &mut AppState) {
    let Some(dialog) = state.overlay_dialog.as_mut() else {
        return;
    };

    let mut choice = None;
    let modal = egui::Modal::new(egui::Id::new("overlay_dialog")).show(ctx, |ui: &mut Ui| {
        ui.set_width(350.0);
        ui.heading("Overlay tables");
        ui.add_space(8.0);
        egui::ScrollArea::vertical()
            .max_height(240.0)
            .show(ui, |ui: &mut Ui| {
                for (title, checked) in dialog.candidates.iter().zip(dialog.checked.iter_mut()) {
                    ui.checkbox(checked, title);
                }
            });
        choice = ok_cancel(ui);
    });

    if modal.should_close() {
        choice = Some(Choice::Cancel);
    }

    match choice {
        Some(Choice::Ok) => match dialog.validate() {
            Ok(titles) => {
                state.overlay_dialog = None;
                state.overlay_tables(&titles);
            }
            Err(e) => state.notify(Level::Warning, "Warning", e.to_string()),
        },
        Some(Choice::Cancel) => state.overlay_dialog = None,
        None => {}
    }
}

/// Show the oldest pending notification until it is acknowledged.
pub fn notifications(ctx: &egui::Context, state: &mut AppState) {
    let Some(Notification { level, title, text }) = state.notifications.front() else {
        return;
    };

    let mut dismissed = false;
    let modal = egui::Modal::new(egui::Id::new("notification")).show(ctx, |ui: &mut Ui| {
        ui.set_max_width(520.0);
        let color = match level {
            Level::Info => ui.visuals().text_color(),
            Level::Warning => Color32::from_rgb(220, 160, 40),
            Level::Critical => Color32::from_rgb(220, 60, 60),
        };
        ui.heading(RichText::new(title.as_str()).color(color));
        ui.add_space(6.0);
        egui::ScrollArea::vertical()
            .max_height(300.0)
            .show(ui, |ui: &mut Ui| {
                ui.label(text.as_str());
            });
        ui.separator();
        if ui.button("OK").clicked() {
            dismissed = true;
        }
    });

    if dismissed || modal.should_close() {
        state.notifications.pop_front();
    }
}

/// "Exit?" with Yes/No.
pub fn exit_prompt(ctx: &egui::Context, state: &mut AppState) {
    if !state.exit_prompt {
        return;
    }
    let mut answer = None;
    let modal = egui::Modal::new(egui::Id::new("exit_prompt")).show(ctx, |ui: &mut Ui| {
        ui.label("Exit?");
        ui.separator();
        ui.horizontal(|ui: &mut Ui| {
            if ui.button("Yes").clicked() {
                answer = Some(true);
            }
            if ui.button("No").clicked() {
                answer = Some(false);
            }
        });
    });
    if modal.should_close() {
        answer = Some(false);
    }

    match answer {
        Some(true) => {
            state.exit_prompt = false;
            state.exit_confirmed = true;
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
        Some(false) => state.exit_prompt = false,
        None => {}
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum AboutTab {
    About,
    Libraries,
    Authors,
}

/// Name, version, licence, libraries and authors.
pub fn about_dialog(ctx: &egui::Context, state: &mut AppState) {
    if !state.about_open {
        return;
    }
    let tab_id = egui::Id::new("about_tab");
    let mut tab = ctx.data_mut(|d| *d.get_temp_mut_or(tab_id, AboutTab::About));

    let mut open = state.about_open;
    egui::Window::new("About program")
        .open(&mut open)
        .collapsible(false)
        .default_size([500.0, 400.0])
        .show(ctx, |ui: &mut Ui| {
            ui.heading(RichText::new("FishX").strong());
            ui.label(format!("Version {}", env!("CARGO_PKG_VERSION")));
            ui.separator();
            ui.horizontal(|ui: &mut Ui| {
                ui.selectable_value(&mut tab, AboutTab::About, "About");
                ui.selectable_value(&mut tab, AboutTab::Libraries, "Platforms and libraries");
                ui.selectable_value(&mut tab, AboutTab::Authors, "Authors");
            });
            ui.separator();
            match tab {
                AboutTab::About => {
                    ui.label("Analysis of diffraction digital data");
                    ui.label("© Raven-98, 2021");
                    ui.label("License: GNU General Public License v3.0");
                    ui.hyperlink("http://www.gnu.org/licenses/gpl-3.0.html");
                }
                AboutTab::Libraries => {
                    ui.label("egui / eframe");
                    ui.hyperlink("https://github.com/emilk/egui");
                    ui.add_space(4.0);
                    ui.label("egui_plot");
                    ui.hyperlink("https://github.com/emilk/egui_plot");
                    ui.add_space(4.0);
                    ui.label("csv");
                    ui.hyperlink("https://github.com/BurntSushi/rust-csv");
                    ui.add_space(4.0);
                    ui.label("tiny-skia / image");
                    ui.hyperlink("https://github.com/linebender/tiny-skia");
                }
                AboutTab::Authors => {
                    ui.strong("Raven-98");
                    ui.label(RichText::new("Developer").italics());
                }
            }
        });

    ctx.data_mut(|d| d.insert_temp(tab_id, tab));
    state.about_open = open;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_dialog(file: &str, start: &str, end: &str) -> OpenFileDialog {
        OpenFileDialog {
            file: file.into(),
            two_theta_start: start.into(),
            two_theta_end: end.into(),
            delimiter: Delimiter::Semicolon,
        }
    }

    #[test]
    fn open_dialog_checks_fields_in_order() {
        assert_eq!(
            open_dialog("", "", "").validate().unwrap_err(),
            InputError::EmptyField("File")
        );
        assert_eq!(
            open_dialog("a.csv", " ", "").validate().unwrap_err(),
            InputError::EmptyField("2θ start")
        );
        assert_eq!(
            open_dialog("a.csv", "10", "").validate().unwrap_err(),
            InputError::EmptyField("2θ end")
        );
        assert!(matches!(
            open_dialog("a.csv", "10", "ten").validate().unwrap_err(),
            InputError::NotANumber { field: "2θ end", .. }
        ));
    }

    #[test]
    fn browse_offers_every_file_first() {
        assert_eq!(OPEN_FILTERS[0], ("All files", &["*"][..]));
        assert!(OPEN_FILTERS.iter().any(|(_, ext)| ext.contains(&"dat")));
    }

    #[test]
    fn open_dialog_builds_request() {
        let req = open_dialog(" /data/a.csv ", "10.5", "80").validate().unwrap();
        assert_eq!(req.path, PathBuf::from("/data/a.csv"));
        assert_eq!(req.delimiter, Delimiter::Semicolon);
        assert_eq!(req.params, CalibrationParameters::new(10.5, 80.0));
    }

    #[test]
    fn open_dialog_round_trips_settings() {
        let d = open_dialog("a.csv", "1", "2");
        assert_eq!(OpenFileDialog::from_settings(&d.to_settings()), d);
    }

    fn titles() -> Vec<String> {
        vec!["Table 1: a.csv".into(), "Table 2: b.csv".into()]
    }

    #[test]
    fn single_save_builds_path_from_name_and_format() {
        let settings = SaveSettings {
            path: "/out".into(),
            format_table: 1,
            format_plot: 0,
            file_name: "result".into(),
        };
        let mut d = SaveDialog::new(SavePattern::Table, titles(), &settings);
        d.chosen = 1;
        assert_eq!(
            d.validate().unwrap(),
            SaveAction::Single {
                title: "Table 2: b.csv".into(),
                path: PathBuf::from("/out/result.csv"),
            }
        );
    }

    #[test]
    fn batch_save_uses_checked_windows() {
        let settings = SaveSettings {
            path: "/out".into(),
            format_plot: 1,
            ..SaveSettings::default()
        };
        let mut d = SaveDialog::new(SavePattern::Plots, titles(), &settings);
        assert_eq!(d.validate().unwrap_err(), InputError::NothingSelected("plot"));
        d.checked[1] = true;
        assert_eq!(
            d.validate().unwrap(),
            SaveAction::Batch {
                titles: vec!["Table 2: b.csv".into()],
                dir: PathBuf::from("/out"),
                extension: "png".into(),
            }
        );
    }

    #[test]
    fn save_requires_windows_path_and_name() {
        let empty = SaveSettings::default();
        let d = SaveDialog::new(SavePattern::Plot, Vec::new(), &empty);
        assert_eq!(d.validate().unwrap_err(), InputError::NoWindows("plots"));

        let mut d = SaveDialog::new(SavePattern::Table, titles(), &empty);
        assert_eq!(d.validate().unwrap_err(), InputError::EmptyField("Path"));
        d.path = "/out".into();
        assert_eq!(d.validate().unwrap_err(), InputError::EmptyField("Name"));
    }

    #[test]
    fn overlay_needs_one_table() {
        let mut d = OverlayDialog::new(titles());
        assert_eq!(d.validate().unwrap(), titles());
        d.checked = vec![false, false];
        assert_eq!(d.validate().unwrap_err(), InputError::NothingSelected("table"));
    }

    #[test]
    fn out_of_range_format_is_clamped() {
        let settings = SaveSettings {
            format_table: 99,
            ..SaveSettings::default()
        };
        let d = SaveDialog::new(SavePattern::Tables, titles(), &settings);
        assert_eq!(d.format, TableFormat::ALL.len() - 1);
    }

    #[test]
    fn apply_to_keeps_the_other_format() {
        let mut s = SaveSettings {
            format_table: 2,
            file_name: "keep".into(),
            ..SaveSettings::default()
        };
        let mut d = SaveDialog::new(SavePattern::Plots, titles(), &s);
        d.format = 1;
        d.path = "/p".into();
        d.file_name = "ignored".into();
        d.apply_to(&mut s);
        assert_eq!(s.format_table, 2);
        assert_eq!(s.format_plot, 1);
        assert_eq!(s.file_name, "keep");
        assert_eq!(s.path, "/p");
    }
}
