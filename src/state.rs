use std::collections::VecDeque;
use std::path::Path;

use crate::data::export::{export_batch, export_one, Exportable};
use crate::data::import::{ImportOutcome, ImportRequest, ImportTask};
use crate::settings::SettingsStore;
use crate::ui::dialogs::{OpenFileDialog, OverlayDialog, SaveAction, SaveDialog, SavePattern};
use crate::windows::{display_name, WindowKind, WindowRegistry};

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Critical,
}

/// A blocking message box, shown one at a time in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: Level,
    pub title: String,
    pub text: String,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Open table and plot sub-windows.
    pub windows: WindowRegistry,

    /// Imports whose worker has not terminated yet.
    pub imports: Vec<ImportTask>,

    pub settings: SettingsStore,

    pub open_dialog: Option<OpenFileDialog>,
    pub save_dialog: Option<SaveDialog>,
    pub overlay_dialog: Option<OverlayDialog>,
    pub about_open: bool,

    /// "Exit?" confirmation is showing.
    pub exit_prompt: bool,
    /// The user confirmed exit; let the next close request through.
    pub exit_confirmed: bool,

    /// Re-stack the sub-windows on the next frame.
    pub cascade_requested: bool,

    pub notifications: VecDeque<Notification>,
}

impl AppState {
    pub fn new(windows: WindowRegistry, settings: SettingsStore) -> Self {
        Self {
            windows,
            imports: Vec::new(),
            settings,
            open_dialog: None,
            save_dialog: None,
            overlay_dialog: None,
            about_open: false,
            exit_prompt: false,
            exit_confirmed: false,
            cascade_requested: false,
            notifications: VecDeque::new(),
        }
    }

    pub fn notify(&mut self, level: Level, title: &str, text: impl Into<String>) {
        self.notifications.push_back(Notification {
            level,
            title: title.to_string(),
            text: text.into(),
        });
    }

    /// Show the Open-file dialog filled from the settings file.
    pub fn show_open_dialog(&mut self) {
        let settings = self.settings.load();
        self.open_dialog = Some(OpenFileDialog::from_settings(&settings.open_file));
    }

    pub fn show_save_dialog(&mut self, pattern: SavePattern) {
        let kind = match pattern {
            SavePattern::Table | SavePattern::Tables => WindowKind::Table,
            SavePattern::Plot | SavePattern::Plots => WindowKind::Plot,
        };
        let settings = self.settings.load();
        self.save_dialog = Some(SaveDialog::new(
            pattern,
            self.windows.titles(kind),
            &settings.save,
        ));
    }

    pub fn show_overlay_dialog(&mut self) {
        let titles = self.windows.titles(WindowKind::Table);
        if titles.is_empty() {
            self.notify(Level::Warning, "Warning", "No tables to overlay");
            return;
        }
        self.overlay_dialog = Some(OverlayDialog::new(titles));
    }

    pub fn is_loading(&self) -> bool {
        !self.imports.is_empty()
    }

    // -- Import ------------------------------------------------------------

    pub fn start_import(&mut self, request: ImportRequest) {
        self.imports.push(ImportTask::spawn(request));
    }

    /// Collect finished imports: a table window per success, a critical
    /// notification per failure.
    pub fn poll_imports(&mut self) {
        let mut outcomes = Vec::new();
        for task in &mut self.imports {
            if let Some(outcome) = task.poll() {
                outcomes.push(outcome);
            }
        }
        self.imports.retain(|t| !t.is_finished());

        for outcome in outcomes {
            self.apply_import(outcome);
        }
    }

    /// Join every import still in flight. Their results are dropped since no
    /// window will show them.
    pub fn shutdown(&mut self) -> usize {
        let pending = self.imports.len();
        for mut task in self.imports.drain(..) {
            log::info!(
                "Waiting for import of {} ({:?})",
                task.path().display(),
                task.state()
            );
            if let Some(ImportOutcome::Failure { message, .. }) = task.wait() {
                log::warn!("Discarded failed import: {message}");
            }
        }
        pending
    }

    fn apply_import(&mut self, outcome: ImportOutcome) {
        match outcome {
            ImportOutcome::Success { path, series } => {
                self.windows.add_table(&display_name(&path), series);
            }
            ImportOutcome::Failure { message, .. } => {
                self.notify(Level::Critical, "Critical error", message);
            }
        }
    }

    // -- Tables and plots ----------------------------------------------------

    pub fn plot_table(&mut self, title: &str) {
        if let Err(e) = self.windows.plot_from_table(title) {
            log::warn!("Cannot plot '{title}': {e}");
            self.notify(Level::Warning, "Plot", e.to_string());
        }
    }

    pub fn overlay_tables(&mut self, titles: &[String]) {
        if let Err(e) = self.windows.overlay_tables(titles) {
            log::warn!("Cannot overlay tables: {e}");
            self.notify(Level::Warning, "Plot", e.to_string());
        }
    }

    // -- Saving --------------------------------------------------------------

    /// Run an accepted save dialog. Reports "Done" or the failing item.
    pub fn save(&mut self, action: SaveAction) {
        let result = match &action {
            SaveAction::Single { title, path } => match self.windows.get(title) {
                Some(window) => export_one(window, path).map(|_| 1),
                None => {
                    self.notify(Level::Critical, "Error", format!("no window titled '{title}'"));
                    return;
                }
            },
            SaveAction::Batch {
                titles,
                dir,
                extension,
            } => self.save_batch(titles, dir, extension),
        };

        match result {
            Ok(n) => {
                log::info!("Saved {n} item(s)");
                self.notify(Level::Info, "Save", "Done");
            }
            Err(e) => {
                log::error!("{e}");
                self.notify(Level::Critical, "Error", e.to_string());
            }
        }
    }

    fn save_batch(
        &self,
        titles: &[String],
        dir: &Path,
        extension: &str,
    ) -> Result<usize, crate::data::export::SaveError> {
        let items: Vec<&dyn Exportable> = titles
            .iter()
            .filter_map(|t| self.windows.get(t))
            .map(|w| w as &dyn Exportable)
            .collect();
        export_batch(&items, dir, extension).map(|written| written.len())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(WindowRegistry::default(), SettingsStore::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CalibratedSeries, CalibrationParameters, Delimiter};
    use std::path::PathBuf;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fishx-state-{}-{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn state(dir: &Path) -> AppState {
        AppState::new(
            WindowRegistry::default(),
            SettingsStore::new(dir.join("settings.json")),
        )
    }

    fn series() -> CalibratedSeries {
        (0..4).map(|i| (10.0 + i as f64, i as f64)).collect()
    }

    fn drain(state: &mut AppState) {
        while state.is_loading() {
            state.poll_imports();
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
    }

    #[test]
    fn successful_import_opens_a_table() {
        let dir = temp_dir("import-ok");
        let file = dir.join("scan.csv");
        std::fs::write(&file, "Index,Value\n0,0\n1,5\n2,6\n3,7\n4,8\n").unwrap();

        let mut s = state(&dir);
        s.start_import(ImportRequest {
            path: file,
            delimiter: Delimiter::Comma,
            params: CalibrationParameters::new(20.0, 30.0),
        });
        drain(&mut s);

        assert_eq!(s.windows.titles(WindowKind::Table), vec!["Table 1: scan.csv"]);
        assert!(s.notifications.is_empty());
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn shutdown_joins_pending_imports() {
        let dir = temp_dir("shutdown");
        let file = dir.join("scan.csv");
        std::fs::write(&file, "Value\n0\n1\n2\n3\n").unwrap();

        let mut s = state(&dir);
        for _ in 0..2 {
            s.start_import(ImportRequest {
                path: file.clone(),
                delimiter: Delimiter::Comma,
                params: CalibrationParameters::new(20.0, 30.0),
            });
        }
        assert_eq!(s.shutdown(), 2);
        assert!(!s.is_loading());
        assert!(s.windows.is_empty());
        assert_eq!(s.shutdown(), 0);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn failed_import_notifies_and_opens_nothing() {
        let dir = temp_dir("import-bad");
        let mut s = state(&dir);
        s.start_import(ImportRequest {
            path: dir.join("missing.csv"),
            delimiter: Delimiter::Comma,
            params: CalibrationParameters::new(20.0, 30.0),
        });
        drain(&mut s);

        assert!(s.windows.is_empty());
        let n = s.notifications.pop_front().unwrap();
        assert_eq!(n.level, Level::Critical);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn batch_save_reports_the_failing_window() {
        let dir = temp_dir("batch");
        let mut s = state(&dir);
        s.windows.add_table("a", series());
        s.windows.add_table("b", series());
        s.windows.add_table("c", series());
        std::fs::create_dir_all(dir.join("Table 2_ b.dat")).unwrap();

        s.save(SaveAction::Batch {
            titles: s.windows.titles(WindowKind::Table),
            dir: dir.clone(),
            extension: "dat".into(),
        });

        let n = s.notifications.pop_front().unwrap();
        assert_eq!(n.level, Level::Critical);
        assert!(n.text.contains("Table 2: b"), "{}", n.text);
        assert!(dir.join("Table 1_ a.dat").is_file());
        assert!(!dir.join("Table 3_ c.dat").exists());
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn single_save_reports_done() {
        let dir = temp_dir("single");
        let mut s = state(&dir);
        s.windows.add_table("a", series());
        s.save(SaveAction::Single {
            title: "Table 1: a".into(),
            path: dir.join("out.csv"),
        });
        let n = s.notifications.pop_front().unwrap();
        assert_eq!((n.level, n.text.as_str()), (Level::Info, "Done"));
        assert!(dir.join("out.csv").is_file());
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn save_dialog_lists_windows_of_the_right_kind() {
        let dir = temp_dir("save-dialog");
        let mut s = state(&dir);
        s.windows.add_table("a", series());
        s.plot_table("Table 1: a");

        s.show_save_dialog(SavePattern::Plots);
        let dialog = s.save_dialog.take().unwrap();
        assert_eq!(dialog.candidates, vec!["Plot 1: a"]);

        s.show_save_dialog(SavePattern::Table);
        assert_eq!(s.save_dialog.unwrap().candidates, vec!["Table 1: a"]);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn overlay_without_tables_warns() {
        let dir = temp_dir("overlay");
        let mut s = state(&dir);
        s.show_overlay_dialog();
        assert!(s.overlay_dialog.is_none());
        assert_eq!(s.notifications.len(), 1);

        s.windows.add_table("a", series());
        s.windows.add_table("b", series());
        s.overlay_tables(&s.windows.titles(WindowKind::Table));
        assert_eq!(s.windows.titles(WindowKind::Plot), vec!["Plot 1: a, b"]);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn plotting_a_broken_table_warns() {
        let dir = temp_dir("plot");
        let mut s = state(&dir);
        s.windows.add_table("a", series());
        if let Some(crate::windows::WindowBody::Table(view)) =
            s.windows.iter_mut().next().map(|w| &mut w.body)
        {
            view.data.rows[0][0] = "".into();
        }
        s.plot_table("Table 1: a");
        assert_eq!(s.notifications.len(), 1);
        assert_eq!(s.windows.of_kind(WindowKind::Plot).count(), 0);
        std::fs::remove_dir_all(dir).ok();
    }
}
