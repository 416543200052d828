//! Dialog values remembered between sessions, stored as `settings.json`
//! next to the executable.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::model::Delimiter;

pub const SETTINGS_FILE: &str = "settings.json";

/// Last values accepted in the Open-file dialog. Bounds are kept as typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenFileSettings {
    pub file: String,
    pub delimiter: Delimiter,
    pub two_theta_start: String,
    pub two_theta_end: String,
}

/// Last values accepted in a save dialog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveSettings {
    pub path: String,
    /// Index into the table format list.
    pub format_table: usize,
    /// Index into the plot format list.
    pub format_plot: usize,
    pub file_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub open_file: OpenFileSettings,
    pub save: SaveSettings,
}

impl Settings {
    /// `settings.json` beside the running executable, or in the working
    /// directory when that cannot be determined.
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_default()
            .join(SETTINGS_FILE)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Never fails: a missing or broken file gives the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring settings: {e:#}");
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).context("serializing settings")?;
        std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
    }
}

/// Where the settings live; handed to the dialogs.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Settings {
        Settings::load_or_default(&self.path)
    }

    /// Read-modify-write so the two dialogs do not clobber each other's keys.
    pub fn update(&self, f: impl FnOnce(&mut Settings)) {
        let mut settings = self.load();
        f(&mut settings);
        if let Err(e) = settings.save_to(&self.path) {
            log::error!("Failed to save settings: {e:#}");
        }
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(Settings::default_path())
    }
}
