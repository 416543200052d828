use std::path::Path;

use eframe::egui::Color32;

use crate::color::{generate_palette, to_rgb};
use crate::data::export::{save_plot, save_table, ExportError, Exportable, PlotLine};
use crate::data::model::{CalibratedSeries, NamedDataset};
use crate::data::table::TableData;

// ---------------------------------------------------------------------------
// Id sequence
// ---------------------------------------------------------------------------

/// Monotonic window numbers, starting at 1. Never reused in a session.
#[derive(Debug, Clone)]
pub struct IdSequence {
    next: u64,
}

impl IdSequence {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Window contents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Table,
    Plot,
}

impl WindowKind {
    pub fn label(self) -> &'static str {
        match self {
            WindowKind::Table => "Table",
            WindowKind::Plot => "Plot",
        }
    }
}

/// Table sub-window: the dataset it was created from plus the edited copy.
#[derive(Debug, Clone)]
pub struct TableView {
    pub dataset: NamedDataset,
    pub data: TableData,
}

/// One curve of a plot sub-window.
#[derive(Debug, Clone)]
pub struct PlotLayer {
    pub name: String,
    pub series: CalibratedSeries,
    pub color: Color32,
}

#[derive(Debug, Clone)]
pub struct PlotView {
    pub layers: Vec<PlotLayer>,
}

impl PlotView {
    /// Colour each `(name, series)` pair from the palette.
    pub fn new(curves: Vec<(String, CalibratedSeries)>) -> Self {
        let palette = generate_palette(curves.len());
        let layers = curves
            .into_iter()
            .zip(palette)
            .map(|((name, series), color)| PlotLayer {
                name,
                series,
                color,
            })
            .collect();
        Self { layers }
    }
}

#[derive(Debug, Clone)]
pub enum WindowBody {
    Table(TableView),
    Plot(PlotView),
}

/// One sub-window of the main area.
#[derive(Debug, Clone)]
pub struct WindowRecord {
    pub id: u64,
    pub title: String,
    pub body: WindowBody,
    pub open: bool,
}

impl WindowRecord {
    pub fn kind(&self) -> WindowKind {
        match self.body {
            WindowBody::Table(_) => WindowKind::Table,
            WindowBody::Plot(_) => WindowKind::Plot,
        }
    }
}

impl Exportable for WindowRecord {
    fn title(&self) -> &str {
        &self.title
    }

    fn export(&self, path: &Path) -> Result<(), ExportError> {
        match &self.body {
            WindowBody::Table(view) => save_table(path, &view.data.to_series()?),
            WindowBody::Plot(view) => {
                let lines: Vec<PlotLine<'_>> = view
                    .layers
                    .iter()
                    .map(|l| PlotLine {
                        series: &l.series,
                        rgb: to_rgb(l.color),
                    })
                    .collect();
                save_plot(path, &lines)
            }
        }
    }
}

/// Base name of a path, used as the dataset name.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Open sub-windows in creation order, titled "<Kind> <id>: <name>".
pub struct WindowRegistry {
    windows: Vec<WindowRecord>,
    table_ids: IdSequence,
    plot_ids: IdSequence,
}

impl WindowRegistry {
    pub fn new(table_ids: IdSequence, plot_ids: IdSequence) -> Self {
        Self {
            windows: Vec::new(),
            table_ids,
            plot_ids,
        }
    }

    fn push(&mut self, id: u64, kind: WindowKind, name: &str, body: WindowBody) -> u64 {
        let title = format!("{} {id}: {name}", kind.label());
        log::info!("Opening window '{title}'");
        self.windows.push(WindowRecord {
            id,
            title,
            body,
            open: true,
        });
        id
    }

    /// Open a table window for an imported series; returns its table id.
    pub fn add_table(&mut self, name: &str, series: CalibratedSeries) -> u64 {
        let id = self.table_ids.next_id();
        let data = TableData::from_series(&series);
        let dataset = NamedDataset {
            id,
            name: name.to_string(),
            series,
        };
        let body = WindowBody::Table(TableView { dataset, data });
        self.push(id, WindowKind::Table, name, body)
    }

    /// Open a plot window with one curve per `(name, series)`.
    pub fn add_plot(&mut self, name: &str, curves: Vec<(String, CalibratedSeries)>) -> u64 {
        let id = self.plot_ids.next_id();
        self.push(id, WindowKind::Plot, name, WindowBody::Plot(PlotView::new(curves)))
    }

    /// Plot the selected rows (or all rows) of a table window.
    pub fn plot_from_table(&mut self, table_title: &str) -> Result<u64, ExportError> {
        let (name, series) = match self.get(table_title).map(|w| &w.body) {
            Some(WindowBody::Table(view)) => {
                (view.dataset.name.clone(), view.data.selection_to_series()?)
            }
            _ => return Err(ExportError::UnknownWindow(table_title.to_string())),
        };
        Ok(self.add_plot(&name, vec![(name.clone(), series)]))
    }

    /// One plot window overlaying every listed table in full.
    pub fn overlay_tables(&mut self, table_titles: &[String]) -> Result<u64, ExportError> {
        let mut curves = Vec::with_capacity(table_titles.len());
        for title in table_titles {
            match self.get(title).map(|w| &w.body) {
                Some(WindowBody::Table(view)) => {
                    curves.push((view.dataset.name.clone(), view.data.to_series()?));
                }
                _ => return Err(ExportError::UnknownWindow(title.clone())),
            }
        }
        let name = curves
            .iter()
            .map(|(n, _)| n.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Ok(self.add_plot(&name, curves))
    }

    pub fn get(&self, title: &str) -> Option<&WindowRecord> {
        self.iter().find(|w| w.title == title)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WindowRecord> {
        self.windows.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut WindowRecord> {
        self.windows.iter_mut()
    }

    pub fn of_kind(&self, kind: WindowKind) -> impl Iterator<Item = &WindowRecord> {
        self.iter().filter(move |w| w.kind() == kind)
    }

    /// Titles of the windows of one kind, in creation order.
    pub fn titles(&self, kind: WindowKind) -> Vec<String> {
        self.of_kind(kind).map(|w| w.title.clone()).collect()
    }

    /// Drop windows the user has closed.
    pub fn retain_open(&mut self) {
        self.windows.retain(|w| {
            if !w.open {
                log::debug!("Closed window '{}'", w.title);
            }
            w.open
        });
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl Default for WindowRegistry {
    fn default() -> Self {
        Self::new(IdSequence::new(), IdSequence::new())
    }
}
