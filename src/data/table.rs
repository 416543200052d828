use std::collections::BTreeSet;

use super::export::ExportError;
use super::model::{format_angle, format_value, CalibratedSeries};

pub const ANGLE_COLUMN: &str = "2θ";
pub const INTENSITY_COLUMN: &str = "Intensity";

/// How a click extends the current row selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectMode {
    /// Plain click: select only this row.
    Replace,
    /// Ctrl-click: toggle this row.
    Toggle,
    /// Shift-click: select the range from the last clicked row.
    Range,
}

/// Editable text copy of a calibrated series, as shown in a table window.
///
/// Cells stay text while the user edits them; numbers are parsed only when
/// the table is plotted or saved.
#[derive(Debug, Clone, Default)]
pub struct TableData {
    pub rows: Vec<[String; 2]>,
    selected: BTreeSet<usize>,
    anchor: Option<usize>,
}

impl TableData {
    pub fn from_series(series: &CalibratedSeries) -> Self {
        Self {
            rows: series
                .points()
                .map(|(a, i)| [format_angle(a), format_value(i)])
                .collect(),
            selected: BTreeSet::new(),
            anchor: None,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_selected(&self, row: usize) -> bool {
        self.selected.contains(&row)
    }

    pub fn selected_rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.selected.iter().copied()
    }

    pub fn click(&mut self, row: usize, mode: SelectMode) {
        if row >= self.rows.len() {
            return;
        }
        match mode {
            SelectMode::Replace => {
                self.selected.clear();
                self.selected.insert(row);
                self.anchor = Some(row);
            }
            SelectMode::Toggle => {
                if !self.selected.remove(&row) {
                    self.selected.insert(row);
                }
                self.anchor = Some(row);
            }
            SelectMode::Range => {
                let anchor = self.anchor.unwrap_or(row);
                let (lo, hi) = (anchor.min(row), anchor.max(row));
                self.selected.clear();
                self.selected.extend(lo..=hi);
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
        self.anchor = None;
    }

    /// Parse every row.
    pub fn to_series(&self) -> Result<CalibratedSeries, ExportError> {
        self.parse_rows(0..self.rows.len())
    }

    /// Parse the selected rows in row order, or every row when nothing is
    /// selected.
    pub fn selection_to_series(&self) -> Result<CalibratedSeries, ExportError> {
        if self.selected.is_empty() {
            self.to_series()
        } else {
            self.parse_rows(self.selected.iter().copied())
        }
    }

    fn parse_rows(
        &self,
        rows: impl Iterator<Item = usize>,
    ) -> Result<CalibratedSeries, ExportError> {
        let mut angle = Vec::new();
        let mut intensity = Vec::new();
        for row in rows {
            let [a, i] = &self.rows[row];
            angle.push(parse_cell(a, row, ANGLE_COLUMN)?);
            intensity.push(parse_cell(i, row, INTENSITY_COLUMN)?);
        }
        Ok(CalibratedSeries::new(angle, intensity)?)
    }
}

fn parse_cell(text: &str, row: usize, column: &'static str) -> Result<f64, ExportError> {
    text.trim().parse().map_err(|_| ExportError::InvalidCell {
        row: row + 1,
        column,
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TableData {
        let series =
            CalibratedSeries::new(vec![1.5, 2.5, 3.5, 4.5], vec![10.0, 20.0, 30.0, 40.0]).unwrap();
        TableData::from_series(&series)
    }

    #[test]
    fn cells_are_formatted_values() {
        let t = table();
        assert_eq!(t.rows[0], ["1.500".to_string(), "10.0".to_string()]);
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn angles_keep_three_decimals() {
        let series = CalibratedSeries::new(vec![15.1, 19.444], vec![3.0, 4.0]).unwrap();
        let t = TableData::from_series(&series);
        assert_eq!(t.rows[0][0], "15.100");
        assert_eq!(t.rows[1][0], "19.444");
        assert_eq!(t.to_series().unwrap().angle(), &[15.1, 19.444]);
    }

    #[test]
    fn empty_table_gives_an_empty_series() {
        let t = TableData::from_series(&CalibratedSeries::default());
        assert!(t.is_empty());
        let s = t.selection_to_series().unwrap();
        assert!(s.is_empty());
    }

    #[test]
    fn edited_cells_are_exported() {
        let mut t = table();
        t.rows[1][1] = " 25.25 ".into();
        let s = t.to_series().unwrap();
        assert_eq!(s.intensity(), &[10.0, 25.25, 30.0, 40.0]);
    }

    #[test]
    fn invalid_cell_names_row_and_column() {
        let mut t = table();
        t.rows[2][0] = "x".into();
        match t.to_series().unwrap_err() {
            ExportError::InvalidCell { row, column, text } => {
                assert_eq!(row, 3);
                assert_eq!(column, ANGLE_COLUMN);
                assert_eq!(text, "x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn no_selection_means_every_row() {
        let t = table();
        assert_eq!(t.selection_to_series().unwrap().len(), 4);
    }

    #[test]
    fn selection_keeps_row_order() {
        let mut t = table();
        t.click(3, SelectMode::Replace);
        t.click(1, SelectMode::Toggle);
        let s = t.selection_to_series().unwrap();
        assert_eq!(s.angle(), &[2.5, 4.5]);
    }

    #[test]
    fn toggle_deselects() {
        let mut t = table();
        t.click(1, SelectMode::Replace);
        t.click(1, SelectMode::Toggle);
        assert!(!t.is_selected(1));
        assert_eq!(t.selected_rows().count(), 0);
    }

    #[test]
    fn shift_click_selects_a_range() {
        let mut t = table();
        t.click(2, SelectMode::Replace);
        t.click(0, SelectMode::Range);
        assert_eq!(t.selected_rows().collect::<Vec<_>>(), vec![0, 1, 2]);
        t.click(3, SelectMode::Range);
        assert_eq!(t.selected_rows().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn clicks_past_the_end_are_ignored() {
        let mut t = table();
        t.click(10, SelectMode::Replace);
        assert_eq!(t.selected_rows().count(), 0);
        t.clear_selection();
    }
}
