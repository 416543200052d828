use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Delimiter – field separator of the imported text file
// ---------------------------------------------------------------------------

/// Field separator offered by the Open-file dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    #[default]
    Comma,
    Tab,
    Semicolon,
    Space,
}

impl Delimiter {
    pub const ALL: [Delimiter; 4] = [
        Delimiter::Comma,
        Delimiter::Tab,
        Delimiter::Semicolon,
        Delimiter::Space,
    ];

    /// The byte handed to the CSV reader.
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab => b'\t',
            Delimiter::Semicolon => b';',
            Delimiter::Space => b' ',
        }
    }

    /// Label shown in the delimiter combo box.
    pub fn label(self) -> &'static str {
        match self {
            Delimiter::Comma => "Comma",
            Delimiter::Tab => "Tab step",
            Delimiter::Semicolon => "Semicolon",
            Delimiter::Space => "Space",
        }
    }
}

// ---------------------------------------------------------------------------
// RawScan – the `Value` column of one file
// ---------------------------------------------------------------------------

/// Raw detector readings in file order.
///
/// Index 0 is the reference row and never takes part in calibration.
/// Missing cells are stored as `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawScan {
    pub values: Vec<f64>,
}

impl RawScan {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ---------------------------------------------------------------------------
// CalibrationParameters – user-entered 2θ bounds
// ---------------------------------------------------------------------------

/// Start and end of the angular range covered by a scan, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationParameters {
    pub min_angle: f64,
    pub max_angle: f64,
}

impl CalibrationParameters {
    pub fn new(min_angle: f64, max_angle: f64) -> Self {
        Self {
            min_angle,
            max_angle,
        }
    }
}

// ---------------------------------------------------------------------------
// CalibratedSeries – aligned (2θ, intensity) pairs
// ---------------------------------------------------------------------------

/// Error returned when two columns of different length are paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("2θ column has {angle} values but intensity column has {intensity}")]
pub struct LengthMismatch {
    pub angle: usize,
    pub intensity: usize,
}

/// Processed scan ready for display. Both columns always have equal length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CalibratedSeries {
    angle: Vec<f64>,
    intensity: Vec<f64>,
}

impl CalibratedSeries {
    pub fn new(angle: Vec<f64>, intensity: Vec<f64>) -> Result<Self, LengthMismatch> {
        if angle.len() != intensity.len() {
            return Err(LengthMismatch {
                angle: angle.len(),
                intensity: intensity.len(),
            });
        }
        Ok(Self { angle, intensity })
    }

    pub fn angle(&self) -> &[f64] {
        &self.angle
    }

    pub fn intensity(&self) -> &[f64] {
        &self.intensity
    }

    /// Iterate `(2θ, intensity)` pairs in order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.angle
            .iter()
            .copied()
            .zip(self.intensity.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.angle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angle.is_empty()
    }
}

impl FromIterator<(f64, f64)> for CalibratedSeries {
    fn from_iter<I: IntoIterator<Item = (f64, f64)>>(iter: I) -> Self {
        let (angle, intensity) = iter.into_iter().unzip();
        Self { angle, intensity }
    }
}

// ---------------------------------------------------------------------------
// NamedDataset – a series bound to a window title
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct NamedDataset {
    /// Per-kind sequence number, unique within the process lifetime.
    pub id: u64,
    /// Base name of the source file.
    pub name: String,
    pub series: CalibratedSeries,
}

/// Angle cell text: the three decimals the calibration keeps.
pub fn format_angle(v: f64) -> String {
    format!("{v:.3}")
}

/// Format a number the way the table shows and exports it: shortest text
/// that reads back to the same value, always with a fractional part.
pub fn format_value(v: f64) -> String {
    let text = v.to_string();
    if v.is_finite() && !text.contains(['.', 'e', 'E']) {
        format!("{text}.0")
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_rejects_mismatched_columns() {
        let err = CalibratedSeries::new(vec![1.0, 2.0], vec![3.0]).unwrap_err();
        assert_eq!(err.angle, 2);
        assert_eq!(err.intensity, 1);
    }

    #[test]
    fn format_value_keeps_a_fraction() {
        assert_eq!(format_value(12.0), "12.0");
        assert_eq!(format_value(14.447), "14.447");
        assert_eq!(format_value(-3.5), "-3.5");
        assert_eq!(format_value(f64::NAN), "NaN");
    }
}
