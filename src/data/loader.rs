use std::path::Path;

use thiserror::Error;

use super::model::{Delimiter, RawScan};

/// Header of the column holding the detector readings.
pub const VALUE_COLUMN: &str = "Value";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed delimited text: {0}")]
    Csv(#[from] csv::Error),
    #[error("no '{}' column, found {found:?}", VALUE_COLUMN)]
    MissingColumn { found: Vec<String> },
    #[error("row {row}: '{text}' is not a number")]
    InvalidNumber { row: usize, text: String },
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Read the `Value` column of a delimited text file with a header row.
pub fn read_raw_scan(path: &Path, delimiter: Delimiter) -> Result<RawScan, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_raw_scan_from(file, delimiter)
}

/// Same as [`read_raw_scan`] over any reader.
pub fn read_raw_scan_from<R: std::io::Read>(
    input: R,
    delimiter: Delimiter,
) -> Result<RawScan, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter.as_byte())
        .has_headers(true)
        .from_reader(input);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let value_idx = headers
        .iter()
        .position(|h| h == VALUE_COLUMN)
        .ok_or_else(|| LoadError::MissingColumn {
            found: headers.clone(),
        })?;

    let mut values = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result?;
        let cell = record.get(value_idx).unwrap_or("");
        values.push(parse_reading(cell, row_no)?);
    }

    let scan = RawScan::new(values);
    if scan.is_empty() {
        log::warn!("'{}' column has no readings", VALUE_COLUMN);
    }
    Ok(scan)
}

/// Empty cells are missing readings. The reference row (0) is never used
/// numerically, so anything goes there.
fn parse_reading(cell: &str, row: usize) -> Result<f64, LoadError> {
    let text = cell.trim();
    if text.is_empty() {
        return Ok(f64::NAN);
    }
    match text.parse::<f64>() {
        Ok(v) => Ok(v),
        Err(_) if row == 0 => {
            log::debug!("reference row holds non-numeric '{text}'");
            Ok(f64::NAN)
        }
        Err(_) => Err(LoadError::InvalidNumber {
            row,
            text: text.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(text: &str, delimiter: Delimiter) -> Result<RawScan, LoadError> {
        read_raw_scan_from(text.as_bytes(), delimiter)
    }

    #[test]
    fn reads_value_column_with_each_delimiter() {
        let cases = [
            ("Index,Value\n0,5\n1,6.5\n2,7\n", Delimiter::Comma),
            ("Index\tValue\n0\t5\n1\t6.5\n2\t7\n", Delimiter::Tab),
            ("Index;Value\n0;5\n1;6.5\n2;7\n", Delimiter::Semicolon),
            ("Index Value\n0 5\n1 6.5\n2 7\n", Delimiter::Space),
        ];
        for (text, delimiter) in cases {
            let scan = read(text, delimiter).unwrap();
            assert_eq!(scan.values, vec![5.0, 6.5, 7.0], "{delimiter:?}");
        }
    }

    #[test]
    fn value_column_may_be_anywhere() {
        let scan = read("Value,Angle\n1,a\n2,b\n", Delimiter::Comma).unwrap();
        assert_eq!(scan.values, vec![1.0, 2.0]);
    }

    #[test]
    fn missing_value_column_is_reported() {
        let err = read("Index,value\n0,1\n", Delimiter::Comma).unwrap_err();
        match err {
            LoadError::MissingColumn { found } => assert_eq!(found, vec!["Index", "value"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn wrong_delimiter_hides_the_column() {
        let err = read("Index;Value\n0;1\n", Delimiter::Comma).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { .. }));
    }

    #[test]
    fn non_numeric_reading_is_rejected() {
        let err = read("Value\n1\n2\nabc\n", Delimiter::Comma).unwrap_err();
        match err {
            LoadError::InvalidNumber { row, text } => {
                assert_eq!(row, 2);
                assert_eq!(text, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reference_row_may_be_text() {
        let scan = read("Value\nref\n2\n3\n", Delimiter::Comma).unwrap();
        assert!(scan.values[0].is_nan());
        assert_eq!(&scan.values[1..], &[2.0, 3.0]);
    }

    #[test]
    fn empty_cells_are_missing_readings() {
        let scan = read("Index,Value\n0,1\n1,\n2,3\n", Delimiter::Comma).unwrap();
        assert_eq!(scan.len(), 3);
        assert!(scan.values[1].is_nan());
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = read("Index,Value\n0,1\n1,2,3\n", Delimiter::Comma).unwrap_err();
        assert!(matches!(err, LoadError::Csv(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = std::env::temp_dir().join("fishx-loader-does-not-exist.csv");
        let err = read_raw_scan(&path, Delimiter::Comma).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
