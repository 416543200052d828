/// Data layer: scan types, import, calibration, tables and export.
///
/// Architecture:
/// ```text
///  .csv / .txt / .dat  (header row, `Value` column)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RawScan
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ calibration  │  linear 2θ ramp + instrument correction → CalibratedSeries
///   └─────────────┘
///        │            (both steps run on an `import` worker thread)
///        ▼
///   ┌──────────┐
///   │  table    │  editable text copy, row selection
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  tab-separated table / 300 DPI raster plot
///   └──────────┘
/// ```

pub mod calibration;
pub mod export;
pub mod import;
pub mod loader;
pub mod model;
pub mod table;
