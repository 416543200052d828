use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use eframe::egui::FontDefinitions;
use thiserror::Error;
use usvg::fontdb::Database;
use tiny_skia::{Color, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

use super::model::{format_value, CalibratedSeries, LengthMismatch};

// ---------------------------------------------------------------------------
// Formats offered by the save dialogs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Dat,
    Csv,
    Txt,
}

impl TableFormat {
    pub const ALL: [TableFormat; 3] = [TableFormat::Dat, TableFormat::Csv, TableFormat::Txt];

    pub fn label(self) -> &'static str {
        match self {
            TableFormat::Dat => "DAT file (*.dat)",
            TableFormat::Csv => "CSV file (*.csv)",
            TableFormat::Txt => "Text file (*.txt)",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            TableFormat::Dat => "dat",
            TableFormat::Csv => "csv",
            TableFormat::Txt => "txt",
        }
    }

    /// Index into [`Self::ALL`], falling back to the first entry.
    pub fn from_index(i: usize) -> Self {
        Self::ALL.get(i).copied().unwrap_or(Self::ALL[0])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotFormat {
    Jpeg,
    Png,
}

impl PlotFormat {
    pub const ALL: [PlotFormat; 2] = [PlotFormat::Jpeg, PlotFormat::Png];

    pub fn label(self) -> &'static str {
        match self {
            PlotFormat::Jpeg => "JPEG file (*.jpg)",
            PlotFormat::Png => "PNG file (*.png)",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            PlotFormat::Jpeg => "jpg",
            PlotFormat::Png => "png",
        }
    }

    pub fn from_index(i: usize) -> Self {
        Self::ALL.get(i).copied().unwrap_or(Self::ALL[0])
    }

    /// Pick the encoder from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(PlotFormat::Jpeg),
            "png" => Some(PlotFormat::Png),
            _ => None,
        }
    }

    fn image_format(self) -> image::ImageFormat {
        match self {
            PlotFormat::Jpeg => image::ImageFormat::Jpeg,
            PlotFormat::Png => image::ImageFormat::Png,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("writing table: {0}")]
    Csv(#[from] csv::Error),
    #[error("encoding image: {0}")]
    Image(#[from] image::ImageError),
    #[error("row {row}, column {column}: '{text}' is not a number")]
    InvalidCell {
        row: usize,
        column: &'static str,
        text: String,
    },
    #[error(transparent)]
    LengthMismatch(#[from] LengthMismatch),
    #[error("unsupported plot file extension: {0}")]
    UnsupportedFormat(String),
    #[error("laying out plot text: {0}")]
    Svg(#[from] usvg::Error),
    #[error("cannot allocate a {width}x{height} canvas")]
    Canvas { width: u32, height: u32 },
    #[error("no window titled '{0}'")]
    UnknownWindow(String),
}

/// Failure of one item of a save action, tagged with the item's title.
#[derive(Debug, Error)]
#[error("saving '{item}' failed: {error}")]
pub struct SaveError {
    pub item: String,
    pub error: ExportError,
}

// ---------------------------------------------------------------------------
// Export seam
// ---------------------------------------------------------------------------

/// Something a save action can write to disk.
pub trait Exportable {
    /// Title shown in the save dialogs; also the batch file stem.
    fn title(&self) -> &str;
    fn export(&self, path: &Path) -> Result<(), ExportError>;
}

/// Save one item to `path`.
pub fn export_one(item: &dyn Exportable, path: &Path) -> Result<(), SaveError> {
    item.export(path).map_err(|error| SaveError {
        item: item.title().to_string(),
        error,
    })?;
    log::info!("Saved '{}' to {}", item.title(), path.display());
    Ok(())
}

/// Save every item into `dir` as `<title>.<extension>`, in order.
///
/// Stops at the first failure. Files written before it stay on disk and
/// later items are not attempted.
pub fn export_batch(
    items: &[&dyn Exportable],
    dir: &Path,
    extension: &str,
) -> Result<Vec<PathBuf>, SaveError> {
    let mut written = Vec::with_capacity(items.len());
    for item in items {
        let path = dir.join(format!("{}.{extension}", file_stem(item.title())));
        export_one(*item, &path)?;
        written.push(path);
    }
    Ok(written)
}

/// Replace characters that are not allowed in file names.
pub fn file_stem(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Table export
// ---------------------------------------------------------------------------

pub const TABLE_HEADER: [&str; 2] = ["two_theta", "intensity"];

/// Write a header row and one tab-separated row per point.
pub fn write_table<W: std::io::Write>(
    out: W,
    series: &CalibratedSeries,
) -> Result<(), ExportError> {
    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(out);
    writer.write_record(TABLE_HEADER)?;
    for (angle, intensity) in series.points() {
        writer.write_record([format_value(angle), format_value(intensity)])?;
    }
    writer.flush().map_err(|source| ExportError::Io {
        path: "<table>".into(),
        source,
    })?;
    Ok(())
}

pub fn save_table(path: &Path, series: &CalibratedSeries) -> Result<(), ExportError> {
    let file = std::fs::File::create(path).map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    write_table(std::io::BufWriter::new(file), series)
}

// ---------------------------------------------------------------------------
// Plot export
// ---------------------------------------------------------------------------

pub const EXPORT_DPI: u32 = 300;
/// Figure size in inches.
pub const FIGURE_SIZE: (u32, u32) = (5, 4);

/// Label font size, 10 pt at [`EXPORT_DPI`].
const FONT_SIZE: f32 = EXPORT_DPI as f32 * 10.0 / 72.0;
const X_LABEL: &str = "2θ, °";
const Y_LABEL: &str = "Intensity";
/// egui's bundled proportional face; covers Greek and the degree sign.
const LABEL_FONT: &str = "Ubuntu-Light";

/// One curve of an exported plot.
#[derive(Debug, Clone, Copy)]
pub struct PlotLine<'a> {
    pub series: &'a CalibratedSeries,
    pub rgb: [u8; 3],
}

struct Frame {
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
    x: (f64, f64),
    y: (f64, f64),
}

impl Frame {
    fn map(&self, x: f64, y: f64) -> (f32, f32) {
        let fx = (x - self.x.0) / (self.x.1 - self.x.0);
        let fy = (y - self.y.0) / (self.y.1 - self.y.0);
        (
            self.left + fx as f32 * (self.right - self.left),
            self.bottom - fy as f32 * (self.bottom - self.top),
        )
    }
}

/// Data range with 5% padding; never empty.
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    if hi - lo <= f64::EPSILON * lo.abs().max(1.0) {
        return (lo - 0.5, hi + 0.5);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

/// Tick positions at 1/2/5 × 10^k spacing, roughly `target` of them.
pub fn nice_ticks(lo: f64, hi: f64, target: usize) -> Vec<f64> {
    if !(hi > lo) || target == 0 {
        return Vec::new();
    }
    let raw = (hi - lo) / target as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw)
        .unwrap_or(10.0 * magnitude);
    let first = (lo / step).ceil() as i64;
    let last = (hi / step).floor() as i64;
    (first..=last).map(|k| k as f64 * step).collect()
}

/// Decimals needed to tell ticks `step` apart.
fn tick_label(value: f64, step: f64) -> String {
    let decimals = (-step.log10().floor()).max(0.0) as usize;
    format!("{value:.decimals$}")
}

/// Fonts for the text layer, loaded once from egui's bundled font data.
fn label_fonts() -> Arc<Database> {
    static FONTS: OnceLock<Arc<Database>> = OnceLock::new();
    FONTS
        .get_or_init(|| {
            let mut db = Database::new();
            let defs = FontDefinitions::default();
            match defs.font_data.get(LABEL_FONT) {
                Some(data) => db.load_font_data(data.font.to_vec()),
                None => log::warn!("font '{LABEL_FONT}' is not bundled; plot text is skipped"),
            }
            let family = db
                .faces()
                .next()
                .and_then(|face| face.families.first())
                .map(|(name, _)| name.clone());
            if let Some(family) = family {
                db.set_sans_serif_family(family);
            }
            Arc::new(db)
        })
        .clone()
}

/// Tick numbers under the x axis and both axis titles, as an SVG overlay.
fn text_layer(frame: &Frame, x_ticks: &[f64], tick_len: f32, width: u32, height: u32) -> String {
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" font-family="sans-serif" font-size="{FONT_SIZE}" fill="black">"#
    );
    let step = match x_ticks {
        [a, b, ..] => b - a,
        _ => 1.0,
    };
    let tick_baseline = frame.bottom + tick_len + FONT_SIZE * 1.1;
    for &x in x_ticks {
        let (px, _) = frame.map(x, frame.y.0);
        let _ = write!(
            svg,
            r#"<text x="{px}" y="{tick_baseline}" text-anchor="middle">{}</text>"#,
            tick_label(x, step)
        );
    }

    let centre_x = (frame.left + frame.right) / 2.0;
    let x_label_baseline = tick_baseline + FONT_SIZE * 1.3;
    let _ = write!(
        svg,
        r#"<text x="{centre_x}" y="{x_label_baseline}" text-anchor="middle">{X_LABEL}</text>"#
    );

    let centre_y = (frame.top + frame.bottom) / 2.0;
    let y_label_baseline = frame.left - FONT_SIZE * 0.6;
    let _ = write!(
        svg,
        r#"<text transform="translate({y_label_baseline} {centre_y}) rotate(-90)" text-anchor="middle">{Y_LABEL}</text>"#
    );
    svg.push_str("</svg>");
    svg
}

/// Rasterise curves at [`EXPORT_DPI`]: frame, x ticks with labels, axis
/// titles, no y ticks.
pub fn render_plot(lines: &[PlotLine<'_>]) -> Result<Pixmap, ExportError> {
    let width = FIGURE_SIZE.0 * EXPORT_DPI;
    let height = FIGURE_SIZE.1 * EXPORT_DPI;
    let mut pixmap = Pixmap::new(width, height).ok_or(ExportError::Canvas { width, height })?;
    pixmap.fill(Color::WHITE);

    let frame = Frame {
        left: width as f32 * 0.125,
        top: height as f32 * 0.11,
        right: width as f32 * 0.9,
        bottom: height as f32 * 0.88,
        x: padded_range(lines.iter().flat_map(|l| l.series.angle().iter().copied())),
        y: padded_range(lines.iter().flat_map(|l| l.series.intensity().iter().copied())),
    };

    let mut black = Paint::default();
    black.set_color_rgba8(0, 0, 0, 255);
    black.anti_alias = true;
    let axis = Stroke {
        width: 3.0,
        ..Stroke::default()
    };

    if let Some(rect) = Rect::from_ltrb(frame.left, frame.top, frame.right, frame.bottom) {
        let path = PathBuilder::from_rect(rect);
        pixmap.stroke_path(&path, &black, &axis, Transform::identity(), None);
    }

    let tick_len = EXPORT_DPI as f32 * 3.5 / 72.0;
    let x_ticks = nice_ticks(frame.x.0, frame.x.1, 6);
    let mut ticks = PathBuilder::new();
    for &x in &x_ticks {
        let (px, _) = frame.map(x, frame.y.0);
        ticks.move_to(px, frame.bottom);
        ticks.line_to(px, frame.bottom + tick_len);
    }
    if let Some(path) = ticks.finish() {
        pixmap.stroke_path(&path, &black, &axis, Transform::identity(), None);
    }

    let curve = Stroke {
        width: EXPORT_DPI as f32 * 1.5 / 72.0,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };
    for line in lines.iter().filter(|l| !l.series.is_empty()) {
        let mut paint = Paint::default();
        paint.set_color_rgba8(line.rgb[0], line.rgb[1], line.rgb[2], 255);
        paint.anti_alias = true;

        // Missing readings break the curve.
        let mut pb = PathBuilder::new();
        let mut pen_down = false;
        for (x, y) in line.series.points() {
            if !x.is_finite() || !y.is_finite() {
                pen_down = false;
                continue;
            }
            let (px, py) = frame.map(x, y);
            if pen_down {
                pb.line_to(px, py);
            } else {
                pb.move_to(px, py);
                pen_down = true;
            }
        }
        if let Some(path) = pb.finish() {
            pixmap.stroke_path(&path, &paint, &curve, Transform::identity(), None);
        }
    }

    let mut options = usvg::Options::default();
    options.fontdb = label_fonts();
    let svg = text_layer(&frame, &x_ticks, tick_len, width, height);
    let tree = usvg::Tree::from_str(&svg, &options)?;
    resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());

    Ok(pixmap)
}

/// Render and write a plot; the encoder follows the file extension.
pub fn save_plot(path: &Path, lines: &[PlotLine<'_>]) -> Result<(), ExportError> {
    let format = PlotFormat::from_path(path)
        .ok_or_else(|| ExportError::UnsupportedFormat(path.display().to_string()))?;
    let pixmap = render_plot(lines)?;
    let (width, height) = (pixmap.width(), pixmap.height());

    // The background is opaque, so premultiplied and straight RGBA agree.
    let rgba = image::RgbaImage::from_raw(width, height, pixmap.take())
        .ok_or(ExportError::Canvas { width, height })?;
    match format {
        PlotFormat::Png => rgba.save_with_format(path, format.image_format())?,
        PlotFormat::Jpeg => image::DynamicImage::ImageRgba8(rgba)
            .to_rgb8()
            .save_with_format(path, format.image_format())?,
    }
    Ok(())
}
