use eframe::egui::Ui;
use egui_plot::{Legend, Line, Plot, PlotPoints};

use crate::windows::PlotView;

// ---------------------------------------------------------------------------
// Plot sub-window
// ---------------------------------------------------------------------------

/// Angle vs. intensity, one line per layer.
pub fn plot_view(ui: &mut Ui, id: u64, view: &PlotView) {
    let mut plot = Plot::new(("plot_view", id))
        .x_axis_label("2θ, °")
        .y_axis_label("Intensity")
        .y_axis_formatter(|_, _| String::new())
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true);
    if view.layers.len() > 1 {
        plot = plot.legend(Legend::default());
    }

    plot.show(ui, |plot_ui| {
        for layer in &view.layers {
            let points: PlotPoints = layer.series.points().map(|(x, y)| [x, y]).collect();
            let line = Line::new(points)
                .name(&layer.name)
                .color(layer.color)
                .width(1.5);
            plot_ui.line(line);
        }
    });
}
