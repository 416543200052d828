mod app;
mod color;
mod data;
mod settings;
mod state;
mod ui;
mod windows;

use app::FishXApp;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("FishX")
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    log::info!("Starting FishX {}", env!("CARGO_PKG_VERSION"));
    eframe::run_native(
        "FishX",
        options,
        Box::new(|_cc| Ok(Box::new(FishXApp::default()))),
    )
}
