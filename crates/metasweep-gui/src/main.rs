//! metasweep GUI entry point.

mod app;
mod panels;

fn main() -> eframe::Result {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([900.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "metasweep",
        options,
        Box::new(|_cc| Ok(Box::new(app::MetasweepApp::default()))),
    )
}
