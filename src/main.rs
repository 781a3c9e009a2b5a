#![warn(clippy::all, rust_2018_idioms)]
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod config;
mod loader;
mod map;
mod ui;

#[cfg(not(target_arch = "wasm32"))]
fn main() -> eframe::Result<()> {
    env_logger::init();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(egui::vec2(1280.0, 820.0))
            .with_min_inner_size(egui::vec2(640.0, 420.0))
            .with_title("DeptoMap")
            .with_resizable(true),
        ..Default::default()
    };

    let config = config::Config::from_env();
    log::info!(
        "boundary source: {}, name field: {}",
        config.source,
        config.name_field
    );

    eframe::run_native(
        "DeptoMap",
        native_options,
        Box::new(|cc| Ok(Box::new(ui::app::DeptoMapApp::new(cc, config)))),
    )
}
