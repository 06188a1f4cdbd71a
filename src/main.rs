mod app;
mod state;
mod ui;

use std::path::Path;

use alphasat_viewer::Config;
use app::AlphasatApp;
use eframe::egui;
use state::AppState;

const DEFAULT_CONFIG: &str = "alphasat.toml";

fn main() -> eframe::Result {
    env_logger::init();

    // Same lookup as the batch renderer: first argument, then ./alphasat.toml.
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| Path::new(DEFAULT_CONFIG).is_file().then(|| DEFAULT_CONFIG.to_string()));
    let mut state = match config_path {
        Some(path) => match Config::load(Path::new(&path)) {
            Ok(config) => AppState::new(config),
            Err(e) => {
                let mut state = AppState::default();
                state.set_error(&anyhow::Error::new(e).context(format!("Failed to read config {path}")));
                state
            }
        },
        None => AppState::default(),
    };
    if state.status_message.is_none() && state.config.source_dir.is_dir() {
        if let Err(e) = state.reload() {
            state.set_error(&e);
        }
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 900.0])
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Alphasat Viewer – Beacon Receiver Data",
        options,
        Box::new(|_cc| Ok(Box::new(AlphasatApp::new(state)))),
    )
}
