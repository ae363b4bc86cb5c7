mod app;
mod color;
mod data;
mod state;
mod ui;

use std::path::PathBuf;
use std::process::ExitCode;

use app::GtdExplorerApp;
use eframe::egui;
use state::AppState;

fn main() -> ExitCode {
    env_logger::init();

    // Optional dataset path: load at startup, fatal on failure (no partial
    // dashboard). Without it, the session starts empty and loads via the
    // File menu.
    let mut state = AppState::default();
    if let Some(path) = std::env::args().nth(1).map(PathBuf::from) {
        match data::loader::load_cached(&path) {
            Ok(dataset) => {
                state.source_path = Some(path);
                state.set_dataset(dataset);
            }
            Err(e) => {
                log::error!("{e}");
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        }
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 840.0])
            .with_min_inner_size([700.0, 480.0]),
        ..Default::default()
    };

    let result = eframe::run_native(
        "GTD Explorer – Incident Analytics",
        options,
        Box::new(|_cc| Ok(Box::new(GtdExplorerApp::with_state(state)))),
    );
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("eframe error: {e}");
            ExitCode::FAILURE
        }
    }
}
