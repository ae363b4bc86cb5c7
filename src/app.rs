use eframe::egui;

use crate::state::AppState;
use crate::ui::{charts, panels};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct GtdExplorerApp {
    pub state: AppState,
}

impl GtdExplorerApp {
    pub fn with_state(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for GtdExplorerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: KPI strip + tabbed charts ----
        egui::CentralPanel::default().show(ctx, |ui| {
            charts::central_panel(ui, &mut self.state);
        });
    }
}
