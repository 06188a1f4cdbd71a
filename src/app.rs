use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct AlphasatApp {
    pub state: AppState,
}

impl AlphasatApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for AlphasatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: dataset, day and statistics ----
        egui::SidePanel::left("day_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: day plot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::day_plot(ui, &self.state);
        });
    }
}
