use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct SParamViewerApp {
    pub state: AppState,
}

impl eframe::App for SParamViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar + tab strip ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Right side panel: view controls ----
        egui::SidePanel::right("control_panel")
            .default_width(220.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::control_panel(ui, &mut self.state);
            });

        self.state.surface_render_error();

        // ---- Central panel: plot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(tab) = self.state.active_tab_mut() else {
                ui.centered_and_justified(|ui| {
                    ui.heading("Open a Touchstone file to view S-parameters  (File → Open…)");
                });
                return;
            };
            if let Err(e) = plot::sparam_plot(ui, tab) {
                log::warn!("Ignoring stale pick: {e}");
                self.state.status_message = Some(e.to_string());
            }
        });
    }
}
