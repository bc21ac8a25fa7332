use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::state::{AppState, FileTab};
use crate::view::Projection;

// ---------------------------------------------------------------------------
// Right side panel – view controls for the active tab
// ---------------------------------------------------------------------------

/// Render projection, trace, frequency and marker controls.
pub fn control_panel(ui: &mut Ui, state: &mut AppState) {
    let Some(tab) = state.active_tab_mut() else {
        ui.heading("Controls");
        ui.separator();
        ui.label("No file open.");
        return;
    };

    ui.heading(tab.dataset.filename.as_str());
    ui.label(format!(
        "{} port(s), {} samples",
        tab.dataset.port_count(),
        tab.dataset.sample_count()
    ));
    ui.separator();

    // ---- Projection ----
    ui.strong("Plot");
    for projection in Projection::ALL {
        if ui
            .radio(tab.config.projection() == projection, projection.to_string())
            .clicked()
        {
            tab.set_projection(projection);
        }
    }
    ui.separator();

    // ---- Frequency range ----
    let mut range_error = None;
    ui.strong("Frequency Range (Hz)");
    egui::Grid::new("freq_range").num_columns(2).show(ui, |ui: &mut Ui| {
        ui.label("Min:");
        ui.text_edit_singleline(&mut tab.freq_min_text);
        ui.end_row();
        ui.label("Max:");
        ui.text_edit_singleline(&mut tab.freq_max_text);
        ui.end_row();
    });
    if ui.button("Apply").clicked() {
        range_error = tab.apply_frequency_text().err();
    }
    ui.separator();

    // ---- Markers ----
    ui.horizontal(|ui: &mut Ui| {
        ui.strong(format!("Markers ({})", tab.markers.len()));
        if ui.small_button("Clear").clicked() {
            tab.clear_markers();
        }
    });
    ui.label(RichText::new("Click a point to add, right-click to clear.").small());
    ui.separator();

    // ---- Visible traces ----
    trace_list(ui, tab);

    if let Some(e) = range_error {
        state.status_message = Some(format!("Invalid frequency: {e}"));
    }
}

fn trace_list(ui: &mut Ui, tab: &mut FileTab) {
    ui.horizontal(|ui: &mut Ui| {
        ui.strong("Visible Traces");
        if ui.small_button("All").clicked() {
            tab.show_all_traces();
        }
        if ui.small_button("None").clicked() {
            tab.hide_all_traces();
        }
    });

    let names = tab.dataset.parameter_names().to_vec();
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for name in &names {
                let mut checked = tab.config.visible_traces().contains(name);
                let text = RichText::new(name).color(tab.colors.color_for(name));
                if ui.checkbox(&mut checked, text).changed() {
                    tab.set_trace_visible(name, checked);
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu, the tab strip and the status line.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let has_tab = state.active_tab().is_some();
            if ui.add_enabled(has_tab, egui::Button::new("Close tab")).clicked() {
                state.close_tab(state.active);
                ui.close_menu();
            }
        });

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
            if ui.small_button("✕").clicked() {
                state.status_message = None;
            }
        }
    });

    if state.tabs.is_empty() {
        return;
    }
    ui.horizontal_wrapped(|ui: &mut Ui| {
        let mut close = None;
        for (i, tab) in state.tabs.iter().enumerate() {
            if ui
                .selectable_label(i == state.active, tab.dataset.filename.as_str())
                .clicked()
            {
                state.active = i;
            }
            if ui.small_button("✕").on_hover_text("Close").clicked() {
                close = Some(i);
            }
            ui.separator();
        }
        if let Some(i) = close {
            state.close_tab(i);
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open Touchstone File")
        .add_filter(
            "Touchstone files",
            &["s1p", "s2p", "s3p", "s4p", "snp", "ts"],
        )
        .add_filter("All files", &["*"])
        .pick_file();

    if let Some(path) = file {
        state.open_path(&path);
    }
}
