use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use alphasat_viewer::data::events::flag_counts;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – dataset, day selection, statistics
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Dataset");
    ui.separator();

    ui.horizontal(|ui: &mut Ui| {
        ui.label("Name");
        ui.text_edit_singleline(&mut state.config.dataset);
    });
    ui.label(
        RichText::new(format!("Folder: {}", state.config.source_dir.display())).small(),
    );
    let events_label = match &state.config.events {
        Some(path) => format!("Events: {}", path.display()),
        None => "Events: none".to_string(),
    };
    ui.label(RichText::new(events_label).small());
    if ui.button("Load").clicked() {
        if let Err(e) = state.reload() {
            state.set_error(&e);
        }
    }
    ui.add_space(8.0);

    if state.processed.is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    // ---- Day selection ----
    ui.heading("Day");
    ui.separator();
    ui.horizontal(|ui: &mut Ui| {
        if ui.small_button("◀").clicked() {
            state.step_day(false);
        }
        let mut date = state.selected_date;
        if ui
            .add(DatePickerButton::new(&mut date).id_salt("day_picker"))
            .changed()
        {
            state.select_date(date);
        }
        if ui.small_button("▶").clicked() {
            state.step_day(true);
        }
    });

    ui.horizontal(|ui: &mut Ui| {
        ui.checkbox(&mut state.show_noise, "Noise");
        ui.checkbox(&mut state.show_filtered, "Filtered");
    });
    ui.add_space(8.0);

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Event days ----
            let header = format!("Event days  ({})", state.event_days.len());
            egui::CollapsingHeader::new(RichText::new(header).strong())
                .id_salt("event_days")
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    let days = state.event_days.clone();
                    for day in days {
                        let selected = day == state.selected_date;
                        if ui.selectable_label(selected, day.to_string()).clicked() {
                            state.select_date(day);
                        }
                    }
                });

            // ---- Statistics ----
            egui::CollapsingHeader::new(RichText::new("Statistics").strong())
                .id_salt("stats")
                .default_open(true)
                .show(ui, |ui: &mut Ui| stats_grid(ui, state));
        });
}

fn stats_grid(ui: &mut Ui, state: &AppState) {
    let Some(processed) = &state.processed else {
        return;
    };
    egui::Grid::new("stats_grid")
        .num_columns(5)
        .striped(true)
        .show(ui, |ui: &mut Ui| {
            ui.strong("ch");
            ui.strong("signal [dB]");
            ui.strong("noise [dB]");
            ui.strong("rain");
            ui.strong("failure");
            ui.end_row();

            for ch in &processed.channels {
                let s = &ch.stats;
                let [_, rain, failure] = flag_counts(&ch.series);
                ui.label(s.channel.to_string());
                ui.label(format!("{:.2} ± {:.2}", s.mean_signal, s.std_signal));
                ui.label(format!("{:.2} ± {:.2}", s.mean_noise, s.std_noise));
                ui.label(rain.to_string());
                ui.label(failure.to_string());
                ui.end_row();
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open data folder…").clicked() {
                open_folder_dialog(state);
                ui.close_menu();
            }
            if ui.button("Open event log…").clicked() {
                open_events_dialog(state);
                ui.close_menu();
            }
            if ui.button("Open configuration…").clicked() {
                open_config_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            if ui
                .add_enabled(state.figure.is_some(), egui::Button::new("Save day as PNG"))
                .clicked()
            {
                save_current(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(p) = &state.processed {
            ui.label(format!(
                "{}: {} channels, {} events",
                p.name,
                p.channels.len(),
                state.events.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

fn reload_or_report(state: &mut AppState) {
    if let Err(e) = state.reload() {
        state.set_error(&e);
    }
}

pub fn open_folder_dialog(state: &mut AppState) {
    let folder = rfd::FileDialog::new()
        .set_title("Open beacon data folder")
        .set_directory(&state.config.source_dir)
        .pick_folder();

    if let Some(dir) = folder {
        log::info!("Data folder set to {}", dir.display());
        state.config.source_dir = dir;
        reload_or_report(state);
    }
}

pub fn open_events_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open event log")
        .add_filter("Event logs", &["csv", "json"])
        .set_directory(&state.config.source_dir)
        .pick_file();

    if let Some(path) = file {
        log::info!("Event log set to {}", path.display());
        state.config.events = Some(path);
        reload_or_report(state);
    }
}

pub fn open_config_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open configuration")
        .add_filter("TOML", &["toml"])
        .pick_file();

    let Some(path) = file else {
        return;
    };
    match alphasat_viewer::Config::load(&path) {
        Ok(config) => {
            state.config = config;
            reload_or_report(state);
        }
        Err(e) => {
            let err = anyhow::Error::new(e).context(format!("Failed to read {}", path.display()));
            state.set_error(&err);
        }
    }
}

fn save_current(state: &mut AppState) {
    match state.save_current() {
        Ok(path) => {
            log::info!("Saved {}", path.display());
            state.status_message = None;
        }
        Err(e) => state.set_error(&e),
    }
}
