use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::export;
use crate::data::filter::Outcome;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let dataset = match &state.dataset {
        Some(ds) => ds.clone(),
        None => {
            ui.label("No dataset loaded.");
            return;
        }
    };

    // Edit a copy; apply_criteria only recomputes when something changed.
    let mut criteria = state.criteria.clone();
    let (year_min, year_max) = dataset.year_range;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.strong("Time period");
            ui.add(
                egui::Slider::new(&mut criteria.year_lo, year_min..=year_max).text("From"),
            );
            ui.add(
                egui::Slider::new(&mut criteria.year_hi, year_min..=year_max).text("To"),
            );
            ui.separator();

            ui.strong("Region");
            let region_label = criteria.region.clone().unwrap_or_else(|| "All Regions".into());
            egui::ComboBox::from_id_salt("region")
                .selected_text(region_label)
                .width(ui.available_width() - 8.0)
                .show_ui(ui, |ui: &mut Ui| {
                    if ui
                        .selectable_label(criteria.region.is_none(), "All Regions")
                        .clicked()
                    {
                        criteria.region = None;
                        criteria.country = None;
                    }
                    for region in &dataset.regions {
                        let selected = criteria.region.as_deref() == Some(region);
                        if ui.selectable_label(selected, region).clicked() && !selected {
                            criteria.region = Some(region.clone());
                            // Candidate countries change with the region.
                            criteria.country = None;
                        }
                    }
                });

            ui.strong("Country");
            let countries = dataset.countries_in_region(criteria.region.as_deref());
            let country_label = criteria
                .country
                .clone()
                .unwrap_or_else(|| "All Countries".into());
            egui::ComboBox::from_id_salt("country")
                .selected_text(country_label)
                .width(ui.available_width() - 8.0)
                .show_ui(ui, |ui: &mut Ui| {
                    if ui
                        .selectable_label(criteria.country.is_none(), "All Countries")
                        .clicked()
                    {
                        criteria.country = None;
                    }
                    for country in &countries {
                        let selected = criteria.country.as_deref() == Some(country);
                        if ui.selectable_label(selected, country).clicked() {
                            criteria.country = Some(country.clone());
                        }
                    }
                });

            ui.strong("Attack type");
            let attack_label = criteria
                .attack_type
                .clone()
                .unwrap_or_else(|| "All Types".into());
            egui::ComboBox::from_id_salt("attack_type")
                .selected_text(attack_label)
                .width(ui.available_width() - 8.0)
                .show_ui(ui, |ui: &mut Ui| {
                    if ui
                        .selectable_label(criteria.attack_type.is_none(), "All Types")
                        .clicked()
                    {
                        criteria.attack_type = None;
                    }
                    for attack_type in &dataset.attack_types {
                        let selected = criteria.attack_type.as_deref() == Some(attack_type);
                        if ui.selectable_label(selected, attack_type).clicked() {
                            criteria.attack_type = Some(attack_type.clone());
                        }
                    }
                });
            ui.separator();

            ui.strong("Attack outcome");
            for outcome in Outcome::ALL {
                ui.radio_value(&mut criteria.outcome, outcome, outcome.label());
            }
            ui.separator();

            // ---- Database info ----
            ui.strong("Database info");
            let summary = dataset.summary();
            ui.label(format!("Records: {}", summary.record_count));
            ui.label(format!(
                "Years: {} – {}",
                summary.year_range.0, summary.year_range.1
            ));
            ui.label(format!("Countries: {}", summary.country_count));
            ui.label(format!("Groups: {}", summary.group_count));
        });

    state.apply_criteria(criteria);
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            let has_view = state.view.is_some();
            if ui
                .add_enabled(has_view, egui::Button::new("Export filtered CSV…"))
                .clicked()
            {
                export_filtered_csv(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(has_view, egui::Button::new("Export summary stats…"))
                .clicked()
            {
                export_summary_csv(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(ds), Some(view)) = (&state.dataset, &state.view) {
            ui.label(format!(
                "{} incidents loaded, {} matching",
                ds.len(),
                view.len()
            ));
            if let Some(name) = state
                .source_path
                .as_ref()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
            {
                ui.separator();
                ui.label(name);
            }
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

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open incident data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.load_from_path(&path);
    }
}

fn export_filtered_csv(state: &mut AppState) {
    let Some(view) = &state.view else { return };
    match export::filtered_view_csv(view) {
        Ok(csv) => save_text_file(state, "filtered_incidents.csv", &csv),
        Err(e) => {
            log::error!("export failed: {e:#}");
            state.status_message = Some(format!("Export error: {e:#}"));
        }
    }
}

fn export_summary_csv(state: &mut AppState) {
    let Some(aggregates) = &state.aggregates else {
        return;
    };
    match export::summary_stats_csv(&aggregates.summary) {
        Ok(csv) => save_text_file(state, "summary_stats.csv", &csv),
        Err(e) => {
            log::error!("export failed: {e:#}");
            state.status_message = Some(format!("Export error: {e:#}"));
        }
    }
}

fn save_text_file(state: &mut AppState, suggested_name: &str, contents: &str) {
    let file = rfd::FileDialog::new()
        .set_title("Save CSV")
        .set_file_name(suggested_name)
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        match std::fs::write(&path, contents) {
            Ok(()) => {
                log::info!("wrote {}", path.display());
                state.status_message = None;
            }
            Err(e) => {
                log::error!("failed to write {}: {e}", path.display());
                state.status_message = Some(format!("Error: {e}"));
            }
        }
    }
}
