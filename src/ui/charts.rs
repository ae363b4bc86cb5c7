use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use eframe::egui::{self, Color32, Frame, RichText, ScrollArea, Ui};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, GridMark, Legend, Line, Plot, PlotPoints, Points,
};
use egui_extras::{Column, TableBuilder};

use crate::data::aggregate::{Aggregates, GroupRow, Kpis};
use crate::state::{AppState, Tab};

// ---------------------------------------------------------------------------
// Central panel: KPI strip + tab pages
// ---------------------------------------------------------------------------

/// Render the central dashboard panel.
pub fn central_panel(ui: &mut Ui, state: &mut AppState) {
    if state.view.is_none() || state.aggregates.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open an incident file to explore it  (File → Open…)");
        });
        return;
    }
    let view_len = state.view.as_ref().map(|v| v.len()).unwrap_or(0);

    kpi_strip(ui, &aggregates(state).kpis);
    ui.separator();

    ui.horizontal(|ui: &mut Ui| {
        for tab in Tab::ALL {
            if ui.selectable_label(state.tab == tab, tab.label()).clicked() {
                state.tab = tab;
            }
        }
    });
    ui.separator();

    if view_len == 0 {
        ui.label("No incidents match the current filters.");
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| match state.tab {
            Tab::Trends => trends_tab(ui, state),
            Tab::Map => map_tab(ui, state),
            Tab::Attacks => attacks_tab(ui, state),
            Tab::Groups => groups_tab(ui, state),
            Tab::Insights => insights_tab(ui, state),
            Tab::Data => data_tab(ui, state),
        });
}

fn kpi_strip(ui: &mut Ui, kpis: &Kpis) {
    let metrics = [
        ("Total attacks", format!("{}", kpis.attacks)),
        ("Total killed", format!("{:.0}", kpis.killed)),
        ("Total wounded", format!("{:.0}", kpis.wounded)),
        ("Total casualties", format!("{:.0}", kpis.casualties)),
        (
            "Success rate",
            kpis.success_rate_pct
                .map(|r| format!("{r:.1}%"))
                .unwrap_or_else(|| "no data".into()),
        ),
    ];
    ui.columns(metrics.len(), |cols| {
        for (col, (label, value)) in cols.iter_mut().zip(metrics) {
            col.vertical_centered(|ui: &mut Ui| {
                ui.label(RichText::new(value).strong().size(20.0));
                ui.small(label);
            });
        }
    });
}

fn aggregates(state: &AppState) -> &Aggregates {
    state.aggregates.as_ref().expect("aggregates present")
}

// ---------------------------------------------------------------------------
// Tab 1: Trends
// ---------------------------------------------------------------------------

fn trends_tab(ui: &mut Ui, state: &AppState) {
    let agg = aggregates(state);

    ui.columns(2, |cols| {
        // ---- Attacks over time ----
        cols[0].strong("Attacks over time");
        let points: PlotPoints = agg
            .yearly
            .iter()
            .map(|row| [row.year as f64, row.attacks as f64])
            .collect();
        Plot::new("yearly_attacks")
            .height(220.0)
            .x_axis_label("Year")
            .y_axis_label("Attacks")
            .show(&mut cols[0], |plot_ui| {
                plot_ui.line(Line::new(points).color(Color32::LIGHT_BLUE).width(2.0));
            });

        // ---- Casualties over time ----
        cols[1].strong("Casualties over time");
        let killed: Vec<Bar> = agg
            .yearly
            .iter()
            .map(|row| Bar::new(row.year as f64, row.killed))
            .collect();
        let wounded: PlotPoints = agg
            .yearly
            .iter()
            .map(|row| [row.year as f64, row.wounded])
            .collect();
        Plot::new("yearly_casualties")
            .height(220.0)
            .legend(Legend::default())
            .x_axis_label("Year")
            .show(&mut cols[1], |plot_ui| {
                plot_ui.bar_chart(BarChart::new(killed).color(Color32::LIGHT_BLUE).name("Killed"));
                plot_ui.line(
                    Line::new(wounded)
                        .color(Color32::LIGHT_GREEN)
                        .width(2.0)
                        .name("Wounded"),
                );
            });
    });

    // ---- Attacks by region over time (only without a region filter) ----
    if let Some(timeline) = &agg.regional_timeline {
        ui.strong("Attacks by region over time");
        let mut by_region: BTreeMap<&str, Vec<[f64; 2]>> = BTreeMap::new();
        for row in timeline {
            by_region
                .entry(row.region.as_str())
                .or_default()
                .push([row.year as f64, row.attacks as f64]);
        }
        Plot::new("regional_timeline")
            .height(240.0)
            .legend(Legend::default())
            .x_axis_label("Year")
            .y_axis_label("Attacks")
            .show(ui, |plot_ui| {
                for (region, points) in by_region {
                    plot_ui.line(
                        Line::new(PlotPoints::from(points))
                            .color(state.region_colors.color_for(region))
                            .name(region),
                    );
                }
            });
    }

    ui.columns(2, |cols| {
        // ---- Monthly pattern ----
        cols[0].strong("Monthly pattern");
        let bars: Vec<Bar> = agg
            .monthly
            .iter()
            .map(|row| Bar::new(row.month as f64, row.attacks as f64).name(row.name))
            .collect();
        Plot::new("monthly_pattern")
            .height(220.0)
            .x_axis_formatter(|mark: GridMark, _range: &RangeInclusive<f64>| {
                month_tick_label(mark.value)
            })
            .y_axis_label("Attacks")
            .show(&mut cols[0], |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).color(Color32::LIGHT_BLUE));
            });

        // ---- Attacks by decade ----
        cols[1].strong("Attacks by decade");
        let labels: Vec<String> = agg.decades.iter().map(|d| d.label.clone()).collect();
        let bars: Vec<Bar> = agg
            .decades
            .iter()
            .enumerate()
            .map(|(i, d)| Bar::new(i as f64, d.attacks as f64).name(&d.label))
            .collect();
        Plot::new("decades")
            .height(220.0)
            .x_axis_formatter(move |mark: GridMark, _range: &RangeInclusive<f64>| {
                index_tick_label(&labels, mark.value)
            })
            .y_axis_label("Attacks")
            .show(&mut cols[1], |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).color(Color32::LIGHT_BLUE));
            });
    });
}

// ---------------------------------------------------------------------------
// Tab 2: Map
// ---------------------------------------------------------------------------

fn map_tab(ui: &mut Ui, state: &AppState) {
    let agg = aggregates(state);

    ui.strong("Attack locations");
    if agg.geo.len() == crate::data::aggregate::GEO_SAMPLE_MAX {
        ui.small("Showing a 5,000-point sample for performance");
    }
    let mut by_type: BTreeMap<&str, Vec<[f64; 2]>> = BTreeMap::new();
    for point in &agg.geo {
        by_type
            .entry(point.attack_type.as_str())
            .or_default()
            .push([point.longitude, point.latitude]);
    }
    Plot::new("geo_scatter")
        .height(320.0)
        .legend(Legend::default())
        .x_axis_label("Longitude")
        .y_axis_label("Latitude")
        .data_aspect(1.0)
        .show(ui, |plot_ui| {
            for (attack_type, points) in by_type {
                plot_ui.points(
                    Points::new(PlotPoints::from(points))
                        .radius(1.5)
                        .color(state.attack_type_colors.color_for(attack_type))
                        .name(attack_type),
                );
            }
        });

    ui.columns(2, |cols| {
        cols[0].strong("Top 15 countries by attacks");
        ranked_bars(
            &mut cols[0],
            "top_countries_attacks",
            agg.top_countries_by_attacks
                .iter()
                .map(|c| (c.country.clone(), c.attacks as f64)),
            Color32::LIGHT_BLUE,
        );

        cols[1].strong("Top 15 countries by fatalities");
        ranked_bars(
            &mut cols[1],
            "top_countries_killed",
            agg.top_countries_by_killed
                .iter()
                .map(|c| (c.country.clone(), c.killed)),
            Color32::from_rgb(64, 180, 170),
        );
    });

    // Choropleth stand-in: the full per-country count table.
    ui.strong("Attacks by country");
    ScrollArea::vertical()
        .id_salt("country_counts")
        .max_height(200.0)
        .show(ui, |ui: &mut Ui| {
            egui::Grid::new("country_grid").striped(true).show(ui, |ui: &mut Ui| {
                ui.strong("Country");
                ui.strong("Attacks");
                ui.strong("Killed");
                ui.end_row();
                for row in &agg.countries {
                    ui.label(&row.country);
                    ui.label(row.attacks.to_string());
                    ui.label(format!("{:.0}", row.killed));
                    ui.end_row();
                }
            });
        });
}

// ---------------------------------------------------------------------------
// Tab 3: Attacks
// ---------------------------------------------------------------------------

fn attacks_tab(ui: &mut Ui, state: &AppState) {
    let agg = aggregates(state);

    ui.columns(2, |cols| {
        cols[0].strong("Attack type distribution");
        ranked_bars(
            &mut cols[0],
            "attack_type_counts",
            agg.attack_types
                .iter()
                .map(|t| (t.attack_type.clone(), t.attacks as f64)),
            Color32::LIGHT_BLUE,
        );

        cols[1].strong("Top 10 target types");
        ranked_bars(
            &mut cols[1],
            "target_types",
            agg.targets
                .iter()
                .map(|t| (t.target_type.clone(), t.attacks as f64)),
            Color32::from_rgb(64, 180, 170),
        );
    });

    // ---- Success rate vs lethality ----
    ui.strong("Success rate vs lethality (one point per attack type)");
    Plot::new("attack_efficiency")
        .height(240.0)
        .legend(Legend::default())
        .x_axis_label("Success rate (%)")
        .y_axis_label("Avg killed per attack")
        .show(ui, |plot_ui| {
            for row in &agg.attack_efficiency {
                let Some(avg_killed) = row.avg_killed else {
                    continue;
                };
                plot_ui.points(
                    Points::new(PlotPoints::from(vec![[row.success_rate_pct, avg_killed]]))
                        .radius((2.0 + (row.attacks as f64).ln().max(0.0)) as f32)
                        .color(state.attack_type_colors.color_for(&row.attack_type))
                        .name(&row.attack_type),
                );
            }
        });

    // ---- Casualty distribution (95th-percentile clipped) ----
    ui.strong("Casualty distribution by attack type (top 5% clipped)");
    let boxes: Vec<BoxElem> = agg
        .lethality
        .iter()
        .enumerate()
        .filter_map(|(i, series)| {
            box_elem(i as f64, &series.values).map(|b| {
                b.name(&series.attack_type)
                    .fill(state.attack_type_colors.color_for(&series.attack_type))
            })
        })
        .collect();
    let labels: Vec<String> = agg
        .lethality
        .iter()
        .map(|s| s.attack_type.clone())
        .collect();
    Plot::new("lethality_box")
        .height(260.0)
        .x_axis_formatter(move |mark: GridMark, _range: &RangeInclusive<f64>| {
            index_tick_label(&labels, mark.value)
        })
        .y_axis_label("Killed")
        .show(ui, |plot_ui| {
            plot_ui.box_plot(BoxPlot::new(boxes));
        });
}

// ---------------------------------------------------------------------------
// Tab 4: Groups
// ---------------------------------------------------------------------------

fn groups_tab(ui: &mut Ui, state: &AppState) {
    let agg = aggregates(state);

    ui.columns(2, |cols| {
        cols[0].strong("Top 15 most active groups");
        ranked_bars(
            &mut cols[0],
            "groups_by_attacks",
            agg.top_groups_by_attacks
                .iter()
                .map(|g| (g.group.clone(), g.attacks as f64)),
            Color32::LIGHT_BLUE,
        );

        cols[1].strong("Top 15 deadliest groups");
        ranked_bars(
            &mut cols[1],
            "groups_by_killed",
            agg.top_groups_by_killed
                .iter()
                .map(|g| (g.group.clone(), g.killed)),
            Color32::from_rgb(64, 180, 170),
        );
    });

    ui.strong("Top 5 groups activity timeline");
    let mut by_group: BTreeMap<&str, Vec<[f64; 2]>> = BTreeMap::new();
    for row in &agg.group_timeline {
        by_group
            .entry(row.group.as_str())
            .or_default()
            .push([row.year as f64, row.attacks as f64]);
    }
    Plot::new("group_timeline")
        .height(240.0)
        .legend(Legend::default())
        .x_axis_label("Year")
        .y_axis_label("Attacks")
        .show(ui, |plot_ui| {
            for (group, points) in by_group {
                plot_ui.line(
                    Line::new(PlotPoints::from(points))
                        .color(state.group_colors.color_for(group))
                        .name(group),
                );
            }
        });

    // ---- Activity spans ----
    ui.strong("Group activity spans");
    egui::Grid::new("group_spans").striped(true).show(ui, |ui: &mut Ui| {
        ui.strong("Group");
        ui.strong("Attacks");
        ui.strong("Killed");
        ui.strong("Wounded");
        ui.strong("Active");
        ui.strong("Years");
        ui.end_row();
        for g in &agg.top_groups_by_attacks {
            group_span_row(ui, g);
        }
    });
}

fn group_span_row(ui: &mut Ui, g: &GroupRow) {
    ui.label(&g.group);
    ui.label(g.attacks.to_string());
    ui.label(format!("{:.0}", g.killed));
    ui.label(format!("{:.0}", g.wounded));
    ui.label(format!("{} – {}", g.first_year, g.last_year));
    ui.label(g.years_active.to_string());
    ui.end_row();
}

// ---------------------------------------------------------------------------
// Tab 5: Insights
// ---------------------------------------------------------------------------

fn insights_tab(ui: &mut Ui, state: &AppState) {
    let agg = aggregates(state);

    // ---- Region × attack-type heatmap ----
    ui.strong("Region × attack type frequency");
    let max_count = agg
        .crosstab
        .counts
        .iter()
        .flatten()
        .copied()
        .max()
        .unwrap_or(0)
        .max(1) as f32;
    ScrollArea::horizontal()
        .id_salt("crosstab")
        .show(ui, |ui: &mut Ui| {
            egui::Grid::new("crosstab_grid").show(ui, |ui: &mut Ui| {
                ui.label("");
                for attack_type in &agg.crosstab.attack_types {
                    ui.small(attack_type);
                }
                ui.end_row();
                for (ri, region) in agg.crosstab.regions.iter().enumerate() {
                    ui.small(region);
                    for count in &agg.crosstab.counts[ri] {
                        let t = *count as f32 / max_count;
                        heat_cell(ui, heat_color(t), &count.to_string());
                    }
                    ui.end_row();
                }
            });
        });

    ui.columns(2, |cols| {
        cols[0].strong("Success rate by region");
        ranked_bars_presorted(
            &mut cols[0],
            "region_success",
            &agg.region_success,
            Color32::from_rgb(64, 180, 170),
        );

        cols[1].strong("Avg fatalities per attack by region");
        ranked_bars_presorted(
            &mut cols[1],
            "region_lethality",
            &agg.region_lethality,
            Color32::LIGHT_BLUE,
        );
    });

    // ---- Correlation matrix ----
    ui.strong("Variable correlations");
    egui::Grid::new("correlation_grid").show(ui, |ui: &mut Ui| {
        ui.label("");
        for label in agg.correlation.labels {
            ui.small(label);
        }
        ui.end_row();
        for (i, label) in agg.correlation.labels.iter().enumerate() {
            ui.small(*label);
            for cell in agg.correlation.cells[i] {
                match cell {
                    Some(r) => heat_cell(ui, corr_color(r), &format!("{r:.2}")),
                    None => heat_cell(ui, Color32::DARK_GRAY, "–"),
                }
            }
            ui.end_row();
        }
    });

    // ---- Summary statistics ----
    ui.strong("Summary statistics");
    let s = &agg.summary;
    ui.columns(3, |cols| {
        cols[0].label("Averages");
        cols[0].small(format!("Killed per attack: {}", fmt_opt(s.avg_killed, 2)));
        cols[0].small(format!("Wounded per attack: {}", fmt_opt(s.avg_wounded, 2)));
        cols[0].small(format!(
            "Success rate: {}",
            s.success_rate_pct
                .map(|r| format!("{r:.1}%"))
                .unwrap_or_else(|| "no data".into())
        ));

        cols[1].label("Maximums");
        cols[1].small(format!("Deadliest attack: {}", fmt_opt(s.max_killed, 0)));
        cols[1].small(format!("Most wounded: {}", fmt_opt(s.max_wounded, 0)));
        cols[1].small(format!(
            "Peak year: {}",
            s.peak_year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "no data".into())
        ));

        cols[2].label("Top categories");
        cols[2].small(format!(
            "Most attacks: {}",
            s.top_country.as_deref().unwrap_or("no data")
        ));
        cols[2].small(format!(
            "Common type: {}",
            s.top_attack_type.as_deref().unwrap_or("no data")
        ));
        cols[2].small(format!(
            "Common target: {}",
            s.top_target_type.as_deref().unwrap_or("no data")
        ));
    });
}

// ---------------------------------------------------------------------------
// Tab 6: Data
// ---------------------------------------------------------------------------

/// Rows shown in the data explorer before truncation.
const DATA_TAB_ROW_CAP: usize = 1000;

fn data_tab(ui: &mut Ui, state: &AppState) {
    let Some(view) = &state.view else { return };
    let dataset = view.dataset();

    let pct_of_total = if dataset.is_empty() {
        0.0
    } else {
        view.len() as f64 / dataset.len() as f64 * 100.0
    };
    ui.horizontal(|ui: &mut Ui| {
        ui.label(format!("Rows: {}", view.len()));
        ui.separator();
        ui.label(format!("% of total: {pct_of_total:.1}%"));
        ui.separator();
        ui.label("Export via File → Export filtered CSV…");
    });

    // Newest years first, stable within a year, capped for display.
    let mut order: Vec<usize> = view.indices().to_vec();
    order.sort_by_key(|&i| std::cmp::Reverse(dataset.records[i].year));
    order.truncate(DATA_TAB_ROW_CAP);

    let columns = [
        "year", "month", "country", "city", "region", "attack_type", "target_type",
        "group_name", "nkill", "nwound", "success",
    ];
    TableBuilder::new(ui)
        .striped(true)
        .columns(Column::auto().resizable(true), columns.len())
        .header(20.0, |mut header| {
            for col in columns {
                header.col(|ui: &mut Ui| {
                    ui.strong(col);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, order.len(), |mut row| {
                let rec = &dataset.records[order[row.index()]];
                row.col(|ui: &mut Ui| {
                    ui.label(rec.year.to_string());
                });
                row.col(|ui: &mut Ui| {
                    ui.label(rec.month.to_string());
                });
                row.col(|ui: &mut Ui| {
                    ui.label(&rec.country);
                });
                row.col(|ui: &mut Ui| {
                    ui.label(rec.city.as_deref().unwrap_or(""));
                });
                row.col(|ui: &mut Ui| {
                    ui.label(&rec.region);
                });
                row.col(|ui: &mut Ui| {
                    ui.label(&rec.attack_type);
                });
                row.col(|ui: &mut Ui| {
                    ui.label(rec.target_type.as_deref().unwrap_or(""));
                });
                row.col(|ui: &mut Ui| {
                    ui.label(&rec.group_name);
                });
                row.col(|ui: &mut Ui| {
                    ui.label(fmt_cell(rec.nkill));
                });
                row.col(|ui: &mut Ui| {
                    ui.label(fmt_cell(rec.nwound));
                });
                row.col(|ui: &mut Ui| {
                    ui.label(if rec.success { "1" } else { "0" });
                });
            });
        });
}

// ---------------------------------------------------------------------------
// Shared chart helpers
// ---------------------------------------------------------------------------

/// Horizontal ranked bar chart: largest value at the top, category names on
/// the y axis.
fn ranked_bars(ui: &mut Ui, id: &str, rows: impl Iterator<Item = (String, f64)>, color: Color32) {
    let rows: Vec<(String, f64)> = rows.collect();
    ranked_bars_presorted(ui, id, &rows, color);
}

fn ranked_bars_presorted(ui: &mut Ui, id: &str, rows: &[(String, f64)], color: Color32) {
    // Reverse so the first (largest, for ranked tables) entry gets the
    // highest y position.
    let n = rows.len();
    let labels: Vec<String> = rows.iter().rev().map(|(l, _)| l.clone()).collect();
    let bars: Vec<Bar> = rows
        .iter()
        .rev()
        .enumerate()
        .map(|(i, (label, value))| Bar::new(i as f64, *value).name(label))
        .collect();

    Plot::new(id.to_string())
        .height((40 + n * 18) as f32)
        .y_axis_formatter(move |mark: GridMark, _range: &RangeInclusive<f64>| {
            index_tick_label(&labels, mark.value)
        })
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).horizontal().color(color));
        });
}

/// Tick label for category axes: only integer positions get a name.
fn index_tick_label(labels: &[String], value: f64) -> String {
    let rounded = value.round();
    if (value - rounded).abs() > 0.01 || rounded < 0.0 {
        return String::new();
    }
    labels
        .get(rounded as usize)
        .cloned()
        .unwrap_or_default()
}

fn month_tick_label(value: f64) -> String {
    let rounded = value.round();
    if (value - rounded).abs() > 0.01 {
        return String::new();
    }
    let month = rounded as i64;
    if (1..=12).contains(&month) {
        crate::data::aggregate::MONTH_NAMES[(month - 1) as usize].to_string()
    } else {
        String::new()
    }
}

/// Five-number box from ascending values; `None` when the series is empty.
fn box_elem(x: f64, sorted: &[f64]) -> Option<BoxElem> {
    let at = |q: f64| -> f64 {
        let pos = q * (sorted.len() - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = pos.ceil() as usize;
        sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
    };
    if sorted.is_empty() {
        return None;
    }
    Some(BoxElem::new(
        x,
        BoxSpread::new(sorted[0], at(0.25), at(0.5), at(0.75), sorted[sorted.len() - 1]),
    ))
}

fn heat_cell(ui: &mut Ui, fill: Color32, text: &str) {
    Frame::new()
        .fill(fill)
        .inner_margin(egui::Margin::same(4))
        .show(ui, |ui: &mut Ui| {
            ui.label(RichText::new(text).color(Color32::WHITE).small());
        });
}

/// 0..1 → dark-to-light blue.
fn heat_color(t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    Color32::from_rgb(
        (25.0 + 70.0 * t) as u8,
        (50.0 + 120.0 * t) as u8,
        (90.0 + 160.0 * t) as u8,
    )
}

/// -1..1 → red through dark to blue.
fn corr_color(r: f64) -> Color32 {
    let r = r.clamp(-1.0, 1.0) as f32;
    if r >= 0.0 {
        Color32::from_rgb(30, (40.0 + 80.0 * r) as u8, (60.0 + 180.0 * r) as u8)
    } else {
        Color32::from_rgb((60.0 - 180.0 * r) as u8, 40, 50)
    }
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{v:.decimals$}"))
        .unwrap_or_else(|| "no data".into())
}

fn fmt_cell(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.0}")).unwrap_or_default()
}
