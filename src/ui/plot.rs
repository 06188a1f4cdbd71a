use eframe::egui::{Color32, Stroke, Ui};
use egui_plot::{GridMark, Legend, Line, Plot, PlotPoints, Polygon};

use alphasat_viewer::color::{Rgb, SHADE_ALPHA};
use alphasat_viewer::data::segments::Segment;
use alphasat_viewer::render::figure::{finite_runs, hour_label, DayFigure, Panel};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Day plot (central panel)
// ---------------------------------------------------------------------------

/// Render the selected day as a grid of per-channel plots.
pub fn day_plot(ui: &mut Ui, state: &AppState) {
    let figure = match &state.figure {
        Some(fig) => fig,
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Open a data folder to view a day  (File → Open data folder…)");
            });
            return;
        }
    };

    ui.vertical_centered(|ui: &mut Ui| ui.heading(&figure.title));

    let (rows, cols) = figure.grid();
    if rows == 0 {
        return;
    }
    let cell_height = (ui.available_height() / rows as f32 - 6.0).max(80.0);

    ui.columns(cols, |columns| {
        for (col, ui) in columns.iter_mut().enumerate() {
            for row in 0..rows {
                if let Some(panel) = figure.panels.get(col * rows + row) {
                    panel_plot(ui, figure, panel, col * rows + row, cell_height, state);
                }
            }
        }
    });
}

fn panel_plot(
    ui: &mut Ui,
    figure: &DayFigure,
    panel: &Panel,
    index: usize,
    height: f32,
    state: &AppState,
) {
    ui.label(&panel.title);
    let xs: Vec<f64> = panel.series.time.iter().map(|t| figure.hours(*t)).collect();

    Plot::new(("day_panel", index))
        .height(height - 20.0)
        .legend(Legend::default())
        .y_axis_label("Power [dB]")
        .include_x(0.0)
        .include_x(24.0)
        .include_y(figure.y_range.0)
        .include_y(figure.y_range.1)
        .x_axis_formatter(|mark: GridMark, _range| hour_label(mark.value))
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (segments, color, name) in [
                (&panel.rain, Rgb::RAIN, "rain"),
                (&panel.failure, Rgb::FAILURE, "failure"),
            ] {
                for polygon in span_polygons(figure, segments) {
                    plot_ui.polygon(
                        Polygon::new(polygon)
                            .name(name)
                            .fill_color(shade(color))
                            .stroke(Stroke::NONE),
                    );
                }
            }

            let mut trace = |ys: &[f64], name: &str, color: Color32, width: f32| {
                for run in finite_runs(&xs, ys) {
                    plot_ui.line(Line::new(PlotPoints::from(run)).name(name).color(color).width(width));
                }
            };
            trace(&panel.series.signal, "signal", color32(panel.color), 1.2);
            if state.show_noise {
                trace(&panel.series.noise, "noise", color32(Rgb::NOISE), 1.0);
            }
            if state.show_filtered {
                if let Some(filtered) = &panel.filtered {
                    trace(filtered, "filtered", color32(Rgb::FILTERED), 1.5);
                }
            }
        });
}

fn color32(c: Rgb) -> Color32 {
    Color32::from_rgb(c.0, c.1, c.2)
}

fn shade(c: Rgb) -> Color32 {
    Color32::from_rgba_unmultiplied(c.0, c.1, c.2, (SHADE_ALPHA * 255.0).round() as u8)
}

/// Full-height rectangles covering each segment.
fn span_polygons(figure: &DayFigure, segments: &[Segment]) -> Vec<Vec<[f64; 2]>> {
    let (lo, hi) = figure.y_range;
    segments
        .iter()
        .map(|seg| {
            let (x0, x1) = (figure.hours(seg.start_time), figure.hours(seg.stop_time));
            vec![[x0, lo], [x1, lo], [x1, hi], [x0, hi]]
        })
        .collect()
}
