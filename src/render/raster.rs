use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Once;

use image::RgbImage;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};

use super::figure::{finite_runs, hour_label, DayFigure, Panel};
use crate::color::{Rgb, SHADE_ALPHA};
use crate::error::{Error, Result};

/// Family every text style refers to.
pub(crate) const FONT: &str = "sans-serif";
const TITLE_SIZE: u32 = 26;
const PANEL_TITLE_SIZE: u32 = 18;
/// Hours between x ticks.
const X_TICK_HOURS: usize = 3;
/// dB between y ticks.
const Y_TICK_DB: f64 = 10.0;

static FONT_INIT: Once = Once::new();

/// Register the viewer's UI font under [`FONT`]. Plotters draws no text
/// without a registered font when built without system font lookup.
pub(crate) fn register_fonts() {
    FONT_INIT.call_once(|| {
        if register_font(FONT, FontStyle::Normal, epaint_default_fonts::UBUNTU_LIGHT).is_err() {
            log::error!("Bundled font could not be parsed, figures will have no text");
        }
    });
}

pub(crate) fn plot_error(e: impl Display) -> Error {
    Error::Plot(e.to_string())
}

pub(crate) fn rgb(c: Rgb) -> RGBColor {
    RGBColor(c.0, c.1, c.2)
}

/// Draw into a fresh `width x height` RGB buffer and wrap it as an image.
pub(crate) fn draw_image(
    width: u32,
    height: u32,
    draw: impl FnOnce(&DrawingArea<BitMapBackend<'_>, Shift>) -> Result<()>,
) -> Result<RgbImage> {
    register_fonts();
    let mut buf = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buf, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(plot_error)?;
        draw(&root)?;
        root.present().map_err(plot_error)?;
    }
    RgbImage::from_raw(width, height, buf)
        .ok_or_else(|| Error::Plot(format!("buffer does not hold {width}x{height} pixels")))
}

// ---------------------------------------------------------------------------
// Day figure
// ---------------------------------------------------------------------------

/// Position of panel `i` in the row-major cell list of a `rows x cols` grid.
///
/// Panels fill the grid column by column.
pub fn cell_index(i: usize, rows: usize, cols: usize) -> usize {
    (i % rows) * cols + i / rows
}

/// Rasterise a day figure.
pub fn render_day(fig: &DayFigure) -> Result<RgbImage> {
    draw_image(fig.width, fig.height, |root| {
        let body = root
            .titled(&fig.title, (FONT, TITLE_SIZE))
            .map_err(plot_error)?;
        let (rows, cols) = fig.grid();
        if rows == 0 {
            return Ok(());
        }
        let cells = body.split_evenly((rows, cols));
        for (i, panel) in fig.panels.iter().enumerate() {
            draw_panel(&cells[cell_index(i, rows, cols)], fig, panel)?;
        }
        Ok(())
    })
}

fn draw_panel(area: &DrawingArea<BitMapBackend<'_>, Shift>, fig: &DayFigure, panel: &Panel) -> Result<()> {
    let (y_lo, y_hi) = fig.y_range;
    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, (FONT, PANEL_TITLE_SIZE))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..24f64, y_lo..y_hi)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_labels(24 / X_TICK_HOURS + 1)
        .y_labels(((y_hi - y_lo) / Y_TICK_DB).round() as usize + 1)
        .x_label_formatter(&|h: &f64| hour_label(*h))
        .y_label_formatter(&|db: &f64| format!("{db:.0}"))
        .light_line_style(&WHITE)
        .y_desc("Power [dB]")
        .draw()
        .map_err(plot_error)?;

    for (segments, color) in [(&panel.rain, Rgb::RAIN), (&panel.failure, Rgb::FAILURE)] {
        let style = rgb(color).mix(SHADE_ALPHA as f64).filled();
        chart
            .draw_series(segments.iter().map(|seg| {
                Rectangle::new(
                    [(fig.hours(seg.start_time), y_lo), (fig.hours(seg.stop_time), y_hi)],
                    style,
                )
            }))
            .map_err(plot_error)?;
    }

    let xs: Vec<f64> = panel.series.time.iter().map(|t| fig.hours(*t)).collect();
    let mut traces = vec![
        (panel.series.signal.as_slice(), rgb(panel.color)),
        (panel.series.noise.as_slice(), rgb(Rgb::NOISE)),
    ];
    if let Some(filtered) = &panel.filtered {
        traces.push((filtered.as_slice(), rgb(Rgb::FILTERED)));
    }
    for (ys, color) in traces {
        for run in finite_runs(&xs, ys) {
            let points = run.into_iter().map(|[x, y]| (x, y.max(y_lo).min(y_hi)));
            chart
                .draw_series(LineSeries::new(points, &color))
                .map_err(plot_error)?;
        }
    }
    Ok(())
}

/// Render `fig` and write it as PNG to `path`.
pub fn render_png(fig: &DayFigure, path: &Path) -> Result<()> {
    render_day(fig)?.save(path)?;
    log::info!("Saved {}", path.display());
    Ok(())
}

/// Write `fig` as `<dir>/YYYY_MM_DD.png`, creating `dir` if needed.
pub fn save_day_figure(fig: &DayFigure, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(fig.file_name());
    render_png(fig, &path)?;
    Ok(path)
}
