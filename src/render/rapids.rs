use std::path::Path;

use image::RgbImage;
use plotters::prelude::*;
use serde::Deserialize;

use super::raster::{draw_image, plot_error, rgb, FONT};
use crate::color::generate_palette;
use crate::error::Result;

/// Rows per curve in a RAPIDS output table.
pub const POINTS_PER_CURVE: usize = 26;
/// Elevation curves in a RAPIDS output table (5° to 90°).
pub const ELEVATION_CURVES: usize = 18;
/// Probability axis [%], log scale.
const X_DECADES: (i32, i32) = (-3, 2);

// ---------------------------------------------------------------------------
// RAPIDS attenuation statistics
// ---------------------------------------------------------------------------

/// Predicted attenuation exceeded for a given time percentage, one curve
/// per elevation angle.
#[derive(Debug, Clone, PartialEq)]
pub struct RapidsCurve {
    pub label: String,
    /// Time percentage [%].
    pub probability: Vec<f64>,
    /// Attenuation [dB].
    pub attenuation: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct RapidsRow {
    #[serde(rename = "PROBABILITY")]
    probability: f64,
    #[serde(rename = "ATTENUATION")]
    attenuation: f64,
}

/// Read a RAPIDS table: consecutive blocks of [`POINTS_PER_CURVE`] rows,
/// block `i` for elevation `(i + 1) * 5°`. A trailing partial block is
/// dropped.
pub fn load_rapids(path: &Path) -> Result<Vec<RapidsCurve>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let rows = reader
        .deserialize::<RapidsRow>()
        .collect::<std::result::Result<Vec<_>, csv::Error>>()?;

    let curves = split_curves(&rows);
    log::info!("Loaded {} RAPIDS curves from {}", curves.len(), path.display());
    Ok(curves)
}

fn split_curves(rows: &[RapidsRow]) -> Vec<RapidsCurve> {
    rows.chunks_exact(POINTS_PER_CURVE)
        .take(ELEVATION_CURVES)
        .enumerate()
        .map(|(i, block)| RapidsCurve {
            label: format!("{}°", (i + 1) * 5),
            probability: block.iter().map(|r| r.probability).collect(),
            attenuation: block.iter().map(|r| r.attenuation).collect(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

const LEGEND_FONT_MAX: u32 = 14;
const LEGEND_FONT_MIN: u32 = 6;

/// Legend font size so that `entries` rows fit in `plot_height` pixels.
///
/// A legend row takes about one and a half font heights.
pub fn legend_font_size(plot_height: u32, entries: usize) -> u32 {
    if entries == 0 {
        return LEGEND_FONT_MAX;
    }
    let row = plot_height / entries as u32;
    (row * 2 / 3).clamp(LEGEND_FONT_MIN, LEGEND_FONT_MAX)
}

/// Probability tick label: `0.001`, `0.05`, `1`, `100`.
fn probability_label(p: f64) -> String {
    if p >= 1.0 {
        format!("{p:.0}")
    } else {
        let digits = (-p.log10() - 1e-9).ceil().max(0.0) as usize;
        format!("{p:.digits$}")
    }
}

/// Semi-log plot of the curves with a legend.
pub fn render_rapids(curves: &[RapidsCurve], title: &str, width: u32, height: u32) -> Result<RgbImage> {
    let y_max = curves
        .iter()
        .flat_map(|c| c.attenuation.iter().copied())
        .filter(|v| v.is_finite())
        .fold(0.0f64, f64::max);
    let y_max = ((y_max / 5.0).ceil() * 5.0).max(5.0);
    let x_range = 10f64.powi(X_DECADES.0)..10f64.powi(X_DECADES.1);

    draw_image(width, height, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption(title, (FONT, 22))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(55)
            .build_cartesian_2d(x_range.log_scale(), 0f64..y_max)
            .map_err(plot_error)?;

        chart
            .configure_mesh()
            .x_desc("Probability [%]")
            .y_desc("Attenuation [dB]")
            .x_label_formatter(&|p: &f64| probability_label(*p))
            .y_labels(6)
            .draw()
            .map_err(plot_error)?;

        let colors = generate_palette(curves.len());
        for (curve, &color) in curves.iter().zip(&colors) {
            let color = rgb(color);
            let points: Vec<(f64, f64)> = curve
                .probability
                .iter()
                .zip(&curve.attenuation)
                .filter(|(p, a)| **p > 0.0 && a.is_finite())
                .map(|(&p, &a)| (p, a))
                .collect();
            chart
                .draw_series(LineSeries::new(points, &color))
                .map_err(plot_error)?
                .label(curve.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2)));
        }

        if !curves.is_empty() {
            let (_, plot_height) = chart.plotting_area().dim_in_pixel();
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .label_font((FONT, legend_font_size(plot_height, curves.len())))
                .background_style(&WHITE.mix(0.85))
                .border_style(&BLACK)
                .draw()
                .map_err(plot_error)?;
        }
        Ok(())
    })
}

pub fn render_rapids_png(curves: &[RapidsCurve], title: &str, path: &Path) -> Result<()> {
    render_rapids(curves, title, 900, 600)?.save(path)?;
    log::info!("Saved {}", path.display());
    Ok(())
}
