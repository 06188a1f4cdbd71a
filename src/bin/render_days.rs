use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, UInt64Array, UInt8Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;

use alphasat_viewer::data::events::event_days;
use alphasat_viewer::data::stats::ChannelStats;
use alphasat_viewer::render::figure::DayFigure;
use alphasat_viewer::render::rapids::{load_rapids, render_rapids_png};
use alphasat_viewer::render::raster::save_day_figure;
use alphasat_viewer::{Config, Pipeline};

const DEFAULT_CONFIG: &str = "alphasat.toml";

fn load_config() -> Result<Config> {
    let path = match std::env::args().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None if Path::new(DEFAULT_CONFIG).is_file() => PathBuf::from(DEFAULT_CONFIG),
        None => {
            log::info!("No {DEFAULT_CONFIG} found, using defaults");
            return Ok(Config::default());
        }
    };
    Config::load(&path).with_context(|| format!("Failed to read config {}", path.display()))
}

/// Per-channel statistics as a table.
fn stats_table(stats: &[ChannelStats]) -> Result<String> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("channel", DataType::UInt8, false),
        Field::new("mean_signal", DataType::Float64, false),
        Field::new("std_signal", DataType::Float64, false),
        Field::new("mean_noise", DataType::Float64, false),
        Field::new("std_noise", DataType::Float64, false),
        Field::new("samples", DataType::UInt64, false),
    ]));
    let column = |f: fn(&ChannelStats) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from_iter_values(stats.iter().map(f)))
    };
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(UInt8Array::from_iter_values(stats.iter().map(|s| s.channel))) as ArrayRef,
            column(|s: &ChannelStats| s.mean_signal),
            column(|s: &ChannelStats| s.std_signal),
            column(|s: &ChannelStats| s.mean_noise),
            column(|s: &ChannelStats| s.std_noise),
            Arc::new(UInt64Array::from_iter_values(stats.iter().map(|s| s.count_signal as u64))),
        ],
    )?;
    Ok(pretty_format_batches(&[batch])?.to_string())
}

fn main() -> Result<()> {
    env_logger::init();

    let config = load_config()?;
    let pipeline = Pipeline::new(config.clone()).context("Invalid filter configuration")?;

    let (processed, events) = pipeline
        .run()
        .with_context(|| format!("Failed to process dataset '{}'", config.dataset))?;

    let stats = processed.stats();
    println!("{}", stats_table(&stats)?);
    std::fs::create_dir_all(&config.figure_dir)?;
    let stats_path = config.figure_dir.join(format!("{}_stats.json", processed.name));
    std::fs::write(&stats_path, serde_json::to_string_pretty(&stats)?)?;
    log::info!("Saved {}", stats_path.display());

    let days = event_days(&events);
    if days.is_empty() {
        log::warn!("No rain or failure events, no day figures written");
    }
    for day in days {
        let figure = DayFigure::from_processed(day, &processed, &config);
        let path = save_day_figure(&figure, &config.figure_dir)
            .with_context(|| format!("Failed to save figure for {day}"))?;
        println!("{}", path.display());
    }

    if let Some(table) = &config.rapids {
        let curves = load_rapids(table)
            .with_context(|| format!("Failed to load RAPIDS table {}", table.display()))?;
        let path = config.figure_dir.join("rapids.png");
        render_rapids_png(&curves, "RAPIDS attenuation statistics", &path)?;
        println!("{}", path.display());
    }
    Ok(())
}
