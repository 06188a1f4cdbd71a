use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use parquet::arrow::ArrowWriter;

use alphasat_viewer::render::rapids::{ELEVATION_CURVES, POINTS_PER_CURVE};

const DATASET: &str = "sample";
/// Seconds between samples.
const STEP_S: i64 = 10;
const DAYS: i64 = 2;

/// (day, start, stop, event); times are offsets from midnight.
const EVENTS: [(i64, &str, &str, &str); 5] = [
    (0, "10:00:00", "10:45:00", "rain"),
    (0, "16:20:00", "17:05:00", "rain"),
    (0, "21:00:00", "21:30:00", "failure"),
    (1, "03:10:00", "04:00:00", "rain"),
    (1, "12:00:00", "12:20:00", "maintenance"),
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Event windows as absolute `[start, stop)` pairs with their kind.
fn event_windows(first_day: NaiveDate) -> Vec<(NaiveDateTime, NaiveDateTime, &'static str)> {
    EVENTS
        .iter()
        .filter_map(|&(day, start, stop, kind)| {
            let midnight = (first_day + Duration::days(day)).and_hms_opt(0, 0, 0)?;
            let start = alphasat_viewer::data::loader::parse_time_offset(start)?;
            let stop = alphasat_viewer::data::loader::parse_time_offset(stop)?;
            Some((midnight + start, midnight + stop, kind))
        })
        .collect()
}

/// Rain fade shape: raised cosine peaking mid-event.
fn fade(t: NaiveDateTime, start: NaiveDateTime, stop: NaiveDateTime, depth: f64) -> f64 {
    if t < start || t >= stop {
        return 0.0;
    }
    let x = (t - start).num_seconds() as f64 / (stop - start).num_seconds() as f64;
    depth * 0.5 * (1.0 - (2.0 * std::f64::consts::PI * x).cos())
}

fn write_channel(
    path: &Path,
    channel: u8,
    time: &[NaiveDateTime],
    windows: &[(NaiveDateTime, NaiveDateTime, &str)],
    rng: &mut SimpleRng,
) -> Result<()> {
    // 39.4 GHz channels fade harder than 19.7 GHz; co-polar sits above x-polar.
    let (level, depth) = match channel {
        1 => (-22.0, 18.0),
        2 => (-8.0, 18.0),
        3 => (-25.0, 8.0),
        _ => (-5.0, 8.0),
    };

    let mut signal = Vec::with_capacity(time.len());
    let mut noise = Vec::with_capacity(time.len());
    for &t in time {
        let hours = (t - time[0]).num_seconds() as f64 / 3600.0;
        let diurnal = 0.8 * (2.0 * std::f64::consts::PI * hours / 24.0).sin();
        let mut s = level + diurnal + rng.gauss(0.0, 0.3);
        for &(start, stop, kind) in windows {
            match kind {
                "rain" => s -= fade(t, start, stop, depth),
                "failure" if t >= start && t < stop => s = rng.gauss(-45.0, 1.0),
                _ => {}
            }
        }
        signal.push(s);
        noise.push(rng.gauss(-42.0, 0.5));
    }

    let millis: Vec<i64> = time.iter().map(|t| t.and_utc().timestamp_millis()).collect();
    let schema = Arc::new(Schema::new(vec![
        Field::new("time", DataType::Timestamp(TimeUnit::Millisecond, None), false),
        Field::new("signal", DataType::Float64, false),
        Field::new("noise", DataType::Float64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(TimestampMillisecondArray::from(millis)),
            Arc::new(Float64Array::from(signal)),
            Arc::new(Float64Array::from(noise)),
        ],
    )
    .context("Failed to create RecordBatch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn write_events(path: &Path, first_day: NaiveDate) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["DATE", "TIME START", "TIME STOP", "EVENT"])?;
    for &(day, start, stop, kind) in &EVENTS {
        let date = (first_day + Duration::days(day)).format("%Y-%m-%d").to_string();
        writer.write_record([date.as_str(), start, stop, kind])?;
    }
    writer.flush()?;
    Ok(())
}

/// Attenuation exceeded vs. time percentage, one block per elevation.
fn write_rapids(path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["PROBABILITY", "ATTENUATION"])?;
    for curve in 0..ELEVATION_CURVES {
        let elevation = ((curve + 1) * 5) as f64;
        let path_factor = 1.0 / elevation.to_radians().sin();
        for k in 0..POINTS_PER_CURVE {
            let p = 10f64.powf(-3.0 + 5.0 * k as f64 / (POINTS_PER_CURVE - 1) as f64);
            let a = (2.0 * path_factor * p.powf(-0.45)).min(60.0);
            writer.write_record([format!("{p:.6}"), format!("{a:.3}")])?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let first_day = NaiveDate::from_ymd_opt(2019, 7, 3).context("invalid start date")?;
    let t0 = first_day.and_hms_opt(0, 0, 0).context("invalid start time")?;
    let n = (DAYS * 86_400 / STEP_S) as usize;
    let time: Vec<NaiveDateTime> = (0..n as i64).map(|i| t0 + Duration::seconds(i * STEP_S)).collect();
    let windows = event_windows(first_day);

    let mut rng = SimpleRng::new(42);
    for channel in 1..=4u8 {
        let path = out_dir.join(format!("{DATASET}_ch{channel}.parquet"));
        write_channel(&path, channel, &time, &windows, &mut rng)?;
        log::info!("Wrote {n} samples to {}", path.display());
    }

    let events = out_dir.join("events.csv");
    write_events(&events, first_day)?;
    let rapids = out_dir.join("rapids.csv");
    write_rapids(&rapids)?;

    let config = out_dir.join("alphasat.toml");
    let mut file = std::fs::File::create(&config)?;
    writeln!(
        file,
        "source_dir = {:?}\ndataset = {DATASET:?}\nevents = {:?}\nrapids = {:?}",
        out_dir.display().to_string(),
        events.display().to_string(),
        rapids.display().to_string()
    )?;

    println!(
        "Wrote {DATASET} dataset (4 channels, {n} samples each), {} events and RAPIDS table to {}",
        EVENTS.len(),
        out_dir.display()
    );
    println!("Render with: cargo run --bin render_days -- {}", config.display());
    Ok(())
}
