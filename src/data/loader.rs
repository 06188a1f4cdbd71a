use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, AsArray, Float64Array, Int64Array};
use arrow::compute::cast;
use arrow::datatypes::{DataType, TimeUnit};
use arrow::temporal_conversions::{
    timestamp_ms_to_datetime, timestamp_ns_to_datetime, timestamp_s_to_datetime,
    timestamp_us_to_datetime,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::model::{BeaconDataset, ChannelSeries, EventKind, EventRecord};
use crate::error::{Error, Result};

/// Extensions probed, in order, for `<name>_ch<n>.<ext>`.
pub const CHANNEL_EXTENSIONS: [&str; 4] = ["parquet", "pq", "csv", "json"];

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Locate the file holding channel `channel` of dataset `name`.
pub fn channel_path(src_dir: &Path, name: &str, channel: u8) -> Option<PathBuf> {
    CHANNEL_EXTENSIONS
        .iter()
        .map(|ext| src_dir.join(format!("{name}_ch{channel}.{ext}")))
        .find(|p| p.is_file())
}

/// Load one channel of a named dataset from `src_dir`.
pub fn load_channel(src_dir: &Path, name: &str, channel: u8) -> Result<ChannelSeries> {
    let path = channel_path(src_dir, name, channel).ok_or_else(|| Error::DataNotFound {
        dataset: name.to_string(),
        channel,
        dir: src_dir.to_path_buf(),
    })?;
    let series = load_series_file(&path, channel)?;
    log::info!("Loaded {} samples from {}", series.len(), path.display());
    Ok(series)
}

/// Load every listed channel of a named dataset.
pub fn load_dataset(src_dir: &Path, name: &str, channels: &[u8]) -> Result<BeaconDataset> {
    let series = channels
        .iter()
        .map(|&ch| load_channel(src_dir, name, ch))
        .collect::<Result<Vec<_>>>()?;
    Ok(BeaconDataset::new(name, series))
}

/// Load a channel series from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – columns `time`, `signal`, `noise` (recommended)
/// * `.csv`     – header `time,signal,noise`
/// * `.json`    – `[{ "time": "...", "signal": x, "noise": y }, ...]`
pub fn load_series_file(path: &Path, channel: u8) -> Result<ChannelSeries> {
    let (time, signal, noise) = match extension(path).as_str() {
        "parquet" | "pq" => read_parquet(path)?,
        "csv" => read_csv(path)?,
        "json" => read_json(path)?,
        other => return Err(Error::UnsupportedFormat(other.to_string())),
    };

    if let Some(row) = time.windows(2).position(|w| w[0] >= w[1]) {
        return Err(Error::UnsortedIndex {
            path: path.to_path_buf(),
            row: row + 1,
        });
    }
    Ok(ChannelSeries::new(channel, time, signal, noise))
}

/// Load the event log (`.csv` or `.json`).
///
/// Any unparseable row aborts the load; no partial log is returned.
pub fn load_events(path: &Path) -> Result<Vec<EventRecord>> {
    let rows: Vec<EventRow> = match extension(path).as_str() {
        "csv" => {
            let mut reader = csv::ReaderBuilder::new()
                .trim(csv::Trim::All)
                .from_path(path)?;
            reader
                .deserialize::<EventRow>()
                .enumerate()
                .map(|(row, r)| {
                    r.map_err(|e| Error::MalformedEvent {
                        row,
                        reason: e.to_string(),
                    })
                })
                .collect::<Result<_>>()?
        }
        "json" => {
            let text = std::fs::read_to_string(path)?;
            let records: Vec<JsonValue> = serde_json::from_str(&text)?;
            records
                .into_iter()
                .enumerate()
                .map(|(row, value)| {
                    serde_json::from_value::<EventRow>(value).map_err(|e| Error::MalformedEvent {
                        row,
                        reason: e.to_string(),
                    })
                })
                .collect::<Result<_>>()?
        }
        other => return Err(Error::UnsupportedFormat(other.to_string())),
    };

    let events = rows
        .iter()
        .enumerate()
        .map(|(row, r)| r.to_record(row))
        .collect::<Result<Vec<_>>>()?;
    log::info!("Loaded {} events from {}", events.len(), path.display());
    Ok(events)
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// Event rows
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct EventRow {
    #[serde(rename = "DATE")]
    date: String,
    #[serde(rename = "TIME START")]
    time_start: String,
    #[serde(rename = "TIME STOP")]
    time_stop: String,
    #[serde(rename = "EVENT")]
    event: String,
}

impl EventRow {
    fn to_record(&self, row: usize) -> Result<EventRecord> {
        let malformed = |reason: String| Error::MalformedEvent { row, reason };

        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .map_err(|e| malformed(format!("DATE '{}': {e}", self.date)))?;
        let time_start = parse_time_offset(&self.time_start)
            .ok_or_else(|| malformed(format!("TIME START '{}'", self.time_start)))?;
        let time_stop = parse_time_offset(&self.time_stop)
            .ok_or_else(|| malformed(format!("TIME STOP '{}'", self.time_stop)))?;

        let midnight = date.and_time(NaiveTime::MIN);
        for (column, offset, raw) in [
            ("TIME START", time_start, &self.time_start),
            ("TIME STOP", time_stop, &self.time_stop),
        ] {
            if midnight.checked_add_signed(offset).is_none() {
                return Err(malformed(format!("{column} '{raw}' is past the calendar range")));
            }
        }

        Ok(EventRecord {
            date,
            time_start,
            time_stop,
            kind: EventKind::parse(self.event.trim()),
        })
    }
}

/// Parse a time-of-day offset: `[D day[s] ]HH:MM[:SS[.fff]]`.
///
/// Hours are not capped at 24.
pub fn parse_time_offset(s: &str) -> Option<Duration> {
    let s = s.trim();
    let (days, clock) = match s.split_once(" day") {
        Some((d, rest)) => {
            let d: i64 = d.trim().parse().ok()?;
            let rest = rest.trim_start_matches('s').trim_start_matches(',').trim();
            (d, rest)
        }
        None => (0, s),
    };

    let mut parts = clock.split(':');
    let hours: i64 = parts.next()?.trim().parse().ok()?;
    let minutes: i64 = parts.next()?.trim().parse().ok()?;
    let seconds: f64 = match parts.next() {
        Some(sec) => sec.trim().parse().ok()?,
        None => 0.0,
    };
    if parts.next().is_some()
        || hours < 0
        || !(0..60).contains(&minutes)
        || !(0.0..60.0).contains(&seconds)
    {
        return None;
    }

    let micros = (seconds * 1e6).round() as i64;
    Duration::try_days(days)?
        .checked_add(&Duration::try_hours(hours)?)?
        .checked_add(&Duration::try_minutes(minutes)?)?
        .checked_add(&Duration::microseconds(micros))
}

/// Parse a timestamp as written by pandas / ISO-8601 tools.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];
    let s = s.trim();
    FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local()))
}

type Columns = (Vec<NaiveDateTime>, Vec<f64>, Vec<f64>);

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

/// CSV layout: header row with `time`, `signal`, `noise` (any order, extra
/// columns ignored). Empty numeric cells are read as missing.
fn read_csv(path: &Path) -> Result<Columns> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| Error::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })
    };
    let t_idx = column("time")?;
    let s_idx = column("signal")?;
    let n_idx = column("noise")?;

    let bad = |row: usize, reason: String| Error::BadValue {
        path: path.to_path_buf(),
        row,
        reason,
    };

    let (mut time, mut signal, mut noise) = (Vec::new(), Vec::new(), Vec::new());
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let t = record.get(t_idx).unwrap_or("");
        time.push(parse_timestamp(t).ok_or_else(|| bad(row, format!("bad time '{t}'")))?);
        for (idx, col, out) in [(s_idx, "signal", &mut signal), (n_idx, "noise", &mut noise)] {
            let cell = record.get(idx).unwrap_or("").trim();
            let value = if cell.is_empty() {
                f64::NAN
            } else {
                cell.parse::<f64>()
                    .map_err(|_| bad(row, format!("{col} '{cell}' is not a number")))?
            };
            out.push(value);
        }
    }
    Ok((time, signal, noise))
}

// ---------------------------------------------------------------------------
// JSON reader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records', date_format='iso')`):
///
/// ```json
/// [
///   { "time": "2019-07-03T10:00:00", "signal": -12.1, "noise": -41.7 },
///   ...
/// ]
/// ```
///
/// `time` may also be epoch milliseconds; `null` measurements are missing.
fn read_json(path: &Path) -> Result<Columns> {
    let text = std::fs::read_to_string(path)?;
    let root: JsonValue = serde_json::from_str(&text)?;
    let bad = |row: usize, reason: String| Error::BadValue {
        path: path.to_path_buf(),
        row,
        reason,
    };

    let records = root
        .as_array()
        .ok_or_else(|| bad(0, "expected top-level JSON array".into()))?;

    let (mut time, mut signal, mut noise) = (
        Vec::with_capacity(records.len()),
        Vec::with_capacity(records.len()),
        Vec::with_capacity(records.len()),
    );
    for (row, rec) in records.iter().enumerate() {
        let t = match rec.get("time") {
            Some(JsonValue::String(s)) => parse_timestamp(s),
            Some(JsonValue::Number(n)) => n.as_i64().and_then(timestamp_ms_to_datetime),
            _ => None,
        }
        .ok_or_else(|| bad(row, "missing or invalid 'time'".into()))?;
        time.push(t);
        signal.push(json_number(rec.get("signal")).ok_or_else(|| bad(row, "invalid 'signal'".into()))?);
        noise.push(json_number(rec.get("noise")).ok_or_else(|| bad(row, "invalid 'noise'".into()))?);
    }
    Ok((time, signal, noise))
}

fn json_number(val: Option<&JsonValue>) -> Option<f64> {
    match val {
        None | Some(JsonValue::Null) => Some(f64::NAN),
        Some(v) => v.as_f64(),
    }
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing one channel.
///
/// Expected schema:
/// - `time`: Timestamp (any unit), Int64 epoch milliseconds, or Utf8
/// - `signal`, `noise`: any numeric type, nulls are missing values
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn read_parquet(path: &Path) -> Result<Columns> {
    let file = std::fs::File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let (mut time, mut signal, mut noise) = (Vec::new(), Vec::new(), Vec::new());
    for batch in reader {
        let batch = batch?;
        let schema = batch.schema();
        let column = |name: &str| {
            schema
                .index_of(name)
                .map(|i| batch.column(i).clone())
                .map_err(|_| Error::MissingColumn {
                    path: path.to_path_buf(),
                    column: name.to_string(),
                })
        };

        let offset = time.len();
        time.extend(extract_times(&column("time")?, path, offset)?);
        signal.extend(extract_f64(&column("signal")?)?);
        noise.extend(extract_f64(&column("noise")?)?);
    }
    Ok((time, signal, noise))
}

/// Numeric column as `f64`, nulls mapped to `NaN`.
fn extract_f64(col: &Arc<dyn Array>) -> Result<Vec<f64>> {
    let values = cast(col, &DataType::Float64)?;
    let arr = values
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| arrow::error::ArrowError::CastError("expected Float64Array".into()))?;
    Ok(arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

fn extract_times(col: &Arc<dyn Array>, path: &Path, offset: usize) -> Result<Vec<NaiveDateTime>> {
    let bad = |row: usize| Error::BadValue {
        path: path.to_path_buf(),
        row: offset + row,
        reason: "null or out-of-range timestamp".into(),
    };

    let raw: Vec<Option<NaiveDateTime>> = match col.data_type() {
        DataType::Timestamp(unit, _) => {
            let convert: fn(i64) -> Option<NaiveDateTime> = match unit {
                TimeUnit::Second => timestamp_s_to_datetime,
                TimeUnit::Millisecond => timestamp_ms_to_datetime,
                TimeUnit::Microsecond => timestamp_us_to_datetime,
                TimeUnit::Nanosecond => timestamp_ns_to_datetime,
            };
            let ticks = cast(col, &DataType::Int64)?;
            let ticks = ticks.as_primitive::<arrow::datatypes::Int64Type>();
            ticks.iter().map(|v| v.and_then(convert)).collect()
        }
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| arrow::error::ArrowError::CastError("expected Int64Array".into()))?;
            arr.iter().map(|v| v.and_then(timestamp_ms_to_datetime)).collect()
        }
        DataType::Utf8 | DataType::LargeUtf8 => {
            let text = cast(col, &DataType::Utf8)?;
            text.as_string::<i32>()
                .iter()
                .map(|v| v.and_then(parse_timestamp))
                .collect()
        }
        other => {
            return Err(Error::BadValue {
                path: path.to_path_buf(),
                row: offset,
                reason: format!("unsupported time column type {other:?}"),
            })
        }
    };

    raw.into_iter()
        .enumerate()
        .map(|(row, t)| t.ok_or_else(|| bad(row)))
        .collect()
}
