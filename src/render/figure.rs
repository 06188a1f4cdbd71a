use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::color::{generate_palette, Rgb};
use crate::config::Config;
use crate::data::model::{ChannelSeries, Flag};
use crate::data::segments::{flag_segments, Segment};
use crate::pipeline::ProcessedDataset;

// ---------------------------------------------------------------------------
// DayFigure – what a one-day plot shows, independent of the backend
// ---------------------------------------------------------------------------

/// One channel of a day figure.
#[derive(Debug, Clone)]
pub struct Panel {
    pub title: String,
    pub color: Rgb,
    /// Samples of the day only.
    pub series: ChannelSeries,
    /// Masked low-pass trace cropped to the same samples.
    pub filtered: Option<Vec<f64>>,
    pub rain: Vec<Segment>,
    pub failure: Vec<Segment>,
}

/// Midnight-to-midnight view of every channel with event shading.
#[derive(Debug, Clone)]
pub struct DayFigure {
    pub date: NaiveDate,
    pub title: String,
    /// Power axis [dB].
    pub y_range: (f64, f64),
    pub width: u32,
    pub height: u32,
    pub panels: Vec<Panel>,
}

impl DayFigure {
    /// Crop `channels` (and their filtered traces, if given) to `date`.
    ///
    /// A date outside the data gives empty panels.
    pub fn build(
        date: NaiveDate,
        channels: &[ChannelSeries],
        filtered: Option<&[Vec<f64>]>,
        config: &Config,
    ) -> Self {
        let (start, stop) = day_window(date);
        let colors = generate_palette(channels.len());

        let panels = channels
            .iter()
            .zip(colors)
            .enumerate()
            .map(|(i, (full, color))| {
                let range = full.index_range(start, stop);
                let series = full.crop(start, stop);
                let filtered = filtered
                    .and_then(|f| f.get(i))
                    .and_then(|f| f.get(range.clone()))
                    .map(<[f64]>::to_vec);
                Panel {
                    title: config.channel_label(full.channel),
                    color,
                    rain: flag_segments(&series, Flag::Rain),
                    failure: flag_segments(&series, Flag::Failure),
                    series,
                    filtered,
                }
            })
            .collect();

        DayFigure {
            date,
            title: format!("{} {}", config.figure.title_prefix, date.format("%Y-%m-%d")),
            y_range: (config.figure.y_min, config.figure.y_max),
            width: config.figure.width,
            height: config.figure.height,
            panels,
        }
    }

    pub fn from_processed(date: NaiveDate, processed: &ProcessedDataset, config: &Config) -> Self {
        let filtered: Vec<Vec<f64>> = processed.channels.iter().map(|c| c.filtered.clone()).collect();
        let series: Vec<ChannelSeries> = processed.channels.iter().map(|c| c.series.clone()).collect();
        Self::build(date, &series, Some(&filtered), config)
    }

    /// `YYYY_MM_DD.png`
    pub fn file_name(&self) -> String {
        format!("{}.png", self.date.format("%Y_%m_%d"))
    }

    pub fn day_start(&self) -> NaiveDateTime {
        day_window(self.date).0
    }

    /// Hours since midnight of the figure's day (x coordinate of a plot).
    pub fn hours(&self, t: NaiveDateTime) -> f64 {
        (t - self.day_start()).num_milliseconds() as f64 / 3_600_000.0
    }

    /// Grid shape `(rows, cols)`: two columns, filled column by column.
    pub fn grid(&self) -> (usize, usize) {
        grid_shape(self.panels.len())
    }
}

pub fn day_window(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = date.and_time(NaiveTime::MIN);
    (start, start + Duration::days(1))
}

/// `HH:MM` for an x coordinate in hours since midnight.
pub fn hour_label(hours: f64) -> String {
    let minutes = (hours * 60.0).round() as i64;
    format!("{:02}:{:02}", minutes.div_euclid(60), minutes.rem_euclid(60))
}

/// Split a trace at non-finite values so gaps stay gaps.
pub fn finite_runs(xs: &[f64], ys: &[f64]) -> Vec<Vec<[f64; 2]>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (&x, &y) in xs.iter().zip(ys) {
        if y.is_finite() {
            current.push([x, y]);
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Panel `i` sits at row `i % rows`, column `i / rows`.
pub fn grid_shape(n: usize) -> (usize, usize) {
    match n {
        0 => (0, 0),
        1 => (1, 1),
        n => (n.div_ceil(2), 2),
    }
}
