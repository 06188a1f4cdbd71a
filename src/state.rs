use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use alphasat_viewer::data::events::event_days;
use alphasat_viewer::data::model::EventRecord;
use alphasat_viewer::render::figure::DayFigure;
use alphasat_viewer::render::raster::save_day_figure;
use alphasat_viewer::{Config, Pipeline, ProcessedDataset};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Source folder, dataset name, event log and plot layout.
    pub config: Config,

    /// Annotated, filtered dataset (None until the user loads one).
    pub processed: Option<ProcessedDataset>,

    /// Event log applied to the current dataset.
    pub events: Vec<EventRecord>,

    /// Days carrying at least one sample, sorted.
    pub data_days: Vec<NaiveDate>,

    /// Days touched by a rain or failure event, sorted.
    pub event_days: Vec<NaiveDate>,

    /// Day shown in the plot.
    pub selected_date: NaiveDate,

    /// Cached figure for `selected_date`.
    pub figure: Option<DayFigure>,

    pub show_noise: bool,
    pub show_filtered: bool,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            processed: None,
            events: Vec::new(),
            data_days: Vec::new(),
            event_days: Vec::new(),
            selected_date: NaiveDate::default(),
            figure: None,
            show_noise: true,
            show_filtered: true,
            status_message: None,
        }
    }

    /// Load and process the dataset named in `config`, replacing the current one.
    pub fn reload(&mut self) -> Result<()> {
        let pipeline = Pipeline::new(self.config.clone()).context("Invalid filter")?;
        let (dataset, events) = pipeline
            .load_inputs()
            .with_context(|| format!("Failed to load dataset '{}'", self.config.dataset))?;
        let processed = pipeline.process(dataset, &events)?;
        log::info!(
            "Processed '{}': {} channels, {} events",
            processed.name,
            processed.channels.len(),
            events.len()
        );
        self.set_processed(processed, events);
        Ok(())
    }

    /// Ingest a processed dataset and jump to its first event day.
    pub fn set_processed(&mut self, processed: ProcessedDataset, events: Vec<EventRecord>) {
        let mut days: Vec<NaiveDate> = processed.series().flat_map(|s| s.days()).collect();
        days.sort_unstable();
        days.dedup();

        self.event_days = event_days(&events);
        self.selected_date = self
            .event_days
            .first()
            .or(days.first())
            .copied()
            .unwrap_or_default();
        self.data_days = days;
        self.events = events;
        self.processed = Some(processed);
        self.status_message = None;
        self.rebuild_figure();
    }

    /// Recompute the cached figure after the date or layout changed.
    pub fn rebuild_figure(&mut self) {
        self.figure = self
            .processed
            .as_ref()
            .map(|p| DayFigure::from_processed(self.selected_date, p, &self.config));
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        if date != self.selected_date || self.figure.is_none() {
            self.selected_date = date;
            self.rebuild_figure();
        }
    }

    /// Move to the previous/next day that has data.
    pub fn step_day(&mut self, forward: bool) {
        let next = if forward {
            self.data_days.iter().find(|d| **d > self.selected_date)
        } else {
            self.data_days.iter().rev().find(|d| **d < self.selected_date)
        };
        if let Some(&date) = next {
            self.select_date(date);
        }
    }

    /// Write the current day as PNG into `config.figure_dir`.
    pub fn save_current(&self) -> Result<PathBuf> {
        let figure = self.figure.as_ref().context("No day selected")?;
        save_day_figure(figure, &self.config.figure_dir)
            .with_context(|| format!("Failed to save {}", figure.file_name()))
    }

    pub fn set_error(&mut self, err: &anyhow::Error) {
        log::error!("{err:#}");
        self.status_message = Some(format!("Error: {err:#}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alphasat_viewer::data::model::{BeaconDataset, ChannelSeries, EventKind};
    use chrono::{Duration, NaiveTime};

    fn state() -> AppState {
        let d0 = NaiveDate::from_ymd_opt(2019, 7, 3).unwrap();
        let t0 = d0.and_time(NaiveTime::MIN);
        // three days, one sample every 10 minutes
        let time: Vec<_> = (0..432).map(|i| t0 + Duration::minutes(10 * i)).collect();
        let channels = (1..=4)
            .map(|ch| ChannelSeries::new(ch, time.clone(), vec![-10.0; 432], vec![-40.0; 432]))
            .collect();
        let events = vec![EventRecord {
            date: d0 + Duration::days(1),
            time_start: Duration::hours(10),
            time_stop: Duration::hours(11),
            kind: EventKind::Rain,
        }];

        let mut state = AppState::default();
        let pipeline = Pipeline::new(state.config.clone()).unwrap();
        let processed = pipeline
            .process(BeaconDataset::new("test", channels), &events)
            .unwrap();
        state.set_processed(processed, events);
        state
    }

    #[test]
    fn opens_on_first_event_day() {
        let state = state();
        assert_eq!(state.data_days.len(), 3);
        assert_eq!(state.selected_date, NaiveDate::from_ymd_opt(2019, 7, 4).unwrap());
        let figure = state.figure.as_ref().unwrap();
        assert_eq!(figure.panels.len(), 4);
        assert_eq!(figure.panels[0].rain.len(), 1);
    }

    #[test]
    fn steps_through_data_days() {
        let mut state = state();
        state.step_day(true);
        assert_eq!(state.selected_date, NaiveDate::from_ymd_opt(2019, 7, 5).unwrap());
        state.step_day(true);
        assert_eq!(state.selected_date, NaiveDate::from_ymd_opt(2019, 7, 5).unwrap());
        state.step_day(false);
        state.step_day(false);
        assert_eq!(state.selected_date, NaiveDate::from_ymd_opt(2019, 7, 3).unwrap());
        assert!(state.figure.as_ref().unwrap().panels[0].rain.is_empty());
    }
}
