use crate::config::Config;
use crate::data::events::annotate_dataset;
use crate::data::filter::{low_pass, mask_flagged, FilterCoefficients};
use crate::data::loader::{load_dataset, load_events};
use crate::data::model::{BeaconDataset, ChannelSeries, EventRecord};
use crate::data::stats::{channel_stats, ChannelStats};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Processed output
// ---------------------------------------------------------------------------

/// One annotated channel with its statistics and masked low-pass trace.
#[derive(Debug, Clone)]
pub struct ProcessedChannel {
    pub series: ChannelSeries,
    pub stats: ChannelStats,
    /// Zero-phase filtered signal, `NaN` wherever the sample is flagged.
    pub filtered: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessedDataset {
    pub name: String,
    pub channels: Vec<ProcessedChannel>,
}

impl ProcessedDataset {
    pub fn stats(&self) -> Vec<ChannelStats> {
        self.channels.iter().map(|c| c.stats).collect()
    }

    pub fn series(&self) -> impl Iterator<Item = &ChannelSeries> {
        self.channels.iter().map(|c| &c.series)
    }
}

// ---------------------------------------------------------------------------
// Pipeline: load → annotate → (stats | filter → mask)
// ---------------------------------------------------------------------------

pub struct Pipeline {
    config: Config,
    coeffs: FilterCoefficients,
}

impl Pipeline {
    /// Fails if the configured filter is invalid.
    pub fn new(config: Config) -> Result<Self> {
        let coeffs = config.filter.coefficients()?;
        log::debug!("Low-pass filter b={:?} a={:?}", coeffs.b, coeffs.a);
        Ok(Pipeline { config, coeffs })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load the configured dataset and event log.
    pub fn load_inputs(&self) -> Result<(BeaconDataset, Vec<EventRecord>)> {
        let dataset = load_dataset(
            &self.config.source_dir,
            &self.config.dataset,
            &self.config.channel_numbers(),
        )?;
        let events = match &self.config.events {
            Some(path) => load_events(path)?,
            None => {
                log::warn!("No event log configured, nothing will be flagged");
                Vec::new()
            }
        };
        Ok((dataset, events))
    }

    /// Load and process the configured inputs. The events are returned
    /// alongside, for day selection.
    pub fn run(&self) -> Result<(ProcessedDataset, Vec<EventRecord>)> {
        let (dataset, events) = self.load_inputs()?;
        let processed = self.process(dataset, &events)?;
        Ok((processed, events))
    }

    /// Annotate `dataset` with `events` and derive stats and filtered traces.
    pub fn process(&self, mut dataset: BeaconDataset, events: &[EventRecord]) -> Result<ProcessedDataset> {
        match dataset.time_span() {
            Some((first, last)) => log::info!(
                "{}: {} channels, {} samples from {first} to {last}",
                dataset.name,
                dataset.len(),
                dataset.sample_count()
            ),
            None => log::warn!("{}: no samples", dataset.name),
        }
        annotate_dataset(&mut dataset, events);

        let channels = dataset
            .channels
            .into_iter()
            .map(|series| self.process_channel(series))
            .collect::<Result<Vec<_>>>()?;

        Ok(ProcessedDataset {
            name: dataset.name,
            channels,
        })
    }

    fn process_channel(&self, series: ChannelSeries) -> Result<ProcessedChannel> {
        let stats = channel_stats(&series);
        log::info!(
            "ch{}: signal {:.2} ± {:.2} dB, noise {:.2} ± {:.2} dB ({} samples)",
            series.channel,
            stats.mean_signal,
            stats.std_signal,
            stats.mean_noise,
            stats.std_noise,
            series.len()
        );

        let mut filtered = low_pass(&self.coeffs, &series)?;
        mask_flagged(&mut filtered, &series)?;

        Ok(ProcessedChannel {
            series,
            stats,
            filtered,
        })
    }
}
