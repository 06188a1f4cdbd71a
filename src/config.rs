//! Processing configuration - parsed from a TOML file.
//!
//! Every field has a default matching the Alphasat receiver at LLN, so an
//! empty file (or no file at all) is a valid configuration.
//!
//! ```toml
//! source_dir = "data"
//! dataset = "2019_07"
//! events = "data/events.csv"
//!
//! [[channels]]
//! number = 1
//! label = "ch1: x-polar 39.4 GHz"
//!
//! [filter.butterworth]
//! order = 4
//! cutoff = 0.01
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::data::filter::FilterCoefficients;
use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding `<dataset>_ch<n>.*` files.
    pub source_dir: PathBuf,
    pub dataset: String,
    /// Event log; without it no samples are flagged.
    pub events: Option<PathBuf>,
    /// Where day figures are written.
    pub figure_dir: PathBuf,
    /// Optional RAPIDS attenuation table, plotted next to the day figures.
    pub rapids: Option<PathBuf>,
    pub channels: Vec<ChannelConfig>,
    pub filter: FilterConfig,
    pub figure: FigureConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source_dir: PathBuf::from("data"),
            dataset: "alphasat".to_string(),
            events: None,
            figure_dir: PathBuf::from("figures"),
            rapids: None,
            channels: ChannelConfig::alphasat_lln(),
            filter: FilterConfig::default(),
            figure: FigureConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn channel_numbers(&self) -> Vec<u8> {
        self.channels.iter().map(|c| c.number).collect()
    }

    /// Display label of a channel, falling back to `ch<n>`.
    pub fn channel_label(&self, number: u8) -> String {
        self.channels
            .iter()
            .find(|c| c.number == number)
            .map(|c| c.label.clone())
            .unwrap_or_else(|| format!("ch{number}"))
    }
}

/// One receiver channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChannelConfig {
    pub number: u8,
    pub label: String,
}

impl ChannelConfig {
    /// The four beacon channels (two frequencies, two polarisations).
    pub fn alphasat_lln() -> Vec<ChannelConfig> {
        [
            (1, "ch1: x-polar 39.4 GHz"),
            (2, "ch2: co-polar 39.4 GHz"),
            (3, "ch3: x-polar 19.7 GHz"),
            (4, "ch4: co-polar 19.7 GHz"),
        ]
        .into_iter()
        .map(|(number, label)| ChannelConfig {
            number,
            label: label.to_string(),
        })
        .collect()
    }
}

/// Low-pass filter: explicit transfer function or a Butterworth design.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FilterConfig {
    Coefficients { b: Vec<f64>, a: Vec<f64> },
    Butterworth { butterworth: ButterworthConfig },
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ButterworthConfig {
    pub order: usize,
    /// Normalised to Nyquist, in (0, 1).
    pub cutoff: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig::Butterworth {
            butterworth: ButterworthConfig {
                order: 4,
                cutoff: 0.01,
            },
        }
    }
}

impl FilterConfig {
    pub fn coefficients(&self) -> Result<FilterCoefficients> {
        match self {
            FilterConfig::Coefficients { b, a } => FilterCoefficients::new(b.clone(), a.clone()),
            FilterConfig::Butterworth { butterworth } => {
                FilterCoefficients::butterworth(butterworth.order, butterworth.cutoff)
            }
        }
    }
}

/// Layout of a day figure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    /// Followed by the date in the figure title.
    pub title_prefix: String,
    /// Fixed power axis [dB].
    pub y_min: f64,
    pub y_max: f64,
    /// PNG size in pixels.
    pub width: u32,
    pub height: u32,
}

impl Default for FigureConfig {
    fn default() -> Self {
        FigureConfig {
            title_prefix: "Alphasat received data at LLN for".to_string(),
            y_min: -50.0,
            y_max: 20.0,
            width: 1200,
            height: 1000,
        }
    }
}
