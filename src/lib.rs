//! Satellite beacon receiver data: loading, rain/failure event flagging,
//! statistics, zero-phase low-pass filtering and day plots.

pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod render;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{Pipeline, ProcessedDataset};
