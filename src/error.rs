use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the data and rendering layers.
///
/// Binaries and the viewer wrap these in `anyhow` with extra context.
#[derive(Debug, Error)]
pub enum Error {
    #[error("data not found: dataset '{dataset}' channel {channel} (looked in {dir})")]
    DataNotFound {
        dataset: String,
        channel: u8,
        dir: PathBuf,
    },

    #[error("malformed event row {row}: {reason}")]
    MalformedEvent { row: usize, reason: String },

    #[error("{path}: missing '{column}' column")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{path}: row {row}: {reason}")]
    BadValue {
        path: PathBuf,
        row: usize,
        reason: String,
    },

    #[error("{path}: timestamps not strictly increasing at row {row}")]
    UnsortedIndex { path: PathBuf, row: usize },

    #[error("length mismatch: filtered signal has {filtered} samples, series has {series}")]
    LengthMismatch { filtered: usize, series: usize },

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("signal of {len} samples is too short for a pad length of {padlen}")]
    SignalTooShort { len: usize, padlen: usize },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("plot rendering failed: {0}")]
    Plot(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error(transparent)]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;
