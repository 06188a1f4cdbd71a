//! Data layer: core types, loading, flagging and signal processing.
//!
//! Architecture:
//! ```text
//!  <name>_ch<n>.parquet / .csv / .json        events.csv / .json
//!        │                                          │
//!        ▼                                          ▼
//!   ┌──────────┐                              ┌──────────┐
//!   │  loader   │  parse files → ChannelSeries │  loader   │ → EventRecord
//!   └──────────┘                              └──────────┘
//!        │                                          │
//!        ▼                                          │
//!   ┌──────────┐ ◄────────────────────────────────────┘
//!   │  events   │  stamp flag column (rain = 1, failure = 2)
//!   └──────────┘
//!        │
//!        ├──────────────┬─────────────────────┐
//!        ▼              ▼                     ▼
//!   ┌─────────┐   ┌──────────┐          ┌──────────┐
//!   │  stats   │   │  filter   │ filtfilt │ segments │ runs of a flag
//!   └─────────┘   └──────────┘ + mask    └──────────┘
//! ```

pub mod events;
pub mod filter;
pub mod loader;
pub mod model;
pub mod segments;
pub mod stats;
