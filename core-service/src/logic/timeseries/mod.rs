//! Time-series Module - live traffic source
//!
//! The capture side writes one point per packet (or per DNS window) into
//! InfluxDB; we read them back with Flux and turn each row into a raw sample.

pub mod client;
pub mod flux;

pub use client::{parse_csv, SampleSource, SourceError, TimeSeriesClient, TimeSeriesConfig, TimeSeriesRow};
pub use flux::{check_identifier, relative_window, FluxError, FluxQuery, TimeSpan};
