//! Data models

pub mod anomaly;

pub use anomaly::*;
