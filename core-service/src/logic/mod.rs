//! Logic Module - Business Logic & Engines
//!
//! - `features/` - Deployment variants and sample validation
//! - `model/` - Records, buffer, threshold, inference client
//! - `journal/` - Durable anomaly log contract
//! - `response/` - Webhook alerts
//! - `timeseries/` - Live traffic source (Flux over HTTP)
//! - `session/` - Ingest pipeline and session context

pub mod features;
pub mod model;
pub mod journal;
pub mod response;
pub mod timeseries;
pub mod session;
pub mod stats;
pub mod analysis_loop;
