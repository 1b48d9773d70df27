//! HTTP handlers

pub mod health;
pub mod predictions;
pub mod settings;
pub mod stats;
pub mod history;
pub mod traffic;
pub mod alerts;
