//! Features Module - Sample intake
//!
//! Deployment variants and the feature contract of the inference endpoint.

pub mod sample;
pub mod variant;

#[cfg(test)]
mod tests;

// Re-export common types
pub use sample::{validate, FeatureSet, Provenance, RawSample, SampleError, SampleOrigin};
pub use variant::{UnknownVariant, Variant};
