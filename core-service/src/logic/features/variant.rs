//! Deployment Variant
//!
//! DNS and DoS deployments share the whole pipeline and only differ in the
//! feature contract of their inference endpoint and a few labels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const DNS_FEATURES: &[&str] = &["inter_arrival_time", "dns_rate"];
const DOS_FEATURES: &[&str] = &["inter_arrival_time", "packet_length"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Dns,
    Dos,
}

impl Variant {
    /// Features the inference endpoint requires for this deployment
    pub fn required_features(&self) -> &'static [&'static str] {
        match self {
            Variant::Dns => DNS_FEATURES,
            Variant::Dos => DOS_FEATURES,
        }
    }

    /// Durable log table
    pub fn journal_table(&self) -> &'static str {
        match self {
            Variant::Dns => "anomalies",
            Variant::Dos => "dos_anomalies",
        }
    }

    /// Short label used in alerts and as the default protocol column
    pub fn label(&self) -> &'static str {
        match self {
            Variant::Dns => "DNS",
            Variant::Dos => "DOS",
        }
    }

    /// Prefix for variant-specific environment variables
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Variant::Dns => "",
            Variant::Dos => "DOS_",
        }
    }

    /// Measurement written by the capture side
    pub fn default_measurement(&self) -> &'static str {
        match self {
            Variant::Dns => "dns",
            Variant::Dos => "network_traffic",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Dns => "dns",
            Variant::Dos => "dos",
        }
    }
}

impl Default for Variant {
    fn default() -> Self {
        Variant::Dns
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown deployment variant '{0}' (expected 'dns' or 'dos')")]
pub struct UnknownVariant(pub String);

impl FromStr for Variant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dns" => Ok(Variant::Dns),
            "dos" | "ddos" => Ok(Variant::Dos),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}
