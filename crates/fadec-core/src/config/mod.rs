//! Simulation configuration
//!
//! Loaded from TOML or assembled through [`ConfigBuilder`]. Every section
//! has defaults, so an empty file is a valid configuration.

mod builder;
mod traits;

pub use builder::ConfigBuilder;
pub use traits::ConfigValidation;

use crate::error::Result;
use crate::failures::{default_failure_configs, FailureConfig};
use crate::fire::SuppressionConfig;
use crate::fuel::FuelConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Top-level configuration for one simulation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed tick period
    pub tick_period_ms: u64,
    /// Seed for every random draw (noise, jitter, suppression)
    pub seed: u64,
    /// Ambient temperature, deg C
    pub ambient_c: f64,
    pub cascade: CascadeConfig,
    pub suppression: SuppressionConfig,
    pub fuel: FuelConfig,
    pub failures: Vec<FailureConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 20,
            seed: 0,
            ambient_c: 20.0,
            cascade: CascadeConfig::default(),
            suppression: SuppressionConfig::default(),
            fuel: FuelConfig::default(),
            failures: default_failure_configs(),
        }
    }
}

/// Dwell thresholds for the failure cascades
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Oil starvation time before the engine seizes
    pub oil_seizure_dwell_ms: u64,
    /// Sustained fire time before the engine seizes
    pub fire_seizure_dwell_ms: u64,
    /// Core speed above which oil starvation does damage, %
    pub oil_cascade_min_core_pct: f64,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            oil_seizure_dwell_ms: 5000,
            fire_seizure_dwell_ms: 7500,
            oil_cascade_min_core_pct: 5.0,
        }
    }
}

impl SimulationConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading simulation config");
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
