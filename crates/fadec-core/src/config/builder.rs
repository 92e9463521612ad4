//! Configuration builder for type-safe construction

use super::*;
use crate::failures::{FailureConfig, FailureId};
use crate::fuel::FuelSystemVariant;

/// Type-safe builder for simulation configuration
pub struct ConfigBuilder {
    config: SimulationConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder with defaults
    pub fn new() -> Self {
        Self {
            config: SimulationConfig::default(),
        }
    }

    /// Set the random seed for deterministic execution
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Set the tick period in milliseconds
    pub fn with_tick_period_ms(mut self, tick_period_ms: u64) -> Self {
        self.config.tick_period_ms = tick_period_ms;
        self
    }

    pub fn with_ambient_c(mut self, ambient_c: f64) -> Self {
        self.config.ambient_c = ambient_c;
        self
    }

    /// Set the oil starvation dwell before seizure
    pub fn with_oil_seizure_dwell_ms(mut self, dwell_ms: u64) -> Self {
        self.config.cascade.oil_seizure_dwell_ms = dwell_ms;
        self
    }

    /// Set the sustained fire dwell before seizure
    pub fn with_fire_seizure_dwell_ms(mut self, dwell_ms: u64) -> Self {
        self.config.cascade.fire_seizure_dwell_ms = dwell_ms;
        self
    }

    /// Set the chance that a discharge extinguishes an active fire
    pub fn with_extinguish_probability(mut self, probability: f64) -> Self {
        self.config.suppression.extinguish_probability = probability;
        self
    }

    pub fn with_extinguish_delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.suppression.extinguish_delay_ms = delay_ms;
        self
    }

    /// Select the fuel plumbing
    pub fn with_fuel_variant(mut self, variant: FuelSystemVariant) -> Self {
        self.config.fuel.variant = variant;
        self
    }

    /// Set initial tank quantities, kg
    pub fn with_tank_quantities(mut self, left_kg: f64, right_kg: f64) -> Self {
        self.config.fuel.initial_l_kg = left_kg;
        self.config.fuel.initial_r_kg = right_kg;
        self
    }

    /// Replace the configuration for one failure
    pub fn with_failure(mut self, failure: FailureConfig) -> Self {
        self.config.failures.retain(|f| f.id != failure.id);
        self.config.failures.push(failure);
        self
    }

    /// Set the activation delay for one failure
    pub fn with_failure_delay(mut self, id: FailureId, delay_secs: f64) -> Self {
        match self.config.failures.iter_mut().find(|f| f.id == id) {
            Some(failure) => failure.delay_secs = delay_secs,
            None => self.config.failures.push(FailureConfig {
                delay_secs,
                ..FailureConfig::new(id)
            }),
        }
        self
    }

    /// Build the configuration with validation
    pub fn build(self) -> Result<SimulationConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Build the configuration without validation (for testing)
    pub fn build_unchecked(self) -> SimulationConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let config = ConfigBuilder::new()
            .with_seed(7)
            .with_extinguish_probability(1.0)
            .with_failure_delay(FailureId::OilPumpFailure, 2.0)
            .build()
            .unwrap();

        assert_eq!(config.seed, 7);
        assert_eq!(config.suppression.extinguish_probability, 1.0);
        let oil = config
            .failures
            .iter()
            .find(|f| f.id == FailureId::OilPumpFailure)
            .unwrap();
        assert_eq!(oil.delay_secs, 2.0);
        assert_eq!(config.failures.len(), 4);
    }

    #[test]
    fn test_build_validates() {
        assert!(ConfigBuilder::new().with_tick_period_ms(0).build().is_err());
        let unchecked = ConfigBuilder::new().with_tick_period_ms(0).build_unchecked();
        assert_eq!(unchecked.tick_period_ms, 0);
    }
}
