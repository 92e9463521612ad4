//! Configuration validation

use super::*;
use crate::error::FadecError;
use crate::failures::FailureRegistry;

/// Trait for configuration validation
pub trait ConfigValidation {
    /// Validate configuration parameters
    fn validate(&self) -> Result<()>;
}

impl ConfigValidation for SimulationConfig {
    fn validate(&self) -> Result<()> {
        if self.tick_period_ms == 0 {
            return Err(FadecError::configuration(
                "tick_period_ms must be greater than 0",
            ));
        }
        if !self.ambient_c.is_finite() {
            return Err(FadecError::configuration("ambient_c must be finite"));
        }
        self.cascade.validate()?;
        self.suppression.validate()?;
        self.fuel.validate()?;
        // Duplicate ids, delays and trigger keys are checked by the registry
        FailureRegistry::new(&self.failures)?;
        Ok(())
    }
}

impl ConfigValidation for CascadeConfig {
    fn validate(&self) -> Result<()> {
        if self.oil_seizure_dwell_ms == 0 {
            return Err(FadecError::configuration(
                "oil_seizure_dwell_ms must be greater than 0",
            ));
        }
        if self.fire_seizure_dwell_ms == 0 {
            return Err(FadecError::configuration(
                "fire_seizure_dwell_ms must be greater than 0",
            ));
        }
        if !self.oil_cascade_min_core_pct.is_finite() || self.oil_cascade_min_core_pct < 0.0 {
            return Err(FadecError::configuration(
                "oil_cascade_min_core_pct must be a finite percentage >= 0",
            ));
        }
        Ok(())
    }
}

impl ConfigValidation for SuppressionConfig {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.extinguish_probability) {
            return Err(FadecError::configuration(
                "extinguish_probability must be between 0.0 and 1.0",
            ));
        }
        Ok(())
    }
}

impl ConfigValidation for FuelConfig {
    fn validate(&self) -> Result<()> {
        for (side, capacity, initial) in [
            ("left", self.capacity_l_kg, self.initial_l_kg),
            ("right", self.capacity_r_kg, self.initial_r_kg),
        ] {
            if !capacity.is_finite() || capacity <= 0.0 {
                return Err(FadecError::configuration(format!(
                    "{side} tank capacity must be greater than 0"
                )));
            }
            if !initial.is_finite() || !(0.0..=capacity).contains(&initial) {
                return Err(FadecError::configuration(format!(
                    "{side} tank initial quantity must be within [0, {capacity}]"
                )));
            }
        }
        if !self.dump_rate_kg_s.is_finite() || self.dump_rate_kg_s < 0.0 {
            return Err(FadecError::configuration(
                "dump_rate_kg_s must be a finite rate >= 0",
            ));
        }
        Ok(())
    }
}
