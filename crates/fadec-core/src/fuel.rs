//! Fuel supply
//!
//! Two plumbing variants feed the engine. `SinglePump` is a single switch.
//! `Tanks` has left and right tanks with boost pumps, a crossfeed valve
//! joining both sides, and guarded dump valves.

use crate::controls::Controls;
use serde::{Deserialize, Serialize};

/// Low-fuel warning threshold per tank, kg
pub const LOW_FUEL_WARNING_KG: f64 = 500.0;
/// Low-fuel critical threshold per tank, kg
pub const LOW_FUEL_CRITICAL_KG: f64 = 200.0;

/// Which fuel plumbing the engine is fitted with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelSystemVariant {
    #[default]
    SinglePump,
    Tanks,
}

/// Fuel plumbing configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuelConfig {
    pub variant: FuelSystemVariant,
    pub capacity_l_kg: f64,
    pub capacity_r_kg: f64,
    pub initial_l_kg: f64,
    pub initial_r_kg: f64,
    /// Drain rate of one open dump valve
    pub dump_rate_kg_s: f64,
}

impl Default for FuelConfig {
    fn default() -> Self {
        Self {
            variant: FuelSystemVariant::SinglePump,
            capacity_l_kg: 5000.0,
            capacity_r_kg: 5000.0,
            initial_l_kg: 5000.0,
            initial_r_kg: 5000.0,
            dump_rate_kg_s: 25.0,
        }
    }
}

/// Tank quantity status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelLevel {
    #[default]
    Normal,
    Warning,
    Critical,
}

impl FuelLevel {
    pub fn for_quantity(kg: f64) -> Self {
        if kg <= LOW_FUEL_CRITICAL_KG {
            FuelLevel::Critical
        } else if kg <= LOW_FUEL_WARNING_KG {
            FuelLevel::Warning
        } else {
            FuelLevel::Normal
        }
    }
}

/// Tank quantities published with each snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelSystemState {
    pub tank_l_kg: f64,
    pub tank_r_kg: f64,
    pub capacity_l_kg: f64,
    pub capacity_r_kg: f64,
    pub level_l: FuelLevel,
    pub level_r: FuelLevel,
}

/// Fuel plumbing owned by the simulation context
#[derive(Debug, Clone)]
pub struct FuelSystem {
    config: FuelConfig,
    tank_l_kg: f64,
    tank_r_kg: f64,
}

impl FuelSystem {
    pub fn new(config: FuelConfig) -> Self {
        Self {
            tank_l_kg: config.initial_l_kg,
            tank_r_kg: config.initial_r_kg,
            config,
        }
    }

    pub fn variant(&self) -> FuelSystemVariant {
        self.config.variant
    }

    /// Which tanks are feeding the engine manifold, (left, right)
    fn feeding(&self, controls: &Controls) -> (bool, bool) {
        let l_has_fuel = self.tank_l_kg > 0.0;
        let r_has_fuel = self.tank_r_kg > 0.0;
        if controls.crossfeed && (controls.tank_pump_l || controls.tank_pump_r) {
            (l_has_fuel, r_has_fuel)
        } else {
            (controls.tank_pump_l && l_has_fuel, controls.tank_pump_r && r_has_fuel)
        }
    }

    /// Whether the plumbing delivers fuel to the engine-side shutoff
    pub fn supply_enabled(&self, controls: &Controls) -> bool {
        match self.config.variant {
            FuelSystemVariant::SinglePump => controls.fuel_pump,
            FuelSystemVariant::Tanks => {
                let (l, r) = self.feeding(controls);
                l || r
            }
        }
    }

    /// Burn `fuel_flow_kg_h` for `dt_ms` and run the dump valves
    pub fn step(&mut self, controls: &Controls, fuel_flow_kg_h: f64, dt_ms: u64) {
        if self.config.variant != FuelSystemVariant::Tanks {
            return;
        }
        let dt_s = dt_ms as f64 / 1000.0;
        let burn_kg = fuel_flow_kg_h.max(0.0) * dt_s / 3600.0;

        match self.feeding(controls) {
            (true, true) => {
                self.tank_l_kg -= burn_kg / 2.0;
                self.tank_r_kg -= burn_kg / 2.0;
            }
            (true, false) => self.tank_l_kg -= burn_kg,
            (false, true) => self.tank_r_kg -= burn_kg,
            (false, false) => {}
        }

        let dump_kg = self.config.dump_rate_kg_s * dt_s;
        if controls.dump_l {
            self.tank_l_kg -= dump_kg;
        }
        if controls.dump_r {
            self.tank_r_kg -= dump_kg;
        }

        self.tank_l_kg = self.tank_l_kg.clamp(0.0, self.config.capacity_l_kg);
        self.tank_r_kg = self.tank_r_kg.clamp(0.0, self.config.capacity_r_kg);
    }

    /// Tank state, present only for the tank variant
    pub fn state(&self) -> Option<FuelSystemState> {
        match self.config.variant {
            FuelSystemVariant::SinglePump => None,
            FuelSystemVariant::Tanks => Some(FuelSystemState {
                tank_l_kg: self.tank_l_kg,
                tank_r_kg: self.tank_r_kg,
                capacity_l_kg: self.config.capacity_l_kg,
                capacity_r_kg: self.config.capacity_r_kg,
                level_l: FuelLevel::for_quantity(self.tank_l_kg),
                level_r: FuelLevel::for_quantity(self.tank_r_kg),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigValidation;

    fn tanks(initial_l: f64, initial_r: f64) -> FuelSystem {
        FuelSystem::new(FuelConfig {
            variant: FuelSystemVariant::Tanks,
            initial_l_kg: initial_l,
            initial_r_kg: initial_r,
            ..FuelConfig::default()
        })
    }

    #[test]
    fn test_single_pump_follows_switch() {
        let fuel = FuelSystem::new(FuelConfig::default());
        let mut controls = Controls::default();
        assert!(!fuel.supply_enabled(&controls));
        controls.fuel_pump = true;
        assert!(fuel.supply_enabled(&controls));
        assert_eq!(fuel.variant(), FuelSystemVariant::SinglePump);
        assert!(fuel.state().is_none());
    }

    #[test]
    fn test_tank_pump_needs_fuel() {
        let fuel = tanks(0.0, 3000.0);
        assert_eq!(fuel.variant(), FuelSystemVariant::Tanks);
        let controls = Controls {
            tank_pump_l: true,
            ..Controls::default()
        };
        assert!(!fuel.supply_enabled(&controls));

        // Crossfeed lets the left pump reach the right tank
        let controls = Controls {
            tank_pump_l: true,
            crossfeed: true,
            ..Controls::default()
        };
        assert!(fuel.supply_enabled(&controls));
    }

    #[test]
    fn test_burn_split_across_feeding_tanks() {
        let mut fuel = tanks(1000.0, 1000.0);
        let controls = Controls {
            tank_pump_l: true,
            tank_pump_r: true,
            ..Controls::default()
        };

        // 3600 kg/h for one second is one kilogram
        fuel.step(&controls, 3600.0, 1000);
        let state = fuel.state().unwrap();
        assert!((state.tank_l_kg - 999.5).abs() < 1e-9);
        assert!((state.tank_r_kg - 999.5).abs() < 1e-9);
    }

    #[test]
    fn test_burn_from_single_side() {
        let mut fuel = tanks(1000.0, 1000.0);
        let controls = Controls {
            tank_pump_r: true,
            ..Controls::default()
        };
        fuel.step(&controls, 3600.0, 1000);
        let state = fuel.state().unwrap();
        assert_eq!(state.tank_l_kg, 1000.0);
        assert!((state.tank_r_kg - 999.0).abs() < 1e-9);
    }

    #[test]
    fn test_dump_drains_and_clamps() {
        let mut fuel = tanks(600.0, 30.0);
        let controls = Controls {
            dump_l: true,
            dump_r: true,
            ..Controls::default()
        };

        fuel.step(&controls, 0.0, 4000);
        let state = fuel.state().unwrap();
        assert!((state.tank_l_kg - 500.0).abs() < 1e-9);
        assert_eq!(state.level_l, FuelLevel::Warning);
        assert_eq!(state.tank_r_kg, 0.0);
        assert_eq!(state.level_r, FuelLevel::Critical);
    }

    #[test]
    fn test_config_validation() {
        assert!(FuelConfig::default().validate().is_ok());
        let bad = FuelConfig {
            initial_l_kg: 6000.0,
            ..FuelConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
