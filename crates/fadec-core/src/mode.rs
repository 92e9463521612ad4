//! Operating-mode state machine
//!
//! `transition` is a pure function of the previous mode and one tick's
//! inputs. It returns the next mode and the core-speed setpoint handed to
//! the physics integrator. Cascade overrides (forced seizure) are applied by
//! the tick driver before this runs.

use crate::controls::Controls;
use crate::failures::FailureFlags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Core speed that allows light-off, %
pub const LIGHT_OFF_CORE_PCT: f64 = 15.0;
/// Core speed at which a start is complete, %
pub const IDLE_REACHED_CORE_PCT: f64 = 55.0;
/// Core speed below which a shutdown is complete, %
pub const SPOOLED_DOWN_CORE_PCT: f64 = 2.0;
/// Maximum starter motoring speed, %
pub const MOTORING_SETPOINT_PCT: f64 = 25.0;
/// Self-sustaining acceleration target during a start, %
pub const SELF_SUSTAINING_SETPOINT_PCT: f64 = 58.0;
/// Start target with starter assist, %
pub const STARTER_ASSIST_SETPOINT_PCT: f64 = 60.0;
/// Ground idle, %
pub const IDLE_SETPOINT_PCT: f64 = 60.0;
/// Setpoint gain per percent of throttle
pub const THROTTLE_GAIN: f64 = 0.4;
/// Throttle above which the engine is considered running, %
pub const RUNNING_THROTTLE_PCT: f64 = 5.0;

/// Discrete engine mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatingMode {
    #[default]
    Off,
    Starting,
    Idle,
    Running,
    Fire,
    Shutdown,
    /// Terminal: nothing leaves this mode within a session
    Seized,
}

impl OperatingMode {
    pub fn is_seized(self) -> bool {
        self == OperatingMode::Seized
    }

    /// Modes in which the engine is lit and governed by the throttle
    pub fn is_lit(self) -> bool {
        matches!(
            self,
            OperatingMode::Idle | OperatingMode::Running | OperatingMode::Fire
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            OperatingMode::Off => "OFF",
            OperatingMode::Starting => "STARTING",
            OperatingMode::Idle => "IDLE",
            OperatingMode::Running => "RUNNING",
            OperatingMode::Fire => "FIRE",
            OperatingMode::Shutdown => "SHUTDOWN",
            OperatingMode::Seized => "SEIZED",
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the state machine reads in one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeInputs {
    pub master_switch: bool,
    /// Fuel pump on (single-pump) or at least one tank feeding (tanks)
    pub fuel_supply: bool,
    pub ignition: bool,
    pub starter: bool,
    pub throttle: f64,
    pub engine_fire: bool,
    pub fuel_pump_failure: bool,
    pub handle_pulled: bool,
    pub core_speed_pct: f64,
}

impl ModeInputs {
    pub fn new(
        controls: &Controls,
        fuel_supply: bool,
        failures: &FailureFlags,
        handle_pulled: bool,
        core_speed_pct: f64,
    ) -> Self {
        Self {
            master_switch: controls.master_switch,
            fuel_supply,
            ignition: controls.ignition,
            starter: controls.starter,
            throttle: controls.throttle(),
            engine_fire: failures.engine_fire,
            fuel_pump_failure: failures.fuel_pump_failure,
            handle_pulled,
            core_speed_pct,
        }
    }

    /// Evaluate the power and fuel interlocks for `mode`
    pub fn derive(&self, mode: OperatingMode) -> Interlocks {
        let power_available = self.master_switch && !mode.is_seized();
        Interlocks {
            power_available,
            fuel_flowing: self.fuel_supply
                && power_available
                && !self.fuel_pump_failure
                && !self.handle_pulled,
            ignition_active: self.ignition && power_available,
            starter_active: self.starter && power_available,
        }
    }
}

/// Derived interlock states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Interlocks {
    pub power_available: bool,
    /// Fuel reaching the combustor. The pulled fire handle forces this off.
    pub fuel_flowing: bool,
    pub ignition_active: bool,
    pub starter_active: bool,
}

/// Output of one state machine evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub next: OperatingMode,
    /// Target core speed, %
    pub setpoint_pct: f64,
    pub interlocks: Interlocks,
}

/// Lit-engine setpoint for a throttle position
pub fn throttle_setpoint(throttle: f64) -> f64 {
    (IDLE_SETPOINT_PCT + throttle * THROTTLE_GAIN).max(IDLE_SETPOINT_PCT)
}

/// One evaluation of the transition table
pub fn transition(mode: OperatingMode, inputs: &ModeInputs) -> Transition {
    let interlocks = inputs.derive(mode);
    let Interlocks {
        fuel_flowing,
        ignition_active,
        starter_active,
        ..
    } = interlocks;
    let core = inputs.core_speed_pct;
    let can_light = fuel_flowing && ignition_active && core > LIGHT_OFF_CORE_PCT;

    let (next, setpoint_pct) = match mode {
        OperatingMode::Off => {
            if !starter_active {
                (OperatingMode::Off, 0.0)
            } else if can_light {
                (OperatingMode::Starting, MOTORING_SETPOINT_PCT)
            } else {
                (OperatingMode::Off, MOTORING_SETPOINT_PCT)
            }
        }
        OperatingMode::Starting => {
            let setpoint = if starter_active {
                STARTER_ASSIST_SETPOINT_PCT
            } else {
                SELF_SUSTAINING_SETPOINT_PCT
            };
            if !fuel_flowing {
                (OperatingMode::Shutdown, setpoint)
            } else if core > IDLE_REACHED_CORE_PCT {
                (OperatingMode::Idle, setpoint)
            } else {
                (OperatingMode::Starting, setpoint)
            }
        }
        OperatingMode::Idle | OperatingMode::Running | OperatingMode::Fire => {
            if !fuel_flowing {
                (OperatingMode::Shutdown, 0.0)
            } else {
                let setpoint = throttle_setpoint(inputs.throttle);
                if inputs.engine_fire {
                    (OperatingMode::Fire, setpoint)
                } else if inputs.throttle > RUNNING_THROTTLE_PCT {
                    (OperatingMode::Running, setpoint)
                } else {
                    (OperatingMode::Idle, setpoint)
                }
            }
        }
        OperatingMode::Shutdown => {
            let setpoint = if starter_active {
                MOTORING_SETPOINT_PCT
            } else {
                0.0
            };
            if can_light {
                (OperatingMode::Starting, setpoint)
            } else if core < SPOOLED_DOWN_CORE_PCT && !starter_active {
                (OperatingMode::Off, 0.0)
            } else {
                (OperatingMode::Shutdown, setpoint)
            }
        }
        OperatingMode::Seized => (OperatingMode::Seized, 0.0),
    };

    Transition {
        next,
        setpoint_pct,
        interlocks,
    }
}
