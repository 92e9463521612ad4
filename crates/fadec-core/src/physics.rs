//! Physics integrator
//!
//! Every continuous quantity moves toward a per-tick target with a
//! first-order lag, `x += (target - x) * rate`, with `0 < rate <= 1`, so no
//! quantity can overshoot its target. Fuel flow, oil pressure and vibration
//! are algebraic and carry no state.

use crate::failures::FailureFlags;
use crate::mode::{Interlocks, OperatingMode};
use crate::telemetry::Telemetry;
use rand::Rng;
use serde::{Deserialize, Serialize};

const CORE_RATE_DEFAULT: f64 = 0.1;
const CORE_RATE_STARTER: f64 = 0.05;
const CORE_RATE_COMBUSTION: f64 = 0.08;
const CORE_RATE_RUNNING: f64 = 0.2;
const CORE_RATE_SPOOL_DOWN: f64 = 0.05;
const CORE_RATE_SEIZED: f64 = 1.0;

const FAN_RATE: f64 = 0.08;
const EGT_RATE: f64 = 0.04;
const OIL_TEMP_RATE: f64 = 0.005;
const BLEED_RATE: f64 = 0.2;

/// EGT redline, deg C
pub const EGT_REDLINE_C: f64 = 950.0;
const EGT_FIRE_C: f64 = 1250.0;
const EGT_SEIZED_FIRE_C: f64 = 1200.0;
const EGT_SEIZED_C: f64 = 200.0;
const OIL_TEMP_SEIZED_C: f64 = 200.0;

/// Continuous engine state. Owned by one simulation context, never shared.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsState {
    pub fan_speed_pct: f64,
    pub core_speed_pct: f64,
    pub egt_c: f64,
    pub oil_temp_c: f64,
    pub bleed_psi: f64,
    /// Continuous time with the oil pump failed while turning
    pub oil_failure_dwell_ms: u64,
    /// Continuous time with the fire flag set
    pub fire_dwell_ms: u64,
}

impl PhysicsState {
    /// Cold engine at ambient temperature
    pub fn at_ambient(ambient_c: f64) -> Self {
        Self {
            fan_speed_pct: 0.0,
            core_speed_pct: 0.0,
            egt_c: ambient_c,
            oil_temp_c: ambient_c,
            bleed_psi: 0.0,
            oil_failure_dwell_ms: 0,
            fire_dwell_ms: 0,
        }
    }
}

/// What the integrator reads for one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsInputs {
    /// Mode decided by the state machine for this tick
    pub mode: OperatingMode,
    pub setpoint_pct: f64,
    pub interlocks: Interlocks,
    pub failures: FailureFlags,
    pub throttle: f64,
    pub bleed_valve_open: bool,
    pub pack_l: bool,
    pub pack_r: bool,
    pub ambient_c: f64,
}

fn lag(current: f64, target: f64, rate: f64) -> f64 {
    current + (target - current) * rate
}

/// Core response for the mode and direction of travel
fn core_rate(mode: OperatingMode, starter_active: bool, delta: f64) -> f64 {
    if mode == OperatingMode::Seized {
        return CORE_RATE_SEIZED;
    }
    if delta < 0.0 {
        return CORE_RATE_SPOOL_DOWN;
    }
    match mode {
        OperatingMode::Off if starter_active => CORE_RATE_STARTER,
        OperatingMode::Starting => CORE_RATE_COMBUSTION,
        OperatingMode::Running => CORE_RATE_RUNNING,
        _ => CORE_RATE_DEFAULT,
    }
}

fn fan_target(mode: OperatingMode, core: f64) -> f64 {
    if mode == OperatingMode::Seized {
        return 0.0;
    }
    ((core - 10.0) * 1.05).max(0.0).min(core * 1.1)
}

fn egt_target<R: Rng + ?Sized>(inputs: &PhysicsInputs, core: f64, rng: &mut R) -> f64 {
    let fire = inputs.failures.engine_fire;
    match inputs.mode {
        OperatingMode::Seized if fire => EGT_SEIZED_FIRE_C,
        OperatingMode::Seized => EGT_SEIZED_C,
        _ if fire => EGT_FIRE_C + rng.gen_range(0.0..50.0),
        mode if inputs.interlocks.fuel_flowing && mode != OperatingMode::Off => {
            let base = if mode == OperatingMode::Starting {
                if core < 40.0 {
                    750.0
                } else {
                    550.0
                }
            } else {
                400.0 + (core - 60.0) * 12.0
            };
            if inputs.throttle > 95.0 {
                base + 50.0
            } else {
                base
            }
        }
        // Friction heat and residual
        _ => inputs.ambient_c + core * 2.0,
    }
}

/// Instantaneous fuel flow, kg/h
pub fn fuel_flow(mode: OperatingMode, fuel_flowing: bool, core: f64) -> f64 {
    if !fuel_flowing || mode == OperatingMode::Seized {
        return 0.0;
    }
    if mode == OperatingMode::Starting {
        return 400.0;
    }
    let normalized = ((core - 15.0) / 85.0).max(0.0);
    300.0 + normalized.powf(2.5) * 4500.0
}

fn bleed_target(inputs: &PhysicsInputs, core: f64) -> f64 {
    if inputs.mode == OperatingMode::Seized || !inputs.bleed_valve_open || core <= 20.0 {
        return 0.0;
    }
    let packs = f64::from(u8::from(inputs.pack_l) + u8::from(inputs.pack_r));
    ((core - 20.0) * 0.6 - 4.0 * packs).max(0.0)
}

/// Advance `state` by one tick and return clamped gauge readings
pub fn integrate<R: Rng + ?Sized>(
    state: &mut PhysicsState,
    inputs: &PhysicsInputs,
    timestamp_ms: u64,
    rng: &mut R,
) -> Telemetry {
    let mode = inputs.mode;
    let failures = inputs.failures;

    let delta = inputs.setpoint_pct - state.core_speed_pct;
    let rate = core_rate(mode, inputs.interlocks.starter_active, delta);
    state.core_speed_pct = lag(state.core_speed_pct, inputs.setpoint_pct, rate);
    let core = state.core_speed_pct;

    state.fan_speed_pct = lag(state.fan_speed_pct, fan_target(mode, core), FAN_RATE);

    let egt_target = egt_target(inputs, core, rng);
    state.egt_c = lag(state.egt_c, egt_target, EGT_RATE);

    let fuel_flow_kg_h = fuel_flow(mode, inputs.interlocks.fuel_flowing, core);

    let oil_pressure_target = if failures.oil_pump_failure || mode == OperatingMode::Seized {
        0.0
    } else {
        (core * 1.1).min(90.0)
    };
    let oil_pressure_psi = oil_pressure_target + rng.gen_range(-1.0..1.0);

    let oil_temp_target = if mode == OperatingMode::Seized {
        OIL_TEMP_SEIZED_C
    } else if failures.engine_fire {
        inputs.ambient_c + core * 0.9 + 50.0
    } else {
        inputs.ambient_c + core * 0.9
    };
    state.oil_temp_c = lag(state.oil_temp_c, oil_temp_target, OIL_TEMP_RATE);

    let vibration_ips = if mode == OperatingMode::Seized {
        0.0
    } else if failures.vib_sensor_fault {
        // Faulted sensor reads its own band; rotor noise does not add to it
        4.5 + rng.gen::<f64>()
    } else {
        let mut noise = rng.gen_range(0.0..0.1);
        if mode == OperatingMode::Starting && state.oil_temp_c < 30.0 {
            // Cold oil during a start
            noise += 0.5;
        }
        state.fan_speed_pct / 100.0 * 0.8 + noise
    };

    state.bleed_psi = lag(state.bleed_psi, bleed_target(inputs, core), BLEED_RATE);

    Telemetry {
        fan_speed_pct: state.fan_speed_pct.max(0.0),
        core_speed_pct: state.core_speed_pct.max(0.0),
        egt_c: state.egt_c.max(inputs.ambient_c),
        fuel_flow_kg_h: fuel_flow_kg_h.max(0.0),
        oil_pressure_psi: oil_pressure_psi.max(0.0),
        oil_temp_c: state.oil_temp_c.max(0.0),
        vibration_ips: vibration_ips.max(0.0),
        bleed_psi: state.bleed_psi.max(0.0),
        timestamp_ms,
    }
}
