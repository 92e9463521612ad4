//! Per-tick output records

use crate::controls::Controls;
use crate::failures::{FailureFlags, FailureId, FlagChange};
use crate::fire::{Bottle, FireSystemState};
use crate::fuel::FuelSystemState;
use crate::mode::OperatingMode;
use serde::{Deserialize, Serialize};

/// Gauge readings for one tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Telemetry {
    /// N1, %
    pub fan_speed_pct: f64,
    /// N2, %
    pub core_speed_pct: f64,
    /// Exhaust gas temperature, deg C
    pub egt_c: f64,
    /// kg/h
    pub fuel_flow_kg_h: f64,
    pub oil_pressure_psi: f64,
    pub oil_temp_c: f64,
    /// Vibration, inches per second
    pub vibration_ips: f64,
    pub bleed_psi: f64,
    /// Simulated time at the end of the tick
    pub timestamp_ms: u64,
}

impl Telemetry {
    /// Engine at rest at `ambient_c`
    pub fn at_rest(ambient_c: f64) -> Self {
        Self {
            fan_speed_pct: 0.0,
            core_speed_pct: 0.0,
            egt_c: ambient_c,
            fuel_flow_kg_h: 0.0,
            oil_pressure_psi: 0.0,
            oil_temp_c: ambient_c,
            vibration_ips: 0.0,
            bleed_psi: 0.0,
            timestamp_ms: 0,
        }
    }

    /// True when every reading is a finite number
    pub fn is_finite(&self) -> bool {
        [
            self.fan_speed_pct,
            self.core_speed_pct,
            self.egt_c,
            self.fuel_flow_kg_h,
            self.oil_pressure_psi,
            self.oil_temp_c,
            self.vibration_ips,
            self.bleed_psi,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Everything an observer needs after a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickSnapshot {
    pub tick: u64,
    pub elapsed_ms: u64,
    pub mode: OperatingMode,
    pub telemetry: Telemetry,
    pub fire: FireSystemState,
    pub failures: FailureFlags,
    pub controls: Controls,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel: Option<FuelSystemState>,
}

/// Why the engine seized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeizureCause {
    OilStarvation,
    SustainedFire,
}

/// Discrete things that happened since the previous tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimEvent {
    ModeChanged {
        from: OperatingMode,
        to: OperatingMode,
    },
    Flag(FlagChange),
    FailureScheduled {
        failure: FailureId,
        due_ms: u64,
    },
    Seized {
        cause: SeizureCause,
    },
    FireHandle {
        pulled: bool,
    },
    MasterArm {
        armed: bool,
    },
    BottleDischarged {
        bottle: Bottle,
        extinguish_scheduled: bool,
    },
    Extinguished,
}

/// Result of one tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub snapshot: TickSnapshot,
    pub events: Vec<SimEvent>,
}

impl TickOutcome {
    /// Flag changes among the events
    pub fn flag_changes(&self) -> impl Iterator<Item = &FlagChange> {
        self.events.iter().filter_map(|e| match e {
            SimEvent::Flag(change) => Some(change),
            _ => None,
        })
    }
}
