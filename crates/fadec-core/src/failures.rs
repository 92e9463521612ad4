//! Failure registry
//!
//! Holds the operator-configured failure definitions, the authoritative flag
//! store and one scheduled-activation slot per failure id. Flags have two
//! write paths: operator intent (`toggle`, delayed activation) and the rules
//! evaluated inside the tick (oil-pump cascade, fire suppression). Every
//! change lands in a journal that the tick drains into its events.
//!
//! Scheduling is expressed in simulated milliseconds. A slot holds at most one
//! pending activation; re-scheduling overwrites it and clearing the flag
//! empties it, so a cancelled activation has nothing left to fire.

use crate::error::{FadecError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Injectable failure identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureId {
    /// Engine fire, also raised by the oil-pump cascade
    #[serde(alias = "engine_fire")]
    EngineFire,
    /// Loss of oil pump pressure
    #[serde(alias = "oil_pump_failure")]
    OilPumpFailure,
    /// Loss of engine-driven fuel pump
    #[serde(alias = "fuel_pump_failure")]
    FuelPumpFailure,
    /// Vibration pickup reads full scale
    #[serde(alias = "vib_sensor_fault")]
    VibSensorFault,
}

impl FailureId {
    /// Every failure id, in slot order
    pub const ALL: [FailureId; 4] = [
        FailureId::EngineFire,
        FailureId::OilPumpFailure,
        FailureId::FuelPumpFailure,
        FailureId::VibSensorFault,
    ];

    const fn index(self) -> usize {
        match self {
            FailureId::EngineFire => 0,
            FailureId::OilPumpFailure => 1,
            FailureId::FuelPumpFailure => 2,
            FailureId::VibSensorFault => 3,
        }
    }

    /// Canonical camel-case name
    pub const fn as_str(self) -> &'static str {
        match self {
            FailureId::EngineFire => "engineFire",
            FailureId::OilPumpFailure => "oilPumpFailure",
            FailureId::FuelPumpFailure => "fuelPumpFailure",
            FailureId::VibSensorFault => "vibSensorFault",
        }
    }

    /// Panel label shown to the operator
    pub const fn default_label(self) -> &'static str {
        match self {
            FailureId::EngineFire => "Engine Fire",
            FailureId::OilPumpFailure => "Oil Pump Fail",
            FailureId::FuelPumpFailure => "Fuel Pump Fail",
            FailureId::VibSensorFault => "Vib Sensor Fault",
        }
    }
}

impl fmt::Display for FailureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureId {
    type Err = FadecError;

    /// Accepts `engineFire`, `engine_fire`, `ENGINE-FIRE` and so on.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        FailureId::ALL
            .into_iter()
            .find(|id| id.as_str().to_ascii_lowercase() == normalized)
            .ok_or_else(|| FadecError::UnknownFailure(s.to_string()))
    }
}

/// Independent failure flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureFlags {
    pub engine_fire: bool,
    pub oil_pump_failure: bool,
    pub fuel_pump_failure: bool,
    pub vib_sensor_fault: bool,
}

impl FailureFlags {
    /// Read one flag
    pub fn get(&self, id: FailureId) -> bool {
        match id {
            FailureId::EngineFire => self.engine_fire,
            FailureId::OilPumpFailure => self.oil_pump_failure,
            FailureId::FuelPumpFailure => self.fuel_pump_failure,
            FailureId::VibSensorFault => self.vib_sensor_fault,
        }
    }

    fn set(&mut self, id: FailureId, active: bool) {
        match id {
            FailureId::EngineFire => self.engine_fire = active,
            FailureId::OilPumpFailure => self.oil_pump_failure = active,
            FailureId::FuelPumpFailure => self.fuel_pump_failure = active,
            FailureId::VibSensorFault => self.vib_sensor_fault = active,
        }
    }

    /// True when any failure is active
    pub fn any(&self) -> bool {
        FailureId::ALL.into_iter().any(|id| self.get(id))
    }

    /// Ids of the active failures
    pub fn active(&self) -> Vec<FailureId> {
        FailureId::ALL
            .into_iter()
            .filter(|id| self.get(*id))
            .collect()
    }
}

/// Operator configuration for one failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureConfig {
    pub id: FailureId,
    #[serde(default)]
    pub label: String,
    /// Activation delay in seconds, 0 activates on toggle
    #[serde(default)]
    pub delay_secs: f64,
    /// Key that toggles this failure, matched case-insensitively
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_key: Option<String>,
}

impl FailureConfig {
    /// Default configuration: labelled, instantaneous, unbound
    pub fn new(id: FailureId) -> Self {
        Self {
            id,
            label: id.default_label().to_string(),
            delay_secs: 0.0,
            trigger_key: None,
        }
    }

    /// Activation delay rounded to simulated milliseconds
    pub fn delay_ms(&self) -> u64 {
        (self.delay_secs * 1000.0).round() as u64
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_delay(self.id, self.delay_secs)?;
        if let Some(key) = &self.trigger_key {
            if key.trim().is_empty() {
                return Err(FadecError::configuration(format!(
                    "trigger key for {} must not be blank",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

fn validate_delay(id: FailureId, delay_secs: f64) -> Result<()> {
    if !delay_secs.is_finite() || delay_secs < 0.0 {
        return Err(FadecError::configuration(format!(
            "delay for {id} must be a finite number of seconds >= 0, got {delay_secs}"
        )));
    }
    Ok(())
}

/// The four failures with zero delay and no trigger keys
pub fn default_failure_configs() -> Vec<FailureConfig> {
    FailureId::ALL.into_iter().map(FailureConfig::new).collect()
}

/// Partial update to a [`FailureConfig`]
///
/// An empty `trigger_key` string unbinds the key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailureConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_key: Option<String>,
}

impl FailureConfigPatch {
    pub fn delay(delay_secs: f64) -> Self {
        Self {
            delay_secs: Some(delay_secs),
            ..Self::default()
        }
    }

    pub fn trigger_key(key: impl Into<String>) -> Self {
        Self {
            trigger_key: Some(key.into()),
            ..Self::default()
        }
    }
}

/// Why a flag changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagCause {
    /// Direct operator toggle
    Operator,
    /// A delayed operator activation came due
    ScheduledActivation,
    /// Oil starvation ignited the engine
    OilPumpCascade,
    /// A suppression bottle put the fire out
    Suppression,
}

/// Journal entry for one flag change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagChange {
    pub failure: FailureId,
    pub active: bool,
    pub cause: FlagCause,
    /// Simulated time of the change
    pub at_ms: u64,
    /// Tick counter at the time of the change
    pub tick: u64,
}

/// A pending delayed activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingActivation {
    pub scheduled_at_ms: u64,
    pub due_ms: u64,
}

/// Result of an operator toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The failure was active and is now clear
    Cleared,
    /// The failure is now active
    Activated,
    /// Activation will happen at `due_ms`, replacing any earlier schedule
    Scheduled { due_ms: u64 },
}

/// Flag store plus per-id configuration and scheduling slots
#[derive(Debug, Clone)]
pub struct FailureRegistry {
    configs: [FailureConfig; 4],
    flags: FailureFlags,
    pending: [Option<PendingActivation>; 4],
    journal: Vec<FlagChange>,
}

impl FailureRegistry {
    /// Build from configuration; ids not listed get their defaults.
    pub fn new(configs: &[FailureConfig]) -> Result<Self> {
        let mut slots = FailureId::ALL.map(FailureConfig::new);
        let mut seen = [false; 4];
        for config in configs {
            config.validate()?;
            let idx = config.id.index();
            if seen[idx] {
                return Err(FadecError::configuration(format!(
                    "duplicate configuration for failure {}",
                    config.id
                )));
            }
            seen[idx] = true;
            let mut config = config.clone();
            if config.label.is_empty() {
                config.label = config.id.default_label().to_string();
            }
            slots[idx] = config;
        }
        let registry = Self {
            configs: slots,
            flags: FailureFlags::default(),
            pending: [None; 4],
            journal: Vec::new(),
        };
        registry.check_unique_keys()?;
        Ok(registry)
    }

    pub fn flags(&self) -> FailureFlags {
        self.flags
    }

    pub fn is_active(&self, id: FailureId) -> bool {
        self.flags.get(id)
    }

    pub fn config(&self, id: FailureId) -> &FailureConfig {
        &self.configs[id.index()]
    }

    pub fn configs(&self) -> impl Iterator<Item = &FailureConfig> {
        self.configs.iter()
    }

    /// The scheduled activation for `id`, if any
    pub fn pending(&self, id: FailureId) -> Option<PendingActivation> {
        self.pending[id.index()]
    }

    /// Operator toggle.
    ///
    /// Active failures clear immediately and lose any pending activation.
    /// Inactive failures activate now (zero delay) or get scheduled at
    /// `now_ms + delay`, overwriting whatever the slot held.
    pub fn toggle(&mut self, id: FailureId, now_ms: u64, tick: u64) -> ToggleOutcome {
        let idx = id.index();
        self.pending[idx] = None;

        if self.flags.get(id) {
            self.write(id, false, FlagCause::Operator, now_ms, tick);
            return ToggleOutcome::Cleared;
        }

        let delay_ms = self.configs[idx].delay_ms();
        if delay_ms == 0 {
            self.write(id, true, FlagCause::Operator, now_ms, tick);
            ToggleOutcome::Activated
        } else {
            let due_ms = now_ms.saturating_add(delay_ms);
            self.pending[idx] = Some(PendingActivation {
                scheduled_at_ms: now_ms,
                due_ms,
            });
            debug!(failure = %id, due_ms, "failure activation scheduled");
            ToggleOutcome::Scheduled { due_ms }
        }
    }

    /// Apply a configuration patch. Activation state and pending slots are
    /// left alone; a new delay applies to the next toggle.
    pub fn update_config(&mut self, id: FailureId, patch: &FailureConfigPatch) -> Result<()> {
        let mut updated = self.configs[id.index()].clone();
        if let Some(label) = &patch.label {
            updated.label = label.clone();
        }
        if let Some(delay_secs) = patch.delay_secs {
            validate_delay(id, delay_secs)?;
            updated.delay_secs = delay_secs;
        }
        if let Some(key) = &patch.trigger_key {
            updated.trigger_key = if key.trim().is_empty() {
                None
            } else {
                Some(key.trim().to_string())
            };
        }

        let previous = std::mem::replace(&mut self.configs[id.index()], updated);
        if let Err(err) = self.check_unique_keys() {
            self.configs[id.index()] = previous;
            return Err(err);
        }
        Ok(())
    }

    /// Failure bound to `key`, compared case-insensitively
    pub fn id_for_trigger_key(&self, key: &str) -> Option<FailureId> {
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        self.configs
            .iter()
            .find(|c| {
                c.trigger_key
                    .as_deref()
                    .is_some_and(|bound| bound.eq_ignore_ascii_case(key))
            })
            .map(|c| c.id)
    }

    /// Fire every slot whose due time has been reached. Each slot is taken
    /// before its flag is written, so it can fire at most once.
    pub fn activate_due(&mut self, now_ms: u64, tick: u64) -> Vec<FailureId> {
        let mut fired = Vec::new();
        for id in FailureId::ALL {
            let idx = id.index();
            let due = matches!(self.pending[idx], Some(p) if p.due_ms <= now_ms);
            if due {
                self.pending[idx] = None;
                self.write(id, true, FlagCause::ScheduledActivation, now_ms, tick);
                fired.push(id);
            }
        }
        fired
    }

    /// Rule-driven write path used inside the tick
    pub(crate) fn set_by_rule(
        &mut self,
        id: FailureId,
        active: bool,
        cause: FlagCause,
        now_ms: u64,
        tick: u64,
    ) -> bool {
        self.write(id, active, cause, now_ms, tick)
    }

    /// Take every journal entry recorded since the last drain
    pub fn drain_journal(&mut self) -> Vec<FlagChange> {
        std::mem::take(&mut self.journal)
    }

    fn write(&mut self, id: FailureId, active: bool, cause: FlagCause, now_ms: u64, tick: u64) -> bool {
        if self.flags.get(id) == active {
            return false;
        }
        self.flags.set(id, active);
        if active {
            warn!(failure = %id, ?cause, at_ms = now_ms, "failure active");
        } else {
            debug!(failure = %id, ?cause, at_ms = now_ms, "failure cleared");
        }
        self.journal.push(FlagChange {
            failure: id,
            active,
            cause,
            at_ms: now_ms,
            tick,
        });
        true
    }

    fn check_unique_keys(&self) -> Result<()> {
        for (i, a) in self.configs.iter().enumerate() {
            let Some(key_a) = a.trigger_key.as_deref() else {
                continue;
            };
            for b in &self.configs[i + 1..] {
                if b
                    .trigger_key
                    .as_deref()
                    .is_some_and(|key_b| key_b.eq_ignore_ascii_case(key_a))
                {
                    return Err(FadecError::configuration(format!(
                        "trigger key '{key_a}' is bound to both {} and {}",
                        a.id, b.id
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for FailureRegistry {
    fn default() -> Self {
        Self {
            configs: FailureId::ALL.map(FailureConfig::new),
            flags: FailureFlags::default(),
            pending: [None; 4],
            journal: Vec::new(),
        }
    }
}
