//! Declarative TOML scenarios
//!
//! A scenario is a configuration, a list of timed intents and a set of
//! expectations checked after the run. Scenarios run in simulated time, as
//! fast as the host allows.
//!
//! ```toml
//! duration_ms = 3000
//!
//! [metadata]
//! name = "start"
//! description = "Normal start to idle"
//!
//! [[steps]]
//! at_ms = 0
//! action = "set_controls"
//! controls = { master_switch = true, fuel_pump = true, ignition = true, starter = true }
//!
//! [expect]
//! mode = "IDLE"
//! ```

use crate::config::{ConfigValidation, SimulationConfig};
use crate::engine::{Intent, SimulationContext};
use crate::error::{FadecError, Result};
use crate::failures::{FailureId, FlagChange};
use crate::mode::OperatingMode;
use crate::telemetry::{SeizureCause, SimEvent, TickSnapshot};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Scenario metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// One timed intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStep {
    /// Applied before the first tick starting at or after this time
    pub at_ms: u64,
    #[serde(flatten)]
    pub intent: Intent,
}

/// Conditions checked against the final state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioExpectations {
    /// Mode at the end of the run
    pub mode: Option<OperatingMode>,
    pub min_core_pct: Option<f64>,
    pub max_core_pct: Option<f64>,
    /// Exact set of active failures at the end of the run
    pub failures_active: Option<Vec<FailureId>>,
    /// Modes that must have been entered during the run
    pub visited: Vec<OperatingMode>,
    pub seizure: Option<SeizureCause>,
}

/// A complete scenario file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub metadata: ScenarioMetadata,
    /// Simulated run length
    pub duration_ms: u64,
    #[serde(default)]
    pub config: SimulationConfig,
    #[serde(default)]
    pub steps: Vec<ScenarioStep>,
    #[serde(default)]
    pub expect: ScenarioExpectations,
}

impl Scenario {
    /// Parse and validate a TOML scenario
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(source)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Read, parse and validate a scenario file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading scenario");
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        if self.metadata.name.trim().is_empty() {
            return Err(FadecError::InvalidScenario(
                "metadata.name must not be empty".to_string(),
            ));
        }
        if self.duration_ms == 0 {
            return Err(FadecError::InvalidScenario(
                "duration_ms must be greater than 0".to_string(),
            ));
        }
        if let Some(step) = self.steps.iter().find(|s| s.at_ms >= self.duration_ms) {
            return Err(FadecError::InvalidScenario(format!(
                "step at {} ms is outside the {} ms run",
                step.at_ms, self.duration_ms
            )));
        }
        if let (Some(min), Some(max)) = (self.expect.min_core_pct, self.expect.max_core_pct) {
            if min > max {
                return Err(FadecError::InvalidScenario(
                    "expect.min_core_pct must be <= expect.max_core_pct".to_string(),
                ));
            }
        }
        self.config.validate()
    }
}

/// A mode change observed during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeRecord {
    pub tick: u64,
    pub at_ms: u64,
    pub from: OperatingMode,
    pub to: OperatingMode,
}

/// Outcome of a scenario run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub session_id: Uuid,
    pub ticks: u64,
    pub elapsed_ms: u64,
    pub mode_history: Vec<ModeRecord>,
    pub flag_changes: Vec<FlagChange>,
    pub seizure: Option<SeizureCause>,
    pub final_snapshot: TickSnapshot,
    /// Expectation failures, empty when the scenario passed
    pub failures: Vec<String>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether `mode` was entered at any point
    pub fn visited(&self, mode: OperatingMode) -> bool {
        self.mode_history.iter().any(|r| r.to == mode)
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.passed() { "PASS" } else { "FAIL" };
        writeln!(
            f,
            "{verdict} {} ({} ticks, {} ms)",
            self.name, self.ticks, self.elapsed_ms
        )?;
        for record in &self.mode_history {
            writeln!(f, "  {:>7} ms  {} -> {}", record.at_ms, record.from, record.to)?;
        }
        let t = &self.final_snapshot.telemetry;
        writeln!(
            f,
            "  final: {} N1 {:.1}% N2 {:.1}% EGT {:.0}C oil {:.0}psi",
            self.final_snapshot.mode, t.fan_speed_pct, t.core_speed_pct, t.egt_c, t.oil_pressure_psi
        )?;
        for failure in &self.failures {
            writeln!(f, "  expectation failed: {failure}")?;
        }
        Ok(())
    }
}

/// Executes scenarios against a fresh simulation context
pub struct ScenarioRunner;

impl ScenarioRunner {
    pub fn run(scenario: &Scenario) -> Result<ScenarioReport> {
        scenario.validate()?;
        let mut ctx = SimulationContext::new(scenario.config.clone())?;
        info!(scenario = %scenario.metadata.name, session_id = %ctx.session_id(), "running scenario");

        let mut steps: Vec<&ScenarioStep> = scenario.steps.iter().collect();
        steps.sort_by_key(|s| s.at_ms);
        let mut steps = steps.into_iter().peekable();

        let mut mode_history = Vec::new();
        let mut flag_changes = Vec::new();
        let mut seizure = None;
        let mut snapshot = ctx.snapshot();

        while ctx.elapsed_ms() < scenario.duration_ms {
            while let Some(step) = steps.next_if(|s| s.at_ms <= ctx.elapsed_ms()) {
                ctx.apply_intent(&step.intent).map_err(|err| {
                    FadecError::InvalidScenario(format!("step at {} ms: {err}", step.at_ms))
                })?;
            }

            let outcome = ctx.tick();
            for event in &outcome.events {
                match *event {
                    SimEvent::ModeChanged { from, to } => mode_history.push(ModeRecord {
                        tick: outcome.snapshot.tick,
                        at_ms: outcome.snapshot.elapsed_ms,
                        from,
                        to,
                    }),
                    SimEvent::Flag(change) => flag_changes.push(change),
                    SimEvent::Seized { cause } => seizure = Some(cause),
                    _ => {}
                }
            }
            snapshot = outcome.snapshot;
        }

        let failures = check_expectations(&scenario.expect, &snapshot, &mode_history, seizure);
        if !failures.is_empty() {
            warn!(scenario = %scenario.metadata.name, failed = failures.len(), "scenario expectations failed");
        }

        Ok(ScenarioReport {
            name: scenario.metadata.name.clone(),
            session_id: ctx.session_id(),
            ticks: ctx.tick_count(),
            elapsed_ms: ctx.elapsed_ms(),
            mode_history,
            flag_changes,
            seizure,
            final_snapshot: snapshot,
            failures,
        })
    }
}

fn check_expectations(
    expect: &ScenarioExpectations,
    snapshot: &TickSnapshot,
    history: &[ModeRecord],
    seizure: Option<SeizureCause>,
) -> Vec<String> {
    let mut failures = Vec::new();
    let core = snapshot.telemetry.core_speed_pct;

    if let Some(mode) = expect.mode {
        if snapshot.mode != mode {
            failures.push(format!("final mode {} (expected {mode})", snapshot.mode));
        }
    }
    if let Some(min) = expect.min_core_pct {
        if core < min {
            failures.push(format!("core speed {core:.2}% below {min}%"));
        }
    }
    if let Some(max) = expect.max_core_pct {
        if core > max {
            failures.push(format!("core speed {core:.2}% above {max}%"));
        }
    }
    if let Some(expected) = &expect.failures_active {
        let mut expected = expected.clone();
        expected.sort();
        expected.dedup();
        let active = snapshot.failures.active();
        if active != expected {
            failures.push(format!("active failures {active:?} (expected {expected:?})"));
        }
    }
    for mode in &expect.visited {
        if !history.iter().any(|r| r.to == *mode) {
            failures.push(format!("mode {mode} never entered"));
        }
    }
    if expect.seizure.is_some() && seizure != expect.seizure {
        failures.push(format!("seizure {seizure:?} (expected {:?})", expect.seizure));
    }
    failures
}
