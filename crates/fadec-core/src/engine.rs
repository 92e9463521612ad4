//! Simulation context and tick
//!
//! [`SimulationContext`] owns every piece of mutable simulation state for one
//! session. External actors change it only through the intent methods (or
//! [`Intent`] values), which are applied between ticks. [`SimulationContext::tick`]
//! advances the whole model by one fixed period:
//!
//! 1. advance simulated time
//! 2. fire scheduled failure activations and due extinguish events
//! 3. evaluate the failure cascades (oil starvation, sustained fire)
//! 4. run the mode state machine
//! 5. integrate physics with the post-transition mode
//! 6. burn fuel, project the detection loops and publish the snapshot

use crate::config::{ConfigValidation, SimulationConfig};
use crate::controls::{Controls, ControlsPatch};
use crate::error::Result;
use crate::failures::{
    FailureConfigPatch, FailureFlags, FailureId, FailureRegistry, FlagCause, ToggleOutcome,
};
use crate::fire::{Bottle, DischargeOutcome, FireSuppression, FireSystemState};
use crate::fuel::{FuelSystem, FuelSystemState};
use crate::mode::{transition, ModeInputs, OperatingMode};
use crate::physics::{integrate, PhysicsInputs, PhysicsState};
use crate::telemetry::{SeizureCause, SimEvent, Telemetry, TickOutcome, TickSnapshot};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// A state change requested by an external actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Intent {
    SetControls {
        controls: ControlsPatch,
    },
    ToggleFailure {
        failure: FailureId,
    },
    TriggerKey {
        key: String,
    },
    UpdateFailureConfig {
        failure: FailureId,
        patch: FailureConfigPatch,
    },
    PullFireHandle,
    ToggleMasterArm,
    DischargeBottle {
        bottle: Bottle,
    },
}

/// All simulation state for one session
#[derive(Debug, Clone)]
pub struct SimulationContext {
    session_id: Uuid,
    config: SimulationConfig,
    controls: Controls,
    registry: FailureRegistry,
    fire: FireSuppression,
    fuel: FuelSystem,
    physics: PhysicsState,
    telemetry: Telemetry,
    mode: OperatingMode,
    tick: u64,
    elapsed_ms: u64,
    rng: ChaCha8Rng,
    /// Events from intents applied since the last tick
    pending_events: Vec<SimEvent>,
}

impl SimulationContext {
    /// Validate `config` and build a cold engine from it
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let registry = FailureRegistry::new(&config.failures)?;
        let session_id = Uuid::new_v4();
        info!(%session_id, seed = config.seed, "simulation session created");

        Ok(Self {
            session_id,
            controls: Controls::default(),
            registry,
            fire: FireSuppression::new(config.suppression),
            fuel: FuelSystem::new(config.fuel),
            physics: PhysicsState::at_ambient(config.ambient_c),
            telemetry: Telemetry::at_rest(config.ambient_c),
            mode: OperatingMode::Off,
            tick: 0,
            elapsed_ms: 0,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            pending_events: Vec::new(),
            config,
        })
    }

    /// Discard the session and start again from the loaded configuration
    pub fn reset(&mut self) -> Result<()> {
        *self = Self::new(self.config.clone())?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn failures(&self) -> FailureFlags {
        self.registry.flags()
    }

    pub fn registry(&self) -> &FailureRegistry {
        &self.registry
    }

    pub fn fire_state(&self) -> FireSystemState {
        self.fire.state()
    }

    pub fn fuel_state(&self) -> Option<FuelSystemState> {
        self.fuel.state()
    }

    pub fn physics(&self) -> &PhysicsState {
        &self.physics
    }

    /// Readings published by the most recent tick
    pub fn telemetry(&self) -> Telemetry {
        self.telemetry
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn snapshot(&self) -> TickSnapshot {
        TickSnapshot {
            tick: self.tick,
            elapsed_ms: self.elapsed_ms,
            mode: self.mode,
            telemetry: self.telemetry,
            fire: self.fire.state(),
            failures: self.registry.flags(),
            controls: self.controls,
            fuel: self.fuel.state(),
        }
    }

    // ------------------------------------------------------------------
    // Intents
    // ------------------------------------------------------------------

    /// Merge a partial control update
    pub fn set_controls(&mut self, patch: &ControlsPatch) {
        self.controls.apply(patch);
        debug!(?patch, "controls updated");
    }

    pub fn toggle_failure(&mut self, id: FailureId) -> ToggleOutcome {
        let outcome = self.registry.toggle(id, self.elapsed_ms, self.tick);
        if let ToggleOutcome::Scheduled { due_ms } = outcome {
            self.pending_events.push(SimEvent::FailureScheduled {
                failure: id,
                due_ms,
            });
        }
        outcome
    }

    /// Toggle by name; unknown names are rejected without touching state
    pub fn toggle_failure_by_name(&mut self, name: &str) -> Result<ToggleOutcome> {
        let id = name.parse::<FailureId>()?;
        Ok(self.toggle_failure(id))
    }

    pub fn update_failure_config(&mut self, id: FailureId, patch: &FailureConfigPatch) -> Result<()> {
        if let Err(err) = self.registry.update_config(id, patch) {
            warn!(failure = %id, %err, "failure config update rejected");
            return Err(err);
        }
        Ok(())
    }

    /// Toggle the failure bound to `key`. Unbound keys do nothing.
    pub fn trigger_key(&mut self, key: &str) -> Option<(FailureId, ToggleOutcome)> {
        let id = self.registry.id_for_trigger_key(key)?;
        Some((id, self.toggle_failure(id)))
    }

    /// Toggle the fire handle; returns the new position
    pub fn pull_fire_handle(&mut self) -> bool {
        let pulled = self.fire.pull_handle();
        self.pending_events.push(SimEvent::FireHandle { pulled });
        pulled
    }

    /// Toggle the squib arming switch; returns the new position
    pub fn toggle_fire_master_arm(&mut self) -> bool {
        let armed = self.fire.toggle_master_arm();
        self.pending_events.push(SimEvent::MasterArm { armed });
        armed
    }

    pub fn discharge_bottle(&mut self, bottle: Bottle) -> DischargeOutcome {
        let fire_active = self.registry.is_active(FailureId::EngineFire);
        let outcome = self
            .fire
            .discharge(bottle, fire_active, self.elapsed_ms, &mut self.rng);
        match outcome {
            DischargeOutcome::Discharged { extinguish_due_ms } => {
                self.pending_events.push(SimEvent::BottleDischarged {
                    bottle,
                    extinguish_scheduled: extinguish_due_ms.is_some(),
                });
            }
            refused => debug!(%bottle, ?refused, "discharge refused"),
        }
        outcome
    }

    /// Apply one queued intent
    pub fn apply_intent(&mut self, intent: &Intent) -> Result<()> {
        match intent {
            Intent::SetControls { controls } => self.set_controls(controls),
            Intent::ToggleFailure { failure } => {
                self.toggle_failure(*failure);
            }
            Intent::TriggerKey { key } => {
                if self.trigger_key(key).is_none() {
                    debug!(%key, "trigger key not bound");
                }
            }
            Intent::UpdateFailureConfig { failure, patch } => {
                self.update_failure_config(*failure, patch)?;
            }
            Intent::PullFireHandle => {
                self.pull_fire_handle();
            }
            Intent::ToggleMasterArm => {
                self.toggle_fire_master_arm();
            }
            Intent::DischargeBottle { bottle } => {
                self.discharge_bottle(*bottle);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advance the simulation by one period. Never fails.
    pub fn tick(&mut self) -> TickOutcome {
        let previous_mode = self.mode;
        let mut tick_events = Vec::new();

        // 1. Advance time
        self.tick += 1;
        self.elapsed_ms += self.config.tick_period_ms;
        let now = self.elapsed_ms;

        // 2. Scheduled activations and extinguish events
        self.registry.activate_due(now, self.tick);
        if self.fire.take_due_extinguish(now)
            && self
                .registry
                .set_by_rule(FailureId::EngineFire, false, FlagCause::Suppression, now, self.tick)
        {
            info!(tick = self.tick, "fire extinguished");
            tick_events.push(SimEvent::Extinguished);
        }

        // 3. Cascades, which may force seizure ahead of the table
        if let Some(cause) = self.evaluate_cascades() {
            warn!(tick = self.tick, ?cause, core_pct = self.physics.core_speed_pct, "engine seized");
            self.mode = OperatingMode::Seized;
            tick_events.push(SimEvent::Seized { cause });
        }

        // 4. Mode state machine
        let flags = self.registry.flags();
        let inputs = ModeInputs::new(
            &self.controls,
            self.fuel.supply_enabled(&self.controls),
            &flags,
            self.fire.handle_pulled(),
            self.physics.core_speed_pct,
        );
        let step = transition(self.mode, &inputs);
        self.mode = step.next;

        // 5. Physics, using the mode just decided
        let physics_inputs = PhysicsInputs {
            mode: self.mode,
            setpoint_pct: step.setpoint_pct,
            interlocks: step.interlocks,
            failures: flags,
            throttle: self.controls.throttle(),
            bleed_valve_open: self.controls.bleed_air,
            pack_l: self.controls.pack_l,
            pack_r: self.controls.pack_r,
            ambient_c: self.config.ambient_c,
        };
        self.telemetry = integrate(&mut self.physics, &physics_inputs, now, &mut self.rng);

        // 6. Fuel burn and detection loops
        self.fuel
            .step(&self.controls, self.telemetry.fuel_flow_kg_h, self.config.tick_period_ms);
        self.fire.sync_loops(flags.engine_fire);

        if self.mode != previous_mode {
            info!(tick = self.tick, from = %previous_mode, to = %self.mode, "mode changed");
            tick_events.push(SimEvent::ModeChanged {
                from: previous_mode,
                to: self.mode,
            });
        }
        trace!(tick = self.tick, mode = %self.mode, telemetry = ?self.telemetry, "tick");

        let mut events = std::mem::take(&mut self.pending_events);
        events.extend(self.registry.drain_journal().into_iter().map(SimEvent::Flag));
        events.extend(tick_events);

        TickOutcome {
            snapshot: self.snapshot(),
            events,
        }
    }

    /// Run `ticks` ticks and collect their events
    pub fn run_ticks(&mut self, ticks: u64) -> Vec<SimEvent> {
        let mut events = Vec::new();
        for _ in 0..ticks {
            events.extend(self.tick().events);
        }
        events
    }

    /// Oil starvation first, then sustained fire. Returns the seizure cause
    /// if either dwell limit was crossed this tick.
    fn evaluate_cascades(&mut self) -> Option<SeizureCause> {
        let period = self.config.tick_period_ms;
        let cascade = self.config.cascade;
        let now = self.elapsed_ms;

        if self.registry.is_active(FailureId::OilPumpFailure) {
            let turning = !matches!(self.mode, OperatingMode::Off | OperatingMode::Seized)
                && self.physics.core_speed_pct > cascade.oil_cascade_min_core_pct;
            if turning {
                self.physics.oil_failure_dwell_ms += period;
                if self.registry.set_by_rule(
                    FailureId::EngineFire,
                    true,
                    FlagCause::OilPumpCascade,
                    now,
                    self.tick,
                ) {
                    warn!(tick = self.tick, "oil starvation ignited the engine");
                }
                if self.physics.oil_failure_dwell_ms > cascade.oil_seizure_dwell_ms {
                    return Some(SeizureCause::OilStarvation);
                }
            }
        } else {
            self.physics.oil_failure_dwell_ms = 0;
        }

        if self.registry.is_active(FailureId::EngineFire) {
            if self.mode != OperatingMode::Seized {
                self.physics.fire_dwell_ms += period;
                if self.physics.fire_dwell_ms > cascade.fire_seizure_dwell_ms {
                    return Some(SeizureCause::SustainedFire);
                }
            }
        } else {
            self.physics.fire_dwell_ms = 0;
        }

        None
    }
}
