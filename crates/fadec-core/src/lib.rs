//! FADEC Core
//!
//! Deterministic simulation of a turbofan engine and its control unit:
//! - Failure registry with delayed, cancellable activations
//! - Fire detection loops and two-bottle suppression
//! - First-order-lag physics for spools, temperatures and pressures
//! - Operating-mode state machine with start, shutdown and relight logic
//! - Failure cascades (oil starvation, sustained fire) ending in seizure
//!
//! All state for a session lives in one [`SimulationContext`]. Intents mutate
//! it between ticks; [`SimulationContext::tick`] advances it by one fixed
//! period and returns the published snapshot. Nothing here reads the wall
//! clock; every random draw comes from a seeded ChaCha stream, so a seed and
//! an intent sequence fully determine a run.
//!
//! # Example Usage
//!
//! ```rust
//! use fadec_core::{Controls, ControlsPatch, OperatingMode, SimulationConfig, SimulationContext};
//!
//! let mut ctx = SimulationContext::new(SimulationConfig::default())?;
//! ctx.set_controls(&ControlsPatch::from(Controls::start_configuration()));
//! ctx.run_ticks(150);
//! assert_eq!(ctx.mode(), OperatingMode::Idle);
//! # Ok::<(), fadec_core::FadecError>(())
//! ```

#![allow(missing_docs)]

pub mod config;
pub mod controls;
pub mod engine;
pub mod error;
pub mod failures;
pub mod fire;
pub mod fuel;
pub mod mode;
pub mod physics;
pub mod scenario;
pub mod telemetry;

pub use config::{CascadeConfig, ConfigBuilder, ConfigValidation, SimulationConfig};
pub use controls::{Controls, ControlsPatch};
pub use engine::{Intent, SimulationContext};
pub use error::{FadecError, Result};
pub use failures::{
    FailureConfig, FailureConfigPatch, FailureFlags, FailureId, FailureRegistry, FlagCause,
    FlagChange, ToggleOutcome,
};
pub use fire::{Bottle, BottleState, DischargeOutcome, FireSystemState, LoopStatus, SuppressionConfig};
pub use fuel::{FuelConfig, FuelLevel, FuelSystemState, FuelSystemVariant};
pub use mode::OperatingMode;
pub use physics::EGT_REDLINE_C;
pub use scenario::{Scenario, ScenarioReport, ScenarioRunner};
pub use telemetry::{SeizureCause, SimEvent, Telemetry, TickOutcome, TickSnapshot};
