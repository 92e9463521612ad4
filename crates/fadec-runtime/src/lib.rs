//! FADEC Runtime
//!
//! Real-time execution for the engine simulation:
//! - [`EngineRuntime`] ticks a simulation context on a fixed tokio interval
//! - [`EngineHandle`] queues operator intents from any task
//! - Snapshots are published on a watch channel, events on a broadcast channel
//! - [`advisor`] bounds calls to an external status summarizer
//!
//! ```rust,ignore
//! let runtime = EngineRuntime::start(SimulationConfig::default())?;
//! let engine = runtime.handle();
//! engine.set_controls(ControlsPatch::from(Controls::start_configuration()))?;
//!
//! let mut snapshots = runtime.subscribe();
//! snapshots.changed().await?;
//! println!("{}", snapshots.borrow().mode);
//! runtime.shutdown().await;
//! ```

#![allow(missing_docs)]

pub mod advisor;
pub mod driver;
pub mod error;

pub use advisor::{
    diagnostic_alert, summarize_or_fallback, AlertLevel, StatusAdvisor, StatusRequest,
    SystemAlert, ThresholdAdvisor,
};
pub use driver::{EngineHandle, EngineRuntime};
pub use error::{AdvisorError, Result, RuntimeError};
