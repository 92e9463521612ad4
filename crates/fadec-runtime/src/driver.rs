//! Fixed-period tick driver
//!
//! Runs one [`SimulationContext`] on a tokio interval. Intents from any
//! number of [`EngineHandle`]s are queued and applied between ticks, so an
//! intent never observes or interleaves with a partially applied tick.
//!
//! # Blocking Lock Usage
//!
//! Uses `parking_lot::Mutex` for the simulation context because:
//! 1. The lock is held for one intent drain plus one tick
//! 2. Lock is never held across `.await` points
//! 3. No I/O or async work inside lock scope

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use fadec_core::{
    Bottle, ControlsPatch, FailureConfigPatch, FailureId, Intent, SimEvent,
    SimulationConfig, SimulationContext, TickSnapshot,
};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::{Result, RuntimeError};

/// Capacity of the event fan-out; slow subscribers lag rather than block
const EVENT_CHANNEL_CAPACITY: usize = 1024;

enum Command {
    Apply {
        intent: Intent,
        reply: Option<oneshot::Sender<fadec_core::Result<()>>>,
    },
    Reset,
}

/// Cloneable handle for submitting intents to a running engine
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl EngineHandle {
    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| RuntimeError::Stopped)
    }

    /// Queue an intent for the next tick
    pub fn submit(&self, intent: Intent) -> Result<()> {
        self.send(Command::Apply {
            intent,
            reply: None,
        })
    }

    /// Queue an intent and wait until it has been applied
    pub async fn apply(&self, intent: Intent) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Apply {
            intent,
            reply: Some(tx),
        })?;
        rx.await
            .map_err(|_| RuntimeError::Stopped)?
            .map_err(RuntimeError::Rejected)
    }

    pub fn set_controls(&self, controls: ControlsPatch) -> Result<()> {
        self.submit(Intent::SetControls { controls })
    }

    pub fn toggle_failure(&self, failure: FailureId) -> Result<()> {
        self.submit(Intent::ToggleFailure { failure })
    }

    /// Toggle by name; unknown names are rejected here and never queued
    pub fn toggle_failure_by_name(&self, name: &str) -> Result<()> {
        let failure = name.parse::<FailureId>().map_err(RuntimeError::Rejected)?;
        self.toggle_failure(failure)
    }

    /// Configuration updates report validation errors back to the caller
    pub async fn update_failure_config(
        &self,
        failure: FailureId,
        patch: FailureConfigPatch,
    ) -> Result<()> {
        self.apply(Intent::UpdateFailureConfig { failure, patch })
            .await
    }

    pub fn trigger_key(&self, key: impl Into<String>) -> Result<()> {
        self.submit(Intent::TriggerKey { key: key.into() })
    }

    pub fn pull_fire_handle(&self) -> Result<()> {
        self.submit(Intent::PullFireHandle)
    }

    pub fn toggle_fire_master_arm(&self) -> Result<()> {
        self.submit(Intent::ToggleMasterArm)
    }

    pub fn discharge_bottle(&self, bottle: Bottle) -> Result<()> {
        self.submit(Intent::DischargeBottle { bottle })
    }

    /// Start a new session from the loaded configuration
    pub fn reset_session(&self) -> Result<()> {
        self.send(Command::Reset)
    }
}

/// A simulation session driven in real time
pub struct EngineRuntime {
    handle: EngineHandle,
    shutdown_tx: watch::Sender<bool>,
    snapshots: watch::Receiver<TickSnapshot>,
    events: broadcast::Sender<SimEvent>,
    context: Arc<Mutex<SimulationContext>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for EngineRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRuntime")
            .field("running", &self.is_running())
            .field("tick", &self.snapshots.borrow().tick)
            .finish_non_exhaustive()
    }
}

impl EngineRuntime {
    /// Validate `config`, build the context and start ticking. Must be
    /// called from within a tokio runtime.
    pub fn start(config: SimulationConfig) -> Result<Self> {
        let period = Duration::from_millis(config.tick_period_ms);
        let context = SimulationContext::new(config)?;
        info!(
            session_id = %context.session_id(),
            period_ms = period.as_millis() as u64,
            "engine runtime starting"
        );

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (snapshot_tx, snapshots) = watch::channel(context.snapshot());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let context = Arc::new(Mutex::new(context));

        let task = tokio::spawn(run_loop(
            period,
            context.clone(),
            commands_rx,
            shutdown_rx,
            snapshot_tx,
            events.clone(),
        ));

        Ok(Self {
            handle: EngineHandle {
                commands: commands_tx,
            },
            shutdown_tx,
            snapshots,
            events,
            context,
            task: Mutex::new(Some(task)),
        })
    }

    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Receiver that always holds the most recent snapshot
    pub fn subscribe(&self) -> watch::Receiver<TickSnapshot> {
        self.snapshots.clone()
    }

    pub fn latest(&self) -> TickSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Stream of discrete simulation events
    pub fn events(&self) -> broadcast::Receiver<SimEvent> {
        self.events.subscribe()
    }

    /// Run `f` against the context between ticks
    pub fn inspect<T>(&self, f: impl FnOnce(&SimulationContext) -> T) -> T {
        f(&self.context.lock())
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stop ticking and wait for the loop to exit
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                warn!(%err, "engine loop ended abnormally");
            }
        }
        info!("engine runtime stopped");
    }
}

impl Drop for EngineRuntime {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

async fn run_loop(
    period: Duration,
    context: Arc<Mutex<SimulationContext>>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut shutdown_rx: watch::Receiver<bool>,
    snapshot_tx: watch::Sender<TickSnapshot>,
    events: broadcast::Sender<SimEvent>,
) {
    let mut ticker = tokio::time::interval(period);
    // Late ticks are delayed, never bursted to catch up
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            _ = ticker.tick() => {
                let outcome = {
                    let mut ctx = context.lock();
                    while let Ok(command) = commands.try_recv() {
                        apply_command(&mut ctx, command);
                    }
                    ctx.tick()
                };
                snapshot_tx.send_replace(outcome.snapshot);
                for event in outcome.events {
                    // No subscribers is fine
                    let _ = events.send(event);
                }
            }
        }
    }
    debug!("engine loop exited");
}

fn apply_command(ctx: &mut SimulationContext, command: Command) {
    match command {
        Command::Apply { intent, reply } => {
            let result = ctx.apply_intent(&intent);
            if let Err(err) = &result {
                warn!(?intent, %err, "intent rejected");
            }
            if let Some(reply) = reply {
                let _ = reply.send(result);
            }
        }
        Command::Reset => {
            if let Err(err) = ctx.reset() {
                warn!(%err, "session reset failed");
            } else {
                info!(session_id = %ctx.session_id(), "session reset");
            }
        }
    }
}
