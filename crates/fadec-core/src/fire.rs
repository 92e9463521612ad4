//! Fire detection and suppression
//!
//! Two detection loops mirror the `engine-fire` flag. The crew pulls the fire
//! handle (which cuts fuel, enforced by the mode logic), arms the squibs and
//! discharges either bottle. A discharge into an active fire draws once for
//! success and, on success, schedules the fire flag to clear after a delay.

use crate::error::FadecError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Detection loop status
///
/// `Fault` is part of the loop vocabulary but no input currently produces it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoopStatus {
    #[default]
    Normal,
    Fault,
    Fire,
}

impl LoopStatus {
    /// Loop reading for the current fire flag
    pub fn from_engine_fire(engine_fire: bool) -> Self {
        if engine_fire {
            LoopStatus::Fire
        } else {
            LoopStatus::Normal
        }
    }
}

/// Charge state of a suppression bottle. Discharge is one-way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BottleState {
    #[default]
    Charged,
    Discharged,
}

/// Which suppression bottle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bottle {
    #[serde(alias = "bottle_1", alias = "1")]
    Bottle1,
    #[serde(alias = "bottle_2", alias = "2")]
    Bottle2,
}

impl Bottle {
    const fn index(self) -> usize {
        match self {
            Bottle::Bottle1 => 0,
            Bottle::Bottle2 => 1,
        }
    }
}

impl fmt::Display for Bottle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bottle::Bottle1 => f.write_str("bottle1"),
            Bottle::Bottle2 => f.write_str("bottle2"),
        }
    }
}

impl FromStr for Bottle {
    type Err = FadecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "").as_str() {
            "bottle1" | "1" => Ok(Bottle::Bottle1),
            "bottle2" | "2" => Ok(Bottle::Bottle2),
            _ => Err(FadecError::UnknownBottle(s.to_string())),
        }
    }
}

/// Fire panel state published on every tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FireSystemState {
    pub loop_a: LoopStatus,
    pub loop_b: LoopStatus,
    pub handle_pulled: bool,
    pub bottle1: BottleState,
    pub bottle2: BottleState,
    pub master_armed: bool,
}

impl FireSystemState {
    pub fn bottle(&self, bottle: Bottle) -> BottleState {
        match bottle {
            Bottle::Bottle1 => self.bottle1,
            Bottle::Bottle2 => self.bottle2,
        }
    }

    /// Either loop reporting fire
    pub fn fire_detected(&self) -> bool {
        self.loop_a == LoopStatus::Fire || self.loop_b == LoopStatus::Fire
    }

    fn discharge(&mut self, bottle: Bottle) {
        match bottle {
            Bottle::Bottle1 => self.bottle1 = BottleState::Discharged,
            Bottle::Bottle2 => self.bottle2 = BottleState::Discharged,
        }
    }
}

/// Result of a discharge request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DischargeOutcome {
    /// Nothing happened: bottle already spent
    AlreadyDischarged,
    /// Nothing happened: handle still stowed
    HandleNotPulled,
    /// Nothing happened: squibs not armed
    NotArmed,
    /// Bottle spent. `extinguish_due_ms` is set when the agent will put the
    /// fire out at that simulated time.
    Discharged { extinguish_due_ms: Option<u64> },
}

/// Suppression tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuppressionConfig {
    /// Chance that one discharge extinguishes an active fire
    pub extinguish_probability: f64,
    /// Time from discharge to the fire going out
    pub extinguish_delay_ms: u64,
}

impl Default for SuppressionConfig {
    fn default() -> Self {
        Self {
            extinguish_probability: 0.9,
            extinguish_delay_ms: 1000,
        }
    }
}

/// Fire panel plus the scheduled extinguish slots, one per bottle
#[derive(Debug, Clone, Default)]
pub struct FireSuppression {
    state: FireSystemState,
    pending_extinguish: [Option<u64>; 2],
    config: SuppressionConfig,
}

impl FireSuppression {
    pub fn new(config: SuppressionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn state(&self) -> FireSystemState {
        self.state
    }

    pub fn handle_pulled(&self) -> bool {
        self.state.handle_pulled
    }

    /// Toggle the fuel-cutoff handle; returns the new position
    pub fn pull_handle(&mut self) -> bool {
        self.state.handle_pulled = !self.state.handle_pulled;
        info!(pulled = self.state.handle_pulled, "fire handle moved");
        self.state.handle_pulled
    }

    /// Toggle the squib arming switch; returns the new position
    pub fn toggle_master_arm(&mut self) -> bool {
        self.state.master_armed = !self.state.master_armed;
        info!(armed = self.state.master_armed, "fire master arm toggled");
        self.state.master_armed
    }

    /// Fire a bottle. The extinguish roll happens here, once; the tick only
    /// applies the already-decided outcome when it comes due.
    pub fn discharge<R: Rng + ?Sized>(
        &mut self,
        bottle: Bottle,
        fire_active: bool,
        now_ms: u64,
        rng: &mut R,
    ) -> DischargeOutcome {
        if self.state.bottle(bottle) == BottleState::Discharged {
            return DischargeOutcome::AlreadyDischarged;
        }
        if !self.state.handle_pulled {
            return DischargeOutcome::HandleNotPulled;
        }
        if !self.state.master_armed {
            return DischargeOutcome::NotArmed;
        }

        self.state.discharge(bottle);
        let extinguish_due_ms = if fire_active && rng.gen_bool(self.config.extinguish_probability) {
            let due = now_ms.saturating_add(self.config.extinguish_delay_ms);
            self.pending_extinguish[bottle.index()] = Some(due);
            Some(due)
        } else {
            None
        };

        if fire_active && extinguish_due_ms.is_none() {
            warn!(%bottle, "bottle discharged, fire persists");
        } else {
            info!(%bottle, ?extinguish_due_ms, "bottle discharged");
        }
        DischargeOutcome::Discharged { extinguish_due_ms }
    }

    /// Consume extinguish slots that have come due. True if any did.
    pub(crate) fn take_due_extinguish(&mut self, now_ms: u64) -> bool {
        let mut due = false;
        for slot in &mut self.pending_extinguish {
            if slot.is_some_and(|at| at <= now_ms) {
                *slot = None;
                due = true;
            }
        }
        due
    }

    /// Project the loops from the fire flag
    pub(crate) fn sync_loops(&mut self, engine_fire: bool) {
        let status = LoopStatus::from_engine_fire(engine_fire);
        self.state.loop_a = status;
        self.state.loop_b = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ready_panel(config: SuppressionConfig) -> FireSuppression {
        let mut fire = FireSuppression::new(config);
        fire.pull_handle();
        fire.toggle_master_arm();
        fire
    }

    #[test]
    fn test_discharge_requires_handle_and_arm() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut fire = FireSuppression::default();

        assert_eq!(
            fire.discharge(Bottle::Bottle1, true, 0, &mut rng),
            DischargeOutcome::HandleNotPulled
        );
        fire.pull_handle();
        assert_eq!(
            fire.discharge(Bottle::Bottle1, true, 0, &mut rng),
            DischargeOutcome::NotArmed
        );
        assert_eq!(fire.state().bottle1, BottleState::Charged);
        assert_eq!(fire.state().bottle2, BottleState::Charged);
    }

    #[test]
    fn test_bottle_discharges_once() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut fire = ready_panel(SuppressionConfig::default());

        assert!(matches!(
            fire.discharge(Bottle::Bottle2, false, 0, &mut rng),
            DischargeOutcome::Discharged { extinguish_due_ms: None }
        ));
        assert_eq!(
            fire.discharge(Bottle::Bottle2, true, 20, &mut rng),
            DischargeOutcome::AlreadyDischarged
        );
        assert_eq!(fire.state().bottle2, BottleState::Discharged);
        assert_eq!(fire.state().bottle1, BottleState::Charged);

        // Stowing the handle does not recharge anything
        fire.pull_handle();
        assert_eq!(fire.state().bottle2, BottleState::Discharged);
    }

    #[test]
    fn test_certain_extinguish_is_scheduled() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut fire = ready_panel(SuppressionConfig {
            extinguish_probability: 1.0,
            extinguish_delay_ms: 1000,
        });

        assert_eq!(
            fire.discharge(Bottle::Bottle1, true, 500, &mut rng),
            DischargeOutcome::Discharged { extinguish_due_ms: Some(1500) }
        );
        assert!(!fire.take_due_extinguish(1480));
        assert!(fire.take_due_extinguish(1500));
        assert!(!fire.take_due_extinguish(2000));
    }

    #[test]
    fn test_failed_roll_schedules_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut fire = ready_panel(SuppressionConfig {
            extinguish_probability: 0.0,
            extinguish_delay_ms: 1000,
        });

        assert_eq!(
            fire.discharge(Bottle::Bottle1, true, 0, &mut rng),
            DischargeOutcome::Discharged { extinguish_due_ms: None }
        );
        assert!(!fire.take_due_extinguish(u64::MAX));
    }

    #[test]
    fn test_loops_follow_fire_flag() {
        let mut fire = FireSuppression::default();
        fire.sync_loops(true);
        assert!(fire.state().fire_detected());
        assert_eq!(fire.state().loop_b, LoopStatus::Fire);
        fire.sync_loops(false);
        assert_eq!(fire.state().loop_a, LoopStatus::Normal);
    }

    #[test]
    fn test_bottle_parsing() {
        assert_eq!("bottle1".parse::<Bottle>().unwrap(), Bottle::Bottle1);
        assert_eq!("Bottle_2".parse::<Bottle>().unwrap(), Bottle::Bottle2);
        assert!("bottle3".parse::<Bottle>().is_err());
    }
}
