//! Engine Scenario Tests
//!
//! Tick-driven scenarios against an owned simulation context.
//!
//! ## Test Categories
//!
//! - Start, idle and throttle response
//! - Delayed failure activation
//! - Oil starvation and sustained fire cascades
//! - Fire handle and bottle discharge
//! - Tank fuel system

#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_matches::assert_matches;
use fadec_core::{
    Bottle, BottleState, ConfigBuilder, Controls, ControlsPatch, DischargeOutcome, FailureConfigPatch,
    FailureId, FlagCause, FuelLevel, FuelSystemVariant, LoopStatus, OperatingMode, SeizureCause,
    SimEvent, SimulationConfig, SimulationContext, ToggleOutcome,
};

fn new_context(config: SimulationConfig) -> SimulationContext {
    SimulationContext::new(config).expect("valid config")
}

/// Engine started, starter released and settled at idle
fn idling_context(config: SimulationConfig) -> SimulationContext {
    let mut ctx = new_context(config);
    ctx.set_controls(&ControlsPatch::from(Controls::start_configuration()));
    ctx.run_ticks(300);
    ctx.set_controls(&ControlsPatch::starter(false));
    ctx.run_ticks(200);
    assert_eq!(ctx.mode(), OperatingMode::Idle);
    ctx
}

fn mode_changes(events: &[SimEvent]) -> Vec<(OperatingMode, OperatingMode)> {
    events
        .iter()
        .filter_map(|e| match e {
            SimEvent::ModeChanged { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Start and Throttle
// =============================================================================

#[test]
fn test_cold_engine_stays_off() {
    let mut ctx = new_context(SimulationConfig::default());
    let events = ctx.run_ticks(10_000);

    assert!(mode_changes(&events).is_empty());
    let t = ctx.telemetry();
    assert_eq!(ctx.mode(), OperatingMode::Off);
    assert_eq!(t.core_speed_pct, 0.0);
    assert_eq!(t.fan_speed_pct, 0.0);
    assert_eq!(t.egt_c, 20.0);
    assert_eq!(t.fuel_flow_kg_h, 0.0);
}

#[test]
fn test_normal_start_sequence() {
    let mut ctx = new_context(SimulationConfig::default());
    ctx.set_controls(&ControlsPatch::from(Controls::start_configuration()));

    let mut light_off_tick = None;
    let mut idle_tick = None;
    for _ in 0..3000 {
        let outcome = ctx.tick();
        for (from, to) in mode_changes(&outcome.events) {
            match (from, to) {
                (OperatingMode::Off, OperatingMode::Starting) => {
                    light_off_tick = Some(outcome.snapshot.tick);
                    assert!(outcome.snapshot.telemetry.core_speed_pct > 15.0);
                }
                (OperatingMode::Starting, OperatingMode::Idle) => {
                    idle_tick = Some(outcome.snapshot.tick);
                    assert!(outcome.snapshot.telemetry.core_speed_pct > 55.0);
                }
                other => panic!("unexpected transition {other:?}"),
            }
        }
    }

    let light_off_tick = light_off_tick.expect("engine never lit");
    let idle_tick = idle_tick.expect("engine never reached idle");
    assert!(light_off_tick < idle_tick);
    assert!(idle_tick < 100, "start took {idle_tick} ticks");

    let t = ctx.telemetry();
    assert_eq!(ctx.mode(), OperatingMode::Idle);
    assert!((t.core_speed_pct - 60.0).abs() < 0.1);
    assert!((t.fan_speed_pct - 52.5).abs() < 0.1);
    assert!((t.egt_c - 400.0).abs() < 1.0);
    assert!((1200.0..1240.0).contains(&t.fuel_flow_kg_h));
}

#[test]
fn test_throttle_to_full_power() {
    let mut ctx = idling_context(SimulationConfig::default());
    ctx.set_controls(&ControlsPatch::throttle(100.0));

    let outcome = ctx.tick();
    assert_eq!(
        mode_changes(&outcome.events),
        vec![(OperatingMode::Idle, OperatingMode::Running)]
    );

    ctx.run_ticks(3000);
    let t = ctx.telemetry();
    assert_eq!(ctx.mode(), OperatingMode::Running);
    assert!((t.core_speed_pct - 100.0).abs() < 0.1);
    assert!((t.fan_speed_pct - 94.5).abs() < 0.1);
    // Full-throttle overtemperature bias keeps the exhaust near 930 C
    assert!((t.egt_c - 930.0).abs() < 2.0);
    assert!(t.egt_c < fadec_core::EGT_REDLINE_C);
}

#[test]
fn test_master_switch_off_shuts_down() {
    let mut ctx = idling_context(SimulationConfig::default());
    ctx.set_controls(&ControlsPatch::master_switch(false));

    let events = ctx.run_ticks(1000);
    assert_eq!(
        mode_changes(&events),
        vec![
            (OperatingMode::Idle, OperatingMode::Shutdown),
            (OperatingMode::Shutdown, OperatingMode::Off),
        ]
    );
    assert!(ctx.telemetry().core_speed_pct < 2.0);
}

#[test]
fn test_same_seed_same_run() {
    let config = ConfigBuilder::new().with_seed(1234).build().unwrap();
    let run = || {
        let mut ctx = new_context(config.clone());
        ctx.set_controls(&ControlsPatch::from(Controls::start_configuration()));
        ctx.toggle_failure(FailureId::VibSensorFault);
        ctx.run_ticks(400);
        ctx.snapshot()
    };
    assert_eq!(run(), run());
}

// =============================================================================
// Delayed Failure Activation
// =============================================================================

#[test]
fn test_delayed_activation_fires_at_due_time() {
    let config = ConfigBuilder::new()
        .with_failure_delay(FailureId::FuelPumpFailure, 2.0)
        .build()
        .unwrap();
    let mut ctx = idling_context(config);
    let start_ms = ctx.elapsed_ms();

    assert_eq!(
        ctx.toggle_failure(FailureId::FuelPumpFailure),
        ToggleOutcome::Scheduled { due_ms: start_ms + 2000 }
    );
    ctx.run_ticks(99);
    assert!(!ctx.failures().fuel_pump_failure);
    assert_eq!(ctx.mode(), OperatingMode::Idle);

    let outcome = ctx.tick();
    assert!(ctx.failures().fuel_pump_failure);
    let change = outcome.flag_changes().next().expect("activation recorded");
    assert_eq!(change.cause, FlagCause::ScheduledActivation);
    assert_eq!(change.at_ms, start_ms + 2000);
    assert_eq!(outcome.snapshot.mode, OperatingMode::Shutdown);
}

#[test]
fn test_retoggle_reschedules_activation() {
    let config = ConfigBuilder::new()
        .with_failure_delay(FailureId::VibSensorFault, 2.0)
        .build()
        .unwrap();
    let mut ctx = new_context(config);

    ctx.toggle_failure(FailureId::VibSensorFault);
    ctx.run_ticks(25);
    assert_eq!(
        ctx.toggle_failure(FailureId::VibSensorFault),
        ToggleOutcome::Scheduled { due_ms: 2500 }
    );

    // The original 2000 ms activation no longer exists
    ctx.run_ticks(99);
    assert_eq!(ctx.elapsed_ms(), 2480);
    assert!(!ctx.failures().vib_sensor_fault);

    ctx.tick();
    assert!(ctx.failures().vib_sensor_fault);
}

#[test]
fn test_config_update_does_not_touch_flags() {
    let mut ctx = new_context(SimulationConfig::default());
    ctx.toggle_failure(FailureId::VibSensorFault);
    ctx.update_failure_config(FailureId::VibSensorFault, &FailureConfigPatch::delay(5.0))
        .unwrap();
    ctx.tick();
    assert!(ctx.failures().vib_sensor_fault);

    // The new delay applies to the next activation
    ctx.toggle_failure(FailureId::VibSensorFault);
    assert_matches!(
        ctx.toggle_failure(FailureId::VibSensorFault),
        ToggleOutcome::Scheduled { .. }
    );
}

#[test]
fn test_trigger_key_toggles_bound_failure() {
    let mut ctx = new_context(SimulationConfig::default());
    ctx.update_failure_config(FailureId::OilPumpFailure, &FailureConfigPatch::trigger_key("O"))
        .unwrap();

    assert_eq!(ctx.trigger_key("x"), None);
    assert_eq!(
        ctx.trigger_key("o"),
        Some((FailureId::OilPumpFailure, ToggleOutcome::Activated))
    );
    assert!(ctx.failures().oil_pump_failure);
}

#[test]
fn test_vibration_fault_reads_high() {
    let mut ctx = idling_context(SimulationConfig::default());
    ctx.toggle_failure(FailureId::VibSensorFault);
    for _ in 0..50 {
        let t = ctx.tick().snapshot.telemetry;
        assert!(t.vibration_ips >= 4.5 && t.vibration_ips < 5.5);
    }
    assert_eq!(ctx.mode(), OperatingMode::Idle);
}

// =============================================================================
// Cascades
// =============================================================================

#[test]
fn test_oil_starvation_ignites_then_seizes() {
    let mut ctx = idling_context(SimulationConfig::default());
    ctx.set_controls(&ControlsPatch::throttle(50.0));
    ctx.run_ticks(500);
    assert_eq!(ctx.mode(), OperatingMode::Running);

    ctx.toggle_failure(FailureId::OilPumpFailure);

    let outcome = ctx.tick();
    assert!(ctx.failures().engine_fire);
    assert_eq!(outcome.snapshot.mode, OperatingMode::Fire);
    assert!(outcome
        .flag_changes()
        .any(|c| c.failure == FailureId::EngineFire && c.cause == FlagCause::OilPumpCascade));
    assert_eq!(outcome.snapshot.fire.loop_a, LoopStatus::Fire);

    ctx.run_ticks(249);
    assert_eq!(ctx.mode(), OperatingMode::Fire);

    let outcome = ctx.tick();
    assert_eq!(outcome.snapshot.mode, OperatingMode::Seized);
    assert!(outcome.events.contains(&SimEvent::Seized {
        cause: SeizureCause::OilStarvation
    }));
    let t = outcome.snapshot.telemetry;
    assert_eq!(t.core_speed_pct, 0.0);
    assert_eq!(t.fuel_flow_kg_h, 0.0);
    assert_eq!(t.vibration_ips, 0.0);
}

#[test]
fn test_sustained_fire_seizes() {
    let mut ctx = idling_context(SimulationConfig::default());
    ctx.toggle_failure(FailureId::EngineFire);

    ctx.run_ticks(375);
    assert_eq!(ctx.mode(), OperatingMode::Fire);
    assert_eq!(ctx.physics().fire_dwell_ms, 7500);

    let outcome = ctx.tick();
    assert_eq!(outcome.snapshot.mode, OperatingMode::Seized);
    assert!(outcome.events.contains(&SimEvent::Seized {
        cause: SeizureCause::SustainedFire
    }));

    // Burning wreck: EGT settles toward 1200 C
    ctx.run_ticks(2000);
    assert!((ctx.telemetry().egt_c - 1200.0).abs() < 1.0);
}

#[test]
fn test_oil_failure_on_stopped_engine_is_harmless() {
    let mut ctx = new_context(SimulationConfig::default());
    ctx.toggle_failure(FailureId::OilPumpFailure);
    ctx.run_ticks(1000);

    assert!(!ctx.failures().engine_fire);
    assert_eq!(ctx.mode(), OperatingMode::Off);
    assert_eq!(ctx.physics().oil_failure_dwell_ms, 0);
}

#[test]
fn test_seized_is_terminal() {
    let config = ConfigBuilder::new().with_fire_seizure_dwell_ms(100).build().unwrap();
    let mut ctx = idling_context(config);
    ctx.toggle_failure(FailureId::EngineFire);
    ctx.run_ticks(10);
    assert_eq!(ctx.mode(), OperatingMode::Seized);

    // Nothing the crew does brings the engine back
    ctx.toggle_failure(FailureId::EngineFire);
    ctx.set_controls(&ControlsPatch::from(Controls::start_configuration()));
    ctx.set_controls(&ControlsPatch::throttle(100.0));
    let events = ctx.run_ticks(2000);

    assert!(mode_changes(&events).is_empty());
    assert_eq!(ctx.mode(), OperatingMode::Seized);
    assert_eq!(ctx.telemetry().core_speed_pct, 0.0);
    assert_eq!(ctx.telemetry().fan_speed_pct.round(), 0.0);
}

// =============================================================================
// Fire Suppression
// =============================================================================

#[test]
fn test_handle_discharge_extinguish() {
    let config = ConfigBuilder::new().with_extinguish_probability(1.0).build().unwrap();
    let mut ctx = idling_context(config);

    ctx.toggle_failure(FailureId::EngineFire);
    ctx.tick();
    assert_eq!(ctx.mode(), OperatingMode::Fire);

    // Bottles stay charged until the handle is pulled and the squibs armed
    assert_eq!(ctx.discharge_bottle(Bottle::Bottle1), DischargeOutcome::HandleNotPulled);
    assert!(ctx.pull_fire_handle());
    assert_eq!(ctx.discharge_bottle(Bottle::Bottle1), DischargeOutcome::NotArmed);
    assert!(ctx.toggle_fire_master_arm());

    // Pulled handle cuts fuel on the next tick
    ctx.tick();
    assert_eq!(ctx.mode(), OperatingMode::Shutdown);

    let discharged_at = ctx.elapsed_ms();
    assert_eq!(
        ctx.discharge_bottle(Bottle::Bottle1),
        DischargeOutcome::Discharged {
            extinguish_due_ms: Some(discharged_at + 1000)
        }
    );
    assert_eq!(
        ctx.discharge_bottle(Bottle::Bottle1),
        DischargeOutcome::AlreadyDischarged
    );

    let events = ctx.run_ticks(49);
    assert!(events.contains(&SimEvent::BottleDischarged {
        bottle: Bottle::Bottle1,
        extinguish_scheduled: true
    }));
    assert!(ctx.failures().engine_fire);

    let outcome = ctx.tick();
    assert!(outcome.events.contains(&SimEvent::Extinguished));
    assert!(!ctx.failures().engine_fire);
    assert_eq!(outcome.snapshot.fire.loop_a, LoopStatus::Normal);
    assert_eq!(outcome.snapshot.fire.loop_b, LoopStatus::Normal);
    assert_eq!(outcome.snapshot.fire.bottle1, BottleState::Discharged);
    assert_eq!(outcome.snapshot.fire.bottle2, BottleState::Charged);

    ctx.run_ticks(500);
    assert_eq!(ctx.mode(), OperatingMode::Off);
}

#[test]
fn test_discharge_without_fire_wastes_bottle() {
    let mut ctx = new_context(SimulationConfig::default());
    ctx.pull_fire_handle();
    ctx.toggle_fire_master_arm();

    assert_eq!(
        ctx.discharge_bottle(Bottle::Bottle2),
        DischargeOutcome::Discharged {
            extinguish_due_ms: None
        }
    );
    let events = ctx.tick().events;
    assert!(events.contains(&SimEvent::BottleDischarged {
        bottle: Bottle::Bottle2,
        extinguish_scheduled: false
    }));
    assert_eq!(ctx.fire_state().bottle2, BottleState::Discharged);
}

#[test]
fn test_failed_discharge_leaves_fire_burning() {
    let config = ConfigBuilder::new().with_extinguish_probability(0.0).build().unwrap();
    let mut ctx = idling_context(config);
    ctx.toggle_failure(FailureId::EngineFire);
    ctx.pull_fire_handle();
    ctx.toggle_fire_master_arm();
    ctx.tick();

    ctx.discharge_bottle(Bottle::Bottle1);
    ctx.discharge_bottle(Bottle::Bottle2);
    ctx.run_ticks(100);

    assert!(ctx.failures().engine_fire);
    assert!(ctx.fire_state().fire_detected());
}

// =============================================================================
// Tank Fuel System
// =============================================================================

#[test]
fn test_tank_variant_burns_and_starves() {
    let config = ConfigBuilder::new()
        .with_fuel_variant(FuelSystemVariant::Tanks)
        .with_tank_quantities(2000.0, 2000.0)
        .build()
        .unwrap();
    let mut ctx = idling_context(config);

    let fuel = ctx.fuel_state().expect("tank state published");
    assert!(fuel.tank_l_kg < 2000.0);
    assert!((fuel.tank_l_kg - fuel.tank_r_kg).abs() < 1e-9);

    // Both boost pumps off: no supply, engine winds down
    ctx.set_controls(&ControlsPatch {
        tank_pump_l: Some(false),
        tank_pump_r: Some(false),
        ..ControlsPatch::default()
    });
    ctx.tick();
    assert_eq!(ctx.mode(), OperatingMode::Shutdown);
}

#[test]
fn test_dump_valves_drain_to_critical() {
    let config = ConfigBuilder::new()
        .with_fuel_variant(FuelSystemVariant::Tanks)
        .with_tank_quantities(600.0, 5000.0)
        .build()
        .unwrap();
    let mut ctx = new_context(config);
    ctx.set_controls(&ControlsPatch {
        dump_l: Some(true),
        ..ControlsPatch::default()
    });

    // 25 kg/s for 40 s
    ctx.run_ticks(2000);
    let fuel = ctx.fuel_state().unwrap();
    assert_eq!(fuel.tank_l_kg, 0.0);
    assert_eq!(fuel.level_l, FuelLevel::Critical);
    assert_eq!(fuel.tank_r_kg, 5000.0);
    assert_eq!(fuel.level_r, FuelLevel::Normal);
}
