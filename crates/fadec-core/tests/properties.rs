//! Property-based tests over arbitrary operator input sequences

#![allow(clippy::expect_used, clippy::unwrap_used)]

use fadec_core::{
    Bottle, ConfigBuilder, ControlsPatch, FailureId, Intent, OperatingMode, SimulationContext,
};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn failure_strategy() -> impl Strategy<Value = FailureId> {
    prop::sample::select(FailureId::ALL.to_vec())
}

fn controls_strategy() -> impl Strategy<Value = ControlsPatch> {
    (
        any::<Option<bool>>(),
        any::<Option<bool>>(),
        any::<Option<bool>>(),
        any::<Option<bool>>(),
        prop::option::of(-50.0f64..150.0),
        any::<Option<bool>>(),
        any::<Option<bool>>(),
    )
        .prop_map(
            |(master_switch, fuel_pump, ignition, starter, throttle, bleed_air, pack_l)| {
                ControlsPatch {
                    master_switch,
                    fuel_pump,
                    ignition,
                    starter,
                    throttle,
                    bleed_air,
                    pack_l,
                    ..ControlsPatch::default()
                }
            },
        )
}

fn intent_strategy() -> impl Strategy<Value = Intent> {
    prop_oneof![
        4 => controls_strategy().prop_map(|controls| Intent::SetControls { controls }),
        2 => failure_strategy().prop_map(|failure| Intent::ToggleFailure { failure }),
        1 => Just(Intent::PullFireHandle),
        1 => Just(Intent::ToggleMasterArm),
        1 => prop::sample::select(vec![Bottle::Bottle1, Bottle::Bottle2])
            .prop_map(|bottle| Intent::DischargeBottle { bottle }),
    ]
}

/// An intent followed by a run of ticks
fn step_strategy() -> impl Strategy<Value = (Intent, u64)> {
    (intent_strategy(), 0u64..200)
}

fn context(seed: u64) -> SimulationContext {
    let config = ConfigBuilder::new()
        .with_seed(seed)
        .with_fire_seizure_dwell_ms(1500)
        .build()
        .unwrap();
    SimulationContext::new(config).unwrap()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: telemetry is always finite and within its physical floor
    #[test]
    fn prop_telemetry_finite_and_non_negative(
        seed in any::<u64>(),
        steps in prop::collection::vec(step_strategy(), 1..30)
    ) {
        let mut ctx = context(seed);
        for (intent, ticks) in steps {
            ctx.apply_intent(&intent).unwrap();
            for _ in 0..=ticks {
                let t = ctx.tick().snapshot.telemetry;
                prop_assert!(t.is_finite(), "non-finite telemetry {:?}", t);
                prop_assert!(t.core_speed_pct >= 0.0 && t.core_speed_pct <= 100.0);
                prop_assert!(t.fan_speed_pct >= 0.0);
                prop_assert!(t.egt_c >= 20.0);
                prop_assert!(t.fuel_flow_kg_h >= 0.0);
                prop_assert!(t.oil_pressure_psi >= 0.0);
                prop_assert!(t.vibration_ips >= 0.0);
                prop_assert!(t.bleed_psi >= 0.0);
            }
            prop_assert!((0.0..=100.0).contains(&ctx.controls().throttle()));
        }
    }

    /// Property: once seized, no input sequence leaves SEIZED
    #[test]
    fn prop_seized_is_absorbing(
        seed in any::<u64>(),
        steps in prop::collection::vec(step_strategy(), 1..20)
    ) {
        let mut ctx = context(seed);
        ctx.set_controls(&ControlsPatch::from(fadec_core::Controls::start_configuration()));
        ctx.run_ticks(200);
        ctx.toggle_failure(FailureId::EngineFire);
        ctx.run_ticks(100);
        prop_assert_eq!(ctx.mode(), OperatingMode::Seized);

        for (intent, ticks) in steps {
            ctx.apply_intent(&intent).unwrap();
            for _ in 0..=ticks {
                let snapshot = ctx.tick().snapshot;
                prop_assert_eq!(snapshot.mode, OperatingMode::Seized);
                prop_assert_eq!(snapshot.telemetry.core_speed_pct, 0.0);
                prop_assert_eq!(snapshot.telemetry.fuel_flow_kg_h, 0.0);
            }
        }
    }

    /// Property: a bottle never returns to charged
    #[test]
    fn prop_discharge_is_one_way(
        seed in any::<u64>(),
        steps in prop::collection::vec(step_strategy(), 1..30)
    ) {
        let mut ctx = context(seed);
        let mut spent = [false, false];
        for (intent, ticks) in steps {
            ctx.apply_intent(&intent).unwrap();
            ctx.run_ticks(ticks);
            let fire = ctx.fire_state();
            for (i, bottle) in [Bottle::Bottle1, Bottle::Bottle2].into_iter().enumerate() {
                let discharged = fire.bottle(bottle) == fadec_core::BottleState::Discharged;
                prop_assert!(discharged || !spent[i]);
                spent[i] |= discharged;
            }
        }
    }

    /// Property: identical seeds and inputs give identical runs
    #[test]
    fn prop_runs_are_deterministic(
        seed in any::<u64>(),
        steps in prop::collection::vec(step_strategy(), 1..10)
    ) {
        let run = |steps: &[(Intent, u64)]| {
            let mut ctx = context(seed);
            for (intent, ticks) in steps {
                ctx.apply_intent(intent).unwrap();
                ctx.run_ticks(*ticks);
            }
            ctx.tick().snapshot
        };
        prop_assert_eq!(run(&steps), run(&steps));
    }
}
