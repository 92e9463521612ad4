//! Runs every scenario shipped in the top-level `scenarios/` directory.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;

use fadec_core::{FailureId, OperatingMode, Scenario, ScenarioRunner, SeizureCause};

fn scenario_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../scenarios")
        .join(format!("{name}.toml"))
}

fn run(name: &str) -> fadec_core::ScenarioReport {
    let scenario = Scenario::load(scenario_path(name)).expect("scenario parses");
    let report = ScenarioRunner::run(&scenario).expect("scenario runs");
    assert!(report.passed(), "{report}");
    report
}

#[test]
fn test_normal_start() {
    let report = run("normal_start");
    assert_eq!(report.ticks, 600);
    assert!(report.final_snapshot.telemetry.fan_speed_pct > 90.0);
}

#[test]
fn test_oil_starvation() {
    let report = run("oil_starvation");
    assert_eq!(report.seizure, Some(SeizureCause::OilStarvation));
    let seized = report
        .mode_history
        .iter()
        .find(|r| r.to == OperatingMode::Seized)
        .unwrap();
    assert_eq!(seized.at_ms, 3000 + 5020);
}

#[test]
fn test_fire_suppression() {
    let report = run("fire_suppression");
    assert_eq!(report.seizure, None);
    assert!(report.visited(OperatingMode::Fire));
    assert!(!report.visited(OperatingMode::Seized));
    let fire_cleared = report
        .flag_changes
        .iter()
        .any(|c| c.failure == FailureId::EngineFire && !c.active);
    assert!(fire_cleared);
}

#[test]
fn test_tank_dump() {
    let report = run("tank_dump");
    let fuel = report.final_snapshot.fuel.expect("tank state published");
    assert_eq!(fuel.tank_l_kg, 0.0);
    assert!(fuel.tank_r_kg > 3900.0);
}
