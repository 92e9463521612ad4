// Real-time run command

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use fadec_core::{Controls, ControlsPatch, SimulationConfig, TickSnapshot};
use fadec_runtime::{summarize_or_fallback, EngineRuntime, StatusRequest, ThresholdAdvisor};
use tracing::info;

const STATUS_INTERVAL: Duration = Duration::from_secs(1);
const ADVISOR_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RunOptions {
    pub config: Option<PathBuf>,
    pub seconds: u64,
    pub start: bool,
    pub throttle: Option<f64>,
    pub failures: Vec<String>,
    pub json: bool,
}

pub async fn run(options: RunOptions) -> anyhow::Result<()> {
    let config = match &options.config {
        Some(path) => SimulationConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SimulationConfig::default(),
    };

    let runtime = EngineRuntime::start(config)?;
    let engine = runtime.handle();

    if options.start {
        engine.set_controls(ControlsPatch::from(Controls::start_configuration()))?;
    }
    if let Some(throttle) = options.throttle {
        engine.set_controls(ControlsPatch::throttle(throttle))?;
    }
    for name in &options.failures {
        engine
            .toggle_failure_by_name(name)
            .with_context(|| format!("toggling failure '{name}'"))?;
    }

    info!(seconds = options.seconds, "running engine");
    let deadline = tokio::time::Instant::now() + Duration::from_secs(options.seconds);
    let mut status = tokio::time::interval(STATUS_INTERVAL);

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => break,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            _ = status.tick() => print_snapshot(&runtime.latest(), options.json)?,
        }
    }

    runtime.shutdown().await;
    let last = runtime.latest();
    print_snapshot(&last, options.json)?;

    let summary =
        summarize_or_fallback(&ThresholdAdvisor, &StatusRequest::from(&last), ADVISOR_TIMEOUT)
            .await;
    println!("{summary}");
    Ok(())
}

fn print_snapshot(snapshot: &TickSnapshot, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
        return Ok(());
    }
    let t = &snapshot.telemetry;
    println!(
        "{:>8.1}s {:<8} N1 {:5.1}% N2 {:5.1}% EGT {:5.0}C FF {:5.0}kg/h OIL {:3.0}psi {:4.0}C VIB {:4.2}ips BLEED {:4.1}psi",
        snapshot.elapsed_ms as f64 / 1000.0,
        snapshot.mode.as_str(),
        t.fan_speed_pct,
        t.core_speed_pct,
        t.egt_c,
        t.fuel_flow_kg_h,
        t.oil_pressure_psi,
        t.oil_temp_c,
        t.vibration_ips,
        t.bleed_psi,
    );
    let active = snapshot.failures.active();
    if !active.is_empty() {
        let names: Vec<_> = active.iter().map(|id| id.as_str()).collect();
        println!("          failures: {}", names.join(", "));
    }
    Ok(())
}
