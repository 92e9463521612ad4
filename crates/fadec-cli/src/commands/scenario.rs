// Scenario command

use std::path::Path;

use anyhow::Context;
use fadec_core::{Scenario, ScenarioRunner};

pub fn run(path: &Path, json: bool) -> anyhow::Result<()> {
    let scenario =
        Scenario::load(path).with_context(|| format!("loading scenario {}", path.display()))?;
    let report = ScenarioRunner::run(&scenario)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }

    if !report.passed() {
        anyhow::bail!(
            "scenario '{}' failed {} expectation(s)",
            report.name,
            report.failures.len()
        );
    }
    Ok(())
}
