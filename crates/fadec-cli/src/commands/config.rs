// Default configuration command

use std::path::Path;

use anyhow::Context;
use fadec_core::SimulationConfig;

pub fn run(output: Option<&Path>) -> anyhow::Result<()> {
    let text = SimulationConfig::default().to_toml()?;
    match output {
        Some(path) => {
            std::fs::write(path, &text)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote default configuration to {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}
