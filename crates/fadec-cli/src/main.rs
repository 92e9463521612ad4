//! FADEC CLI - run the engine simulation headless

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands {
    pub mod config;
    pub mod run;
    pub mod scenario;
}

#[derive(Parser)]
#[command(name = "fadec")]
#[command(about = "FADEC - Turbofan Engine Control Unit Simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine in real time
    Run {
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seconds of real time to run
        #[arg(short, long, default_value = "10")]
        seconds: u64,

        /// Set the panel for a start before the first tick
        #[arg(long)]
        start: bool,

        /// Throttle lever position, percent
        #[arg(short, long)]
        throttle: Option<f64>,

        /// Failure to toggle at start (engine_fire, oil_pump_failure, ...)
        #[arg(short, long = "fail")]
        failures: Vec<String>,

        /// Print one JSON snapshot per line instead of status lines
        #[arg(long)]
        json: bool,
    },

    /// Run a scenario file in simulated time
    Scenario {
        /// Scenario file path
        path: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration
    Config {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            config,
            seconds,
            start,
            throttle,
            failures,
            json,
        } => {
            commands::run::run(commands::run::RunOptions {
                config,
                seconds,
                start,
                throttle,
                failures,
                json,
            })
            .await
        }
        Commands::Scenario { path, json } => commands::scenario::run(&path, json),
        Commands::Config { output } => commands::config::run(output.as_deref()),
    }
}
