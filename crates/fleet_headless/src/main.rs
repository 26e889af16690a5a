//! Headless fleet runner.
//!
//! # Usage
//!
//! ```bash
//! # Run a scenario and print the JSON report
//! cargo run -p fleet_headless -- run --scenario scenarios/skirmish.ron
//!
//! # Write the report to a file instead
//! cargo run -p fleet_headless -- run --scenario scenarios/ambush.ron --output report.json
//!
//! # Verify determinism
//! cargo run -p fleet_headless -- verify --scenario scenarios/escort.ron --runs 5
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fleet_headless::{verify_scenario, Scenario, ScenarioRunner};

#[derive(Parser)]
#[command(name = "fleet_headless")]
#[command(about = "Headless fleet AI runner for scenario playback and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and emit a JSON report
    Run {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Number of ticks to simulate
        #[arg(short, long, default_value = "3600")]
        ticks: u64,

        /// Seconds per tick
        #[arg(long, default_value = "0.016")]
        dt: f32,

        /// Override the scenario's RNG seed
        #[arg(long)]
        seed: Option<u64>,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify determinism by running the same scenario multiple times
    Verify {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: usize,

        /// Number of ticks per run
        #[arg(short, long, default_value = "1200")]
        ticks: u64,

        /// Seconds per tick
        #[arg(long, default_value = "0.016")]
        dt: f32,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the report
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            ticks,
            dt,
            seed,
            output,
        } => cmd_run(&scenario, ticks, dt, seed, output),
        Commands::Verify {
            scenario,
            runs,
            ticks,
            dt,
        } => cmd_verify(&scenario, runs, ticks, dt),
    }
}

fn load_or_exit(path: &Path) -> Scenario {
    match Scenario::load(path) {
        Ok(scenario) => scenario,
        Err(e) => {
            tracing::error!(error = %e, path = %path.display(), "Failed to load scenario");
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    }
}

/// Run a scenario and emit the report
fn cmd_run(path: &Path, ticks: u64, dt: f32, seed: Option<u64>, output: Option<PathBuf>) {
    let mut scenario = load_or_exit(path);
    if let Some(seed) = seed {
        scenario.config.seed = seed;
    }

    tracing::info!(
        scenario = %scenario.name,
        ticks,
        dt,
        seed = scenario.config.seed,
        "Starting run"
    );

    let runner = match ScenarioRunner::new(&scenario) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };
    let report = runner.run(ticks, dt);

    let json = match serde_json::to_string_pretty(&report) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("FATAL: Failed to serialize report: {e}");
            std::process::exit(1);
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, json) {
                tracing::error!(error = %e, path = %path.display(), "Failed to write report");
                eprintln!("FATAL: Failed to write report: {e}");
                std::process::exit(1);
            }
            eprintln!("Report written to {}", path.display());
        }
        None => println!("{json}"),
    }
}

/// Verify determinism
fn cmd_verify(path: &Path, runs: usize, ticks: u64, dt: f32) {
    let scenario = load_or_exit(path);
    tracing::info!(
        "Verifying determinism: {} ({} runs of {} ticks)",
        scenario.name,
        runs,
        ticks
    );

    match verify_scenario(&scenario, runs, ticks, dt) {
        Ok(result) if result.is_deterministic => {
            eprintln!("PASS: All {runs} runs produced identical results");
            eprintln!("  Final hash: {:016x}", result.hashes.first().copied().unwrap_or(0));
        }
        Ok(result) => {
            eprintln!("FAIL: Non-determinism detected!");
            eprintln!("  Unique hashes: {:?}", result.unique_hashes());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    }
}
