#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs Horde scenarios headlessly.

mod scenario;
mod simulation;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use horde_core::WaveIndex;
use horde_system_waves::WaveSizePolicy;
use tracing_subscriber::EnvFilter;

use crate::{
    scenario::Scenario,
    simulation::{simulate, SimulationOptions, SimulationReport},
};

#[derive(Debug, Parser)]
#[command(name = "horde", about = "Wave-based spawn orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Runs a scenario against the attrition model and prints a per-wave summary.
    Simulate(SimulateArgs),
    /// Validates a scenario and prints the budget of its first waves.
    Check(CheckArgs),
}

#[derive(Debug, Args)]
struct SimulateArgs {
    /// Scenario file in TOML format.
    #[arg(long)]
    scenario: PathBuf,
    /// Overrides the scenario seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Ends the run victorious after this many waves, overriding the scenario.
    #[arg(long)]
    waves: Option<u32>,
    /// Logical tick length in milliseconds.
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,
    /// Upper bound on the number of ticks simulated.
    #[arg(long, default_value_t = 100_000)]
    max_ticks: u64,
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Scenario file in TOML format.
    #[arg(long)]
    scenario: PathBuf,
    /// Number of waves whose budget is printed.
    #[arg(long, default_value_t = 10)]
    waves: u32,
}

/// Entry point for the Horde command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("horde=info".parse()?))
        .init();

    match Cli::parse().command {
        Command::Simulate(args) => run_simulation(&args),
        Command::Check(args) => check_scenario(&args),
    }
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario at {}", path.display()))?;
    Scenario::from_toml_str(&contents)
        .with_context(|| format!("invalid scenario {}", path.display()))
}

fn run_simulation(args: &SimulateArgs) -> Result<()> {
    let scenario = load_scenario(&args.scenario)?;
    let options = SimulationOptions {
        seed: args.seed.unwrap_or(scenario.seed),
        final_wave: args.waves.map(WaveIndex::new).or(scenario.final_wave()),
        tick: Duration::from_millis(args.tick_ms.max(1)),
        max_ticks: args.max_ticks,
    };

    let report = simulate(&scenario, options)?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &SimulationReport) {
    for summary in &report.waves {
        let outcome = summary
            .outcome
            .map_or_else(|| "unfinished".to_owned(), |outcome| format!("{outcome:?}"));
        let ended = summary
            .ended_at
            .map_or_else(|| "-".to_owned(), |at| format!("{:.1}s", at.as_secs_f32()));
        println!(
            "wave {:>3}: target {:>4} spawned {:>4} defeated {:>4} aborted types {} \
             started {:.1}s ended {ended} ({outcome})",
            summary.wave.get(),
            summary.target,
            summary.spawned,
            summary.defeated,
            summary.aborted_types,
            summary.started_at.as_secs_f32(),
        );
    }

    let outcome = report
        .outcome
        .map_or_else(|| "still running".to_owned(), |outcome| format!("{outcome:?}"));
    println!(
        "run: {outcome} after {} ticks ({:.1}s), player hp {:.1}",
        report.ticks,
        report.elapsed.as_secs_f32(),
        report.player_hp,
    );
}

fn check_scenario(args: &CheckArgs) -> Result<()> {
    let scenario = load_scenario(&args.scenario)?;
    println!(
        "scenario ok: {} areas, {} entity types, caps admit {} at once",
        scenario.areas.len(),
        scenario.entities.len(),
        scenario.total_cap(),
    );

    for index in 1..=args.waves {
        let target = scenario.sizing.target(WaveIndex::new(index));
        if target <= 0 {
            println!("wave {index:>3}: empty");
        } else {
            let realised = u64::try_from(target)
                .unwrap_or(u64::MAX)
                .min(scenario.total_cap());
            println!("wave {index:>3}: target {target:>4}, at most {realised:>4} with empty caps");
        }
    }
    Ok(())
}
