//! Headless lane battle runner.
//!
//! Plays a match without graphics and prints JSON lines on stdout.
//!
//! # Usage
//!
//! ```bash
//! # Play the built-in opening at default settings
//! cargo run -p lanewar_headless -- run
//!
//! # Play a scenario file, overriding its seed
//! cargo run -p lanewar_headless -- run --scenario opening.ron --seed 9 --every 20
//!
//! # Play at wall-clock speed
//! cargo run -p lanewar_headless -- run --difficulty insane --realtime
//!
//! # Verify determinism
//! cargo run -p lanewar_headless -- verify --ticks 3000 --runs 5
//! ```

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lanewar_core::data::Difficulty;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lanewar_headless::{
    protocol::OutputLine,
    runner::{verify_scenario, HeadlessRunner, RunConfig},
    scenario::{Scenario, ScenarioError},
};

#[derive(Parser)]
#[command(name = "lanewar_headless")]
#[command(about = "Headless lane battle runner for scripted play and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Settings shared by every subcommand. Flags override the scenario file.
#[derive(clap::Args, Debug, Clone, Default)]
struct MatchArgs {
    /// Scenario file to load (RON)
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Difficulty preset
    #[arg(short, long)]
    difficulty: Option<Difficulty>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Tick limit
    #[arg(short, long)]
    ticks: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single match
    Run {
        #[command(flatten)]
        args: MatchArgs,

        /// Print a snapshot every N ticks (0 = never)
        #[arg(short, long, default_value = "100")]
        every: u64,

        /// Pace ticks against the wall clock
        #[arg(long)]
        realtime: bool,
    },

    /// Verify determinism by running the same match several times
    Verify {
        #[command(flatten)]
        args: MatchArgs,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for JSON lines)
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Some(Commands::Run {
            args,
            every,
            realtime,
        }) => cmd_run(&args, every, realtime),
        Some(Commands::Verify { args, runs }) => cmd_verify(&args, runs),
        None => cmd_run(&MatchArgs::default(), 100, false),
    }
}

/// Build the scenario from a file or the built-in opening, then apply flags.
fn load_scenario(args: &MatchArgs) -> Result<Scenario, ScenarioError> {
    let mut scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::opening(),
    };
    if let Some(difficulty) = args.difficulty {
        scenario.difficulty = difficulty;
    }
    if let Some(seed) = args.seed {
        scenario.seed = seed;
    }
    if let Some(ticks) = args.ticks {
        scenario.max_ticks = ticks;
    }
    Ok(scenario)
}

fn load_or_exit(args: &MatchArgs) -> Scenario {
    match load_scenario(args) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("Failed to load scenario: {e}");
            std::process::exit(1);
        }
    }
}

/// Play one match, writing JSON lines to stdout
fn cmd_run(args: &MatchArgs, every: u64, realtime: bool) {
    let scenario = load_or_exit(args);
    let config = RunConfig {
        snapshot_every: every,
        realtime,
    };

    let stdout = io::stdout();
    if let Err(e) = HeadlessRunner::new(scenario, config, stdout.lock()).run() {
        eprintln!("Run failed: {e}");
        std::process::exit(1);
    }
}

/// Run the same match several times and compare final hashes
fn cmd_verify(args: &MatchArgs, runs: u32) {
    let scenario = load_or_exit(args);
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        scenario.name,
        scenario.seed,
        runs
    );

    let report = match verify_scenario(&scenario, runs) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Verification failed to run: {e}");
            std::process::exit(1);
        }
    };
    print!("{}", OutputLine::Verify(report.clone()).to_json_line());

    if report.deterministic {
        eprintln!("PASS: All {} runs produced identical results", report.runs);
    } else {
        eprintln!("FAIL: Runs produced different results");
        for (run, hash) in report.hashes.iter().enumerate() {
            eprintln!("  run {run}: {hash:016x}");
        }
        std::process::exit(1);
    }
}
