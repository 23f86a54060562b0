//! Cinder CLI - headless particle simulation and config inspection

mod commands;
mod simulation;

use anyhow::Result;
use cinder_runtime::ParticleQuality;
use clap::{Parser, Subcommand};
use commands::{inspect, simulate};

#[derive(Parser)]
#[command(name = "cinder")]
#[command(about = "Headless runner for Cinder emitters and timers", long_about = None)]
#[command(version)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation file without a window and print statistics
    Simulate {
        /// Path to simulation file
        file: String,

        /// Number of frames to run
        #[arg(long, default_value = "600")]
        frames: u32,

        /// Real seconds per frame
        #[arg(long, default_value = "0.0166667")]
        dt: f64,

        /// Seed for particle sampling
        #[arg(long, default_value = "3735928559")]
        seed: u32,

        /// Seconds of simulated time between statistics lines
        #[arg(long, default_value = "1.0")]
        report_every: f32,

        /// Override the file's particle quality (none, low, medium, high, max)
        #[arg(long, value_parser = parse_quality)]
        quality: Option<ParticleQuality>,
    },

    /// Print the parsed contents of a simulation file
    Inspect {
        /// Path to simulation file
        file: String,
    },
}

fn parse_quality(s: &str) -> std::result::Result<ParticleQuality, String> {
    match s {
        "none" => Ok(ParticleQuality::None),
        "low" => Ok(ParticleQuality::Low),
        "medium" => Ok(ParticleQuality::Medium),
        "high" => Ok(ParticleQuality::High),
        "max" => Ok(ParticleQuality::Max),
        _ => Err(format!(
            "Invalid quality '{s}'. Valid: none, low, medium, high, max"
        )),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Simulate {
            file,
            frames,
            dt,
            seed,
            report_every,
            quality,
        } => simulate::run(simulate::SimulateArgs {
            file,
            frames,
            dt,
            seed,
            report_every,
            quality,
        }),
        Commands::Inspect { file } => inspect::run(&file),
    }
}
