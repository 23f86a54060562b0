//! Headless simulation command

use crate::simulation::{Runner, SimulationFile};
use anyhow::{Context, Result};
use cinder_runtime::ParticleQuality;
use std::path::Path;

pub struct SimulateArgs {
    pub file: String,
    pub frames: u32,
    pub dt: f64,
    pub seed: u32,
    pub report_every: f32,
    pub quality: Option<ParticleQuality>,
}

pub fn run(args: SimulateArgs) -> Result<()> {
    let mut file = SimulationFile::load(Path::new(&args.file))
        .with_context(|| format!("Failed to load simulation file: {}", args.file))?;
    if let Some(quality) = args.quality {
        file.runtime.particle_quality = quality;
    }

    if args.dt <= 0.0 {
        anyhow::bail!("--dt must be positive, got {}", args.dt);
    }

    let mut runner = Runner::new(&file, args.seed).context("Failed to build simulation")?;
    if args.report_every > 0.0 {
        runner.report_every(args.report_every);
    }

    println!(
        "Simulating {} frame(s) of {:.4}s ({} emitter(s), quality {:?})",
        args.frames,
        args.dt,
        file.emitters.len(),
        file.runtime.particle_quality
    );

    runner
        .run(args.frames, args.dt)
        .context("Simulation aborted")?;

    let sim = runner.shutdown()?;
    let Some(last) = sim.report.last() else {
        return Ok(());
    };
    println!();
    println!("Simulated time: {:.2}s", last.time);
    println!("Spawned:        {}", last.stats.spawned);
    println!("Expired:        {}", last.stats.expired);
    println!("Still alive:    {}", last.stats.particles);
    println!("Emitters left:  {}", last.stats.emitters);
    Ok(())
}
