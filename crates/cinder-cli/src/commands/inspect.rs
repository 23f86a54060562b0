//! Simulation file inspection command

use crate::simulation::SimulationFile;
use anyhow::{Context, Result};
use cinder_particles::EmitterConfig;
use std::path::Path;

pub fn run(path: &str) -> Result<()> {
    let file = SimulationFile::load(Path::new(path))
        .with_context(|| format!("Failed to load simulation file: {path}"))?;

    let runtime = &file.runtime;
    println!("Runtime:");
    println!("  time_scale:       {}", runtime.time_scale);
    println!("  max_frame_time:   {}s", runtime.max_frame_time);
    println!("  particle_quality: {:?}", runtime.particle_quality);

    let multiplier = runtime.particle_quality.interval_multiplier();
    println!();
    println!("Emitters ({}):", file.emitters.len());
    for entry in &file.emitters {
        let p = entry.position;
        println!("  {} at ({}, {}, {})", entry.name, p.x, p.y, p.z);
        if let Some(seconds) = entry.stop_after {
            println!("    stops after {seconds}s");
        }
        print_emitter(&entry.config, multiplier, 2);
    }
    Ok(())
}

fn print_emitter(config: &EmitterConfig, multiplier: Option<f32>, depth: usize) {
    let pad = "  ".repeat(depth);
    match multiplier {
        Some(m) => println!(
            "{pad}interval {}s (effective {}s)",
            config.spawn_interval,
            config.spawn_interval * m
        ),
        None => println!("{pad}interval {}s (emission disabled)", config.spawn_interval),
    }
    println!(
        "{pad}speed {} ±{}, gravity {} ±{}, lifetime {}s ±{}",
        config.speed,
        config.speed_jitter / 2.0,
        config.gravity,
        config.gravity_jitter / 2.0,
        config.particle_time,
        config.particle_time_jitter / 2.0
    );
    if config.time_alive < 0.0 {
        println!("{pad}emits forever");
    } else {
        println!("{pad}emits for {}s", config.time_alive);
    }

    for layout in &config.layouts {
        println!(
            "{pad}- {} ({}x{})",
            layout.sprite, layout.size.x, layout.size.y
        );
        if let Some(child) = &layout.child {
            println!("{pad}  child emitter:");
            print_emitter(child, multiplier, depth + 2);
        }
    }
}
