//! Simulation files and the headless frame loop

use cinder_core::{Result, Vec3};
use cinder_particles::{EmitterConfig, ParticleHandler, ParticleStats, ParticleSystem};
use cinder_runtime::{
    Clock, Cutoff, EventTimer, GameClock, RecurringEvents, RuntimeConfig, RuntimeSystem,
    SceneGraph,
};
use serde::Deserialize;
use std::path::Path;

/// One emitter placed in the simulated scene
///
/// ```toml
/// [[emitters]]
/// name = "campfire"
/// position = { x = 0.0, y = 0.0 }
/// stop_after = 5.0
///
/// [emitters.config]
/// spawn_interval = 0.05
///
/// [[emitters.config.layouts]]
/// sprite = "flame.png"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct EmitterEntry {
    pub name: String,
    #[serde(default)]
    pub position: Vec3,
    /// Disable the emitter after this many simulated seconds
    #[serde(default)]
    pub stop_after: Option<f32>,
    pub config: EmitterConfig,
}

#[derive(Deserialize)]
struct EmitterList {
    #[serde(default)]
    emitters: Vec<EmitterEntry>,
}

#[derive(Debug, Clone)]
pub struct SimulationFile {
    pub runtime: RuntimeConfig,
    pub emitters: Vec<EmitterEntry>,
}

impl SimulationFile {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let runtime = RuntimeConfig::from_toml_str(s)?;
        let list: EmitterList = toml::from_str(s)?;
        let emitters = list
            .emitters
            .into_iter()
            .map(|mut entry| {
                entry.config = entry.config.validated()?;
                Ok(entry)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { runtime, emitters })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

/// One statistics sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsLine {
    pub time: f32,
    pub stats: ParticleStats,
}

/// Mutable state shared by the frame loop and scheduled actions
pub struct Simulation {
    pub particles: ParticleSystem,
    pub scene: SceneGraph,
    pub handlers: Vec<ParticleHandler>,
    pub elapsed: f32,
    pub report: Vec<StatsLine>,
}

impl Simulation {
    pub fn new(seed: u32) -> Self {
        Self {
            particles: ParticleSystem::new().with_seed(seed),
            scene: SceneGraph::new(),
            handlers: Vec::new(),
            elapsed: 0.0,
            report: Vec::new(),
        }
    }

    fn sample(&mut self) {
        let line = StatsLine {
            time: self.elapsed,
            stats: self.particles.stats(),
        };
        tracing::info!(
            target: "simulate",
            "t={:>6.2}s emitters={} particles={} spawned={} expired={}",
            line.time,
            line.stats.emitters,
            line.stats.particles,
            line.stats.spawned,
            line.stats.expired
        );
        self.report.push(line);
    }
}

/// Headless runner: a scene, a particle system and the schedulers driving them
pub struct Runner {
    pub clock: GameClock,
    pub sim: Simulation,
    timers: EventTimer<Simulation>,
    recurring: RecurringEvents<Simulation>,
}

impl Runner {
    pub fn new(file: &SimulationFile, seed: u32) -> Result<Self> {
        let mut sim = Simulation::new(seed);
        sim.particles.set_quality(file.runtime.particle_quality);
        let mut timers = EventTimer::new();

        for entry in &file.emitters {
            let owner = sim.scene.spawn(entry.position);
            let mut handler = ParticleHandler::new(owner);
            handler.add_emitter(&mut sim.particles, entry.name.clone(), entry.config.clone())?;
            let index = sim.handlers.len();
            sim.handlers.push(handler);

            if let Some(seconds) = entry.stop_after {
                let name = entry.name.clone();
                timers.schedule(seconds, move |sim: &mut Simulation| {
                    tracing::info!(target: "simulate", emitter = %name, "stopping emitter");
                    sim.handlers[index].emitter_mut(&mut sim.particles, &name)?.enabled = false;
                    Ok(())
                });
            }
        }

        Ok(Self {
            clock: file.runtime.clock(),
            sim,
            timers,
            recurring: RecurringEvents::new(),
        })
    }

    /// Sample statistics every `seconds` of simulated time
    pub fn report_every(&mut self, seconds: f32) {
        self.recurring.schedule(
            |sim: &mut Simulation| {
                sim.sample();
                Ok(())
            },
            seconds,
            Cutoff::Unbounded,
            None,
        );
    }

    /// Run `frames` frames of `dt` real seconds each
    pub fn run(&mut self, frames: u32, dt: f64) -> Result<()> {
        self.sim.particles.initialize(&mut self.sim.scene)?;
        for _ in 0..frames {
            self.frame(dt)?;
        }
        self.sim.sample();
        Ok(())
    }

    fn frame(&mut self, dt: f64) -> Result<()> {
        self.clock.advance(dt);
        self.sim.elapsed += self.clock.delta_time();

        let sim = &mut self.sim;
        RuntimeSystem::update(&mut sim.particles, &self.clock, &mut sim.scene)?;
        for handler in &mut sim.handlers {
            handler.prune(&sim.particles);
        }

        self.timers.update(&self.clock, &mut self.sim)?;
        self.recurring.update(&self.clock, &mut self.sim)
    }

    /// Number of live entities in the scene (owners and particles)
    pub fn scene_len(&self) -> usize {
        self.sim.scene.len()
    }

    pub fn shutdown(mut self) -> Result<Simulation> {
        self.sim.particles.clear(&mut self.sim.scene);
        self.sim.particles.shutdown()?;
        Ok(self.sim)
    }
}
