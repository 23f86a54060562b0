//! Emitter configuration (parsed from TOML) and runtime state

use crate::layout::ParticleLayout;
use crate::particle::Particle;
use crate::rand::ParticleRng;
use cinder_core::{CinderError, EntityId, Result, Vec2, Vec3};
use cinder_runtime::ParticleQuality;
use serde::{Deserialize, Serialize};

/// Shortest accepted spawn interval, in seconds
pub const MIN_SPAWN_INTERVAL: f32 = 0.001;

/// Emission time of an emitter whose config leaves `time_alive` unset
pub const DEFAULT_TIME_ALIVE: f32 = 10.0;

/// Emitter blueprint. Every `*_jitter` field is the full width of a range
/// centred on its base value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    pub speed: f32,
    pub speed_jitter: f32,
    pub trajectory: Vec2,
    pub trajectory_jitter: Vec2,
    pub gravity: f32,
    pub gravity_jitter: f32,
    /// Spawn offset from the owner position
    pub offset: Vec2,
    pub offset_jitter: Vec2,
    /// Particle lifetime in seconds
    pub particle_time: f32,
    pub particle_time_jitter: f32,
    /// Seconds between spawns at maximum quality
    pub spawn_interval: f32,
    /// Seconds the emitter keeps spawning; `-1` (any negative) means forever
    pub time_alive: f32,
    /// Draw particles behind the owner instead of in front
    pub render_first: bool,
    pub enabled: bool,
    pub layouts: Vec<ParticleLayout>,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            speed: 10.0,
            speed_jitter: 0.0,
            trajectory: Vec2::ZERO,
            trajectory_jitter: Vec2::new(2.0, 2.0),
            gravity: 0.0,
            gravity_jitter: 0.0,
            offset: Vec2::ZERO,
            offset_jitter: Vec2::ZERO,
            particle_time: 2.0,
            particle_time_jitter: 0.0,
            spawn_interval: 0.5,
            time_alive: DEFAULT_TIME_ALIVE,
            render_first: true,
            enabled: true,
            layouts: Vec::new(),
        }
    }
}

impl EmitterConfig {
    pub fn new(layouts: Vec<ParticleLayout>) -> Self {
        Self {
            layouts,
            ..Self::default()
        }
    }

    /// Parse a standalone emitter table
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: EmitterConfig = toml::from_str(s)?;
        config.validated()
    }

    /// Clamp out-of-range values and reject emitters that cannot spawn.
    /// Nested child blueprints are checked too.
    pub fn validated(mut self) -> Result<Self> {
        if self.layouts.is_empty() {
            return Err(CinderError::InvalidConfig(
                "emitter needs at least one layout".to_string(),
            ));
        }
        if self.spawn_interval.is_nan() || self.spawn_interval < MIN_SPAWN_INTERVAL {
            tracing::warn!(
                target: "particles",
                spawn_interval = self.spawn_interval,
                min = MIN_SPAWN_INTERVAL,
                "spawn interval clamped"
            );
            self.spawn_interval = MIN_SPAWN_INTERVAL;
        }
        for layout in &mut self.layouts {
            if let Some(child) = layout.child.take() {
                layout.child = Some(Box::new(child.validated()?));
            }
        }
        Ok(self)
    }
}

/// What an emitter follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterOwner {
    /// An entity of the host scene
    Entity(EntityId),
    /// A particle of the same system (child emitters)
    Particle(hecs::Entity),
}

/// Runtime state for one emitter
#[derive(Debug, Clone)]
pub struct ParticleEmitter {
    pub config: EmitterConfig,
    owner: EmitterOwner,
    /// Remaining emission time; `None` emits forever
    time_alive: Option<f32>,
    /// Countdown to the next spawn
    spawn_remaining: f32,
    /// Emission paused while false
    pub enabled: bool,
    /// Removed at the end of the current pass when set
    pub must_remove: bool,
    pub render_first: bool,
    spawned: u64,
}

impl ParticleEmitter {
    pub fn new(config: EmitterConfig, owner: EmitterOwner) -> Result<Self> {
        let config = config.validated()?;
        Ok(Self {
            owner,
            time_alive: lifetime(config.time_alive),
            spawn_remaining: 0.0,
            enabled: config.enabled,
            must_remove: false,
            render_first: config.render_first,
            spawned: 0,
            config,
        })
    }

    /// Copy this emitter, timers included, onto a new owner
    pub fn instantiate(&self, owner: EmitterOwner) -> Self {
        Self {
            owner,
            spawned: 0,
            ..self.clone()
        }
    }

    pub fn owner(&self) -> EmitterOwner {
        self.owner
    }

    pub fn set_owner(&mut self, owner: EmitterOwner) {
        self.owner = owner;
    }

    /// Set both the current and the restart emission time
    pub fn set_time_alive(&mut self, seconds: f32) {
        self.config.time_alive = seconds;
        self.time_alive = lifetime(seconds);
    }

    /// Restore the emission time to its configured value
    pub fn restart(&mut self) {
        self.time_alive = lifetime(self.config.time_alive);
    }

    pub fn time_alive(&self) -> Option<f32> {
        self.time_alive
    }

    /// Whether the emission time has run out
    pub fn is_spent(&self) -> bool {
        matches!(self.time_alive, Some(t) if t <= 0.0)
    }

    pub fn is_emitting(&self) -> bool {
        self.enabled && !self.is_spent()
    }

    /// Particles spawned by this emitter so far
    pub fn spawned(&self) -> u64 {
        self.spawned
    }

    /// Advance emission timers by `dt` and return how many particles are
    /// due this frame
    pub fn tick(&mut self, dt: f32, quality: ParticleQuality) -> u32 {
        let Some(multiplier) = quality.interval_multiplier() else {
            return 0;
        };

        if let Some(t) = self.time_alive.as_mut() {
            if *t > 0.0 {
                *t -= dt;
            }
        }
        if !self.is_emitting() {
            return 0;
        }

        let interval = self.config.spawn_interval.max(MIN_SPAWN_INTERVAL) * multiplier;
        self.spawn_remaining -= dt;

        if self.spawn_remaining > 0.0 {
            return 0;
        }
        // One spawn is due now plus one per whole interval of overrun
        let overrun = -f64::from(self.spawn_remaining);
        let due = (overrun / f64::from(interval)).floor() + 1.0;
        self.spawn_remaining = (f64::from(self.spawn_remaining) + due * f64::from(interval)) as f32;
        if self.spawn_remaining <= 0.0 {
            self.spawn_remaining = interval;
        }
        due.min(f64::from(u32::MAX)) as u32
    }

    /// Build one particle around `origin` with freshly sampled parameters.
    /// Returns the particle and the index of the layout it was built from.
    pub fn sample(&mut self, rng: &mut ParticleRng, origin: Vec3) -> Result<(Particle, usize)> {
        if self.config.layouts.is_empty() {
            return Err(CinderError::InvalidConfig(
                "emitter needs at least one layout".to_string(),
            ));
        }
        let c = &self.config;

        let speed = rng.jitter(c.speed, c.speed_jitter);
        let trajectory = Vec2::new(
            rng.jitter(c.trajectory.x, c.trajectory_jitter.x),
            rng.jitter(c.trajectory.y, c.trajectory_jitter.y),
        );
        let gravity = rng.jitter(c.gravity, c.gravity_jitter);
        let depth = if self.render_first { -1.0 } else { 1.0 };
        let position = Vec3::new(
            origin.x + rng.jitter(c.offset.x, c.offset_jitter.x),
            origin.y + rng.jitter(c.offset.y, c.offset_jitter.y),
            origin.z + depth,
        );

        let index = rng.index(c.layouts.len());
        let layout = &c.layouts[index];
        let time_to_live = rng.jitter(c.particle_time, c.particle_time_jitter);

        let mut particle = Particle::at(position, time_to_live);
        particle.trajectory = trajectory;
        particle.speed = speed;
        particle.gravity = gravity;
        particle.size = layout.sample_size(rng);
        particle.rotation = rng.range(0.0, 360.0);
        particle.tint = layout.tint;
        particle.sprite = layout.sprite.clone();

        self.spawned += 1;
        Ok((particle, index))
    }
}

fn lifetime(seconds: f32) -> Option<f32> {
    if seconds < 0.0 {
        None
    } else {
        Some(seconds)
    }
}
