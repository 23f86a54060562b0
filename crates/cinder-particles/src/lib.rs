//! Cinder Particles - layout-driven sprite particle system
//!
//! Provides emitter-driven particle simulation with:
//! - Jittered spawn parameters sampled from a seeded xorshift PRNG
//! - Layout blueprints with standard or custom per-frame progression
//! - Child emitters owned by particles and removed with them
//! - Sprite instance packing for instanced draw calls

pub mod emitter;
pub mod handler;
pub mod layout;
pub mod particle;
pub mod rand;
pub mod render;
pub mod system;

pub use emitter::{EmitterConfig, EmitterOwner, ParticleEmitter, DEFAULT_TIME_ALIVE, MIN_SPAWN_INTERVAL};
pub use handler::ParticleHandler;
pub use layout::{ParticleLayout, Progression, ProgressionFn};
pub use particle::{Particle, GRAVITY_EASING};
pub use render::{RenderHandle, SpriteBatch, SpriteDesc, SpriteDrawData, SpriteInstance, SpriteRenderer};
pub use system::{EmitterKey, ParticleStats, ParticleSystem};
