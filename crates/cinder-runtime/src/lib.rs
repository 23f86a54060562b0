//! Cinder Runtime - Game loop infrastructure
//!
//! Provides the per-frame building blocks shared by every simulated system:
//! - `Clock` / `GameClock` / `StepClock` - simulated and real frame time
//! - `EventTimer` - one-shot delayed actions
//! - `RecurringEvents` - actions repeated at a fixed frequency
//! - `Scene` / `SceneGraph` - the add/remove collaborator for spawned entities
//! - `RuntimeSystem` - trait for systems ticked by the game loop
//! - `RuntimeConfig` - TOML-backed runtime settings

mod clock;
mod config;
mod recurring;
mod scene;
mod system;
mod timer;

pub use clock::{Clock, GameClock, StepClock};
pub use config::{ParticleQuality, RuntimeConfig};
pub use recurring::{
    Cutoff, RecurringAction, RecurringEvents, RecurringHandle, RecurringId, COUNT_EPSILON,
    MIN_FREQUENCY,
};
pub use scene::{Scene, SceneGraph};
pub use system::RuntimeSystem;
pub use timer::{EventTimer, TimedAction, TimerHandle, TimerId};
