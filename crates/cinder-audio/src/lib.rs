//! Cinder Audio - delayed clip control (Kira backend)
//!
//! - `AudioClip`: anything that can be played, stopped, paused and resumed
//! - `AudioSource`: owns clips and the `AudioClipTask`s scheduled on them
//! - `AudioEngine` / `KiraClip`: Kira-backed clips, silent without a device

pub mod clip;
pub mod engine;
pub mod task;

pub use clip::{AudioClip, AudioTask};
pub use engine::{AudioEngine, KiraClip};
pub use task::{AudioClipTask, AudioSource, ClipId, CompletionAction, DelayTime};
