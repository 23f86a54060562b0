//! Runtime settings loaded from the `[runtime]` table of a TOML file

use crate::clock::GameClock;
use cinder_core::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Particle detail level. Lower levels stretch the spawn interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticleQuality {
    /// No particles are emitted
    None,
    Low,
    Medium,
    High,
    #[default]
    Max,
}

impl ParticleQuality {
    /// Multiplier applied to an emitter's spawn interval; `None` when
    /// emission is disabled
    pub fn interval_multiplier(&self) -> Option<f32> {
        match self {
            ParticleQuality::None => None,
            ParticleQuality::Low => Some(5.0),
            ParticleQuality::Medium => Some(2.5),
            ParticleQuality::High => Some(1.8),
            ParticleQuality::Max => Some(1.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub time_scale: f64,
    /// Longest real frame accepted before clamping, in seconds
    pub max_frame_time: f64,
    pub particle_quality: ParticleQuality,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            max_frame_time: 0.25,
            particle_quality: ParticleQuality::Max,
        }
    }
}

#[derive(Deserialize)]
struct RuntimeFile {
    #[serde(default)]
    runtime: RuntimeConfig,
}

impl RuntimeConfig {
    /// Parse the `[runtime]` table; a missing table yields the defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: RuntimeFile = toml::from_str(s)?;
        file.runtime.validated()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Build a clock configured from these settings
    pub fn clock(&self) -> GameClock {
        let mut clock = GameClock::new();
        clock.time_scale = self.time_scale;
        clock.max_frame_time = self.max_frame_time;
        clock
    }

    fn validated(mut self) -> Result<Self> {
        if self.max_frame_time <= 0.0 || self.max_frame_time.is_nan() {
            return Err(cinder_core::CinderError::InvalidConfig(format!(
                "max_frame_time must be positive, got {}",
                self.max_frame_time
            )));
        }
        if self.time_scale < 0.0 {
            tracing::warn!(target: "config", time_scale = self.time_scale, "negative time scale clamped to 0");
            self.time_scale = 0.0;
        }
        Ok(self)
    }
}
