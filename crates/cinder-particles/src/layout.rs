//! Particle layouts: the blueprint each particle is stamped from

use crate::emitter::EmitterConfig;
use crate::particle::Particle;
use crate::rand::ParticleRng;
use cinder_core::{Color, Result, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Signature of a custom per-frame progression
pub type ProgressionFn = dyn Fn(&mut Particle, f32) -> Result<()> + Send + Sync;

/// How a particle advances each frame while alive
#[derive(Clone, Default)]
pub enum Progression {
    /// Gravity easing, trajectory motion and linear fade-out
    #[default]
    Standard,
    Custom(Arc<ProgressionFn>),
}

impl Progression {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&mut Particle, f32) -> Result<()> + Send + Sync + 'static,
    {
        Progression::Custom(Arc::new(f))
    }

    /// Run one frame of progression with `dt` simulated seconds
    pub fn apply(&self, particle: &mut Particle, dt: f32) -> Result<()> {
        match self {
            Progression::Standard => {
                particle.standard_progression(dt);
                Ok(())
            }
            Progression::Custom(f) => f(particle, dt),
        }
    }
}

impl fmt::Debug for Progression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progression::Standard => f.write_str("Standard"),
            Progression::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

fn unit_size() -> Vec2 {
    Vec2::new(1.0, 1.0)
}

/// Immutable particle blueprint
///
/// ```toml
/// [[layouts]]
/// sprite = "spark.png"
/// size = { x = 8.0, y = 8.0 }
/// size_jitter = { x = 4.0, y = 4.0 }
/// tint = { r = 1.0, g = 0.6, b = 0.2 }
///
/// [layouts.child]
/// spawn_interval = 0.1
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticleLayout {
    pub sprite: String,
    #[serde(default = "unit_size")]
    pub size: Vec2,
    #[serde(default)]
    pub size_jitter: Option<Vec2>,
    #[serde(default)]
    pub tint: Color,
    /// Emitter instantiated for, and owned by, every particle built from this layout
    #[serde(default)]
    pub child: Option<Box<EmitterConfig>>,
    #[serde(skip)]
    pub progression: Progression,
}

impl ParticleLayout {
    pub fn new(sprite: impl Into<String>, size: Vec2) -> Self {
        Self {
            sprite: sprite.into(),
            size,
            size_jitter: None,
            tint: Color::WHITE,
            child: None,
            progression: Progression::Standard,
        }
    }

    pub fn with_size_jitter(mut self, jitter: Vec2) -> Self {
        self.size_jitter = Some(jitter);
        self
    }

    pub fn with_tint(mut self, tint: Color) -> Self {
        self.tint = tint;
        self
    }

    pub fn with_child(mut self, child: EmitterConfig) -> Self {
        self.child = Some(Box::new(child));
        self
    }

    pub fn with_progression(mut self, progression: Progression) -> Self {
        self.progression = progression;
        self
    }

    /// Sprite size for a new particle. One sample scales both axes so the
    /// aspect ratio of the jitter range is kept.
    pub fn sample_size(&self, rng: &mut ParticleRng) -> Vec2 {
        match self.size_jitter {
            Some(range) => {
                let t = rng.next_f32();
                Vec2::new(
                    self.size.x + t * range.x - range.x / 2.0,
                    self.size.y + t * range.y - range.y / 2.0,
                )
            }
            None => self.size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_without_jitter_is_nominal() {
        let layout = ParticleLayout::new("dot.png", Vec2::new(4.0, 2.0));
        let mut rng = ParticleRng::new(5);
        assert_eq!(layout.sample_size(&mut rng), Vec2::new(4.0, 2.0));
    }

    #[test]
    fn size_jitter_in_range() {
        let layout =
            ParticleLayout::new("dot.png", Vec2::new(10.0, 10.0)).with_size_jitter(Vec2::new(4.0, 2.0));
        let mut rng = ParticleRng::new(11);
        for _ in 0..500 {
            let size = layout.sample_size(&mut rng);
            assert!((8.0..12.0).contains(&size.x));
            assert!((9.0..11.0).contains(&size.y));
            // Shared sample: offsets keep the 2:1 ratio of the ranges
            assert!(((size.x - 10.0) - 2.0 * (size.y - 10.0)).abs() < 1e-4);
        }
    }

    #[test]
    fn custom_progression_runs_closure() {
        let progression = Progression::custom(|p: &mut Particle, dt: f32| {
            p.position.x += 100.0 * dt;
            Ok(())
        });
        let mut particle = Particle::at(cinder_core::Vec3::ZERO, 1.0);
        progression.apply(&mut particle, 0.5).unwrap();
        assert_eq!(particle.position.x, 50.0);
        assert_eq!(format!("{progression:?}"), "Custom(..)");
    }

    #[test]
    fn parse_layout_with_child() {
        let layout: ParticleLayout = toml::from_str(
            r#"
sprite = "smoke.png"
size = { x = 8.0, y = 8.0 }
tint = { r = 0.5, g = 0.5, b = 0.5 }

[child]
spawn_interval = 0.1

[[child.layouts]]
sprite = "ember.png"
"#,
        )
        .unwrap();
        assert_eq!(layout.tint.a, 1.0);
        let child = layout.child.as_deref().unwrap();
        assert_eq!(child.spawn_interval, 0.1);
        assert_eq!(child.layouts[0].size, Vec2::new(1.0, 1.0));
        assert!(matches!(layout.progression, Progression::Standard));
    }
}
