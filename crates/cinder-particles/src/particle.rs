//! Particle state and the standard per-frame progression

use crate::render::{RenderHandle, SpriteDesc};
use cinder_core::{lerp_towards, Color, EntityId, Vec2, Vec3};

/// Fraction of the remaining gap between current and target gravity closed
/// each frame. Applied per frame, not per second, so convergence speed
/// depends on frame rate.
pub const GRAVITY_EASING: f32 = 0.1;

/// Simulation state for one live particle
#[derive(Debug, Clone)]
pub struct Particle {
    /// Scene identity of this particle
    pub id: EntityId,
    /// World position; `z` only orders drawing
    pub position: Vec3,
    pub trajectory: Vec2,
    pub speed: f32,
    /// Target gravity
    pub gravity: f32,
    /// Gravity currently applied, eased towards `gravity`
    pub curr_gravity: f32,
    pub time_to_live: f32,
    pub time_remaining: f32,
    pub size: Vec2,
    /// Sprite rotation in degrees
    pub rotation: f32,
    pub tint: Color,
    /// 1.0 at spawn, falls linearly to 0.0 at expiry
    pub transparency: f32,
    pub sprite: String,
    pub render: Option<RenderHandle>,
    /// Emitter owned by this particle, despawned with it
    pub child: Option<hecs::Entity>,
}

impl Particle {
    /// A motionless white particle at `position` living `time_to_live` seconds
    pub fn at(position: Vec3, time_to_live: f32) -> Self {
        Self {
            id: EntityId::new(),
            position,
            trajectory: Vec2::ZERO,
            speed: 0.0,
            gravity: 0.0,
            curr_gravity: 0.0,
            time_to_live,
            time_remaining: time_to_live,
            size: Vec2::new(1.0, 1.0),
            rotation: 0.0,
            tint: Color::WHITE,
            transparency: 1.0,
            sprite: String::new(),
            render: None,
            child: None,
        }
    }

    /// Count down `dt` seconds of life. Returns true once the particle has
    /// expired; an expired particle must not be progressed again.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.time_remaining -= dt;
        self.is_expired()
    }

    pub fn is_expired(&self) -> bool {
        self.time_remaining <= 0.0
    }

    /// Remaining life as a fraction of the full lifetime
    pub fn life_ratio(&self) -> f32 {
        if self.time_to_live <= 0.0 {
            0.0
        } else {
            (self.time_remaining / self.time_to_live).clamp(0.0, 1.0)
        }
    }

    /// Ease gravity, move along the trajectory and fade out
    pub fn standard_progression(&mut self, dt: f32) {
        self.curr_gravity = lerp_towards(self.curr_gravity, self.gravity, GRAVITY_EASING);
        self.position.x += self.trajectory.x * self.speed * dt;
        self.position.y += (self.curr_gravity + self.trajectory.y).clamp(-1.0, 1.0) * self.speed * dt;
        self.transparency = self.life_ratio();
    }

    /// Sprite description, centred on the particle position
    pub fn sprite_desc(&self) -> SpriteDesc {
        SpriteDesc {
            sprite: self.sprite.clone(),
            position: self.position,
            size: self.size,
            offset: Vec2::new(-self.size.x / 2.0, -self.size.y / 2.0),
            rotation: self.rotation,
            tint: self.tint,
            transparency: self.transparency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moving() -> Particle {
        let mut p = Particle::at(Vec3::ZERO, 1.0);
        p.trajectory = Vec2::new(1.0, 0.0);
        p.speed = 10.0;
        p.gravity = 0.5;
        p
    }

    #[test]
    fn standard_progression_step() {
        let mut p = moving();
        assert!(!p.advance(0.1));
        p.standard_progression(0.1);

        assert!((p.curr_gravity - 0.05).abs() < 1e-6);
        assert!((p.position.x - 1.0).abs() < 1e-5);
        assert!((p.position.y - 0.05).abs() < 1e-5);
        assert!((p.transparency - 0.9).abs() < 1e-5);
    }

    #[test]
    fn vertical_motion_is_clamped() {
        let mut p = moving();
        p.trajectory = Vec2::new(0.0, 5.0);
        p.standard_progression(0.1);
        assert!((p.position.y - 1.0).abs() < 1e-5);

        p.trajectory = Vec2::new(0.0, -5.0);
        p.standard_progression(0.1);
        assert!(p.position.y.abs() < 1e-5);
    }

    #[test]
    fn gravity_converges_towards_target() {
        let mut p = moving();
        let mut previous = 0.0;
        for _ in 0..50 {
            p.standard_progression(0.0);
            assert!(p.curr_gravity > previous && p.curr_gravity <= p.gravity);
            previous = p.curr_gravity;
        }
        assert!((p.curr_gravity - p.gravity).abs() < 0.01);
    }

    #[test]
    fn fade_is_linear_until_expiry() {
        let mut p = Particle::at(Vec3::ZERO, 2.0);
        assert_eq!(p.transparency, 1.0);

        for expected in [0.75, 0.5, 0.25] {
            assert!(!p.advance(0.5));
            p.standard_progression(0.5);
            assert!((p.transparency - expected).abs() < 1e-6);
        }
        assert!(p.advance(0.5));
    }

    #[test]
    fn sprite_is_centred() {
        let mut p = Particle::at(Vec3::new(5.0, 5.0, 1.0), 1.0);
        p.size = Vec2::new(4.0, 2.0);
        let desc = p.sprite_desc();
        assert_eq!(desc.offset, Vec2::new(-2.0, -1.0));
        assert_eq!(desc.position.z, 1.0);
    }
}
