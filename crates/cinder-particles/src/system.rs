//! Particle system: emitters and particles stored in one `hecs::World`

use crate::emitter::{EmitterConfig, EmitterOwner, ParticleEmitter};
use crate::layout::Progression;
use crate::particle::Particle;
use crate::rand::ParticleRng;
use crate::render::{SpriteBatch, SpriteDrawData, SpriteRenderer};
use cinder_core::{EntityId, Result};
use cinder_runtime::{Clock, ParticleQuality, RuntimeSystem, Scene};

/// Handle to an emitter registered with a [`ParticleSystem`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EmitterKey(pub(crate) hecs::Entity);

/// Counters reported by [`ParticleSystem::stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParticleStats {
    pub emitters: usize,
    pub particles: usize,
    /// Particles spawned since creation
    pub spawned: u64,
    /// Particles expired since creation
    pub expired: u64,
}

struct PendingSpawn {
    particle: Particle,
    progression: Progression,
    child: Option<Box<EmitterConfig>>,
}

/// The particle system. Implements [`RuntimeSystem`] for integration with
/// the game loop.
///
/// Each frame live particles are advanced first (expired ones leave the
/// scene together with their child emitter), then every emitter spawns the
/// particles due. Particles spawned this frame are first progressed on the
/// next one.
pub struct ParticleSystem<R: SpriteRenderer = SpriteBatch> {
    world: hecs::World,
    renderer: R,
    rng: ParticleRng,
    quality: ParticleQuality,
    spawned: u64,
    expired: u64,
}

impl ParticleSystem<SpriteBatch> {
    pub fn new() -> Self {
        Self::with_renderer(SpriteBatch::new())
    }

    /// Pack live sprites and return per-texture draw data
    pub fn draw_data(&mut self) -> Vec<SpriteDrawData<'_>> {
        self.renderer.pack_instances();
        self.renderer.draw_data()
    }
}

impl Default for ParticleSystem<SpriteBatch> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: SpriteRenderer> ParticleSystem<R> {
    pub fn with_renderer(renderer: R) -> Self {
        Self {
            world: hecs::World::new(),
            renderer,
            rng: ParticleRng::new(0xDEAD_BEEF),
            quality: ParticleQuality::Max,
            spawned: 0,
            expired: 0,
        }
    }

    /// Reseed the spawn sampler
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.rng = ParticleRng::new(seed);
        self
    }

    pub fn quality(&self) -> ParticleQuality {
        self.quality
    }

    pub fn set_quality(&mut self, quality: ParticleQuality) {
        self.quality = quality;
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn add_emitter(&mut self, emitter: ParticleEmitter) -> EmitterKey {
        EmitterKey(self.world.spawn((emitter,)))
    }

    /// Build an emitter from `config` following scene entity `owner`
    pub fn spawn_emitter(&mut self, config: EmitterConfig, owner: EntityId) -> Result<EmitterKey> {
        let emitter = ParticleEmitter::new(config, EmitterOwner::Entity(owner))?;
        Ok(self.add_emitter(emitter))
    }

    pub fn emitter(&self, key: EmitterKey) -> Option<hecs::Ref<'_, ParticleEmitter>> {
        self.world.get::<&ParticleEmitter>(key.0).ok()
    }

    pub fn emitter_mut(&mut self, key: EmitterKey) -> Option<&mut ParticleEmitter> {
        self.world.query_one_mut::<&mut ParticleEmitter>(key.0).ok()
    }

    /// Remove an emitter. Particles it already spawned live on.
    pub fn remove_emitter(&mut self, key: EmitterKey) -> bool {
        if self.emitter(key).is_none() {
            return false;
        }
        self.world.despawn(key.0).is_ok()
    }

    pub fn contains_emitter(&self, key: EmitterKey) -> bool {
        self.emitter(key).is_some()
    }

    pub fn emitter_count(&self) -> usize {
        self.world.query::<&ParticleEmitter>().iter().count()
    }

    pub fn particle_count(&self) -> usize {
        self.world.query::<&Particle>().iter().count()
    }

    /// Snapshot of every live particle
    pub fn particles(&self) -> Vec<Particle> {
        self.world
            .query::<&Particle>()
            .iter()
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn stats(&self) -> ParticleStats {
        ParticleStats {
            emitters: self.emitter_count(),
            particles: self.particle_count(),
            spawned: self.spawned,
            expired: self.expired,
        }
    }

    /// Advance the simulation by `dt` simulated seconds
    pub fn step(&mut self, dt: f32, scene: &mut dyn Scene) -> Result<()> {
        self.update_particles(dt, scene)?;
        self.update_emitters(dt, scene)
    }

    /// Remove every particle from the scene and drop all emitters
    pub fn clear(&mut self, scene: &mut dyn Scene) {
        let particles: Vec<hecs::Entity> = self
            .world
            .query::<&Particle>()
            .iter()
            .map(|(entity, _)| entity)
            .collect();
        for entity in particles {
            self.despawn_particle(entity, scene);
        }
        self.world.clear();
    }

    fn update_particles(&mut self, dt: f32, scene: &mut dyn Scene) -> Result<()> {
        let mut expired = Vec::new();
        let mut failure = None;

        for (entity, (particle, progression)) in
            self.world.query_mut::<(&mut Particle, &Progression)>()
        {
            if particle.advance(dt) {
                expired.push(entity);
                continue;
            }
            if let Err(err) = progression.apply(particle, dt) {
                failure = Some(err);
                break;
            }
            scene.set_position(particle.id, particle.position);
            if let Some(handle) = particle.render {
                self.renderer.set_position(handle, particle.position);
                self.renderer.set_transparency(handle, particle.transparency);
            }
        }

        for entity in expired {
            self.despawn_particle(entity, scene);
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn update_emitters(&mut self, dt: f32, scene: &mut dyn Scene) -> Result<()> {
        let emitters: Vec<hecs::Entity> = self
            .world
            .query::<&ParticleEmitter>()
            .iter()
            .map(|(entity, _)| entity)
            .collect();

        let mut pending = Vec::new();
        let mut doomed = Vec::new();

        for entity in emitters {
            let Some(owner) = self.emitter(EmitterKey(entity)).map(|e| e.owner()) else {
                continue;
            };
            let origin = match owner {
                EmitterOwner::Entity(id) => scene.position(id),
                EmitterOwner::Particle(p) => self.world.get::<&Particle>(p).ok().map(|p| p.position),
            };
            let Some(origin) = origin else {
                tracing::debug!(target: "particles", ?owner, "emitter owner gone, removing emitter");
                doomed.push(entity);
                continue;
            };

            let Ok(emitter) = self.world.query_one_mut::<&mut ParticleEmitter>(entity) else {
                continue;
            };
            let due = emitter.tick(dt, self.quality);
            for _ in 0..due {
                let (particle, index) = emitter.sample(&mut self.rng, origin)?;
                let layout = &emitter.config.layouts[index];
                pending.push(PendingSpawn {
                    particle,
                    progression: layout.progression.clone(),
                    child: layout.child.clone(),
                });
            }
            if emitter.must_remove {
                doomed.push(entity);
            }
        }

        for spawn in pending {
            self.spawn_particle(spawn, scene)?;
        }
        for entity in doomed {
            if self.world.despawn(entity).is_ok() {
                tracing::trace!(target: "particles", ?entity, "emitter removed");
            }
        }
        Ok(())
    }

    fn spawn_particle(&mut self, spawn: PendingSpawn, scene: &mut dyn Scene) -> Result<()> {
        let PendingSpawn {
            mut particle,
            progression,
            child,
        } = spawn;

        particle.render = Some(self.renderer.attach(&particle.sprite_desc()));
        scene.add_entity(particle.id, particle.position);
        let id = particle.id;
        let entity = self.world.spawn((particle, progression));

        if let Some(config) = child {
            let emitter = ParticleEmitter::new(*config, EmitterOwner::Particle(entity))?;
            let child_entity = self.world.spawn((emitter,));
            if let Ok(particle) = self.world.query_one_mut::<&mut Particle>(entity) {
                particle.child = Some(child_entity);
            }
        }

        self.spawned += 1;
        tracing::trace!(target: "particles", %id, "particle spawned");
        Ok(())
    }

    fn despawn_particle(&mut self, entity: hecs::Entity, scene: &mut dyn Scene) {
        let Ok(particle) = self.world.remove_one::<Particle>(entity) else {
            return;
        };
        let _ = self.world.despawn(entity);

        scene.remove_entity(particle.id);
        if let Some(handle) = particle.render {
            self.renderer.detach(handle);
        }
        if let Some(child) = particle.child {
            let _ = self.world.despawn(child);
        }
        self.expired += 1;
    }
}

impl<R: SpriteRenderer> RuntimeSystem for ParticleSystem<R> {
    fn initialize(&mut self, _scene: &mut dyn Scene) -> Result<()> {
        let count = self.emitter_count();
        if count > 0 {
            tracing::info!(target: "particles", quality = ?self.quality, "Discovered {count} emitter(s)");
        }
        Ok(())
    }

    fn update(&mut self, clock: &dyn Clock, scene: &mut dyn Scene) -> Result<()> {
        self.step(clock.delta_time(), scene)
    }

    fn shutdown(&mut self) -> Result<()> {
        for (_, particle) in self.world.query::<&Particle>().iter() {
            if let Some(handle) = particle.render {
                self.renderer.detach(handle);
            }
        }
        self.world.clear();
        Ok(())
    }

    fn name(&self) -> &str {
        "particles"
    }
}
