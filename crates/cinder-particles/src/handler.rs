//! Named emitter registry for one scene entity

use crate::emitter::{EmitterConfig, EmitterOwner, ParticleEmitter};
use crate::render::SpriteRenderer;
use crate::system::{EmitterKey, ParticleSystem};
use cinder_core::{CinderError, EntityId, Result};
use std::collections::BTreeMap;

/// Emitters attached to one owner, addressed by name.
///
/// The emitters themselves live in the [`ParticleSystem`] and are updated
/// with every other emitter; the handler only maps names to keys. Entries
/// whose emitter was removed (for example through `must_remove`) are
/// dropped by [`ParticleHandler::prune`].
#[derive(Debug, Clone)]
pub struct ParticleHandler {
    owner: EntityId,
    emitters: BTreeMap<String, EmitterKey>,
}

impl ParticleHandler {
    pub fn new(owner: EntityId) -> Self {
        Self {
            owner,
            emitters: BTreeMap::new(),
        }
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Create an emitter from `config` under `name`, replacing any emitter
    /// previously registered with that name
    pub fn add_emitter<R: SpriteRenderer>(
        &mut self,
        system: &mut ParticleSystem<R>,
        name: impl Into<String>,
        config: EmitterConfig,
    ) -> Result<EmitterKey> {
        let emitter = ParticleEmitter::new(config, EmitterOwner::Entity(self.owner))?;
        Ok(self.insert(system, name.into(), emitter))
    }

    /// Register a copy of `template` owned by this handler's entity
    pub fn add_instance<R: SpriteRenderer>(
        &mut self,
        system: &mut ParticleSystem<R>,
        name: impl Into<String>,
        template: &ParticleEmitter,
    ) -> EmitterKey {
        let emitter = template.instantiate(EmitterOwner::Entity(self.owner));
        self.insert(system, name.into(), emitter)
    }

    fn insert<R: SpriteRenderer>(
        &mut self,
        system: &mut ParticleSystem<R>,
        name: String,
        emitter: ParticleEmitter,
    ) -> EmitterKey {
        let key = system.add_emitter(emitter);
        if let Some(old) = self.emitters.insert(name, key) {
            system.remove_emitter(old);
        }
        key
    }

    pub fn key(&self, name: &str) -> Option<EmitterKey> {
        self.emitters.get(name).copied()
    }

    pub fn emitter<'a, R: SpriteRenderer>(
        &self,
        system: &'a ParticleSystem<R>,
        name: &str,
    ) -> Option<hecs::Ref<'a, ParticleEmitter>> {
        system.emitter(self.key(name)?)
    }

    pub fn emitter_mut<'a, R: SpriteRenderer>(
        &self,
        system: &'a mut ParticleSystem<R>,
        name: &str,
    ) -> Result<&'a mut ParticleEmitter> {
        let key = self
            .key(name)
            .ok_or_else(|| CinderError::EmitterNotFound(name.to_string()))?;
        system
            .emitter_mut(key)
            .ok_or_else(|| CinderError::EmitterNotFound(name.to_string()))
    }

    /// Unregister and remove the named emitter. Unknown names are ignored.
    pub fn remove_emitter<R: SpriteRenderer>(&mut self, system: &mut ParticleSystem<R>, name: &str) -> bool {
        match self.emitters.remove(name) {
            Some(key) => system.remove_emitter(key),
            None => false,
        }
    }

    /// Drop names whose emitter no longer exists
    pub fn prune<R: SpriteRenderer>(&mut self, system: &ParticleSystem<R>) {
        self.emitters.retain(|_, key| system.contains_emitter(*key));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.emitters.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.emitters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }
}
