//! Scene interface consumed by spawning systems

use cinder_core::{EntityId, Vec3};
use std::collections::HashMap;

/// The add/move/remove surface of whatever owns live entities.
///
/// Spawners insert entities through it, moving entities report their new
/// position every frame, and expiring entities remove themselves through
/// it, at most once each per frame.
pub trait Scene {
    fn add_entity(&mut self, id: EntityId, position: Vec3);

    fn remove_entity(&mut self, id: EntityId);

    /// Move a live entity. Returns false when the id is unknown.
    fn set_position(&mut self, id: EntityId, position: Vec3) -> bool;

    /// Current position of a live entity
    fn position(&self, id: EntityId) -> Option<Vec3>;
}

/// Minimal in-memory scene: entity positions keyed by id
#[derive(Debug, Default)]
pub struct SceneGraph {
    positions: HashMap<EntityId, Vec3>,
    added: u64,
    removed: u64,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a plain entity at `position` and return its id
    pub fn spawn(&mut self, position: Vec3) -> EntityId {
        let id = EntityId::new();
        self.add_entity(id, position);
        id
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Lifetime count of insertions
    pub fn total_added(&self) -> u64 {
        self.added
    }

    /// Lifetime count of removals
    pub fn total_removed(&self) -> u64 {
        self.removed
    }
}

impl Scene for SceneGraph {
    fn add_entity(&mut self, id: EntityId, position: Vec3) {
        if self.positions.insert(id, position).is_none() {
            self.added += 1;
        }
    }

    fn remove_entity(&mut self, id: EntityId) {
        if self.positions.remove(&id).is_some() {
            self.removed += 1;
        } else {
            tracing::warn!(target: "scene", %id, "remove of unknown entity");
        }
    }

    fn set_position(&mut self, id: EntityId, position: Vec3) -> bool {
        match self.positions.get_mut(&id) {
            Some(p) => {
                *p = position;
                true
            }
            None => false,
        }
    }

    fn position(&self, id: EntityId) -> Option<Vec3> {
        self.positions.get(&id).copied()
    }
}
