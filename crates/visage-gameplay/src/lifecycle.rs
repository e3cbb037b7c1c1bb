//! Spawn and despawn requests.
//!
//! Object instantiation and replication belong to the host engine. The core
//! asks for spawns and despawns through [`LifecycleProvider`].

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;
use visage_common::{EntityAllocator, EntityId};

/// Prefab kinds the core asks the host to instantiate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrefabRef {
    /// Enemy built from a named template.
    Enemy(String),
    /// Player avatar.
    Player,
    /// Enemy projectile.
    Projectile,
    /// Dropped money.
    Money,
}

/// Host-side object lifecycle.
pub trait LifecycleProvider {
    /// Instantiates a prefab and returns its id.
    fn spawn_entity(&mut self, prefab: &PrefabRef, position: Vec2, rotation: f32) -> EntityId;
    /// Destroys an entity. Unknown ids are ignored.
    fn despawn_entity(&mut self, entity: EntityId);
}

/// Record of one spawn request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRecord {
    /// Id handed out.
    pub entity: EntityId,
    /// What was spawned.
    pub prefab: PrefabRef,
    /// Where.
    pub position: Vec2,
}

/// In-process lifecycle that allocates ids and records every request.
#[derive(Debug, Default)]
pub struct LocalLifecycle {
    allocator: EntityAllocator,
    live: BTreeSet<EntityId>,
    spawned: Vec<SpawnRecord>,
    despawned: Vec<EntityId>,
}

impl LocalLifecycle {
    /// Creates an empty lifecycle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every spawn so far, in order.
    #[must_use]
    pub fn spawned(&self) -> &[SpawnRecord] {
        &self.spawned
    }

    /// Every despawn so far, in order.
    #[must_use]
    pub fn despawned(&self) -> &[EntityId] {
        &self.despawned
    }

    /// Returns whether `entity` is spawned and not yet despawned.
    #[must_use]
    pub fn is_live(&self, entity: EntityId) -> bool {
        self.live.contains(&entity)
    }
}

impl LifecycleProvider for LocalLifecycle {
    fn spawn_entity(&mut self, prefab: &PrefabRef, position: Vec2, _rotation: f32) -> EntityId {
        let entity = self.allocator.allocate();
        debug!(%entity, ?prefab, "spawn");
        self.live.insert(entity);
        self.spawned.push(SpawnRecord {
            entity,
            prefab: prefab.clone(),
            position,
        });
        entity
    }

    fn despawn_entity(&mut self, entity: EntityId) {
        if self.live.remove(&entity) {
            debug!(%entity, "despawn");
            self.despawned.push(entity);
        }
    }
}
