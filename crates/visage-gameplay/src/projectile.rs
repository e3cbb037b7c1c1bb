//! Projectiles in flight.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use visage_common::EntityId;

use crate::attack::{AttackExecutor, HitReport};
use crate::clock::{Deadline, SimTime};
use crate::entity::{Arena, AttackerProfile};
use crate::lifecycle::LifecycleProvider;
use crate::spatial::{Shape, SpatialQuery};

/// An active projectile.
///
/// `source` is a copy of the owner taken at launch, so damage resolves the
/// same way even if the owner dies or despawns mid-flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Projectile entity.
    pub id: EntityId,
    /// Owner snapshot (archetype, bonus, base damage, hostile mask).
    pub source: AttackerProfile,
    /// Current position.
    pub position: Vec2,
    /// Unit travel direction.
    pub direction: Vec2,
    /// Units per second.
    pub speed: f32,
    /// Contact radius.
    pub radius: f32,
    /// Removal time.
    pub expires_at: Deadline,
}

/// Why a projectile left the world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ProjectileEnd {
    /// Hit something.
    Hit(HitReport),
    /// Lifetime ran out.
    Expired(EntityId),
}

/// Owns every projectile in flight.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectileSystem {
    projectiles: Vec<Projectile>,
}

impl ProjectileSystem {
    /// Creates an empty system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a projectile.
    pub fn spawn(&mut self, projectile: Projectile) {
        trace!(id = %projectile.id, owner = %projectile.source.id, "projectile launched");
        self.projectiles.push(projectile);
    }

    /// Number in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.projectiles.len()
    }

    /// Returns whether none are in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }

    /// Iterates projectiles in launch order.
    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.iter()
    }

    /// Advances every projectile one step.
    ///
    /// A projectile damages the first live hostile it touches and is removed.
    /// Expired projectiles are removed without effect. A hit rejected for
    /// lack of authority still consumes the projectile.
    pub fn update(
        &mut self,
        now: SimTime,
        dt: f32,
        arena: &mut Arena,
        executor: &AttackExecutor<'_>,
        lifecycle: &mut dyn LifecycleProvider,
    ) -> Vec<ProjectileEnd> {
        let mut ended = Vec::new();
        let mut kept = Vec::with_capacity(self.projectiles.len());

        for mut projectile in std::mem::take(&mut self.projectiles) {
            if projectile.expires_at.is_due(now) {
                lifecycle.despawn_entity(projectile.id);
                ended.push(ProjectileEnd::Expired(projectile.id));
                continue;
            }

            let start = projectile.position;
            let step = projectile.speed * dt;
            projectile.position += projectile.direction * step;

            match first_contact(arena, &projectile, start, step) {
                Some(target) => {
                    let hit = executor.resolve_hit(
                        arena,
                        &projectile.source,
                        target,
                        Some(projectile.direction),
                    );
                    lifecycle.despawn_entity(projectile.id);
                    match hit {
                        Ok(Some(hit)) => ended.push(ProjectileEnd::Hit(hit)),
                        Ok(None) => {}
                        Err(err) => debug!(id = %projectile.id, %err, "projectile hit not applied"),
                    }
                }
                None => kept.push(projectile),
            }
        }

        self.projectiles = kept;
        ended
    }
}

/// Nearest live hostile touching the projectile this step.
fn first_contact(arena: &Arena, projectile: &Projectile, start: Vec2, step: f32) -> Option<EntityId> {
    let mask = projectile.source.hostile_mask;
    let shape = Shape::Circle {
        center: projectile.position,
        radius: projectile.radius,
    };
    let overlapping = arena
        .query_shape_overlap(&shape, mask)
        .into_iter()
        .filter(|id| *id != projectile.source.id && !arena.is_dead(*id))
        .filter_map(|id| arena.position(id).map(|p| (start.distance(p), id)))
        .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
        .map(|(_, id)| id);

    overlapping.or_else(|| {
        arena
            .raycast(start, projectile.direction, step, mask)
            .map(|hit| hit.entity)
            .filter(|id| *id != projectile.source.id)
    })
}
