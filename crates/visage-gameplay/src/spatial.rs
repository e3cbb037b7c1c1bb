//! Spatial queries over the arena.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use visage_common::{EntityId, LayerMask};

use crate::entity::{Arena, Damageable};

/// Query shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Disc.
    Circle {
        /// Centre.
        center: Vec2,
        /// Radius.
        radius: f32,
    },
    /// Axis-aligned box.
    Aabb {
        /// Centre.
        center: Vec2,
        /// Half size on each axis.
        half_extents: Vec2,
    },
}

impl Shape {
    /// Returns whether a body disc at `point` with `radius` touches this shape.
    #[must_use]
    pub fn overlaps_circle(&self, point: Vec2, radius: f32) -> bool {
        match *self {
            Self::Circle { center, radius: r } => center.distance_squared(point) <= (r + radius) * (r + radius),
            Self::Aabb {
                center,
                half_extents,
            } => {
                let min = center - half_extents;
                let max = center + half_extents;
                let closest = point.clamp(min, max);
                closest.distance_squared(point) <= radius * radius
            }
        }
    }
}

/// First body hit by a ray.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RayHit {
    /// Entity hit.
    pub entity: EntityId,
    /// Contact point.
    pub point: Vec2,
    /// Distance along the ray.
    pub distance: f32,
}

/// World queries used by sensing and attacks.
///
/// Implementations must be deterministic: equal inputs give equal outputs, and
/// result lists are ordered by ascending id.
pub trait SpatialQuery {
    /// Nearest live body within `radius` of `origin` on a layer in `mask`.
    fn query_nearest_in_radius(&self, origin: Vec2, radius: f32, mask: LayerMask) -> Option<EntityId>;

    /// Every body on a layer in `mask` touching `shape`, dead or alive.
    fn query_shape_overlap(&self, shape: &Shape, mask: LayerMask) -> Vec<EntityId>;

    /// First live body along a ray.
    fn raycast(&self, origin: Vec2, direction: Vec2, max_distance: f32, mask: LayerMask) -> Option<RayHit>;

    /// Position of a body, `None` once despawned.
    fn position(&self, entity: EntityId) -> Option<Vec2>;

    /// Whether `entity` is dead or gone.
    fn is_dead(&self, entity: EntityId) -> bool;
}

/// Distance from `origin` along unit `direction` to a circle, if hit.
fn ray_circle(origin: Vec2, direction: Vec2, center: Vec2, radius: f32) -> Option<f32> {
    let to_center = center - origin;
    let along = to_center.dot(direction);
    let closest_sq = to_center.length_squared() - along * along;
    let r_sq = radius * radius;
    if closest_sq > r_sq {
        return None;
    }
    let half_chord = (r_sq - closest_sq).sqrt();
    let near = along - half_chord;
    if near >= 0.0 {
        Some(near)
    } else if along + half_chord >= 0.0 {
        // Origin inside the circle.
        Some(0.0)
    } else {
        None
    }
}

impl SpatialQuery for Arena {
    fn query_nearest_in_radius(&self, origin: Vec2, radius: f32, mask: LayerMask) -> Option<EntityId> {
        self.iter()
            .filter(|b| mask.contains(b.layer()) && !b.is_dead())
            .map(|b| (b.position.distance(origin), b.id()))
            .filter(|(d, _)| *d <= radius)
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
            .map(|(_, id)| id)
    }

    fn query_shape_overlap(&self, shape: &Shape, mask: LayerMask) -> Vec<EntityId> {
        self.iter()
            .filter(|b| mask.contains(b.layer()) && shape.overlaps_circle(b.position, b.radius))
            .map(|b| b.id())
            .collect()
    }

    fn raycast(&self, origin: Vec2, direction: Vec2, max_distance: f32, mask: LayerMask) -> Option<RayHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec2::ZERO {
            return None;
        }
        self.iter()
            .filter(|b| mask.contains(b.layer()) && !b.is_dead())
            .filter_map(|b| {
                ray_circle(origin, direction, b.position, b.radius).map(|d| (d, b.id()))
            })
            .filter(|(d, _)| *d <= max_distance)
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
            .map(|(distance, entity)| RayHit {
                entity,
                point: origin + direction * distance,
                distance,
            })
    }

    fn position(&self, entity: EntityId) -> Option<Vec2> {
        self.get(entity).map(|b| b.position)
    }

    fn is_dead(&self, entity: EntityId) -> bool {
        self.get(entity).map_or(true, Damageable::is_dead)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::Archetype;
    use crate::authority::LocalAuthority;
    use crate::entity::Combatant;
    use visage_common::Layer;

    fn body(raw: u64, layer: Layer, x: f32, y: f32) -> Combatant {
        Combatant::new(EntityId::from_raw(raw), layer, Archetype::Neutral, 50.0)
            .with_position(Vec2::new(x, y))
    }

    fn arena() -> Arena {
        let mut arena = Arena::new();
        arena.insert(body(1, Layer::Player, 3.0, 0.0));
        arena.insert(body(2, Layer::Player, 0.0, 5.0));
        arena.insert(body(3, Layer::Enemy, 1.0, 0.0));
        arena
    }

    #[test]
    fn test_nearest_respects_mask_and_radius() {
        let arena = arena();
        let id = arena.query_nearest_in_radius(Vec2::ZERO, 10.0, LayerMask::PLAYER);
        assert_eq!(id, Some(EntityId::from_raw(1)));
        assert_eq!(arena.query_nearest_in_radius(Vec2::ZERO, 2.0, LayerMask::PLAYER), None);
        assert_eq!(
            arena.query_nearest_in_radius(Vec2::ZERO, 2.0, LayerMask::ENEMY),
            Some(EntityId::from_raw(3))
        );
    }

    #[test]
    fn test_nearest_skips_dead() {
        let mut arena = arena();
        arena
            .get_mut(EntityId::from_raw(1))
            .unwrap()
            .die(&LocalAuthority::Host)
            .unwrap();
        let id = arena.query_nearest_in_radius(Vec2::ZERO, 10.0, LayerMask::PLAYER);
        assert_eq!(id, Some(EntityId::from_raw(2)));
    }

    #[test]
    fn test_box_overlap() {
        let arena = arena();
        let shape = Shape::Aabb {
            center: Vec2::new(2.0, 0.0),
            half_extents: Vec2::splat(0.75),
        };
        let hits = arena.query_shape_overlap(&shape, LayerMask::ALL);
        assert_eq!(hits, vec![EntityId::from_raw(1), EntityId::from_raw(3)]);
    }

    #[test]
    fn test_raycast_first_hit() {
        let arena = arena();
        let hit = arena
            .raycast(Vec2::new(-5.0, 0.0), Vec2::X, 20.0, LayerMask::PLAYER)
            .unwrap();
        assert_eq!(hit.entity, EntityId::from_raw(1));
        assert!((hit.distance - 7.5).abs() < 1e-4);

        assert!(arena
            .raycast(Vec2::new(-5.0, 0.0), Vec2::X, 5.0, LayerMask::PLAYER)
            .is_none());
        assert!(arena
            .raycast(Vec2::ZERO, Vec2::ZERO, 5.0, LayerMask::ALL)
            .is_none());
    }

    #[test]
    fn test_missing_entity_counts_as_dead() {
        let arena = arena();
        assert!(arena.is_dead(EntityId::from_raw(42)));
        assert!(!arena.is_dead(EntityId::from_raw(2)));
        assert_eq!(arena.position(EntityId::from_raw(42)), None);
    }
}
