//! Target sensing.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use visage_common::{EntityId, LayerMask};

use crate::spatial::{Shape, SpatialQuery};

/// A sensed target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sensed {
    /// Target entity.
    pub entity: EntityId,
    /// Target position at sensing time.
    pub position: Vec2,
    /// Distance from the sensing origin.
    pub distance: f32,
}

/// Finds the nearest live hostile within a radius.
///
/// Candidates come from a circle overlap. Dead or despawned candidates are
/// skipped. Equal distances resolve to the lowest [`EntityId`].
pub fn find_nearest(
    world: &dyn SpatialQuery,
    origin: Vec2,
    radius: f32,
    hostile_mask: LayerMask,
) -> Option<Sensed> {
    let shape = Shape::Circle {
        center: origin,
        radius,
    };
    world
        .query_shape_overlap(&shape, hostile_mask)
        .into_iter()
        .filter(|id| !world.is_dead(*id))
        .filter_map(|entity| {
            let position = world.position(entity)?;
            Some(Sensed {
                entity,
                position,
                distance: origin.distance(position),
            })
        })
        .min_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.entity.cmp(&b.entity))
        })
}

/// Re-reads a tracked target. `None` if it died or despawned.
pub fn track(world: &dyn SpatialQuery, origin: Vec2, target: EntityId) -> Option<Sensed> {
    if world.is_dead(target) {
        return None;
    }
    let position = world.position(target)?;
    Some(Sensed {
        entity: target,
        position,
        distance: origin.distance(position),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::Archetype;
    use crate::authority::LocalAuthority;
    use crate::entity::{Arena, Combatant, Damageable};
    use visage_common::Layer;

    fn player(raw: u64, x: f32, y: f32) -> Combatant {
        Combatant::new(EntityId::from_raw(raw), Layer::Player, Archetype::Happy, 100.0)
            .with_position(Vec2::new(x, y))
            .with_radius(0.0)
    }

    #[test]
    fn test_nearest_wins() {
        let mut arena = Arena::new();
        arena.insert(player(1, 4.0, 0.0));
        arena.insert(player(2, 2.0, 0.0));
        let sensed = find_nearest(&arena, Vec2::ZERO, 8.0, LayerMask::PLAYER).unwrap();
        assert_eq!(sensed.entity, EntityId::from_raw(2));
        assert!((sensed.distance - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_tie_breaks_on_lowest_id() {
        let mut arena = Arena::new();
        arena.insert(player(9, 0.0, 3.0));
        arena.insert(player(4, 3.0, 0.0));
        arena.insert(player(6, -3.0, 0.0));
        let sensed = find_nearest(&arena, Vec2::ZERO, 8.0, LayerMask::PLAYER).unwrap();
        assert_eq!(sensed.entity, EntityId::from_raw(4));
    }

    #[test]
    fn test_dead_and_masked_candidates_skipped() {
        let mut arena = Arena::new();
        arena.insert(player(1, 1.0, 0.0));
        arena.insert(player(2, 5.0, 0.0));
        arena.insert(
            Combatant::new(EntityId::from_raw(3), Layer::Enemy, Archetype::Sad, 10.0)
                .with_position(Vec2::new(0.5, 0.0)),
        );
        arena
            .get_mut(EntityId::from_raw(1))
            .unwrap()
            .die(&LocalAuthority::Host)
            .unwrap();

        let sensed = find_nearest(&arena, Vec2::ZERO, 8.0, LayerMask::PLAYER).unwrap();
        assert_eq!(sensed.entity, EntityId::from_raw(2));
        assert!(find_nearest(&arena, Vec2::ZERO, 3.0, LayerMask::PLAYER).is_none());
    }

    #[test]
    fn test_track_lost_target() {
        let mut arena = Arena::new();
        arena.insert(player(1, 1.0, 0.0));
        assert!(track(&arena, Vec2::ZERO, EntityId::from_raw(1)).is_some());
        arena.remove(EntityId::from_raw(1));
        assert!(track(&arena, Vec2::ZERO, EntityId::from_raw(1)).is_none());
    }
}
