//! Money drops and pickups.
//!
//! Dead agents drop a single money pickup near the corpse. The first live
//! player to touch it collects it. Uncollected pickups expire.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use tracing::debug;
use visage_common::{ContentError, ContentResult, EntityId, LayerMask};

use crate::authority::AuthorityOracle;
use crate::clock::{Deadline, SimTime};
use crate::lifecycle::{LifecycleProvider, PrefabRef};
use crate::sensing::{find_nearest, Sensed};
use crate::spatial::SpatialQuery;

/// Maximum distance between a corpse and its drop.
pub const SCATTER_RADIUS: f32 = 0.5;

/// Inclusive money range dropped on death.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LootTable {
    /// Smallest drop.
    pub min: u32,
    /// Largest drop.
    pub max: u32,
}

impl Default for LootTable {
    fn default() -> Self {
        Self { min: 5, max: 15 }
    }
}

impl LootTable {
    /// Rolls a drop amount.
    pub fn roll(&self, rng: &mut fastrand::Rng) -> u32 {
        rng.u32(self.min..=self.max.max(self.min))
    }

    /// Rejects `min > max`.
    pub fn validate(&self) -> ContentResult<()> {
        if self.min > self.max {
            return Err(ContentError::InvalidRange {
                field: "loot",
                min: self.min as f32,
                max: self.max as f32,
            });
        }
        Ok(())
    }
}

/// Pickup tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickupTuning {
    /// Seconds before an uncollected pickup is removed.
    pub lifetime: f32,
    /// Contact radius.
    pub radius: f32,
}

impl Default for PickupTuning {
    fn default() -> Self {
        Self {
            lifetime: 30.0,
            radius: 0.5,
        }
    }
}

/// A money pickup lying in the world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoneyPickup {
    /// Pickup entity.
    pub id: EntityId,
    /// World position.
    pub position: Vec2,
    /// Money granted.
    pub amount: u32,
    /// Removal time.
    pub expires_at: Deadline,
    /// Contact radius.
    pub radius: f32,
}

/// What happened to a pickup this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupEvent {
    /// A player took it.
    Collected {
        /// Pickup entity.
        pickup: EntityId,
        /// Collecting player.
        player: EntityId,
        /// Money granted.
        amount: u32,
    },
    /// Lifetime ran out.
    Expired(EntityId),
}

/// Point within [`SCATTER_RADIUS`] of `origin`.
pub fn scatter(origin: Vec2, rng: &mut fastrand::Rng) -> Vec2 {
    let angle = rng.f32() * TAU;
    let distance = rng.f32() * SCATTER_RADIUS;
    origin + Vec2::from_angle(angle) * distance
}

/// Owns every uncollected pickup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PickupField {
    tuning: PickupTuning,
    pickups: Vec<MoneyPickup>,
}

impl PickupField {
    /// Creates an empty field.
    #[must_use]
    pub fn new(tuning: PickupTuning) -> Self {
        Self {
            tuning,
            pickups: Vec::new(),
        }
    }

    /// Spawns a drop of `amount` near `corpse`.
    pub fn drop_money(
        &mut self,
        corpse: Vec2,
        amount: u32,
        now: SimTime,
        rng: &mut fastrand::Rng,
        lifecycle: &mut dyn LifecycleProvider,
    ) -> EntityId {
        let position = scatter(corpse, rng);
        let id = lifecycle.spawn_entity(&PrefabRef::Money, position, 0.0);
        debug!(pickup = %id, amount, "money dropped");
        self.pickups.push(MoneyPickup {
            id,
            position,
            amount,
            expires_at: Deadline::after(now, self.tuning.lifetime),
            radius: self.tuning.radius,
        });
        id
    }

    /// Pickups in drop order.
    pub fn iter(&self) -> impl Iterator<Item = &MoneyPickup> {
        self.pickups.iter()
    }

    /// Number of pickups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pickups.len()
    }

    /// Returns whether there are none.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pickups.is_empty()
    }

    /// Resolves contacts and expiry. Only the world authority collects.
    ///
    /// Each pickup goes to exactly one player: the nearest live one whose
    /// body touches the pickup.
    pub fn update(
        &mut self,
        now: SimTime,
        world: &dyn SpatialQuery,
        authority: &dyn AuthorityOracle,
        lifecycle: &mut dyn LifecycleProvider,
    ) -> Vec<PickupEvent> {
        if !authority.has_world_authority() {
            return Vec::new();
        }

        let mut events = Vec::new();
        self.pickups.retain(|pickup| {
            if pickup.expires_at.is_due(now) {
                lifecycle.despawn_entity(pickup.id);
                events.push(PickupEvent::Expired(pickup.id));
                return false;
            }
            match find_nearest(world, pickup.position, pickup.radius, LayerMask::PLAYER) {
                Some(Sensed { entity: player, .. }) => {
                    lifecycle.despawn_entity(pickup.id);
                    events.push(PickupEvent::Collected {
                        pickup: pickup.id,
                        player,
                        amount: pickup.amount,
                    });
                    false
                }
                None => true,
            }
        });
        events
    }
}
