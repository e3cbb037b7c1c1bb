//! Combatants with arena-based storage.
//!
//! A [`Combatant`] is anything that can be hit: enemy agents and players.
//! Health, the dead flag and the active archetype live in
//! [`Authoritative`] cells so only the owning context can write them.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use visage_common::{AuthorityError, EntityId, Layer, LayerMask};

use crate::archetype::Archetype;
use crate::authority::{require_authority, Authoritative, AuthorityOracle};
use crate::bonus::{BonusProfile, BonusStats};

// ============================================================================
// Contracts
// ============================================================================

/// What a single damage application did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DamageOutcome {
    /// Target was already dead; nothing changed.
    Ignored,
    /// Target survived.
    Hurt {
        /// Damage actually removed from health.
        applied: f32,
        /// Health left.
        remaining: f32,
        /// Direction the hit came from, pointing away from the attacker.
        direction: Vec2,
    },
    /// Target died from this hit.
    Killed {
        /// Damage actually removed from health.
        applied: f32,
        /// Direction the hit came from.
        direction: Vec2,
    },
}

impl DamageOutcome {
    /// Damage removed from health.
    #[must_use]
    pub fn applied(&self) -> f32 {
        match self {
            Self::Ignored => 0.0,
            Self::Hurt { applied, .. } | Self::Killed { applied, .. } => *applied,
        }
    }

    /// Returns whether this hit killed the target.
    #[must_use]
    pub fn is_kill(&self) -> bool {
        matches!(self, Self::Killed { .. })
    }
}

/// Damage-receiving contract.
pub trait Damageable {
    /// Applies `amount` of resolved damage.
    ///
    /// The applied amount is `max(0, amount - defense)`, so a non-positive
    /// resolved value never heals. Dead targets ignore further hits.
    fn take_damage(
        &mut self,
        amount: f32,
        direction: Vec2,
        authority: &dyn AuthorityOracle,
    ) -> Result<DamageOutcome, AuthorityError>;

    /// Kills the entity. Returns `true` only on the first call.
    fn die(&mut self, authority: &dyn AuthorityOracle) -> Result<bool, AuthorityError>;

    /// Dead flag.
    fn is_dead(&self) -> bool;

    /// Current health.
    fn current_health(&self) -> f32;

    /// Maximum health.
    fn max_health(&self) -> f32;

    /// Active archetype.
    fn archetype(&self) -> Archetype;

    /// Active bonus accumulator.
    fn bonus_stats(&self) -> BonusStats;
}

/// Snapshot of everything an attack needs from its source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackerProfile {
    /// Attacking entity.
    pub id: EntityId,
    /// Active archetype.
    pub archetype: Archetype,
    /// Active bonus accumulator.
    pub bonus: BonusStats,
    /// Damage before modifiers.
    pub base_damage: f32,
    /// World position.
    pub position: Vec2,
    /// Unit facing.
    pub heading: Vec2,
    /// Layers this attacker may hit.
    pub hostile_mask: LayerMask,
}

/// Anything that can originate an attack.
pub trait Attacker {
    /// Captures the attacker's current combat state.
    fn attacker_profile(&self) -> AttackerProfile;
}

// ============================================================================
// Combatant
// ============================================================================

/// A body in the arena with health and combat stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    id: EntityId,
    layer: Layer,
    hostile_mask: LayerMask,
    health: Authoritative<f32>,
    max_health: f32,
    dead: Authoritative<bool>,
    archetype: Authoritative<Archetype>,
    bonus: BonusProfile,
    /// Flat reduction subtracted from every hit.
    pub defense: f32,
    /// Damage before modifiers.
    pub base_damage: f32,
    /// World position.
    pub position: Vec2,
    /// Unit facing.
    pub heading: Vec2,
    /// Velocity integrated each tick.
    pub velocity: Vec2,
    /// Body radius for overlap tests.
    pub radius: f32,
    /// Frozen bodies are not integrated.
    pub frozen: bool,
}

impl Combatant {
    /// Creates a live combatant at full health.
    #[must_use]
    pub fn new(id: EntityId, layer: Layer, archetype: Archetype, max_health: f32) -> Self {
        let max_health = max_health.max(0.0);
        Self {
            id,
            layer,
            hostile_mask: LayerMask::NONE,
            health: Authoritative::new(id, max_health),
            max_health,
            dead: Authoritative::new(id, false),
            archetype: Authoritative::new(id, archetype),
            bonus: BonusProfile::default(),
            defense: 0.0,
            base_damage: 10.0,
            position: Vec2::ZERO,
            heading: Vec2::X,
            velocity: Vec2::ZERO,
            radius: 0.5,
            frozen: false,
        }
    }

    /// Builder: layers this combatant attacks.
    #[must_use]
    pub fn with_hostile_mask(mut self, mask: LayerMask) -> Self {
        self.hostile_mask = mask;
        self
    }

    /// Builder: position.
    #[must_use]
    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    /// Builder: base damage.
    #[must_use]
    pub fn with_base_damage(mut self, damage: f32) -> Self {
        self.base_damage = damage;
        self
    }

    /// Builder: flat defense.
    #[must_use]
    pub fn with_defense(mut self, defense: f32) -> Self {
        self.defense = defense;
        self
    }

    /// Builder: body radius.
    #[must_use]
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    /// Builder: bonus profile.
    #[must_use]
    pub fn with_bonus_profile(mut self, bonus: BonusProfile) -> Self {
        self.bonus = bonus;
        self
    }

    /// Builder: multiplies max health and base damage, refilling health.
    #[must_use]
    pub fn with_scaling(mut self, factor: f32) -> Self {
        let factor = factor.max(0.0);
        self.max_health *= factor;
        self.base_damage *= factor;
        self.health.apply_replicated(self.max_health);
        self
    }

    /// Entity id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Collision layer.
    #[must_use]
    pub const fn layer(&self) -> Layer {
        self.layer
    }

    /// Layers this combatant attacks.
    #[must_use]
    pub const fn hostile_mask(&self) -> LayerMask {
        self.hostile_mask
    }

    /// Bonus profile.
    #[must_use]
    pub const fn bonus_profile(&self) -> &BonusProfile {
        &self.bonus
    }

    /// Adds a bonus contribution for `archetype`.
    pub fn grant_bonus(
        &mut self,
        archetype: Archetype,
        contribution: &BonusStats,
        authority: &dyn AuthorityOracle,
    ) -> Result<(), AuthorityError> {
        require_authority(authority, self.id, "grant_bonus")?;
        self.bonus.grant(archetype, contribution);
        Ok(())
    }

    /// Restores health, clamped to max. Dead combatants stay dead.
    pub fn heal(&mut self, amount: f32, authority: &dyn AuthorityOracle) -> Result<f32, AuthorityError> {
        let max = self.max_health;
        if self.is_dead() {
            require_authority(authority, self.id, "heal")?;
            return Ok(0.0);
        }
        self.health.update(authority, "heal", |health| {
            *health = (*health + amount.max(0.0)).min(max);
            *health
        })
    }

    /// Switches the active archetype.
    pub fn set_archetype(
        &mut self,
        archetype: Archetype,
        authority: &dyn AuthorityOracle,
    ) -> Result<(), AuthorityError> {
        self.archetype.set(authority, "set_archetype", archetype)
    }

    /// Applies replicated health and dead flag from the authoritative peer.
    pub fn apply_replicated_vitals(&mut self, health: f32, dead: bool) {
        self.health.apply_replicated(health.clamp(0.0, self.max_health));
        if dead {
            self.dead.apply_replicated(true);
        }
    }

    /// Euclidean distance to a point.
    #[must_use]
    pub fn distance_to(&self, point: Vec2) -> f32 {
        self.position.distance(point)
    }

    /// Unit vector toward a point, or zero when on top of it.
    #[must_use]
    pub fn direction_to(&self, point: Vec2) -> Vec2 {
        (point - self.position).normalize_or_zero()
    }
}

impl Damageable for Combatant {
    fn take_damage(
        &mut self,
        amount: f32,
        direction: Vec2,
        authority: &dyn AuthorityOracle,
    ) -> Result<DamageOutcome, AuthorityError> {
        require_authority(authority, self.id, "take_damage")?;
        if self.is_dead() {
            return Ok(DamageOutcome::Ignored);
        }

        let applied = (amount - self.defense).max(0.0);
        let remaining = (self.current_health() - applied).clamp(0.0, self.max_health);
        self.health.set(authority, "take_damage", remaining)?;

        if remaining <= 0.0 {
            self.die(authority)?;
            Ok(DamageOutcome::Killed { applied, direction })
        } else {
            Ok(DamageOutcome::Hurt {
                applied,
                remaining,
                direction,
            })
        }
    }

    fn die(&mut self, authority: &dyn AuthorityOracle) -> Result<bool, AuthorityError> {
        require_authority(authority, self.id, "die")?;
        if self.is_dead() {
            return Ok(false);
        }
        self.health.set(authority, "die", 0.0)?;
        self.dead.set(authority, "die", true)?;
        self.velocity = Vec2::ZERO;
        Ok(true)
    }

    fn is_dead(&self) -> bool {
        self.dead.value()
    }

    fn current_health(&self) -> f32 {
        self.health.value()
    }

    fn max_health(&self) -> f32 {
        self.max_health
    }

    fn archetype(&self) -> Archetype {
        self.archetype.value()
    }

    fn bonus_stats(&self) -> BonusStats {
        self.bonus.active(self.archetype())
    }
}

impl Attacker for Combatant {
    fn attacker_profile(&self) -> AttackerProfile {
        AttackerProfile {
            id: self.id,
            archetype: self.archetype(),
            bonus: self.bonus_stats(),
            base_damage: self.base_damage,
            position: self.position,
            heading: self.heading,
            hostile_mask: self.hostile_mask,
        }
    }
}

// ============================================================================
// Arena
// ============================================================================

/// Ordered storage for every combatant in a session.
///
/// Iteration is by ascending [`EntityId`], which keeps ticks deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Arena {
    bodies: BTreeMap<EntityId, Combatant>,
}

impl Arena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a combatant, replacing any with the same id.
    pub fn insert(&mut self, combatant: Combatant) {
        self.bodies.insert(combatant.id(), combatant);
    }

    /// Removes a combatant.
    pub fn remove(&mut self, id: EntityId) -> Option<Combatant> {
        self.bodies.remove(&id)
    }

    /// Gets a combatant.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Combatant> {
        self.bodies.get(&id)
    }

    /// Gets a combatant mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Combatant> {
        self.bodies.get_mut(&id)
    }

    /// Returns whether `id` is present.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.bodies.contains_key(&id)
    }

    /// Iterates in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.bodies.values()
    }

    /// Number of combatants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Returns whether the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Number of live combatants on `layer`.
    #[must_use]
    pub fn live_count(&self, layer: Layer) -> usize {
        self.bodies
            .values()
            .filter(|c| c.layer() == layer && !c.is_dead())
            .count()
    }

    /// Applies damage to a target. Returns `None` if the target is gone.
    pub fn apply_damage(
        &mut self,
        target: EntityId,
        amount: f32,
        direction: Vec2,
        authority: &dyn AuthorityOracle,
    ) -> Result<Option<DamageOutcome>, AuthorityError> {
        match self.bodies.get_mut(&target) {
            Some(body) => body.take_damage(amount, direction, authority).map(Some),
            None => Ok(None),
        }
    }

    /// Moves every unfrozen body by its velocity.
    pub fn integrate(&mut self, dt: f32) {
        for body in self.bodies.values_mut().filter(|b| !b.frozen) {
            body.position += body.velocity * dt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::LocalAuthority;
    use proptest::prelude::*;

    fn enemy(raw: u64) -> Combatant {
        Combatant::new(EntityId::from_raw(raw), Layer::Enemy, Archetype::Sad, 100.0)
    }

    #[test]
    fn test_take_damage_hurts_then_kills() {
        let mut body = enemy(1);
        let out = body.take_damage(30.0, Vec2::X, &LocalAuthority::Host).unwrap();
        assert!(matches!(out, DamageOutcome::Hurt { remaining, .. } if remaining == 70.0));

        let out = body.take_damage(500.0, Vec2::X, &LocalAuthority::Host).unwrap();
        assert!(out.is_kill());
        assert_eq!(body.current_health(), 0.0);
        assert!(body.is_dead());
    }

    #[test]
    fn test_defense_never_heals() {
        let mut body = enemy(1).with_defense(5.0);
        let out = body.take_damage(3.0, Vec2::X, &LocalAuthority::Host).unwrap();
        assert_eq!(out.applied(), 0.0);
        body.take_damage(-50.0, Vec2::X, &LocalAuthority::Host).unwrap();
        assert_eq!(body.current_health(), 100.0);

        body.take_damage(15.0, Vec2::X, &LocalAuthority::Host).unwrap();
        assert_eq!(body.current_health(), 90.0);
    }

    #[test]
    fn test_die_is_idempotent() {
        let mut body = enemy(1);
        assert!(body.die(&LocalAuthority::Host).unwrap());
        assert!(!body.die(&LocalAuthority::Host).unwrap());
        let out = body.take_damage(10.0, Vec2::X, &LocalAuthority::Host).unwrap();
        assert_eq!(out, DamageOutcome::Ignored);
        assert_eq!(body.current_health(), 0.0);
    }

    #[test]
    fn test_write_without_authority_is_rejected() {
        let mut body = enemy(7);
        let err = body
            .take_damage(10.0, Vec2::X, &LocalAuthority::Observer)
            .unwrap_err();
        assert_eq!(
            err,
            AuthorityError::NotAuthoritative {
                entity: EntityId::from_raw(7),
                operation: "take_damage"
            }
        );
        assert_eq!(body.current_health(), 100.0);
        assert!(body.die(&LocalAuthority::Observer).is_err());
        assert!(!body.is_dead());
    }

    #[test]
    fn test_heal_clamps_and_skips_dead() {
        let mut body = enemy(1);
        body.take_damage(40.0, Vec2::X, &LocalAuthority::Host).unwrap();
        assert_eq!(body.heal(25.0, &LocalAuthority::Host).unwrap(), 85.0);
        assert_eq!(body.heal(100.0, &LocalAuthority::Host).unwrap(), 100.0);

        body.die(&LocalAuthority::Host).unwrap();
        body.heal(50.0, &LocalAuthority::Host).unwrap();
        assert_eq!(body.current_health(), 0.0);
    }

    #[test]
    fn test_scaling() {
        let body = enemy(1).with_base_damage(10.0).with_scaling(1.3);
        assert!((body.max_health() - 130.0).abs() < 1e-4);
        assert!((body.current_health() - 130.0).abs() < 1e-4);
        assert!((body.base_damage - 13.0).abs() < 1e-4);
    }

    #[test]
    fn test_arena_apply_damage_missing_target() {
        let mut arena = Arena::new();
        arena.insert(enemy(1));
        let out = arena
            .apply_damage(EntityId::from_raw(2), 10.0, Vec2::X, &LocalAuthority::Host)
            .unwrap();
        assert!(out.is_none());
        assert_eq!(arena.live_count(Layer::Enemy), 1);
    }

    #[test]
    fn test_arena_integrate_skips_frozen() {
        let mut arena = Arena::new();
        let mut moving = enemy(1);
        moving.velocity = Vec2::new(2.0, 0.0);
        let mut frozen = enemy(2);
        frozen.velocity = Vec2::new(2.0, 0.0);
        frozen.frozen = true;
        arena.insert(moving);
        arena.insert(frozen);
        arena.integrate(0.5);
        assert_eq!(arena.get(EntityId::from_raw(1)).unwrap().position, Vec2::new(1.0, 0.0));
        assert_eq!(arena.get(EntityId::from_raw(2)).unwrap().position, Vec2::ZERO);
    }

    proptest! {
        #[test]
        fn prop_health_stays_in_bounds(hits in prop::collection::vec(-200.0f32..200.0, 0..40)) {
            let mut body = enemy(1).with_defense(2.0);
            for amount in hits {
                body.take_damage(amount, Vec2::Y, &LocalAuthority::Host).unwrap();
                prop_assert!(body.current_health() >= 0.0);
                prop_assert!(body.current_health() <= body.max_health());
            }
        }
    }
}
