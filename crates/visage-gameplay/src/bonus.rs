//! Per-instance bonus accumulators.
//!
//! Bonuses come from item pickups and purchased buffs. They only ever grow
//! during play and are layered on top of the archetype base stats.

use serde::{Deserialize, Serialize};
use crate::archetype::Archetype;

/// Additive accumulator of the four stat modifier kinds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusStats {
    /// Extra damage multiplier when hit.
    pub damage_taken_modifier: f32,
    /// Extra damage multiplier when attacking.
    pub attack_modifier: f32,
    /// Extra move speed multiplier.
    pub move_speed_modifier: f32,
    /// Extra attack speed multiplier.
    pub attack_speed_modifier: f32,
}

impl BonusStats {
    /// All-zero accumulator.
    pub const ZERO: Self = Self {
        damage_taken_modifier: 0.0,
        attack_modifier: 0.0,
        move_speed_modifier: 0.0,
        attack_speed_modifier: 0.0,
    };

    /// Creates an all-zero accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self::ZERO
    }

    /// Builder: attack contribution.
    #[must_use]
    pub const fn with_attack(mut self, value: f32) -> Self {
        self.attack_modifier = value;
        self
    }

    /// Builder: damage taken contribution.
    #[must_use]
    pub const fn with_damage_taken(mut self, value: f32) -> Self {
        self.damage_taken_modifier = value;
        self
    }

    /// Builder: move speed contribution.
    #[must_use]
    pub const fn with_move_speed(mut self, value: f32) -> Self {
        self.move_speed_modifier = value;
        self
    }

    /// Builder: attack speed contribution.
    #[must_use]
    pub const fn with_attack_speed(mut self, value: f32) -> Self {
        self.attack_speed_modifier = value;
        self
    }

    /// Merges another accumulator field-wise.
    #[allow(clippy::should_implement_trait)]
    pub fn add(&mut self, other: &Self) {
        self.damage_taken_modifier += other.damage_taken_modifier;
        self.attack_modifier += other.attack_modifier;
        self.move_speed_modifier += other.move_speed_modifier;
        self.attack_speed_modifier += other.attack_speed_modifier;
    }

    /// Zeroes every field.
    pub fn reset(&mut self) {
        *self = Self::ZERO;
    }

    /// Adds to the attack modifier.
    pub fn add_attack(&mut self, value: f32) {
        self.attack_modifier += value;
    }

    /// Adds to the damage taken modifier.
    pub fn add_damage_taken(&mut self, value: f32) {
        self.damage_taken_modifier += value;
    }

    /// Adds to the move speed modifier.
    pub fn add_move_speed(&mut self, value: f32) {
        self.move_speed_modifier += value;
    }

    /// Adds to the attack speed modifier.
    pub fn add_attack_speed(&mut self, value: f32) {
        self.attack_speed_modifier += value;
    }

    /// Returns whether every field is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

/// Which accumulator(s) an entity carries.
///
/// Enemies share a single accumulator. Players keep one per archetype, and
/// only the one matching their active archetype is reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BonusProfile {
    /// One accumulator regardless of archetype.
    Shared(BonusStats),
    /// One accumulator per archetype, indexed by [`Archetype::index`].
    PerArchetype([BonusStats; Archetype::COUNT]),
}

impl Default for BonusProfile {
    fn default() -> Self {
        Self::Shared(BonusStats::ZERO)
    }
}

impl BonusProfile {
    /// Per-archetype profile with every slot zeroed.
    #[must_use]
    pub const fn per_archetype() -> Self {
        Self::PerArchetype([BonusStats::ZERO; Archetype::COUNT])
    }

    /// Accumulator in effect while `archetype` is active.
    #[must_use]
    pub fn active(&self, archetype: Archetype) -> BonusStats {
        match self {
            Self::Shared(stats) => *stats,
            Self::PerArchetype(slots) => slots[archetype.index()],
        }
    }

    /// Adds a contribution for `archetype`. Shared profiles ignore the archetype.
    pub fn grant(&mut self, archetype: Archetype, contribution: &BonusStats) {
        match self {
            Self::Shared(stats) => stats.add(contribution),
            Self::PerArchetype(slots) => slots[archetype.index()].add(contribution),
        }
    }

    /// Zeroes every accumulator.
    pub fn reset(&mut self) {
        match self {
            Self::Shared(stats) => stats.reset(),
            Self::PerArchetype(slots) => slots.iter_mut().for_each(BonusStats::reset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_add_is_fieldwise() {
        let mut a = BonusStats::new().with_attack(0.25).with_move_speed(0.1);
        let b = BonusStats::new().with_attack(0.05).with_damage_taken(-0.1);
        a.add(&b);
        assert!((a.attack_modifier - 0.3).abs() < 1e-6);
        assert!((a.damage_taken_modifier + 0.1).abs() < 1e-6);
        assert!((a.move_speed_modifier - 0.1).abs() < 1e-6);
        assert_eq!(a.attack_speed_modifier, 0.0);
    }

    #[test]
    fn test_reset() {
        let mut a = BonusStats::new().with_attack_speed(0.4);
        a.add_move_speed(0.2);
        a.reset();
        assert!(a.is_zero());
    }

    #[test]
    fn test_per_archetype_profile_isolates_slots() {
        let mut profile = BonusProfile::per_archetype();
        profile.grant(Archetype::Angry, &BonusStats::new().with_attack(0.1));
        assert_eq!(profile.active(Archetype::Angry).attack_modifier, 0.1);
        assert!(profile.active(Archetype::Sad).is_zero());
    }

    #[test]
    fn test_shared_profile_ignores_archetype() {
        let mut profile = BonusProfile::default();
        profile.grant(Archetype::Happy, &BonusStats::new().with_damage_taken(0.2));
        for archetype in Archetype::all() {
            assert_eq!(profile.active(archetype).damage_taken_modifier, 0.2);
        }
        profile.reset();
        assert!(profile.active(Archetype::Happy).is_zero());
    }

    fn contribution() -> impl Strategy<Value = BonusStats> {
        (-1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0).prop_map(|(a, b, c, d)| {
            BonusStats::new()
                .with_damage_taken(a)
                .with_attack(b)
                .with_move_speed(c)
                .with_attack_speed(d)
        })
    }

    proptest! {
        #[test]
        fn prop_accumulation_is_order_independent(
            items in prop::collection::vec(contribution(), 0..12)
        ) {
            let mut forward = BonusStats::new();
            for item in &items {
                forward.add(item);
            }
            let mut backward = BonusStats::new();
            for item in items.iter().rev() {
                backward.add(item);
            }
            prop_assert!((forward.attack_modifier - backward.attack_modifier).abs() < 1e-4);
            prop_assert!((forward.damage_taken_modifier - backward.damage_taken_modifier).abs() < 1e-4);
            prop_assert!((forward.move_speed_modifier - backward.move_speed_modifier).abs() < 1e-4);
            prop_assert!((forward.attack_speed_modifier - backward.attack_speed_modifier).abs() < 1e-4);
        }
    }
}
