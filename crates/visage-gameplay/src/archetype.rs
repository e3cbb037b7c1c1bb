//! Archetypes and their base stats.
//!
//! Every combatant wears one of four expressions. The expression decides the
//! attack range class and four signed stat modifiers:
//! - damage taken
//! - attack
//! - move speed
//! - attack speed

use serde::{Deserialize, Serialize};
use visage_common::{ContentError, ContentResult};

// ============================================================================
// Archetype
// ============================================================================

/// Closed set of combat archetypes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Archetype {
    /// Blank face, ranged, no modifiers.
    #[default]
    Neutral,
    /// Smiling, ranged, fast but fragile.
    Happy,
    /// Crying, melee, slow and tanky.
    Sad,
    /// Furious, melee, hits hard and takes hard hits.
    Angry,
}

impl Archetype {
    /// Number of archetypes.
    pub const COUNT: usize = 4;

    /// Get all archetypes in index order.
    #[must_use]
    pub const fn all() -> [Self; Self::COUNT] {
        [Self::Neutral, Self::Happy, Self::Sad, Self::Angry]
    }

    /// Dense index of this archetype (0..COUNT).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Neutral => 0,
            Self::Happy => 1,
            Self::Sad => 2,
            Self::Angry => 3,
        }
    }

    /// Resolve a raw archetype id. Out-of-range ids are content errors.
    pub fn from_index(index: u8) -> ContentResult<Self> {
        match index {
            0 => Ok(Self::Neutral),
            1 => Ok(Self::Happy),
            2 => Ok(Self::Sad),
            3 => Ok(Self::Angry),
            other => Err(ContentError::InvalidArchetype(other)),
        }
    }

    /// Get display name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Neutral => "Neutral",
            Self::Happy => "Happy",
            Self::Sad => "Sad",
            Self::Angry => "Angry",
        }
    }
}

/// Whether an archetype fights up close or at range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackRangeClass {
    /// Close-quarters area hit.
    Melee,
    /// Projectile or hitscan.
    Ranged,
}

// ============================================================================
// Base Stats
// ============================================================================

/// Immutable per-archetype modifiers. `0.2` means +20%.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeStats {
    /// Attack range class.
    pub attack_range: AttackRangeClass,
    /// Added to the damage multiplier when this archetype is hit.
    pub damage_taken_modifier: f32,
    /// Added to the damage multiplier when this archetype attacks.
    pub attack_modifier: f32,
    /// Added to the move speed multiplier.
    pub move_speed_modifier: f32,
    /// Added to the attack speed multiplier.
    pub attack_speed_modifier: f32,
}

impl ArchetypeStats {
    /// Creates a stats row.
    #[must_use]
    pub const fn new(
        attack_range: AttackRangeClass,
        damage_taken_modifier: f32,
        attack_modifier: f32,
        move_speed_modifier: f32,
        attack_speed_modifier: f32,
    ) -> Self {
        Self {
            attack_range,
            damage_taken_modifier,
            attack_modifier,
            move_speed_modifier,
            attack_speed_modifier,
        }
    }
}

/// Shipped base stats, indexed by [`Archetype::index`].
const BASE_STATS: [ArchetypeStats; Archetype::COUNT] = [
    // Neutral
    ArchetypeStats::new(AttackRangeClass::Ranged, 0.0, 0.0, 0.0, 0.0),
    // Happy
    ArchetypeStats::new(AttackRangeClass::Ranged, 0.2, -0.15, 0.3, 0.3),
    // Sad
    ArchetypeStats::new(AttackRangeClass::Melee, -0.4, -0.25, -0.15, -0.15),
    // Angry
    ArchetypeStats::new(AttackRangeClass::Melee, 0.5, 0.5, 0.15, 0.15),
];

/// Read-only lookup table of base stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatTable {
    rows: [ArchetypeStats; Archetype::COUNT],
}

impl Default for StatTable {
    fn default() -> Self {
        Self { rows: BASE_STATS }
    }
}

impl StatTable {
    /// Creates a table from authored rows in archetype index order.
    #[must_use]
    pub const fn from_rows(rows: [ArchetypeStats; Archetype::COUNT]) -> Self {
        Self { rows }
    }

    /// Base stats for an archetype.
    #[must_use]
    pub fn get(&self, archetype: Archetype) -> ArchetypeStats {
        self.rows[archetype.index()]
    }
}

/// Base stats from the shipped table.
#[must_use]
pub fn base_stats(archetype: Archetype) -> ArchetypeStats {
    BASE_STATS[archetype.index()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_archetype_index_roundtrip() {
        for archetype in Archetype::all() {
            let back = Archetype::from_index(archetype.index() as u8);
            assert_eq!(back, Ok(archetype));
        }
    }

    #[test]
    fn test_archetype_out_of_range() {
        assert_eq!(
            Archetype::from_index(4),
            Err(ContentError::InvalidArchetype(4))
        );
    }

    #[test]
    fn test_range_classes() {
        assert_eq!(base_stats(Archetype::Neutral).attack_range, AttackRangeClass::Ranged);
        assert_eq!(base_stats(Archetype::Happy).attack_range, AttackRangeClass::Ranged);
        assert_eq!(base_stats(Archetype::Sad).attack_range, AttackRangeClass::Melee);
        assert_eq!(base_stats(Archetype::Angry).attack_range, AttackRangeClass::Melee);
    }

    #[test]
    fn test_documented_rows() {
        let angry = base_stats(Archetype::Angry);
        assert_eq!(angry.attack_modifier, 0.5);
        assert_eq!(angry.damage_taken_modifier, 0.5);

        let sad = base_stats(Archetype::Sad);
        assert_eq!(sad.damage_taken_modifier, -0.4);
        assert_eq!(sad.attack_modifier, -0.25);
    }

    #[test]
    fn test_table_matches_free_function() {
        let table = StatTable::default();
        for archetype in Archetype::all() {
            assert_eq!(table.get(archetype), base_stats(archetype));
        }
    }

    proptest! {
        #[test]
        fn prop_base_stats_are_pure(index in 0u8..4, repeats in 1usize..16) {
            let archetype = Archetype::from_index(index).unwrap();
            let first = base_stats(archetype);
            for _ in 0..repeats {
                prop_assert_eq!(base_stats(archetype), first);
            }
        }
    }
}
