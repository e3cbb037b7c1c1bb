//! Damage resolution.
//!
//! This module provides:
//! - Additive damage composition from base stats, matchup and bonuses
//! - Attack range class lookup
//! - Move speed and attack speed multipliers
//!
//! The engine returns raw values. A total modifier at or below zero is not
//! corrected here; [`crate::entity::Damageable::take_damage`] clamps the
//! applied amount so it can never heal.

use serde::{Deserialize, Serialize};

use crate::archetype::{Archetype, ArchetypeStats, AttackRangeClass, StatTable};
use crate::bonus::BonusStats;
use crate::matchup::{MatchupModifier, MatchupTable};

/// Per-term breakdown of one damage calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageBreakdown {
    /// Damage before modifiers.
    pub base_damage: f32,
    /// Attacker archetype attack modifier.
    pub attacker_attack: f32,
    /// Defender archetype damage taken modifier.
    pub defender_taken: f32,
    /// Matchup cell.
    pub matchup: MatchupModifier,
    /// Attacker bonus attack modifier (0 if absent).
    pub attacker_bonus: f32,
    /// Defender bonus damage taken modifier (0 if absent).
    pub defender_bonus: f32,
}

impl DamageBreakdown {
    /// Sum of every term plus one.
    #[must_use]
    pub fn total_modifier(&self) -> f32 {
        1.0 + self.attacker_attack
            + self.defender_taken
            + self.matchup.damage_dealt_modifier
            + self.matchup.damage_taken_modifier
            + self.attacker_bonus
            + self.defender_bonus
    }

    /// Final, unclamped damage.
    #[must_use]
    pub fn result(&self) -> f32 {
        self.base_damage * self.total_modifier()
    }
}

/// Read-only damage engine. Shared by every agent and player for a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageEngine {
    stats: StatTable,
    matchups: MatchupTable,
}

impl DamageEngine {
    /// Creates an engine over explicit tables.
    #[must_use]
    pub const fn new(stats: StatTable, matchups: MatchupTable) -> Self {
        Self { stats, matchups }
    }

    /// Base stats for an archetype.
    #[must_use]
    pub fn base_stats(&self, archetype: Archetype) -> ArchetypeStats {
        self.stats.get(archetype)
    }

    /// Matchup cell for an ordered pair.
    #[must_use]
    pub fn matchup(&self, attacker: Archetype, defender: Archetype) -> MatchupModifier {
        self.matchups.get(attacker, defender)
    }

    /// Computes every term of a hit without summing.
    #[must_use]
    pub fn breakdown(
        &self,
        base_damage: f32,
        attacker: Archetype,
        defender: Archetype,
        attacker_bonus: Option<&BonusStats>,
        defender_bonus: Option<&BonusStats>,
    ) -> DamageBreakdown {
        DamageBreakdown {
            base_damage,
            attacker_attack: self.stats.get(attacker).attack_modifier,
            defender_taken: self.stats.get(defender).damage_taken_modifier,
            matchup: self.matchups.get(attacker, defender),
            attacker_bonus: attacker_bonus.map_or(0.0, |b| b.attack_modifier),
            defender_bonus: defender_bonus.map_or(0.0, |b| b.damage_taken_modifier),
        }
    }

    /// `base_damage * (1 + every additive term)`. May be zero or negative.
    #[must_use]
    pub fn calculate_damage(
        &self,
        base_damage: f32,
        attacker: Archetype,
        defender: Archetype,
        attacker_bonus: Option<&BonusStats>,
        defender_bonus: Option<&BonusStats>,
    ) -> f32 {
        self.breakdown(base_damage, attacker, defender, attacker_bonus, defender_bonus)
            .result()
    }

    /// Melee or ranged.
    #[must_use]
    pub fn attack_range_class(&self, archetype: Archetype) -> AttackRangeClass {
        self.stats.get(archetype).attack_range
    }

    /// `1 + base + bonus`. Not clamped.
    #[must_use]
    pub fn move_speed_multiplier(&self, archetype: Archetype, bonus: &BonusStats) -> f32 {
        1.0 + self.stats.get(archetype).move_speed_modifier + bonus.move_speed_modifier
    }

    /// `1 + base + bonus`. Not clamped.
    #[must_use]
    pub fn attack_speed_multiplier(&self, archetype: Archetype, bonus: &BonusStats) -> f32 {
        1.0 + self.stats.get(archetype).attack_speed_modifier + bonus.attack_speed_modifier
    }

    /// Cooldown between attacks scaled by attack speed.
    ///
    /// A multiplier at or below zero disables attacking (infinite cooldown).
    #[must_use]
    pub fn scaled_cooldown(&self, base_cooldown: f32, archetype: Archetype, bonus: &BonusStats) -> f32 {
        let multiplier = self.attack_speed_multiplier(archetype, bonus);
        if multiplier <= 0.0 {
            f32::INFINITY
        } else {
            base_cooldown / multiplier
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_angry_vs_sad() {
        let engine = DamageEngine::default();
        let dmg = engine.calculate_damage(100.0, Archetype::Angry, Archetype::Sad, None, None);
        assert!(approx(dmg, 120.0), "got {dmg}");
    }

    #[test]
    fn test_neutral_vs_neutral() {
        let engine = DamageEngine::default();
        let dmg = engine.calculate_damage(100.0, Archetype::Neutral, Archetype::Neutral, None, None);
        assert_eq!(dmg, 100.0);
    }

    #[test]
    fn test_attacker_bonus() {
        let engine = DamageEngine::default();
        let bonus = BonusStats::new().with_attack(0.25);
        let dmg = engine.calculate_damage(
            100.0,
            Archetype::Angry,
            Archetype::Sad,
            Some(&bonus),
            None,
        );
        assert!(approx(dmg, 145.0), "got {dmg}");
    }

    #[test]
    fn test_defender_bonus() {
        let engine = DamageEngine::default();
        let bonus = BonusStats::new().with_damage_taken(-0.5);
        let dmg = engine.calculate_damage(
            10.0,
            Archetype::Neutral,
            Archetype::Neutral,
            None,
            Some(&bonus),
        );
        assert!(approx(dmg, 5.0));
    }

    #[test]
    fn test_negative_total_is_not_clamped() {
        let engine = DamageEngine::default();
        let weak = BonusStats::new().with_attack(-2.0);
        let dmg = engine.calculate_damage(
            10.0,
            Archetype::Sad,
            Archetype::Sad,
            Some(&weak),
            None,
        );
        assert!(dmg < 0.0);
    }

    #[test]
    fn test_breakdown_matches_result() {
        let engine = DamageEngine::default();
        let b = engine.breakdown(50.0, Archetype::Happy, Archetype::Angry, None, None);
        // 1 - 0.15 + 0.5 + 0.3 - 0.2
        assert!(approx(b.total_modifier(), 1.45));
        assert!(approx(b.result(), 72.5));
    }

    #[test]
    fn test_multipliers() {
        let engine = DamageEngine::default();
        let bonus = BonusStats::new().with_move_speed(0.1).with_attack_speed(0.2);
        assert!(approx(engine.move_speed_multiplier(Archetype::Happy, &bonus), 1.4));
        assert!(approx(engine.attack_speed_multiplier(Archetype::Sad, &bonus), 1.05));
        assert_eq!(engine.attack_range_class(Archetype::Angry), AttackRangeClass::Melee);
    }

    #[test]
    fn test_scaled_cooldown() {
        let engine = DamageEngine::default();
        let none = BonusStats::new();
        assert!(approx(engine.scaled_cooldown(0.5, Archetype::Neutral, &none), 0.5));

        let crippled = BonusStats::new().with_attack_speed(-1.0);
        assert!(engine
            .scaled_cooldown(0.5, Archetype::Neutral, &crippled)
            .is_infinite());
    }
}
