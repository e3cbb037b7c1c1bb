//! Attack execution.
//!
//! This module provides:
//! - Melee area hits (box for agents, circle for players)
//! - Instant line hits
//! - Projectile launch
//!
//! Every hit resolves damage through the [`DamageEngine`] and applies it via
//! the target's [`Damageable`] contract. Dead targets and targets outside the
//! hostile mask are skipped.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::trace;
use visage_common::{AuthorityError, ContentError, ContentResult, EntityId};

use crate::archetype::AttackRangeClass;
use crate::authority::AuthorityOracle;
use crate::clock::{Deadline, SimTime};
use crate::damage_calc::DamageEngine;
use crate::entity::{Arena, AttackerProfile, DamageOutcome, Damageable};
use crate::lifecycle::{LifecycleProvider, PrefabRef};
use crate::presentation::{PresentationEvent, PresentationSink, SoundCue};
use crate::projectile::{Projectile, ProjectileSystem};
use crate::spatial::{Shape, SpatialQuery};

// ============================================================================
// Tuning
// ============================================================================

/// How ranged agents deliver their attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RangedMode {
    /// Spawn a travelling projectile.
    #[default]
    Projectile,
    /// Instant line test.
    Hitscan,
}

/// Hitbox and projectile tuning for an agent's attack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackTuning {
    /// Half size of the melee box.
    pub melee_half_extents: Vec2,
    /// Distance from the body centre to the melee box centre.
    pub melee_offset: f32,
    /// Ranged delivery.
    pub ranged_mode: RangedMode,
    /// Projectile speed in units per second.
    pub projectile_speed: f32,
    /// Projectile radius.
    pub projectile_radius: f32,
    /// Projectile lifetime in seconds.
    pub projectile_lifetime: f32,
    /// Line test length.
    pub hitscan_range: f32,
}

impl Default for AttackTuning {
    fn default() -> Self {
        Self {
            melee_half_extents: Vec2::splat(0.6),
            melee_offset: 0.8,
            ranged_mode: RangedMode::Projectile,
            projectile_speed: 10.0,
            projectile_radius: 0.2,
            projectile_lifetime: 5.0,
            hitscan_range: 15.0,
        }
    }
}

impl AttackTuning {
    /// Rejects non-positive sizes, speeds and lifetimes.
    pub fn validate(&self) -> ContentResult<()> {
        let positive = [
            ("melee_half_extents", self.melee_half_extents.min_element()),
            ("projectile_speed", self.projectile_speed),
            ("projectile_radius", self.projectile_radius),
            ("projectile_lifetime", self.projectile_lifetime),
            ("hitscan_range", self.hitscan_range),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ContentError::InvalidValue {
                    field,
                    reason: format!("must be positive, got {value}"),
                });
            }
        }
        if !self.melee_offset.is_finite() {
            return Err(ContentError::InvalidValue {
                field: "melee_offset",
                reason: "must be finite".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Hit Reports
// ============================================================================

/// One landed hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitReport {
    /// Source of the attack.
    pub attacker: EntityId,
    /// Entity hit.
    pub target: EntityId,
    /// Resolved damage before defense.
    pub damage: f32,
    /// What the hit did.
    pub outcome: DamageOutcome,
}

// ============================================================================
// Executor
// ============================================================================

/// Performs hit tests and applies resolved damage.
pub struct AttackExecutor<'a> {
    engine: &'a DamageEngine,
    authority: &'a dyn AuthorityOracle,
    presentation: &'a dyn PresentationSink,
}

impl<'a> AttackExecutor<'a> {
    /// Creates an executor over shared collaborators.
    #[must_use]
    pub fn new(
        engine: &'a DamageEngine,
        authority: &'a dyn AuthorityOracle,
        presentation: &'a dyn PresentationSink,
    ) -> Self {
        Self {
            engine,
            authority,
            presentation,
        }
    }

    /// Damage engine in use.
    #[must_use]
    pub const fn engine(&self) -> &'a DamageEngine {
        self.engine
    }

    /// Presentation sink hits are reported to.
    #[must_use]
    pub fn presentation(&self) -> &'a dyn PresentationSink {
        self.presentation
    }

    /// Resolves and applies one hit.
    ///
    /// `direction` defaults to the vector from the attacker to the target.
    /// Returns `None` for missing, dead or self targets.
    pub fn resolve_hit(
        &self,
        arena: &mut Arena,
        source: &AttackerProfile,
        target: EntityId,
        direction: Option<Vec2>,
    ) -> Result<Option<HitReport>, AuthorityError> {
        if target == source.id {
            return Ok(None);
        }
        let Some(body) = arena.get(target) else {
            return Ok(None);
        };
        if body.is_dead() || !source.hostile_mask.contains(body.layer()) {
            return Ok(None);
        }

        let defender_bonus = body.bonus_stats();
        let damage = self.engine.calculate_damage(
            source.base_damage,
            source.archetype,
            body.archetype(),
            Some(&source.bonus),
            Some(&defender_bonus),
        );
        let direction = direction
            .unwrap_or_else(|| (body.position - source.position).normalize_or_zero());
        let direction = if direction == Vec2::ZERO {
            source.heading
        } else {
            direction
        };
        let position = body.position;

        let Some(outcome) = arena.apply_damage(target, damage, direction, self.authority)? else {
            return Ok(None);
        };
        trace!(attacker = %source.id, %target, damage, ?outcome, "hit");

        self.presentation.emit(PresentationEvent::DamageNumber {
            entity: target,
            position,
            amount: outcome.applied(),
        });
        self.presentation.emit(PresentationEvent::Sound {
            entity: target,
            cue: SoundCue::Hit,
        });

        Ok(Some(HitReport {
            attacker: source.id,
            target,
            damage,
            outcome,
        }))
    }

    /// Hits every hostile touching `shape`.
    pub fn melee_area(
        &self,
        arena: &mut Arena,
        source: &AttackerProfile,
        shape: &Shape,
    ) -> Result<Vec<HitReport>, AuthorityError> {
        self.presentation.emit(PresentationEvent::Sound {
            entity: source.id,
            cue: SoundCue::Swing,
        });
        let candidates = arena.query_shape_overlap(shape, source.hostile_mask);
        let mut hits = Vec::new();
        for target in candidates {
            if let Some(hit) = self.resolve_hit(arena, source, target, None)? {
                hits.push(hit);
            }
        }
        Ok(hits)
    }

    /// Agent melee: box centred `offset` ahead of the attacker.
    pub fn melee_box(
        &self,
        arena: &mut Arena,
        source: &AttackerProfile,
        tuning: &AttackTuning,
    ) -> Result<Vec<HitReport>, AuthorityError> {
        let shape = Shape::Aabb {
            center: source.position + source.heading * tuning.melee_offset,
            half_extents: tuning.melee_half_extents,
        };
        self.melee_area(arena, source, &shape)
    }

    /// Player melee: circle centred `offset` along the aim.
    pub fn melee_circle(
        &self,
        arena: &mut Arena,
        source: &AttackerProfile,
        aim: Vec2,
        offset: f32,
        radius: f32,
    ) -> Result<Vec<HitReport>, AuthorityError> {
        let shape = Shape::Circle {
            center: source.position + aim.normalize_or_zero() * offset,
            radius,
        };
        self.melee_area(arena, source, &shape)
    }

    /// Instant line test; damages the first live hostile along `aim`.
    pub fn hitscan(
        &self,
        arena: &mut Arena,
        source: &AttackerProfile,
        aim: Vec2,
        range: f32,
    ) -> Result<Option<HitReport>, AuthorityError> {
        self.presentation.emit(PresentationEvent::Sound {
            entity: source.id,
            cue: SoundCue::Fire,
        });
        let aim = aim.normalize_or_zero();
        let hit = arena
            .raycast(source.position, aim, range, source.hostile_mask)
            .filter(|hit| hit.entity != source.id);
        match hit {
            Some(hit) => self.resolve_hit(arena, source, hit.entity, Some(aim)),
            None => Ok(None),
        }
    }

    /// Launches a projectile along `aim`. The source is snapshotted.
    pub fn fire_projectile(
        &self,
        source: &AttackerProfile,
        aim: Vec2,
        tuning: &AttackTuning,
        now: SimTime,
        lifecycle: &mut dyn LifecycleProvider,
        projectiles: &mut ProjectileSystem,
    ) -> EntityId {
        self.presentation.emit(PresentationEvent::Sound {
            entity: source.id,
            cue: SoundCue::Fire,
        });
        let direction = if aim.normalize_or_zero() == Vec2::ZERO {
            source.heading
        } else {
            aim.normalize_or_zero()
        };
        let origin = source.position + direction * tuning.melee_offset;
        let rotation = direction.y.atan2(direction.x);
        let id = lifecycle.spawn_entity(&PrefabRef::Projectile, origin, rotation);
        projectiles.spawn(Projectile {
            id,
            source: *source,
            position: origin,
            direction,
            speed: tuning.projectile_speed,
            radius: tuning.projectile_radius,
            expires_at: Deadline::after(now, tuning.projectile_lifetime),
        });
        id
    }

    /// Runs an agent's attack for its archetype's range class.
    ///
    /// Melee hits land immediately. Ranged attacks either hit immediately
    /// (hitscan) or launch a projectile that resolves on a later tick.
    #[allow(clippy::too_many_arguments)]
    pub fn perform_agent_attack(
        &self,
        arena: &mut Arena,
        source: &AttackerProfile,
        aim: Vec2,
        tuning: &AttackTuning,
        now: SimTime,
        lifecycle: &mut dyn LifecycleProvider,
        projectiles: &mut ProjectileSystem,
    ) -> Result<Vec<HitReport>, AuthorityError> {
        match self.engine.attack_range_class(source.archetype) {
            AttackRangeClass::Melee => self.melee_box(arena, source, tuning),
            AttackRangeClass::Ranged => match tuning.ranged_mode {
                RangedMode::Hitscan => Ok(self
                    .hitscan(arena, source, aim, tuning.hitscan_range)?
                    .into_iter()
                    .collect()),
                RangedMode::Projectile => {
                    self.fire_projectile(source, aim, tuning, now, lifecycle, projectiles);
                    Ok(Vec::new())
                }
            },
        }
    }
}
