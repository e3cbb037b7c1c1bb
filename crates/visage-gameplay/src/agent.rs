//! Enemy agent state machine.
//!
//! Each agent is in exactly one [`AgentState`]. A transition runs the old
//! state's exit, assigns the new state, then runs its entry. Timed actions
//! (re-seek, attack action, stagger, despawn delay) are [`Deadline`]s or
//! elapsed counters stored in the state payload, so leaving a state drops its
//! pending timers with it.
//!
//! Re-decide policy, shared by Idle, Roam, Attack and Stagger:
//! 1. hostile within `attack_range` -> Attack
//! 2. hostile within `detection_range` -> Chase
//! 3. otherwise Roam (Idle stays Idle)

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use tracing::{debug, trace};
use visage_common::{AuthorityError, ContentError, ContentResult, EntityId, LayerMask};

use crate::archetype::Archetype;
use crate::attack::AttackTuning;
use crate::authority::{require_authority, AuthorityOracle};
use crate::clock::{Deadline, SimTime};
use crate::curve::DecayCurve;
use crate::damage_calc::DamageEngine;
use crate::entity::DamageOutcome;
use crate::presentation::{Posture, PresentationEvent, PresentationSink, SoundCue};
use crate::sensing::{find_nearest, track};
use crate::spatial::SpatialQuery;

// ============================================================================
// Configuration
// ============================================================================

/// Closed `[min, max]` interval in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Lower bound.
    pub min: f32,
    /// Upper bound.
    pub max: f32,
}

impl TimeRange {
    /// Creates a range.
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Uniform draw in `[min, max]`.
    pub fn roll(&self, rng: &mut fastrand::Rng) -> f32 {
        self.min + rng.f32() * (self.max - self.min)
    }

    fn validate(&self, field: &'static str) -> ContentResult<()> {
        if self.min.is_finite() && self.max.is_finite() && self.min >= 0.0 && self.min <= self.max {
            Ok(())
        } else {
            Err(ContentError::InvalidRange {
                field,
                min: self.min,
                max: self.max,
            })
        }
    }
}

/// State an agent starts in when spawned without a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InitialState {
    /// Wander immediately.
    #[default]
    Roam,
    /// Stand still until the first re-seek.
    Idle,
}

/// Agent tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Radius for noticing hostiles.
    pub detection_range: f32,
    /// Radius for starting an attack.
    pub attack_range: f32,
    /// Length of one attack action in seconds.
    pub attack_duration: f32,
    /// Cooldown rolled on every attack.
    pub attack_cooldown: TimeRange,
    /// Re-seek interval rolled by Idle and Roam.
    pub seek_interval: TimeRange,
    /// Stagger length in seconds.
    pub stagger_duration: f32,
    /// Push speed applied on a non-lethal hit.
    pub knockback: f32,
    /// Delay between death and despawn.
    pub despawn_delay: f32,
    /// Knockback falloff over the stagger.
    pub stagger_curve: DecayCurve,
    /// Starting state.
    pub initial_state: InitialState,
    /// Movement speed while roaming and chasing.
    pub move_speed: f32,
    /// Layers this agent hunts.
    pub hostile_mask: LayerMask,
    /// Hitbox and projectile tuning.
    pub attack: AttackTuning,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            detection_range: 8.0,
            attack_range: 1.5,
            attack_duration: 0.7,
            attack_cooldown: TimeRange::new(1.2, 5.0),
            seek_interval: TimeRange::new(0.5, 3.0),
            stagger_duration: 0.5,
            knockback: 1.0,
            despawn_delay: 2.0,
            stagger_curve: DecayCurve::Linear,
            initial_state: InitialState::Roam,
            move_speed: 2.0,
            hostile_mask: LayerMask::PLAYER,
            attack: AttackTuning::default(),
        }
    }
}

impl AgentConfig {
    /// Checks ranges, durations and curves. Run once at load.
    pub fn validate(&self) -> ContentResult<()> {
        let positive = [
            ("detection_range", self.detection_range),
            ("attack_range", self.attack_range),
            ("stagger_duration", self.stagger_duration),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ContentError::InvalidValue {
                    field,
                    reason: format!("must be positive, got {value}"),
                });
            }
        }
        let non_negative = [
            ("attack_duration", self.attack_duration),
            ("knockback", self.knockback),
            ("despawn_delay", self.despawn_delay),
            ("move_speed", self.move_speed),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ContentError::InvalidValue {
                    field,
                    reason: format!("must be non-negative, got {value}"),
                });
            }
        }
        if self.hostile_mask.is_empty() {
            return Err(ContentError::InvalidValue {
                field: "hostile_mask",
                reason: "agent would never find a target".to_string(),
            });
        }
        self.attack_cooldown.validate("attack_cooldown")?;
        self.seek_interval.validate("seek_interval")?;
        self.stagger_curve.validate()?;
        self.attack.validate()
    }
}

// ============================================================================
// States
// ============================================================================

/// Per-agent behaviour state with its private scratch data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AgentState {
    /// Standing still.
    Idle {
        /// Next re-decide.
        next_seek: Deadline,
    },
    /// Walking a random heading.
    Roam {
        /// Unit walking direction.
        heading: Vec2,
        /// Next re-decide.
        next_seek: Deadline,
    },
    /// Closing on a target.
    Chase {
        /// Tracked target.
        target: EntityId,
    },
    /// Performing one attack action.
    Attack {
        /// Target at attack start.
        target: EntityId,
        /// Action end. `None` once the action has completed.
        action: Option<Deadline>,
    },
    /// Knocked back.
    Stagger {
        /// Seconds spent staggered.
        elapsed: f32,
        /// Initial push velocity.
        push: Vec2,
    },
    /// Dead, waiting for removal.
    Dead {
        /// Seconds since death.
        elapsed: f32,
        /// Removal time. Only set on the authoritative context.
        despawn_at: Option<Deadline>,
        /// Whether removal was already requested.
        despawn_requested: bool,
    },
}

/// Payload-free state discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentStateKind {
    /// See [`AgentState::Idle`].
    Idle,
    /// See [`AgentState::Roam`].
    Roam,
    /// See [`AgentState::Chase`].
    Chase,
    /// See [`AgentState::Attack`].
    Attack,
    /// See [`AgentState::Stagger`].
    Stagger,
    /// See [`AgentState::Dead`].
    Dead,
}

impl AgentStateKind {
    /// Display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Roam => "Roam",
            Self::Chase => "Chase",
            Self::Attack => "Attack",
            Self::Stagger => "Stagger",
            Self::Dead => "Dead",
        }
    }
}

impl AgentState {
    /// Discriminant.
    #[must_use]
    pub const fn kind(&self) -> AgentStateKind {
        match self {
            Self::Idle { .. } => AgentStateKind::Idle,
            Self::Roam { .. } => AgentStateKind::Roam,
            Self::Chase { .. } => AgentStateKind::Chase,
            Self::Attack { .. } => AgentStateKind::Attack,
            Self::Stagger { .. } => AgentStateKind::Stagger,
            Self::Dead { .. } => AgentStateKind::Dead,
        }
    }

    /// Returns whether this is the Dead state.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        matches!(self, Self::Dead { .. })
    }
}

/// Requested next state. Entry fills in the payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StateRequest {
    /// Enter Idle.
    Idle,
    /// Enter Roam.
    Roam,
    /// Chase a target.
    Chase(EntityId),
    /// Attack a target.
    Attack(EntityId),
    /// Stagger with a push velocity.
    Stagger(Vec2),
    /// Die.
    Dead,
}

impl StateRequest {
    /// Payload as assigned before entry runs.
    fn initial(self, now: SimTime) -> AgentState {
        match self {
            Self::Idle => AgentState::Idle {
                next_seek: Deadline::at(now),
            },
            Self::Roam => AgentState::Roam {
                heading: Vec2::ZERO,
                next_seek: Deadline::at(now),
            },
            Self::Chase(target) => AgentState::Chase { target },
            Self::Attack(target) => AgentState::Attack {
                target,
                action: None,
            },
            Self::Stagger(push) => AgentState::Stagger {
                elapsed: 0.0,
                push,
            },
            Self::Dead => AgentState::Dead {
                elapsed: 0.0,
                despawn_at: None,
                despawn_requested: false,
            },
        }
    }
}

// ============================================================================
// Context and Events
// ============================================================================

/// Read-only collaborators for one agent update.
pub struct AgentContext<'a> {
    /// Time at the start of this tick.
    pub now: SimTime,
    /// Tick length.
    pub dt: f32,
    /// World queries.
    pub world: &'a dyn SpatialQuery,
    /// Damage engine.
    pub engine: &'a DamageEngine,
    /// Authority oracle.
    pub authority: &'a dyn AuthorityOracle,
    /// Cosmetic sink.
    pub presentation: &'a dyn PresentationSink,
}

/// Side effects an agent asks the simulation to carry out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AgentEvent {
    /// Run the attack hit test now.
    Attack {
        /// Attacking agent.
        agent: EntityId,
        /// Target at attack start.
        target: EntityId,
        /// Unit aim direction.
        aim: Vec2,
    },
    /// Spawn loot at a corpse.
    DropLoot {
        /// Dead agent.
        agent: EntityId,
        /// Corpse position.
        position: Vec2,
    },
    /// Remove the agent.
    RequestDespawn {
        /// Agent to remove.
        agent: EntityId,
    },
}

// ============================================================================
// Agent
// ============================================================================

/// One enemy's behaviour controller.
#[derive(Debug, Clone)]
pub struct Agent {
    id: EntityId,
    archetype: Archetype,
    config: AgentConfig,
    state: AgentState,
    started: bool,
    rng: fastrand::Rng,
    heading: Vec2,
    velocity: Vec2,
    frozen: bool,
    last_attack_at: Option<SimTime>,
    next_cooldown: f32,
}

impl Agent {
    /// Creates an agent. Its RNG is seeded from `session_seed` and `id`.
    #[must_use]
    pub fn new(id: EntityId, archetype: Archetype, config: AgentConfig, session_seed: u64) -> Self {
        Self {
            id,
            archetype,
            config,
            state: AgentState::Idle {
                next_seek: Deadline::at(0.0),
            },
            started: false,
            rng: fastrand::Rng::with_seed(id.mix_seed(session_seed)),
            heading: Vec2::X,
            velocity: Vec2::ZERO,
            frozen: false,
            last_attack_at: None,
            next_cooldown: 0.0,
        }
    }

    /// Agent entity id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Archetype the agent fights as.
    #[must_use]
    pub const fn archetype(&self) -> Archetype {
        self.archetype
    }

    /// Tuning.
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &AgentState {
        &self.state
    }

    /// Current state discriminant.
    #[must_use]
    pub const fn kind(&self) -> AgentStateKind {
        self.state.kind()
    }

    /// Desired velocity for this tick.
    #[must_use]
    pub const fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Unit facing.
    #[must_use]
    pub const fn heading(&self) -> Vec2 {
        self.heading
    }

    /// Whether the body should stop integrating.
    #[must_use]
    pub const fn frozen(&self) -> bool {
        self.frozen
    }

    /// Start time of the most recent attack, updated again when it completes.
    #[must_use]
    pub const fn last_attack_at(&self) -> Option<SimTime> {
        self.last_attack_at
    }

    /// Cooldown rolled on the most recent attack.
    #[must_use]
    pub const fn next_cooldown(&self) -> f32 {
        self.next_cooldown
    }

    /// Target currently tracked, if any.
    #[must_use]
    pub const fn tracked_target(&self) -> Option<EntityId> {
        match self.state {
            AgentState::Chase { target } | AgentState::Attack { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Returns whether Chase may start an attack at `now`.
    #[must_use]
    pub fn cooldown_ready(&self, now: SimTime) -> bool {
        self.last_attack_at
            .map_or(true, |at| now >= at + f64::from(self.next_cooldown))
    }

    /// Runs one tick.
    ///
    /// Without authority the agent only mirrors a replicated death.
    pub fn update(&mut self, ctx: &AgentContext<'_>) -> Vec<AgentEvent> {
        let mut events = Vec::new();

        if !ctx.authority.has_authority(self.id) {
            if ctx.world.is_dead(self.id) && !self.state.is_dead() {
                self.enter_replicated_death(ctx);
            }
            return events;
        }

        let Some(position) = ctx.world.position(self.id) else {
            return events;
        };

        if !self.started {
            self.started = true;
            let request = match self.config.initial_state {
                InitialState::Roam => StateRequest::Roam,
                InitialState::Idle => StateRequest::Idle,
            };
            self.state = request.initial(ctx.now);
            self.enter(position, ctx, &mut events);
        }

        if ctx.world.is_dead(self.id) && !self.state.is_dead() {
            self.switch(StateRequest::Dead, position, ctx, &mut events);
            return events;
        }

        match self.state {
            AgentState::Idle { next_seek } => {
                self.velocity = Vec2::ZERO;
                if next_seek.is_due(ctx.now) {
                    self.re_decide(position, true, ctx, &mut events);
                }
            }
            AgentState::Roam { heading, next_seek } => {
                self.velocity = heading * self.config.move_speed;
                if next_seek.is_due(ctx.now) {
                    self.re_decide(position, false, ctx, &mut events);
                }
            }
            AgentState::Chase { target } => self.update_chase(target, position, ctx, &mut events),
            AgentState::Attack { target, action } => {
                self.velocity = Vec2::ZERO;
                match action {
                    Some(end) if end.is_due(ctx.now) => {
                        self.last_attack_at = Some(ctx.now);
                        self.state = AgentState::Attack {
                            target,
                            action: None,
                        };
                        self.re_decide(position, false, ctx, &mut events);
                    }
                    Some(_) if track(ctx.world, position, target).is_none() => {
                        trace!(agent = %self.id, %target, "attack target lost");
                        self.re_decide(position, false, ctx, &mut events);
                    }
                    Some(_) => {}
                    None => self.re_decide(position, false, ctx, &mut events),
                }
            }
            AgentState::Stagger { elapsed, push } => {
                let elapsed = elapsed + ctx.dt;
                let t = elapsed / self.config.stagger_duration;
                self.velocity = push * self.config.stagger_curve.evaluate(t);
                self.state = AgentState::Stagger { elapsed, push };
                if elapsed >= self.config.stagger_duration {
                    self.re_decide(position, false, ctx, &mut events);
                }
            }
            AgentState::Dead {
                elapsed,
                despawn_at,
                despawn_requested,
            } => {
                let mut requested = despawn_requested;
                if let Some(deadline) = despawn_at {
                    if !requested && deadline.is_due(ctx.now) {
                        requested = true;
                        debug!(agent = %self.id, "despawn requested");
                        events.push(AgentEvent::RequestDespawn { agent: self.id });
                    }
                }
                self.state = AgentState::Dead {
                    elapsed: elapsed + ctx.dt,
                    despawn_at,
                    despawn_requested: requested,
                };
            }
        }

        events
    }

    fn update_chase(
        &mut self,
        target: EntityId,
        position: Vec2,
        ctx: &AgentContext<'_>,
        events: &mut Vec<AgentEvent>,
    ) {
        let Some(sensed) = track(ctx.world, position, target) else {
            trace!(agent = %self.id, %target, "chase target lost");
            self.re_decide(position, false, ctx, events);
            return;
        };

        let direction = (sensed.position - position).normalize_or_zero();
        self.face(direction, ctx);

        if sensed.distance <= self.config.attack_range && self.cooldown_ready(ctx.now) {
            self.switch(StateRequest::Attack(target), position, ctx, events);
        } else if sensed.distance > self.config.detection_range {
            self.switch(StateRequest::Roam, position, ctx, events);
        } else {
            self.velocity = direction * self.config.move_speed;
        }
    }

    /// Shared re-decide policy. `stay_idle` keeps Idle agents idle when
    /// nothing is sensed.
    fn re_decide(
        &mut self,
        position: Vec2,
        stay_idle: bool,
        ctx: &AgentContext<'_>,
        events: &mut Vec<AgentEvent>,
    ) {
        let mask = self.config.hostile_mask;
        let request = if let Some(s) = find_nearest(ctx.world, position, self.config.attack_range, mask) {
            StateRequest::Attack(s.entity)
        } else if let Some(s) = find_nearest(ctx.world, position, self.config.detection_range, mask) {
            StateRequest::Chase(s.entity)
        } else if stay_idle {
            StateRequest::Idle
        } else {
            StateRequest::Roam
        };
        self.switch(request, position, ctx, events);
    }

    /// Requests a transition. Requires authority over the agent.
    ///
    /// Returns `Ok(false)` when the agent is dead; a dead agent never leaves
    /// Dead and never re-enters it.
    pub fn transition(
        &mut self,
        request: StateRequest,
        ctx: &AgentContext<'_>,
    ) -> Result<(bool, Vec<AgentEvent>), AuthorityError> {
        require_authority(ctx.authority, self.id, "transition")?;
        let mut events = Vec::new();
        let position = ctx.world.position(self.id).unwrap_or(Vec2::ZERO);
        self.started = true;
        let applied = self.switch(request, position, ctx, &mut events);
        Ok((applied, events))
    }

    /// Routes a damage outcome to a hurt or death reaction.
    pub fn on_hurt(
        &mut self,
        outcome: &DamageOutcome,
        ctx: &AgentContext<'_>,
    ) -> Result<Vec<AgentEvent>, AuthorityError> {
        match *outcome {
            DamageOutcome::Ignored => Ok(Vec::new()),
            DamageOutcome::Hurt { direction, .. } => {
                ctx.presentation.emit(PresentationEvent::Sound {
                    entity: self.id,
                    cue: SoundCue::Hurt,
                });
                let push = direction.normalize_or_zero() * self.config.knockback;
                self.transition(StateRequest::Stagger(push), ctx)
                    .map(|(_, events)| events)
            }
            DamageOutcome::Killed { .. } => self.on_death(ctx),
        }
    }

    /// Enters Dead.
    pub fn on_death(&mut self, ctx: &AgentContext<'_>) -> Result<Vec<AgentEvent>, AuthorityError> {
        self.transition(StateRequest::Dead, ctx).map(|(_, events)| events)
    }

    fn switch(
        &mut self,
        request: StateRequest,
        position: Vec2,
        ctx: &AgentContext<'_>,
        events: &mut Vec<AgentEvent>,
    ) -> bool {
        if self.state.is_dead() {
            trace!(agent = %self.id, ?request, "transition refused: agent is dead");
            return false;
        }
        let from = self.state.kind();
        self.exit(ctx);
        self.state = request.initial(ctx.now);
        trace!(agent = %self.id, from = from.name(), to = self.state.kind().name(), "state transition");
        self.enter(position, ctx, events);
        true
    }

    fn exit(&mut self, ctx: &AgentContext<'_>) {
        match self.state {
            AgentState::Attack {
                action: Some(end), ..
            } => {
                trace!(agent = %self.id, remaining = end.remaining(ctx.now), "attack action cancelled");
                self.velocity = Vec2::ZERO;
            }
            AgentState::Roam { .. } | AgentState::Chase { .. } | AgentState::Stagger { .. } => {
                self.velocity = Vec2::ZERO;
            }
            AgentState::Idle { .. } | AgentState::Attack { .. } | AgentState::Dead { .. } => {}
        }
    }

    fn enter(&mut self, position: Vec2, ctx: &AgentContext<'_>, events: &mut Vec<AgentEvent>) {
        let now = ctx.now;
        match self.state {
            AgentState::Idle { .. } => {
                self.velocity = Vec2::ZERO;
                let wait = self.config.seek_interval.roll(&mut self.rng);
                self.state = AgentState::Idle {
                    next_seek: Deadline::after(now, wait),
                };
                self.posture(Posture::Idle, ctx);
            }
            AgentState::Roam { .. } => {
                let heading = Vec2::from_angle(self.rng.f32() * TAU);
                let wait = self.config.seek_interval.roll(&mut self.rng);
                self.state = AgentState::Roam {
                    heading,
                    next_seek: Deadline::after(now, wait),
                };
                self.velocity = heading * self.config.move_speed;
                self.face(heading, ctx);
                self.posture(Posture::Move, ctx);
            }
            AgentState::Chase { .. } => {
                self.posture(Posture::Move, ctx);
            }
            AgentState::Attack { target, .. } => {
                self.velocity = Vec2::ZERO;
                self.last_attack_at = Some(now);
                self.next_cooldown = self.config.attack_cooldown.roll(&mut self.rng);
                self.state = AgentState::Attack {
                    target,
                    action: Some(Deadline::after(now, self.config.attack_duration)),
                };
                if let Some(sensed) = track(ctx.world, position, target) {
                    let aim = (sensed.position - position).normalize_or_zero();
                    self.face(aim, ctx);
                }
                self.posture(Posture::Attack, ctx);
                events.push(AgentEvent::Attack {
                    agent: self.id,
                    target,
                    aim: self.heading,
                });
            }
            AgentState::Stagger { push, .. } => {
                self.velocity = push * self.config.stagger_curve.evaluate(0.0);
                self.posture(Posture::Hurt, ctx);
            }
            AgentState::Dead { .. } => {
                self.velocity = Vec2::ZERO;
                self.frozen = true;
                self.posture(Posture::Dead, ctx);
                ctx.presentation.emit(PresentationEvent::Sound {
                    entity: self.id,
                    cue: SoundCue::Death,
                });
                let despawn_at = if ctx.authority.has_authority(self.id) {
                    events.push(AgentEvent::DropLoot {
                        agent: self.id,
                        position,
                    });
                    Some(Deadline::after(now, self.config.despawn_delay))
                } else {
                    None
                };
                self.state = AgentState::Dead {
                    elapsed: 0.0,
                    despawn_at,
                    despawn_requested: false,
                };
                debug!(agent = %self.id, "agent died");
            }
        }
    }

    /// Mirrors a death replicated from the authoritative peer: posture and
    /// freeze only, no loot and no despawn.
    fn enter_replicated_death(&mut self, ctx: &AgentContext<'_>) {
        self.state = AgentState::Dead {
            elapsed: 0.0,
            despawn_at: None,
            despawn_requested: false,
        };
        self.velocity = Vec2::ZERO;
        self.frozen = true;
        self.posture(Posture::Dead, ctx);
    }

    fn face(&mut self, direction: Vec2, ctx: &AgentContext<'_>) {
        if direction != Vec2::ZERO && direction != self.heading {
            self.heading = direction;
            ctx.presentation.emit(PresentationEvent::Heading {
                entity: self.id,
                heading: direction,
            });
        }
    }

    fn posture(&self, posture: Posture, ctx: &AgentContext<'_>) {
        ctx.presentation.emit(PresentationEvent::Posture {
            entity: self.id,
            posture,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::LocalAuthority;
    use crate::entity::{Arena, Combatant, Damageable};
    use crate::presentation::NullPresentation;
    use visage_common::Layer;

    const DT: f32 = 0.1;

    fn id(raw: u64) -> EntityId {
        EntityId::from_raw(raw)
    }

    struct Harness {
        arena: Arena,
        engine: DamageEngine,
        authority: LocalAuthority,
        now: SimTime,
    }

    impl Harness {
        fn new() -> Self {
            let mut arena = Arena::new();
            arena.insert(
                Combatant::new(id(1), Layer::Enemy, Archetype::Angry, 100.0)
                    .with_hostile_mask(LayerMask::PLAYER),
            );
            Self {
                arena,
                engine: DamageEngine::default(),
                authority: LocalAuthority::Host,
                now: 0.0,
            }
        }

        fn add_player(&mut self, raw: u64, x: f32) {
            self.arena.insert(
                Combatant::new(id(raw), Layer::Player, Archetype::Neutral, 100.0)
                    .with_position(Vec2::new(x, 0.0))
                    .with_radius(0.0),
            );
        }

        fn ctx(&self) -> AgentContext<'_> {
            AgentContext {
                now: self.now,
                dt: DT,
                world: &self.arena,
                engine: &self.engine,
                authority: &self.authority,
                presentation: &NullPresentation,
            }
        }

        fn step(&mut self, agent: &mut Agent) -> Vec<AgentEvent> {
            let events = agent.update(&self.ctx());
            self.now += f64::from(DT);
            events
        }
    }

    fn agent(initial: InitialState) -> Agent {
        let config = AgentConfig {
            initial_state: initial,
            ..AgentConfig::default()
        };
        Agent::new(id(1), Archetype::Angry, config, 7)
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(AgentConfig::default().validate().is_ok());
        let bad = AgentConfig {
            attack_cooldown: TimeRange::new(5.0, 1.0),
            ..AgentConfig::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(ContentError::InvalidRange {
                field: "attack_cooldown",
                ..
            })
        ));
    }

    #[test]
    fn test_starts_in_configured_state() {
        let mut h = Harness::new();
        let mut roamer = agent(InitialState::Roam);
        h.step(&mut roamer);
        assert_eq!(roamer.kind(), AgentStateKind::Roam);
        assert!((roamer.velocity().length() - 2.0).abs() < 1e-4);

        let mut idler = agent(InitialState::Idle);
        h.step(&mut idler);
        assert_eq!(idler.kind(), AgentStateKind::Idle);
        assert_eq!(idler.velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_idle_stays_idle_without_targets() {
        let mut h = Harness::new();
        let mut a = agent(InitialState::Idle);
        for _ in 0..100 {
            h.step(&mut a);
            assert_eq!(a.kind(), AgentStateKind::Idle);
        }
    }

    #[test]
    fn test_idle_notices_target() {
        let mut h = Harness::new();
        h.add_player(2, 5.0);
        let mut a = agent(InitialState::Idle);
        for _ in 0..40 {
            h.step(&mut a);
        }
        assert_eq!(a.kind(), AgentStateKind::Chase);
        assert_eq!(a.tracked_target(), Some(id(2)));
    }

    #[test]
    fn test_attack_entry_rolls_cooldown_and_emits_attack() {
        let mut h = Harness::new();
        h.add_player(2, 1.0);
        let mut a = agent(InitialState::Idle);
        let mut events = Vec::new();
        for _ in 0..40 {
            events.extend(h.step(&mut a));
            if a.kind() == AgentStateKind::Attack {
                break;
            }
        }
        assert_eq!(a.kind(), AgentStateKind::Attack);
        assert!(a.next_cooldown() >= 1.2 && a.next_cooldown() <= 5.0);
        assert!(events
            .iter()
            .any(|e| matches!(e, AgentEvent::Attack { target, .. } if *target == id(2))));
        assert_eq!(a.heading(), Vec2::X);
    }

    #[test]
    fn test_chase_respects_cooldown() {
        let mut h = Harness::new();
        h.add_player(2, 1.0);
        let mut a = agent(InitialState::Idle);
        a.transition(StateRequest::Attack(id(2)), &h.ctx()).unwrap();
        let cooldown = a.next_cooldown();
        let started = a.last_attack_at().unwrap();

        a.transition(StateRequest::Chase(id(2)), &h.ctx()).unwrap();
        h.step(&mut a);
        assert_eq!(a.kind(), AgentStateKind::Chase);
        assert!((a.velocity() - Vec2::new(2.0, 0.0)).length() < 1e-4);

        h.now = started + f64::from(cooldown) + 0.01;
        h.step(&mut a);
        assert_eq!(a.kind(), AgentStateKind::Attack);
    }

    #[test]
    fn test_stagger_then_re_decide() {
        let mut h = Harness::new();
        let mut a = agent(InitialState::Roam);
        h.step(&mut a);
        let outcome = DamageOutcome::Hurt {
            applied: 5.0,
            remaining: 95.0,
            direction: Vec2::Y,
        };
        a.on_hurt(&outcome, &h.ctx()).unwrap();
        assert_eq!(a.kind(), AgentStateKind::Stagger);
        assert_eq!(a.velocity(), Vec2::Y);

        for _ in 0..6 {
            h.step(&mut a);
        }
        assert_eq!(a.kind(), AgentStateKind::Roam);
    }

    #[test]
    fn test_dead_is_terminal() {
        let mut h = Harness::new();
        let mut a = agent(InitialState::Roam);
        h.step(&mut a);
        let (applied, events) = a.transition(StateRequest::Dead, &h.ctx()).unwrap();
        assert!(applied);
        assert!(a.frozen());
        assert!(matches!(events[0], AgentEvent::DropLoot { .. }));

        let (applied, events) = a.transition(StateRequest::Roam, &h.ctx()).unwrap();
        assert!(!applied);
        assert!(events.is_empty());
        let (applied, _) = a.transition(StateRequest::Dead, &h.ctx()).unwrap();
        assert!(!applied);
        assert_eq!(a.kind(), AgentStateKind::Dead);
    }

    #[test]
    fn test_transition_requires_authority() {
        let mut h = Harness::new();
        h.authority = LocalAuthority::Observer;
        let mut a = agent(InitialState::Roam);
        let err = a.transition(StateRequest::Idle, &h.ctx()).unwrap_err();
        assert_eq!(
            err,
            AuthorityError::NotAuthoritative {
                entity: id(1),
                operation: "transition"
            }
        );
        assert!(h.step(&mut a).is_empty());
    }

    #[test]
    fn test_replicated_death_without_authority() {
        let mut h = Harness::new();
        h.arena
            .get_mut(id(1))
            .unwrap()
            .die(&LocalAuthority::Host)
            .unwrap();
        h.authority = LocalAuthority::Observer;
        let mut a = agent(InitialState::Roam);
        for _ in 0..50 {
            assert!(h.step(&mut a).is_empty());
        }
        assert_eq!(
            *a.state(),
            AgentState::Dead {
                elapsed: 0.0,
                despawn_at: None,
                despawn_requested: false
            }
        );
    }
}
