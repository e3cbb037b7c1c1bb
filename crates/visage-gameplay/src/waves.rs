//! Enemy templates and the scripted wave spawner.
//!
//! A [`WaveScript`] is a list of segments run one after another by a
//! [`WaveRunner`]. Waits are deadlines checked each tick, so the runner never
//! blocks the simulation. Only the world authority runs the script.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f32::consts::TAU;
use tracing::{debug, info};
use visage_common::{ContentError, ContentResult, EntityId, Layer};

use crate::agent::AgentConfig;
use crate::archetype::Archetype;
use crate::authority::AuthorityOracle;
use crate::clock::{Deadline, SimTime};
use crate::entity::Combatant;
use crate::loot::LootTable;

/// Health and damage growth per wave after the first.
pub const WAVE_SCALING_STEP: f32 = 0.15;

/// Multiplier applied to enemies spawned during `wave`.
///
/// Wave 1 spawns at base strength; wave `n > 1` at `1 + 0.15 * n`.
#[must_use]
pub fn wave_scale(wave: u32) -> f32 {
    if wave <= 1 {
        1.0
    } else {
        1.0 + WAVE_SCALING_STEP * wave as f32
    }
}

// ============================================================================
// Templates
// ============================================================================

/// Everything needed to build one kind of enemy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTemplate {
    /// Registry key.
    pub name: String,
    /// Archetype for stats and matchups.
    pub archetype: Archetype,
    /// Health at wave 1.
    pub max_health: f32,
    /// Damage at wave 1.
    pub base_damage: f32,
    /// Flat reduction per hit.
    pub defense: f32,
    /// Body radius.
    pub radius: f32,
    /// Behaviour tuning.
    pub agent: AgentConfig,
    /// Money dropped on death.
    pub loot: LootTable,
}

impl Default for EnemyTemplate {
    fn default() -> Self {
        Self {
            name: "grunt".to_string(),
            archetype: Archetype::Neutral,
            max_health: 100.0,
            base_damage: 10.0,
            defense: 0.0,
            radius: 0.5,
            agent: AgentConfig::default(),
            loot: LootTable::default(),
        }
    }
}

impl EnemyTemplate {
    /// Creates a template with default tuning.
    #[must_use]
    pub fn new(name: &str, archetype: Archetype) -> Self {
        Self {
            name: name.to_string(),
            archetype,
            ..Self::default()
        }
    }

    /// Builder: health and damage.
    #[must_use]
    pub fn with_vitals(mut self, max_health: f32, base_damage: f32) -> Self {
        self.max_health = max_health;
        self.base_damage = base_damage;
        self
    }

    /// Builder: flat defense.
    #[must_use]
    pub fn with_defense(mut self, defense: f32) -> Self {
        self.defense = defense;
        self
    }

    /// Validates tuning.
    pub fn validate(&self) -> ContentResult<()> {
        if !(self.max_health.is_finite() && self.max_health > 0.0) {
            return Err(ContentError::InvalidValue {
                field: "max_health",
                reason: format!("template {} has non-positive health", self.name),
            });
        }
        if !(self.base_damage.is_finite() && self.base_damage >= 0.0) {
            return Err(ContentError::InvalidValue {
                field: "base_damage",
                reason: format!("template {} has negative damage", self.name),
            });
        }
        self.agent.validate()?;
        self.loot.validate()
    }

    /// Builds the arena body for a spawned instance.
    #[must_use]
    pub fn body(&self, id: EntityId, position: Vec2, scale: f32) -> Combatant {
        Combatant::new(id, Layer::Enemy, self.archetype, self.max_health)
            .with_hostile_mask(self.agent.hostile_mask)
            .with_base_damage(self.base_damage)
            .with_defense(self.defense)
            .with_radius(self.radius)
            .with_position(position)
            .with_scaling(scale)
    }
}

/// Named enemy templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, EnemyTemplate>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::from_templates([
            EnemyTemplate::new("wanderer", Archetype::Neutral),
            EnemyTemplate::new("jester", Archetype::Happy).with_vitals(80.0, 8.0),
            EnemyTemplate::new("weeper", Archetype::Sad).with_vitals(140.0, 10.0).with_defense(2.0),
            EnemyTemplate::new("brute", Archetype::Angry).with_vitals(120.0, 14.0),
        ])
    }
}

impl TemplateRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            templates: BTreeMap::new(),
        }
    }

    /// Builds a registry keyed by template name.
    #[must_use]
    pub fn from_templates(templates: impl IntoIterator<Item = EnemyTemplate>) -> Self {
        Self {
            templates: templates.into_iter().map(|t| (t.name.clone(), t)).collect(),
        }
    }

    /// Adds or replaces a template.
    pub fn register(&mut self, template: EnemyTemplate) {
        self.templates.insert(template.name.clone(), template);
    }

    /// Looks up a template.
    pub fn get(&self, name: &str) -> ContentResult<&EnemyTemplate> {
        self.templates
            .get(name)
            .ok_or_else(|| ContentError::UnknownTemplate(name.to_string()))
    }

    /// Template names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Validates every template.
    pub fn validate(&self) -> ContentResult<()> {
        self.templates.values().try_for_each(EnemyTemplate::validate)
    }
}

// ============================================================================
// Script
// ============================================================================

/// One step of a wave script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WaveSegment {
    /// Spawn `quantity` per connected client at once.
    SpawnBurst {
        /// Template name.
        template: String,
        /// Spawn centre.
        point: Vec2,
        /// Random offset radius.
        #[serde(default = "default_spread")]
        spread: f32,
        /// Enemies per client.
        #[serde(default = "default_quantity")]
        quantity: u32,
    },
    /// Spawn one enemy every `interval` seconds, `repeat` times per client.
    SpawnRepeating {
        /// Template name.
        template: String,
        /// Spawn centre.
        point: Vec2,
        /// Random offset radius.
        #[serde(default = "default_spread")]
        spread: f32,
        /// Seconds between spawns.
        #[serde(default = "default_interval")]
        interval: f32,
        /// Spawns per client.
        #[serde(default = "default_repeat")]
        repeat: u32,
    },
    /// Pause, optionally with the shop NPC shown.
    Wait {
        /// Seconds to wait.
        duration: f32,
        /// Advance the wave counter when the wait ends.
        #[serde(default = "default_true")]
        increment_wave: bool,
        /// Show the NPC when the wait starts.
        #[serde(default = "default_true")]
        activate_npc: bool,
        /// Hide the NPC when the wait ends.
        #[serde(default = "default_true")]
        deactivate_after: bool,
    },
}

fn default_spread() -> f32 {
    1.0
}

fn default_quantity() -> u32 {
    1
}

fn default_interval() -> f32 {
    1.0
}

fn default_repeat() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

/// Ordered segment list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveScript {
    /// Segments run in order.
    pub segments: Vec<WaveSegment>,
}

impl WaveScript {
    /// Creates a script.
    #[must_use]
    pub fn new(segments: Vec<WaveSegment>) -> Self {
        Self { segments }
    }

    /// Checks every referenced template exists and every timing is sane.
    pub fn validate(&self, templates: &TemplateRegistry) -> ContentResult<()> {
        for segment in &self.segments {
            match segment {
                WaveSegment::SpawnBurst { template, spread, .. } => {
                    templates.get(template)?;
                    non_negative("spread", *spread)?;
                }
                WaveSegment::SpawnRepeating {
                    template,
                    spread,
                    interval,
                    ..
                } => {
                    templates.get(template)?;
                    non_negative("spread", *spread)?;
                    non_negative("interval", *interval)?;
                }
                WaveSegment::Wait { duration, .. } => non_negative("duration", *duration)?,
            }
        }
        Ok(())
    }
}

fn non_negative(field: &'static str, value: f32) -> ContentResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ContentError::InvalidValue {
            field,
            reason: format!("must be a non-negative number, got {value}"),
        })
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Requests produced by the wave runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WaveAction {
    /// Spawn one enemy.
    Spawn {
        /// Template name.
        template: String,
        /// Spawn position.
        position: Vec2,
        /// Health and damage multiplier.
        scale: f32,
    },
    /// Show or hide the shop NPC.
    NpcVisibility(bool),
    /// Wave counter advanced.
    WaveStarted(u32),
    /// Last segment finished.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Progress {
    Pending,
    Repeating { spawned: u32, total: u32, next: Deadline },
    Waiting { until: Deadline },
}

/// Runs a [`WaveScript`] against simulation time.
#[derive(Debug, Clone)]
pub struct WaveRunner {
    script: WaveScript,
    cursor: usize,
    progress: Progress,
    wave: u32,
    npc_visible: bool,
    finished: bool,
    rng: fastrand::Rng,
}

impl WaveRunner {
    /// Creates a runner at wave 1.
    #[must_use]
    pub fn new(script: WaveScript, seed: u64) -> Self {
        Self {
            script,
            cursor: 0,
            progress: Progress::Pending,
            wave: 1,
            npc_visible: false,
            finished: false,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Current wave, starting at 1.
    #[must_use]
    pub const fn wave(&self) -> u32 {
        self.wave
    }

    /// Returns whether the shop NPC is shown.
    #[must_use]
    pub const fn npc_visible(&self) -> bool {
        self.npc_visible
    }

    /// Returns whether every segment has run.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Index of the running segment.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Advances the script. Spawn counts are multiplied by `client_count`
    /// (at least 1).
    pub fn update(&mut self, now: SimTime, client_count: u32, authority: &dyn AuthorityOracle) -> Vec<WaveAction> {
        let mut actions = Vec::new();
        if self.finished || !authority.has_world_authority() {
            return actions;
        }
        let clients = client_count.max(1);

        while let Some(segment) = self.script.segments.get(self.cursor).cloned() {
            let done = self.step(&segment, now, clients, &mut actions);
            if !done {
                return actions;
            }
            self.cursor += 1;
            self.progress = Progress::Pending;
        }

        self.finished = true;
        info!(wave = self.wave, "wave script finished");
        actions.push(WaveAction::Finished);
        actions
    }

    /// Runs one segment as far as `now` allows. Returns `true` when it is done.
    fn step(&mut self, segment: &WaveSegment, now: SimTime, clients: u32, actions: &mut Vec<WaveAction>) -> bool {
        match segment {
            WaveSegment::SpawnBurst {
                template,
                point,
                spread,
                quantity,
            } => {
                let total = quantity.saturating_mul(clients);
                debug!(template, total, wave = self.wave, "burst spawn");
                for _ in 0..total {
                    actions.push(self.spawn(template, *point, *spread));
                }
                true
            }
            WaveSegment::SpawnRepeating {
                template,
                point,
                spread,
                interval,
                repeat,
            } => {
                let (mut spawned, total, mut next) = match self.progress {
                    Progress::Repeating { spawned, total, next } => (spawned, total, next),
                    _ => (0, repeat.saturating_mul(clients), Deadline::at(now)),
                };
                while next.is_due(now) {
                    if spawned >= total {
                        return true;
                    }
                    actions.push(self.spawn(template, *point, *spread));
                    spawned += 1;
                    next = Deadline::at(next.time() + f64::from(*interval));
                    if *interval <= 0.0 && spawned >= total {
                        return true;
                    }
                }
                self.progress = Progress::Repeating { spawned, total, next };
                false
            }
            WaveSegment::Wait {
                duration,
                increment_wave,
                activate_npc,
                deactivate_after,
            } => {
                let until = match self.progress {
                    Progress::Waiting { until } => until,
                    _ => {
                        if *activate_npc {
                            self.set_npc(true, actions);
                        }
                        Deadline::after(now, *duration)
                    }
                };
                if !until.is_due(now) {
                    self.progress = Progress::Waiting { until };
                    return false;
                }
                if *increment_wave {
                    self.wave += 1;
                    info!(wave = self.wave, "wave started");
                    actions.push(WaveAction::WaveStarted(self.wave));
                }
                if *deactivate_after {
                    self.set_npc(false, actions);
                }
                true
            }
        }
    }

    fn spawn(&mut self, template: &str, point: Vec2, spread: f32) -> WaveAction {
        let offset = Vec2::from_angle(self.rng.f32() * TAU) * self.rng.f32() * spread;
        WaveAction::Spawn {
            template: template.to_string(),
            position: point + offset,
            scale: wave_scale(self.wave),
        }
    }

    fn set_npc(&mut self, visible: bool, actions: &mut Vec<WaveAction>) {
        if self.npc_visible != visible {
            self.npc_visible = visible;
            actions.push(WaveAction::NpcVisibility(visible));
        }
    }
}
