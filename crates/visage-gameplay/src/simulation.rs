//! The simulation context.
//!
//! [`Simulation`] owns every piece of per-session state and runs the fixed
//! tick. Nothing here is global: two simulations in one process never share
//! state.
//!
//! Tick order:
//! 1. advance the clock
//! 2. agents in ascending id; each agent's attack resolves, and any hurt
//!    reactions run, before the next agent updates
//! 3. integrate velocities (after every agent decided)
//! 4. projectiles
//! 5. money pickups
//! 6. wave script
//! 7. deferred despawns

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, info, trace};
use visage_common::{AuthorityError, ClientId, ContentResult, EntityId, Layer};

use crate::agent::{Agent, AgentContext, AgentEvent};
use crate::archetype::Archetype;
use crate::attack::{AttackExecutor, HitReport};
use crate::authority::{AuthorityOracle, LocalAuthority};
use crate::clock::{FixedClock, SimTime, TickClock};
use crate::damage_calc::DamageEngine;
use crate::entity::{Arena, Attacker, Damageable, DamageOutcome};
use crate::items::ItemCatalogue;
use crate::lifecycle::{LifecycleProvider, LocalLifecycle, PrefabRef};
use crate::loot::{LootTable, PickupEvent, PickupField, PickupTuning};
use crate::player::{
    PlayerCommand, PlayerContext, PlayerError, PlayerOutcome, PlayerResult, PlayerState, PlayerTuning,
};
use crate::presentation::{NullPresentation, PresentationEvent, PresentationSink, SoundCue};
use crate::projectile::{ProjectileEnd, ProjectileSystem};
use crate::waves::{TemplateRegistry, WaveAction, WaveRunner, WaveScript};

// ============================================================================
// Settings and Events
// ============================================================================

/// Session content and tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Seed for every random draw.
    pub seed: u64,
    /// Ticks per second.
    pub tick_rate: u32,
    /// Enemy templates.
    pub templates: TemplateRegistry,
    /// Wave script.
    pub script: WaveScript,
    /// Shop items.
    pub catalogue: ItemCatalogue,
    /// Player tuning.
    pub player: PlayerTuning,
    /// Money pickup tuning.
    pub pickups: PickupTuning,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            tick_rate: 60,
            templates: TemplateRegistry::default(),
            script: WaveScript::default(),
            catalogue: ItemCatalogue::default(),
            player: PlayerTuning::default(),
            pickups: PickupTuning::default(),
        }
    }
}

/// Notable things that happened during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    /// Enemy spawned from a template.
    EnemySpawned {
        /// New enemy.
        entity: EntityId,
        /// Template name.
        template: String,
    },
    /// A hit landed.
    Hit(HitReport),
    /// A combatant died.
    Killed {
        /// Victim.
        entity: EntityId,
        /// Attacker.
        by: EntityId,
    },
    /// A player collected money.
    MoneyCollected {
        /// Collector.
        player: EntityId,
        /// Amount.
        amount: u32,
    },
    /// Wave counter advanced.
    WaveStarted(u32),
    /// Shop NPC shown or hidden.
    NpcVisibility(bool),
    /// Wave script ran to completion.
    ScriptFinished,
    /// Entity removed.
    Despawned(EntityId),
}

/// Serializable view of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    /// Agent entity.
    pub id: EntityId,
    /// State name.
    pub state: String,
    /// World position.
    pub position: Vec2,
    /// Current health.
    pub health: f32,
    /// Dead flag.
    pub dead: bool,
}

// ============================================================================
// Simulation
// ============================================================================

/// One running session.
pub struct Simulation {
    arena: Arena,
    agents: BTreeMap<EntityId, Agent>,
    loot: BTreeMap<EntityId, LootTable>,
    projectiles: ProjectileSystem,
    pickups: PickupField,
    players: BTreeMap<EntityId, PlayerState>,
    waves: WaveRunner,
    templates: TemplateRegistry,
    catalogue: ItemCatalogue,
    player_tuning: PlayerTuning,
    engine: DamageEngine,
    clock: FixedClock,
    seed: u64,
    rng: fastrand::Rng,
    next_client: u16,
    pending_despawns: Vec<EntityId>,
    events: Vec<SimEvent>,
    authority: Box<dyn AuthorityOracle>,
    presentation: Box<dyn PresentationSink>,
    lifecycle: Box<dyn LifecycleProvider>,
}

impl Simulation {
    /// Creates a simulation over external collaborators.
    ///
    /// Fails when templates or the wave script are malformed.
    pub fn new(
        settings: SimulationSettings,
        authority: Box<dyn AuthorityOracle>,
        presentation: Box<dyn PresentationSink>,
        lifecycle: Box<dyn LifecycleProvider>,
    ) -> ContentResult<Self> {
        settings.templates.validate()?;
        settings.script.validate(&settings.templates)?;

        info!(
            seed = settings.seed,
            tick_rate = settings.tick_rate,
            templates = settings.templates.len(),
            segments = settings.script.segments.len(),
            "simulation created"
        );

        Ok(Self {
            arena: Arena::new(),
            agents: BTreeMap::new(),
            loot: BTreeMap::new(),
            projectiles: ProjectileSystem::new(),
            pickups: PickupField::new(settings.pickups),
            players: BTreeMap::new(),
            waves: WaveRunner::new(settings.script, settings.seed.wrapping_add(1)),
            templates: settings.templates,
            catalogue: settings.catalogue,
            player_tuning: settings.player,
            engine: DamageEngine::default(),
            clock: FixedClock::from_rate(settings.tick_rate),
            seed: settings.seed,
            rng: fastrand::Rng::with_seed(settings.seed),
            next_client: 0,
            pending_despawns: Vec::new(),
            events: Vec::new(),
            authority,
            presentation,
            lifecycle,
        })
    }

    /// Host-authoritative simulation with no presentation.
    pub fn host(settings: SimulationSettings) -> ContentResult<Self> {
        Self::new(
            settings,
            Box::new(LocalAuthority::Host),
            Box::new(NullPresentation),
            Box::new(LocalLifecycle::new()),
        )
    }

    /// Builder: replaces the damage engine.
    #[must_use]
    pub fn with_engine(mut self, engine: DamageEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Current simulation time.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.clock.tick()
    }

    /// Current wave.
    #[must_use]
    pub const fn wave(&self) -> u32 {
        self.waves.wave()
    }

    /// Returns whether the wave script has finished.
    #[must_use]
    pub const fn script_finished(&self) -> bool {
        self.waves.is_finished()
    }

    /// Every combatant.
    #[must_use]
    pub const fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Mutable access to every combatant.
    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    /// Looks up an agent.
    #[must_use]
    pub fn agent(&self, id: EntityId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// Agents in id order.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// Looks up a player.
    #[must_use]
    pub fn player(&self, id: EntityId) -> Option<&PlayerState> {
        self.players.get(&id)
    }

    /// Players in id order.
    pub fn players(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.values()
    }

    /// Projectiles in flight.
    #[must_use]
    pub const fn projectiles(&self) -> &ProjectileSystem {
        &self.projectiles
    }

    /// Uncollected money.
    #[must_use]
    pub const fn pickups(&self) -> &PickupField {
        &self.pickups
    }

    /// Shop catalogue.
    #[must_use]
    pub const fn catalogue(&self) -> &ItemCatalogue {
        &self.catalogue
    }

    /// Live enemies.
    #[must_use]
    pub fn live_enemies(&self) -> usize {
        self.arena.live_count(Layer::Enemy)
    }

    /// Takes events accumulated since the last call.
    pub fn take_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Serializable view of every agent.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AgentSnapshot> {
        self.agents
            .values()
            .filter_map(|agent| {
                let body = self.arena.get(agent.id())?;
                Some(AgentSnapshot {
                    id: agent.id(),
                    state: agent.kind().name().to_string(),
                    position: body.position,
                    health: body.current_health(),
                    dead: body.is_dead(),
                })
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Spawning
    // ------------------------------------------------------------------------

    /// Spawns an enemy from a template with health and damage scaled by `scale`.
    pub fn spawn_enemy(&mut self, template: &str, position: Vec2, scale: f32) -> ContentResult<EntityId> {
        let template = self.templates.get(template)?;
        let id = self
            .lifecycle
            .spawn_entity(&PrefabRef::Enemy(template.name.clone()), position, 0.0);
        self.arena.insert(template.body(id, position, scale));
        self.agents.insert(
            id,
            Agent::new(id, template.archetype, template.agent.clone(), self.seed),
        );
        self.loot.insert(id, template.loot);
        debug!(%id, template = %template.name, scale, "enemy spawned");
        self.events.push(SimEvent::EnemySpawned {
            entity: id,
            template: template.name.clone(),
        });
        Ok(id)
    }

    /// Spawns a player avatar for a new client.
    pub fn add_player(&mut self, archetype: Archetype, position: Vec2) -> EntityId {
        let id = self.lifecycle.spawn_entity(&PrefabRef::Player, position, 0.0);
        let client = ClientId::new(self.next_client);
        self.next_client = self.next_client.wrapping_add(1);
        let player = PlayerState::new(id, client, self.player_tuning.clone());
        self.arena.insert(player.body(archetype, position));
        self.players.insert(id, player);
        info!(%id, client = client.raw(), archetype = archetype.display_name(), "player joined");
        id
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Applies a player command. Hits landed on agents trigger their hurt
    /// reactions immediately.
    pub fn apply_player_command(&mut self, player: EntityId, command: PlayerCommand) -> PlayerResult<PlayerOutcome> {
        let Some(state) = self.players.get_mut(&player) else {
            return Err(PlayerError::MissingBody(player));
        };
        let executor = AttackExecutor::new(&self.engine, &*self.authority, &*self.presentation);
        let mut ctx = PlayerContext {
            now: self.clock.now(),
            arena: &mut self.arena,
            executor: &executor,
            catalogue: &self.catalogue,
            authority: &*self.authority,
        };
        let outcome = state.apply(command, &mut ctx)?;

        if let PlayerOutcome::Attacked(hits) = &outcome {
            let mut queue = VecDeque::new();
            for hit in hits {
                queue.extend(self.route_hit(hit));
            }
            self.dispatch(queue);
        }
        Ok(outcome)
    }

    // ------------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------------

    /// Runs one fixed step.
    pub fn tick(&mut self) {
        self.clock.advance();
        let now = self.clock.now();
        let dt = self.clock.delta();

        let ids: Vec<EntityId> = self.agents.keys().copied().collect();
        for id in ids {
            let Some(agent) = self.agents.get_mut(&id) else {
                continue;
            };
            let ctx = AgentContext {
                now,
                dt,
                world: &self.arena,
                engine: &self.engine,
                authority: &*self.authority,
                presentation: &*self.presentation,
            };
            let events = agent.update(&ctx);
            self.dispatch(events.into());
        }

        for agent in self.agents.values() {
            if let Some(body) = self.arena.get_mut(agent.id()) {
                body.velocity = agent.velocity();
                body.heading = agent.heading();
                body.frozen = agent.frozen();
            }
        }
        self.arena.integrate(dt);

        let ends = {
            let executor = AttackExecutor::new(&self.engine, &*self.authority, &*self.presentation);
            self.projectiles
                .update(now, dt, &mut self.arena, &executor, &mut *self.lifecycle)
        };
        for end in ends {
            if let ProjectileEnd::Hit(hit) = end {
                let reactions = self.route_hit(&hit);
                self.dispatch(reactions);
            }
        }

        for event in self
            .pickups
            .update(now, &self.arena, &*self.authority, &mut *self.lifecycle)
        {
            if let PickupEvent::Collected { player, amount, .. } = event {
                self.collect_money(player, amount);
            }
        }

        let client_count = u32::try_from(self.players.len()).unwrap_or(u32::MAX);
        for action in self.waves.update(now, client_count, &*self.authority) {
            self.apply_wave_action(action);
        }

        for id in std::mem::take(&mut self.pending_despawns) {
            self.despawn(id);
        }
    }

    /// Runs ticks until `seconds` of simulation time have passed.
    pub fn run_for(&mut self, seconds: f32) {
        let ticks = (seconds / self.clock.delta()).ceil().max(0.0) as u64;
        for _ in 0..ticks {
            self.tick();
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Carries out agent requests, including ones raised by hurt reactions.
    fn dispatch(&mut self, mut queue: VecDeque<AgentEvent>) {
        while let Some(event) = queue.pop_front() {
            match event {
                AgentEvent::Attack { agent, target, aim } => {
                    trace!(%agent, %target, "agent attack");
                    match self.agent_attack(agent, aim) {
                        Ok(hits) => {
                            for hit in hits {
                                queue.extend(self.route_hit(&hit));
                            }
                        }
                        Err(err) => debug!(%agent, %err, "agent attack not applied"),
                    }
                }
                AgentEvent::DropLoot { agent, position } => self.drop_loot(agent, position),
                AgentEvent::RequestDespawn { agent } => self.pending_despawns.push(agent),
            }
        }
    }

    fn agent_attack(&mut self, agent: EntityId, aim: Vec2) -> Result<Vec<HitReport>, AuthorityError> {
        let Some(controller) = self.agents.get(&agent) else {
            return Ok(Vec::new());
        };
        let tuning = controller.config().attack.clone();
        let heading = controller.heading();
        let Some(body) = self.arena.get_mut(agent) else {
            return Ok(Vec::new());
        };
        body.heading = heading;
        let source = body.attacker_profile();

        let executor = AttackExecutor::new(&self.engine, &*self.authority, &*self.presentation);
        executor.perform_agent_attack(
            &mut self.arena,
            &source,
            aim,
            &tuning,
            self.clock.now(),
            &mut *self.lifecycle,
            &mut self.projectiles,
        )
    }

    /// Records a hit and runs the victim's reaction.
    fn route_hit(&mut self, hit: &HitReport) -> VecDeque<AgentEvent> {
        self.events.push(SimEvent::Hit(*hit));
        if hit.outcome.is_kill() {
            info!(victim = %hit.target, by = %hit.attacker, "killed");
            self.events.push(SimEvent::Killed {
                entity: hit.target,
                by: hit.attacker,
            });
        }

        let Some(agent) = self.agents.get_mut(&hit.target) else {
            if matches!(hit.outcome, DamageOutcome::Hurt { .. }) {
                self.presentation.emit(PresentationEvent::Sound {
                    entity: hit.target,
                    cue: SoundCue::Hurt,
                });
            }
            return VecDeque::new();
        };
        let ctx = AgentContext {
            now: self.clock.now(),
            dt: self.clock.delta(),
            world: &self.arena,
            engine: &self.engine,
            authority: &*self.authority,
            presentation: &*self.presentation,
        };
        match agent.on_hurt(&hit.outcome, &ctx) {
            Ok(events) => events.into(),
            Err(err) => {
                debug!(target = %hit.target, %err, "hurt reaction not applied");
                VecDeque::new()
            }
        }
    }

    fn drop_loot(&mut self, agent: EntityId, position: Vec2) {
        let Some(table) = self.loot.get(&agent).copied() else {
            return;
        };
        let amount = table.roll(&mut self.rng);
        self.pickups.drop_money(
            position,
            amount,
            self.clock.now(),
            &mut self.rng,
            &mut *self.lifecycle,
        );
    }

    fn collect_money(&mut self, player: EntityId, amount: u32) {
        let Some(state) = self.players.get_mut(&player) else {
            return;
        };
        match state.credit(amount, &*self.authority) {
            Ok(total) => {
                debug!(%player, amount, total, "money collected");
                self.presentation.emit(PresentationEvent::Sound {
                    entity: player,
                    cue: SoundCue::Pickup,
                });
                self.events.push(SimEvent::MoneyCollected { player, amount });
            }
            Err(err) => debug!(%player, %err, "money credit not applied"),
        }
    }

    fn apply_wave_action(&mut self, action: WaveAction) {
        match action {
            WaveAction::Spawn {
                template,
                position,
                scale,
            } => {
                if let Err(err) = self.spawn_enemy(&template, position, scale) {
                    debug!(%template, %err, "wave spawn skipped");
                }
            }
            WaveAction::NpcVisibility(visible) => {
                self.presentation
                    .emit(PresentationEvent::NpcVisibility { visible });
                self.events.push(SimEvent::NpcVisibility(visible));
            }
            WaveAction::WaveStarted(wave) => self.events.push(SimEvent::WaveStarted(wave)),
            WaveAction::Finished => self.events.push(SimEvent::ScriptFinished),
        }
    }

    fn despawn(&mut self, id: EntityId) {
        let was_agent = self.agents.remove(&id).is_some();
        self.loot.remove(&id);
        if self.arena.remove(id).is_some() || was_agent {
            self.lifecycle.despawn_entity(id);
            self.events.push(SimEvent::Despawned(id));
        }
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.clock.tick())
            .field("wave", &self.waves.wave())
            .field("agents", &self.agents.len())
            .field("players", &self.players.len())
            .field("projectiles", &self.projectiles.len())
            .field("pickups", &self.pickups.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentStateKind, InitialState};
    use crate::waves::{EnemyTemplate, WaveSegment};

    fn settings() -> SimulationSettings {
        let mut templates = TemplateRegistry::new();
        let mut brute = EnemyTemplate::new("brute", Archetype::Angry).with_vitals(30.0, 10.0);
        brute.agent.initial_state = InitialState::Idle;
        templates.register(brute);
        SimulationSettings {
            templates,
            ..SimulationSettings::default()
        }
    }

    #[test]
    fn test_spawn_enemy_registers_agent_and_body() {
        let mut sim = Simulation::host(settings()).unwrap();
        let id = sim.spawn_enemy("brute", Vec2::new(3.0, 0.0), 1.0).unwrap();
        assert!(sim.agent(id).is_some());
        assert_eq!(sim.arena().get(id).unwrap().current_health(), 30.0);
        assert_eq!(sim.live_enemies(), 1);
        assert!(sim.spawn_enemy("dragon", Vec2::ZERO, 1.0).is_err());
    }

    #[test]
    fn test_unknown_template_in_script_fails_fast() {
        let mut bad = settings();
        bad.script = WaveScript::new(vec![WaveSegment::SpawnBurst {
            template: "dragon".to_string(),
            point: Vec2::ZERO,
            spread: 0.0,
            quantity: 1,
        }]);
        assert!(Simulation::host(bad).is_err());
    }

    #[test]
    fn test_player_kill_drops_money_and_despawns() {
        let mut sim = Simulation::host(settings()).unwrap();
        let player = sim.add_player(Archetype::Angry, Vec2::ZERO);
        let enemy = sim.spawn_enemy("brute", Vec2::new(1.0, 0.0), 1.0).unwrap();

        // Angry vs Angry: 10 * (1 + 0.5 + 0.5) = 20, two swings kill 30 hp.
        sim.apply_player_command(player, PlayerCommand::Attack(Vec2::X)).unwrap();
        assert_eq!(sim.agent(enemy).unwrap().kind(), AgentStateKind::Stagger);
        sim.run_for(1.0);
        sim.apply_player_command(player, PlayerCommand::Attack(Vec2::X)).unwrap();
        assert_eq!(sim.agent(enemy).unwrap().kind(), AgentStateKind::Dead);
        assert_eq!(sim.pickups().len(), 1);

        let events = sim.take_events();
        assert!(events.contains(&SimEvent::Killed { entity: enemy, by: player }));

        sim.run_for(2.5);
        assert!(sim.agent(enemy).is_none());
        let despawns = sim
            .take_events()
            .into_iter()
            .filter(|e| *e == SimEvent::Despawned(enemy))
            .count();
        assert_eq!(despawns, 1);
    }

    #[test]
    fn test_snapshot_lists_agents() {
        let mut sim = Simulation::host(settings()).unwrap();
        let id = sim.spawn_enemy("brute", Vec2::new(2.0, 1.0), 1.0).unwrap();
        sim.tick();
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);
        assert_eq!(snapshot[0].state, "Idle");
        assert!(!snapshot[0].dead);
    }
}
