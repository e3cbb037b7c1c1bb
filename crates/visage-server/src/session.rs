//! Headless session runner.

use serde::Serialize;
use tracing::{debug, info};
use visage_common::{ContentResult, EntityId};
use visage_gameplay::{AgentSnapshot, Damageable, SimEvent, Simulation};

use crate::config::ServerConfig;

/// Money held by one player when the run ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSummary {
    /// Player entity.
    pub id: EntityId,
    /// Money held.
    pub money: u32,
    /// Health left.
    pub health: f32,
}

/// What a finished run looked like.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Ticks simulated.
    pub ticks: u64,
    /// Simulation seconds elapsed.
    pub elapsed_secs: f64,
    /// Wave reached.
    pub wave: u32,
    /// Whether the wave script ran out.
    pub script_finished: bool,
    /// Enemies spawned over the run.
    pub spawned: u32,
    /// Deaths over the run.
    pub kills: u32,
    /// Enemies alive at the end.
    pub live_enemies: usize,
    /// Per-player state.
    pub players: Vec<PlayerSummary>,
    /// Final agent snapshot.
    pub agents: Vec<AgentSnapshot>,
}

/// Runs a configured session to completion.
#[derive(Debug)]
pub struct Session {
    sim: Simulation,
    total_ticks: u64,
    spawned: u32,
    kills: u32,
}

impl Session {
    /// Builds the simulation and joins the configured players.
    pub fn new(mut config: ServerConfig) -> ContentResult<Self> {
        config.validate();
        let total_ticks = config.total_ticks();
        let mut sim = Simulation::host(config.simulation.clone())?;
        for index in 0..config.players {
            let spawn = config.spawn_for(index);
            let id = sim.add_player(spawn.archetype, spawn.position);
            info!(player = id.raw(), archetype = ?spawn.archetype, "player joined");
        }
        Ok(Self {
            sim,
            total_ticks,
            spawned: 0,
            kills: 0,
        })
    }

    /// The simulation being run.
    #[allow(dead_code)]
    pub const fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Ticks every step of the configured duration.
    pub fn run(&mut self) {
        info!(ticks = self.total_ticks, "session starting");
        for _ in 0..self.total_ticks {
            self.step();
        }
        info!(
            wave = self.sim.wave(),
            kills = self.kills,
            live = self.sim.live_enemies(),
            "session finished"
        );
    }

    /// Runs one tick and logs its progress.
    pub fn step(&mut self) {
        self.sim.tick();
        for event in self.sim.take_events() {
            match event {
                SimEvent::EnemySpawned { entity, template } => {
                    self.spawned += 1;
                    debug!(entity = entity.raw(), %template, "enemy spawned");
                },
                SimEvent::Killed { entity, by } => {
                    self.kills += 1;
                    info!(entity = entity.raw(), by = by.raw(), "killed");
                },
                SimEvent::WaveStarted(wave) => info!(wave, "wave started"),
                SimEvent::NpcVisibility(visible) => info!(visible, "shop npc"),
                SimEvent::ScriptFinished => info!("wave script finished"),
                SimEvent::MoneyCollected { player, amount } => {
                    debug!(player = player.raw(), amount, "money collected");
                },
                SimEvent::Hit(_) | SimEvent::Despawned(_) => {},
            }
        }
    }

    /// Summary of the run so far.
    pub fn summary(&self) -> RunSummary {
        let players = self
            .sim
            .players()
            .map(|player| PlayerSummary {
                id: player.id(),
                money: player.money(),
                health: self
                    .sim
                    .arena()
                    .get(player.id())
                    .map_or(0.0, |body| body.current_health()),
            })
            .collect();
        RunSummary {
            ticks: self.sim.tick_count(),
            elapsed_secs: self.sim.now(),
            wave: self.sim.wave(),
            script_finished: self.sim.script_finished(),
            spawned: self.spawned,
            kills: self.kills,
            live_enemies: self.sim.live_enemies(),
            players,
            agents: self.sim.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use visage_gameplay::{WaveScript, WaveSegment};

    fn config(duration_secs: f32, segments: Vec<WaveSegment>) -> ServerConfig {
        let mut config = ServerConfig {
            duration_secs,
            players: 2,
            ..ServerConfig::default()
        };
        config.simulation.script = WaveScript::new(segments);
        config
    }

    #[test]
    fn test_players_join_at_start() {
        let session = Session::new(config(0.0, Vec::new())).expect("session");
        assert_eq!(session.simulation().players().count(), 2);
        assert_eq!(session.summary().ticks, 0);
    }

    #[test]
    fn test_run_counts_spawns() {
        let segments = vec![WaveSegment::SpawnBurst {
            template: "wanderer".to_string(),
            point: Vec2::new(30.0, 30.0),
            spread: 1.0,
            quantity: 2,
        }];
        let mut session = Session::new(config(1.0, segments)).expect("session");
        session.run();

        let summary = session.summary();
        assert_eq!(summary.ticks, 60);
        // Two per burst per player.
        assert_eq!(summary.spawned, 4);
        assert_eq!(summary.agents.len(), 4);
        assert!(summary.script_finished);
        assert_eq!(summary.players.len(), 2);
    }

    #[test]
    fn test_unknown_template_fails_fast() {
        let segments = vec![WaveSegment::SpawnBurst {
            template: "nobody".to_string(),
            point: Vec2::ZERO,
            spread: 0.0,
            quantity: 1,
        }];
        assert!(Session::new(config(1.0, segments)).is_err());
    }

    #[test]
    fn test_summary_serializes() {
        let session = Session::new(config(0.0, Vec::new())).expect("session");
        let json = serde_json::to_string(&session.summary()).expect("json");
        assert!(json.contains("\"wave\":1"));
    }
}
