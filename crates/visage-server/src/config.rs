//! Server configuration.
//!
//! Provides the run parameters for a headless session: timing, player slots
//! and the gameplay content handed to the simulation. Configuration can be
//! loaded from and saved to a TOML file.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{info, warn};
use visage_gameplay::{Archetype, SimulationSettings};

/// Configuration file name used when no path is given.
pub const CONFIG_FILE: &str = "visage.toml";

/// Highest number of simultaneous players.
pub const MAX_PLAYERS: usize = 8;

/// Where and as what a player joins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSpawn {
    /// World position.
    pub position: Vec2,
    /// Starting archetype.
    pub archetype: Archetype,
}

impl Default for PlayerSpawn {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            archetype: Archetype::Neutral,
        }
    }
}

/// Server configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    // === Timing ===
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Seconds of simulation to run
    pub duration_secs: f32,

    // === Players ===
    /// Number of players joining at start
    pub players: usize,
    /// Spawn slots, reused in order when there are more players than slots
    pub spawns: Vec<PlayerSpawn>,

    // === Content ===
    /// Seed, templates, wave script and tuning
    pub simulation: SimulationSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            duration_secs: 60.0,
            players: 1,
            spawns: vec![
                PlayerSpawn::default(),
                PlayerSpawn {
                    position: Vec2::new(2.0, 0.0),
                    archetype: Archetype::Angry,
                },
            ],
            simulation: SimulationSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a specific path.
    /// Returns default config if the file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read config file: {e}");
                    return Self::default();
                }

                match toml::from_str(&contents) {
                    Ok(config) => {
                        info!("Loaded config from {}", path.display());
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse config file: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    #[allow(dead_code)]
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.tick_rate = self.tick_rate.clamp(10, 240);
        self.simulation.tick_rate = self.tick_rate;

        if !self.duration_secs.is_finite() {
            self.duration_secs = Self::default().duration_secs;
        }
        self.duration_secs = self.duration_secs.clamp(0.0, 3600.0);

        self.players = self.players.clamp(1, MAX_PLAYERS);
        if self.spawns.is_empty() {
            self.spawns.push(PlayerSpawn::default());
        }
    }

    /// Spawn slot for the `index`-th player.
    #[must_use]
    pub fn spawn_for(&self, index: usize) -> PlayerSpawn {
        if self.spawns.is_empty() {
            return PlayerSpawn::default();
        }
        let slot = self.spawns[index % self.spawns.len()];
        // Repeated slots fan out so players don't stack.
        let lap = (index / self.spawns.len()) as f32;
        PlayerSpawn {
            position: slot.position + Vec2::new(0.0, lap),
            ..slot
        }
    }

    /// Total simulation ticks for the configured duration.
    #[must_use]
    pub fn total_ticks(&self) -> u64 {
        (self.duration_secs * self.tick_rate as f32).ceil().max(0.0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.players, 1);
        assert_eq!(config.total_ticks(), 3600);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ServerConfig {
            tick_rate: 1,
            duration_secs: f32::NAN,
            players: 0,
            spawns: Vec::new(),
            ..ServerConfig::default()
        };

        config.validate();

        assert_eq!(config.tick_rate, 10);
        assert_eq!(config.simulation.tick_rate, 10);
        assert_eq!(config.duration_secs, 60.0);
        assert_eq!(config.players, 1);
        assert_eq!(config.spawns.len(), 1);

        config.players = 100;
        config.duration_secs = -5.0;
        config.validate();
        assert_eq!(config.players, MAX_PLAYERS);
        assert_eq!(config.duration_secs, 0.0);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test_config.toml");

        let mut config = ServerConfig::default();
        config.players = 3;
        config.simulation.seed = 777;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = ServerConfig::load_from(&config_path);
        assert_eq!(loaded.players, 3);
        assert_eq!(loaded.simulation.seed, 777);
        assert_eq!(loaded.spawns, config.spawns);
        assert_eq!(loaded.simulation.templates, config.simulation.templates);
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let config = ServerConfig::load_from("/nonexistent/path/visage.toml");
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_load_malformed_file_returns_default() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("broken.toml");
        fs::write(&config_path, "tick_rate = [").expect("write");

        let config = ServerConfig::load_from(&config_path);
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            players = 2

            [simulation]
            seed = 9
            "#,
        )
        .expect("parse");
        assert_eq!(config.players, 2);
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.simulation.seed, 9);
        assert!(!config.simulation.templates.is_empty());
    }

    #[test]
    fn test_sample_config_parses() {
        let config: ServerConfig =
            toml::from_str(include_str!("../visage.toml")).expect("sample config");
        assert_eq!(config.players, 2);
        assert_eq!(config.spawns[1].archetype, Archetype::Angry);
        assert_eq!(config.simulation.script.segments.len(), 4);
        assert!(config
            .simulation
            .script
            .validate(&config.simulation.templates)
            .is_ok());
    }

    #[test]
    fn test_spawn_slots_wrap() {
        let config = ServerConfig::default();
        let third = config.spawn_for(2);
        assert_eq!(third.archetype, Archetype::Neutral);
        assert_eq!(third.position, Vec2::new(0.0, 1.0));
    }
}
