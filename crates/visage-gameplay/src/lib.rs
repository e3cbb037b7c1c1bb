//! # Visage Gameplay
//!
//! Gameplay simulation for Project Visage.
//!
//! This crate provides the server-authoritative combat core:
//! - Archetype stats, bonus accumulators and the matchup table
//! - Damage resolution through an injected [`DamageEngine`]
//! - Combatants, spatial queries and target sensing
//! - The enemy agent state machine
//! - Melee, line and projectile attacks
//! - Players, the item shop and money loot
//! - Scripted enemy waves
//! - The [`Simulation`] context that runs the fixed tick

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod agent;
pub mod archetype;
pub mod attack;
pub mod authority;
pub mod bonus;
pub mod clock;
pub mod curve;
pub mod damage_calc;
pub mod entity;
pub mod items;
pub mod lifecycle;
pub mod loot;
pub mod matchup;
pub mod player;
pub mod presentation;
pub mod projectile;
pub mod sensing;
pub mod simulation;
pub mod spatial;
pub mod waves;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::agent::*;
    pub use crate::archetype::*;
    pub use crate::attack::*;
    pub use crate::authority::*;
    pub use crate::bonus::*;
    pub use crate::clock::*;
    pub use crate::curve::*;
    pub use crate::damage_calc::*;
    pub use crate::entity::*;
    pub use crate::items::*;
    pub use crate::lifecycle::*;
    pub use crate::loot::*;
    pub use crate::matchup::*;
    pub use crate::player::*;
    pub use crate::presentation::*;
    pub use crate::projectile::*;
    pub use crate::sensing::*;
    pub use crate::simulation::*;
    pub use crate::spatial::*;
    pub use crate::waves::*;
}

pub use prelude::*;
