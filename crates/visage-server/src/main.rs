//! # Visage Server
//!
//! Headless, server-authoritative runner for Project Visage.
//!
//! Loads a [`config::ServerConfig`] from the TOML file named on the command
//! line (or `visage.toml`), runs the simulation as host for the configured
//! duration and prints a JSON summary of the final state.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod config;
mod session;

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{ServerConfig, CONFIG_FILE};
use crate::session::Session;

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("visage=info".parse()?))
        .init();

    info!("Project Visage server starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let config = ServerConfig::load_from(&path);

    let mut session = Session::new(config)?;
    session.run();

    let summary = serde_json::to_string_pretty(&session.summary())?;
    println!("{summary}");

    info!("Project Visage server shutdown complete");
    Ok(())
}
