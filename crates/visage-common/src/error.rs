//! Error types for Project Visage.

use crate::ids::EntityId;
use thiserror::Error;

/// Top-level error type for Visage operations.
#[derive(Debug, Error)]
pub enum VisageError {
    /// Malformed or incomplete game content
    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    /// Write attempted without simulation authority
    #[error("Authority error: {0}")]
    Authority(#[from] AuthorityError),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Content errors. These are raised while loading or building tables and
/// templates, never in the middle of a tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContentError {
    /// Archetype index outside the closed set
    #[error("archetype id {0} is out of range")]
    InvalidArchetype(u8),

    /// Matchup table cell never authored
    #[error("matchup cell ({attacker}, {defender}) is not defined")]
    MissingMatchup {
        /// Attacker archetype index
        attacker: u8,
        /// Defender archetype index
        defender: u8,
    },

    /// Matchup table cell authored twice
    #[error("matchup cell ({attacker}, {defender}) is defined more than once")]
    DuplicateMatchup {
        /// Attacker archetype index
        attacker: u8,
        /// Defender archetype index
        defender: u8,
    },

    /// A `[min, max]` pair is inverted or negative
    #[error("invalid range for {field}: [{min}, {max}]")]
    InvalidRange {
        /// Field name
        field: &'static str,
        /// Lower bound
        min: f32,
        /// Upper bound
        max: f32,
    },

    /// A scalar tuning value is out of bounds
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// Human readable reason
        reason: String,
    },

    /// Enemy template referenced but not registered
    #[error("unknown enemy template: {0}")]
    UnknownTemplate(String),
}

/// Authority violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorityError {
    /// The local context does not own the entity's simulation state
    #[error("no authority over {entity} for {operation}")]
    NotAuthoritative {
        /// Entity that was written to
        entity: EntityId,
        /// Operation that was rejected
        operation: &'static str,
    },
}

/// Result type alias for Visage operations.
pub type VisageResult<T> = Result<T, VisageError>;

/// Result type alias for content loading.
pub type ContentResult<T> = Result<T, ContentError>;
