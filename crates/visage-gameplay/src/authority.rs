//! Simulation authority.
//!
//! Exactly one context may write an entity's health, dead flag and agent state.
//! Writes from any other context are rejected and logged, never applied.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;
use visage_common::{AuthorityError, EntityId};

/// Answers whether the local context owns an entity's simulation state.
pub trait AuthorityOracle {
    /// Returns whether writes to `entity` are allowed here.
    fn has_authority(&self, entity: EntityId) -> bool;

    /// Returns whether this context runs session-wide logic such as wave spawning.
    fn has_world_authority(&self) -> bool {
        false
    }
}

/// Authority as seen by one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalAuthority {
    /// Host or dedicated server: owns everything.
    Host,
    /// Client: owns only the listed entities (its own avatar).
    Client {
        /// Entities this client simulates.
        owned: BTreeSet<EntityId>,
    },
    /// Owns nothing. Replays replicated state only.
    Observer,
}

impl LocalAuthority {
    /// Client owning a single entity.
    #[must_use]
    pub fn client_owning(entity: EntityId) -> Self {
        let mut owned = BTreeSet::new();
        owned.insert(entity);
        Self::Client { owned }
    }

    /// Grants ownership of another entity. No-op for hosts and observers.
    pub fn take_ownership(&mut self, entity: EntityId) {
        if let Self::Client { owned } = self {
            owned.insert(entity);
        }
    }
}

impl AuthorityOracle for LocalAuthority {
    fn has_authority(&self, entity: EntityId) -> bool {
        match self {
            Self::Host => true,
            Self::Client { owned } => owned.contains(&entity),
            Self::Observer => false,
        }
    }

    fn has_world_authority(&self) -> bool {
        matches!(self, Self::Host)
    }
}

/// Checks authority, logging and returning an error on violation.
pub fn require_authority(
    oracle: &dyn AuthorityOracle,
    entity: EntityId,
    operation: &'static str,
) -> Result<(), AuthorityError> {
    if oracle.has_authority(entity) {
        Ok(())
    } else {
        warn!(%entity, operation, "rejected write without authority");
        Err(AuthorityError::NotAuthoritative { entity, operation })
    }
}

/// A replicated value that only the authoritative context may write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authoritative<T> {
    owner: EntityId,
    value: T,
}

impl<T> Authoritative<T> {
    /// Wraps an initial value owned by `owner`.
    #[must_use]
    pub const fn new(owner: EntityId, value: T) -> Self {
        Self { owner, value }
    }

    /// Current value. Reads are never gated.
    #[must_use]
    pub const fn get(&self) -> &T {
        &self.value
    }

    /// Entity whose authority guards this cell.
    #[must_use]
    pub const fn owner(&self) -> EntityId {
        self.owner
    }

    /// Replaces the value if `oracle` grants authority over the owner.
    pub fn set(
        &mut self,
        oracle: &dyn AuthorityOracle,
        operation: &'static str,
        value: T,
    ) -> Result<(), AuthorityError> {
        require_authority(oracle, self.owner, operation)?;
        self.value = value;
        Ok(())
    }

    /// Mutates the value in place if `oracle` grants authority.
    pub fn update<R>(
        &mut self,
        oracle: &dyn AuthorityOracle,
        operation: &'static str,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, AuthorityError> {
        require_authority(oracle, self.owner, operation)?;
        Ok(f(&mut self.value))
    }

    /// Applies a value received from the authoritative peer.
    pub fn apply_replicated(&mut self, value: T) {
        self.value = value;
    }
}

impl<T: Copy> Authoritative<T> {
    /// Copy of the current value.
    #[must_use]
    pub fn value(&self) -> T {
        self.value
    }
}
