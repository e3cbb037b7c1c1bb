//! # Visage Common
//!
//! Common types, utilities, and shared abstractions for Project Visage.
//!
//! This crate provides foundational types used across all Visage subsystems:
//! - ID types (EntityId, EntityAllocator, ClientId)
//! - Collision layers and masks
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;
pub mod layers;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::layers::*;
    pub use glam::Vec2;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_entity_id_allocation() {
        let mut alloc = EntityAllocator::new();
        let id1 = alloc.allocate();
        let id2 = alloc.allocate();
        assert_ne!(id1, id2);
        assert!(id1 < id2);
        assert!(id1.is_valid());
        assert!(!EntityId::NULL.is_valid());
        assert_eq!(alloc.allocated(), 2);
    }

    #[test]
    fn test_error_display() {
        let err = VisageError::from(ContentError::InvalidArchetype(7));
        assert_eq!(err.to_string(), "Content error: archetype id 7 is out of range");

        let err = AuthorityError::NotAuthoritative {
            entity: EntityId::from_raw(3),
            operation: "take_damage",
        };
        assert_eq!(err.to_string(), "no authority over #3 for take_damage");
    }

    #[test]
    fn test_mix_seed_is_stable_and_distinct() {
        let a = EntityId::from_raw(1);
        let b = EntityId::from_raw(2);
        assert_eq!(a.mix_seed(42), a.mix_seed(42));
        assert_ne!(a.mix_seed(42), b.mix_seed(42));
        assert_ne!(a.mix_seed(42), a.mix_seed(43));
    }

    proptest! {
        #[test]
        fn prop_allocator_is_strictly_increasing(count in 1usize..200) {
            let mut alloc = EntityAllocator::new();
            let mut last = EntityId::NULL;
            for _ in 0..count {
                let next = alloc.allocate();
                prop_assert!(next > last);
                last = next;
            }
        }
    }
}
