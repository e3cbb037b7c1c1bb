//! Collision layers and layer masks.

use serde::{Deserialize, Serialize};

/// Collision layer an entity lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    /// Player-controlled characters.
    Player,
    /// Hostile agents.
    Enemy,
    /// Pickups, projectiles and other props.
    Prop,
}

impl Layer {
    /// Bit index of this layer inside a [`LayerMask`].
    #[must_use]
    pub const fn bit(self) -> u32 {
        match self {
            Self::Player => 0,
            Self::Enemy => 1,
            Self::Prop => 2,
        }
    }
}

/// Bitmask over [`Layer`]s used to filter queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(u32);

impl LayerMask {
    /// Matches nothing.
    pub const NONE: Self = Self(0);
    /// Matches only players.
    pub const PLAYER: Self = Self(1 << 0);
    /// Matches only enemies.
    pub const ENEMY: Self = Self(1 << 1);
    /// Matches only props.
    pub const PROP: Self = Self(1 << 2);
    /// Matches every layer.
    pub const ALL: Self = Self(u32::MAX);

    /// Creates a mask from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns whether `layer` passes this mask.
    #[must_use]
    pub const fn contains(self, layer: Layer) -> bool {
        self.0 & (1 << layer.bit()) != 0
    }

    /// Returns the union of two masks.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns whether the mask matches no layer.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<Layer> for LayerMask {
    fn from(layer: Layer) -> Self {
        Self(1 << layer.bit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_contains() {
        assert!(LayerMask::PLAYER.contains(Layer::Player));
        assert!(!LayerMask::PLAYER.contains(Layer::Enemy));
        assert!(LayerMask::ALL.contains(Layer::Prop));
        assert!(!LayerMask::NONE.contains(Layer::Player));
    }

    #[test]
    fn test_mask_union() {
        let mask = LayerMask::PLAYER.union(LayerMask::ENEMY);
        assert!(mask.contains(Layer::Player));
        assert!(mask.contains(Layer::Enemy));
        assert!(!mask.contains(Layer::Prop));
    }

    #[test]
    fn test_mask_from_layer() {
        assert_eq!(LayerMask::from(Layer::Enemy), LayerMask::ENEMY);
    }
}
