//! Items and the shop catalogue.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::archetype::Archetype;
use crate::bonus::BonusStats;

/// Number of potion slots a player carries.
pub const POTION_SLOTS: usize = 3;

/// Error types for shop and inventory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShopError {
    /// Not enough money
    #[error("insufficient funds: need {price}, have {money}")]
    InsufficientFunds {
        /// Item price
        price: u32,
        /// Money on hand
        money: u32,
    },
    /// Potion slot index out of range
    #[error("potion slot {0} does not exist")]
    InvalidSlot(usize),
    /// Selected slot holds no potions
    #[error("potion slot {0} is empty")]
    EmptyPotionSlot(usize),
    /// Catalogue has no item for the request
    #[error("item not sold: {0}")]
    NotSold(String),
}

/// Result type for shop operations.
pub type ShopResult<T> = Result<T, ShopError>;

/// What an item does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemKind {
    /// Consumable heal stored in a potion slot.
    Potion {
        /// Slot index.
        slot: usize,
        /// Health restored.
        heal: f32,
    },
    /// Permanent bonus for one archetype, applied on purchase.
    Buff {
        /// Archetype that benefits.
        archetype: Archetype,
        /// Contribution added to that archetype's accumulator.
        stats: BonusStats,
    },
}

/// A sellable item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemData {
    /// Display name.
    pub name: String,
    /// Price in money.
    pub price: u32,
    /// Effect.
    pub kind: ItemKind,
}

impl ItemData {
    /// Creates a potion.
    #[must_use]
    pub fn potion(name: &str, price: u32, slot: usize, heal: f32) -> Self {
        Self {
            name: name.to_string(),
            price,
            kind: ItemKind::Potion { slot, heal },
        }
    }

    /// Creates a buff.
    #[must_use]
    pub fn buff(name: &str, price: u32, archetype: Archetype, stats: BonusStats) -> Self {
        Self {
            name: name.to_string(),
            price,
            kind: ItemKind::Buff { archetype, stats },
        }
    }
}

/// Everything the shop sells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemCatalogue {
    items: Vec<ItemData>,
}

impl Default for ItemCatalogue {
    fn default() -> Self {
        Self {
            items: vec![
                ItemData::potion("Small Potion", 10, 0, 20.0),
                ItemData::potion("Potion", 25, 1, 50.0),
                ItemData::potion("Large Potion", 45, 2, 100.0),
                ItemData::buff(
                    "White Ribbon",
                    30,
                    Archetype::Neutral,
                    BonusStats::new().with_attack(0.05).with_move_speed(0.05),
                ),
                ItemData::buff(
                    "Yellow Ribbon",
                    30,
                    Archetype::Happy,
                    BonusStats::new().with_move_speed(0.1).with_attack_speed(0.1),
                ),
                ItemData::buff(
                    "Blue Ribbon",
                    30,
                    Archetype::Sad,
                    BonusStats::new().with_damage_taken(-0.1),
                ),
                ItemData::buff(
                    "Red Ribbon",
                    30,
                    Archetype::Angry,
                    BonusStats::new().with_attack(0.1),
                ),
            ],
        }
    }
}

impl ItemCatalogue {
    /// Creates a catalogue from authored items.
    #[must_use]
    pub fn new(items: Vec<ItemData>) -> Self {
        Self { items }
    }

    /// Every item in display order.
    #[must_use]
    pub fn items(&self) -> &[ItemData] {
        &self.items
    }

    /// Looks up an item by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ItemData> {
        self.items.iter().find(|item| item.name == name)
    }

    /// Potion stored in `slot`.
    #[must_use]
    pub fn potion(&self, slot: usize) -> Option<&ItemData> {
        self.items
            .iter()
            .find(|item| matches!(item.kind, ItemKind::Potion { slot: s, .. } if s == slot))
    }

    /// Heal amount of the potion in `slot`.
    #[must_use]
    pub fn potion_heal(&self, slot: usize) -> Option<f32> {
        self.potion(slot).and_then(|item| match item.kind {
            ItemKind::Potion { heal, .. } => Some(heal),
            ItemKind::Buff { .. } => None,
        })
    }

    /// Buffs sold for an archetype.
    pub fn buffs_for(&self, archetype: Archetype) -> impl Iterator<Item = &ItemData> {
        self.items.iter().filter(
            move |item| matches!(item.kind, ItemKind::Buff { archetype: a, .. } if a == archetype),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_potions() {
        let catalogue = ItemCatalogue::default();
        assert_eq!(catalogue.potion_heal(0), Some(20.0));
        assert_eq!(catalogue.potion_heal(1), Some(50.0));
        assert_eq!(catalogue.potion_heal(2), Some(100.0));
        assert_eq!(catalogue.potion_heal(3), None);
    }

    #[test]
    fn test_one_buff_per_archetype() {
        let catalogue = ItemCatalogue::default();
        for archetype in Archetype::all() {
            assert_eq!(catalogue.buffs_for(archetype).count(), 1);
        }
        assert!(catalogue.get("Red Ribbon").is_some());
        assert!(catalogue.get("Green Ribbon").is_none());
    }

    #[test]
    fn test_error_display() {
        let err = ShopError::InsufficientFunds { price: 30, money: 12 };
        assert_eq!(err.to_string(), "insufficient funds: need 30, have 12");
    }
}
