//! Pairwise archetype matchups.

use serde::{Deserialize, Serialize};
use visage_common::{ContentError, ContentResult};

use crate::archetype::Archetype;

/// Modifier pair applied when one archetype hits another.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchupModifier {
    /// Added to the damage multiplier on the dealing side.
    pub damage_dealt_modifier: f32,
    /// Added to the damage multiplier on the receiving side.
    pub damage_taken_modifier: f32,
}

impl MatchupModifier {
    /// Neutral cell.
    pub const DEFAULT: Self = Self::new(0.0, 0.0);
    /// Attacker has the upper hand.
    pub const ADVANTAGE: Self = Self::new(0.3, -0.2);
    /// Attacker is countered.
    pub const DISADVANTAGE: Self = Self::new(-0.3, 0.2);

    /// Creates a modifier pair.
    #[must_use]
    pub const fn new(damage_dealt_modifier: f32, damage_taken_modifier: f32) -> Self {
        Self {
            damage_dealt_modifier,
            damage_taken_modifier,
        }
    }

    /// Sum of both sides.
    #[must_use]
    pub fn total(&self) -> f32 {
        self.damage_dealt_modifier + self.damage_taken_modifier
    }
}

/// One authored cell, as found in content files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchupEntry {
    /// Attacking archetype.
    pub attacker: Archetype,
    /// Defending archetype.
    pub defender: Archetype,
    /// Cell value.
    pub modifier: MatchupModifier,
}

const N: usize = Archetype::COUNT;

/// Dense `N x N` matchup lookup. Every cell is defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupTable {
    cells: [[MatchupModifier; N]; N],
}

impl Default for MatchupTable {
    fn default() -> Self {
        use Archetype::{Angry, Happy, Sad};
        let mut cells = [[MatchupModifier::DEFAULT; N]; N];
        for (attacker, defender) in [(Angry, Sad), (Sad, Happy), (Happy, Angry)] {
            cells[attacker.index()][defender.index()] = MatchupModifier::ADVANTAGE;
        }
        Self { cells }
    }
}

impl MatchupTable {
    /// Creates a table from fully populated rows (`rows[attacker][defender]`).
    #[must_use]
    pub const fn from_rows(cells: [[MatchupModifier; N]; N]) -> Self {
        Self { cells }
    }

    /// Creates a table from an authored entry list.
    ///
    /// Fails if any cell is missing or authored twice.
    pub fn from_entries(entries: &[MatchupEntry]) -> ContentResult<Self> {
        let mut builder = MatchupTableBuilder::new();
        for entry in entries {
            builder.set(entry.attacker, entry.defender, entry.modifier)?;
        }
        builder.build()
    }

    /// Looks up the cell for an ordered pair.
    #[must_use]
    pub fn get(&self, attacker: Archetype, defender: Archetype) -> MatchupModifier {
        self.cells[attacker.index()][defender.index()]
    }

    /// Flattens the table back into entries, row-major.
    #[must_use]
    pub fn entries(&self) -> Vec<MatchupEntry> {
        let mut out = Vec::with_capacity(N * N);
        for attacker in Archetype::all() {
            for defender in Archetype::all() {
                out.push(MatchupEntry {
                    attacker,
                    defender,
                    modifier: self.get(attacker, defender),
                });
            }
        }
        out
    }
}

/// Incremental matchup authoring.
#[derive(Debug, Clone, Default)]
pub struct MatchupTableBuilder {
    cells: [[Option<MatchupModifier>; N]; N],
}

impl MatchupTableBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Authors a single cell.
    pub fn set(
        &mut self,
        attacker: Archetype,
        defender: Archetype,
        modifier: MatchupModifier,
    ) -> ContentResult<&mut Self> {
        let cell = &mut self.cells[attacker.index()][defender.index()];
        if cell.is_some() {
            return Err(ContentError::DuplicateMatchup {
                attacker: attacker.index() as u8,
                defender: defender.index() as u8,
            });
        }
        *cell = Some(modifier);
        Ok(self)
    }

    /// Authors every still-empty cell with [`MatchupModifier::DEFAULT`].
    pub fn fill_default(&mut self) -> &mut Self {
        for row in &mut self.cells {
            for cell in row.iter_mut().filter(|c| c.is_none()) {
                *cell = Some(MatchupModifier::DEFAULT);
            }
        }
        self
    }

    /// Finishes the table. Every cell must have been authored.
    pub fn build(&self) -> ContentResult<MatchupTable> {
        let mut cells = [[MatchupModifier::DEFAULT; N]; N];
        for (a, row) in self.cells.iter().enumerate() {
            for (d, cell) in row.iter().enumerate() {
                cells[a][d] = cell.ok_or(ContentError::MissingMatchup {
                    attacker: a as u8,
                    defender: d as u8,
                })?;
            }
        }
        Ok(MatchupTable { cells })
    }
}
