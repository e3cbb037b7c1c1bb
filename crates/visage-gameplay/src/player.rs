//! Player avatars: commands, money, potions and purchases.
//!
//! The player's body (health, archetype, bonus) lives in the [`Arena`] like
//! any other combatant. [`PlayerState`] holds what only players have.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use visage_common::{AuthorityError, ClientId, EntityId, Layer, LayerMask};

use crate::archetype::{Archetype, AttackRangeClass};
use crate::attack::{AttackExecutor, HitReport};
use crate::authority::{require_authority, Authoritative, AuthorityOracle};
use crate::bonus::{BonusProfile, BonusStats};
use crate::clock::SimTime;
use crate::entity::{Arena, Attacker, Combatant, Damageable};
use crate::items::{ItemCatalogue, ShopError, POTION_SLOTS};
use crate::presentation::{PresentationEvent, SoundCue};

/// Errors that can occur while applying a player command.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlayerError {
    /// Write attempted without authority over the player
    #[error(transparent)]
    Authority(#[from] AuthorityError),

    /// Purchase or potion use refused
    #[error(transparent)]
    Shop(#[from] ShopError),

    /// Player body is not in the arena
    #[error("player body {0} is missing")]
    MissingBody(EntityId),
}

/// Result type for player commands.
pub type PlayerResult<T> = Result<T, PlayerError>;

/// Player tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    /// Damage before modifiers.
    pub base_damage: f32,
    /// Melee circle radius.
    pub melee_radius: f32,
    /// Melee circle distance along the aim.
    pub melee_offset: f32,
    /// Ranged line length.
    pub ranged_range: f32,
    /// Seconds between attacks before attack speed scaling.
    pub attack_cooldown: f32,
    /// Units per second before move speed scaling.
    pub move_speed: f32,
    /// Starting and maximum health.
    pub max_health: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            base_damage: 10.0,
            melee_radius: 1.5,
            melee_offset: 1.0,
            ranged_range: 15.0,
            attack_cooldown: 0.5,
            move_speed: 5.0,
            max_health: 100.0,
        }
    }
}

/// Input from a player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlayerCommand {
    /// Walk along a direction. Longer than unit length is normalized.
    Move(Vec2),
    /// Attack along an aim direction.
    Attack(Vec2),
    /// Change the active archetype.
    SwitchArchetype(Archetype),
    /// Select a potion slot.
    SelectPotion(usize),
    /// Drink the selected potion.
    UsePotion,
    /// Buy one potion into a slot.
    BuyPotion {
        /// Slot to fill.
        slot: usize,
        /// Price charged.
        price: u32,
    },
    /// Buy a permanent buff for one archetype.
    BuyBuff {
        /// Archetype that benefits.
        archetype: Archetype,
        /// Price charged.
        price: u32,
        /// Contribution added.
        stats: BonusStats,
    },
}

/// What a command did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerOutcome {
    /// Nothing happened (dead player, attack on cooldown).
    Ignored,
    /// Velocity changed.
    Moved {
        /// New velocity.
        velocity: Vec2,
    },
    /// Attack went off.
    Attacked(Vec<HitReport>),
    /// Archetype changed.
    Switched(Archetype),
    /// Potion slot selected.
    Selected(usize),
    /// Potion consumed.
    Healed {
        /// Health after healing.
        health: f32,
    },
    /// Purchase completed.
    Purchased {
        /// Money left.
        money: u32,
    },
}

/// Shared collaborators for one command.
pub struct PlayerContext<'a, 'e> {
    /// Current time.
    pub now: SimTime,
    /// Every combatant.
    pub arena: &'a mut Arena,
    /// Hit resolution.
    pub executor: &'a AttackExecutor<'e>,
    /// Potion heal amounts.
    pub catalogue: &'a ItemCatalogue,
    /// Write gate.
    pub authority: &'a dyn AuthorityOracle,
}

/// Per-player state that is not part of the combat body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    id: EntityId,
    client: ClientId,
    money: Authoritative<u32>,
    potions: Authoritative<[u32; POTION_SLOTS]>,
    selected: usize,
    last_attack_at: Option<SimTime>,
    tuning: PlayerTuning,
}

impl PlayerState {
    /// Creates a player with no money and no potions.
    #[must_use]
    pub fn new(id: EntityId, client: ClientId, tuning: PlayerTuning) -> Self {
        Self {
            id,
            client,
            money: Authoritative::new(id, 0),
            potions: Authoritative::new(id, [0; POTION_SLOTS]),
            selected: 0,
            last_attack_at: None,
            tuning,
        }
    }

    /// Builds the arena body for this player.
    #[must_use]
    pub fn body(&self, archetype: Archetype, position: Vec2) -> Combatant {
        Combatant::new(self.id, Layer::Player, archetype, self.tuning.max_health)
            .with_hostile_mask(LayerMask::ENEMY)
            .with_base_damage(self.tuning.base_damage)
            .with_bonus_profile(BonusProfile::per_archetype())
            .with_position(position)
    }

    /// Player entity.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Owning client.
    #[must_use]
    pub const fn client(&self) -> ClientId {
        self.client
    }

    /// Money on hand.
    #[must_use]
    pub fn money(&self) -> u32 {
        self.money.value()
    }

    /// Potion counts per slot.
    #[must_use]
    pub fn potions(&self) -> [u32; POTION_SLOTS] {
        self.potions.value()
    }

    /// Selected potion slot.
    #[must_use]
    pub const fn selected_slot(&self) -> usize {
        self.selected
    }

    /// Tuning.
    #[must_use]
    pub const fn tuning(&self) -> &PlayerTuning {
        &self.tuning
    }

    /// Adds money, e.g. from a pickup.
    pub fn credit(&mut self, amount: u32, authority: &dyn AuthorityOracle) -> Result<u32, AuthorityError> {
        self.money.update(authority, "credit_money", |money| {
            *money = money.saturating_add(amount);
            *money
        })
    }

    /// Applies replicated money and potion counts.
    pub fn apply_replicated(&mut self, money: u32, potions: [u32; POTION_SLOTS]) {
        self.money.apply_replicated(money);
        self.potions.apply_replicated(potions);
    }

    /// Selects the next potion slot, wrapping around.
    pub fn cycle_potion(&mut self, forward: bool) -> usize {
        self.selected = if forward {
            (self.selected + 1) % POTION_SLOTS
        } else {
            (self.selected + POTION_SLOTS - 1) % POTION_SLOTS
        };
        self.selected
    }

    /// Applies one command.
    pub fn apply(&mut self, command: PlayerCommand, ctx: &mut PlayerContext<'_, '_>) -> PlayerResult<PlayerOutcome> {
        if let PlayerCommand::SelectPotion(slot) = command {
            if slot >= POTION_SLOTS {
                return Err(ShopError::InvalidSlot(slot).into());
            }
            self.selected = slot;
            return Ok(PlayerOutcome::Selected(slot));
        }

        require_authority(ctx.authority, self.id, "player_command")?;
        let dead = ctx
            .arena
            .get(self.id)
            .ok_or(PlayerError::MissingBody(self.id))?
            .is_dead();

        match command {
            PlayerCommand::SelectPotion(_) => Ok(PlayerOutcome::Ignored),
            PlayerCommand::Move(_) | PlayerCommand::Attack(_) | PlayerCommand::UsePotion if dead => {
                Ok(PlayerOutcome::Ignored)
            }
            PlayerCommand::Move(direction) => self.walk(direction, ctx),
            PlayerCommand::Attack(aim) => self.attack(aim, ctx),
            PlayerCommand::SwitchArchetype(archetype) => {
                self.body_mut(ctx.arena)?
                    .set_archetype(archetype, ctx.authority)?;
                debug!(player = %self.id, archetype = archetype.display_name(), "archetype switched");
                Ok(PlayerOutcome::Switched(archetype))
            }
            PlayerCommand::UsePotion => self.use_potion(ctx),
            PlayerCommand::BuyPotion { slot, price } => {
                if slot >= POTION_SLOTS {
                    return Err(ShopError::InvalidSlot(slot).into());
                }
                let money = self.charge(price, ctx.authority)?;
                self.potions
                    .update(ctx.authority, "buy_potion", |counts| counts[slot] += 1)?;
                self.purchase_cue(ctx);
                Ok(PlayerOutcome::Purchased { money })
            }
            PlayerCommand::BuyBuff {
                archetype,
                price,
                stats,
            } => {
                if self.money() < price {
                    return Err(ShopError::InsufficientFunds {
                        price,
                        money: self.money(),
                    }
                    .into());
                }
                self.body_mut(ctx.arena)?
                    .grant_bonus(archetype, &stats, ctx.authority)?;
                let money = self.charge(price, ctx.authority)?;
                self.purchase_cue(ctx);
                Ok(PlayerOutcome::Purchased { money })
            }
        }
    }

    fn body_mut<'b>(&self, arena: &'b mut Arena) -> PlayerResult<&'b mut Combatant> {
        arena.get_mut(self.id).ok_or(PlayerError::MissingBody(self.id))
    }

    fn walk(&self, direction: Vec2, ctx: &mut PlayerContext<'_, '_>) -> PlayerResult<PlayerOutcome> {
        let engine = ctx.executor.engine();
        let direction = if direction.length_squared() > 1.0 {
            direction.normalize()
        } else {
            direction
        };
        let body = self.body_mut(ctx.arena)?;
        let multiplier = engine.move_speed_multiplier(body.archetype(), &body.bonus_stats());
        body.velocity = direction * self.tuning.move_speed * multiplier.max(0.0);
        if direction != Vec2::ZERO {
            body.heading = direction.normalize_or_zero();
        }
        Ok(PlayerOutcome::Moved {
            velocity: body.velocity,
        })
    }

    fn attack(&mut self, aim: Vec2, ctx: &mut PlayerContext<'_, '_>) -> PlayerResult<PlayerOutcome> {
        let engine = ctx.executor.engine();
        let body = self.body_mut(ctx.arena)?;
        let archetype = body.archetype();
        let cooldown = engine.scaled_cooldown(self.tuning.attack_cooldown, archetype, &body.bonus_stats());
        if cooldown.is_infinite() {
            return Ok(PlayerOutcome::Ignored);
        }
        let ready = self
            .last_attack_at
            .map_or(true, |at| ctx.now >= at + f64::from(cooldown));
        if !ready {
            return Ok(PlayerOutcome::Ignored);
        }
        self.last_attack_at = Some(ctx.now);

        let aim = if aim.normalize_or_zero() == Vec2::ZERO {
            body.heading
        } else {
            aim.normalize_or_zero()
        };
        body.heading = aim;
        let source = body.attacker_profile();

        let hits = match engine.attack_range_class(archetype) {
            AttackRangeClass::Melee => ctx.executor.melee_circle(
                ctx.arena,
                &source,
                aim,
                self.tuning.melee_offset,
                self.tuning.melee_radius,
            )?,
            AttackRangeClass::Ranged => ctx
                .executor
                .hitscan(ctx.arena, &source, aim, self.tuning.ranged_range)?
                .into_iter()
                .collect(),
        };
        Ok(PlayerOutcome::Attacked(hits))
    }

    fn use_potion(&mut self, ctx: &mut PlayerContext<'_, '_>) -> PlayerResult<PlayerOutcome> {
        let slot = self.selected;
        if self.potions()[slot] == 0 {
            return Err(ShopError::EmptyPotionSlot(slot).into());
        }
        let heal = ctx
            .catalogue
            .potion_heal(slot)
            .ok_or_else(|| ShopError::NotSold(format!("potion slot {slot}")))?;

        let health = self.body_mut(ctx.arena)?.heal(heal, ctx.authority)?;
        self.potions
            .update(ctx.authority, "use_potion", |counts| counts[slot] -= 1)?;
        ctx.executor.presentation().emit(PresentationEvent::Sound {
            entity: self.id,
            cue: SoundCue::Heal,
        });
        debug!(player = %self.id, slot, health, "potion used");
        Ok(PlayerOutcome::Healed { health })
    }

    fn charge(&mut self, price: u32, authority: &dyn AuthorityOracle) -> PlayerResult<u32> {
        let money = self.money();
        if money < price {
            return Err(ShopError::InsufficientFunds { price, money }.into());
        }
        Ok(self.money.update(authority, "spend_money", |money| {
            *money -= price;
            *money
        })?)
    }

    fn purchase_cue(&self, ctx: &PlayerContext<'_, '_>) {
        ctx.executor.presentation().emit(PresentationEvent::Sound {
            entity: self.id,
            cue: SoundCue::Purchase,
        });
    }
}
