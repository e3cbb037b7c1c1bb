//! Presentation sink for cosmetic cues.
//!
//! Postures, headings, sounds and damage numbers are published fire-and-forget.
//! Nothing here feeds back into simulation state or timing.

use crossbeam_channel::{bounded, Receiver, Sender};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use visage_common::EntityId;

/// Body posture shown by the animator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Posture {
    /// Standing still.
    Idle,
    /// Walking.
    Move,
    /// Swinging or firing.
    Attack,
    /// Flinching from a hit.
    Hurt,
    /// Lying dead.
    Dead,
}

/// Audio cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundCue {
    /// Melee swing started.
    Swing,
    /// Projectile or shot fired.
    Fire,
    /// Damage landed.
    Hit,
    /// Entity hurt.
    Hurt,
    /// Entity died.
    Death,
    /// Money collected.
    Pickup,
    /// Shop purchase.
    Purchase,
    /// Potion drunk.
    Heal,
}

/// Event types that can be sent to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PresentationEvent {
    /// Posture change
    Posture {
        /// Entity
        entity: EntityId,
        /// New posture
        posture: Posture,
    },
    /// Facing change
    Heading {
        /// Entity
        entity: EntityId,
        /// Unit heading
        heading: Vec2,
    },
    /// Sound cue at a location
    Sound {
        /// Source entity
        entity: EntityId,
        /// Cue
        cue: SoundCue,
    },
    /// Floating damage number
    DamageNumber {
        /// Entity that was hit
        entity: EntityId,
        /// World position of the number
        position: Vec2,
        /// Damage shown
        amount: f32,
    },
    /// Shop NPC shown or hidden
    NpcVisibility {
        /// Visible flag
        visible: bool,
    },
}

/// Receiver of cosmetic cues. Must never block.
pub trait PresentationSink {
    /// Publishes an event. May drop it.
    fn emit(&self, event: PresentationEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresentation;

impl PresentationSink for NullPresentation {
    fn emit(&self, _event: PresentationEvent) {}
}

/// Bounded channel sink. Full channels drop events.
#[derive(Debug)]
pub struct ChannelPresentation {
    sender: Sender<PresentationEvent>,
    receiver: Receiver<PresentationEvent>,
    capacity: usize,
    dropped: AtomicU64,
}

impl Default for ChannelPresentation {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl ChannelPresentation {
    /// Creates a sink with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<PresentationEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events dropped because the channel was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Receiver handle for a consumer on another thread.
    #[must_use]
    pub fn receiver(&self) -> Receiver<PresentationEvent> {
        self.receiver.clone()
    }
}

impl PresentationSink for ChannelPresentation {
    fn emit(&self, event: PresentationEvent) {
        if self.sender.try_send(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_roundtrip() {
        let sink = ChannelPresentation::new(8);
        sink.emit(PresentationEvent::NpcVisibility { visible: true });
        sink.emit(PresentationEvent::Sound {
            entity: EntityId::from_raw(1),
            cue: SoundCue::Swing,
        });
        assert_eq!(sink.pending_count(), 2);
        let events = sink.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], PresentationEvent::NpcVisibility { visible: true });
        assert_eq!(sink.pending_count(), 0);
    }

    #[test]
    fn test_full_channel_drops_without_blocking() {
        let sink = ChannelPresentation::new(2);
        for _ in 0..5 {
            sink.emit(PresentationEvent::NpcVisibility { visible: false });
        }
        assert_eq!(sink.pending_count(), 2);
        assert_eq!(sink.dropped(), 3);
        assert_eq!(sink.capacity(), 2);
    }

    #[test]
    fn test_null_sink() {
        NullPresentation.emit(PresentationEvent::NpcVisibility { visible: true });
    }
}
