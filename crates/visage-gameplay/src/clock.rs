//! Fixed-timestep clock and deadlines.

use serde::{Deserialize, Serialize};

/// Simulation time in seconds.
pub type SimTime = f64;

/// Monotonic simulation clock.
pub trait TickClock {
    /// Time at the start of the current tick.
    fn now(&self) -> SimTime;
    /// Fixed step length in seconds.
    fn delta(&self) -> f32;
}

/// Clock that advances by a fixed delta once per tick.
///
/// Time is derived from the tick count, so it does not drift.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedClock {
    tick: u64,
    delta: f32,
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::from_rate(60)
    }
}

impl FixedClock {
    /// Clock stepping `delta` seconds per tick.
    #[must_use]
    pub const fn new(delta: f32) -> Self {
        Self { tick: 0, delta }
    }

    /// Clock stepping at `hz` ticks per second.
    #[must_use]
    pub fn from_rate(hz: u32) -> Self {
        Self::new(1.0 / hz.max(1) as f32)
    }

    /// Advances one tick.
    pub fn advance(&mut self) {
        self.tick += 1;
    }

    /// Ticks elapsed.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }
}

impl TickClock for FixedClock {
    fn now(&self) -> SimTime {
        self.tick as f64 * f64::from(self.delta)
    }

    fn delta(&self) -> f32 {
        self.delta
    }
}

/// A point in simulation time checked once per tick.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Deadline(SimTime);

impl Deadline {
    /// Deadline at an absolute time.
    #[must_use]
    pub const fn at(time: SimTime) -> Self {
        Self(time)
    }

    /// Deadline `seconds` after `now`.
    #[must_use]
    pub fn after(now: SimTime, seconds: f32) -> Self {
        Self(now + f64::from(seconds))
    }

    /// Absolute due time.
    #[must_use]
    pub const fn time(self) -> SimTime {
        self.0
    }

    /// Returns whether the deadline has been reached.
    #[must_use]
    pub fn is_due(self, now: SimTime) -> bool {
        now >= self.0
    }

    /// Seconds left, zero once due.
    #[must_use]
    pub fn remaining(self, now: SimTime) -> f32 {
        (self.0 - now).max(0.0) as f32
    }
}
