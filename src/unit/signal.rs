//! The idle/signaling timing contract shared by every unit.
//!
//! A unit that accepts an event raises a signal tag naming the data path that
//! fired. The tag stays up for a fixed duration of simulated time and then
//! drops on its own. Only one expiry is ever pending per unit: firing again
//! replaces the pending one.

use serde::{Deserialize, Serialize};

/// Default number of simulated time units a signal stays up.
pub const SIGNAL_DURATION: u64 = 160;

/// Whether a unit acted on an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// State was mutated and the signal re-armed.
    Accepted,
    /// Unknown or unsupported event; nothing changed.
    Ignored,
}

impl Outcome {
    pub fn is_accepted(self) -> bool {
        self == Outcome::Accepted
    }
}

/// Idle or signaling phase of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Signaling,
}

/// A single transient signal with its pending expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pulse<S> {
    active: Option<S>,
    remaining: u64,
    duration: u64,
}

impl<S: Copy> Pulse<S> {
    pub fn new(duration: u64) -> Self {
        Self {
            active: None,
            remaining: 0,
            duration,
        }
    }

    /// Raise `signal`, cancelling whatever expiry was pending.
    pub fn fire(&mut self, signal: S) {
        self.active = Some(signal);
        self.remaining = self.duration;
    }

    /// Let `elapsed` units of simulated time pass.
    ///
    /// Returns true if the signal dropped during this call.
    pub fn advance(&mut self, elapsed: u64) -> bool {
        if self.active.is_none() {
            return false;
        }
        if elapsed >= self.remaining {
            self.active = None;
            self.remaining = 0;
            true
        } else {
            self.remaining -= elapsed;
            false
        }
    }

    pub fn active(&self) -> Option<S> {
        self.active
    }

    /// Time left before the signal drops, if one is up.
    pub fn remaining(&self) -> Option<u64> {
        self.active.map(|_| self.remaining)
    }

    pub fn phase(&self) -> Phase {
        if self.active.is_some() {
            Phase::Signaling
        } else {
            Phase::Idle
        }
    }
}

impl<S: Copy> Default for Pulse<S> {
    fn default() -> Self {
        Self::new(SIGNAL_DURATION)
    }
}
