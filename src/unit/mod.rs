//! Stateful architectural units of the basic computer.
//!
//! Each unit owns its state, mutates it only through its closed event enum
//! and exposes a plain-data snapshot:
//! - [`register`] - AR, PC, DR, AC, IR, TR, SC
//! - [`memory`] - 4096 x 16-bit word store
//! - [`bus`] - shared conductor with conflict detection
//! - [`io`] - INPR/OUTR and the interrupt flags

pub mod signal;
pub mod register;
pub mod memory;
pub mod bus;
pub mod io;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use signal::{Outcome, Phase, Pulse, SIGNAL_DURATION};

/// Uniform event/snapshot protocol of every unit.
pub trait Unit {
    /// Closed set of events the unit understands.
    type Event;
    /// Signal tag raised while the unit is signaling.
    type Signal: Copy;
    /// Read-only view handed to status and visualization layers.
    type Snapshot: Clone + PartialEq + Serialize + DeserializeOwned;

    /// Apply `event`. Unsupported events leave the unit untouched.
    fn dispatch(&mut self, event: Self::Event) -> Outcome;

    /// Let `elapsed` units of simulated time pass.
    fn advance(&mut self, elapsed: u64);

    fn active_signal(&self) -> Option<Self::Signal>;

    fn snapshot(&self) -> Self::Snapshot;

    fn phase(&self) -> Phase {
        if self.active_signal().is_some() {
            Phase::Signaling
        } else {
            Phase::Idle
        }
    }
}
