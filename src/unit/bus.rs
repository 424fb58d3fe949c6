//! Common bus unit.
//!
//! A single 16-bit conductor. Whoever drives last owns the value; if a
//! second, different source drives before a release the bus records a
//! conflict but still completes the transfer.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{event, Level};

use crate::arith;
use crate::unit::register::hex_width;
use crate::unit::{Outcome, Pulse, Unit, SIGNAL_DURATION};

/// Width of the bus.
pub const BUS_BITS: u32 = 16;

/// Units attached to the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusSource {
    #[default]
    None,
    Ar,
    Pc,
    Dr,
    Ac,
    Ir,
    Tr,
    Mem,
    Inpr,
    Outr,
}

impl fmt::Display for BusSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BusSource::None => "none",
            BusSource::Ar => "AR",
            BusSource::Pc => "PC",
            BusSource::Dr => "DR",
            BusSource::Ac => "AC",
            BusSource::Ir => "IR",
            BusSource::Tr => "TR",
            BusSource::Mem => "M",
            BusSource::Inpr => "INPR",
            BusSource::Outr => "OUTR",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BusEvent {
    Drive { source: BusSource, value: u64 },
    Read { destination: BusSource },
    Release,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusSignal {
    Drive,
    Read,
    Release,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusSnapshot {
    pub value: u16,
    pub active_source: BusSource,
    pub conflict: bool,
    pub last_destination: BusSource,
    pub last_operation: String,
    pub active_signal: Option<BusSignal>,
}

#[derive(Debug, Clone)]
pub struct Bus {
    value: u16,
    active_source: BusSource,
    conflict: bool,
    last_destination: BusSource,
    last_operation: String,
    pulse: Pulse<BusSignal>,
}

impl Bus {
    pub fn new() -> Self {
        Self::with_signal_duration(SIGNAL_DURATION)
    }

    pub fn with_signal_duration(duration: u64) -> Self {
        Self {
            value: 0,
            active_source: BusSource::None,
            conflict: false,
            last_destination: BusSource::None,
            last_operation: String::new(),
            pulse: Pulse::new(duration),
        }
    }

    pub fn value(&self) -> u16 {
        self.value
    }

    pub fn active_source(&self) -> BusSource {
        self.active_source
    }

    pub fn conflict(&self) -> bool {
        self.conflict
    }

    pub fn last_destination(&self) -> BusSource {
        self.last_destination
    }

    /// Put `value` on the bus from `source`.
    ///
    /// Driving from `BusSource::None` is meaningless and is ignored.
    pub fn drive(&mut self, source: BusSource, value: u64) -> Outcome {
        if source == BusSource::None {
            event!(Level::TRACE, unit = "bus", "ignoring drive with no source");
            return Outcome::Ignored;
        }
        self.conflict =
            self.active_source != BusSource::None && self.active_source != source;
        if self.conflict {
            event!(
                Level::WARN,
                "bus conflict: {} drove while {} still held the bus",
                source,
                self.active_source
            );
        }
        self.value = arith::mask(value, BUS_BITS) as u16;
        self.active_source = source;
        let label = format!("bus <- {} ({})", source, hex_width(u64::from(self.value), BUS_BITS));
        self.record(BusSignal::Drive, label);
        Outcome::Accepted
    }

    /// Note that `destination` sampled the bus. The value is unchanged.
    pub fn read(&mut self, destination: BusSource) -> Outcome {
        if destination == BusSource::None {
            event!(Level::TRACE, unit = "bus", "ignoring read with no destination");
            return Outcome::Ignored;
        }
        self.last_destination = destination;
        let label = format!("{} <- bus ({})", destination, hex_width(u64::from(self.value), BUS_BITS));
        self.record(BusSignal::Read, label);
        Outcome::Accepted
    }

    /// Let go of the bus. Clears the driver and any recorded conflict.
    pub fn release(&mut self) -> Outcome {
        self.active_source = BusSource::None;
        self.conflict = false;
        self.record(BusSignal::Release, "release bus".to_string());
        Outcome::Accepted
    }

    fn record(&mut self, signal: BusSignal, label: String) {
        event!(Level::DEBUG, unit = "bus", "{}", label);
        self.last_operation = label;
        self.pulse.fire(signal);
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Unit for Bus {
    type Event = BusEvent;
    type Signal = BusSignal;
    type Snapshot = BusSnapshot;

    fn dispatch(&mut self, event: BusEvent) -> Outcome {
        match event {
            BusEvent::Drive { source, value } => self.drive(source, value),
            BusEvent::Read { destination } => self.read(destination),
            BusEvent::Release => self.release(),
            BusEvent::Unknown => {
                event!(Level::TRACE, unit = "bus", "ignoring unknown event");
                Outcome::Ignored
            }
        }
    }

    fn advance(&mut self, elapsed: u64) {
        if self.pulse.advance(elapsed) {
            event!(Level::TRACE, unit = "bus", "signal dropped");
        }
    }

    fn active_signal(&self) -> Option<BusSignal> {
        self.pulse.active()
    }

    fn snapshot(&self) -> BusSnapshot {
        BusSnapshot {
            value: self.value,
            active_source: self.active_source,
            conflict: self.conflict,
            last_destination: self.last_destination,
            last_operation: self.last_operation.clone(),
            active_signal: self.pulse.active(),
        }
    }
}
