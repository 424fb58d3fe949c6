//! Input/output registers and the interrupt flags.
//!
//! INPR and OUTR are 8-bit character registers. `e` is the interrupt enable
//! flip-flop and `i` the interrupt request; both are single bits.

use serde::{Deserialize, Serialize};
use tracing::{event, Level};

use crate::arith;
use crate::unit::register::hex_width;
use crate::unit::{Outcome, Pulse, Unit, SIGNAL_DURATION};

/// Width of INPR and OUTR.
pub const CHAR_BITS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum IoEvent {
    LoadInpr { value: u64 },
    ClearInpr,
    LoadOutr { value: u64 },
    ClearOutr,
    SetE { value: u64 },
    ToggleE,
    SetI { value: u64 },
    ToggleI,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoSignal {
    Inpr,
    Outr,
    E,
    I,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoSnapshot {
    pub inpr: u8,
    pub outr: u8,
    pub e: bool,
    pub i: bool,
    pub last_operation: String,
    pub active_signal: Option<IoSignal>,
}

#[derive(Debug, Clone)]
pub struct IoFlags {
    inpr: u8,
    outr: u8,
    e: bool,
    i: bool,
    last_operation: String,
    pulse: Pulse<IoSignal>,
}

impl IoFlags {
    pub fn new() -> Self {
        Self::with_signal_duration(SIGNAL_DURATION)
    }

    pub fn with_signal_duration(duration: u64) -> Self {
        Self {
            inpr: 0,
            outr: 0,
            e: false,
            i: false,
            last_operation: String::new(),
            pulse: Pulse::new(duration),
        }
    }

    pub fn inpr(&self) -> u8 {
        self.inpr
    }

    pub fn outr(&self) -> u8 {
        self.outr
    }

    pub fn e(&self) -> bool {
        self.e
    }

    pub fn i(&self) -> bool {
        self.i
    }

    pub fn load_inpr(&mut self, value: u64) -> Outcome {
        self.inpr = arith::mask(value, CHAR_BITS) as u8;
        let label = format!("INPR <- {}", hex_width(u64::from(self.inpr), CHAR_BITS));
        self.record(IoSignal::Inpr, label)
    }

    pub fn clear_inpr(&mut self) -> Outcome {
        self.inpr = 0;
        self.record(IoSignal::Inpr, "INPR <- 0".to_string())
    }

    pub fn load_outr(&mut self, value: u64) -> Outcome {
        self.outr = arith::mask(value, CHAR_BITS) as u8;
        let label = format!("OUTR <- {}", hex_width(u64::from(self.outr), CHAR_BITS));
        self.record(IoSignal::Outr, label)
    }

    pub fn clear_outr(&mut self) -> Outcome {
        self.outr = 0;
        self.record(IoSignal::Outr, "OUTR <- 0".to_string())
    }

    pub fn set_e(&mut self, value: u64) -> Outcome {
        self.e = arith::mask(value, 1) == 1;
        let label = format!("E <- {}", u8::from(self.e));
        self.record(IoSignal::E, label)
    }

    pub fn toggle_e(&mut self) -> Outcome {
        self.e = !self.e;
        let label = format!("E <- ~E ({})", u8::from(self.e));
        self.record(IoSignal::E, label)
    }

    pub fn set_i(&mut self, value: u64) -> Outcome {
        self.i = arith::mask(value, 1) == 1;
        let label = format!("I <- {}", u8::from(self.i));
        self.record(IoSignal::I, label)
    }

    pub fn toggle_i(&mut self) -> Outcome {
        self.i = !self.i;
        let label = format!("I <- ~I ({})", u8::from(self.i));
        self.record(IoSignal::I, label)
    }

    fn record(&mut self, signal: IoSignal, label: String) -> Outcome {
        event!(Level::DEBUG, unit = "io", "{}", label);
        self.last_operation = label;
        self.pulse.fire(signal);
        Outcome::Accepted
    }
}

impl Default for IoFlags {
    fn default() -> Self {
        Self::new()
    }
}

impl Unit for IoFlags {
    type Event = IoEvent;
    type Signal = IoSignal;
    type Snapshot = IoSnapshot;

    fn dispatch(&mut self, event: IoEvent) -> Outcome {
        match event {
            IoEvent::LoadInpr { value } => self.load_inpr(value),
            IoEvent::ClearInpr => self.clear_inpr(),
            IoEvent::LoadOutr { value } => self.load_outr(value),
            IoEvent::ClearOutr => self.clear_outr(),
            IoEvent::SetE { value } => self.set_e(value),
            IoEvent::ToggleE => self.toggle_e(),
            IoEvent::SetI { value } => self.set_i(value),
            IoEvent::ToggleI => self.toggle_i(),
            IoEvent::Unknown => {
                event!(Level::TRACE, unit = "io", "ignoring unknown event");
                Outcome::Ignored
            }
        }
    }

    fn advance(&mut self, elapsed: u64) {
        if self.pulse.advance(elapsed) {
            event!(Level::TRACE, unit = "io", "signal dropped");
        }
    }

    fn active_signal(&self) -> Option<IoSignal> {
        self.pulse.active()
    }

    fn snapshot(&self) -> IoSnapshot {
        IoSnapshot {
            inpr: self.inpr,
            outr: self.outr,
            e: self.e,
            i: self.i,
            last_operation: self.last_operation.clone(),
            active_signal: self.pulse.active(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_registers_mask() {
        let mut io = IoFlags::new();
        io.load_inpr(0x141);
        assert_eq!(io.inpr(), 0x41);
        io.dispatch(IoEvent::LoadOutr { value: 0xFFFF });
        assert_eq!(io.outr(), 0xFF);
        io.dispatch(IoEvent::ClearOutr);
        assert_eq!(io.outr(), 0);
        // INPR is independent of OUTR.
        assert_eq!(io.inpr(), 0x41);
    }

    #[test]
    fn test_flags_set_and_toggle() {
        let mut io = IoFlags::new();
        io.dispatch(IoEvent::SetE { value: 1 });
        assert!(io.e());
        io.dispatch(IoEvent::ToggleE);
        assert!(!io.e());
        io.dispatch(IoEvent::SetI { value: 3 });
        assert!(io.i());
        io.dispatch(IoEvent::SetI { value: 2 });
        assert!(!io.i());
        io.dispatch(IoEvent::ToggleI);
        assert!(io.i());
        assert_eq!(io.active_signal(), Some(IoSignal::I));
    }

    #[test]
    fn test_unknown_event_ignored() {
        let mut io = IoFlags::new();
        let ev: IoEvent = serde_json::from_str(r#"{"op":"eject_tape"}"#).unwrap();
        assert_eq!(io.dispatch(ev), Outcome::Ignored);
        assert_eq!(io.snapshot().last_operation, "");
    }

    #[test]
    fn test_signal_auto_clear() {
        let mut io = IoFlags::new();
        io.load_inpr(0x30);
        io.advance(SIGNAL_DURATION);
        let snap = io.snapshot();
        assert_eq!(snap.active_signal, None);
        assert_eq!(snap.inpr, 0x30);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut io = IoFlags::new();
        io.load_outr(0x5A);
        io.toggle_e();
        let snap = io.snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        let back: IoSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }
}
