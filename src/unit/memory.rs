//! Memory unit.
//!
//! 4096 words of 16 bits, word-addressed. Addresses are masked to 12 bits
//! and values to 16 bits on the way in, so every access lands somewhere.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use tracing::{event, Level};

use crate::arith;
use crate::unit::register::hex_width;
use crate::unit::{Outcome, Pulse, Unit, SIGNAL_DURATION};

/// Number of words in memory.
pub const MEMORY_SIZE: usize = 4096;
/// Width of an address.
pub const ADDRESS_BITS: u32 = 12;
/// Width of a word.
pub const WORD_BITS: u32 = 16;

/// Contents handed to a bulk load.
///
/// Serialized as a JSON array (sequence) or object (sparse). Object keys may
/// be decimal strings, which is the only way JSON can carry them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BulkData {
    /// Words for addresses `0..n`.
    Sequence(Vec<u64>),
    /// Address to word.
    Sparse(BTreeMap<u64, u64>),
}

impl<'de> Deserialize<'de> for BulkData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BulkVisitor;

        impl<'de> Visitor<'de> for BulkVisitor {
            type Value = BulkData;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a sequence of words or a map of address to word")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<BulkData, A::Error> {
                let mut words = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(word) = seq.next_element::<u64>()? {
                    words.push(word);
                }
                Ok(BulkData::Sequence(words))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<BulkData, A::Error> {
                let mut entries = BTreeMap::new();
                while let Some((AddressKey(address), word)) = map.next_entry::<AddressKey, u64>()? {
                    entries.insert(address, word);
                }
                Ok(BulkData::Sparse(entries))
            }
        }

        deserializer.deserialize_any(BulkVisitor)
    }
}

/// Map key accepted either as an integer or as a decimal string.
struct AddressKey(u64);

impl<'de> Deserialize<'de> for AddressKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyVisitor;

        impl<'de> Visitor<'de> for KeyVisitor {
            type Value = AddressKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an address")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<AddressKey, E> {
                Ok(AddressKey(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<AddressKey, E> {
                v.trim()
                    .parse()
                    .map(AddressKey)
                    .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_any(KeyVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MemoryEvent {
    Read { address: u64 },
    Write { address: u64, value: u64 },
    BulkLoad { data: BulkData },
    ClearAll,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemorySignal {
    Read,
    Write,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub words: Vec<u16>,
    pub last_address: u16,
    pub last_value: u16,
    pub last_operation: String,
    pub active_signal: Option<MemorySignal>,
}

/// The main memory array.
#[derive(Clone)]
pub struct Memory {
    words: Box<[u16]>,
    last_address: u16,
    last_value: u16,
    last_operation: String,
    pulse: Pulse<MemorySignal>,
}

impl Memory {
    /// Create a zeroed memory with the default signal duration.
    pub fn new() -> Self {
        Self::with_signal_duration(SIGNAL_DURATION)
    }

    pub fn with_signal_duration(duration: u64) -> Self {
        Self {
            words: vec![0u16; MEMORY_SIZE].into_boxed_slice(),
            last_address: 0,
            last_value: 0,
            last_operation: String::new(),
            pulse: Pulse::new(duration),
        }
    }

    /// `M[AR]` read. Records the access and returns the word.
    pub fn read(&mut self, address: u64) -> u16 {
        let index = Self::index(address);
        let value = self.words[index];
        self.last_address = index as u16;
        self.last_value = value;
        self.record(
            MemorySignal::Read,
            format!("read M[{}] = {}", addr_hex(index), word_hex(value)),
        );
        value
    }

    /// `M[AR] <- value`, updated in place.
    pub fn write(&mut self, address: u64, value: u64) -> Outcome {
        let index = Self::index(address);
        let value = arith::mask(value, WORD_BITS) as u16;
        self.words[index] = value;
        self.last_address = index as u16;
        self.last_value = value;
        self.record(
            MemorySignal::Write,
            format!("M[{}] <- {}", addr_hex(index), word_hex(value)),
        );
        Outcome::Accepted
    }

    /// Load a program image.
    ///
    /// Entries at addresses beyond the end of memory are dropped without
    /// error. Returns the number of words stored.
    pub fn bulk_load(&mut self, data: &BulkData) -> usize {
        let entries: Vec<(u64, u64)> = match data {
            BulkData::Sequence(words) => words
                .iter()
                .enumerate()
                .map(|(i, &w)| (i as u64, w))
                .collect(),
            BulkData::Sparse(map) => map.iter().map(|(&a, &w)| (a, w)).collect(),
        };

        let mut stored = 0;
        let mut dropped = 0;
        for (address, word) in entries {
            match usize::try_from(address) {
                Ok(index) if index < MEMORY_SIZE => {
                    self.words[index] = arith::mask(word, WORD_BITS) as u16;
                    stored += 1;
                }
                _ => dropped += 1,
            }
        }
        if dropped > 0 {
            event!(
                Level::WARN,
                "bulk load dropped {} entries outside {} words of memory",
                dropped,
                MEMORY_SIZE
            );
        }
        self.record(MemorySignal::Write, format!("bulk load {} words", stored));
        stored
    }

    /// Zero every word and forget the last access.
    pub fn clear_all(&mut self) -> Outcome {
        self.words.fill(0);
        self.last_address = 0;
        self.last_value = 0;
        self.record(MemorySignal::Clear, "clear memory".to_string());
        Outcome::Accepted
    }

    /// Look at a word without recording an access.
    pub fn peek(&self, address: u64) -> u16 {
        self.words[Self::index(address)]
    }

    pub fn last_address(&self) -> u16 {
        self.last_address
    }

    pub fn last_value(&self) -> u16 {
        self.last_value
    }

    pub fn last_operation(&self) -> &str {
        &self.last_operation
    }

    /// Every non-zero word with its address.
    pub fn non_zero(&self) -> Vec<(usize, u16)> {
        self.words
            .iter()
            .enumerate()
            .filter(|(_, &w)| w != 0)
            .map(|(i, &w)| (i, w))
            .collect()
    }

    fn index(address: u64) -> usize {
        arith::mask(address, ADDRESS_BITS) as usize
    }

    fn record(&mut self, signal: MemorySignal, label: String) {
        event!(Level::DEBUG, unit = "memory", "{}", label);
        self.last_operation = label;
        self.pulse.fire(signal);
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only count non-zero words
        let non_zero = self.words.iter().filter(|&&w| w != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_words", &non_zero)
            .field("total_words", &MEMORY_SIZE)
            .field("last_address", &self.last_address)
            .field("active_signal", &self.pulse.active())
            .finish()
    }
}

impl Unit for Memory {
    type Event = MemoryEvent;
    type Signal = MemorySignal;
    type Snapshot = MemorySnapshot;

    fn dispatch(&mut self, event: MemoryEvent) -> Outcome {
        match event {
            MemoryEvent::Read { address } => {
                self.read(address);
                Outcome::Accepted
            }
            MemoryEvent::Write { address, value } => self.write(address, value),
            MemoryEvent::BulkLoad { data } => {
                self.bulk_load(&data);
                Outcome::Accepted
            }
            MemoryEvent::ClearAll => self.clear_all(),
            MemoryEvent::Unknown => {
                event!(Level::TRACE, unit = "memory", "ignoring unknown event");
                Outcome::Ignored
            }
        }
    }

    fn advance(&mut self, elapsed: u64) {
        if self.pulse.advance(elapsed) {
            event!(Level::TRACE, unit = "memory", "signal dropped");
        }
    }

    fn active_signal(&self) -> Option<MemorySignal> {
        self.pulse.active()
    }

    fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            words: self.words.to_vec(),
            last_address: self.last_address,
            last_value: self.last_value,
            last_operation: self.last_operation.clone(),
            active_signal: self.pulse.active(),
        }
    }
}

fn addr_hex(index: usize) -> String {
    hex_width(index as u64, ADDRESS_BITS)
}

fn word_hex(value: u16) -> String {
    hex_width(u64::from(value), WORD_BITS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_memory_read_write() {
        let mut mem = Memory::new();
        mem.write(10, 0x1234);
        assert_eq!(mem.read(10), 0x1234);
        assert_eq!(mem.last_address(), 10);
        assert_eq!(mem.last_value(), 0x1234);
        assert_eq!(mem.last_operation(), "read M[0x00A] = 0x1234");
    }

    #[test]
    fn test_address_aliasing() {
        let mut mem = Memory::new();
        mem.dispatch(MemoryEvent::Write {
            address: 0xFFFF,
            value: 0xCAFE,
        });
        assert_eq!(mem.read(0x0FFF), 0xCAFE);
    }

    #[test]
    fn test_value_masking() {
        let mut mem = Memory::new();
        mem.write(0, 0x1_BEEF);
        assert_eq!(mem.peek(0), 0xBEEF);
    }

    #[test]
    fn test_bulk_load_sparse() {
        let mut mem = Memory::new();
        let data = BulkData::Sparse(BTreeMap::from([(0, 0x1111), (1, 0x2222), (2, 0x3333)]));
        mem.dispatch(MemoryEvent::BulkLoad { data });
        assert_eq!(mem.read(1), 0x2222);
        assert_eq!(mem.read(3), 0);
        assert_eq!(mem.read(0x800), 0);
    }

    #[test]
    fn test_bulk_load_drops_out_of_range() {
        let mut mem = Memory::new();
        let data = BulkData::Sparse(BTreeMap::from([(5, 0x5555), (4096, 0x9999), (70_000, 1)]));
        assert_eq!(mem.bulk_load(&data), 1);
        assert_eq!(mem.peek(5), 0x5555);
        // 4096 does not alias onto address 0.
        assert_eq!(mem.peek(0), 0);
        assert_eq!(mem.active_signal(), Some(MemorySignal::Write));

        let long = BulkData::Sequence(vec![7; MEMORY_SIZE + 10]);
        assert_eq!(mem.bulk_load(&long), MEMORY_SIZE);
        assert_eq!(mem.peek(4095), 7);
    }

    #[test]
    fn test_clear_all() {
        let mut mem = Memory::new();
        mem.write(1, 1);
        mem.write(4095, 2);
        mem.dispatch(MemoryEvent::ClearAll);
        assert_eq!(mem.last_address(), 0);
        assert_eq!(mem.last_value(), 0);
        assert_eq!(mem.active_signal(), Some(MemorySignal::Clear));
        assert!(mem.non_zero().is_empty());
        assert_eq!(mem.read(4095), 0);
    }

    #[test]
    fn test_signal_auto_clear() {
        let mut mem = Memory::new();
        mem.write(3, 3);
        assert_eq!(mem.active_signal(), Some(MemorySignal::Write));
        let before = mem.snapshot();
        mem.advance(SIGNAL_DURATION);
        let after = mem.snapshot();
        assert_eq!(after.active_signal, None);
        assert_eq!(after.words, before.words);
        assert_eq!(after.last_operation, before.last_operation);
    }

    #[test]
    fn test_bulk_data_json_shapes() {
        let ev: MemoryEvent =
            serde_json::from_str(r#"{"op":"bulk_load","data":[1,2,3]}"#).unwrap();
        assert_eq!(
            ev,
            MemoryEvent::BulkLoad {
                data: BulkData::Sequence(vec![1, 2, 3])
            }
        );

        let ev: MemoryEvent =
            serde_json::from_str(r#"{"op":"bulk_load","data":{"16":4660}}"#).unwrap();
        assert_eq!(
            ev,
            MemoryEvent::BulkLoad {
                data: BulkData::Sparse(BTreeMap::from([(16, 0x1234)]))
            }
        );

        let ev: MemoryEvent = serde_json::from_str(r#"{"op":"defragment"}"#).unwrap();
        assert_eq!(ev, MemoryEvent::Unknown);
    }

    #[test]
    fn test_unknown_event_ignored() {
        let mut mem = Memory::new();
        assert_eq!(mem.dispatch(MemoryEvent::Unknown), Outcome::Ignored);
        assert_eq!(mem.active_signal(), None);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut mem = Memory::new();
        mem.write(0x100, 0x7001);
        let snap = mem.snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        let back: MemorySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }

    proptest! {
        #[test]
        fn write_then_read_through_alias(address in any::<u64>(), value in any::<u64>()) {
            let mut mem = Memory::new();
            mem.write(address, value);
            prop_assert_eq!(mem.read(address & 0xFFF), (value & 0xFFFF) as u16);
        }
    }
}
