//! The accumulator: the only register wired to the arithmetic/logic unit.

use serde::{Deserialize, Serialize};

use super::{Register, RegisterEvent, RegisterName, RegisterSignal, RegisterSnapshot};
use crate::arith::{self, AluResult, Flags};
use crate::unit::{Outcome, Unit, SIGNAL_DURATION};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulatorSnapshot {
    #[serde(flatten)]
    pub register: RegisterSnapshot,
    pub flags: Flags,
    /// Carry or overflow out of the last operation.
    pub carry: bool,
}

/// AC: 16-bit arithmetic-capable register.
///
/// Supports every register event except `Set`. Each operation delegates to
/// [`crate::arith`] and refreshes the Z/N flags.
#[derive(Debug, Clone)]
pub struct Accumulator {
    reg: Register,
    flags: Flags,
    carry: bool,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::with_signal_duration(SIGNAL_DURATION)
    }

    pub fn with_signal_duration(duration: u64) -> Self {
        let reg = Register::with_signal_duration(RegisterName::Ac, duration);
        Self {
            flags: arith::compute_flags(0, reg.bits()),
            reg,
            carry: false,
        }
    }

    pub fn value(&self) -> u16 {
        self.reg.value()
    }

    pub fn bits(&self) -> u32 {
        self.reg.bits()
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn carry(&self) -> bool {
        self.carry
    }

    pub fn load(&mut self, value: u64) -> Outcome {
        self.carry = false;
        let outcome = self.reg.load(value);
        self.refresh_flags();
        outcome
    }

    pub fn clear(&mut self) -> Outcome {
        self.carry = false;
        let outcome = self.reg.clear();
        self.refresh_flags();
        outcome
    }

    pub fn increment(&mut self) -> Outcome {
        let r = arith::increment(self.current(), self.bits());
        self.apply(r, RegisterSignal::Increment, "AC <- AC + 1".into())
    }

    pub fn complement(&mut self) -> Outcome {
        let r = arith::complement(self.current(), self.bits());
        self.apply(r, RegisterSignal::Complement, "AC <- ~AC".into())
    }

    pub fn and(&mut self, operand: u64) -> Outcome {
        let r = arith::and(self.current(), operand, self.bits());
        let label = format!("AC <- AC & {}", self.operand_hex(operand));
        self.apply(r, RegisterSignal::And, label)
    }

    pub fn or(&mut self, operand: u64) -> Outcome {
        let r = arith::or(self.current(), operand, self.bits());
        let label = format!("AC <- AC | {}", self.operand_hex(operand));
        self.apply(r, RegisterSignal::Or, label)
    }

    pub fn xor(&mut self, operand: u64) -> Outcome {
        let r = arith::xor(self.current(), operand, self.bits());
        let label = format!("AC <- AC ^ {}", self.operand_hex(operand));
        self.apply(r, RegisterSignal::Xor, label)
    }

    pub fn add(&mut self, operand: u64) -> Outcome {
        let r = arith::add(self.current(), operand, self.bits());
        let label = format!("AC <- AC + {}", self.operand_hex(operand));
        self.apply(r, RegisterSignal::Add, label)
    }

    pub fn shift_left(&mut self) -> Outcome {
        let r = arith::shift_left(self.current(), self.bits());
        self.apply(r, RegisterSignal::ShiftLeft, "AC <- shl AC".into())
    }

    pub fn shift_right(&mut self) -> Outcome {
        let r = arith::shift_right(self.current(), self.bits());
        self.apply(r, RegisterSignal::ShiftRight, "AC <- shr AC".into())
    }

    /// Rotate left through `carry_in`; the bit shifted out lands in `carry`.
    pub fn circular_shift_left(&mut self, carry_in: bool) -> Outcome {
        let r = arith::circular_shift_left(self.current(), carry_in, self.bits());
        self.apply(r, RegisterSignal::CircularShiftLeft, "AC <- cil AC".into())
    }

    /// Rotate right through `carry_in`; the bit shifted out lands in `carry`.
    pub fn circular_shift_right(&mut self, carry_in: bool) -> Outcome {
        let r = arith::circular_shift_right(self.current(), carry_in, self.bits());
        self.apply(r, RegisterSignal::CircularShiftRight, "AC <- cir AC".into())
    }

    fn current(&self) -> u64 {
        u64::from(self.reg.value())
    }

    fn operand_hex(&self, operand: u64) -> String {
        self.reg.hex(arith::mask(operand, self.bits()))
    }

    fn apply(&mut self, result: AluResult, signal: RegisterSignal, label: String) -> Outcome {
        self.carry = result.carry;
        let outcome = self.reg.commit(result.value, signal, label);
        self.refresh_flags();
        outcome
    }

    fn refresh_flags(&mut self) {
        self.flags = arith::compute_flags(self.current(), self.bits());
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Unit for Accumulator {
    type Event = RegisterEvent;
    type Signal = RegisterSignal;
    type Snapshot = AccumulatorSnapshot;

    fn dispatch(&mut self, event: RegisterEvent) -> Outcome {
        match event {
            RegisterEvent::Load { value } => self.load(value),
            RegisterEvent::Clear => self.clear(),
            RegisterEvent::Increment => self.increment(),
            RegisterEvent::Complement => self.complement(),
            RegisterEvent::And { operand } => self.and(operand),
            RegisterEvent::Or { operand } => self.or(operand),
            RegisterEvent::Xor { operand } => self.xor(operand),
            RegisterEvent::Add { operand } => self.add(operand),
            RegisterEvent::ShiftLeft => self.shift_left(),
            RegisterEvent::ShiftRight => self.shift_right(),
            RegisterEvent::CircularShiftLeft { carry_in } => self.circular_shift_left(carry_in),
            RegisterEvent::CircularShiftRight { carry_in } => self.circular_shift_right(carry_in),
            RegisterEvent::Set { .. } | RegisterEvent::Unknown => self.reg.ignore(&event),
        }
    }

    fn advance(&mut self, elapsed: u64) {
        self.reg.tick(elapsed);
    }

    fn active_signal(&self) -> Option<RegisterSignal> {
        self.reg.signal()
    }

    fn snapshot(&self) -> AccumulatorSnapshot {
        AccumulatorSnapshot {
            register: self.reg.base_snapshot(),
            flags: self.flags,
            carry: self.carry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_load_sets_negative_flag() {
        let mut ac = Accumulator::new();
        ac.load(0x8000);
        assert!(ac.flags().negative);
        assert!(!ac.flags().zero);

        ac.clear();
        assert!(ac.flags().zero);
        assert!(!ac.flags().negative);
    }

    #[test]
    fn test_logic_ops() {
        let mut ac = Accumulator::new();
        ac.load(0x00FF);
        ac.complement();
        assert_eq!(ac.value(), 0xFF00);
        assert!(ac.flags().negative);

        ac.load(0xFF00);
        ac.and(0x0FF0);
        assert_eq!(ac.value(), 0x0F00);

        ac.or(0x000F);
        assert_eq!(ac.value(), 0x0F0F);

        ac.xor(0x0F0F);
        assert_eq!(ac.value(), 0);
        assert!(ac.flags().zero);
    }

    #[test]
    fn test_shift_roundtrip() {
        let mut ac = Accumulator::new();
        ac.load(0x0001);
        ac.shift_left();
        assert_eq!(ac.value(), 0x0002);

        ac.load(0x0002);
        ac.shift_right();
        assert_eq!(ac.value(), 0x0001);
    }

    #[test]
    fn test_add_reports_overflow() {
        let mut ac = Accumulator::new();
        ac.load(0xFFFF);
        ac.add(2);
        assert_eq!(ac.value(), 1);
        assert!(ac.carry());
        assert_eq!(ac.snapshot().register.last_operation, "AC <- AC + 0x0002");
    }

    #[test]
    fn test_increment_wraps_to_zero() {
        let mut ac = Accumulator::new();
        ac.dispatch(RegisterEvent::Load { value: 0xFFFF });
        ac.dispatch(RegisterEvent::Increment);
        assert_eq!(ac.value(), 0);
        assert!(ac.flags().zero);
    }

    #[test]
    fn test_rotate_through_carry() {
        let mut ac = Accumulator::new();
        ac.load(0x8000);
        ac.dispatch(RegisterEvent::CircularShiftLeft { carry_in: false });
        assert_eq!(ac.value(), 0);
        assert!(ac.carry());

        ac.dispatch(RegisterEvent::CircularShiftRight { carry_in: true });
        assert_eq!(ac.value(), 0x8000);
        assert!(!ac.carry());
        assert_eq!(ac.active_signal(), Some(RegisterSignal::CircularShiftRight));
    }

    #[test]
    fn test_set_is_ignored() {
        let mut ac = Accumulator::new();
        assert_eq!(ac.dispatch(RegisterEvent::Set { value: 3 }), Outcome::Ignored);
        assert_eq!(ac.value(), 0);
        assert_eq!(ac.active_signal(), None);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut ac = Accumulator::new();
        ac.load(0x8001);
        ac.shift_left();
        let snap = ac.snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"Z\":false"));
        let back: AccumulatorSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }

    proptest! {
        #[test]
        fn flags_match_value_after_any_op(start in any::<u64>(), operand in any::<u64>(), op in 0usize..8) {
            let mut ac = Accumulator::new();
            ac.load(start);
            match op {
                0 => ac.increment(),
                1 => ac.complement(),
                2 => ac.and(operand),
                3 => ac.add(operand),
                4 => ac.shift_left(),
                5 => ac.shift_right(),
                6 => ac.circular_shift_left(operand & 1 == 1),
                _ => ac.circular_shift_right(operand & 1 == 1),
            };
            let v = ac.value();
            prop_assert_eq!(ac.flags().zero, v == 0);
            prop_assert_eq!(ac.flags().negative, v & 0x8000 != 0);
        }
    }
}
