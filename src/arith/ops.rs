//! Fixed-width arithmetic and logic routines.
//!
//! Every value is an unsigned quantity of `bits` width. The most significant
//! bit is reported as the sign (`N`) flag but no signed arithmetic is ever
//! performed: out-of-range results are simply masked back into the width.

use serde::{Deserialize, Serialize};

/// Widest value any unit in the machine carries.
pub const MAX_BITS: u32 = 64;

/// Zero and negative indicators derived from a value and its width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flags {
    /// Set when the value is zero.
    #[serde(rename = "Z")]
    pub zero: bool,
    /// Set when the most significant bit of the width is one.
    #[serde(rename = "N")]
    pub negative: bool,
}

/// Outcome of an arithmetic/logic routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult {
    /// The masked result.
    pub value: u64,
    /// Flags computed on `value`.
    pub flags: Flags,
    /// Carry out (shifts, rotates) or overflow (add). False for pure logic ops.
    pub carry: bool,
}

impl AluResult {
    fn new(value: u64, bits: u32, carry: bool) -> Self {
        Self {
            value,
            flags: compute_flags(value, bits),
            carry,
        }
    }
}

/// All-ones pattern of the given width.
#[inline]
pub fn width_mask(bits: u32) -> u64 {
    if bits >= MAX_BITS {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Clamp `value` to `bits` width.
#[inline]
pub fn mask(value: u64, bits: u32) -> u64 {
    value & width_mask(bits)
}

/// Whether bit `bits - 1` of `value` is set.
#[inline]
pub fn msb(value: u64, bits: u32) -> bool {
    match bits {
        0 => false,
        b if b > MAX_BITS => false,
        b => (value >> (b - 1)) & 1 == 1,
    }
}

/// Compute the Z and N flags of `value` interpreted at `bits` width.
pub fn compute_flags(value: u64, bits: u32) -> Flags {
    let value = mask(value, bits);
    Flags {
        zero: value == 0,
        negative: msb(value, bits),
    }
}

/// Masked sum. `carry` reports that the true sum did not fit.
pub fn add(a: u64, b: u64, bits: u32) -> AluResult {
    let (wide, wrapped) = a.overflowing_add(b);
    let result = mask(wide, bits);
    AluResult::new(result, bits, wrapped || wide != result)
}

/// Masked bitwise AND.
pub fn and(a: u64, b: u64, bits: u32) -> AluResult {
    AluResult::new(mask(a & b, bits), bits, false)
}

/// Masked bitwise OR.
pub fn or(a: u64, b: u64, bits: u32) -> AluResult {
    AluResult::new(mask(a | b, bits), bits, false)
}

/// Masked bitwise XOR.
pub fn xor(a: u64, b: u64, bits: u32) -> AluResult {
    AluResult::new(mask(a ^ b, bits), bits, false)
}

/// Masked bitwise NOT.
pub fn complement(value: u64, bits: u32) -> AluResult {
    AluResult::new(mask(!value, bits), bits, false)
}

/// Logical shift left by one. The old MSB becomes the carry.
pub fn shift_left(value: u64, bits: u32) -> AluResult {
    let value = mask(value, bits);
    AluResult::new(mask(value << 1, bits), bits, msb(value, bits))
}

/// Logical shift right by one. The old LSB becomes the carry.
pub fn shift_right(value: u64, bits: u32) -> AluResult {
    let value = mask(value, bits);
    AluResult::new(value >> 1, bits, value & 1 == 1)
}

/// Rotate left through the external carry bit `e`.
///
/// The MSB shifted out becomes the new carry; the old `e` enters at bit 0.
pub fn circular_shift_left(value: u64, e: bool, bits: u32) -> AluResult {
    let value = mask(value, bits);
    let rotated = mask(value << 1, bits) | u64::from(e);
    AluResult::new(rotated, bits, msb(value, bits))
}

/// Rotate right through the external carry bit `e`.
///
/// The LSB shifted out becomes the new carry; the old `e` enters at the MSB.
pub fn circular_shift_right(value: u64, e: bool, bits: u32) -> AluResult {
    let value = mask(value, bits);
    let incoming = if e && bits > 0 { 1u64 << (bits.min(MAX_BITS) - 1) } else { 0 };
    AluResult::new((value >> 1) | incoming, bits, value & 1 == 1)
}

/// Masked increment by one.
pub fn increment(value: u64, bits: u32) -> AluResult {
    add(value, 1, bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mask_widths() {
        assert_eq!(mask(0x1_2345, 16), 0x2345);
        assert_eq!(mask(0xFFFF, 12), 0x0FFF);
        assert_eq!(mask(0xFF, 4), 0xF);
        assert_eq!(mask(0xFF, 0), 0);
        assert_eq!(mask(u64::MAX, 64), u64::MAX);
    }

    #[test]
    fn test_flags() {
        let f = compute_flags(0x8000, 16);
        assert!(f.negative);
        assert!(!f.zero);

        let f = compute_flags(0, 16);
        assert!(f.zero);
        assert!(!f.negative);

        // 0x8000 is not negative at 12 bits: it masks to zero.
        let f = compute_flags(0x8000, 12);
        assert!(f.zero);
        assert!(!f.negative);
    }

    #[test]
    fn test_add_overflow() {
        let r = add(0xFFFF, 1, 16);
        assert_eq!(r.value, 0);
        assert!(r.carry);
        assert!(r.flags.zero);

        let r = add(0x0001, 0x0002, 16);
        assert_eq!(r.value, 3);
        assert!(!r.carry);
    }

    #[test]
    fn test_and_complement() {
        assert_eq!(and(0xFF00, 0x0FF0, 16).value, 0x0F00);
        assert_eq!(complement(0x00FF, 16).value, 0xFF00);
        assert!(complement(0x00FF, 16).flags.negative);
        assert_eq!(or(0xF000, 0x000F, 16).value, 0xF00F);
        assert_eq!(xor(0xFFFF, 0x0F0F, 16).value, 0xF0F0);
    }

    #[test]
    fn test_shifts() {
        let r = shift_left(0x0001, 16);
        assert_eq!(r.value, 0x0002);
        assert!(!r.carry);

        let r = shift_left(0x8001, 16);
        assert_eq!(r.value, 0x0002);
        assert!(r.carry);

        let r = shift_right(0x0002, 16);
        assert_eq!(r.value, 0x0001);
        assert!(!r.carry);

        let r = shift_right(0x0003, 16);
        assert_eq!(r.value, 0x0001);
        assert!(r.carry);
    }

    #[test]
    fn test_circular_shifts() {
        let r = circular_shift_left(0x8000, false, 16);
        assert_eq!(r.value, 0x0000);
        assert!(r.carry);

        let r = circular_shift_left(0x0000, true, 16);
        assert_eq!(r.value, 0x0001);
        assert!(!r.carry);

        let r = circular_shift_right(0x0001, false, 16);
        assert_eq!(r.value, 0x0000);
        assert!(r.carry);

        let r = circular_shift_right(0x0000, true, 16);
        assert_eq!(r.value, 0x8000);
        assert!(r.flags.negative);
    }

    #[test]
    fn test_increment_wraps() {
        assert_eq!(increment(0xF, 4).value, 0);
        assert_eq!(increment(0xFFF, 12).value, 0);
        assert_eq!(increment(0x7FFF, 16).value, 0x8000);
    }

    proptest! {
        #[test]
        fn mask_is_idempotent(v in any::<u64>(), bits in 0u32..=64) {
            prop_assert_eq!(mask(mask(v, bits), bits), mask(v, bits));
        }

        #[test]
        fn results_stay_in_range(a in any::<u64>(), b in any::<u64>(), bits in 1u32..=16) {
            let limit = 1u64 << bits;
            prop_assert!(add(a, b, bits).value < limit);
            prop_assert!(and(a, b, bits).value < limit);
            prop_assert!(complement(a, bits).value < limit);
            prop_assert!(shift_left(a, bits).value < limit);
            prop_assert!(shift_right(a, bits).value < limit);
            prop_assert!(circular_shift_left(a, true, bits).value < limit);
            prop_assert!(circular_shift_right(a, true, bits).value < limit);
        }

        #[test]
        fn flags_follow_value(v in any::<u64>(), bits in 1u32..=16) {
            let m = mask(v, bits);
            let f = compute_flags(v, bits);
            prop_assert_eq!(f.zero, m == 0);
            prop_assert_eq!(f.negative, m >> (bits - 1) == 1);
        }

        #[test]
        fn rotate_left_then_right_restores(v in 0u64..0x1_0000, e in any::<bool>()) {
            let left = circular_shift_left(v, e, 16);
            let back = circular_shift_right(left.value, left.carry, 16);
            prop_assert_eq!(back.value, v);
            prop_assert_eq!(back.carry, e);
        }
    }
}
