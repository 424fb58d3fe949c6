//! Fixed-width arithmetic/logic primitives.
//!
//! Pure functions shared by every stateful unit:
//! - [`mask`] / [`compute_flags`] - width clamping and Z/N derivation
//! - [`ops`] - add, logic, shifts, rotates through carry, increment

pub mod ops;

pub use ops::{
    add, and, circular_shift_left, circular_shift_right, complement, compute_flags, increment,
    mask, msb, or, shift_left, shift_right, width_mask, xor, AluResult, Flags,
};
