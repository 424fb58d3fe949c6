//! Numeric text parsing at the edge of the simulator.
//!
//! Units never see text: anything typed by a user or read from a file is
//! turned into a number here, and rejected here if it is not one. Values
//! that parse but exceed a unit's width are not errors; the unit masks them.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("empty number")]
    Empty,

    #[error("invalid number '{text}'")]
    Invalid { text: String },

    #[error("number '{text}' does not fit in 64 bits")]
    TooLarge { text: String },
}

/// Parse an unsigned number.
///
/// Accepts `0x`/`$` hex, `0b` binary, `0o` octal and plain decimal, with
/// optional `_` separators.
pub fn parse_number(text: &str) -> Result<u64, InputError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(InputError::Empty);
    }

    let lower = trimmed.to_ascii_lowercase();
    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest, 16)
    } else if let Some(rest) = lower.strip_prefix('$') {
        (rest, 16)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest, 2)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest, 8)
    } else {
        (lower.as_str(), 10)
    };

    let digits: String = digits.chars().filter(|&c| c != '_').collect();
    // from_str_radix takes a leading sign; a number here never has one.
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err(InputError::Invalid { text: trimmed.to_string() });
    }

    u64::from_str_radix(&digits, radix).map_err(|e| match e.kind() {
        std::num::IntErrorKind::PosOverflow => InputError::TooLarge { text: trimmed.to_string() },
        _ => InputError::Invalid { text: trimmed.to_string() },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radixes() {
        assert_eq!(parse_number("42"), Ok(42));
        assert_eq!(parse_number("0x2A"), Ok(42));
        assert_eq!(parse_number("$2a"), Ok(42));
        assert_eq!(parse_number("0b101010"), Ok(42));
        assert_eq!(parse_number("0o52"), Ok(42));
        assert_eq!(parse_number(" 0xFFFF_0000 "), Ok(0xFFFF_0000));
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_number(""), Err(InputError::Empty));
        assert_eq!(parse_number("   "), Err(InputError::Empty));
        assert_eq!(parse_number("0x"), Err(InputError::Invalid { text: "0x".into() }));
        assert_eq!(parse_number("12ab"), Err(InputError::Invalid { text: "12ab".into() }));
        assert_eq!(parse_number("-1"), Err(InputError::Invalid { text: "-1".into() }));
        assert_eq!(parse_number("+5"), Err(InputError::Invalid { text: "+5".into() }));
        assert_eq!(parse_number("0x+FF"), Err(InputError::Invalid { text: "0x+FF".into() }));
        assert!(matches!(
            parse_number("0x1_0000_0000_0000_0000"),
            Err(InputError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_out_of_width_is_not_an_error() {
        // Masking happens in the units, not here.
        assert_eq!(parse_number("0x1FFFF"), Ok(0x1FFFF));
    }
}
