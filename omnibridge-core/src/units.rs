//! Fixed-point conversions between display amounts and smallest units.

use std::cmp::Ordering;

use crate::error::{BridgeError, BridgeResult};

/// Parse a decimal string such as `"1.5"` into smallest units.
///
/// Rejects signs, exponents, more fractional digits than `decimals`, and
/// values that overflow `u128`.
pub fn parse_units(value: &str, decimals: u8) -> BridgeResult<u128> {
    let invalid = |reason: &str| {
        BridgeError::InvalidTransferParameters(format!("invalid amount {:?}: {}", value, reason))
    };

    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty"));
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("no digits"));
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid("not a non-negative decimal number"));
    }

    // Trailing zeros never change the value.
    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > decimals as usize {
        return Err(invalid("too many decimal places"));
    }

    let scale = 10u128
        .checked_pow(decimals as u32)
        .ok_or_else(|| invalid("too many decimals"))?;
    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid("overflow"))?
    };
    let fraction_units: u128 = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", fraction, width = decimals as usize);
        padded.parse().map_err(|_| invalid("overflow"))?
    };

    whole
        .checked_mul(scale)
        .and_then(|units| units.checked_add(fraction_units))
        .ok_or_else(|| invalid("overflow"))
}

/// Render smallest units as a decimal string without trailing zeros.
pub fn format_units(raw: u128, decimals: u8) -> String {
    if decimals == 0 {
        return raw.to_string();
    }
    let digits = format!("{:0>width$}", raw, width = decimals as usize + 1);
    let (whole, fraction) = digits.split_at(digits.len() - decimals as usize);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}

/// Compare two amounts by display value when their decimals differ.
pub fn compare_units(a: u128, a_decimals: u8, b: u128, b_decimals: u8) -> Ordering {
    // Overflowing the rescale means exceeding any u128 on the other side.
    let rescale = |value: u128, shift: u8| -> Option<u128> {
        if value == 0 {
            return Some(0);
        }
        10u128
            .checked_pow(shift as u32)
            .and_then(|factor| value.checked_mul(factor))
    };
    if a_decimals >= b_decimals {
        rescale(b, a_decimals - b_decimals).map_or(Ordering::Less, |b| a.cmp(&b))
    } else {
        rescale(a, b_decimals - a_decimals).map_or(Ordering::Greater, |a| a.cmp(&b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_units("1.5", 9).unwrap(), 1_500_000_000);
        assert_eq!(parse_units("0.000000001", 9).unwrap(), 1);
        assert_eq!(parse_units("42", 0).unwrap(), 42);
        assert_eq!(parse_units(".25", 2).unwrap(), 25);
        assert_eq!(parse_units("3.", 6).unwrap(), 3_000_000);
        assert_eq!(parse_units("1.500", 1).unwrap(), 15);
        assert_eq!(
            parse_units("1000", 24).unwrap(),
            1_000_000_000_000_000_000_000_000_000
        );
    }

    #[test]
    fn test_parse_units_rejects() {
        for bad in ["", "-1", "+1", "1e9", "abc", ".", "1.2.3", "0.0000000001"] {
            assert!(
                matches!(parse_units(bad, 9), Err(BridgeError::InvalidTransferParameters(_))),
                "{:?} should be rejected",
                bad
            );
        }
        assert!(parse_units("340282366920938463463374607431768211456", 0).is_err());
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(1_500_000_000, 9), "1.5");
        assert_eq!(format_units(1, 9), "0.000000001");
        assert_eq!(format_units(0, 9), "0");
        assert_eq!(format_units(2_000_000, 6), "2");
        assert_eq!(format_units(42, 0), "42");
    }

    #[test]
    fn test_compare_units_across_decimals() {
        // 1.5 (9 dp) vs 2 (6 dp)
        assert_eq!(compare_units(1_500_000_000, 9, 2_000_000, 6), Ordering::Less);
        assert_eq!(compare_units(2_000_000, 6, 2_000_000_000, 9), Ordering::Equal);
        assert_eq!(compare_units(1, 0, 10u128.pow(24), 24), Ordering::Equal);
        // 10^20 at 0 dp cannot be rescaled to 24 dp
        assert_eq!(compare_units(10u128.pow(20), 0, u128::MAX, 24), Ordering::Greater);
        assert_eq!(compare_units(0, 0, 1, 200), Ordering::Less);
        assert_eq!(compare_units(5, 200, 0, 0), Ordering::Greater);
    }
}
