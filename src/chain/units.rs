//! Decimal-string to base-unit conversion.
//!
//! Fund-safety math stays in integers: amounts cross the chain boundary as
//! `u128` base units and everywhere else as plain decimal strings. Floats
//! never touch amounts.

use crate::error::{ChainError, ValidationError};

fn invalid(reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidAmount {
        reason: reason.into(),
    }
}

/// Convert a plain decimal string into raw base units.
///
/// Accepts `"1"`, `"1.5"`, `".5"`; rejects signs, exponent notation, and
/// fractional parts longer than the token's decimals.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<u128, ValidationError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(invalid("amount is empty"));
    }
    if trimmed.bytes().any(|b| b == b'e' || b == b'E') {
        return Err(invalid("exponent notation is not accepted"));
    }
    if trimmed.starts_with('-') || trimmed.starts_with('+') {
        return Err(invalid("amount must be an unsigned decimal number"));
    }

    let (whole, frac) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid("amount has no digits"));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(format!("'{trimmed}' is not a decimal number")));
    }
    if frac.len() > decimals as usize {
        return Err(invalid(format!(
            "more than {decimals} decimal places"
        )));
    }

    let scale = 10u128.pow(decimals as u32);
    let whole_units = if whole.is_empty() {
        0u128
    } else {
        whole
            .parse::<u128>()
            .map_err(|_| invalid("amount is too large"))?
    };
    let frac_units = if frac.is_empty() {
        0u128
    } else {
        let padded = frac.len() as u32;
        let value = frac
            .parse::<u128>()
            .map_err(|_| invalid("amount is too large"))?;
        value * 10u128.pow(decimals as u32 - padded)
    };

    whole_units
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_units))
        .ok_or_else(|| invalid("amount is too large"))
}

/// [`to_base_units`] for amounts that move funds: zero is rejected.
pub fn to_positive_base_units(amount: &str, decimals: u8) -> Result<u128, ValidationError> {
    let raw = to_base_units(amount, decimals)?;
    if raw == 0 {
        return Err(invalid("amount must be greater than zero"));
    }
    Ok(raw)
}

/// Render raw base units as a decimal string, trailing zeros trimmed.
pub fn from_base_units(raw: u128, decimals: u8) -> String {
    if decimals == 0 {
        return raw.to_string();
    }
    let scale = 10u128.pow(decimals as u32);
    let whole = raw / scale;
    let frac = raw % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let frac_str = format!("{frac:0width$}", width = decimals as usize);
    format!("{whole}.{}", frac_str.trim_end_matches('0'))
}

/// Parse a JSON-RPC hex quantity (`"0x1a2"`).
pub fn parse_quantity(value: &str) -> Result<u128, ChainError> {
    let body = value
        .strip_prefix("0x")
        .filter(|body| !body.is_empty())
        .ok_or_else(|| ChainError::InvalidResponse {
            reason: format!("'{value}' is not a hex quantity"),
        })?;
    u128::from_str_radix(body, 16).map_err(|_| ChainError::InvalidResponse {
        reason: format!("'{value}' is not a hex quantity"),
    })
}

pub fn parse_quantity_u64(value: &str) -> Result<u64, ChainError> {
    let wide = parse_quantity(value)?;
    u64::try_from(wide).map_err(|_| ChainError::InvalidResponse {
        reason: format!("quantity '{value}' exceeds u64"),
    })
}

/// Format a quantity the way nodes expect: `0x`-prefixed, no leading zeros.
pub fn format_quantity(value: u128) -> String {
    format!("0x{value:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_whole_and_fractional_amounts() {
        assert_eq!(to_base_units("1", 18).unwrap(), 10u128.pow(18));
        assert_eq!(to_base_units("1.5", 18).unwrap(), 1_500_000_000_000_000_000);
        assert_eq!(to_base_units("0.000001", 6).unwrap(), 1);
        assert_eq!(to_base_units(".5", 6).unwrap(), 500_000);
        assert_eq!(to_base_units("25", 6).unwrap(), 25_000_000);
    }

    #[test]
    fn rejects_exponent_and_signed_notation() {
        assert!(to_base_units("1e18", 18).is_err());
        assert!(to_base_units("1E2", 6).is_err());
        assert!(to_base_units("-1", 18).is_err());
        assert!(to_base_units("+1", 18).is_err());
    }

    #[test]
    fn rejects_excess_precision() {
        assert!(to_base_units("1.0000001", 6).is_err());
        assert!(to_base_units("0.5", 0).is_err());
    }

    #[test]
    fn positive_conversion_rejects_zero() {
        assert!(to_positive_base_units("0", 18).is_err());
        assert!(to_positive_base_units("0.0", 18).is_err());
        assert_eq!(to_positive_base_units("0.5", 6).unwrap(), 500_000);
    }

    #[test]
    fn rejects_garbage() {
        assert!(to_base_units("", 18).is_err());
        assert!(to_base_units(".", 18).is_err());
        assert!(to_base_units("1.2.3", 18).is_err());
        assert!(to_base_units("abc", 18).is_err());
        assert!(to_base_units("1,5", 18).is_err());
    }

    #[test]
    fn renders_base_units() {
        assert_eq!(from_base_units(1_500_000_000_000_000_000, 18), "1.5");
        assert_eq!(from_base_units(0, 18), "0");
        assert_eq!(from_base_units(25_000_000, 6), "25");
        assert_eq!(from_base_units(1, 6), "0.000001");
        assert_eq!(from_base_units(42, 0), "42");
    }

    #[test]
    fn round_trips_without_drift() {
        for amount in ["0.1", "123.456", "0.00000001", "99999999.99999999"] {
            let raw = to_base_units(amount, 8).unwrap();
            assert_eq!(from_base_units(raw, 8), amount);
        }
    }

    #[test]
    fn parses_hex_quantities() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x1a").unwrap(), 26);
        assert!(parse_quantity("0x").is_err());
        assert!(parse_quantity("1a").is_err());
        assert_eq!(format_quantity(26), "0x1a");
        assert_eq!(format_quantity(0), "0x0");
    }
}
