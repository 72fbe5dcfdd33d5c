//! Number Formatting
//!
//! Renders metric values for display and speech. Inputs are raw JSON values
//! from the tool service; anything missing or non-numeric renders as `N/A`.

use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

/// Placeholder for absent metrics
pub const NOT_AVAILABLE: &str = "N/A";

/// Interpret a JSON value as a decimal number.
///
/// Strings are accepted with a leading `$`, thousands separators and a
/// trailing `%`.
pub fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(Decimal::from(i));
            }
            if let Some(u) = n.as_u64() {
                return Some(Decimal::from(u));
            }
            let raw = n.to_string();
            Decimal::from_str(&raw)
                .or_else(|_| Decimal::from_scientific(&raw))
                .ok()
                .or_else(|| n.as_f64().and_then(Decimal::from_f64))
        }
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

/// Parse a human-formatted number ("$1,234.5", "12%", "3e6")
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// Scale by K/M/B/T with two decimals; values under 1000 are shown as-is.
///
/// `999_999` renders as `1.00M`, not `1000.00K`.
pub fn format_compact(value: &Value) -> String {
    to_decimal(value).map_or_else(|| NOT_AVAILABLE.into(), compact)
}

/// Currency rendering: compact above $1000, cents above $1, significant
/// digits below $1 so micro-priced tokens stay readable.
pub fn format_currency(value: &Value) -> String {
    let Some(n) = to_decimal(value) else {
        return NOT_AVAILABLE.into();
    };

    let sign = if n.is_sign_negative() && !n.is_zero() { "-" } else { "" };
    let abs = n.abs();

    // Compare after rounding so 999.996 promotes like format_compact does
    let body = if abs.round_dp(2) >= dec!(1000) {
        compact(abs)
    } else if abs >= Decimal::ONE {
        format!("{:.2}", abs.round_dp(2))
    } else if abs.is_zero() {
        "0.00".into()
    } else {
        abs.round_sf(4).unwrap_or(abs).normalize().to_string()
    };

    format!("{sign}${body}")
}

/// Signed percentage with two decimals ("+2.50%", "-1.20%", "0.00%")
pub fn format_percentage(value: &Value) -> String {
    let Some(n) = to_decimal(value) else {
        return NOT_AVAILABLE.into();
    };

    let rounded = n.round_dp(2);
    if rounded.is_zero() {
        "0.00%".into()
    } else if rounded.is_sign_positive() {
        format!("+{rounded:.2}%")
    } else {
        format!("{rounded:.2}%")
    }
}

/// Plain number rounded to `dp` decimals with trailing zeros dropped
pub fn format_plain(value: &Value, dp: u32) -> String {
    to_decimal(value).map_or_else(
        || NOT_AVAILABLE.into(),
        |n| n.round_dp(dp).normalize().to_string(),
    )
}

fn compact(n: Decimal) -> String {
    let units = [
        (dec!(1_000_000_000_000), "T"),
        (dec!(1_000_000_000), "B"),
        (dec!(1_000_000), "M"),
        (dec!(1_000), "K"),
    ];
    let abs = n.abs();

    for (i, (scale, suffix)) in units.iter().enumerate() {
        if abs >= *scale {
            let scaled = (n / scale).round_dp(2);
            // Rounding can carry into the next unit
            if scaled.abs() >= dec!(1000) && i > 0 {
                let (bigger, bigger_suffix) = units[i - 1];
                return format!("{:.2}{bigger_suffix}", (n / bigger).round_dp(2));
            }
            return format!("{scaled:.2}{suffix}");
        }
    }

    let rounded = n.round_dp(2);
    if rounded.abs() >= dec!(1000) {
        return format!("{:.2}K", (n / dec!(1000)).round_dp(2));
    }
    rounded.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compact_boundaries() {
        assert_eq!(format_compact(&json!(0)), "0");
        assert_eq!(format_compact(&json!(999)), "999");
        assert_eq!(format_compact(&json!(999.5)), "999.5");
        assert_eq!(format_compact(&json!(1000)), "1.00K");
        assert_eq!(format_compact(&json!(1500)), "1.50K");
        assert_eq!(format_compact(&json!(1_000_000)), "1.00M");
        assert_eq!(format_compact(&json!(1e6)), "1.00M");
        assert_eq!(format_compact(&json!(2_500_000_000_u64)), "2.50B");
        assert_eq!(format_compact(&json!(1.93e12)), "1.93T");
    }

    #[test]
    fn test_compact_rounding_promotes_unit() {
        assert_eq!(format_compact(&json!(999_999)), "1.00M");
        assert_eq!(format_compact(&json!(999.999)), "1.00K");
    }

    #[test]
    fn test_compact_negative() {
        assert_eq!(format_compact(&json!(-1500)), "-1.50K");
        assert_eq!(format_compact(&json!(-42)), "-42");
    }

    #[test]
    fn test_non_numeric_and_null() {
        for value in [json!(null), json!("abc"), json!(""), json!(true), json!([1]), json!({})] {
            assert_eq!(format_compact(&value), NOT_AVAILABLE);
            assert_eq!(format_currency(&value), NOT_AVAILABLE);
            assert_eq!(format_percentage(&value), NOT_AVAILABLE);
            assert_eq!(format_plain(&value, 1), NOT_AVAILABLE);
        }
    }

    #[test]
    fn test_numeric_strings() {
        assert_eq!(format_compact(&json!("1,250,000")), "1.25M");
        assert_eq!(format_currency(&json!("$97,500.126")), "$97.50K");
        assert_eq!(format_percentage(&json!("2.5%")), "+2.50%");
        assert_eq!(parse_decimal("3e3"), Some(dec!(3000)));
    }

    #[test]
    fn test_currency() {
        assert_eq!(format_currency(&json!(0)), "$0.00");
        assert_eq!(format_currency(&json!(3.456)), "$3.46");
        assert_eq!(format_currency(&json!(999)), "$999.00");
        assert_eq!(format_currency(&json!(97_500)), "$97.50K");
        assert_eq!(format_currency(&json!(1.9e12)), "$1.90T");
        assert_eq!(format_currency(&json!(0.000_022)), "$0.000022");
        assert_eq!(format_currency(&json!(0.95)), "$0.95");
        assert_eq!(format_currency(&json!(-12.5)), "-$12.50");
    }

    #[test]
    fn test_currency_rounding_promotes_to_thousands() {
        assert_eq!(format_currency(&json!("999.996")), "$1.00K");
        assert_eq!(format_compact(&json!("999.996")), "1.00K");
        assert_eq!(format_currency(&json!("-999.996")), "-$1.00K");
        assert_eq!(format_currency(&json!("999.994")), "$999.99");
    }

    #[test]
    fn test_percentage() {
        assert_eq!(format_percentage(&json!(2.5)), "+2.50%");
        assert_eq!(format_percentage(&json!(-1.234)), "-1.23%");
        assert_eq!(format_percentage(&json!(0)), "0.00%");
        assert_eq!(format_percentage(&json!(-0.001)), "0.00%");
    }

    #[test]
    fn test_plain() {
        assert_eq!(format_plain(&json!(71.456), 1), "71.5");
        assert_eq!(format_plain(&json!(12), 0), "12");
    }
}
