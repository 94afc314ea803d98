//! Query string parameters.

use validator::Validate;

use crate::error::ValidationError;

const WORLD_ID: &str = "world_id";

/// Parameters of the calendars query endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Validate)]
pub struct CalendarQuery {
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub world_id: i64,
}

impl CalendarQuery {
    /// Coerce and validate the raw `world_id` values from a query string.
    pub fn parse(raw: &[&str]) -> Result<Self, ValidationError> {
        let value = match raw {
            [] => return Err(ValidationError::new(WORLD_ID, "is required")),
            [value] => *value,
            _ => return Err(ValidationError::new(WORLD_ID, "expected a single value")),
        };

        let query = Self {
            world_id: coerce_integer(WORLD_ID, value)?,
        };
        query.validate().map_err(first_violation)?;

        Ok(query)
    }
}

/// Numeric coercion of a query string value.
///
/// Blank input coerces to zero. Decimal and exponent notation are accepted
/// (`"3.0"`, `"1e2"`) and evaluated exactly on the digits, so a large id is
/// never rounded onto a different one.
fn coerce_integer(field: &str, raw: &str) -> Result<i64, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }

    let not_a_number = || ValidationError::new(field, "expected a number");
    let out_of_range = || ValidationError::new(field, "is out of range");

    let (negative, unsigned) = match trimmed.as_bytes()[0] {
        b'-' => (true, &trimmed[1..]),
        b'+' => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(at) => (&unsigned[..at], Some(&unsigned[at + 1..])),
        None => (unsigned, None),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if whole.len() + fraction.len() == 0 || !is_digits(whole) || !is_digits(fraction) {
        return Err(not_a_number());
    }

    let exponent: i64 = match exponent {
        Some(e) => {
            let magnitude = e.strip_prefix(['+', '-']).unwrap_or(e);
            if magnitude.is_empty() || !is_digits(magnitude) {
                return Err(not_a_number());
            }
            e.parse().map_err(|_| out_of_range())?
        }
        None => 0,
    };

    let digits = format!("{}{}", whole, fraction);
    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return Ok(0);
    }

    // Position of the decimal point relative to the end of `digits`.
    let scale = exponent.saturating_sub(fraction.len() as i64);
    let integral = if scale >= 0 {
        if scale > 19 {
            return Err(out_of_range());
        }
        format!("{}{}", significant, "0".repeat(scale as usize))
    } else {
        let cut = scale.unsigned_abs() as usize;
        if cut >= significant.len() {
            return Err(ValidationError::new(field, "expected an integer"));
        }
        let (kept, dropped) = significant.split_at(significant.len() - cut);
        if dropped.bytes().any(|b| b != b'0') {
            return Err(ValidationError::new(field, "expected an integer"));
        }
        kept.to_string()
    };

    let signed = if negative {
        format!("-{}", integral)
    } else {
        integral
    };
    signed.parse().map_err(|_| out_of_range())
}

fn first_violation(errors: validator::ValidationErrors) -> ValidationError {
    errors
        .field_errors()
        .into_iter()
        .find_map(|(field, violations)| {
            violations.first().map(|v| {
                let reason = v
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| v.code.to_string());
                ValidationError::new(field.to_string(), reason)
            })
        })
        .unwrap_or_else(|| ValidationError::new(WORLD_ID, "is invalid"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(raw: &[&str]) -> String {
        CalendarQuery::parse(raw).unwrap_err().reason
    }

    #[test]
    fn test_accepts_positive_integers() {
        assert_eq!(CalendarQuery::parse(&["1"]).unwrap().world_id, 1);
        assert_eq!(CalendarQuery::parse(&[" 42 "]).unwrap().world_id, 42);
        assert_eq!(CalendarQuery::parse(&["+7"]).unwrap().world_id, 7);
        assert_eq!(CalendarQuery::parse(&["3.0"]).unwrap().world_id, 3);
        assert_eq!(CalendarQuery::parse(&["1e2"]).unwrap().world_id, 100);
    }

    #[test]
    fn test_missing_or_repeated() {
        assert_eq!(reason(&[]), "is required");
        assert_eq!(reason(&["1", "2"]), "expected a single value");
    }

    #[test]
    fn test_rejects_non_numbers() {
        assert_eq!(reason(&["abc"]), "expected a number");
        assert_eq!(reason(&["12abc"]), "expected a number");
        assert_eq!(reason(&["NaN"]), "expected a number");
        assert_eq!(reason(&["inf"]), "expected a number");
    }

    #[test]
    fn test_rejects_fractions() {
        assert_eq!(reason(&["1.5"]), "expected an integer");
        assert_eq!(reason(&["12e-1"]), "expected an integer");
        assert_eq!(reason(&[".5"]), "expected an integer");
        assert_eq!(reason(&["9007199254740990.5"]), "expected an integer");
    }

    #[test]
    fn test_rejects_non_positive() {
        assert_eq!(reason(&["0"]), "must be greater than 0");
        assert_eq!(reason(&["-3"]), "must be greater than 0");
        assert_eq!(reason(&[""]), "must be greater than 0");
        assert_eq!(reason(&["0e5"]), "must be greater than 0");
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert_eq!(reason(&["1e30"]), "is out of range");
        assert_eq!(reason(&["1e19"]), "is out of range");
        assert_eq!(reason(&["9223372036854775808"]), "is out of range");
        assert_eq!(reason(&["1e99999999999999999999"]), "is out of range");
    }

    #[test]
    fn test_exponent_forms() {
        assert_eq!(CalendarQuery::parse(&["1.5e1"]).unwrap().world_id, 15);
        assert_eq!(CalendarQuery::parse(&["120e-1"]).unwrap().world_id, 12);
        assert_eq!(CalendarQuery::parse(&["1E16"]).unwrap().world_id, 10_000_000_000_000_000);
        assert_eq!(CalendarQuery::parse(&["5."]).unwrap().world_id, 5);
        assert_eq!(reason(&["1e"]), "expected a number");
        assert_eq!(reason(&["1e-"]), "expected a number");
        assert_eq!(reason(&["e5"]), "expected a number");
        assert_eq!(reason(&["1.2.3"]), "expected a number");
        assert_eq!(reason(&["--1"]), "expected a number");
        assert_eq!(reason(&["1.5e-9223372036854775808"]), "expected an integer");
    }

    #[test]
    fn test_large_ids_are_exact() {
        assert_eq!(
            CalendarQuery::parse(&["9007199254740993"]).unwrap().world_id,
            9_007_199_254_740_993
        );
        assert_eq!(
            CalendarQuery::parse(&["9007199254740993.0"]).unwrap().world_id,
            9_007_199_254_740_993
        );
        assert_eq!(
            CalendarQuery::parse(&["9223372036854775807"]).unwrap().world_id,
            i64::MAX
        );
    }

    #[test]
    fn test_error_names_field() {
        let err = CalendarQuery::parse(&["0"]).unwrap_err();
        assert_eq!(err.field, "world_id");
        assert_eq!(err.to_string(), "invalid `world_id`: must be greater than 0");
    }
}
