//! Value coercion between wire strings and typed values.
//!
//! Everything here is a pure function. Failures are reported as
//! [`ValueError`] without attribute context; the task codec attaches the
//! attribute and task class when it wraps them.

pub mod duration;
pub mod size;
pub mod time;

pub use self::duration::{duration_to_millis, format_duration_millis, parse_duration_millis};
pub use self::size::{format_size_bytes, parse_size_bytes};
pub use self::time::{format_generalized_time, parse_generalized_time};

use crate::error::ValueError;

pub fn parse_boolean(value: &str) -> Result<bool, ValueError> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ValueError::InvalidBoolean(value.to_string()))
    }
}

pub fn format_boolean(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

pub fn parse_integer(value: &str) -> Result<i32, ValueError> {
    value
        .trim()
        .parse::<i32>()
        .map_err(|_| ValueError::InvalidNumber {
            value: value.to_string(),
            kind: "integer",
        })
}

pub fn parse_long(value: &str) -> Result<i64, ValueError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| ValueError::InvalidNumber {
            value: value.to_string(),
            kind: "long",
        })
}

/// Narrows a long to an integer, failing when it does not fit.
pub fn long_to_integer(value: i64) -> Result<i32, ValueError> {
    i32::try_from(value).map_err(|_| ValueError::OutOfRange {
        value: value.to_string(),
        reason: "value does not fit in a 32-bit integer",
    })
}

pub fn require_non_negative(value: i32) -> Result<i32, ValueError> {
    if value < 0 {
        return Err(ValueError::OutOfRange {
            value: value.to_string(),
            reason: "value must not be negative",
        });
    }
    Ok(value)
}

/// Case-insensitive lookup of `value` in an alias table.
///
/// Several names may map to the same enumerator; the first column is matched
/// ignoring ASCII case and surrounding whitespace.
pub fn lookup_name<T: Copy>(
    value: &str,
    kind: &'static str,
    table: &[(&str, T)],
) -> Result<T, ValueError> {
    let trimmed = value.trim();
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(trimmed))
        .map(|(_, v)| *v)
        .ok_or_else(|| ValueError::UnknownName {
            value: value.to_string(),
            kind,
        })
}
