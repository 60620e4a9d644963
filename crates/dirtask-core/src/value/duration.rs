//! Human-readable duration strings ⇄ millisecond counts.
//!
//! Input is one or more `<integer> <unit>` terms ("5 minutes",
//! "1 hour 30 minutes", "2h, 15m"). Output always uses a single unit: the
//! largest one that divides the total evenly.

use std::time::Duration;

use crate::error::ValueError;

const MILLISECOND: u64 = 1;
const SECOND: u64 = 1_000;
const MINUTE: u64 = 60 * SECOND;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;

/// Largest unit first. Rendering walks this table top-down.
const RENDER_UNITS: [(u64, &str, &str); 6] = [
    (WEEK, "week", "weeks"),
    (DAY, "day", "days"),
    (HOUR, "hour", "hours"),
    (MINUTE, "minute", "minutes"),
    (SECOND, "second", "seconds"),
    (MILLISECOND, "millisecond", "milliseconds"),
];

const UNIT_NAMES: &[(&str, u64)] = &[
    ("ms", MILLISECOND),
    ("millis", MILLISECOND),
    ("millisecond", MILLISECOND),
    ("milliseconds", MILLISECOND),
    ("s", SECOND),
    ("sec", SECOND),
    ("secs", SECOND),
    ("second", SECOND),
    ("seconds", SECOND),
    ("m", MINUTE),
    ("min", MINUTE),
    ("mins", MINUTE),
    ("minute", MINUTE),
    ("minutes", MINUTE),
    ("h", HOUR),
    ("hour", HOUR),
    ("hours", HOUR),
    ("d", DAY),
    ("day", DAY),
    ("days", DAY),
    ("w", WEEK),
    ("week", WEEK),
    ("weeks", WEEK),
];

fn unit_multiplier(unit: &str) -> Option<u64> {
    UNIT_NAMES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(unit))
        .map(|(_, multiplier)| *multiplier)
}

pub fn parse_duration_millis(value: &str) -> Result<u64, ValueError> {
    let invalid = || ValueError::InvalidDuration(value.to_string());

    let mut rest = value.trim();
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: u64 = 0;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits_end == 0 {
            return Err(invalid());
        }
        let count: u64 = rest[..digits_end].parse().map_err(|_| invalid())?;
        rest = rest[digits_end..].trim_start();

        let unit_end = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        if unit_end == 0 {
            return Err(invalid());
        }
        let multiplier = unit_multiplier(&rest[..unit_end]).ok_or_else(invalid)?;
        total = count
            .checked_mul(multiplier)
            .and_then(|millis| total.checked_add(millis))
            .ok_or_else(invalid)?;

        rest = rest[unit_end..].trim_start();
        if let Some(after_comma) = rest.strip_prefix(',') {
            rest = after_comma.trim_start();
            if rest.is_empty() {
                return Err(invalid());
            }
        }
    }

    Ok(total)
}

pub fn format_duration_millis(millis: u64) -> String {
    if millis == 0 {
        return "0 milliseconds".to_string();
    }

    let (size, singular, plural) = RENDER_UNITS
        .iter()
        .copied()
        .find(|(size, _, _)| millis % size == 0)
        .unwrap_or((MILLISECOND, "millisecond", "milliseconds"));
    let count = millis / size;
    let unit = if count == 1 { singular } else { plural };
    format!("{count} {unit}")
}

/// Re-renders a duration string in canonical form.
pub fn canonicalize_duration(value: &str) -> Result<String, ValueError> {
    parse_duration_millis(value).map(format_duration_millis)
}

/// Converts a typed duration for storage, failing past `u64::MAX` millis.
pub fn duration_to_millis(duration: Duration) -> Result<u64, ValueError> {
    u64::try_from(duration.as_millis()).map_err(|_| ValueError::OutOfRange {
        value: format!("{duration:?}"),
        reason: "duration is too long",
    })
}
