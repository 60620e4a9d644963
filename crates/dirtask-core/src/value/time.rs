//! Generalized time (`YYYYMMDDhhmmss.fffZ`) codec.

use chrono::{Datelike, DateTime, NaiveDate, NaiveTime, SubsecRound, TimeDelta, TimeZone, Utc};

use crate::error::ValueError;

/// Renders a timestamp in UTC with millisecond precision.
pub fn format_generalized_time(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y%m%d%H%M%S%.3fZ").to_string()
}

/// Truncates to the precision the wire form preserves.
pub fn truncate_to_millis(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp.trunc_subsecs(3)
}

/// Truncates to milliseconds and requires a four-digit year (0000 to 9999).
pub fn checked_generalized_time(timestamp: DateTime<Utc>) -> Result<DateTime<Utc>, ValueError> {
    if (0..=9999).contains(&timestamp.year()) {
        Ok(truncate_to_millis(timestamp))
    } else {
        Err(ValueError::OutOfRange {
            value: timestamp.to_rfc3339(),
            reason: "generalized time years run from 0000 to 9999",
        })
    }
}

/// Parses `YYYYMMDDhh[mm[ss]][(.|,)fraction](Z|±hh[mm])`.
///
/// The fraction applies to the last component present, so `2024010112.5Z`
/// is half past noon.
pub fn parse_generalized_time(value: &str) -> Result<DateTime<Utc>, ValueError> {
    let invalid = || ValueError::InvalidTimestamp(value.to_string());
    let trimmed = value.trim();

    let (body, offset_seconds) = if let Some(body) = trimmed.strip_suffix(['Z', 'z']) {
        (body, 0i64)
    } else {
        let split = trimmed.rfind(['+', '-']).ok_or_else(invalid)?;
        let (body, offset) = trimmed.split_at(split);
        let sign = if offset.starts_with('-') { -1 } else { 1 };
        let digits = &offset[1..];
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let (hours, minutes) = match digits.len() {
            2 => (digits.parse::<i64>().map_err(|_| invalid())?, 0),
            4 => (
                digits[..2].parse::<i64>().map_err(|_| invalid())?,
                digits[2..].parse::<i64>().map_err(|_| invalid())?,
            ),
            _ => return Err(invalid()),
        };
        if hours > 23 || minutes > 59 {
            return Err(invalid());
        }
        (body, sign * (hours * 3600 + minutes * 60))
    };

    let (digits, fraction) = match body.find(['.', ',']) {
        Some(index) => (&body[..index], Some(&body[index + 1..])),
        None => (body, None),
    };
    if !digits.bytes().all(|b| b.is_ascii_digit()) || !matches!(digits.len(), 10 | 12 | 14) {
        return Err(invalid());
    }

    let component = |range: std::ops::Range<usize>| -> Result<u32, ValueError> {
        digits
            .get(range)
            .unwrap_or("0")
            .parse::<u32>()
            .map_err(|_| invalid())
    };
    let year = digits[..4].parse::<i32>().map_err(|_| invalid())?;
    let date = NaiveDate::from_ymd_opt(year, component(4..6)?, component(6..8)?)
        .ok_or_else(invalid)?;
    let time = NaiveTime::from_hms_opt(component(8..10)?, component(10..12)?, component(12..14)?)
        .ok_or_else(invalid)?;
    let mut naive = date.and_time(time);

    if let Some(fraction) = fraction {
        if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let unit_nanos: i128 = match digits.len() {
            10 => 3_600_000_000_000,
            12 => 60_000_000_000,
            _ => 1_000_000_000,
        };
        let mut nine: String = fraction.chars().take(9).collect();
        while nine.len() < 9 {
            nine.push('0');
        }
        let fraction_nanos: i128 = nine.parse().map_err(|_| invalid())?;
        let nanos = unit_nanos * fraction_nanos / 1_000_000_000;
        let delta = i64::try_from(nanos).map_err(|_| invalid())?;
        naive = naive
            .checked_add_signed(TimeDelta::nanoseconds(delta))
            .ok_or_else(invalid)?;
    }

    let utc = naive
        .checked_sub_signed(TimeDelta::seconds(offset_seconds))
        .ok_or_else(invalid)?;
    checked_generalized_time(Utc.from_utc_datetime(&utc))
}
