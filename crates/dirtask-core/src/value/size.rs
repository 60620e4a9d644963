//! Data size strings ⇄ byte counts (binary multiples).

use crate::error::ValueError;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;
const TIB: u64 = 1024 * GIB;

const RENDER_UNITS: [(u64, &str); 5] = [
    (TIB, "TB"),
    (GIB, "GB"),
    (MIB, "MB"),
    (KIB, "KB"),
    (1, "bytes"),
];

const UNIT_NAMES: &[(&str, u64)] = &[
    ("b", 1),
    ("byte", 1),
    ("bytes", 1),
    ("k", KIB),
    ("kb", KIB),
    ("kib", KIB),
    ("kilobyte", KIB),
    ("kilobytes", KIB),
    ("m", MIB),
    ("mb", MIB),
    ("mib", MIB),
    ("megabyte", MIB),
    ("megabytes", MIB),
    ("g", GIB),
    ("gb", GIB),
    ("gib", GIB),
    ("gigabyte", GIB),
    ("gigabytes", GIB),
    ("t", TIB),
    ("tb", TIB),
    ("tib", TIB),
    ("terabyte", TIB),
    ("terabytes", TIB),
];

/// Parses `<integer> <unit>`; a bare integer is a byte count.
pub fn parse_size_bytes(value: &str) -> Result<u64, ValueError> {
    let invalid = || ValueError::InvalidSize(value.to_string());

    let trimmed = value.trim();
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    if digits_end == 0 {
        return Err(invalid());
    }
    let count: u64 = trimmed[..digits_end].parse().map_err(|_| invalid())?;

    let unit = trimmed[digits_end..].trim();
    if unit.is_empty() {
        return Ok(count);
    }
    let multiplier = UNIT_NAMES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(unit))
        .map(|(_, m)| *m)
        .ok_or_else(invalid)?;
    count.checked_mul(multiplier).ok_or_else(invalid)
}

pub fn format_size_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 bytes".to_string();
    }
    let (size, unit) = RENDER_UNITS
        .iter()
        .copied()
        .find(|(size, _)| bytes % size == 0)
        .unwrap_or((1, "bytes"));
    let count = bytes / size;
    if size == 1 && count == 1 {
        return "1 byte".to_string();
    }
    format!("{count} {unit}")
}
