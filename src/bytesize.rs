//! Byte-size parser / formatter.
//!
//! `parse_bytes("123k") == 123 * 1024`. Units are binary (`1024^i`), the
//! trailing `B` is optional, and the unit letter is matched
//! case-insensitively against `B, k, M, G, T, P`.

use crate::error::{Result, UIndexError};

const UNITS: [char; 6] = ['B', 'K', 'M', 'G', 'T', 'P'];

/// Parse a human byte-size string such as `"123k"`, `"1.5M"`, or `"42"` into a
/// raw byte count. Accepts an optional trailing `B` after the unit letter
/// (`"123kB"` == `"123k"`). A bare number with no unit letter is bytes. The
/// unit letter is matched case-insensitively.
pub fn parse_bytes(raw: &str) -> Result<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UIndexError::BadByteSize(raw.to_string()));
    }

    let mut chars: Vec<char> = raw.chars().collect();
    // Strip a single trailing 'B'/'b' that follows a unit letter (e.g. "123kB").
    if chars.len() >= 2
        && chars[chars.len() - 1].eq_ignore_ascii_case(&'B')
        && !chars[chars.len() - 2].is_ascii_digit()
    {
        chars.pop();
    }

    let last = chars.last().unwrap().to_ascii_uppercase();
    let (digits, exponent): (String, u32) = if let Some(pos) = UNITS.iter().position(|u| *u == last)
    {
        (chars[..chars.len() - 1].iter().collect(), pos as u32)
    } else if last.is_ascii_digit() {
        (chars.iter().collect(), 0)
    } else {
        return Err(UIndexError::BadByteSize(raw.to_string()));
    };

    let value: f64 = digits
        .parse()
        .map_err(|_| UIndexError::BadByteSize(raw.to_string()))?;
    if value < 0.0 {
        return Err(UIndexError::BadByteSize(raw.to_string()));
    }

    let multiplier = 1024f64.powi(exponent as i32);
    Ok((value * multiplier).round() as u64)
}

/// Format a byte count for logs, choosing the largest unit that keeps the
/// mantissa readable (e.g. `1536 -> "1.50k"`).
pub fn format_bytes(mut bytes: u64) -> String {
    if bytes == 0 {
        return "0B".to_string();
    }
    let mut exponent = 0usize;
    let mut value = bytes as f64;
    while value >= 1024.0 && exponent < UNITS.len() - 1 {
        value /= 1024.0;
        exponent += 1;
        bytes /= 1024;
    }
    if exponent == 0 {
        format!("{bytes}B")
    } else {
        format!("{:.2}{}", value, UNITS[exponent])
    }
}
