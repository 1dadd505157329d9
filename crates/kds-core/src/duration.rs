//! Duration parsing for Go-style duration strings.
//!
//! Accepts one or more `<number><unit>` groups (`90s`, `1m30s`, `1.5h`,
//! `250ms`) with units `ns`, `us`/`µs`, `ms`, `s`, `m` and `h`. A bare
//! integer is read as seconds.

use crate::error::{Error, Result};
use std::time::Duration;

/// Parse a duration string
///
/// # Examples
///
/// ```
/// use kds_core::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
/// assert_eq!(parse_duration("300").unwrap(), Duration::from_secs(300));
/// assert!(parse_duration("10x").is_err());
/// ```
///
/// # Errors
///
/// Returns a configuration error for empty input, unknown units, or
/// malformed numbers.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s.is_empty() {
        return Err(Error::config("duration cannot be empty"));
    }

    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| Error::config(format!("duration {input:?} is missing a unit")))?;
        if number_len == 0 {
            return Err(Error::config(format!("invalid duration {input:?}")));
        }

        let (number, tail) = rest.split_at(number_len);
        let value: f64 = number
            .parse()
            .map_err(|_| Error::config(format!("invalid number {number:?} in duration {input:?}")))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);

        let scale = match unit {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => {
                return Err(Error::config(format!(
                    "unknown unit {unit:?} in duration {input:?}"
                )));
            }
        };

        let part = Duration::try_from_secs_f64(value * scale)
            .map_err(|_| Error::config(format!("duration {input:?} is out of range")))?;
        total = total
            .checked_add(part)
            .ok_or_else(|| Error::config(format!("duration {input:?} is out of range")))?;
        rest = tail;
    }

    Ok(total)
}

/// Render a duration the way [`parse_duration`] reads it back
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if duration.subsec_nanos() != 0 {
        return format!("{}ms", duration.as_millis());
    }
    if secs == 0 {
        return "0s".to_string();
    }

    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let mut out = String::new();
    if h > 0 {
        out.push_str(&format!("{h}h"));
    }
    if m > 0 {
        out.push_str(&format!("{m}m"));
    }
    if s > 0 {
        out.push_str(&format!("{s}s"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_units() {
        assert_eq!(parse_duration("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn compound_and_fractional() {
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("5m0s").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
    }

    #[test]
    fn bare_integer_is_seconds() {
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("60").unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("s").is_err());
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("1.2.3s").is_err());
        assert!(parse_duration("-5s").is_err());
    }

    #[test]
    fn format_reads_back() {
        for d in [Duration::ZERO, Duration::from_secs(90), Duration::from_secs(3661)] {
            assert_eq!(parse_duration(&format_duration(d)).unwrap(), d);
        }
        assert_eq!(format_duration(Duration::from_secs(60)), "1m");
    }
}
