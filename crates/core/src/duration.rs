//! Compact duration strings (`"24h"`, `"1h30m"`, `"500ms"`).

use std::time::Duration;

/// Invalid duration string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    /// Nothing to parse
    #[error("empty duration")]
    Empty,

    /// A number was expected at this offset
    #[error("invalid duration {input:?}: expected a number at offset {offset}")]
    ExpectedNumber {
        /// Whole input
        input: String,
        /// Byte offset
        offset: usize,
    },

    /// A number had no unit or an unknown one
    #[error("invalid duration {input:?}: unknown unit {unit:?}")]
    UnknownUnit {
        /// Whole input
        input: String,
        /// Unit found (empty when missing)
        unit: String,
    },

    /// Value does not fit
    #[error("invalid duration {input:?}: overflow")]
    Overflow {
        /// Whole input
        input: String,
    },
}

fn unit_nanos(unit: &str) -> Option<u128> {
    Some(match unit {
        "ns" => 1,
        "us" | "µs" => 1_000,
        "ms" => 1_000_000,
        "s" => 1_000_000_000,
        "m" => 60 * 1_000_000_000,
        "h" => 3_600 * 1_000_000_000,
        _ => return None,
    })
}

/// Parse a sequence of `<number><unit>` pairs. Numbers may have a fraction.
/// A bare `"0"` is accepted.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(DurationError::Empty);
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let bytes = s.as_bytes();
    let mut pos = 0;
    let mut total: u128 = 0;

    while pos < bytes.len() {
        let start = pos;
        while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
            pos += 1;
        }
        let number = &s[start..pos];
        let value: f64 = number
            .parse()
            .map_err(|_| DurationError::ExpectedNumber {
                input: input.to_string(),
                offset: start,
            })?;

        let unit_start = pos;
        while pos < bytes.len() && !(bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
            pos += 1;
        }
        let unit = &s[unit_start..pos];
        let scale = unit_nanos(unit).ok_or_else(|| DurationError::UnknownUnit {
            input: input.to_string(),
            unit: unit.to_string(),
        })?;

        let nanos = value * scale as f64;
        if !nanos.is_finite() || nanos > u64::MAX as f64 {
            return Err(DurationError::Overflow {
                input: input.to_string(),
            });
        }
        total = total.saturating_add(nanos.round() as u128);
    }

    let total = u64::try_from(total).map_err(|_| DurationError::Overflow {
        input: input.to_string(),
    })?;
    Ok(Duration::from_nanos(total))
}

/// Canonical compact form, e.g. `1h30m0s` or `1.5s`. Nothing below a
/// nanosecond is lost.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let nanos = u64::from(duration.subsec_nanos());
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);

    if secs == 0 && nanos > 0 {
        return format!("{}ms", decimal(nanos / 1_000_000, nanos % 1_000_000, 6));
    }
    let s = decimal(s, nanos, 9);
    match (h, m) {
        (0, 0) => format!("{s}s"),
        (0, _) => format!("{m}m{s}s"),
        _ => format!("{h}h{m}m{s}s"),
    }
}

/// `whole.frac` with `frac` zero-padded to `width` digits and trailing zeros
/// dropped.
fn decimal(whole: u64, frac: u64, width: usize) -> String {
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{frac:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}
