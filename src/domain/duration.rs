//! Signed durations in the `1h2m3.5s` text form
//!
//! Configuration documents carry durations as strings such as `30s`,
//! `1m30s` or `-5s`. Unlike [`std::time::Duration`] the value may be
//! negative, which the admission layer needs to detect and clamp.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const NANOS_PER_MICRO: u64 = 1_000;
const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SECOND: u64 = 1_000_000_000;
const NANOS_PER_MINUTE: u64 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: u64 = 60 * NANOS_PER_MINUTE;

/// A signed duration with nanosecond precision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GoDuration(i64);

impl GoDuration {
    pub const ZERO: GoDuration = GoDuration(0);

    pub fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(NANOS_PER_SECOND as i64))
    }

    pub fn as_nanos(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Convert to a standard duration; `None` when negative
    pub fn to_std(&self) -> Option<std::time::Duration> {
        u64::try_from(self.0).ok().map(std::time::Duration::from_nanos)
    }
}

impl From<std::time::Duration> for GoDuration {
    fn from(d: std::time::Duration) -> Self {
        Self(i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
    }
}

// =============================================================================
// Parsing
// =============================================================================

fn unit_nanos(unit: &str) -> Option<u64> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SECOND),
        "m" => Some(NANOS_PER_MINUTE),
        "h" => Some(NANOS_PER_HOUR),
        _ => None,
    }
}

impl FromStr for GoDuration {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let invalid = || Error::DurationParse(format!("invalid duration {:?}", input));
        let overflow = || Error::DurationParse(format!("duration {:?} out of range", input));

        let (negative, mut rest) = match input.as_bytes().first() {
            Some(b'-') => (true, &input[1..]),
            Some(b'+') => (false, &input[1..]),
            _ => (false, input),
        };

        if rest == "0" {
            return Ok(Self::ZERO);
        }
        if rest.is_empty() {
            return Err(invalid());
        }

        let mut total: u64 = 0;
        while !rest.is_empty() {
            let int_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            let int_part = &rest[..int_len];
            rest = &rest[int_len..];

            let mut frac_part = "";
            if let Some(after_dot) = rest.strip_prefix('.') {
                let frac_len = after_dot
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(after_dot.len());
                frac_part = &after_dot[..frac_len];
                rest = &after_dot[frac_len..];
            }
            if int_part.is_empty() && frac_part.is_empty() {
                return Err(invalid());
            }

            let unit_len = rest
                .find(|c: char| c == '.' || c.is_ascii_digit())
                .unwrap_or(rest.len());
            let unit = unit_nanos(&rest[..unit_len]).ok_or_else(invalid)?;
            rest = &rest[unit_len..];

            let whole: u64 = if int_part.is_empty() {
                0
            } else {
                int_part.parse().map_err(|_| overflow())?
            };
            let mut value = whole.checked_mul(unit).ok_or_else(overflow)?;

            // Fractional digits beyond nanosecond precision are dropped.
            let mut scale = unit;
            for digit in frac_part.bytes() {
                scale /= 10;
                if scale == 0 {
                    break;
                }
                value = value
                    .checked_add(u64::from(digit - b'0') * scale)
                    .ok_or_else(overflow)?;
            }

            total = total.checked_add(value).ok_or_else(overflow)?;
        }

        if negative {
            if total > i64::MAX as u64 + 1 {
                return Err(overflow());
            }
            Ok(Self((total as i128).wrapping_neg() as i64))
        } else {
            i64::try_from(total).map(Self).map_err(|_| overflow())
        }
    }
}

// =============================================================================
// Formatting
// =============================================================================

/// Write `value / 10^precision` with trailing fractional zeros removed
fn write_fixed(out: &mut String, value: u64, precision: u32) {
    let divisor = 10u64.pow(precision);
    out.push_str(&(value / divisor).to_string());
    let frac = value % divisor;
    if frac != 0 {
        let digits = format!("{:0width$}", frac, width = precision as usize);
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }
}

impl fmt::Display for GoDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("0s");
        }

        let mut out = String::new();
        if self.0 < 0 {
            out.push('-');
        }
        let nanos = self.0.unsigned_abs();

        if nanos < NANOS_PER_SECOND {
            if nanos < NANOS_PER_MICRO {
                write_fixed(&mut out, nanos, 0);
                out.push_str("ns");
            } else if nanos < NANOS_PER_MILLI {
                write_fixed(&mut out, nanos, 3);
                out.push_str("µs");
            } else {
                write_fixed(&mut out, nanos, 6);
                out.push_str("ms");
            }
            return f.write_str(&out);
        }

        let hours = nanos / NANOS_PER_HOUR;
        let minutes = (nanos % NANOS_PER_HOUR) / NANOS_PER_MINUTE;
        let seconds = nanos % NANOS_PER_MINUTE;
        if hours > 0 {
            out.push_str(&format!("{}h", hours));
        }
        if hours > 0 || minutes > 0 {
            out.push_str(&format!("{}m", minutes));
        }
        write_fixed(&mut out, seconds, 9);
        out.push('s');
        f.write_str(&out)
    }
}

impl Serialize for GoDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GoDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
