//! Measurement record type and timestamp parsing.
//!
//! A [`Reading`] is one blood pressure measurement with an explicit
//! UTC offset on its timestamp. Calendar-day and time-of-day views are
//! always taken in that stored offset.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};

/// Timestamp format used on chart axes and the report title page.
pub const MINUTE_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Timestamp format used in the report data table.
pub const SECOND_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// A single blood pressure measurement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    /// When the measurement was taken, with its UTC offset.
    pub timestamp: DateTime<FixedOffset>,
    /// Systolic pressure in mmHg.
    pub systolic: i32,
    /// Diastolic pressure in mmHg.
    pub diastolic: i32,
    /// Pulse in beats per minute. The remote API reports 0 when the
    /// cuff did not capture a pulse; the value is stored as-is.
    pub pulse: i32,
}

impl Reading {
    /// Create a new reading.
    pub fn new(timestamp: DateTime<FixedOffset>, systolic: i32, diastolic: i32, pulse: i32) -> Self {
        Self {
            timestamp,
            systolic,
            diastolic,
            pulse,
        }
    }

    /// Calendar date in the stored offset.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Time of day in the stored offset.
    pub fn time(&self) -> NaiveTime {
        self.timestamp.time()
    }
}

/// Parse a timestamp string into a [`DateTime`] with an explicit offset.
///
/// Accepts RFC 3339 timestamps (`2024-03-15T07:30:00+02:00`) as well as
/// naive timestamps with either a `T` or a space separator
/// (`2024-03-15 07:30:00`). Naive timestamps are interpreted in the
/// given default offset.
pub fn parse_timestamp(s: &str, default_offset: FixedOffset) -> Result<DateTime<FixedOffset>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }

    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .with_context(|| format!("invalid timestamp '{}'", s))?;

    match naive.and_local_timezone(default_offset) {
        chrono::LocalResult::Single(dt) => Ok(dt),
        // Fixed offsets map every local time to exactly one instant
        _ => bail!("invalid timestamp '{}'", s),
    }
}

/// Parse a UTC offset string like `+02:00` or `-05:30`.
pub fn parse_utc_offset(s: &str) -> Result<FixedOffset> {
    let s = s.trim();

    let (sign, rest) = if let Some(rest) = s.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = s.strip_prefix('-') {
        (-1, rest)
    } else {
        bail!("invalid UTC offset '{}': expected format +HH:MM", s);
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some(parts) => parts,
        None => bail!("invalid UTC offset '{}': expected format +HH:MM", s),
    };

    let hours: i32 = hours
        .parse()
        .with_context(|| format!("invalid UTC offset '{}'", s))?;
    let minutes: i32 = minutes
        .parse()
        .with_context(|| format!("invalid UTC offset '{}'", s))?;

    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        bail!("UTC offset '{}' out of range", s);
    }

    let seconds = sign * (hours * 3600 + minutes * 60);
    match FixedOffset::east_opt(seconds) {
        Some(offset) => Ok(offset),
        None => bail!("UTC offset '{}' out of range", s),
    }
}
