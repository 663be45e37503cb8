//! Time-of-day utilities.
//!
//! Schedules store times as 24-hour `"HH:MM"` strings. This module owns the
//! [`TimeOfDay`] value type plus the parse/format helpers used by every other
//! part of the engine:
//! - strict storage parsing (`parse_time`)
//! - display formatting in the configured 12h/24h convention
//! - the inverse display parse used when a user edits a time
//! - ordering (`compare`) and time-until-next-dose arithmetic

use crate::{Error, Result};
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

const MINUTES_PER_DAY: u32 = 24 * 60;

// ============================================================================
// TimeOfDay
// ============================================================================

/// A wall-clock time with minute resolution.
///
/// Ordering is lexicographic by (hour, minute), which is the order doses are
/// sorted in everywhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// 08:00, the first slot of every default schedule
    pub const EIGHT_AM: TimeOfDay = TimeOfDay { hour: 8, minute: 0 };

    /// Build a time, rejecting hours outside 0-23 and minutes outside 0-59.
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(Error::InvalidFormat(format!(
                "time out of range: {:02}:{:02}",
                hour, minute
            )));
        }
        Ok(Self { hour, minute })
    }

    /// Truncate a chrono time to the minute.
    pub fn from_naive(time: NaiveTime) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn minutes_since_midnight(&self) -> u32 {
        self.hour as u32 * 60 + self.minute as u32
    }

    pub fn to_naive(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour as u32, self.minute as u32, 0).unwrap_or_default()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_time(s)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        parse_time(&value)
    }
}

impl From<TimeOfDay> for String {
    fn from(time: TimeOfDay) -> Self {
        time.to_string()
    }
}

// ============================================================================
// Display format
// ============================================================================

/// Clock convention used when showing times to the user
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TimeFormat {
    #[default]
    #[serde(rename = "12h")]
    H12,
    #[serde(rename = "24h")]
    H24,
}

impl FromStr for TimeFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "12h" | "12" => Ok(TimeFormat::H12),
            "24h" | "24" => Ok(TimeFormat::H24),
            other => Err(Error::InvalidFormat(format!(
                "unknown time format {:?} (expected 12h or 24h)",
                other
            ))),
        }
    }
}

// ============================================================================
// Parsing and formatting
// ============================================================================

/// Parse a stored 24-hour `"HH:MM"` time.
///
/// Both fields must be exactly two digits. Never coerces bad input to a
/// default.
pub fn parse_time(value: &str) -> Result<TimeOfDay> {
    let invalid = || Error::InvalidFormat(format!("expected HH:MM, got {:?}", value));

    let (hours, minutes) = value.split_once(':').ok_or_else(invalid)?;
    if !is_two_digits(hours) || !is_two_digits(minutes) {
        return Err(invalid());
    }

    let hour: u8 = hours.parse().map_err(|_| invalid())?;
    let minute: u8 = minutes.parse().map_err(|_| invalid())?;
    TimeOfDay::new(hour, minute)
}

fn is_two_digits(s: &str) -> bool {
    s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit())
}

/// Render a time in the configured convention.
///
/// `H12` produces `h:MM AM|PM` (midnight is `12:00 AM`, noon `12:00 PM`).
pub fn format_for_display(time: TimeOfDay, format: TimeFormat) -> String {
    match format {
        TimeFormat::H24 => time.to_string(),
        TimeFormat::H12 => {
            let (hour, suffix) = match time.hour {
                0 => (12, "AM"),
                h @ 1..=11 => (h, "AM"),
                12 => (12, "PM"),
                h => (h - 12, "PM"),
            };
            format!("{}:{:02} {}", hour, time.minute, suffix)
        }
    }
}

/// Format a raw stored string for display.
///
/// This is the one lenient path: empty input renders as empty and a string
/// that does not parse is returned as-is.
pub fn format_stored_for_display(raw: &str, format: TimeFormat) -> String {
    if raw.is_empty() {
        return String::new();
    }
    match parse_time(raw) {
        Ok(time) => format_for_display(time, format),
        Err(e) => {
            tracing::debug!("Showing unparsed time {:?}: {}", raw, e);
            raw.to_string()
        }
    }
}

/// Parse a time the user typed in the configured convention back into the
/// storage form. Callers must reject the edit on error.
pub fn parse_display_to_storage(display: &str, format: TimeFormat) -> Result<TimeOfDay> {
    let trimmed = display.trim();
    match format {
        TimeFormat::H24 => parse_time(trimmed),
        TimeFormat::H12 => parse_twelve_hour(trimmed),
    }
}

fn parse_twelve_hour(display: &str) -> Result<TimeOfDay> {
    let invalid = || Error::InvalidFormat(format!("expected h:MM AM/PM, got {:?}", display));

    let upper = display.to_ascii_uppercase();
    let (clock, is_pm) = if let Some(rest) = upper.strip_suffix("AM") {
        (rest, false)
    } else if let Some(rest) = upper.strip_suffix("PM") {
        (rest, true)
    } else {
        return Err(invalid());
    };

    // At most one space between the digits and the suffix
    let clock = clock.strip_suffix(' ').unwrap_or(clock);

    let (hours, minutes) = clock.split_once(':').ok_or_else(invalid)?;
    if hours.is_empty()
        || hours.len() > 2
        || !hours.bytes().all(|b| b.is_ascii_digit())
        || !is_two_digits(minutes)
    {
        return Err(invalid());
    }

    let hour: u8 = hours.parse().map_err(|_| invalid())?;
    let minute: u8 = minutes.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&hour) {
        return Err(invalid());
    }

    let hour = match (hour, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };
    TimeOfDay::new(hour, minute)
}

/// Whether `display` parses in the given convention.
pub fn is_valid_display_time(display: &str, format: TimeFormat) -> bool {
    parse_display_to_storage(display, format).is_ok()
}

/// Total order over times of day.
pub fn compare(a: TimeOfDay, b: TimeOfDay) -> Ordering {
    a.cmp(&b)
}

// ============================================================================
// Countdown
// ============================================================================

/// Time remaining until a dose comes due
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeUntil {
    pub hours: u32,
    pub minutes: u32,
}

impl fmt::Display for TimeUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hours == 0 {
            write!(f, "{}m", self.minutes)
        } else {
            write!(f, "{}h {}m", self.hours, self.minutes)
        }
    }
}

/// Time until the next occurrence of `scheduled`.
///
/// A scheduled time earlier than `current` is treated as tomorrow's.
pub fn minutes_until(scheduled: TimeOfDay, current: TimeOfDay) -> TimeUntil {
    let now = current.minutes_since_midnight();
    let mut target = scheduled.minutes_since_midnight();
    if target < now {
        target += MINUTES_PER_DAY;
    }
    let diff = target - now;
    TimeUntil {
        hours: diff / 60,
        minutes: diff % 60,
    }
}
