//! Injectable time source.
//!
//! Every engine function takes "now" as a parameter; the clock is the single
//! place the application reads it from.

use crate::TimeOfDay;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Supplies the current local date/time and the current instant
pub trait Clock {
    /// Local wall-clock time
    fn local_now(&self) -> NaiveDateTime;

    /// Instant used for record timestamps
    fn utc_now(&self) -> DateTime<Utc>;

    /// Calendar date doses are projected for
    fn today(&self) -> NaiveDate {
        self.local_now().date()
    }

    /// Current time-of-day truncated to the minute
    fn time_of_day(&self) -> TimeOfDay {
        TimeOfDay::from_naive(self.local_now().time())
    }
}

/// The platform clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn local_now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to one moment, for tests and `--date`/`--at` overrides.
///
/// The pinned local time doubles as the UTC instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock {
    now: NaiveDateTime,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now }
    }

    pub fn at(date: NaiveDate, time: TimeOfDay) -> Self {
        Self::new(date.and_time(time.to_naive()))
    }

    /// Move the clock to another time on the same day.
    pub fn set_time(&mut self, time: TimeOfDay) {
        self.now = self.now.date().and_time(time.to_naive());
    }
}

impl Clock for FixedClock {
    fn local_now(&self) -> NaiveDateTime {
        self.now
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.now)
    }
}
