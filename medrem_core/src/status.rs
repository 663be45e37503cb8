//! Live dose status classification.
//!
//! Maps a scheduled time and the current time to upcoming/current/missed.
//! There is no day-boundary handling: a 23:00 dose at 00:30 is `Upcoming`,
//! so callers must re-derive the scheduled date across midnight.

use crate::{LiveStatus, TimeOfDay};

/// Hours after which an unlogged dose counts as missed
const MISSED_AFTER_HOURS: i32 = 2;

/// Classify a scheduled time against the current time.
///
/// The missed check compares hours first and only looks at minutes when the
/// hour difference is exactly two: `08:00` is still current at `10:00` and
/// missed at `10:01`. Before 02:00 nothing can be missed.
pub fn classify(scheduled: TimeOfDay, current: TimeOfDay) -> LiveStatus {
    let scheduled_hour = scheduled.hour() as i32;
    let scheduled_minute = scheduled.minute() as i32;
    let current_hour = current.hour() as i32;
    let current_minute = current.minute() as i32;
    let cutoff_hour = current_hour - MISSED_AFTER_HOURS;

    if scheduled_hour < cutoff_hour
        || (scheduled_hour == cutoff_hour && scheduled_minute < current_minute)
    {
        return LiveStatus::Missed;
    }

    if scheduled_hour > current_hour
        || (scheduled_hour == current_hour && scheduled_minute > current_minute)
    {
        return LiveStatus::Upcoming;
    }

    LiveStatus::Current
}
