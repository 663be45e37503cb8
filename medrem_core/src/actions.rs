//! Recording user actions on a dose.
//!
//! Both constructors are pure: they build an immutable log entry stamped with
//! the clock and leave appending to the caller's log store.

use crate::clock::Clock;
use crate::{Error, LogStatus, MedicationLog, Result, TimeOfDay};
use chrono::NaiveDate;
use uuid::Uuid;

fn new_entry(
    medication_id: &str,
    scheduled_time: TimeOfDay,
    scheduled_date: NaiveDate,
    status: LogStatus,
    skip_reason: Option<String>,
    clock: &dyn Clock,
) -> MedicationLog {
    MedicationLog {
        id: Uuid::new_v4(),
        medication_id: medication_id.to_string(),
        scheduled_time,
        scheduled_date,
        status,
        actual_time: Some(clock.time_of_day()),
        skip_reason,
        created_at: clock.utc_now(),
    }
}

/// Build a `taken` entry for a dose.
pub fn record_taken(
    medication_id: &str,
    scheduled_time: TimeOfDay,
    scheduled_date: NaiveDate,
    clock: &dyn Clock,
) -> MedicationLog {
    tracing::debug!("Recording {} at {} as taken", medication_id, scheduled_time);
    new_entry(
        medication_id,
        scheduled_time,
        scheduled_date,
        LogStatus::Taken,
        None,
        clock,
    )
}

/// Build a `skipped` entry for a dose.
///
/// The reason is stored as given; see [`validate_skip_reason`] for the
/// caller-side check.
pub fn record_skipped(
    medication_id: &str,
    scheduled_time: TimeOfDay,
    scheduled_date: NaiveDate,
    reason: &str,
    clock: &dyn Clock,
) -> MedicationLog {
    tracing::debug!(
        "Recording {} at {} as skipped: {}",
        medication_id,
        scheduled_time,
        reason
    );
    new_entry(
        medication_id,
        scheduled_time,
        scheduled_date,
        LogStatus::Skipped,
        Some(reason.to_string()),
        clock,
    )
}

/// Reject a blank skip reason.
pub fn validate_skip_reason(reason: &str) -> Result<()> {
    if reason.trim().is_empty() {
        return Err(Error::Validation("a skip reason is required".into()));
    }
    Ok(())
}
