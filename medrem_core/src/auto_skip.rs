//! Auto-skip reconciliation.
//!
//! A dose left unlogged in the `missed` state is converted into an explicit
//! `skipped` entry once the next dose of the same medication comes due.
//! Rules, per medication with times sorted ascending:
//! - only adjacent pairs `(t[i], t[i+1])` are considered, so the last slot of
//!   the day is never auto-skipped
//! - `t[i]` must have no log for today and classify as missed
//! - `t[i+1]` must be current or at/before now
//!
//! The "no log" guard makes the pass idempotent once its output is appended.

use crate::clock::Clock;
use crate::log_store::LogSink;
use crate::projection::find_log;
use crate::status::classify;
use crate::time::compare;
use crate::{actions, LiveStatus, Medication, MedicationLog, Result, TimeOfDay};
use chrono::NaiveDate;
use std::cmp::Ordering;

/// Reason stored on entries written by the auto-skip pass
pub const AUTO_SKIP_REASON: &str = "Automatically skipped: the next dose is already due";

/// Schedule times of `medication` that should be auto-skipped right now.
pub fn times_to_skip(
    medication: &Medication,
    logs: &[MedicationLog],
    today: NaiveDate,
    now: TimeOfDay,
) -> Vec<TimeOfDay> {
    if !medication.is_scheduled() {
        return Vec::new();
    }

    medication
        .sorted_times()
        .windows(2)
        .filter_map(|pair| {
            let (time, next) = (pair[0], pair[1]);

            if find_log(logs, &medication.id, time, today).is_some() {
                return None;
            }
            if classify(time, now) != LiveStatus::Missed {
                return None;
            }

            let next_due = classify(next, now) == LiveStatus::Current
                || compare(next, now) != Ordering::Greater;
            next_due.then_some(time)
        })
        .collect()
}

/// Build the `skipped` entries the policy would write, without writing them.
pub fn auto_skip_pass(
    medications: &[Medication],
    logs: &[MedicationLog],
    clock: &dyn Clock,
) -> Vec<MedicationLog> {
    let today = clock.today();
    let now = clock.time_of_day();

    medications
        .iter()
        .flat_map(|med| {
            times_to_skip(med, logs, today, now)
                .into_iter()
                .map(move |time| {
                    actions::record_skipped(&med.id, time, today, AUTO_SKIP_REASON, clock)
                })
        })
        .collect()
}

/// Run one reconciliation tick and append its entries to `sink`.
///
/// Returns the entries written so callers holding an in-memory copy of the
/// log can extend it.
pub fn run_auto_skip(
    medications: &[Medication],
    logs: &[MedicationLog],
    sink: &mut dyn LogSink,
    clock: &dyn Clock,
) -> Result<Vec<MedicationLog>> {
    let entries = auto_skip_pass(medications, logs, clock);

    for entry in &entries {
        sink.append(entry)?;
        tracing::info!(
            "Auto-skipped {} at {} on {}",
            entry.medication_id,
            entry.scheduled_time,
            entry.scheduled_date
        );
    }

    if entries.is_empty() {
        tracing::debug!("Auto-skip pass at {}: nothing to do", clock.time_of_day());
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::record_taken;
    use crate::clock::FixedClock;
    use crate::projection::project_doses_for_date;
    use crate::time::parse_time;
    use crate::{DoseStatus, Frequency, LogStatus};
    use chrono::Utc;

    fn t(s: &str) -> TimeOfDay {
        parse_time(s).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn med(id: &str, frequency: Frequency, times: &[&str]) -> Medication {
        Medication {
            id: id.into(),
            name: "Paracetamol 500mg".into(),
            dosage: "500mg".into(),
            frequency,
            times: times.iter().map(|s| t(s)).collect(),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn paracetamol() -> Medication {
        med("med1", Frequency::Four, &["08:00", "12:00", "16:00", "20:00"])
    }

    fn skipped_times(entries: &[MedicationLog]) -> Vec<String> {
        entries.iter().map(|e| e.scheduled_time.to_string()).collect()
    }

    #[test]
    fn test_paracetamol_at_half_past_two() {
        let clock = FixedClock::at(day(), t("14:30"));
        let entries = auto_skip_pass(&[paracetamol()], &[], &clock);

        // 12:00 stays missed until 16:00 comes due
        assert_eq!(skipped_times(&entries), vec!["08:00"]);
        let entry = &entries[0];
        assert_eq!(entry.status, LogStatus::Skipped);
        assert_eq!(entry.skip_reason.as_deref(), Some(AUTO_SKIP_REASON));
        assert_eq!(entry.actual_time, Some(t("14:30")));
        assert_eq!(entry.scheduled_date, day());
    }

    #[test]
    fn test_later_tick_skips_next_missed_dose() {
        crate::logging::init_test();
        let mut clock = FixedClock::at(day(), t("14:30"));
        let mut logs: Vec<MedicationLog> = Vec::new();
        run_auto_skip(&[paracetamol()], &[], &mut logs, &clock).unwrap();

        clock.set_time(t("16:00"));
        let snapshot = logs.clone();
        let written = run_auto_skip(&[paracetamol()], &snapshot, &mut logs, &clock).unwrap();
        assert_eq!(skipped_times(&written), vec!["12:00"]);

        let projected = project_doses_for_date(&[paracetamol()], &logs, day(), t("16:00"));
        let statuses: Vec<_> = projected.iter().map(|p| p.status).collect();
        assert_eq!(
            statuses,
            vec![
                DoseStatus::Skipped,
                DoseStatus::Skipped,
                DoseStatus::Current,
                DoseStatus::Upcoming,
            ]
        );
    }

    #[test]
    fn test_idempotent_when_output_appended() {
        let clock = FixedClock::at(day(), t("14:30"));
        let mut logs: Vec<MedicationLog> = Vec::new();

        let first = run_auto_skip(&[paracetamol()], &[], &mut logs, &clock).unwrap();
        let snapshot = logs.clone();
        let second = run_auto_skip(&[paracetamol()], &snapshot, &mut logs, &clock).unwrap();

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert_eq!(logs.len(), 1);
    }

    #[test]
    fn test_last_slot_never_skipped() {
        let clock = FixedClock::at(day(), t("23:59"));
        let entries = auto_skip_pass(&[paracetamol()], &[], &clock);
        assert_eq!(skipped_times(&entries), vec!["08:00", "12:00", "16:00"]);

        let single = med("med2", Frequency::Once, &["08:00"]);
        assert!(auto_skip_pass(&[single], &[], &clock).is_empty());
    }

    #[test]
    fn test_logged_doses_untouched() {
        let clock = FixedClock::at(day(), t("14:30"));
        let logs = vec![record_taken("med1", t("08:00"), day(), &clock)];
        assert!(auto_skip_pass(&[paracetamol()], &logs, &clock).is_empty());
    }

    #[test]
    fn test_yesterdays_logs_do_not_guard_today() {
        let clock = FixedClock::at(day(), t("14:30"));
        let yesterday = day().pred_opt().unwrap();
        let logs = vec![record_taken("med1", t("08:00"), yesterday, &clock)];
        let entries = auto_skip_pass(&[paracetamol()], &logs, &clock);
        assert_eq!(skipped_times(&entries), vec!["08:00"]);
    }

    #[test]
    fn test_unsorted_schedule_walked_in_time_order() {
        let clock = FixedClock::at(day(), t("14:30"));
        let shuffled = med("med1", Frequency::Four, &["20:00", "12:00", "08:00", "16:00"]);
        let entries = auto_skip_pass(&[shuffled], &[], &clock);
        assert_eq!(skipped_times(&entries), vec!["08:00"]);
    }

    #[test]
    fn test_as_needed_ignored() {
        let clock = FixedClock::at(day(), t("23:00"));
        let mut prn = med("prn", Frequency::AsNeeded, &[]);
        assert!(auto_skip_pass(std::slice::from_ref(&prn), &[], &clock).is_empty());

        // Even with stray times left on an as-needed record
        prn.times = vec![t("08:00"), t("12:00")];
        assert!(auto_skip_pass(&[prn], &[], &clock).is_empty());
    }

    #[test]
    fn test_missed_dose_waits_for_due_successor() {
        // 08:00 is missed at 10:01 but 11:00 is not yet due
        let clock = FixedClock::at(day(), t("10:01"));
        let m = med("m", Frequency::Twice, &["08:00", "11:00"]);
        assert!(auto_skip_pass(std::slice::from_ref(&m), &[], &clock).is_empty());

        let clock = FixedClock::at(day(), t("11:00"));
        assert_eq!(skipped_times(&auto_skip_pass(&[m], &[], &clock)), vec!["08:00"]);
    }

    #[test]
    fn test_repeated_time_skipped_once() {
        let clock = FixedClock::at(day(), t("14:30"));
        let m = med("m", Frequency::Thrice, &["08:00", "08:00", "12:00"]);

        let entries = auto_skip_pass(std::slice::from_ref(&m), &[], &clock);
        assert_eq!(skipped_times(&entries), vec!["08:00"]);
    }
}
