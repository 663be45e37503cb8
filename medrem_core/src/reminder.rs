//! Reminder scheduling.
//!
//! Builds the daily repeating reminders a notification backend should hold
//! for each scheduled dose. Delivery is left to the caller.

use crate::catalog::Catalog;
use crate::clock::Clock;
use crate::config::NotificationConfig;
use crate::{Medication, TimeOfDay};
use chrono::{Days, NaiveDateTime};
use serde::Serialize;

pub const REMINDER_TITLE: &str = "Medication Reminder";

/// A daily reminder for one dose time
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Reminder {
    pub medication_id: String,
    pub time: TimeOfDay,
    pub title: String,
    pub body: String,
    pub sound: bool,
    /// First firing; repeats daily at `time` afterwards
    pub next_fire: NaiveDateTime,
}

/// Next local instant at `time`: today unless already passed, else tomorrow.
pub fn next_fire(time: TimeOfDay, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(time.to_naive());
    if today < now {
        today
            .checked_add_days(Days::new(1))
            .unwrap_or(today)
    } else {
        today
    }
}

/// Reminders for every time of one medication. As-needed medications get none.
pub fn reminders_for(medication: &Medication, sound: bool, clock: &dyn Clock) -> Vec<Reminder> {
    if !medication.is_scheduled() {
        return Vec::new();
    }

    let now = clock.local_now();
    medication
        .sorted_times()
        .into_iter()
        .map(|time| Reminder {
            medication_id: medication.id.clone(),
            time,
            title: REMINDER_TITLE.to_string(),
            body: format!(
                "It's time to take {} ({})",
                medication.name, medication.dosage
            ),
            sound,
            next_fire: next_fire(time, now),
        })
        .collect()
}

/// All reminders for the catalog, soonest first.
///
/// Empty when notifications are disabled.
pub fn schedule_all(
    catalog: &Catalog,
    settings: &NotificationConfig,
    clock: &dyn Clock,
) -> Vec<Reminder> {
    if !settings.enabled {
        tracing::debug!("Notifications disabled, no reminders scheduled");
        return Vec::new();
    }

    let mut reminders: Vec<Reminder> = catalog
        .medications
        .iter()
        .flat_map(|m| reminders_for(m, settings.sound, clock))
        .collect();
    reminders.sort_by(|a, b| a.next_fire.cmp(&b.next_fire));

    tracing::debug!("Scheduled {} reminders", reminders.len());
    reminders
}
