//! Core domain types for the medication tracker.
//!
//! This module defines the records the engine consumes and produces:
//! - Medications and their dosing frequency
//! - Log entries recording what happened to a scheduled dose
//! - Derived doses and their effective status

use crate::{Error, Result, TimeOfDay};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Medication Types
// ============================================================================

/// How often a medication is taken
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum Frequency {
    #[default]
    Once,
    Twice,
    Thrice,
    Four,
    /// Taken on demand; never projected into the daily schedule
    AsNeeded,
}

impl Frequency {
    /// Number of daily doses, `None` for as-needed medications.
    pub fn doses_per_day(&self) -> Option<usize> {
        match self {
            Frequency::Once => Some(1),
            Frequency::Twice => Some(2),
            Frequency::Thrice => Some(3),
            Frequency::Four => Some(4),
            Frequency::AsNeeded => None,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        *self != Frequency::AsNeeded
    }
}

impl FromStr for Frequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "once" => Ok(Frequency::Once),
            "twice" => Ok(Frequency::Twice),
            "thrice" => Ok(Frequency::Thrice),
            "four" => Ok(Frequency::Four),
            "asneeded" | "as_needed" | "as-needed" => Ok(Frequency::AsNeeded),
            other => Err(Error::InvalidFormat(format!("unknown frequency: {}", other))),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Frequency::Once => "once",
            Frequency::Twice => "twice",
            Frequency::Thrice => "thrice",
            Frequency::Four => "four",
            Frequency::AsNeeded => "asNeeded",
        };
        f.write_str(s)
    }
}

/// A medication in the user's catalog
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Medication {
    pub id: String,
    pub name: String,
    pub dosage: String,
    pub frequency: Frequency,
    /// Times of day in 24h form, unique within the medication
    #[serde(default)]
    pub times: Vec<TimeOfDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Medication {
    /// Whether this medication contributes doses to the daily schedule
    pub fn is_scheduled(&self) -> bool {
        self.frequency.is_scheduled()
    }

    /// Schedule times in ascending order, each time once
    ///
    /// A hand-edited catalog file can repeat a time; the repeat is the same
    /// dose and must not be projected or skipped twice.
    pub fn sorted_times(&self) -> Vec<TimeOfDay> {
        let mut times = self.times.clone();
        times.sort();
        times.dedup();
        times
    }
}

// ============================================================================
// Log Types
// ============================================================================

/// Recorded outcome of a scheduled dose
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Taken,
    Skipped,
    Missed,
}

/// An append-only record of what happened to one scheduled dose
///
/// (medication_id, scheduled_time, scheduled_date) is the natural key.
/// Stores do not enforce it; readers take the first match.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MedicationLog {
    pub id: Uuid,
    pub medication_id: String,
    pub scheduled_time: TimeOfDay,
    pub scheduled_date: NaiveDate,
    pub status: LogStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_time: Option<TimeOfDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MedicationLog {
    /// Whether this entry belongs to the given dose
    pub fn matches(&self, medication_id: &str, time: TimeOfDay, date: NaiveDate) -> bool {
        self.medication_id == medication_id
            && self.scheduled_time == time
            && self.scheduled_date == date
    }
}

// ============================================================================
// Derived Dose Types
// ============================================================================

/// Status computed from the clock alone, for doses with no log entry
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LiveStatus {
    Upcoming,
    Current,
    Missed,
}

/// Effective status of a dose: the logged status if any, else the live one
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DoseStatus {
    Upcoming,
    Current,
    Missed,
    Taken,
    Skipped,
}

impl DoseStatus {
    /// Upcoming and current doses are presented together
    pub fn is_pending(&self) -> bool {
        matches!(self, DoseStatus::Upcoming | DoseStatus::Current)
    }
}

impl From<LogStatus> for DoseStatus {
    fn from(status: LogStatus) -> Self {
        match status {
            LogStatus::Taken => DoseStatus::Taken,
            LogStatus::Skipped => DoseStatus::Skipped,
            LogStatus::Missed => DoseStatus::Missed,
        }
    }
}

impl From<LiveStatus> for DoseStatus {
    fn from(status: LiveStatus) -> Self {
        match status {
            LiveStatus::Upcoming => DoseStatus::Upcoming,
            LiveStatus::Current => DoseStatus::Current,
            LiveStatus::Missed => DoseStatus::Missed,
        }
    }
}

impl fmt::Display for DoseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DoseStatus::Upcoming => "upcoming",
            DoseStatus::Current => "current",
            DoseStatus::Missed => "missed",
            DoseStatus::Taken => "taken",
            DoseStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// One scheduled dose of a medication on a given date
///
/// Display fields are copied from the medication when the dose is projected.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Dose {
    pub medication_id: String,
    pub name: String,
    pub dosage: String,
    pub notes: Option<String>,
    pub scheduled_time: TimeOfDay,
    pub scheduled_date: NaiveDate,
}

impl Dose {
    /// Stable display key, e.g. `med_default_1_08:00`
    pub fn key(&self) -> String {
        format!("{}_{}", self.medication_id, self.scheduled_time)
    }
}

/// A dose together with its effective status
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ProjectedDose {
    pub dose: Dose,
    pub status: DoseStatus,
    /// Log entry the status came from, if any
    pub log_id: Option<Uuid>,
}
