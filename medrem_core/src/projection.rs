//! Daily dose projection.
//!
//! Expands each scheduled medication into one dose per schedule time for a
//! target date, then joins every dose against the log to find its effective
//! status:
//! - a matching log entry is authoritative (first match in store order)
//! - otherwise the dose is classified live against `now`

use crate::status::classify;
use crate::{Dose, DoseStatus, Medication, MedicationLog, ProjectedDose, TimeOfDay};
use chrono::NaiveDate;

/// Find the first log entry for a dose.
pub fn find_log<'a>(
    logs: &'a [MedicationLog],
    medication_id: &str,
    time: TimeOfDay,
    date: NaiveDate,
) -> Option<&'a MedicationLog> {
    logs.iter().find(|log| log.matches(medication_id, time, date))
}

/// Expand the catalog into the doses scheduled for `date`, sorted by time.
///
/// As-needed medications contribute nothing. Doses at the same time keep
/// catalog order.
pub fn doses_for_date(medications: &[Medication], date: NaiveDate) -> Vec<Dose> {
    let mut doses: Vec<Dose> = medications
        .iter()
        .filter(|med| med.is_scheduled())
        .flat_map(|med| {
            med.sorted_times().into_iter().map(move |time| Dose {
                medication_id: med.id.clone(),
                name: med.name.clone(),
                dosage: med.dosage.clone(),
                notes: med.notes.clone(),
                scheduled_time: time,
                scheduled_date: date,
            })
        })
        .collect();

    // Stable: equal times stay in catalog order
    doses.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time));
    doses
}

/// Project every dose for `date` with its effective status.
///
/// `now` is the current time-of-day used for doses without a log entry.
pub fn project_doses_for_date(
    medications: &[Medication],
    logs: &[MedicationLog],
    date: NaiveDate,
    now: TimeOfDay,
) -> Vec<ProjectedDose> {
    let projected: Vec<ProjectedDose> = doses_for_date(medications, date)
        .into_iter()
        .map(|dose| {
            match find_log(logs, &dose.medication_id, dose.scheduled_time, date) {
                Some(log) => ProjectedDose {
                    status: log.status.into(),
                    log_id: Some(log.id),
                    dose,
                },
                None => ProjectedDose {
                    status: classify(dose.scheduled_time, now).into(),
                    log_id: None,
                    dose,
                },
            }
        })
        .collect();

    tracing::debug!("Projected {} doses for {} at {}", projected.len(), date, now);
    projected
}

/// Projected doses bucketed the way they are presented
#[derive(Clone, Debug, Default)]
pub struct DoseGroups {
    /// Current and upcoming doses together, in time order
    pub upcoming: Vec<ProjectedDose>,
    pub taken: Vec<ProjectedDose>,
    pub missed: Vec<ProjectedDose>,
    pub skipped: Vec<ProjectedDose>,
}

impl DoseGroups {
    pub fn is_empty(&self) -> bool {
        self.upcoming.is_empty()
            && self.taken.is_empty()
            && self.missed.is_empty()
            && self.skipped.is_empty()
    }
}

/// Split time-ordered projected doses into status groups.
pub fn group_by_status(doses: &[ProjectedDose]) -> DoseGroups {
    let mut groups = DoseGroups::default();
    for dose in doses {
        let bucket = match dose.status {
            DoseStatus::Upcoming | DoseStatus::Current => &mut groups.upcoming,
            DoseStatus::Taken => &mut groups.taken,
            DoseStatus::Missed => &mut groups.missed,
            DoseStatus::Skipped => &mut groups.skipped,
        };
        bucket.push(dose.clone());
    }
    groups
}

/// Cluster consecutive doses that share a scheduled time under one heading.
pub fn group_by_time(doses: &[ProjectedDose]) -> Vec<(TimeOfDay, Vec<&ProjectedDose>)> {
    let mut clusters: Vec<(TimeOfDay, Vec<&ProjectedDose>)> = Vec::new();
    for dose in doses {
        match clusters.last_mut() {
            Some((time, members)) if *time == dose.dose.scheduled_time => members.push(dose),
            _ => clusters.push((dose.dose.scheduled_time, vec![dose])),
        }
    }
    clusters
}
