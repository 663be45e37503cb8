//! Medication catalog and its create/update/delete operations.
//!
//! The catalog is plain state owned by the application; every mutation goes
//! through [`Catalog::add`], [`Catalog::update`] or [`Catalog::remove`] so the
//! medication invariants hold:
//! - as-needed medications carry no times
//! - every other frequency has at least one time
//! - times are unique within a medication

use crate::clock::Clock;
use crate::config::ScheduleConfig;
use crate::{Error, Frequency, Medication, Result, TimeOfDay};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// User input for a new medication (or the merged result of an edit)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MedicationDraft {
    pub name: String,
    pub dosage: String,
    pub frequency: Frequency,
    pub times: Vec<TimeOfDay>,
    pub notes: Option<String>,
}

impl MedicationDraft {
    /// Trim text fields, drop duplicate times and clear times for as-needed.
    pub fn normalize(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.dosage = self.dosage.trim().to_string();
        self.notes = self
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        if self.frequency.is_scheduled() {
            let mut seen = HashSet::new();
            self.times.retain(|t| seen.insert(*t));
        } else {
            self.times.clear();
        }
        self
    }

    /// Caller-level checks run before a draft enters the catalog
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("medication name is required".into()));
        }
        if self.dosage.trim().is_empty() {
            return Err(Error::Validation("dosage is required".into()));
        }
        if self.frequency.is_scheduled() && self.times.is_empty() {
            return Err(Error::Validation(format!(
                "a {} medication needs at least one time",
                self.frequency
            )));
        }
        Ok(())
    }
}

/// Partial update; `None` leaves a field unchanged
#[derive(Clone, Debug, Default)]
pub struct MedicationPatch {
    pub name: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<Frequency>,
    pub times: Option<Vec<TimeOfDay>>,
    /// `Some(None)` clears the notes
    pub notes: Option<Option<String>>,
}

/// The user's medications, in insertion order
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    pub medications: Vec<Medication>,
}

impl Catalog {
    pub fn new(medications: Vec<Medication>) -> Self {
        Self { medications }
    }

    pub fn get(&self, id: &str) -> Option<&Medication> {
        self.medications.iter().find(|m| m.id == id)
    }

    /// Like [`Catalog::get`] but an unknown id is an error
    pub fn require(&self, id: &str) -> Result<&Medication> {
        self.get(id)
            .ok_or_else(|| Error::NotFound(format!("medication '{}'", id)))
    }

    /// Validate and insert a new medication with a fresh id.
    pub fn add(&mut self, draft: MedicationDraft, clock: &dyn Clock) -> Result<&Medication> {
        let draft = draft.normalize();
        draft.validate()?;

        let now = clock.utc_now();
        let medication = Medication {
            id: self.fresh_id(),
            name: draft.name,
            dosage: draft.dosage,
            frequency: draft.frequency,
            times: draft.times,
            notes: draft.notes,
            created_at: now,
            updated_at: now,
        };

        tracing::info!("Added medication {} ({})", medication.id, medication.name);
        let id = medication.id.clone();
        self.medications.push(medication);
        self.require(&id)
    }

    /// Apply a patch and refresh the modification timestamp.
    pub fn update(
        &mut self,
        id: &str,
        patch: MedicationPatch,
        clock: &dyn Clock,
    ) -> Result<&Medication> {
        let index = self
            .medications
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| Error::NotFound(format!("medication '{}'", id)))?;

        let current = &self.medications[index];
        let draft = MedicationDraft {
            name: patch.name.unwrap_or_else(|| current.name.clone()),
            dosage: patch.dosage.unwrap_or_else(|| current.dosage.clone()),
            frequency: patch.frequency.unwrap_or(current.frequency),
            times: patch.times.unwrap_or_else(|| current.times.clone()),
            notes: patch.notes.unwrap_or_else(|| current.notes.clone()),
        }
        .normalize();
        draft.validate()?;

        let medication = &mut self.medications[index];
        medication.name = draft.name;
        medication.dosage = draft.dosage;
        medication.frequency = draft.frequency;
        medication.times = draft.times;
        medication.notes = draft.notes;
        medication.updated_at = clock.utc_now();

        tracing::info!("Updated medication {}", id);
        Ok(&self.medications[index])
    }

    /// Remove a medication. Its log entries are left in place.
    pub fn remove(&mut self, id: &str) -> Result<Medication> {
        let index = self
            .medications
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| Error::NotFound(format!("medication '{}'", id)))?;
        let removed = self.medications.remove(index);
        tracing::info!("Removed medication {} ({})", removed.id, removed.name);
        Ok(removed)
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = format!("med_{}", Uuid::new_v4().simple());
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    /// Validate the catalog's invariants
    ///
    /// Returns a list of problems; empty means the catalog is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut ids = HashSet::new();

        for med in &self.medications {
            if med.id.is_empty() {
                errors.push("Medication has empty ID".to_string());
            }
            if !ids.insert(med.id.as_str()) {
                errors.push(format!("Duplicate medication ID '{}'", med.id));
            }
            if med.name.trim().is_empty() {
                errors.push(format!("Medication '{}' has empty name", med.id));
            }

            match (med.frequency.is_scheduled(), med.times.is_empty()) {
                (true, true) => errors.push(format!(
                    "Medication '{}' is {} but has no times",
                    med.id, med.frequency
                )),
                (false, false) => errors.push(format!(
                    "Medication '{}' is asNeeded but has scheduled times",
                    med.id
                )),
                _ => {}
            }

            let unique: HashSet<_> = med.times.iter().collect();
            if unique.len() != med.times.len() {
                errors.push(format!("Medication '{}' has duplicate times", med.id));
            }
        }

        errors
    }
}

/// Times prefilled for a new medication of the given frequency
pub fn default_times(frequency: Frequency, schedule: &ScheduleConfig) -> Vec<TimeOfDay> {
    schedule.times_for(frequency)
}

/// Built-in sample medications used when no catalog has been saved yet
pub fn build_default_catalog(clock: &dyn Clock) -> Catalog {
    let now = clock.utc_now();
    let sample = |id: &str,
                  name: &str,
                  dosage: &str,
                  frequency: Frequency,
                  times: &[(u8, u8)],
                  notes: &str| Medication {
        id: id.into(),
        name: name.into(),
        dosage: dosage.into(),
        frequency,
        times: times
            .iter()
            .filter_map(|&(h, m)| TimeOfDay::new(h, m).ok())
            .collect(),
        notes: Some(notes.into()),
        created_at: now,
        updated_at: now,
    };

    Catalog::new(vec![
        sample(
            "med_default_1",
            "Paracetamol 500mg",
            "500mg",
            Frequency::Four,
            &[(8, 0), (12, 0), (16, 0), (20, 0)],
            "After meal",
        ),
        sample(
            "med_default_2",
            "Amoxicillin 250mg",
            "250mg",
            Frequency::Thrice,
            &[(8, 0), (14, 0), (20, 0)],
            "Before meal, full glass of water",
        ),
        sample(
            "med_default_3",
            "Metformin 850mg",
            "850mg",
            Frequency::Twice,
            &[(8, 0), (20, 0)],
            "With meal",
        ),
        sample(
            "med_default_4",
            "Vitamin D3 1000IU",
            "1000IU",
            Frequency::Once,
            &[(8, 0)],
            "After breakfast",
        ),
        sample(
            "med_default_5",
            "Ibuprofen 200mg",
            "200mg",
            Frequency::AsNeeded,
            &[],
            "After meal, not on empty stomach",
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::time::parse_time;
    use chrono::{NaiveDate, NaiveDateTime};

    fn t(s: &str) -> TimeOfDay {
        parse_time(s).unwrap()
    }

    fn clock_at(time: &str) -> FixedClock {
        FixedClock::at(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), t(time))
    }

    fn draft(name: &str, frequency: Frequency, times: &[&str]) -> MedicationDraft {
        MedicationDraft {
            name: name.into(),
            dosage: "10mg".into(),
            frequency,
            times: times.iter().map(|s| t(s)).collect(),
            notes: None,
        }
    }

    #[test]
    fn test_default_catalog_validates() {
        let catalog = build_default_catalog(&clock_at("08:00"));
        let errors = catalog.validate();
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
        assert_eq!(catalog.medications.len(), 5);
        assert_eq!(
            catalog.get("med_default_5").unwrap().frequency,
            Frequency::AsNeeded
        );
    }

    #[test]
    fn test_add_normalizes_and_assigns_id() {
        let mut catalog = Catalog::default();
        let mut d = draft("  Lisinopril ", Frequency::Twice, &["08:00", "20:00", "08:00"]);
        d.notes = Some("   ".into());

        let med = catalog.add(d, &clock_at("09:00")).unwrap().clone();
        assert!(med.id.starts_with("med_"));
        assert_eq!(med.name, "Lisinopril");
        assert_eq!(med.times, vec![t("08:00"), t("20:00")]);
        assert_eq!(med.notes, None);
        assert_eq!(med.created_at, med.updated_at);
    }

    #[test]
    fn test_add_returns_the_new_medication() {
        let mut catalog = build_default_catalog(&clock_at("08:00"));
        let added = catalog
            .add(draft("Aspirin", Frequency::Once, &["07:00"]), &clock_at("09:00"))
            .unwrap()
            .clone();

        assert_eq!(added.name, "Aspirin");
        assert_eq!(catalog.medications.len(), 6);
        assert_eq!(catalog.require(&added.id).unwrap(), &added);
    }

    #[test]
    fn test_add_as_needed_clears_times() {
        let mut catalog = Catalog::default();
        let med = catalog
            .add(draft("Ibuprofen", Frequency::AsNeeded, &["08:00"]), &clock_at("09:00"))
            .unwrap();
        assert!(med.times.is_empty());
    }

    #[test]
    fn test_add_rejects_invalid_drafts() {
        let mut catalog = Catalog::default();
        let clock = clock_at("09:00");

        let blank_name = draft("  ", Frequency::Once, &["08:00"]);
        assert!(matches!(catalog.add(blank_name, &clock), Err(Error::Validation(_))));

        let mut blank_dosage = draft("A", Frequency::Once, &["08:00"]);
        blank_dosage.dosage = String::new();
        assert!(matches!(catalog.add(blank_dosage, &clock), Err(Error::Validation(_))));

        let no_times = draft("A", Frequency::Once, &[]);
        assert!(matches!(catalog.add(no_times, &clock), Err(Error::Validation(_))));

        assert!(catalog.medications.is_empty());
    }

    #[test]
    fn test_update_refreshes_timestamp() {
        let mut catalog = Catalog::default();
        let id = catalog
            .add(draft("A", Frequency::Once, &["08:00"]), &clock_at("09:00"))
            .unwrap()
            .id
            .clone();

        let later = FixedClock::new(NaiveDateTime::new(
            NaiveDate::from_ymd_opt(2024, 6, 2).unwrap(),
            t("10:00").to_naive(),
        ));
        let patch = MedicationPatch {
            frequency: Some(Frequency::Twice),
            times: Some(vec![t("09:00"), t("21:00")]),
            ..Default::default()
        };
        let med = catalog.update(&id, patch, &later).unwrap();

        assert_eq!(med.frequency, Frequency::Twice);
        assert_eq!(med.times.len(), 2);
        assert_eq!(med.name, "A");
        assert!(med.updated_at > med.created_at);
    }

    #[test]
    fn test_update_rejects_invariant_breaks() {
        let mut catalog = Catalog::default();
        let clock = clock_at("09:00");
        let id = catalog
            .add(draft("A", Frequency::Once, &["08:00"]), &clock)
            .unwrap()
            .id
            .clone();

        let patch = MedicationPatch {
            times: Some(vec![]),
            ..Default::default()
        };
        assert!(matches!(catalog.update(&id, patch, &clock), Err(Error::Validation(_))));
        assert_eq!(catalog.get(&id).unwrap().times, vec![t("08:00")]);
    }

    #[test]
    fn test_remove_and_not_found() {
        let mut catalog = build_default_catalog(&clock_at("08:00"));
        let removed = catalog.remove("med_default_2").unwrap();
        assert_eq!(removed.name, "Amoxicillin 250mg");
        assert!(matches!(catalog.remove("med_default_2"), Err(Error::NotFound(_))));
        assert!(matches!(catalog.require("nope"), Err(Error::NotFound(_))));
        assert!(matches!(
            catalog.update("nope", MedicationPatch::default(), &clock_at("08:00")),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_default_times_follow_schedule() {
        let schedule = ScheduleConfig::default();
        assert_eq!(
            default_times(Frequency::Thrice, &schedule),
            vec![t("08:00"), t("14:00"), t("20:00")]
        );
        assert!(default_times(Frequency::AsNeeded, &schedule).is_empty());
    }

    #[test]
    fn test_validate_flags_problems() {
        let clock = clock_at("08:00");
        let mut catalog = build_default_catalog(&clock);
        catalog.medications[0].times.push(t("08:00"));
        catalog.medications[1].id = "med_default_1".into();
        catalog.medications[4].times.push(t("08:00"));

        let errors = catalog.validate();
        assert_eq!(errors.len(), 3, "{:?}", errors);
    }
}
