//! Dose history views and CSV export.

use crate::catalog::Catalog;
use crate::{MedicationLog, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::Path;

/// Name shown for log entries whose medication has been removed
pub const UNKNOWN_MEDICATION: &str = "Unknown Medication";

/// Group log entries by scheduled date.
///
/// Dates come newest first; entries within a date are ordered by scheduled
/// time, keeping insertion order for ties.
pub fn group_logs_by_date(logs: &[MedicationLog]) -> Vec<(NaiveDate, Vec<&MedicationLog>)> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&MedicationLog>> = BTreeMap::new();
    for log in logs {
        by_date.entry(log.scheduled_date).or_default().push(log);
    }

    by_date
        .into_iter()
        .rev()
        .map(|(date, mut entries)| {
            entries.sort_by_key(|log| log.scheduled_time);
            (date, entries)
        })
        .collect()
}

/// Display name for a medication id
pub fn medication_name<'a>(catalog: &'a Catalog, medication_id: &str) -> &'a str {
    catalog
        .get(medication_id)
        .map(|m| m.name.as_str())
        .unwrap_or(UNKNOWN_MEDICATION)
}

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    id: String,
    date: String,
    scheduled_time: String,
    medication_id: &'a str,
    medication: &'a str,
    status: String,
    actual_time: Option<String>,
    skip_reason: Option<&'a str>,
    recorded_at: String,
}

impl<'a> CsvRow<'a> {
    fn new(log: &'a MedicationLog, catalog: &'a Catalog) -> Self {
        CsvRow {
            id: log.id.to_string(),
            date: log.scheduled_date.to_string(),
            scheduled_time: log.scheduled_time.to_string(),
            medication_id: &log.medication_id,
            medication: medication_name(catalog, &log.medication_id),
            status: crate::DoseStatus::from(log.status).to_string(),
            actual_time: log.actual_time.map(|t| t.to_string()),
            skip_reason: log.skip_reason.as_deref(),
            recorded_at: log.created_at.to_rfc3339(),
        }
    }
}

/// Write every log entry to a CSV file, replacing any existing file.
///
/// Rows follow [`group_logs_by_date`] order. Returns the number of rows.
pub fn export_csv(logs: &[MedicationLog], catalog: &Catalog, path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    let mut count = 0;
    for (_, entries) in group_logs_by_date(logs) {
        for log in entries {
            writer.serialize(CsvRow::new(log, catalog))?;
            count += 1;
        }
    }

    writer.flush()?;
    tracing::info!("Exported {} log entries to {:?}", count, path);
    Ok(count)
}
