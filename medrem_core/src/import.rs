//! Bulk import of medications from a JSON payload.
//!
//! The payload has the shape `{"data": [record, ...]}`. Missing fields take
//! defaults; a record without a name rejects the whole import. Nothing is
//! merged unless every record is valid.

use crate::catalog::{Catalog, MedicationDraft};
use crate::clock::Clock;
use crate::time::parse_time;
use crate::{Error, Frequency, Result, TimeOfDay};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_DOSAGE: &str = "1 tablet";
const DEFAULT_TIME: TimeOfDay = TimeOfDay::EIGHT_AM;

/// One medication as it appears in an import payload
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ImportRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub times: Option<Vec<String>>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Deserialize)]
struct Payload {
    #[serde(default)]
    data: Option<Vec<ImportRecord>>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ImportRecord {
    /// Apply defaults and parse the record into a draft.
    pub fn into_draft(self) -> Result<MedicationDraft> {
        let name = non_blank(self.name)
            .ok_or_else(|| Error::Validation("imported medication has no name".into()))?;

        let frequency = match non_blank(self.frequency) {
            Some(raw) => raw.parse::<Frequency>()?,
            None => Frequency::Once,
        };

        let times = match self.times {
            Some(raw) => raw
                .iter()
                .map(|t| parse_time(t))
                .collect::<Result<Vec<_>>>()?,
            None => vec![DEFAULT_TIME],
        };

        let draft = MedicationDraft {
            name,
            dosage: non_blank(self.dosage).unwrap_or_else(|| DEFAULT_DOSAGE.to_string()),
            frequency,
            times,
            notes: self.notes,
        }
        .normalize();
        draft.validate()?;
        Ok(draft)
    }
}

/// Parse an import payload. A payload without `data` has no records.
pub fn parse_payload(json: &str) -> Result<Vec<ImportRecord>> {
    let payload: Payload = serde_json::from_str(json).map_err(Error::import)?;
    Ok(payload.data.unwrap_or_default())
}

/// Merge records into the catalog as new medications.
///
/// Either every record is added or the catalog is left untouched. Returns
/// the number of medications added.
pub fn import_records(
    catalog: &mut Catalog,
    records: Vec<ImportRecord>,
    clock: &dyn Clock,
) -> Result<usize> {
    let drafts = records
        .into_iter()
        .map(ImportRecord::into_draft)
        .collect::<Result<Vec<_>>>()
        .map_err(Error::import)?;

    let mut merged = catalog.clone();
    for draft in drafts {
        merged.add(draft, clock).map_err(Error::import)?;
    }

    let added = merged.medications.len() - catalog.medications.len();
    *catalog = merged;
    tracing::info!("Imported {} medications", added);
    Ok(added)
}

/// Read a payload file and merge it into the catalog.
pub fn import_file(catalog: &mut Catalog, path: &Path, clock: &dyn Clock) -> Result<usize> {
    let contents = std::fs::read_to_string(path).map_err(Error::import)?;
    let records = parse_payload(&contents)?;
    import_records(catalog, records, clock)
}
