//! Append-only medication log storage.
//!
//! Entries are appended to a JSONL (JSON Lines) file under an exclusive file
//! lock, so the auto-skip pass and a user action racing on the same dose
//! produce at most one duplicate line instead of a torn file. Readers get
//! entries back in insertion order, which is what first-match lookups rely on.

use crate::{MedicationLog, Result};
use fs2::FileExt;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Destination for new log entries
pub trait LogSink {
    fn append(&mut self, log: &MedicationLog) -> Result<()>;
}

/// In-memory log, used by tests and by callers that persist elsewhere
impl LogSink for Vec<MedicationLog> {
    fn append(&mut self, log: &MedicationLog) -> Result<()> {
        self.push(log.clone());
        Ok(())
    }
}

/// JSONL-based log store with file locking
pub struct JsonlLogStore {
    path: PathBuf,
}

impl JsonlLogStore {
    /// Create a store backed by the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every entry in insertion order
    pub fn read_all(&self) -> Result<Vec<MedicationLog>> {
        read_logs(&self.path)
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl LogSink for JsonlLogStore {
    fn append(&mut self, log: &MedicationLog) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(log)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!(
            "Appended {:?} log {} for {} at {}",
            log.status,
            log.id,
            log.medication_id,
            log.scheduled_time
        );
        Ok(())
    }
}

/// Read all log entries from a JSONL file
///
/// A missing file is an empty log. Malformed lines are skipped with a warning.
pub fn read_logs(path: &Path) -> Result<Vec<MedicationLog>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut logs = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<MedicationLog>(&line) {
            Ok(log) => logs.push(log),
            Err(e) => {
                tracing::warn!("Failed to parse log entry at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;

    for dup in shadowed_entries(&logs) {
        tracing::warn!(
            "Log {} repeats the dose {} at {} on {}; the earlier entry applies",
            dup.id,
            dup.medication_id,
            dup.scheduled_time,
            dup.scheduled_date
        );
    }

    tracing::debug!("Read {} log entries from {:?}", logs.len(), path);
    Ok(logs)
}

/// Entries whose dose already has an earlier entry
///
/// Lookups take the first match, so these never affect a dose's status.
pub fn shadowed_entries(logs: &[MedicationLog]) -> Vec<&MedicationLog> {
    let mut seen = HashSet::new();
    logs.iter()
        .filter(|log| {
            !seen.insert((
                log.medication_id.as_str(),
                log.scheduled_time,
                log.scheduled_date,
            ))
        })
        .collect()
}
