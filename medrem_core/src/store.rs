//! Catalog persistence with file locking.
//!
//! The catalog lives in a single JSON document that is rewritten atomically
//! on every change. A missing file means first run and yields the built-in
//! sample catalog; an unreadable or corrupt file is an error so user data is
//! never silently replaced.

use crate::catalog::{build_default_catalog, Catalog};
use crate::clock::Clock;
use crate::{Error, Result};
use fs2::FileExt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Location of the persisted catalog
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the catalog with shared locking
    ///
    /// Returns the sample catalog if the file doesn't exist.
    pub fn load(&self, clock: &dyn Clock) -> Result<Catalog> {
        if !self.path.exists() {
            tracing::info!("No catalog file found, using sample medications");
            return Ok(build_default_catalog(clock));
        }

        let file = File::open(&self.path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        let catalog: Catalog = serde_json::from_str(&contents).map_err(|e| {
            Error::InvalidFormat(format!("catalog file {:?} is corrupt: {}", self.path, e))
        })?;

        for problem in catalog.validate() {
            tracing::warn!("Catalog {:?}: {}", self.path, problem);
        }

        tracing::debug!(
            "Loaded {} medications from {:?}",
            catalog.medications.len(),
            self.path
        );
        Ok(catalog)
    }

    /// Save the catalog with exclusive locking
    ///
    /// Writes to a temp file in the same directory, syncs it, then renames it
    /// over the original.
    pub fn save(&self, catalog: &Catalog) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "catalog path missing parent")
        })?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(catalog)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!(
            "Saved {} medications to {:?}",
            catalog.medications.len(),
            self.path
        );
        Ok(())
    }

    /// Load the catalog, modify it, and save it back
    ///
    /// Nothing is written if `f` fails.
    pub fn update<T, F>(&self, clock: &dyn Clock, f: F) -> Result<T>
    where
        F: FnOnce(&mut Catalog) -> Result<T>,
    {
        let mut catalog = self.load(clock)?;
        let value = f(&mut catalog)?;
        self.save(&catalog)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MedicationDraft;
    use crate::clock::FixedClock;
    use crate::time::parse_time;
    use crate::Frequency;
    use chrono::NaiveDate;

    fn clock() -> FixedClock {
        FixedClock::at(
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            parse_time("09:00").unwrap(),
        )
    }

    #[test]
    fn test_missing_file_yields_sample_catalog() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(temp_dir.path().join("medications.json"));

        let catalog = store.load(&clock()).unwrap();
        assert_eq!(catalog.medications.len(), 5);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(temp_dir.path().join("data").join("medications.json"));
        let clock = clock();

        let mut catalog = Catalog::default();
        catalog
            .add(
                MedicationDraft {
                    name: "Lisinopril".into(),
                    dosage: "10mg".into(),
                    frequency: Frequency::Once,
                    times: vec![parse_time("07:30").unwrap()],
                    notes: None,
                },
                &clock,
            )
            .unwrap();
        store.save(&catalog).unwrap();

        let loaded = store.load(&clock).unwrap();
        assert_eq!(loaded, catalog);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("medications.json");
        std::fs::write(&path, "{ invalid json }").unwrap();

        let result = CatalogStore::new(&path).load(&clock());
        assert!(matches!(result, Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_update_pattern() {
        crate::logging::init_test();
        let temp_dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(temp_dir.path().join("medications.json"));
        let clock = clock();

        let removed = store
            .update(&clock, |catalog| catalog.remove("med_default_5"))
            .unwrap();
        assert_eq!(removed.name, "Ibuprofen 200mg");

        let loaded = store.load(&clock).unwrap();
        assert_eq!(loaded.medications.len(), 4);
    }

    #[test]
    fn test_failed_update_writes_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(temp_dir.path().join("medications.json"));

        let result = store.update(&clock(), |catalog| catalog.remove("nope"));
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_atomic_save() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("medications.json");
        let store = CatalogStore::new(&path);

        store.save(&build_default_catalog(&clock())).unwrap();

        assert!(path.exists());
        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "medications.json")
            .collect();
        assert!(
            extras.is_empty(),
            "Expected only medications.json, found extras: {:?}",
            extras
        );
    }

    #[test]
    fn test_hand_edited_repeat_time_yields_one_skip() {
        crate::logging::init_test();
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("medications.json");
        std::fs::write(
            &path,
            r#"{"medications": [{
                "id": "med_x", "name": "Metformin", "dosage": "500mg",
                "frequency": "thrice", "times": ["08:00", "08:00", "12:00"],
                "created_at": "2024-06-01T00:00:00Z",
                "updated_at": "2024-06-01T00:00:00Z"
            }]}"#,
        )
        .unwrap();

        let at = FixedClock::at(
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            parse_time("14:30").unwrap(),
        );
        let catalog = CatalogStore::new(&path).load(&at).unwrap();
        assert!(!catalog.validate().is_empty());

        let entries = crate::auto_skip::auto_skip_pass(&catalog.medications, &[], &at);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].scheduled_time.to_string(), "08:00");
    }
}
