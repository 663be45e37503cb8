#![forbid(unsafe_code)]

//! Core domain model and scheduling logic for the medrem medication tracker.
//!
//! This crate provides:
//! - Time-of-day parsing and display in 12h/24h formats
//! - Dose status classification and daily dose projection
//! - The auto-skip policy for doses superseded by the next one
//! - Catalog management, import and reminders
//! - Persistence (catalog JSON, JSONL dose log, CSV export)

pub mod types;
pub mod error;
pub mod time;
pub mod clock;
pub mod status;
pub mod projection;
pub mod actions;
pub mod auto_skip;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod log_store;
pub mod store;
pub mod history;
pub mod import;
pub mod reminder;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use time::{TimeFormat, TimeOfDay};
pub use clock::{Clock, FixedClock, SystemClock};
pub use status::classify;
pub use projection::{project_doses_for_date, DoseGroups};
pub use actions::{record_skipped, record_taken};
pub use auto_skip::run_auto_skip;
pub use catalog::{build_default_catalog, Catalog, MedicationDraft, MedicationPatch};
pub use config::Config;
pub use log_store::{JsonlLogStore, LogSink};
pub use store::CatalogStore;
pub use reminder::Reminder;
