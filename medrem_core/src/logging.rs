//! Logging setup for medrem binaries.
//!
//! Log lines go to stderr so schedules and exports on stdout stay clean.
//! The chosen level applies to medrem's own crates; everything else stays at
//! `warn` unless RUST_LOG says otherwise.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crates whose level follows the caller's choice
const MEDREM_TARGETS: [&str; 2] = ["medrem_core", "medrem"];

/// Filter directive for a medrem level, e.g. `warn,medrem_core=debug,medrem=debug`
pub fn directive(level: &str) -> String {
    let mut directive = String::from("warn");
    for target in MEDREM_TARGETS {
        directive.push_str(&format!(",{}={}", target, level));
    }
    directive
}

/// Log auto-skip decisions and catalog changes
pub fn init() {
    init_with_level("info")
}

/// Initialize logging with `level` for medrem's crates.
///
/// RUST_LOG wins when set, e.g. `RUST_LOG=medrem_core::auto_skip=debug`.
pub fn init_with_level(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive(level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new(directive("debug")))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_scopes_level_to_medrem() {
        assert_eq!(directive("debug"), "warn,medrem_core=debug,medrem=debug");
        assert!(directive("info").parse::<EnvFilter>().is_ok());
    }
}
