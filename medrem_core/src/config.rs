//! Configuration file support for medrem.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/medrem/config.toml`.

use crate::{Error, Frequency, Result, TimeFormat, TimeOfDay};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub auto_skip: AutoSkipConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// How times are shown and entered
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    #[serde(default)]
    pub time_format: TimeFormat,
}

/// Reminder preferences handed to the notification scheduler
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub sound: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sound: true,
        }
    }
}

/// Default schedule times offered for each frequency
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_once")]
    pub once: Vec<TimeOfDay>,

    #[serde(default = "default_twice")]
    pub twice: Vec<TimeOfDay>,

    #[serde(default = "default_thrice")]
    pub thrice: Vec<TimeOfDay>,

    #[serde(default = "default_four")]
    pub four: Vec<TimeOfDay>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            once: default_once(),
            twice: default_twice(),
            thrice: default_thrice(),
            four: default_four(),
        }
    }
}

impl ScheduleConfig {
    /// Default times for a frequency; empty for as-needed
    pub fn times_for(&self, frequency: Frequency) -> Vec<TimeOfDay> {
        match frequency {
            Frequency::Once => self.once.clone(),
            Frequency::Twice => self.twice.clone(),
            Frequency::Thrice => self.thrice.clone(),
            Frequency::Four => self.four.clone(),
            Frequency::AsNeeded => Vec::new(),
        }
    }
}

/// Background reconciliation settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AutoSkipConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for AutoSkipConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("medrem")
}

fn default_true() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    60
}

fn times(values: &[(u8, u8)]) -> Vec<TimeOfDay> {
    values
        .iter()
        .filter_map(|&(h, m)| TimeOfDay::new(h, m).ok())
        .collect()
}

fn default_once() -> Vec<TimeOfDay> {
    times(&[(8, 0)])
}

fn default_twice() -> Vec<TimeOfDay> {
    times(&[(8, 0), (20, 0)])
}

fn default_thrice() -> Vec<TimeOfDay> {
    times(&[(8, 0), (14, 0), (20, 0)])
}

fn default_four() -> Vec<TimeOfDay> {
    times(&[(8, 0), (12, 0), (16, 0), (20, 0)])
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject settings the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.auto_skip.interval_secs == 0 {
            return Err(Error::Config(
                "auto_skip.interval_secs must be at least 1".into(),
            ));
        }
        for (name, times) in [
            ("once", &self.schedule.once),
            ("twice", &self.schedule.twice),
            ("thrice", &self.schedule.thrice),
            ("four", &self.schedule.four),
        ] {
            if times.is_empty() {
                return Err(Error::Config(format!(
                    "schedule.{} needs at least one time",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("medrem").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.display.time_format, TimeFormat::H12);
        assert!(config.notifications.enabled);
        assert_eq!(config.auto_skip.interval_secs, 60);
        assert_eq!(
            config.schedule.times_for(Frequency::Four).len(),
            4
        );
        assert!(config.schedule.times_for(Frequency::AsNeeded).is_empty());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.schedule.thrice, parsed.schedule.thrice);
        assert_eq!(config.display.time_format, parsed.display.time_format);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[display]
time_format = "24h"

[schedule]
twice = ["07:30", "19:30"]
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.display.time_format, TimeFormat::H24);
        assert_eq!(
            config.schedule.twice[0].to_string(),
            "07:30"
        );
        assert_eq!(config.schedule.once[0].to_string(), "08:00"); // default
    }

    #[test]
    fn test_bad_schedule_time_rejected() {
        let toml_str = r#"
[schedule]
once = ["8am"]
"#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }

    #[test]
    fn test_load_from_validates() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[auto_skip]\ninterval_secs = 0\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.display.time_format = TimeFormat::H24;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.display.time_format, TimeFormat::H24);
    }
}
