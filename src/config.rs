//! Configuration and engine settings for dialtrack
//!
//! This module provides the serializable engine configuration and re-exports
//! the data types from the `dialtrack-types` crate for convenience.
use serde::de::Error;
use std::path::PathBuf;
use std::time::Duration;

pub use dialtrack_types::entity::{Contribution, EntityId, TrackedEntity, UserId};
pub use dialtrack_types::event::Event;
pub use dialtrack_types::series::{ValueReport, ValueReportRecord, ValueSnapshot};
pub use dialtrack_types::stats::DbStats;

/// Which history backend stores value snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Process-local ordered maps. Nothing survives a restart.
    #[default]
    Memory,
    /// A single SQLite table keyed by `(entity_id, timestamp)`.
    Sqlite,
}

/// Engine configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendKind,

    /// Database file for the sqlite backend. `:memory:` opens a private in-memory database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqlite_path: Option<PathBuf>,

    /// Enable WAL journaling on file-backed sqlite databases
    #[serde(default = "Config::default_sqlite_wal")]
    pub sqlite_wal: bool,

    /// Sampling period of the stats monitor
    #[serde(default = "Config::default_stats_interval_secs")]
    pub stats_interval_secs: u64,

    /// Upper bound on the number of slots a single report may allocate
    #[serde(default = "Config::default_max_report_slots")]
    pub max_report_slots: usize,
}

impl Config {
    const fn default_sqlite_wal() -> bool {
        true
    }

    const fn default_stats_interval_secs() -> u64 {
        10
    }

    const fn default_max_report_slots() -> usize {
        100_000
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Select the sqlite backend stored at `path`.
    pub fn with_sqlite_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.backend = BackendKind::Sqlite;
        self.sqlite_path = Some(path.into());
        self
    }

    pub fn with_sqlite_wal(mut self, enabled: bool) -> Self {
        self.sqlite_wal = enabled;
        self
    }

    pub fn with_stats_interval(mut self, interval: Duration) -> Self {
        assert!(
            interval.as_secs() > 0,
            "Stats interval must be at least one second"
        );
        self.stats_interval_secs = interval.as_secs();
        self
    }

    pub fn with_max_report_slots(mut self, max_slots: usize) -> Self {
        assert!(max_slots > 0, "Max report slots must be greater than zero");
        self.max_report_slots = max_slots;
        self
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.stats_interval_secs == 0 {
            return Err("Stats interval must be greater than zero".to_string());
        }

        if self.max_report_slots == 0 {
            return Err("Max report slots must be greater than zero".to_string());
        }

        if self.backend == BackendKind::Sqlite && self.sqlite_path.is_none() {
            return Err("The sqlite backend requires sqlite_path".to_string());
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            sqlite_path: None,
            sqlite_wal: Self::default_sqlite_wal(),
            stats_interval_secs: Self::default_stats_interval_secs(),
            max_report_slots: Self::default_max_report_slots(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.backend, BackendKind::Memory);
        assert!(config.sqlite_path.is_none());
        assert!(config.sqlite_wal);
        assert_eq!(config.stats_interval(), Duration::from_secs(10));
        assert_eq!(config.max_report_slots, 100_000);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default()
            .with_sqlite_path("/tmp/dials.db")
            .with_sqlite_wal(false)
            .with_max_report_slots(512);

        let json = config.to_json().unwrap();
        let deserialized = Config::from_json(&json).unwrap();

        assert_eq!(deserialized.backend, BackendKind::Sqlite);
        assert_eq!(deserialized.sqlite_path, Some(PathBuf::from("/tmp/dials.db")));
        assert!(!deserialized.sqlite_wal);
        assert_eq!(deserialized.max_report_slots, 512);
    }

    #[test]
    fn test_config_partial_json_uses_defaults() {
        let config = Config::from_json(r#"{ "stats_interval_secs": 30 }"#).unwrap();
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.stats_interval_secs, 30);
        assert_eq!(config.max_report_slots, 100_000);
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());

        let missing_path = Config::default().with_backend(BackendKind::Sqlite);
        assert!(missing_path.validate().is_err());

        assert!(Config::from_json(r#"{ "backend": "sqlite" }"#).is_err());
        assert!(Config::from_json(r#"{ "stats_interval_secs": 0 }"#).is_err());
        assert!(Config::from_json(r#"{ "unknown": 1 }"#).is_err());
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_config_toml_roundtrip() {
        let config = Config::default().with_stats_interval(Duration::from_secs(5));
        let text = config.to_toml().unwrap();
        let parsed = Config::from_toml(&text).unwrap();
        assert_eq!(parsed.stats_interval_secs, 5);
    }
}
