use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::engine::EngineOptions;
use crate::errors::DbError;

/// Database configuration, loadable from a TOML file:
///
/// ```toml
/// data_dir = "./data"
/// sync_writes = false
/// log_level = "info"
/// log_to_file = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub data_dir: PathBuf,
    pub sync_writes: bool,
    pub log_level: String,
    pub log_to_file: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            sync_writes: false,
            log_level: "info".to_string(),
            log_to_file: false,
        }
    }
}

impl DbConfig {
    pub fn load(path: &Path) -> Result<Self, DbError> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| DbError::Config(e.to_string()))
    }

    #[must_use]
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions { path: self.data_dir.clone(), sync_writes: self.sync_writes }
    }

    #[must_use]
    pub fn level_filter(&self) -> log::LevelFilter {
        match self.log_level.to_ascii_lowercase().as_str() {
            "off" => log::LevelFilter::Off,
            "error" => log::LevelFilter::Error,
            "warn" => log::LevelFilter::Warn,
            "debug" => log::LevelFilter::Debug,
            "trace" => log::LevelFilter::Trace,
            _ => log::LevelFilter::Info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_keys() {
        let cfg: DbConfig = toml::from_str("data_dir = \"/tmp/books\"").unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/books"));
        assert!(!cfg.sync_writes);
        assert_eq!(cfg.level_filter(), log::LevelFilter::Info);
    }

    #[test]
    fn level_parses_case_insensitively() {
        let cfg = DbConfig { log_level: "DEBUG".into(), ..DbConfig::default() };
        assert_eq!(cfg.level_filter(), log::LevelFilter::Debug);
    }
}
