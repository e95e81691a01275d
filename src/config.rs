//! Configuration loading
//!
//! Settings come from an optional TOML file (`~/.mfdash/config.toml` by
//! default) and are then overridden by environment variables, so a
//! deployment can keep credentials out of the file entirely.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ConfigError;
use crate::scheduler::CronSchedule;

pub const DEFAULT_KITE_BASE_URL: &str = "https://api.kite.trade";
pub const DEFAULT_KITE_LOGIN_URL: &str = "https://kite.zerodha.com/connect/login";
/// 12:30 UTC, i.e. 18:00 IST after NAVs are published
pub const DEFAULT_FETCH_SCHEDULE: &str = "30 12 * * *";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: Option<PathBuf>,
    pub broker: BrokerConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub base_url: String,
    pub login_url: String,
    pub timeout_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            access_token: None,
            base_url: DEFAULT_KITE_BASE_URL.to_string(),
            login_url: DEFAULT_KITE_LOGIN_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub cron: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: DEFAULT_FETCH_SCHEDULE.to_string(),
        }
    }
}

/// Get the default config path (~/.mfdash/config.toml)
pub fn get_default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".mfdash").join("config.toml"))
}

impl Config {
    /// Load the config file (if present) and apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => get_default_config_path()?,
        };

        let mut config = if path.exists() {
            debug!("Loading config from {:?}", path);
            Self::from_file(&path)?
        } else {
            debug!("No config file at {:?}, using defaults", path);
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content).map_err(|e| {
            ConfigError::Parse {
                path: path.display().to_string(),
                message: format!("{:#}", e),
            }
            .into()
        })
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Apply `KITE_*`, `FETCH_SCHEDULE` and `MFDASH_DB_PATH` overrides.
    ///
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("KITE_API_KEY") {
            self.broker.api_key = Some(v);
        }
        if let Some(v) = get("KITE_ACCESS_TOKEN") {
            self.broker.access_token = Some(v);
        }
        if let Some(v) = get("KITE_BASE_URL") {
            self.broker.base_url = v;
        }
        if let Some(v) = get("FETCH_SCHEDULE") {
            self.schedule.cron = v;
        }
        if let Some(v) = get("MFDASH_DB_PATH") {
            self.database_path = Some(PathBuf::from(v));
        }
    }

    /// Configured database path, falling back to ~/.mfdash/data.db
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(p) => Ok(p.clone()),
            None => crate::db::get_default_db_path(),
        }
    }

    pub fn cron_schedule(&self) -> Result<CronSchedule, ConfigError> {
        self.schedule.cron.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.broker.base_url, DEFAULT_KITE_BASE_URL);
        assert_eq!(config.schedule.cron, "30 12 * * *");
        assert!(config.broker.api_key.is_none());
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            database_path = "/tmp/mf.db"

            [broker]
            api_key = "key"
            "#,
        )
        .unwrap();

        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/mf.db")));
        assert_eq!(config.broker.api_key.as_deref(), Some("key"));
        assert_eq!(config.broker.base_url, DEFAULT_KITE_BASE_URL);
        assert_eq!(config.broker.timeout_secs, 30);
        assert_eq!(config.schedule.cron, DEFAULT_FETCH_SCHEDULE);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(Config::from_toml("broker = 5").is_err());
    }

    #[test]
    fn test_env_overrides_win_over_file() {
        let mut config = Config::from_toml(
            r#"
            [broker]
            api_key = "from-file"
            access_token = "file-token"
            [schedule]
            cron = "0 6 * * *"
            "#,
        )
        .unwrap();

        let env: HashMap<&str, &str> = [
            ("KITE_API_KEY", "from-env"),
            ("KITE_ACCESS_TOKEN", ""),
            ("FETCH_SCHEDULE", "15 13 * * *"),
            ("MFDASH_DB_PATH", "/data/mf.db"),
        ]
        .into_iter()
        .collect();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.broker.api_key.as_deref(), Some("from-env"));
        // empty override is ignored
        assert_eq!(config.broker.access_token.as_deref(), Some("file-token"));
        assert_eq!(config.schedule.cron, "15 13 * * *");
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/data/mf.db"));
        assert_eq!(config.cron_schedule().unwrap().expression(), "15 13 * * *");
    }

    #[test]
    fn test_weekday_schedule_from_environment() {
        let mut config = Config::default();
        config.apply_overrides(|k| (k == "FETCH_SCHEDULE").then(|| "30 12 * * 1-5".to_string()));
        assert_eq!(config.cron_schedule().unwrap().expression(), "30 12 * * 1-5");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&temp_dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.broker.login_url, DEFAULT_KITE_LOGIN_URL);
    }

    #[test]
    fn test_from_file_reports_path_on_parse_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[schedule\ncron = 1").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }
}
