//! Application settings.
//!
//! Settings come from an optional TOML file (`config.toml` by default, or the path
//! in `POCKET_LEDGER_CONFIG`) and are then overridden by environment variables.
//! Secrets such as `CARD_ENCRYPTION_KEY` are not part of this struct;
//! they are read directly before use.

use crate::config::database::DEFAULT_DATABASE_URL;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Default address the HTTP server binds to.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3000";

/// Environment variable naming an alternative settings file.
pub const CONFIG_PATH_ENV: &str = "POCKET_LEDGER_CONFIG";

/// Runtime settings for the binaries.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// `SeaORM` connection string
    pub database_url: String,
    /// `host:port` for the HTTP server
    pub bind_address: String,
    /// Shared secret the scheduler sends in `x-cron-secret`; the cron route is
    /// closed when this is `None`
    pub cron_secret: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            cron_secret: None,
        }
    }
}

impl AppConfig {
    /// Applies environment overrides on top of the current values.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(address) = lookup("BIND_ADDRESS") {
            self.bind_address = address;
        }
        if let Some(secret) = lookup("CRON_SECRET").filter(|s| !s.trim().is_empty()) {
            self.cron_secret = Some(secret);
        }
        self
    }
}

/// Parses settings from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config file {}: {e}", path_ref.display()),
    })
}

/// Loads the settings file when present, then applies environment overrides.
///
/// A missing file is not an error; every setting has a default.
pub fn load_app_config() -> Result<AppConfig> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".to_string());
    let base = if Path::new(&path).exists() {
        load_config(&path)?
    } else {
        tracing::debug!("No config file at {path}, using defaults");
        AppConfig::default()
    };
    Ok(base.with_env_overrides())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
            bind_address = "0.0.0.0:8080"
            cron_secret = "s3cret"
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.cron_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
    }

    #[test]
    fn test_env_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("DATABASE_URL", "sqlite::memory:"),
            ("CRON_SECRET", "  "),
        ]
        .into_iter()
        .collect();

        let config = AppConfig::default().with_overrides(|key| env.get(key).map(|v| (*v).to_string()));
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        // Blank secrets keep the cron route closed
        assert_eq!(config.cron_secret, None);
    }

    #[test]
    fn test_load_config_missing_file_is_config_error() {
        let result = load_config("does/not/exist.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
