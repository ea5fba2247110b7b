//! Service settings.
//!
//! Settings come from an optional `config.toml` in the working directory. Every
//! section and key has a default, so an empty or missing file yields a runnable
//! configuration. `DATABASE_URL` and `BIND_ADDR` from the environment (or `.env`)
//! override the file.

use crate::core::retry::RetryPolicy;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Default location of the settings file
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Database location
    pub database: DatabaseConfig,
    /// Funding retry behaviour
    pub funding: FundingConfig,
    /// Account defaults
    pub accounts: AccountsConfig,
}

/// `[server]` section
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
        }
    }
}

/// `[database]` section
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SeaORM` connection URL
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/funfun.sqlite?mode=rwc".to_string(),
        }
    }
}

/// `[funding]` section
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FundingConfig {
    /// Attempts per funding request before reporting a conflict
    pub max_attempts: u32,
    /// Base pause between attempts, multiplied by the attempt number
    pub retry_backoff_ms: u64,
}

impl Default for FundingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_backoff_ms: 25,
        }
    }
}

impl FundingConfig {
    /// Retry policy used by the funding operation
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }
}

/// `[accounts]` section
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AccountsConfig {
    /// Balance credited to a new account at signup
    pub signup_balance: i64,
}

impl AppConfig {
    /// Applies environment overrides using the given lookup.
    ///
    /// Takes the lookup as a parameter so callers can pass `std::env::var` and tests
    /// can pass a map.
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        self
    }

    fn validate(self) -> Result<Self> {
        if self.funding.max_attempts == 0 {
            return Err(Error::Config {
                message: "funding.max_attempts must be at least 1".to_string(),
            });
        }
        if self.accounts.signup_balance < 0 {
            return Err(Error::Config {
                message: "accounts.signup_balance cannot be negative".to_string(),
            });
        }
        Ok(self)
    }
}

/// Parses settings from TOML text.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.validate()
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A value is out of range
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    parse_config(&contents)
}

/// Loads `config.toml` if present, otherwise defaults, then applies environment overrides.
pub fn load_app_config() -> Result<AppConfig> {
    let config = if Path::new(DEFAULT_CONFIG_PATH).exists() {
        info!("Loading settings from {DEFAULT_CONFIG_PATH}");
        load_config(DEFAULT_CONFIG_PATH)?
    } else {
        info!("No {DEFAULT_CONFIG_PATH} found, using default settings");
        AppConfig::default()
    };

    config
        .with_overrides(|key| std::env::var(key).ok())
        .validate()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [server]
            bind_addr = "0.0.0.0:9000"

            [database]
            url = "sqlite::memory:"

            [funding]
            max_attempts = 3
            retry_backoff_ms = 10

            [accounts]
            signup_balance = 1000
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.funding.max_attempts, 3);
        assert_eq!(config.accounts.signup_balance, 1000);

        let policy = config.funding.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Duration::from_millis(10));
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = parse_config("[funding]\nmax_attempts = 2\n").unwrap();
        assert_eq!(config.funding.max_attempts, 2);
        assert_eq!(config.funding.retry_backoff_ms, 25);
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.accounts.signup_balance, 0);

        assert_eq!(parse_config("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            parse_config("[funding]\nmax_attempts = 0\n"),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            parse_config("[accounts]\nsignup_balance = -5\n"),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            parse_config("[server\nbind_addr = 1"),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_environment_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DATABASE_URL", "sqlite://override.sqlite"),
            ("BIND_ADDR", "127.0.0.1:1234"),
        ]);

        let config =
            AppConfig::default().with_overrides(|key| env.get(key).map(ToString::to_string));
        assert_eq!(config.database.url, "sqlite://override.sqlite");
        assert_eq!(config.server.bind_addr, "127.0.0.1:1234");

        let untouched = AppConfig::default().with_overrides(|_| None);
        assert_eq!(untouched, AppConfig::default());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("does/not/exist.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
