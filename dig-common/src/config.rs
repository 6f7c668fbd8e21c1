//! Configuration loading and config-file resolution
//!
//! Bootstrap configuration is read once from a TOML file at startup and is
//! immutable afterwards.
//!
//! # Config file resolution priority
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`DIG_CONFIG`)
//! 3. User config file (`<config dir>/thedig/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing or unusable user config file never prevents startup: the
//! compiled defaults are used and the fallback is reported through
//! `ConfigSource`. A file that was explicitly requested (argument or
//! environment) must exist and parse.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "DIG_CONFIG";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Orchestration engine settings (optional)
    #[serde(default)]
    pub engine: EngineSettings,

    /// Built-in enricher settings (optional)
    #[serde(default)]
    pub enrichers: EnricherSettings,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    ///
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Orchestration engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Upper bound for a single enricher invocation, in milliseconds
    #[serde(default = "default_enricher_timeout_ms")]
    pub enricher_timeout_ms: u64,

    /// Maximum number of record sessions running at once in bulk mode
    #[serde(default = "default_max_concurrent_sessions")]
    pub max_concurrent_sessions: usize,
}

impl EngineSettings {
    /// Enricher timeout as a `Duration`
    pub fn enricher_timeout(&self) -> Duration {
        Duration::from_millis(self.enricher_timeout_ms)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            enricher_timeout_ms: default_enricher_timeout_ms(),
            max_concurrent_sessions: default_max_concurrent_sessions(),
        }
    }
}

/// Built-in enricher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnricherSettings {
    /// Enable the Gravatar lookup (performs network requests)
    #[serde(default)]
    pub gravatar: bool,

    /// Gravatar image size in pixels
    #[serde(default = "default_gravatar_size")]
    pub gravatar_size: u32,

    /// Email domains that never identify an employer
    #[serde(default = "default_public_email_providers")]
    pub public_email_providers: Vec<String>,
}

impl Default for EnricherSettings {
    fn default() -> Self {
        Self {
            gravatar: false,
            gravatar_size: default_gravatar_size(),
            public_email_providers: default_public_email_providers(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_enricher_timeout_ms() -> u64 {
    10_000
}

fn default_max_concurrent_sessions() -> usize {
    16
}

fn default_gravatar_size() -> u32 {
    400
}

fn default_public_email_providers() -> Vec<String> {
    [
        "gmail.com",
        "googlemail.com",
        "outlook.com",
        "hotmail.com",
        "hotmail.fr",
        "live.com",
        "msn.com",
        "yahoo.com",
        "yahoo.fr",
        "icloud.com",
        "me.com",
        "aol.com",
        "gmx.com",
        "gmx.de",
        "proton.me",
        "protonmail.com",
        "laposte.net",
        "orange.fr",
        "free.fr",
        "yopmail.com",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl TomlConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !VALID_LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::Config(format!(
                "Invalid log level '{}', expected one of {}",
                self.logging.level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }
        if self.engine.enricher_timeout_ms == 0 {
            return Err(Error::Config(
                "engine.enricher_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.engine.max_concurrent_sessions == 0 {
            return Err(Error::Config(
                "engine.max_concurrent_sessions must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where a configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Path given on the command line
    CommandLine(PathBuf),
    /// Path given through `DIG_CONFIG`
    Environment(PathBuf),
    /// Platform user config file
    UserFile(PathBuf),
    /// User config file present but unusable; compiled defaults used
    UserFileIgnored { path: PathBuf, reason: String },
    /// No file, compiled defaults
    Defaults,
}

impl ConfigSource {
    /// Report where the configuration came from
    ///
    /// `ConfigResolver::load` never logs; call this once logging is
    /// initialized.
    pub fn log(&self) {
        match self {
            ConfigSource::CommandLine(path)
            | ConfigSource::Environment(path)
            | ConfigSource::UserFile(path) => {
                info!("Configuration loaded from {}", path.display());
            }
            ConfigSource::UserFileIgnored { path, reason } => {
                warn!(
                    "Ignoring config file {}: {}. Using defaults.",
                    path.display(),
                    reason
                );
            }
            ConfigSource::Defaults => {
                warn!("No config file found, using compiled defaults");
            }
        }
    }
}

/// Resolves and loads the bootstrap configuration
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
    env_var_name: String,
    user_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Create resolver with an optional command-line path
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self {
            cli_path,
            env_var_name: CONFIG_ENV_VAR.to_string(),
            user_path: default_config_path(),
        }
    }

    /// Use a different environment variable name (tests)
    pub fn with_env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var_name = name.into();
        self
    }

    /// Use a different user config file location (tests)
    pub fn with_user_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.user_path = Some(path.into());
        self
    }

    /// Determine which configuration source applies
    pub fn source(&self) -> ConfigSource {
        if let Some(path) = &self.cli_path {
            return ConfigSource::CommandLine(path.clone());
        }

        if let Ok(path) = std::env::var(&self.env_var_name) {
            if !path.trim().is_empty() {
                return ConfigSource::Environment(PathBuf::from(path));
            }
        }

        if let Some(path) = &self.user_path {
            if path.exists() {
                return ConfigSource::UserFile(path.clone());
            }
        }

        ConfigSource::Defaults
    }

    /// Resolve and load the configuration
    ///
    /// Explicit paths (command line or environment) must exist and parse.
    /// An unusable user config file degrades to defaults and is reported
    /// as `ConfigSource::UserFileIgnored`. Nothing is logged here; call
    /// `ConfigSource::log` after logging is initialized.
    pub fn load(&self) -> Result<(TomlConfig, ConfigSource)> {
        let (config, source) = match self.source() {
            ConfigSource::CommandLine(path) => {
                (TomlConfig::load(&path)?, ConfigSource::CommandLine(path))
            }
            ConfigSource::Environment(path) => {
                (TomlConfig::load(&path)?, ConfigSource::Environment(path))
            }
            ConfigSource::UserFile(path) => match TomlConfig::load(&path) {
                Ok(config) => (config, ConfigSource::UserFile(path)),
                Err(e) => (
                    TomlConfig::default(),
                    ConfigSource::UserFileIgnored {
                        path,
                        reason: e.to_string(),
                    },
                ),
            },
            other => (TomlConfig::default(), other),
        };
        Ok((config, source))
    }
}

/// Platform user config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("thedig").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TomlConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.engine.enricher_timeout(), Duration::from_secs(10));
        assert!(!config.enrichers.gravatar);
        assert!(config
            .enrichers
            .public_email_providers
            .contains(&"gmail.com".to_string()));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = TomlConfig::from_toml_str("[engine]\nmax_concurrent_sessions = 4\n").unwrap();
        assert_eq!(config.engine.max_concurrent_sessions, 4);
        assert_eq!(config.engine.enricher_timeout_ms, 10_000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(TomlConfig::from_toml_str("[logging]\nlevel = \"loud\"\n").is_err());
        assert!(TomlConfig::from_toml_str("[engine]\nenricher_timeout_ms = 0\n").is_err());
        assert!(TomlConfig::from_toml_str("[engine]\nmax_concurrent_sessions = 0\n").is_err());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("[engine").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
