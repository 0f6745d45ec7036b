//! Configuration management for buildmeta
//!
//! Settings are read from environment variables with fallback defaults.
//!
//! # Environment Variables
//!
//! - `BUILDMETA_LOG_LEVEL`: Logging level - default: "info"
//! - `BUILDMETA_LOG_JSON`: JSON log output (true|false) - default: "false"
//! - `BUILDMETA_EXTRACTORS`: Comma-separated extractor names to enable - default: all
//! - `BUILDMETA_PRETTY`: Pretty-print JSON output (true|false) - default: "true"
//!
//! # Example
//!
//! ```no_run
//! use buildmeta::BuildmetaConfig;
//! use std::path::Path;
//!
//! std::env::set_var("BUILDMETA_EXTRACTORS", "terraform,php");
//!
//! let config = BuildmetaConfig::default();
//! config.validate().expect("Invalid configuration");
//!
//! let registry = config.registry();
//! let (extractor, metadata) = registry.extract(Path::new(".")).unwrap();
//! println!("{}: {}", extractor.name(), metadata.name);
//! ```

use crate::extractors::registry::default_extractors;
use crate::extractors::ExtractorRegistry;
use crate::util::logging::{parse_level, LoggingConfig};
use std::env;
use std::fmt;
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_JSON: bool = false;
const DEFAULT_PRETTY: bool = true;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildmetaConfig {
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Emit logs as JSON
    pub log_json: bool,

    /// Extractor names to keep in the registry; empty keeps every extractor
    pub extractors: Vec<String>,

    /// Pretty-print metadata JSON
    pub pretty: bool,
}

impl Default for BuildmetaConfig {
    /// Loads from `BUILDMETA_*` environment variables
    fn default() -> Self {
        let log_level = env::var("BUILDMETA_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .trim()
            .to_lowercase();

        let log_json = env::var("BUILDMETA_LOG_JSON")
            .ok()
            .and_then(|v| v.trim().parse::<bool>().ok())
            .unwrap_or(DEFAULT_LOG_JSON);

        let extractors = env::var("BUILDMETA_EXTRACTORS")
            .map(|v| parse_list(&v))
            .unwrap_or_default();

        let pretty = env::var("BUILDMETA_PRETTY")
            .ok()
            .and_then(|v| v.trim().parse::<bool>().ok())
            .unwrap_or(DEFAULT_PRETTY);

        Self {
            log_level,
            log_json,
            extractors,
            pretty,
        }
    }
}

impl BuildmetaConfig {
    /// Checks the log level and that every requested extractor exists
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        let known: Vec<&str> = default_extractors().iter().map(|e| e.name()).collect();
        let unknown: Vec<&str> = self
            .extractors
            .iter()
            .map(String::as_str)
            .filter(|name| !known.iter().any(|k| k.eq_ignore_ascii_case(name)))
            .collect();

        if !unknown.is_empty() {
            return Err(ConfigError::ValidationFailed(format!(
                "Unknown extractor(s): {}. Valid options: {}",
                unknown.join(", "),
                known.join(", ")
            )));
        }

        Ok(())
    }

    /// Default registry, narrowed to `extractors` when any are listed
    pub fn registry(&self) -> ExtractorRegistry {
        let mut registry = ExtractorRegistry::with_defaults();
        if !self.extractors.is_empty() {
            registry.retain_names(&self.extractors);
        }
        registry
    }

    /// Logging settings derived from `log_level` and `log_json`
    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: parse_level(&self.log_level),
            use_json: self.log_json,
            ..Default::default()
        }
    }
}

impl fmt::Display for BuildmetaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Buildmeta Configuration:")?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        writeln!(f, "  Log JSON: {}", self.log_json)?;
        if self.extractors.is_empty() {
            writeln!(f, "  Extractors: all")?;
        } else {
            writeln!(f, "  Extractors: {}", self.extractors.join(", "))?;
        }
        writeln!(f, "  Pretty Output: {}", self.pretty)?;
        Ok(())
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "BUILDMETA_LOG_LEVEL",
        "BUILDMETA_LOG_JSON",
        "BUILDMETA_EXTRACTORS",
        "BUILDMETA_PRETTY",
    ];

    /// Restores environment variables on drop
    struct EnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvGuard {
        fn clear() -> Self {
            let saved = VARS.iter().map(|k| (*k, env::var(k).ok())).collect();
            for key in VARS {
                env::remove_var(key);
            }
            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_configuration() {
        let _guard = EnvGuard::clear();

        let config = BuildmetaConfig::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.log_json, DEFAULT_LOG_JSON);
        assert!(config.extractors.is_empty());
        assert_eq!(config.pretty, DEFAULT_PRETTY);
        assert!(config.validate().is_ok());
        assert_eq!(config.registry().len(), 6);
    }

    #[test]
    #[serial]
    fn test_environment_variable_parsing() {
        let _guard = EnvGuard::clear();
        env::set_var("BUILDMETA_LOG_LEVEL", "DEBUG");
        env::set_var("BUILDMETA_LOG_JSON", "true");
        env::set_var("BUILDMETA_EXTRACTORS", " Terraform, php ,,");
        env::set_var("BUILDMETA_PRETTY", "false");

        let config = BuildmetaConfig::default();
        assert_eq!(config.log_level, "debug");
        assert!(config.log_json);
        assert_eq!(config.extractors, vec!["terraform", "php"]);
        assert!(!config.pretty);
        assert!(config.validate().is_ok());
        assert_eq!(config.registry().names(), vec!["php", "terraform"]);
    }

    #[test]
    #[serial]
    fn test_logging_follows_environment() {
        let _guard = EnvGuard::clear();
        env::set_var("BUILDMETA_LOG_LEVEL", "error");
        env::set_var("BUILDMETA_LOG_JSON", "true");

        let logging = BuildmetaConfig::default().logging();
        assert_eq!(logging.level, tracing::Level::ERROR);
        assert!(logging.use_json);
    }

    #[test]
    #[serial]
    fn test_logging_defaults_on_unparseable_values() {
        let _guard = EnvGuard::clear();
        env::set_var("BUILDMETA_LOG_JSON", "not-a-bool");

        let logging = BuildmetaConfig::default().logging();
        assert_eq!(logging.level, tracing::Level::INFO);
        assert!(!logging.use_json);
    }

    #[test]
    fn test_validation_rejects_unknown_extractor() {
        let config = BuildmetaConfig {
            extractors: vec!["cobol".to_string()],
            ..fixed()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cobol"));
    }

    #[test]
    fn test_validation_rejects_invalid_log_level() {
        let config = BuildmetaConfig {
            log_level: "loud".to_string(),
            ..fixed()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_config_display() {
        let display = fixed().to_string();
        assert!(display.contains("Buildmeta Configuration:"));
        assert!(display.contains("Extractors: all"));
    }

    fn fixed() -> BuildmetaConfig {
        BuildmetaConfig {
            log_level: "info".to_string(),
            log_json: false,
            extractors: Vec::new(),
            pretty: true,
        }
    }
}
