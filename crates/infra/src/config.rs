//! Configuration loading and representation.

use thiserror::Error;

use crease_observability::LogFormat;

/// Environment variable: enable the applied-ball ledger check (`true`/`false`).
pub const VERIFY_LEDGER_VAR: &str = "CREASE_VERIFY_LEDGER";
/// Environment variable: `json` or `pretty`.
pub const LOG_FORMAT_VAR: &str = "CREASE_LOG_FORMAT";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} (expected {expected})")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringConfig {
    /// Check every apply/reverse against the applied-ball ledger.
    pub verify_ledger: bool,
    pub log_format: LogFormat,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            verify_ledger: true,
            log_format: LogFormat::Json,
        }
    }
}

impl ScoringConfig {
    /// Read configuration from the process environment; unset keys keep
    /// their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(VERIFY_LEDGER_VAR) {
            config.verify_ledger = parse_bool(VERIFY_LEDGER_VAR, &raw)?;
        }
        if let Some(raw) = lookup(LOG_FORMAT_VAR) {
            config.log_format = raw.parse().map_err(|_| ConfigError::Invalid {
                key: LOG_FORMAT_VAR,
                value: raw.clone(),
                expected: "json or pretty",
            })?;
        }

        Ok(config)
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            expected: "a boolean",
        }),
    }
}
