//! Configuration for Predica.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{PredicaError, PredicaResult};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "predica.toml";

/// Main configuration for Predica.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Evaluator settings.
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Evaluator settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvaluatorConfig {
    /// Maximum number of sibling operands of a single `and`/`or` node
    /// evaluated at the same time.
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency_limit(),
        }
    }
}

fn default_concurrency_limit() -> usize {
    1
}

impl EvaluatorConfig {
    /// Creates evaluator settings with the given concurrency limit.
    pub fn new(concurrency_limit: usize) -> Self {
        Self { concurrency_limit }
    }

    /// Checks that the concurrency limit is a positive integer.
    pub fn validate(&self) -> PredicaResult<()> {
        validate_concurrency_limit(self.concurrency_limit)
    }
}

/// Rejects a concurrency limit of zero.
pub fn validate_concurrency_limit(limit: usize) -> PredicaResult<()> {
    if limit == 0 {
        return Err(PredicaError::config(
            "concurrency_limit deve ser um inteiro positivo",
        ));
    }
    Ok(())
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> PredicaResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> PredicaResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Creates default configuration.
    pub fn default_config() -> Self {
        Self {
            general: GeneralConfig::default(),
            evaluator: EvaluatorConfig::default(),
        }
    }

    /// Tries to load configuration from current directory or uses default.
    pub fn load_or_default() -> Self {
        Self::load(CONFIG_FILE).unwrap_or_else(|_| Self::default_config())
    }

    /// Validates every section.
    pub fn validate(&self) -> PredicaResult<()> {
        self.evaluator.validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
