//! ORM configuration
//!
//! Naming conventions and logging defaults, loadable from `DOCREL_*`
//! environment variables.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::logging::LoggingConfig;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Configuration validation failed for {field}: {reason}")]
    ValidationFailed { field: String, reason: String },
}

/// Environment enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Testing,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testing" | "test" => Ok(Environment::Testing),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue {
                field: "environment".to_string(),
                value: s.to_string(),
                expected: "development, testing, or production".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let env_str = match self {
            Environment::Development => "development",
            Environment::Testing => "testing",
            Environment::Production => "production",
        };
        write!(f, "{}", env_str)
    }
}

/// Table naming conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableNaming {
    /// Plural form (artists, songs)
    Plural,
    /// Singular form (artist, song)
    Singular,
}

impl FromStr for TableNaming {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plural" => Ok(TableNaming::Plural),
            "singular" => Ok(TableNaming::Singular),
            _ => Err(ConfigError::InvalidValue {
                field: "table_naming".to_string(),
                value: s.to_string(),
                expected: "plural or singular".to_string(),
            }),
        }
    }
}

/// Relationship layer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrmConfig {
    pub environment: Environment,
    pub log_level: String,
    /// Appended to a snake_case model name to build foreign key fields
    pub foreign_key_suffix: String,
    pub table_naming: TableNaming,
    /// Placed between the two sorted table names of a join table
    pub join_table_separator: String,
}

impl OrmConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self {
            environment: Environment::Development,
            log_level: "info".to_string(),
            foreign_key_suffix: "_id".to_string(),
            table_naming: TableNaming::Plural,
            join_table_separator: "_".to_string(),
        }
    }

    /// Create configuration for testing
    pub fn testing() -> Self {
        Self {
            environment: Environment::Testing,
            log_level: "warn".to_string(),
            ..Self::new()
        }
    }

    /// Create configuration for production
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            log_level: "info".to_string(),
            ..Self::new()
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new();

        if let Ok(env_str) = env::var("DOCREL_ENV") {
            config.environment = env_str.parse()?;
        }

        if let Ok(log_level) = env::var("DOCREL_LOG_LEVEL") {
            config.log_level = log_level.to_lowercase();
        }

        if let Ok(suffix) = env::var("DOCREL_FK_SUFFIX") {
            config.foreign_key_suffix = suffix;
        }

        if let Ok(naming) = env::var("DOCREL_TABLE_NAMING") {
            config.table_naming = naming.parse()?;
        }

        if let Ok(separator) = env::var("DOCREL_JOIN_SEPARATOR") {
            config.join_table_separator = separator;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "log_level".to_string(),
                value: self.log_level.clone(),
                expected: format!("one of: {}", valid_levels.join(", ")),
            });
        }

        if self.foreign_key_suffix.is_empty() {
            return Err(ConfigError::ValidationFailed {
                field: "foreign_key_suffix".to_string(),
                reason: "suffix cannot be empty".to_string(),
            });
        }

        if self.join_table_separator.is_empty() {
            return Err(ConfigError::ValidationFailed {
                field: "join_table_separator".to_string(),
                reason: "separator cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Logging preset matching this configuration's environment
    pub fn logging(&self) -> LoggingConfig {
        let preset = match self.environment {
            Environment::Development => LoggingConfig::development(),
            Environment::Testing => LoggingConfig::test(),
            Environment::Production => LoggingConfig::production(),
        };
        preset.with_level(&self.log_level)
    }
}

impl Default for OrmConfig {
    fn default() -> Self {
        Self::new()
    }
}
