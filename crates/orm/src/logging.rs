//! Structured logging setup
//!
//! The library itself only emits `tracing` events; applications and test
//! harnesses call [`init_logging`] once to install a subscriber.

use std::io;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Target used by every event the relationship layer emits
pub const LOG_TARGET: &str = "docrel";

/// Logging configuration
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "warn")
    pub level: String,
    /// Enable JSON structured logging (vs plain text)
    pub json_format: bool,
    /// Enable pretty printing for development
    pub pretty_print: bool,
    /// Environment filter (supports filters like "docrel=debug")
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            pretty_print: true,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Create production logging configuration
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            json_format: true,
            pretty_print: false,
            env_filter: Some("docrel=info".to_string()),
        }
    }

    /// Create development logging configuration
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            pretty_print: true,
            env_filter: Some("docrel=debug".to_string()),
        }
    }

    /// Create test logging configuration (minimal output)
    pub fn test() -> Self {
        Self {
            level: "warn".to_string(),
            json_format: false,
            pretty_print: false,
            env_filter: None,
        }
    }

    /// Override the level, keeping the env filter in step
    pub fn with_level(mut self, level: &str) -> Self {
        self.level = level.to_string();
        if self.env_filter.is_some() {
            self.env_filter = Some(format!("{}={}", LOG_TARGET, level));
        }
        self
    }

    /// Set environment filter
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// The filter directive handed to `EnvFilter` when `RUST_LOG` is unset
    pub fn filter_directive(&self) -> &str {
        self.env_filter.as_deref().unwrap_or(&self.level)
    }
}

/// Initialize logging. Returns an error if a global subscriber is already set.
pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.filter_directive()))?;

    if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stdout).json())
            .try_init()?;
    } else if config.pretty_print {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stdout).pretty())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stdout))
            .try_init()?;
    }

    tracing::info!(
        target: LOG_TARGET,
        "Logging initialized (level: {}, format: {})",
        config.level,
        if config.json_format { "JSON" } else { "text" }
    );

    Ok(())
}
