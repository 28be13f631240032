//! Structured logging using the tracing crate.
//!
//! Logs go to stderr so the module result printed on stdout stays
//! machine-readable. `RUST_LOG` always wins over the configured level.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line console output
    Pretty,
    /// Single-line output
    #[default]
    Compact,
    /// JSON structured output
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(Error::Config(format!(
                "unknown log format '{}', expected pretty, compact or json",
                other
            ))),
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    /// Convert from verbosity level (0-3+).
    pub fn from_verbosity(verbosity: u8) -> Self {
        match verbosity {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// The more verbose of two levels
    pub fn more_verbose(self, other: LogLevel) -> LogLevel {
        if (self as u8) <= (other as u8) {
            self
        } else {
            other
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Extra filter directives, e.g. `rustible_napalm::driver=trace`
    pub filter: Option<String>,
    /// Include the event target
    pub with_target: bool,
}

/// Builder for the global tracing subscriber.
pub struct LoggingBuilder {
    config: LoggingConfig,
    ansi: bool,
}

impl LoggingBuilder {
    pub fn from_config(config: LoggingConfig) -> Self {
        Self { config, ansi: true }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.ansi = enabled;
        self
    }

    fn build_filter(&self) -> EnvFilter {
        let default_filter = match &self.config.filter {
            Some(extra) => format!("{},{}", self.config.level, extra),
            None => self.config.level.to_string(),
        };
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&default_filter))
            .unwrap_or_else(|_| EnvFilter::new(self.config.level.to_string()))
    }

    /// Install the global subscriber.
    pub fn init(self) -> Result<()> {
        let env_filter = self.build_filter();
        let registry = tracing_subscriber::registry().with(env_filter);

        let result = match self.config.format {
            LogFormat::Pretty => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_ansi(self.ansi)
                        .with_target(self.config.with_target)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
            LogFormat::Compact => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_ansi(self.ansi)
                        .with_target(self.config.with_target)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
            LogFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_target(self.config.with_target)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
        };
        result.map_err(|e| Error::Config(e.to_string()))
    }
}

/// Initialize logging from the config, raised by the `-v` count.
pub fn init_logging(config: &LoggingConfig, verbosity: u8, ansi: bool) -> Result<()> {
    let level = config.level.more_verbose(LogLevel::from_verbosity(verbosity));
    LoggingBuilder::from_config(config.clone())
        .with_level(level)
        .with_ansi(ansi)
        .init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_verbosity() {
        assert_eq!(LogLevel::from_verbosity(0), LogLevel::Warn);
        assert_eq!(LogLevel::from_verbosity(1), LogLevel::Info);
        assert_eq!(LogLevel::from_verbosity(2), LogLevel::Debug);
        assert_eq!(LogLevel::from_verbosity(7), LogLevel::Trace);
    }

    #[test]
    fn test_verbosity_only_raises_level() {
        assert_eq!(LogLevel::Debug.more_verbose(LogLevel::Warn), LogLevel::Debug);
        assert_eq!(LogLevel::Warn.more_verbose(LogLevel::Trace), LogLevel::Trace);
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_logging_builder() {
        let builder = LoggingBuilder::from_config(LoggingConfig::default())
            .with_level(LogLevel::Debug)
            .with_format(LogFormat::Json)
            .with_ansi(false);

        assert_eq!(builder.config.level, LogLevel::Debug);
        assert_eq!(builder.config.format, LogFormat::Json);
        assert!(!builder.ansi);
    }
}
