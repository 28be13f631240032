//! Configuration for rustible-napalm
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - System configuration (/etc/rustible-napalm/config.toml)
//! - User configuration (~/.rustible-napalm.toml)
//! - Project configuration (./rustible-napalm.toml)
//! - An explicit `--config` file
//! - Environment variables

use crate::context::ConnectionContext;
use crate::driver::{DriverRegistry, DEFAULT_TIMEOUT};
use crate::error::{Error, Result};
use crate::telemetry::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default module settings
    pub defaults: Defaults,

    /// Connection facts used to fill each module's `provider`
    pub context: ConnectionContext,

    /// Mock driver settings
    pub mock: MockConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Default values applied to every invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Driver timeout in seconds
    pub timeout: u64,

    /// Colored human output
    pub color: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            color: true,
        }
    }
}

/// Mock driver settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Data directory used when a task gives no `optional_args.path`
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        for path in Self::config_paths() {
            if path.is_file() {
                config = config.merge_from_file(&path)?;
            }
        }

        // An explicit path must exist
        if let Some(path) = config_path {
            config = config.merge_from_file(path)?;
        }

        config.apply_env_overrides();
        Ok(config)
    }

    /// Standard configuration file locations, lowest precedence first
    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/rustible-napalm/config.toml")];

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".rustible-napalm.toml"));
        }

        paths.push(PathBuf::from("rustible-napalm.toml"));
        paths
    }

    /// Load a single file on top of the defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Config::default().merge_from_file(path.as_ref())
    }

    fn merge_from_file(&self, path: &Path) -> Result<Self> {
        let path = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
        let content = std::fs::read_to_string(&path)?;
        let file_config: Config =
            toml::from_str(&content).map_err(|e| Error::parse(&path, e.to_string()))?;
        debug!(path = %path.display(), "Loaded configuration file");
        Ok(self.merge(file_config))
    }

    /// Merge another config into this one, values set in `other` winning
    fn merge(&self, other: Config) -> Config {
        let defaults = Defaults::default();
        Config {
            defaults: Defaults {
                timeout: if other.defaults.timeout != defaults.timeout {
                    other.defaults.timeout
                } else {
                    self.defaults.timeout
                },
                color: if other.defaults.color != defaults.color {
                    other.defaults.color
                } else {
                    self.defaults.color
                },
            },
            context: ConnectionContext {
                remote_addr: other.context.remote_addr.or_else(|| self.context.remote_addr.clone()),
                connection_user: other
                    .context
                    .connection_user
                    .or_else(|| self.context.connection_user.clone()),
                remote_user: other.context.remote_user.or_else(|| self.context.remote_user.clone()),
                password: other.context.password.or_else(|| self.context.password.clone()),
                network_os: other.context.network_os.or_else(|| self.context.network_os.clone()),
                timeout: other.context.timeout.or(self.context.timeout),
            },
            mock: MockConfig {
                path: other.mock.path.or_else(|| self.mock.path.clone()),
            },
            logging: if other.logging != LoggingConfig::default() {
                other.logging
            } else {
                self.logging.clone()
            },
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // NAPALM_HOSTNAME
        if let Ok(hostname) = std::env::var("NAPALM_HOSTNAME") {
            self.context.remote_addr = Some(hostname);
        }

        // NAPALM_USERNAME
        if let Ok(username) = std::env::var("NAPALM_USERNAME") {
            self.context.remote_user = Some(username);
        }

        // NAPALM_PASSWORD
        if let Ok(password) = std::env::var("NAPALM_PASSWORD") {
            self.context.password = Some(password.into());
        }

        // NAPALM_DEV_OS
        if let Ok(dev_os) = std::env::var("NAPALM_DEV_OS") {
            self.context.network_os = Some(dev_os);
        }

        // NAPALM_TIMEOUT
        if let Ok(timeout) = std::env::var("NAPALM_TIMEOUT") {
            if let Ok(n) = timeout.parse() {
                self.defaults.timeout = n;
            }
        }

        // NAPALM_MOCK_PATH
        if let Ok(path) = std::env::var("NAPALM_MOCK_PATH") {
            self.mock.path = Some(PathBuf::from(shellexpand::tilde(&path).into_owned()));
        }

        // RUSTIBLE_NAPALM_LOG_FORMAT
        if let Ok(format) = std::env::var("RUSTIBLE_NAPALM_LOG_FORMAT") {
            if let Ok(format) = format.parse() {
                self.logging.format = format;
            }
        }

        // NO_COLOR
        if std::env::var("NO_COLOR").is_ok() {
            self.defaults.color = false;
        }
    }

    /// The connection context with the configured default timeout applied
    pub fn connection_context(&self) -> ConnectionContext {
        let mut context = self.context.clone();
        context.timeout = context.timeout.or(Some(self.defaults.timeout));
        context
    }

    /// Driver registry honouring the mock settings
    pub fn driver_registry(&self) -> DriverRegistry {
        #[allow(unused_mut)]
        let mut registry = DriverRegistry::with_builtins();
        #[cfg(feature = "mock")]
        if let Some(path) = &self.mock.path {
            registry.register(
                crate::driver::DevOs::Mock,
                crate::driver::mock::MockDriverFactory::with_default_path(path),
            );
        }
        registry
    }
}
