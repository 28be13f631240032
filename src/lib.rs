//! # rustible-napalm - network device modules for Rustible
//!
//! A set of task-runner modules that drive network devices through
//! napalm-style vendor drivers. Every module does the same four things:
//!
//! - merge connection parameters from the task and its `provider` bundle
//! - look up a vendor driver by device OS tag and open a connection
//! - invoke one or more getters or configuration actions on it
//! - report the result or the first error as a structured output
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                  CLI (rustible-napalm run/list/doc)                  │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │     ModuleRegistry::run  (connection context, no-log masking)        │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │   napalm_* modules  (provider merge, validation, device session)     │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │        DriverRegistry → NetworkDriver  (mock, or your own)           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use rustible_napalm::prelude::*;
//!
//! let registry = ModuleRegistry::with_builtins();
//! let params: ModuleParams = serde_json::from_value(serde_json::json!({
//!     "provider": {
//!         "hostname": "10.0.0.1",
//!         "username": "napalm",
//!         "password": "napalm",
//!         "dev_os": "mock",
//!         "optional_args": {"path": "mocked/r1"}
//!     },
//!     "filter": ["facts"]
//! }))?;
//!
//! let output = registry.run("napalm_get_facts", &params, &ModuleContext::new());
//! println!("{}", output.data["ansible_facts"]["napalm_hostname"]);
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::context::ConnectionContext;
    pub use crate::driver::{
        ConnectionParams, DevOs, DriverError, DriverRegistry, DriverResult, Getter, GetterArgs,
        NetworkDriver,
    };
    pub use crate::error::{Error, Result};
    pub use crate::modules::{
        Module, ModuleContext, ModuleError, ModuleOutput, ModuleParams, ModuleRegistry,
        ModuleResult, ModuleStatus, ParamExt,
    };
    pub use crate::no_log::SecretString;
}

/// Error types and result aliases for crate-level operations.
pub mod error;

/// Layered configuration: files, environment and defaults.
pub mod config;

/// Connection-context defaults folded into each module's `provider`.
pub mod context;

/// The driver boundary: the [`NetworkDriver`](driver::NetworkDriver) trait,
/// getters, and the registry that maps device OS tags to driver factories.
pub mod driver;

/// The module system and the napalm modules.
///
/// # Example
///
/// ```rust,ignore
/// use rustible_napalm::modules::{ModuleRegistry, ModuleContext, ModuleParams};
///
/// let registry = ModuleRegistry::with_builtins();
/// let output = registry.run("napalm_get_config", &params, &ModuleContext::new());
/// ```
pub mod modules;

/// Masking of passwords and secrets in results.
pub mod no_log;

/// Tracing subscriber setup.
pub mod telemetry;

/// Returns the current version of rustible-napalm.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
