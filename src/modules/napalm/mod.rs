//! Network device modules backed by napalm-style drivers
//!
//! Every module here follows the same procedure:
//!
//! 1. merge the `provider` bundle into the explicit parameters
//! 2. resolve and validate the connection parameters
//! 3. construct the driver for `dev_os` and open it
//! 4. call getters or configuration actions
//! 5. close the connection and report
//!
//! # Example
//!
//! ```rust,ignore
//! use rustible_napalm::modules::{ModuleContext, ModuleRegistry};
//!
//! let registry = ModuleRegistry::with_builtins();
//! let params = serde_json::from_value(serde_json::json!({
//!     "hostname": "10.0.0.1",
//!     "username": "napalm",
//!     "password": "napalm",
//!     "dev_os": "mock",
//!     "optional_args": {"path": "tests/fixtures/r1"},
//!     "filter": ["facts", "interfaces"]
//! }))?;
//! let output = registry.run("napalm_get_facts", &params, &ModuleContext::new());
//! ```

pub mod cli;
pub mod common;
pub mod docs;
pub mod get_config;
pub mod get_facts;
pub mod install_config;
pub mod ping;
pub mod session;
pub mod validate;

pub use cli::NapalmCliModule;
pub use common::{merge_provider, resolve_connection, OS_CHOICES, PING_OS_CHOICES};
pub use docs::{module_doc, ModuleDoc};
pub use get_config::NapalmGetConfigModule;
pub use get_facts::NapalmGetFactsModule;
pub use install_config::NapalmInstallConfigModule;
pub use ping::NapalmPingModule;
pub use session::{DeviceSession, SessionState};
pub use validate::NapalmValidateModule;

use super::ModuleRegistry;
use std::sync::Arc;

/// Names of every napalm module, in registration order
pub fn napalm_module_names() -> &'static [&'static str] {
    &[
        "napalm_get_facts",
        "napalm_get_config",
        "napalm_install_config",
        "napalm_cli",
        "napalm_ping",
        "napalm_validate",
    ]
}

/// Register all napalm modules with a registry
pub fn register_napalm_modules(registry: &mut ModuleRegistry) {
    registry.register(Arc::new(NapalmGetFactsModule));
    registry.register(Arc::new(NapalmGetConfigModule));
    registry.register(Arc::new(NapalmInstallConfigModule));
    registry.register(Arc::new(NapalmCliModule));
    registry.register(Arc::new(NapalmPingModule));
    registry.register(Arc::new(NapalmValidateModule));
}

/// Fixtures shared by the module unit tests
#[cfg(test)]
pub(crate) mod testing {
    use crate::modules::ModuleParams;
    use serde_json::{json, Value};
    use std::path::Path;
    use tempfile::TempDir;

    /// A mock device data directory holding the given files
    pub fn mock_device(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    /// Connection parameters for the mock driver at `dir`, plus `extra`
    pub fn mock_params(dir: &Path, extra: Value) -> ModuleParams {
        let mut params: ModuleParams = match json!({
            "hostname": "10.0.0.1",
            "username": "napalm",
            "password": "mock-pw",
            "dev_os": "mock",
            "optional_args": {"path": dir.to_str().unwrap()}
        }) {
            Value::Object(map) => map.into_iter().collect(),
            _ => unreachable!(),
        };
        if let Value::Object(extra) = extra {
            params.extend(extra);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::{ModuleContext, ModuleStatus};
    use serde_json::json;
    use testing::{mock_device, mock_params};

    #[test]
    fn test_every_module_registered_and_documented() {
        let mut registry = ModuleRegistry::new();
        register_napalm_modules(&mut registry);

        for name in napalm_module_names() {
            assert!(registry.contains(name), "{} not registered", name);
            let doc = module_doc(name).unwrap();
            assert_eq!(doc.module, *name);
        }
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let registry = ModuleRegistry::with_builtins();
        let dir = mock_device(&[]);
        let params = mock_params(dir.path(), json!({"bogus": true}));

        let output = registry.run("napalm_get_facts", &params, &ModuleContext::new());
        assert!(output.is_failed());
        assert!(output
            .msg
            .starts_with("Unsupported parameters for (napalm_get_facts) module: bogus."));
    }

    #[test]
    fn test_password_masked_in_failure() {
        let registry = ModuleRegistry::with_builtins();
        let dir = mock_device(&[(
            "get_facts.1",
            r#"{"exception": "AuthError", "message": "bad password s3cr3t"}"#,
        )]);
        let mut params = mock_params(dir.path(), json!({}));
        params.insert("password".to_string(), json!("s3cr3t"));

        let output = registry.run("napalm_get_facts", &params, &ModuleContext::new());
        assert_eq!(output.status, ModuleStatus::Failed);
        assert_eq!(
            output.msg,
            "[facts] cannot retrieve device data: AuthError: bad password ********"
        );
    }

    #[test]
    fn test_connection_context_fills_provider() {
        let registry = ModuleRegistry::with_builtins();
        let dir = mock_device(&[("get_facts.1", r#"{"hostname": "r1"}"#)]);
        let mut params = crate::modules::ModuleParams::new();
        params.insert(
            "optional_args".to_string(),
            json!({"path": dir.path().to_str().unwrap()}),
        );

        let context = ModuleContext::new().with_connection(
            crate::context::ConnectionContext::new()
                .with_remote_addr("10.0.0.1")
                .with_remote_user("napalm")
                .with_password("mock-pw")
                .with_network_os("mock"),
        );
        let output = registry.run("napalm_get_facts", &params, &context);
        assert_eq!(output.status, ModuleStatus::Ok, "{}", output.msg);
        assert_eq!(output.data["ansible_facts"]["napalm_hostname"], "r1");
    }
}
