//! Module system for rustible-napalm
//!
//! This module provides the core traits, types, and registry for the module system.
//! Each module is one task-runner procedure: it receives a flat set of named
//! parameters, talks to a network device through a driver and reports a
//! structured result.

pub mod napalm;

use crate::context::ConnectionContext;
use crate::driver::{DriverError, DriverRegistry};
use crate::no_log::NoLogValues;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors that can occur during module execution
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Module not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidParameter(String),

    #[error("{0} is required")]
    MissingParameter(String),

    /// Driver construction or `open()` failed
    #[error("cannot connect to device: {0}")]
    Connection(String),

    /// `close()` failed after the work was done
    #[error("cannot close device connection: {0}")]
    Disconnect(String),

    #[error("{0}")]
    ExecutionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Result type for module operations
pub type ModuleResult<T> = Result<T, ModuleError>;

/// Status of a module execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStatus {
    /// Module executed successfully and made changes
    Changed,
    /// Module executed successfully but no changes were needed
    Ok,
    /// Module execution failed
    Failed,
    /// Module was skipped
    Skipped,
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleStatus::Changed => write!(f, "changed"),
            ModuleStatus::Ok => write!(f, "ok"),
            ModuleStatus::Failed => write!(f, "failed"),
            ModuleStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Classification of modules based on where they do their work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModuleClassification {
    /// Runs entirely on the control node and never opens a device connection.
    LocalLogic,

    /// Opens a driver connection to a network device. The runner fills the
    /// module's `provider` from the connection context before it runs.
    #[default]
    NetworkDevice,
}

impl fmt::Display for ModuleClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleClassification::LocalLogic => write!(f, "local_logic"),
            ModuleClassification::NetworkDevice => write!(f, "network_device"),
        }
    }
}

/// Represents a difference between current and desired state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diff {
    /// Description of what will change
    pub before: String,
    /// Description of what it will change to
    pub after: String,
    /// Optional detailed diff (e.g., a configuration diff from the device)
    pub details: Option<String>,
}

impl Diff {
    pub fn new(before: impl Into<String>, after: impl Into<String>) -> Self {
        Self {
            before: before.into(),
            after: after.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Result of a module execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleOutput {
    /// Whether the module changed anything
    pub changed: bool,
    /// Human-readable message about what happened
    pub msg: String,
    /// Status of the execution
    pub status: ModuleStatus,
    /// Optional diff showing what changed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<Diff>,
    /// Additional data returned by the module
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, Value>,
}

impl ModuleOutput {
    fn with_status(msg: impl Into<String>, changed: bool, status: ModuleStatus) -> Self {
        Self {
            changed,
            msg: msg.into(),
            status,
            diff: None,
            data: HashMap::new(),
        }
    }

    /// Create a new successful output with no changes
    pub fn ok(msg: impl Into<String>) -> Self {
        Self::with_status(msg, false, ModuleStatus::Ok)
    }

    /// Create a new successful output with changes
    pub fn changed(msg: impl Into<String>) -> Self {
        Self::with_status(msg, true, ModuleStatus::Changed)
    }

    /// Create a failed output
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::with_status(msg, false, ModuleStatus::Failed)
    }

    /// Create a skipped output
    pub fn skipped(msg: impl Into<String>) -> Self {
        Self::with_status(msg, false, ModuleStatus::Skipped)
    }

    /// Successful output whose changed flag is decided at runtime
    pub fn from_changed(changed: bool, msg: impl Into<String>) -> Self {
        if changed {
            Self::changed(msg)
        } else {
            Self::ok(msg)
        }
    }

    /// Add a diff to the output
    pub fn with_diff(mut self, diff: Diff) -> Self {
        self.diff = Some(diff);
        self
    }

    /// Add data to the output
    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == ModuleStatus::Failed
    }

    /// Mask every registered no-log value in the message, diff and data.
    pub fn redact(&mut self, no_log: &NoLogValues) {
        if no_log.is_empty() {
            return;
        }
        self.msg = no_log.redact(&self.msg);
        if let Some(diff) = self.diff.as_mut() {
            diff.before = no_log.redact(&diff.before);
            diff.after = no_log.redact(&diff.after);
            diff.details = diff.details.as_deref().map(|d| no_log.redact(d));
        }
        for value in self.data.values_mut() {
            no_log.redact_value(value);
        }
    }
}

/// Parameters passed to a module
pub type ModuleParams = HashMap<String, Value>;

/// Context for module execution
#[derive(Clone)]
pub struct ModuleContext {
    /// Whether to run in check mode (dry run)
    pub check_mode: bool,
    /// Whether to show diffs
    pub diff_mode: bool,
    /// Connection facts used to fill the module's `provider`
    pub connection: Option<ConnectionContext>,
    /// Drivers available to network modules
    pub drivers: Arc<DriverRegistry>,
}

impl fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContext")
            .field("check_mode", &self.check_mode)
            .field("diff_mode", &self.diff_mode)
            .field("connection", &self.connection)
            .field("drivers", &self.drivers.available())
            .finish()
    }
}

impl Default for ModuleContext {
    fn default() -> Self {
        Self {
            check_mode: false,
            diff_mode: false,
            connection: None,
            drivers: Arc::new(DriverRegistry::with_builtins()),
        }
    }
}

impl ModuleContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    pub fn with_diff_mode(mut self, diff_mode: bool) -> Self {
        self.diff_mode = diff_mode;
        self
    }

    pub fn with_connection(mut self, connection: ConnectionContext) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn with_drivers(mut self, drivers: Arc<DriverRegistry>) -> Self {
        self.drivers = drivers;
        self
    }
}

/// Trait that all modules must implement
pub trait Module: Send + Sync {
    /// Returns the name of the module
    fn name(&self) -> &'static str;

    /// Returns a description of what the module does
    fn description(&self) -> &'static str;

    /// Returns the classification of this module.
    ///
    /// `NetworkDevice` modules get their `provider` filled from the
    /// connection context before they run.
    fn classification(&self) -> ModuleClassification {
        ModuleClassification::NetworkDevice
    }

    /// Whether the module honours check mode
    fn supports_check_mode(&self) -> bool {
        true
    }

    /// Execute the module with the given parameters
    fn execute(&self, params: &ModuleParams, context: &ModuleContext)
        -> ModuleResult<ModuleOutput>;

    /// Check what would change without making changes (for check mode)
    fn check(&self, params: &ModuleParams, context: &ModuleContext) -> ModuleResult<ModuleOutput> {
        let check_context = ModuleContext {
            check_mode: true,
            ..context.clone()
        };
        self.execute(params, &check_context)
    }

    /// Validate the parameters before execution
    fn validate_params(&self, params: &ModuleParams) -> ModuleResult<()> {
        let _ = params;
        Ok(())
    }

    /// Returns the list of required parameters
    fn required_params(&self) -> &[&'static str] {
        &[]
    }
}

/// Helper trait for extracting parameters
pub trait ParamExt {
    fn get_string(&self, key: &str) -> ModuleResult<Option<String>>;
    fn get_string_required(&self, key: &str) -> ModuleResult<String>;
    fn get_bool(&self, key: &str) -> ModuleResult<Option<bool>>;
    fn get_i64(&self, key: &str) -> ModuleResult<Option<i64>>;
    fn get_u64(&self, key: &str) -> ModuleResult<Option<u64>>;
    fn get_vec_string(&self, key: &str) -> ModuleResult<Option<Vec<String>>>;
    fn get_object(&self, key: &str) -> ModuleResult<Option<serde_json::Map<String, Value>>>;
}

impl ParamExt for ModuleParams {
    fn get_string(&self, key: &str) -> ModuleResult<Option<String>> {
        match self.get(key) {
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Null) | None => Ok(None),
            Some(v) => Ok(Some(v.to_string().trim_matches('"').to_string())),
        }
    }

    fn get_string_required(&self, key: &str) -> ModuleResult<String> {
        self.get_string(key)?
            .ok_or_else(|| ModuleError::MissingParameter(key.to_string()))
    }

    fn get_bool(&self, key: &str) -> ModuleResult<Option<bool>> {
        match self.get(key) {
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Ok(Some(true)),
                "false" | "no" | "0" | "off" => Ok(Some(false)),
                _ => Err(ModuleError::InvalidParameter(format!(
                    "{} must be a boolean",
                    key
                ))),
            },
            Some(Value::Null) | None => Ok(None),
            Some(_) => Err(ModuleError::InvalidParameter(format!(
                "{} must be a boolean",
                key
            ))),
        }
    }

    fn get_i64(&self, key: &str) -> ModuleResult<Option<i64>> {
        match self.get(key) {
            Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| {
                ModuleError::InvalidParameter(format!("{} must be an integer", key))
            }),
            Some(Value::String(s)) => s
                .parse()
                .map(Some)
                .map_err(|_| ModuleError::InvalidParameter(format!("{} must be an integer", key))),
            Some(Value::Null) | None => Ok(None),
            Some(_) => Err(ModuleError::InvalidParameter(format!(
                "{} must be an integer",
                key
            ))),
        }
    }

    fn get_u64(&self, key: &str) -> ModuleResult<Option<u64>> {
        match self.get(key) {
            Some(Value::Number(n)) => n.as_u64().map(Some).ok_or_else(|| {
                ModuleError::InvalidParameter(format!("{} must be a positive integer", key))
            }),
            Some(Value::String(s)) => s.parse().map(Some).map_err(|_| {
                ModuleError::InvalidParameter(format!("{} must be a positive integer", key))
            }),
            Some(Value::Null) | None => Ok(None),
            Some(_) => Err(ModuleError::InvalidParameter(format!(
                "{} must be a positive integer",
                key
            ))),
        }
    }

    fn get_vec_string(&self, key: &str) -> ModuleResult<Option<Vec<String>>> {
        match self.get(key) {
            Some(Value::Array(arr)) => {
                let mut result = Vec::new();
                for item in arr {
                    match item {
                        Value::String(s) => result.push(s.clone()),
                        v => result.push(v.to_string().trim_matches('"').to_string()),
                    }
                }
                Ok(Some(result))
            }
            Some(Value::String(s)) => {
                // Handle comma-separated string
                Ok(Some(s.split(',').map(|s| s.trim().to_string()).collect()))
            }
            Some(Value::Null) | None => Ok(None),
            Some(_) => Err(ModuleError::InvalidParameter(format!(
                "{} must be an array",
                key
            ))),
        }
    }

    fn get_object(&self, key: &str) -> ModuleResult<Option<serde_json::Map<String, Value>>> {
        match self.get(key) {
            Some(Value::Object(map)) => Ok(Some(map.clone())),
            Some(Value::Null) | None => Ok(None),
            Some(_) => Err(ModuleError::InvalidParameter(format!(
                "{} must be a dictionary",
                key
            ))),
        }
    }
}

/// Registry for looking up modules by name
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Create a registry with all built-in modules
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        napalm::register_napalm_modules(&mut registry);
        registry
    }

    /// Register a module
    pub fn register(&mut self, module: Arc<dyn Module>) {
        self.modules.insert(module.name().to_string(), module);
    }

    /// Get a module by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.modules.get(name).cloned()
    }

    /// Check if a module exists
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Get all module names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Execute a module by name
    pub fn execute(
        &self,
        name: &str,
        params: &ModuleParams,
        context: &ModuleContext,
    ) -> ModuleResult<ModuleOutput> {
        let module = self
            .get(name)
            .ok_or_else(|| ModuleError::NotFound(name.to_string()))?;

        // Validate parameters first
        module.validate_params(params)?;

        // Check required parameters
        for param in module.required_params() {
            if params.get(*param).map_or(true, Value::is_null) {
                return Err(ModuleError::MissingParameter((*param).to_string()));
            }
        }

        if context.check_mode {
            if !module.supports_check_mode() {
                return Ok(ModuleOutput::skipped(format!(
                    "remote module ({}) does not support check mode",
                    name
                )));
            }
            module.check(params, context)
        } else {
            module.execute(params, context)
        }
    }

    /// Run one module invocation end to end.
    ///
    /// Fills `provider` from the connection context for network modules,
    /// executes the module, turns any error into a failed output and masks
    /// every password or secret found in the parameters.
    #[instrument(skip(self, params, context), fields(module = %name))]
    pub fn run(&self, name: &str, params: &ModuleParams, context: &ModuleContext) -> ModuleOutput {
        let mut params = params.clone();

        let is_network = self
            .get(name)
            .map(|m| m.classification() == ModuleClassification::NetworkDevice)
            .unwrap_or(false);
        if is_network {
            if let Some(connection) = &context.connection {
                connection.populate_provider(&mut params);
            }
        }

        let no_log = NoLogValues::from_params(&params);
        let mut output = match self.execute(name, &params, context) {
            Ok(output) => output,
            Err(e) => {
                debug!(error = %e, "Module failed");
                ModuleOutput::failed(e.to_string())
            }
        };
        output.redact(&no_log);
        output
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct TestModule;

    impl Module for TestModule {
        fn name(&self) -> &'static str {
            "test"
        }

        fn description(&self) -> &'static str {
            "A test module"
        }

        fn classification(&self) -> ModuleClassification {
            ModuleClassification::LocalLogic
        }

        fn execute(
            &self,
            params: &ModuleParams,
            context: &ModuleContext,
        ) -> ModuleResult<ModuleOutput> {
            if context.check_mode {
                return Ok(ModuleOutput::ok("Would do something"));
            }

            let msg = params
                .get_string("msg")?
                .unwrap_or_else(|| "Hello".to_string());
            Ok(ModuleOutput::changed(msg))
        }

        fn required_params(&self) -> &[&'static str] {
            &["msg"]
        }
    }

    #[test]
    fn test_module_registry() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(TestModule));

        assert!(registry.contains("test"));
        assert!(!registry.contains("nonexistent"));

        let module = registry.get("test").unwrap();
        assert_eq!(module.name(), "test");
    }

    #[test]
    fn test_builtins_are_napalm_modules() {
        let registry = ModuleRegistry::with_builtins();
        assert_eq!(
            registry.names(),
            vec![
                "napalm_cli",
                "napalm_get_config",
                "napalm_get_facts",
                "napalm_install_config",
                "napalm_ping",
                "napalm_validate"
            ]
        );
    }

    #[test]
    fn test_module_output() {
        let output = ModuleOutput::changed("Something changed")
            .with_data("key", json!("value"))
            .with_diff(Diff::new("old", "new"));

        assert!(output.changed);
        assert_eq!(output.status, ModuleStatus::Changed);
        assert!(output.diff.is_some());
        assert!(output.data.contains_key("key"));
        assert!(!ModuleOutput::from_changed(false, "").changed);
    }

    #[test]
    fn test_run_reports_missing_parameter() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(TestModule));

        let output = registry.run("test", &ModuleParams::new(), &ModuleContext::new());
        assert!(output.is_failed());
        assert_eq!(output.msg, "msg is required");

        let output = registry.run("missing", &ModuleParams::new(), &ModuleContext::new());
        assert_eq!(output.msg, "Module not found: missing");
    }

    #[test]
    fn test_run_masks_passwords() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(TestModule));

        let mut params = ModuleParams::new();
        params.insert("msg".to_string(), json!("login with hunter2"));
        params.insert("password".to_string(), json!("hunter2"));

        let output = registry.run("test", &params, &ModuleContext::new());
        assert_eq!(output.msg, "login with ********");
    }

    #[test]
    fn test_param_ext() {
        let mut params: ModuleParams = HashMap::new();
        params.insert("string".to_string(), json!("hello"));
        params.insert("bool_true".to_string(), json!(true));
        params.insert("bool_str".to_string(), json!("yes"));
        params.insert("number".to_string(), json!(42));
        params.insert("null".to_string(), Value::Null);
        params.insert("array".to_string(), json!(["one", "two", "three"]));
        params.insert("object".to_string(), json!({"port": 22}));

        assert_eq!(
            params.get_string("string").unwrap(),
            Some("hello".to_string())
        );
        assert_eq!(params.get_string("null").unwrap(), None);
        assert_eq!(params.get_bool("bool_true").unwrap(), Some(true));
        assert_eq!(params.get_bool("bool_str").unwrap(), Some(true));
        assert_eq!(params.get_i64("number").unwrap(), Some(42));
        assert_eq!(params.get_u64("number").unwrap(), Some(42));
        assert_eq!(
            params.get_vec_string("array").unwrap(),
            Some(vec![
                "one".to_string(),
                "two".to_string(),
                "three".to_string()
            ])
        );
        assert_eq!(params.get_object("object").unwrap().unwrap()["port"], 22);
        assert!(params.get_object("string").is_err());
    }
}
