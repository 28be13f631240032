//! Shared test utilities and fixtures for the rustible-napalm test suite.
//!
//! This module provides:
//! - A scripted `RecordingDriver` that counts open/close and getter calls
//! - Registry and context builders wired to it
//! - Mock driver data directories
//! - Assertion helpers for ModuleOutput
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tempfile::TempDir;

use rustible_napalm::driver::{
    ConnectionParams, DevOs, DriverError, DriverRegistry, DriverResult, Getter, GetterArgs,
    NetworkDriver,
};
use rustible_napalm::modules::{ModuleContext, ModuleOutput, ModuleParams, ModuleStatus};

// ============================================================================
// Recording driver
// ============================================================================

/// Everything a [`RecordingDriver`] saw, shared with the test.
#[derive(Default)]
pub struct DriverLog {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    /// Getter calls in order
    pub calls: Mutex<Vec<Getter>>,
    /// Connection parameters the driver was built with
    pub params: Mutex<Option<ConnectionParams>>,
    /// Lifecycle events in order ("open", "get_facts", "close")
    pub events: Mutex<Vec<String>>,
}

impl DriverLog {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn calls(&self) -> Vec<Getter> {
        self.calls.lock().clone()
    }
}

/// Scripted responses for a [`RecordingDriver`]
#[derive(Clone, Default)]
pub struct Script {
    /// Getter results; getters not listed are not implemented
    pub getters: HashMap<Getter, Value>,
    /// Getters that fail with an operation error
    pub failing: HashMap<Getter, String>,
    /// Make `open()` fail with this message
    pub open_error: Option<String>,
    /// Make `close()` fail with this message
    pub close_error: Option<String>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn getter(mut self, getter: Getter, value: Value) -> Self {
        self.getters.insert(getter, value);
        self
    }

    pub fn failing(mut self, getter: Getter, message: &str) -> Self {
        self.failing.insert(getter, message.to_string());
        self
    }

    pub fn open_error(mut self, message: &str) -> Self {
        self.open_error = Some(message.to_string());
        self
    }

    pub fn close_error(mut self, message: &str) -> Self {
        self.close_error = Some(message.to_string());
        self
    }
}

/// A driver that replays a [`Script`] and records every call.
pub struct RecordingDriver {
    script: Script,
    log: Arc<DriverLog>,
}

impl NetworkDriver for RecordingDriver {
    fn open(&mut self) -> DriverResult<()> {
        self.log.opens.fetch_add(1, Ordering::SeqCst);
        self.log.events.lock().push("open".to_string());
        match &self.script.open_error {
            Some(message) => Err(DriverError::Connection(message.clone())),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> DriverResult<()> {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
        self.log.events.lock().push("close".to_string());
        match &self.script.close_error {
            Some(message) => Err(DriverError::Operation(message.clone())),
            None => Ok(()),
        }
    }

    fn get(&mut self, getter: Getter, _args: &GetterArgs) -> DriverResult<Value> {
        self.log.calls.lock().push(getter);
        self.log.events.lock().push(getter.method_name());
        if let Some(message) = self.script.failing.get(&getter) {
            return Err(DriverError::Operation(message.clone()));
        }
        self.script
            .getters
            .get(&getter)
            .cloned()
            .ok_or_else(|| DriverError::not_implemented(getter.method_name()))
    }
}

/// Register a [`RecordingDriver`] for `dev_os`, returning its log.
pub fn recording_registry(dev_os: DevOs, script: Script) -> (DriverRegistry, Arc<DriverLog>) {
    let log = Arc::new(DriverLog::default());
    let factory_log = Arc::clone(&log);
    let mut registry = DriverRegistry::new();
    registry.register(
        dev_os,
        move |params: &ConnectionParams| -> DriverResult<Box<dyn NetworkDriver>> {
            *factory_log.params.lock() = Some(params.clone());
            Ok(Box::new(RecordingDriver {
                script: script.clone(),
                log: Arc::clone(&factory_log),
            }))
        },
    );
    (registry, log)
}

/// A module context using only the given driver registry
pub fn context_with(registry: DriverRegistry) -> ModuleContext {
    ModuleContext::new().with_drivers(Arc::new(registry))
}

// ============================================================================
// Parameters and fixtures
// ============================================================================

/// Build module parameters from a JSON object
pub fn params(value: Value) -> ModuleParams {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        other => panic!("expected a JSON object, got {}", other),
    }
}

/// Connection parameters for an ios device
pub fn ios_params(extra: Value) -> ModuleParams {
    let mut p = params(json!({
        "hostname": "10.0.0.1",
        "username": "napalm",
        "password": "lab-pw",
        "dev_os": "ios"
    }));
    p.extend(params(extra));
    p
}

/// A mock driver data directory holding the given files
pub fn mock_device(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        std::fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

/// Connection parameters for the mock driver at `dir`
pub fn mock_params(dir: &Path, extra: Value) -> ModuleParams {
    let mut p = params(json!({
        "hostname": "10.0.0.1",
        "username": "napalm",
        "password": "lab-pw",
        "dev_os": "mock",
        "optional_args": {"path": dir.to_str().unwrap()}
    }));
    p.extend(params(extra));
    p
}

// ============================================================================
// Assertion helpers
// ============================================================================

pub fn assert_module_ok(result: &ModuleOutput) {
    assert_eq!(
        result.status,
        ModuleStatus::Ok,
        "Expected ok, got {:?}: {}",
        result.status,
        result.msg
    );
    assert!(!result.changed);
}

pub fn assert_module_changed(result: &ModuleOutput) {
    assert_eq!(
        result.status,
        ModuleStatus::Changed,
        "Expected changed, got {:?}: {}",
        result.status,
        result.msg
    );
}

pub fn assert_module_failed(result: &ModuleOutput, msg: &str) {
    assert_eq!(
        result.status,
        ModuleStatus::Failed,
        "Expected failure, got {:?}: {}",
        result.status,
        result.msg
    );
    assert_eq!(result.msg, msg);
}
