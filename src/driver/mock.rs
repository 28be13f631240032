//! Mock driver
//!
//! Serves canned device responses from a directory so playbooks and tests can
//! run without a device. The directory is taken from `optional_args.path`,
//! falling back to the factory's default path.
//!
//! Each call to an operation reads `<path>/<method>.<n>`, where `n` counts
//! calls to that method starting at 1. Files hold JSON. A file of the form
//! `{"exception": "<Kind>", "message": "<text>"}` makes the call fail;
//! `NotImplementedError` as the kind yields [`DriverError::NotImplemented`].
//! A missing file also means the operation is not implemented.
//!
//! CLI output is plain text in `<path>/cli.<n>.<command>`, where non
//! alphanumeric characters of the command are replaced with `_`.
//!
//! Candidate configuration is kept in memory. `compare_config` returns the
//! mocked `compare_config.<n>` value when present, otherwise a line diff of
//! the candidate against `<path>/running.conf`.

use super::{
    line_diff, CandidateSource, ConnectionParams, DriverError, DriverFactory, DriverResult, Getter,
    GetterArgs, NetworkDriver, PingOptions,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

static CLI_SANITIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9]+").expect("Invalid CLI sanitize regex"));

/// Factory for [`MockDriver`]
#[derive(Debug, Clone, Default)]
pub struct MockDriverFactory {
    default_path: Option<PathBuf>,
}

impl MockDriverFactory {
    /// Use `path` when `optional_args.path` is not given
    pub fn with_default_path(path: impl Into<PathBuf>) -> Self {
        Self {
            default_path: Some(path.into()),
        }
    }
}

impl DriverFactory for MockDriverFactory {
    fn create(&self, params: &ConnectionParams) -> DriverResult<Box<dyn NetworkDriver>> {
        let path = params
            .optional_args
            .get("path")
            .and_then(Value::as_str)
            .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
            .or_else(|| self.default_path.clone())
            .ok_or_else(|| {
                DriverError::Connection(
                    "mock driver requires a data directory in optional_args.path".to_string(),
                )
            })?;
        Ok(Box::new(MockDriver::new(path)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    text: String,
    replace: bool,
}

/// Driver that replays mocked data from disk
#[derive(Debug)]
pub struct MockDriver {
    path: PathBuf,
    opened: bool,
    calls: HashMap<String, usize>,
    candidate: Option<Candidate>,
    running: Option<String>,
}

impl MockDriver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            opened: false,
            calls: HashMap::new(),
            candidate: None,
            running: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.opened
    }

    fn ensure_open(&self) -> DriverResult<()> {
        if self.opened {
            Ok(())
        } else {
            Err(DriverError::Closed)
        }
    }

    fn count_call(&mut self, method: &str) -> usize {
        let count = self.calls.entry(method.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    fn mocked_file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Read the next mocked response for `method`, if one exists.
    fn try_mocked(&mut self, method: &str) -> DriverResult<Option<Value>> {
        let count = self.count_call(method);
        let file = self.mocked_file(&format!("{}.{}", method, count));
        if !file.is_file() {
            trace!(file = %file.display(), "No mocked data");
            return Ok(None);
        }

        let content = std::fs::read_to_string(&file)?;
        let value: Value =
            serde_json::from_str(&content).map_err(|e| DriverError::InvalidData {
                path: file.clone(),
                message: e.to_string(),
            })?;
        debug!(file = %file.display(), "Serving mocked data");
        raise_if_exception(method, value).map(Some)
    }

    fn mocked(&mut self, method: &str) -> DriverResult<Value> {
        let count = self.calls.get(method).copied().unwrap_or(0) + 1;
        self.try_mocked(method)?.ok_or_else(|| DriverError::NotImplemented {
            method: format!(
                "{} (provide mocked data in {})",
                method,
                self.mocked_file(&format!("{}.{}", method, count)).display()
            ),
        })
    }

    fn running_config(&mut self) -> DriverResult<String> {
        if let Some(ref running) = self.running {
            return Ok(running.clone());
        }
        let file = self.mocked_file("running.conf");
        let running = if file.is_file() {
            std::fs::read_to_string(file)?
        } else {
            String::new()
        };
        self.running = Some(running.clone());
        Ok(running)
    }

    fn candidate_config(&mut self) -> DriverResult<Option<String>> {
        let Some(candidate) = self.candidate.clone() else {
            return Ok(None);
        };
        if candidate.replace {
            return Ok(Some(candidate.text));
        }
        let mut merged = self.running_config()?;
        if !merged.is_empty() && !merged.ends_with('\n') {
            merged.push('\n');
        }
        merged.push_str(&candidate.text);
        Ok(Some(merged))
    }

    fn load_candidate(&mut self, source: &CandidateSource, replace: bool) -> DriverResult<()> {
        self.ensure_open()?;
        let method = if replace {
            "load_replace_candidate"
        } else {
            "load_merge_candidate"
        };
        self.try_mocked(method)?;
        self.candidate = Some(Candidate {
            text: source.read()?,
            replace,
        });
        Ok(())
    }
}

fn raise_if_exception(method: &str, value: Value) -> DriverResult<Value> {
    let Some(kind) = value.get("exception").and_then(Value::as_str) else {
        return Ok(value);
    };
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if kind == "NotImplementedError" {
        Err(DriverError::not_implemented(method))
    } else if message.is_empty() {
        Err(DriverError::Operation(kind.to_string()))
    } else {
        Err(DriverError::Operation(format!("{}: {}", kind, message)))
    }
}

impl NetworkDriver for MockDriver {
    fn open(&mut self) -> DriverResult<()> {
        if !self.path.is_dir() {
            return Err(DriverError::Connection(format!(
                "mock data directory not found: {}",
                self.path.display()
            )));
        }
        self.try_mocked("open").map_err(|e| match e {
            DriverError::Operation(msg) => DriverError::Connection(msg),
            other => other,
        })?;
        self.opened = true;
        Ok(())
    }

    fn close(&mut self) -> DriverResult<()> {
        self.ensure_open()?;
        self.try_mocked("close")?;
        self.opened = false;
        Ok(())
    }

    fn get(&mut self, getter: Getter, args: &GetterArgs) -> DriverResult<Value> {
        self.ensure_open()?;
        trace!(getter = %getter, args = ?args, "Mock getter");
        self.mocked(&getter.method_name())
    }

    fn load_merge_candidate(&mut self, source: &CandidateSource) -> DriverResult<()> {
        self.load_candidate(source, false)
    }

    fn load_replace_candidate(&mut self, source: &CandidateSource) -> DriverResult<()> {
        self.load_candidate(source, true)
    }

    fn compare_config(&mut self) -> DriverResult<String> {
        self.ensure_open()?;
        if let Some(value) = self.try_mocked("compare_config")? {
            return Ok(match value {
                Value::String(s) => s,
                other => other
                    .get("diff")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }
        match self.candidate_config()? {
            Some(candidate) => {
                let running = self.running_config()?;
                Ok(line_diff(&running, &candidate))
            }
            None => Ok(String::new()),
        }
    }

    fn commit_config(&mut self) -> DriverResult<()> {
        self.ensure_open()?;
        self.try_mocked("commit_config")?;
        let candidate = self
            .candidate_config()?
            .ok_or_else(|| DriverError::Operation("no candidate configuration loaded".into()))?;
        self.running = Some(candidate);
        self.candidate = None;
        Ok(())
    }

    fn discard_config(&mut self) -> DriverResult<()> {
        self.ensure_open()?;
        self.try_mocked("discard_config")?;
        self.candidate = None;
        Ok(())
    }

    fn cli(&mut self, commands: &[String]) -> DriverResult<Value> {
        self.ensure_open()?;
        let count = self.count_call("cli");
        let mut result = serde_json::Map::new();
        for command in commands {
            let sanitized = CLI_SANITIZE.replace_all(command, "_");
            let file = self.mocked_file(&format!("cli.{}.{}", count, sanitized));
            let output = std::fs::read_to_string(&file).map_err(|e| {
                DriverError::Operation(format!(
                    "no mocked output for '{}' in {}: {}",
                    command,
                    file.display(),
                    e
                ))
            })?;
            result.insert(command.clone(), Value::String(output));
        }
        Ok(Value::Object(result))
    }

    fn ping(&mut self, destination: &str, options: &PingOptions) -> DriverResult<Value> {
        self.ensure_open()?;
        trace!(destination, options = ?options, "Mock ping");
        self.mocked("ping")
    }
}
