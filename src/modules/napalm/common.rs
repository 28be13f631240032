//! Shared plumbing for the napalm modules
//!
//! Connection parameters can be given directly or bundled in a `provider`
//! dictionary. [`merge_provider`] folds the two together, explicit values
//! winning, and [`resolve_connection`] turns the result into the
//! [`ConnectionParams`] a driver is built from.

use crate::driver::{ConnectionParams, DevOs, DEFAULT_TIMEOUT};
use crate::modules::{ModuleError, ModuleParams, ModuleResult, ParamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Device OS tags accepted by most napalm modules
pub const OS_CHOICES: &[DevOs] = DevOs::ALL;

/// Device OS tags accepted by `napalm_ping`
pub const PING_OS_CHOICES: &[DevOs] = &[DevOs::Eos, DevOs::Junos, DevOs::Ios, DevOs::Vyos, DevOs::Ros];

/// Parameters shared by every napalm module
pub const CONNECTION_PARAMS: &[&str] = &[
    "hostname",
    "username",
    "password",
    "dev_os",
    "provider",
    "timeout",
    "optional_args",
];

static HASH_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^ *#.*\n?").expect("Invalid hash comment regex"));
static BANG_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^ *!.*\n?").expect("Invalid bang comment regex"));

// ============================================================================
// Provider merge
// ============================================================================

/// Whether a parameter value counts as "not given".
///
/// Absent, `null`, empty strings, empty collections and zero are unset. An
/// explicit `false` is a real value and is handled by the caller.
fn is_unset(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
        Some(Value::Bool(b)) => !b,
    }
}

/// Merge the `provider` bundle into the explicit parameters.
///
/// Every provider key fills the parameter of the same name unless that
/// parameter is already set. `host` is accepted as an alias of `hostname`
/// both at the top level and inside `provider`. An explicit `false` is never
/// overwritten.
pub fn merge_provider(params: &ModuleParams) -> ModuleParams {
    let mut merged = params.clone();

    if let Some(host) = merged.remove("host") {
        if is_unset(merged.get("hostname")) {
            merged.insert("hostname".to_string(), host);
        }
    }

    let mut provider = match params.get("provider") {
        Some(Value::Object(map)) => map.clone(),
        _ => serde_json::Map::new(),
    };
    let provider_host = provider.remove("host");
    if is_unset(provider.get("hostname")) {
        if let Some(host) = provider_host.filter(|h| !is_unset(Some(h))) {
            provider.insert("hostname".to_string(), host);
        }
    }

    for (key, value) in provider {
        if key == "provider" || value.is_null() {
            continue;
        }
        let current = merged.get(&key);
        if current == Some(&Value::Bool(false)) {
            continue;
        }
        if is_unset(current) {
            debug!(param = %key, "Parameter filled from provider");
            merged.insert(key, value);
        }
    }

    merged
}

// ============================================================================
// Connection resolution
// ============================================================================

/// Render an allow-list the way the validation message shows it.
pub fn format_choices(choices: &[DevOs]) -> String {
    let quoted: Vec<String> = choices.iter().map(|os| format!("'{}'", os)).collect();
    format!("[{}]", quoted.join(", "))
}

fn required_string(params: &ModuleParams, key: &str) -> ModuleResult<String> {
    match params.get_string(key)? {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ModuleError::MissingParameter(key.to_string())),
    }
}

/// Build driver connection parameters from merged module parameters.
///
/// hostname, username, dev_os and password must be set, and dev_os must be
/// one of `allowed`. The timeout defaults to 60 seconds and `optional_args`
/// to an empty map.
pub fn resolve_connection(params: &ModuleParams, allowed: &[DevOs]) -> ModuleResult<ConnectionParams> {
    let hostname = required_string(params, "hostname")?;
    let username = required_string(params, "username")?;
    let dev_os = required_string(params, "dev_os")?;
    let password = required_string(params, "password")?;

    let dev_os = dev_os
        .parse::<DevOs>()
        .ok()
        .filter(|os| allowed.contains(os))
        .ok_or_else(|| {
            ModuleError::InvalidParameter(format!("dev_os is not set to {}", format_choices(allowed)))
        })?;

    let timeout = params.get_u64("timeout")?.unwrap_or(DEFAULT_TIMEOUT);
    let optional_args = params.get_object("optional_args")?.unwrap_or_default();

    debug!(hostname = %hostname, dev_os = %dev_os, timeout, "Resolved connection parameters");

    let mut connection = ConnectionParams::new(hostname, username, password, dev_os).with_timeout(timeout);
    connection.optional_args = optional_args;
    Ok(connection)
}

// ============================================================================
// Config text helpers
// ============================================================================

/// Remove comment lines from configuration text.
///
/// Junos comments start with `#`; IOS, IOS-XR, NX-OS and EOS comments start
/// with `!`. Other platforms are returned unchanged.
pub fn strip_comments(config: &str, dev_os: DevOs) -> String {
    match dev_os.comment_leader() {
        Some('#') => HASH_COMMENT.replace_all(config, "").into_owned(),
        Some('!') => BANG_COMMENT.replace_all(config, "").into_owned(),
        _ => config.to_string(),
    }
}

/// Expand `~` in a user supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

pub fn save_to_file(content: &str, path: &Path) -> std::io::Result<()> {
    std::fs::write(path, content)
}

/// Hex SHA-1 of a byte string
pub fn sha1_hex(content: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Whether writing `content` to `path` would change the file.
pub fn file_differs(content: &str, path: &Path) -> std::io::Result<bool> {
    if !path.is_file() {
        return Ok(true);
    }
    let existing = std::fs::read(path)?;
    Ok(sha1_hex(&existing) != sha1_hex(content.as_bytes()))
}

/// Write `content` to `path` unless the file already holds the same bytes.
///
/// Returns whether the file was written.
pub fn write_if_changed(content: &str, path: &Path) -> std::io::Result<bool> {
    if !file_differs(content, path)? {
        debug!(path = %path.display(), "Destination already up to date");
        return Ok(false);
    }
    save_to_file(content, path)?;
    Ok(true)
}
