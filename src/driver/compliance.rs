//! Compliance reports
//!
//! A validation file is a YAML list. Each entry names a getter and the state
//! expected from it:
//!
//! ```yaml
//! - get_facts:
//!     os_version: 4.17.*
//! - get_interfaces_ip:
//!     Ethernet1:
//!       ipv4:
//!         10.0.0.1:
//!           prefix_length: 31
//! - get_environment:
//!     memory:
//!       used_ram: '<15000'
//! - _name: bgp_established
//!   get_bgp_neighbors:
//!     _mode: strict
//!     global: {}
//! ```
//!
//! Dictionaries match partially unless `_mode: strict` is set, lists must
//! contain every expected element, strings are regular expressions, and
//! numbers can be checked with `<`, `<=`, `>`, `>=` or `value%tolerance`.
//! `_kwargs` inside a getter block is passed to the getter and `_name` on the
//! entry renames its key in the report.

use super::{DriverError, DriverResult, Getter, GetterArgs, NetworkDriver};
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::debug;

/// Build a compliance report by running the getters named in `validation_file`.
pub fn compliance_report<D>(driver: &mut D, validation_file: &Path) -> DriverResult<Value>
where
    D: NetworkDriver + ?Sized,
{
    let checks = load_validation_file(validation_file)?;
    let mut report = Map::new();

    for check in checks {
        let name_override = check.get("_name").and_then(Value::as_str).map(String::from);

        for (method, expected) in check {
            if method == "_name" {
                continue;
            }
            let getter = Getter::from_method_name(&method).ok_or_else(|| {
                DriverError::InvalidData {
                    path: validation_file.to_path_buf(),
                    message: format!("unknown getter '{}'", method),
                }
            })?;

            let mut expected = expected;
            let kwargs = take_kwargs(&mut expected);
            let key = name_override.clone().unwrap_or_else(|| method.clone());

            debug!(getter = %getter, key = %key, "Running compliance check");
            let entry = match driver.get(getter, &kwargs) {
                Ok(actual) => compare(&expected, &actual).into_report(),
                Err(e) if e.is_not_implemented() => {
                    json!({"skipped": true, "reason": "NotImplemented"})
                }
                Err(e) => return Err(e),
            };
            report.insert(key, entry);
        }
    }

    let complies = report
        .values()
        .all(|entry| entry.get("complies").and_then(Value::as_bool).unwrap_or(true));
    let skipped: Vec<Value> = report
        .iter()
        .filter(|(_, entry)| entry.get("skipped").and_then(Value::as_bool).unwrap_or(false))
        .map(|(key, _)| Value::from(key.as_str()))
        .collect();

    report.insert("skipped".to_string(), Value::Array(skipped));
    report.insert("complies".to_string(), Value::Bool(complies));
    Ok(Value::Object(report))
}

fn load_validation_file(path: &Path) -> DriverResult<Vec<Map<String, Value>>> {
    let content = std::fs::read_to_string(path)?;
    let invalid = |message: String| DriverError::InvalidData {
        path: path.to_path_buf(),
        message,
    };

    let parsed: Value = serde_yaml::from_str(&content).map_err(|e| invalid(e.to_string()))?;
    match parsed {
        Value::Array(entries) => entries
            .into_iter()
            .map(|entry| match entry {
                Value::Object(map) => Ok(map),
                other => Err(invalid(format!("expected a mapping, got {}", other))),
            })
            .collect(),
        Value::Null => Ok(Vec::new()),
        _ => Err(invalid("expected a list of checks".to_string())),
    }
}

fn take_kwargs(expected: &mut Value) -> GetterArgs {
    match expected {
        Value::Object(map) => match map.remove("_kwargs") {
            Some(Value::Object(kwargs)) => kwargs,
            _ => GetterArgs::new(),
        },
        _ => GetterArgs::new(),
    }
}

/// Outcome of comparing an expected value with the device's value.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    /// Scalar comparison
    Scalar(bool),
    /// Nested dictionary or list comparison with details
    Nested(Value),
}

impl Comparison {
    pub fn complies(&self) -> bool {
        match self {
            Comparison::Scalar(ok) => *ok,
            Comparison::Nested(detail) => detail
                .get("complies")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }

    fn into_report(self) -> Value {
        match self {
            Comparison::Scalar(ok) => json!({
                "complies": ok, "present": {}, "missing": [], "extra": []
            }),
            Comparison::Nested(detail) => detail,
        }
    }
}

/// Compare an expected value against an actual one.
pub fn compare(expected: &Value, actual: &Value) -> Comparison {
    match (expected, actual) {
        (Value::Object(src), Value::Object(dst)) => Comparison::Nested(compare_dict(src, dst)),
        (Value::Object(src), _) => Comparison::Nested(json!({
            "complies": false,
            "present": {},
            "missing": src.keys().filter(|k| *k != "_mode").collect::<Vec<_>>(),
            "extra": []
        })),
        (Value::Array(src), Value::Array(dst)) => Comparison::Nested(compare_list(src, dst)),
        (Value::String(src), Value::Number(_)) => Comparison::Scalar(compare_numeric(src, actual)),
        (Value::String(src), Value::String(dst)) => Comparison::Scalar(compare_string(src, dst)),
        (Value::Number(a), Value::Number(b)) => {
            Comparison::Scalar(a.as_f64().zip(b.as_f64()).map(|(a, b)| a == b).unwrap_or(false))
        }
        _ => Comparison::Scalar(expected == actual),
    }
}

fn compare_dict(src: &Map<String, Value>, dst: &Map<String, Value>) -> Value {
    let strict = src.get("_mode").and_then(Value::as_str) == Some("strict");
    let mut complies = true;
    let mut present = Map::new();
    let mut missing = Vec::new();
    let mut extra = Vec::new();

    for (key, src_element) in src {
        if key == "_mode" {
            continue;
        }
        let Some(dst_element) = dst.get(key) else {
            complies = false;
            missing.push(Value::from(key.as_str()));
            continue;
        };

        let result = compare(src_element, dst_element);
        let element_complies = result.complies();
        complies &= element_complies;

        let entry = match result {
            Comparison::Nested(detail) if !element_complies => {
                json!({"complies": false, "nested": true, "diff": detail})
            }
            Comparison::Nested(_) => json!({"complies": true, "nested": true}),
            Comparison::Scalar(true) => json!({"complies": true, "nested": false}),
            Comparison::Scalar(false) => json!({
                "complies": false,
                "nested": false,
                "expected_value": src_element,
                "actual_value": dst_element,
            }),
        };
        present.insert(key.clone(), entry);
    }

    if strict {
        for key in dst.keys() {
            if !src.contains_key(key) {
                complies = false;
                extra.push(Value::from(key.as_str()));
            }
        }
    }

    json!({"complies": complies, "present": present, "missing": missing, "extra": extra})
}

fn compare_list(src: &[Value], dst: &[Value]) -> Value {
    let mut present = Vec::new();
    let mut missing = Vec::new();

    for element in src {
        if dst.iter().any(|candidate| compare(element, candidate).complies()) {
            present.push(element.clone());
        } else {
            missing.push(element.clone());
        }
    }

    json!({
        "complies": missing.is_empty(),
        "present": present,
        "missing": missing,
        "extra": []
    })
}

fn compare_string(src: &str, dst: &str) -> bool {
    if src == dst {
        return true;
    }
    match regex::Regex::new(src) {
        Ok(re) => re.is_match(dst),
        Err(_) => false,
    }
}

/// Numeric expressions: `<10`, `<=10`, `>10`, `>=10`, `10%5` (within 5%)
/// or a plain number.
fn compare_numeric(src: &str, actual: &Value) -> bool {
    let Some(dst) = actual.as_f64() else {
        return false;
    };
    let src = src.trim();
    let parse = |s: &str| s.trim().parse::<f64>().ok();

    let ops: [(&str, fn(f64, f64) -> bool); 4] = [
        ("<=", |a, e| a <= e),
        (">=", |a, e| a >= e),
        ("<", |a, e| a < e),
        (">", |a, e| a > e),
    ];
    for (prefix, op) in ops {
        if let Some(rest) = src.strip_prefix(prefix) {
            return parse(rest).map(|e| op(dst, e)).unwrap_or(false);
        }
    }

    if let Some((value, tolerance)) = src.split_once('%') {
        return parse(value)
            .zip(parse(tolerance))
            .map(|(v, t)| (dst - v).abs() <= (v * t / 100.0).abs())
            .unwrap_or(false);
    }

    parse(src).map(|e| e == dst).unwrap_or(false)
}
