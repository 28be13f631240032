//! No-log enforcement for device credentials.
//!
//! Passwords and enable secrets travel through module parameters, the
//! `provider` bundle and driver `optional_args`. Every such value is
//! registered here so it can be masked out of messages and payloads before a
//! result leaves the module runner.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Replacement text for masked values.
pub const MASK: &str = "********";

/// Parameter names whose values are never reported.
pub const NO_LOG_PARAMS: &[&str] = &["password", "secret"];

/// A string wrapper that prevents the value from being logged.
///
/// `Display`, `Debug` and `Serialize` all render the mask. Use
/// [`SecretString::expose`] when the real value has to be handed to a driver.
#[derive(Clone, Default)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    /// Create a new secret.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Expose the underlying value.
    pub fn expose(&self) -> &str {
        &self.value
    }

    /// Check if the value is empty.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MASK)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString({})", MASK)
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for SecretString {}

impl serde::Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(MASK)
    }
}

impl<'de> serde::Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::new(value))
    }
}

/// Set of values that must be masked in one module invocation's output.
#[derive(Default)]
pub struct NoLogValues {
    values: HashSet<String>,
}

impl NoLogValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sensitive value. Empty strings are ignored.
    pub fn register(&mut self, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            return;
        }
        self.values.insert(value);
    }

    /// Register a JSON value if it is a non-empty scalar.
    pub fn register_value(&mut self, value: &Value) {
        match value {
            Value::String(s) => self.register(s.clone()),
            Value::Number(n) => self.register(n.to_string()),
            _ => {}
        }
    }

    /// Collect every `password`/`secret` found in the top-level parameters,
    /// in `optional_args`, in `provider` and in `provider.optional_args`.
    pub fn from_params(params: &HashMap<String, Value>) -> Self {
        let mut values = Self::new();
        for name in NO_LOG_PARAMS {
            if let Some(value) = params.get(*name) {
                values.register_value(value);
            }
        }

        if let Some(Value::Object(optional_args)) = params.get("optional_args") {
            values.collect_from(optional_args);
        }
        if let Some(Value::Object(provider)) = params.get("provider") {
            values.collect_from(provider);
            if let Some(Value::Object(optional_args)) = provider.get("optional_args") {
                values.collect_from(optional_args);
            }
        }
        values
    }

    fn collect_from(&mut self, map: &serde_json::Map<String, Value>) {
        for name in NO_LOG_PARAMS {
            if let Some(value) = map.get(*name) {
                self.register_value(value);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Mask all registered values in a piece of text.
    pub fn redact(&self, text: &str) -> String {
        // Longest first so a secret that contains another one is masked whole.
        let mut ordered: Vec<&String> = self.values.iter().collect();
        ordered.sort_by_key(|v| std::cmp::Reverse(v.len()));

        let mut result = text.to_string();
        for value in ordered {
            if result.contains(value.as_str()) {
                result = result.replace(value.as_str(), MASK);
            }
        }
        result
    }

    /// Mask registered values in every string value of a JSON document.
    ///
    /// Object keys are left alone: they name results (`napalm_facts`) and
    /// are not device data.
    pub fn redact_value(&self, value: &mut Value) {
        if self.is_empty() {
            return;
        }
        match value {
            Value::String(s) => {
                let redacted = self.redact(s);
                if redacted != *s {
                    *s = redacted;
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.redact_value(item);
                }
            }
            Value::Object(map) => {
                for item in map.values_mut() {
                    self.redact_value(item);
                }
            }
            _ => {}
        }
    }
}

impl fmt::Debug for NoLogValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoLogValues")
            .field("registered_values", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> HashMap<String, Value> {
        match value {
            Value::Object(m) => m.into_iter().collect(),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_secret_string_is_masked() {
        let secret = SecretString::new("hunter2");
        assert_eq!(format!("{}", secret), MASK);
        assert!(!format!("{:?}", secret).contains("hunter2"));
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"********\"");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_collects_from_all_locations() {
        let params = map(json!({
            "password": "top",
            "optional_args": {"secret": "enable1"},
            "provider": {
                "password": "prov",
                "optional_args": {"secret": "enable2"}
            }
        }));
        let values = NoLogValues::from_params(&params);
        assert_eq!(values.len(), 4);
        assert_eq!(
            values.redact("top prov enable1 enable2"),
            "******** ******** ******** ********"
        );
    }

    #[test]
    fn test_empty_values_ignored() {
        let params = map(json!({"password": "", "provider": {"secret": null}}));
        assert!(NoLogValues::from_params(&params).is_empty());
    }

    #[test]
    fn test_redact_nested_value() {
        let mut values = NoLogValues::new();
        values.register("s3cret");
        let mut doc = json!({"msg": "login s3cret failed", "list": ["s3cret"], "count": 1});
        values.redact_value(&mut doc);
        assert_eq!(
            doc,
            json!({"msg": "login ******** failed", "list": ["********"], "count": 1})
        );
    }

    #[test]
    fn test_keys_are_not_masked() {
        let mut values = NoLogValues::new();
        values.register("napalm");
        let mut doc = json!({"napalm_facts": {"napalm_vendor": "napalm lab"}});
        values.redact_value(&mut doc);
        assert_eq!(doc, json!({"napalm_facts": {"napalm_vendor": "******** lab"}}));
    }

    #[test]
    fn test_longest_value_masked_first() {
        let mut values = NoLogValues::new();
        values.register("abc");
        values.register("abcdef");
        assert_eq!(values.redact("xabcdefx"), "x********x");
    }
}
