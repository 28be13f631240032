//! Machine-readable module documentation
//!
//! Every napalm module describes its options (type, required flag, default,
//! choices, aliases), a set of usage examples and its return values. The
//! same description drives argument checking before a module runs, so the
//! documentation cannot drift away from what the module accepts.

use crate::driver::{DevOs, DEFAULT_TIMEOUT};
use crate::modules::{ModuleError, ModuleParams, ModuleResult};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Type of a module option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Str,
    Bool,
    Int,
    Dict,
    List,
    Path,
}

impl OptionType {
    fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (OptionType::Str | OptionType::Path, v) => !v.is_array() && !v.is_object(),
            (OptionType::Bool, Value::Bool(_)) => true,
            (OptionType::Bool, Value::String(s)) => matches!(
                s.to_lowercase().as_str(),
                "true" | "yes" | "1" | "on" | "false" | "no" | "0" | "off"
            ),
            (OptionType::Int, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (OptionType::Int, Value::String(s)) => s.parse::<i64>().is_ok(),
            (OptionType::Dict, Value::Object(_)) => true,
            (OptionType::List, Value::Array(_) | Value::String(_)) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionType::Str => "str",
            OptionType::Bool => "bool",
            OptionType::Int => "int",
            OptionType::Dict => "dict",
            OptionType::List => "list",
            OptionType::Path => "path",
        }
    }
}

/// One documented option
#[derive(Debug, Clone, Serialize)]
pub struct OptionDoc {
    pub description: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub kind: OptionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub no_log: bool,
}

impl OptionDoc {
    pub fn new(kind: OptionType, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            required: false,
            kind,
            default: None,
            choices: Vec::new(),
            aliases: Vec::new(),
            no_log: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn no_log(mut self) -> Self {
        self.no_log = true;
        self
    }
}

/// One documented return value
#[derive(Debug, Clone, Serialize)]
pub struct ReturnDoc {
    pub description: String,
    pub returned: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<Value>,
}

impl ReturnDoc {
    pub fn new(kind: &str, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            returned: "always".to_string(),
            kind: kind.to_string(),
            sample: None,
        }
    }

    pub fn returned(mut self, returned: impl Into<String>) -> Self {
        self.returned = returned.into();
        self
    }

    pub fn sample(mut self, sample: Value) -> Self {
        self.sample = Some(sample);
        self
    }
}

/// Full documentation of a module
#[derive(Debug, Clone, Serialize)]
pub struct ModuleDoc {
    pub module: String,
    pub short_description: String,
    pub description: Vec<String>,
    pub options: IndexMap<String, OptionDoc>,
    /// Example tasks as YAML text
    pub examples: String,
    #[serde(rename = "return")]
    pub returns: IndexMap<String, ReturnDoc>,
}

impl ModuleDoc {
    pub fn new(module: &str, short_description: &str) -> Self {
        Self {
            module: module.to_string(),
            short_description: short_description.to_string(),
            description: Vec::new(),
            options: IndexMap::new(),
            examples: String::new(),
            returns: IndexMap::new(),
        }
    }

    pub fn description(mut self, line: &str) -> Self {
        self.description.push(line.to_string());
        self
    }

    pub fn options(mut self, options: IndexMap<String, OptionDoc>) -> Self {
        self.options.extend(options);
        self
    }

    pub fn option(mut self, name: &str, option: OptionDoc) -> Self {
        self.options.insert(name.to_string(), option);
        self
    }

    pub fn examples(mut self, examples: &str) -> Self {
        self.examples = examples.trim_start_matches('\n').to_string();
        self
    }

    pub fn returns(mut self, name: &str, doc: ReturnDoc) -> Self {
        self.returns.insert(name.to_string(), doc);
        self
    }

    /// Parse the examples into a list of tasks.
    pub fn parsed_examples(&self) -> Result<Vec<Value>, serde_yaml::Error> {
        serde_yaml::from_str(&self.examples)
    }

    /// Names accepted for an invocation, aliases included
    fn accepted_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .options
            .iter()
            .flat_map(|(name, opt)| {
                std::iter::once(name.as_str()).chain(opt.aliases.iter().map(String::as_str))
            })
            .collect();
        names.sort_unstable();
        names
    }

    /// Check an invocation against the documented options.
    ///
    /// Rejects unknown parameters, values of the wrong type and values
    /// outside an option's choices.
    pub fn check_params(&self, params: &ModuleParams) -> ModuleResult<()> {
        let accepted = self.accepted_names();

        let mut unknown: Vec<&str> = params
            .keys()
            .map(String::as_str)
            .filter(|k| !accepted.contains(k))
            .collect();
        if !unknown.is_empty() {
            unknown.sort_unstable();
            return Err(ModuleError::InvalidParameter(format!(
                "Unsupported parameters for ({}) module: {}. Supported parameters include: {}",
                self.module,
                unknown.join(", "),
                accepted.join(", ")
            )));
        }

        for (name, option) in &self.options {
            let value = std::iter::once(name)
                .chain(option.aliases.iter())
                .find_map(|key| params.get(key));
            let Some(value) = value else {
                continue;
            };

            if !option.kind.accepts(value) {
                return Err(ModuleError::InvalidParameter(format!(
                    "argument {} is of type {} and we were unable to convert to {}",
                    name,
                    json_type_name(value),
                    option.kind.as_str()
                )));
            }

            if !option.choices.is_empty() && !value.is_null() && !option.choices.contains(value) {
                let choices: Vec<String> = option.choices.iter().map(display_value).collect();
                return Err(ModuleError::InvalidParameter(format!(
                    "value of {} must be one of: {}, got: {}",
                    name,
                    choices.join(", "),
                    display_value(value)
                )));
            }
        }

        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Options shared by every napalm module.
///
/// `os_choices` is the device OS allow-list of the module, or `None` when the
/// module does not restrict it at argument level.
pub fn connection_options(os_choices: Option<&[DevOs]>) -> IndexMap<String, OptionDoc> {
    let mut dev_os = OptionDoc::new(OptionType::Str, "OS of the device");
    if let Some(choices) = os_choices {
        dev_os = dev_os.choices(choices.iter().map(|os| os.as_str()));
    }

    let options = [
        (
            "hostname",
            OptionDoc::new(OptionType::Str, "IP or FQDN of the device you want to connect to")
                .alias("host"),
        ),
        ("username", OptionDoc::new(OptionType::Str, "Username")),
        ("password", OptionDoc::new(OptionType::Str, "Password").no_log()),
        ("dev_os", dev_os),
        (
            "provider",
            OptionDoc::new(
                OptionType::Dict,
                "Dictionary which acts as a collection of arguments used to define the \
                 characteristics of how to connect to the device. hostname, username, password \
                 and dev_os must be defined in either provider or local param. Local params \
                 take precedence, e.g. hostname is preferred to provider['hostname']",
            ),
        ),
        (
            "timeout",
            OptionDoc::new(OptionType::Int, "Time in seconds to wait for the device to respond")
                .default(Value::from(DEFAULT_TIMEOUT)),
        ),
        (
            "optional_args",
            OptionDoc::new(
                OptionType::Dict,
                "Dictionary of additional arguments passed to underlying driver",
            ),
        ),
    ];

    options
        .into_iter()
        .map(|(name, doc)| (name.to_string(), doc))
        .collect()
}

/// Documentation of a napalm module by name
pub fn module_doc(name: &str) -> Option<ModuleDoc> {
    match name {
        "napalm_get_facts" => Some(super::get_facts::documentation()),
        "napalm_get_config" => Some(super::get_config::documentation()),
        "napalm_install_config" => Some(super::install_config::documentation()),
        "napalm_cli" => Some(super::cli::documentation()),
        "napalm_ping" => Some(super::ping::documentation()),
        "napalm_validate" => Some(super::validate::documentation()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::napalm::common::CONNECTION_PARAMS;
    use serde_json::json;

    fn doc() -> ModuleDoc {
        ModuleDoc::new("napalm_test", "Test module")
            .options(connection_options(Some(&[DevOs::Eos, DevOs::Ios])))
            .option(
                "type",
                OptionDoc::new(OptionType::Str, "Config type")
                    .choices(["running", "startup"])
                    .default(json!("running")),
            )
    }

    fn params(value: Value) -> ModuleParams {
        match value {
            Value::Object(map) => map.into_iter().collect(),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_connection_options_order() {
        let names: Vec<String> = connection_options(None).keys().cloned().collect();
        assert_eq!(names, CONNECTION_PARAMS);
    }

    #[test]
    fn test_check_params_accepts_alias() {
        let doc = doc();
        assert!(doc
            .check_params(&params(json!({"host": "r1", "type": "startup", "timeout": "30"})))
            .is_ok());
    }

    #[test]
    fn test_check_params_unknown() {
        let err = doc().check_params(&params(json!({"foo": 1}))).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Unsupported parameters for (napalm_test) module: foo."));
    }

    #[test]
    fn test_check_params_choices_and_types() {
        let doc = doc();
        let err = doc
            .check_params(&params(json!({"type": "candidate"})))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "value of type must be one of: running, startup, got: candidate"
        );

        let err = doc
            .check_params(&params(json!({"dev_os": "junos"})))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "value of dev_os must be one of: eos, ios, got: junos"
        );

        let err = doc
            .check_params(&params(json!({"provider": "ios_provider"})))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument provider is of type str and we were unable to convert to dict"
        );
    }

    #[test]
    fn test_render_yaml_and_json() {
        let doc = doc().returns("changed", ReturnDoc::new("bool", "Always false"));
        let yaml = doc.to_yaml().unwrap();
        assert!(yaml.contains("module: napalm_test"));
        assert!(yaml.contains("no_log: true"));

        let json: Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(json["options"]["type"]["choices"], json!(["running", "startup"]));
        assert_eq!(json["return"]["changed"]["returned"], "always");
    }
}
