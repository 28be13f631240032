//! Output formatting for module results

use super::OutputFormat;
use anyhow::Result;
use colored::Colorize;
use rustible_napalm::modules::{ModuleOutput, ModuleStatus};
use serde::Serialize;
use serde_json::{json, Value};

/// Colored status label
fn status_label(status: ModuleStatus, use_color: bool) -> String {
    let label = status.to_string();
    if !use_color {
        return label;
    }
    match status {
        ModuleStatus::Ok => label.green().to_string(),
        ModuleStatus::Changed => label.yellow().to_string(),
        ModuleStatus::Skipped => label.cyan().to_string(),
        ModuleStatus::Failed => label.red().bold().to_string(),
    }
}

/// Output formatter for different output modes
pub struct OutputFormatter {
    format: OutputFormat,
    use_color: bool,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(format: OutputFormat, use_color: bool) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();
        Self { format, use_color }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Render a module result
    pub fn render_result(&self, module: &str, output: &ModuleOutput) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&result_value(output))?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(&result_value(output))?),
            OutputFormat::Human => Ok(self.render_human(module, output)?),
        }
    }

    fn render_human(&self, module: &str, output: &ModuleOutput) -> Result<String> {
        let mut text = format!(
            "{} | {}",
            module,
            status_label(output.status, self.use_color)
        );
        text.push_str(&format!(" | changed={}", output.changed));
        if !output.msg.is_empty() {
            text.push('\n');
            text.push_str(&output.msg);
        }

        if let Some(diff) = &output.diff {
            text.push_str("\n--- ");
            text.push_str(&diff.before);
            text.push_str("\n+++ ");
            text.push_str(&diff.after);
            if let Some(details) = &diff.details {
                for line in details.lines() {
                    text.push('\n');
                    let colored_line = match line.chars().next() {
                        Some('+') if self.use_color => line.green().to_string(),
                        Some('-') if self.use_color => line.red().to_string(),
                        _ => line.to_string(),
                    };
                    text.push_str(&colored_line);
                }
            }
        }

        if !output.data.is_empty() {
            let mut keys: Vec<&String> = output.data.keys().collect();
            keys.sort();
            let data: serde_json::Map<String, Value> = keys
                .into_iter()
                .map(|k| (k.clone(), output.data[k].clone()))
                .collect();
            text.push('\n');
            text.push_str(&serde_json::to_string_pretty(&data)?);
        }
        Ok(text)
    }

    /// Render any serializable document in the structured formats, or
    /// `human` as given.
    pub fn render_document<T: Serialize>(&self, value: &T, human: impl FnOnce() -> String) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
            OutputFormat::Human => Ok(human()),
        }
    }
}

/// Flatten an output the way task results are reported: status fields and
/// module data side by side.
pub fn result_value(output: &ModuleOutput) -> Value {
    let mut result = serde_json::Map::new();
    result.insert("changed".to_string(), json!(output.changed));
    result.insert("status".to_string(), json!(output.status));
    if output.is_failed() {
        result.insert("failed".to_string(), json!(true));
    }
    if !output.msg.is_empty() {
        result.insert("msg".to_string(), json!(output.msg));
    }
    if let Some(diff) = &output.diff {
        result.insert("diff".to_string(), json!(diff));
    }

    let mut keys: Vec<&String> = output.data.keys().collect();
    keys.sort();
    for key in keys {
        result.insert(key.clone(), output.data[key].clone());
    }
    Value::Object(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_value() {
        let output = ModuleOutput::failed("Device does not comply with policy")
            .with_data("compliance_report", json!({"complies": false}));
        let value = result_value(&output);

        assert_eq!(value["failed"], true);
        assert_eq!(value["status"], "failed");
        assert_eq!(value["compliance_report"]["complies"], false);
    }

    #[test]
    fn test_human_output_without_color() {
        let formatter = OutputFormatter::new(OutputFormat::Human, false);
        let output = ModuleOutput::ok("Gathered facts from 10.0.0.1");

        let text = formatter.render_result("napalm_get_facts", &output).unwrap();
        assert_eq!(
            text,
            "napalm_get_facts | ok | changed=false\nGathered facts from 10.0.0.1"
        );
    }

    #[test]
    fn test_json_output() {
        let formatter = OutputFormatter::new(OutputFormat::Json, false);
        let output = ModuleOutput::ok("").with_data("results", json!({"show version": "1.0"}));

        let text = formatter.render_result("napalm_cli", &output).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["results"]["show version"], "1.0");
        assert!(parsed.get("msg").is_none());
    }
}
