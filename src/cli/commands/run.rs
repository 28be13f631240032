//! Run command - execute one module invocation

use super::{CommandContext, EXIT_FAILED};
use anyhow::{bail, Context, Result};
use clap::Parser;
use rustible_napalm::error::Error;
use rustible_napalm::modules::{ModuleContext, ModuleParams, ModuleRegistry};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Arguments for the run command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Module to run, e.g. napalm_get_facts
    pub module: String,

    /// Module argument as key=value; values are parsed as YAML and dotted
    /// keys nest (provider.hostname=r1)
    #[arg(short = 'a', long = "arg", action = clap::ArgAction::Append)]
    pub args: Vec<String>,

    /// YAML or JSON file holding module arguments
    #[arg(long)]
    pub args_file: Option<PathBuf>,

    /// Run in check mode (dry-run, don't make changes)
    #[arg(long = "check")]
    pub check: bool,

    /// Attach diffs to the result
    #[arg(long = "diff")]
    pub diff: bool,
}

impl RunArgs {
    /// Execute the run command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let registry = ModuleRegistry::with_builtins();
        if !registry.contains(&self.module) {
            bail!(Error::ModuleNotFound(self.module.clone()));
        }

        let params = self.collect_params()?;
        debug!(module = %self.module, params = params.len(), "Collected module arguments");

        let context = ModuleContext::new()
            .with_check_mode(self.check)
            .with_diff_mode(self.diff)
            .with_connection(ctx.config.connection_context())
            .with_drivers(Arc::new(ctx.config.driver_registry()));

        let output = registry.run(&self.module, &params, &context);
        info!(module = %self.module, status = %output.status, "Module finished");

        println!("{}", ctx.output.render_result(&self.module, &output)?);
        Ok(if output.is_failed() { EXIT_FAILED } else { 0 })
    }

    /// Merge the arguments file and the `-a` pairs, pairs winning.
    fn collect_params(&self) -> Result<ModuleParams> {
        let mut params = Map::new();
        if let Some(path) = &self.args_file {
            params = load_args_file(path)?;
        }
        for pair in &self.args {
            let (key, value) = parse_pair(pair)?;
            insert_dotted(&mut params, &key, value);
        }
        Ok(params.into_iter().collect())
    }
}

/// Load module arguments from a YAML or JSON mapping.
pub fn load_args_file(path: &Path) -> Result<Map<String, Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read arguments file: {}", path.display()))?;
    let value: Value =
        serde_yaml::from_str(&content).map_err(|e| Error::parse(path, e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(Error::parse(path, "expected a mapping of module arguments").into()),
    }
}

/// Split `key=value`, parsing the value as a YAML scalar or flow collection.
pub fn parse_pair(pair: &str) -> Result<(String, Value)> {
    let Some((key, raw)) = pair.split_once('=') else {
        bail!(Error::InvalidArgument(pair.to_string()));
    };
    let key = key.trim();
    if key.is_empty() {
        bail!(Error::InvalidArgument(pair.to_string()));
    }

    let value = if raw.is_empty() {
        Value::String(String::new())
    } else {
        serde_yaml::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    };
    Ok((key.to_string(), value))
}

fn insert_dotted(params: &mut Map<String, Value>, key: &str, value: Value) {
    match key.split_once('.') {
        None => {
            params.insert(key.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = params
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(inner) = entry {
                insert_dotted(inner, rest, value);
            }
        }
    }
}
