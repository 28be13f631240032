//! List and doc commands - module discovery

use super::CommandContext;
use crate::cli::OutputFormat;
use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use rustible_napalm::error::Error;
use rustible_napalm::modules::napalm::module_doc;
use rustible_napalm::modules::ModuleRegistry;
use serde_json::json;

/// Arguments for the list command
#[derive(Parser, Debug, Clone)]
pub struct ListArgs {}

impl ListArgs {
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let registry = ModuleRegistry::with_builtins();
        let modules: Vec<_> = registry
            .names()
            .into_iter()
            .filter_map(|name| registry.get(name))
            .map(|m| json!({"name": m.name(), "description": m.description()}))
            .collect();

        let text = ctx.output.render_document(&modules, || {
            modules
                .iter()
                .map(|m| {
                    format!(
                        "{:<24} {}",
                        m["name"].as_str().unwrap_or_default(),
                        m["description"].as_str().unwrap_or_default()
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        })?;
        println!("{}", text);
        Ok(0)
    }
}

/// Documentation format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DocFormat {
    #[default]
    Yaml,
    Json,
}

/// Arguments for the doc command
#[derive(Parser, Debug, Clone)]
pub struct DocArgs {
    /// Module to document
    pub module: String,

    /// Documentation format
    #[arg(long, default_value = "yaml")]
    pub format: DocFormat,
}

impl DocArgs {
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let Some(doc) = module_doc(&self.module) else {
            bail!(Error::ModuleNotFound(self.module.clone()));
        };

        // A global --output json also selects JSON documentation
        let format = if ctx.output.format() == OutputFormat::Json {
            DocFormat::Json
        } else {
            self.format
        };
        let text = match format {
            DocFormat::Yaml => doc.to_yaml()?,
            DocFormat::Json => doc.to_json()?,
        };
        println!("{}", text.trim_end());
        Ok(0)
    }
}
