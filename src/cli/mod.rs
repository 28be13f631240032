//! CLI module for rustible-napalm
//!
//! This module provides the command-line interface: argument parsing and
//! subcommand handling.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// rustible-napalm - run napalm network device modules
#[derive(Parser, Debug, Clone)]
#[command(name = "rustible-napalm")]
#[command(author = "Rustible Contributors")]
#[command(version)]
#[command(about = "Run napalm network device modules", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "RUSTIBLE_NAPALM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output for scripting
    Json,
    /// YAML output
    Yaml,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run one module invocation
    Run(commands::run::RunArgs),

    /// List available modules
    List(commands::doc::ListArgs),

    /// Show module documentation
    Doc(commands::doc::DocArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }
}
