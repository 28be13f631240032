//! Subcommands module for the rustible-napalm CLI

pub mod doc;
pub mod run;

use crate::cli::output::OutputFormatter;
use crate::cli::Cli;
use rustible_napalm::config::Config;

/// Exit code for a failed module invocation
pub const EXIT_FAILED: i32 = 2;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &Cli, config: Config) -> Self {
        let use_color = !cli.no_color && config.defaults.color;
        Self {
            output: OutputFormatter::new(cli.output, use_color),
            config,
        }
    }
}
