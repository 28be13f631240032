//! rustible-napalm - run napalm network device modules
//!
//! This is the main entry point for the rustible-napalm CLI.

mod cli;

use anyhow::Result;
use cli::commands::CommandContext;
use cli::{Cli, Commands};
use rustible_napalm::config::Config;
use rustible_napalm::telemetry;

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config = Config::load(cli.config.as_deref())?;

    // Initialize logging based on config and verbosity
    telemetry::init_logging(&config.logging, cli.verbosity(), !cli.no_color)?;
    tracing::debug!(version = VERSION, "Starting rustible-napalm");

    // Create command context
    let mut ctx = CommandContext::new(&cli, config);

    // Execute the appropriate command
    let exit_code = match &cli.command {
        Commands::Run(args) => args.execute(&mut ctx)?,
        Commands::List(args) => args.execute(&mut ctx)?,
        Commands::Doc(args) => args.execute(&mut ctx)?,
    };

    std::process::exit(exit_code);
}
