//! # Review Warden CLI
//!
//! Command-line interface for working with Review Warden rules.
//!
//! This binary lets operators validate a rules file before deploying it and
//! dry-run the rule engine against a live pull request, without polling CI or
//! performing any action.
//!
//! # Commands
//!
//! - `validate-rules` - Load and compile a rules file, reporting its inventory
//! - `check-pr` - Evaluate the configured rules against one pull request
//!
//! # Examples
//!
//! ```bash
//! # Validate a rules file
//! review-warden validate-rules --rules rules.toml
//!
//! # Check a pull request against the rules
//! review-warden check-pr --rules rules.toml --org acme --repo infrastructure --pr 9046
//! ```

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Command implementations for the CLI.
mod commands;

/// Error types specific to the CLI.
mod errors;

use commands::{check_pr::CheckPrArgs, validate_rules::ValidateRulesArgs};
use errors::CliError;

/// Command-line interface structure for Review Warden.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available commands for the Review Warden CLI.
#[derive(Subcommand)]
enum Commands {
    /// Load and compile a rules file, reporting its inventory
    #[command(name = "validate-rules")]
    ValidateRules(ValidateRulesArgs),

    /// Evaluate the configured rules against one pull request
    #[command(name = "check-pr")]
    CheckPr(CheckPrArgs),
}

/// Main entry point for the Review Warden CLI.
///
/// Initializes logging, parses command-line arguments, and dispatches to the
/// appropriate command handler.
#[tokio::main]
async fn main() -> Result<(), CliError> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().pretty())
        .with(EnvFilter::from_env("REVIEW_WARDEN_LOG"))
        .init();

    // Parse command line arguments
    let cli = Cli::parse();

    match cli.command {
        Commands::ValidateRules(args) => commands::validate_rules::execute(args),
        Commands::CheckPr(args) => commands::check_pr::execute(args).await,
    }
}
