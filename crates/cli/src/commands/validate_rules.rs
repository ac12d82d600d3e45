//! The `validate-rules` command.
//!
//! Loads and compiles a rules file the same way the server does at startup,
//! so a malformed file (bad TOML, unsupported schema version, invalid
//! changed-file pattern) is caught before deployment.

use std::path::PathBuf;

use clap::Args;
use review_warden_core::config::load_rules_file;
use review_warden_core::rules::RuleSet;

use crate::errors::CliError;

#[cfg(test)]
#[path = "validate_rules_tests.rs"]
mod tests;

/// Arguments for the `validate-rules` command.
#[derive(Debug, Args)]
pub struct ValidateRulesArgs {
    /// Path to the TOML rules file
    #[arg(long)]
    pub rules: PathBuf,
}

/// Executes the `validate-rules` command.
pub fn execute(args: ValidateRulesArgs) -> Result<(), CliError> {
    let rules = validate(&args.rules)?;

    println!("Rules file {} is valid.", args.rules.display());
    println!("  approval rules: {}", rules.approve_rule_count());
    println!("  merge rules:    {}", rules.merge_rule_count());

    Ok(())
}

fn validate(path: &PathBuf) -> Result<RuleSet, CliError> {
    let file = load_rules_file(path).map_err(|e| CliError::ConfigError(e.to_string()))?;
    RuleSet::compile(&file).map_err(|e| CliError::ConfigError(e.to_string()))
}
