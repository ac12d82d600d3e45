//! The `check-pr` command.
//!
//! Dry-runs the rule engine against a live pull request: fetches the PR's
//! author, labels and changed files, and reports which condition (if any)
//! would gate automation. The command never waits for CI and never performs
//! an action.

use std::path::PathBuf;

use clap::Args;
use review_warden_core::config::load_rules_file;
use review_warden_core::rules::{evaluate_approve, evaluate_merge, RuleSet};
use review_warden_developer_platforms::github::{create_token_client, GitHubProvider};
use review_warden_developer_platforms::PullRequestProvider;

use crate::errors::CliError;

/// Arguments for the `check-pr` command.
#[derive(Debug, Args)]
pub struct CheckPrArgs {
    /// Path to the TOML rules file
    #[arg(long)]
    pub rules: PathBuf,

    /// The organization the repository belongs to
    #[arg(long)]
    pub org: String,

    /// The repository name
    #[arg(long)]
    pub repo: String,

    /// The pull request number
    #[arg(long)]
    pub pr: u64,

    /// GitHub personal access token
    #[arg(long, env = "GITHUB_TOKEN")]
    pub token: String,
}

/// Executes the `check-pr` command.
pub async fn execute(args: CheckPrArgs) -> Result<(), CliError> {
    let file = load_rules_file(&args.rules).map_err(|e| CliError::ConfigError(e.to_string()))?;
    let rules = RuleSet::compile(&file).map_err(|e| CliError::ConfigError(e.to_string()))?;

    let client =
        create_token_client(&args.token).map_err(|e| CliError::NetworkError(e.to_string()))?;

    let pull_request = client
        .pulls(&args.org, &args.repo)
        .get(args.pr)
        .await
        .map_err(|e| CliError::NetworkError(e.to_string()))?;
    let author = pull_request
        .user
        .map(|u| u.login)
        .ok_or_else(|| CliError::NetworkError("pull request has no author".to_string()))?;

    let provider = GitHubProvider::new(client);
    let labels: Vec<String> = provider
        .list_labels(&args.org, &args.repo, args.pr)
        .await
        .map_err(|e| CliError::NetworkError(e.to_string()))?
        .into_iter()
        .map(|l| l.name)
        .collect();
    let changes = provider
        .get_pull_request_files(&args.org, &args.repo, args.pr)
        .await
        .map_err(|e| CliError::NetworkError(e.to_string()))?;

    println!(
        "{}/{}#{} by {} ({} labels, {} changed files)",
        args.org,
        args.repo,
        args.pr,
        author,
        labels.len(),
        changes.len()
    );

    match rules.approve_conditions(&args.org, &args.repo, &author) {
        None => println!("No approval rules configured for author {}.", author),
        Some(conditions) => match evaluate_approve(conditions, &labels, &changes) {
            Some(index) => println!("Approval condition {} matches.", index),
            None => println!("No approval condition matches."),
        },
    }

    match rules.merge_conditions(&args.org, &args.repo) {
        None => println!("No merge rules configured for this repository."),
        Some(conditions) => match evaluate_merge(conditions, &labels) {
            Some(index) => println!(
                "Merge condition {} matches (method: {}).",
                index, conditions[index].merge_method
            ),
            None => println!("Every merge condition excludes this pull request."),
        },
    }

    Ok(())
}
