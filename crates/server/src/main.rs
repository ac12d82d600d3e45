//! # Review Warden Server
//!
//! Webhook server binary for Review Warden.
//!
//! The server accepts GitHub webhook deliveries, verifies their signatures,
//! and runs one automation attempt per qualifying event: rule evaluation,
//! CI status polling, and finally an approval or auto-merge action. The rules
//! file is re-read in the background whenever it changes on disk.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use review_warden_core::config::load_rules_file;
use review_warden_core::poller::{PollerConfig, StatusPoller};
use review_warden_core::registry::AttemptRegistry;
use review_warden_core::rules::{RuleSet, SharedRuleSet};
use review_warden_core::ReviewWarden;
use review_warden_developer_platforms::github::{
    create_app_client, create_token_client, GitHubProvider,
};

/// Webhook payload models.
mod events;

/// Rules-file hot reload.
mod reload;

/// Webhook signature verification.
mod signature;

/// Shared request-handler state.
mod state;

/// Webhook endpoint handler.
mod webhook;

use state::AppState;
use webhook::{health_handler, webhook_handler};

/// Command line options for the webhook server.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct ServerOptions {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    address: String,

    /// Port to listen on
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Path to the TOML rules file
    #[arg(long)]
    rules_path: PathBuf,

    /// Path to the file containing the webhook secret
    #[arg(long)]
    webhook_secret_path: PathBuf,

    /// GitHub personal access token (tokens take precedence over app credentials)
    #[arg(long, env = "GITHUB_TOKEN")]
    github_token: Option<String>,

    /// GitHub App id
    #[arg(long, env = "GITHUB_APP_ID")]
    app_id: Option<u64>,

    /// Path to the GitHub App private key (PEM)
    #[arg(long)]
    private_key_path: Option<PathBuf>,

    /// Seconds to wait before the first status query, letting CI register its
    /// status contexts
    #[arg(long, default_value_t = 30)]
    registration_delay_secs: u64,

    /// Overall budget in seconds for waiting on statuses
    #[arg(long, default_value_t = 3600)]
    statuses_timeout_secs: u64,

    /// Status contexts whose pending state never blocks an attempt
    #[arg(long = "exempt-context")]
    exempt_contexts: Vec<String>,

    /// Name of the merge-queue status context, used by merge rules that set
    /// `mergeQueue = true`
    #[arg(long)]
    merge_queue_context: Option<String>,

    /// Seconds between checks of the rules file for changes
    #[arg(long, default_value_t = 60)]
    rules_reload_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_env("REVIEW_WARDEN_LOG"))
        .init();

    let options = ServerOptions::parse();

    let rules_file = load_rules_file(&options.rules_path)
        .with_context(|| format!("failed to load rules from {}", options.rules_path.display()))?;
    let compiled = RuleSet::compile(&rules_file).context("failed to compile rules")?;
    info!(
        approve_rules = compiled.approve_rule_count(),
        merge_rules = compiled.merge_rule_count(),
        "Rules loaded"
    );
    let rules = SharedRuleSet::new(compiled);

    let webhook_secret = std::fs::read_to_string(&options.webhook_secret_path)
        .with_context(|| {
            format!(
                "failed to read webhook secret from {}",
                options.webhook_secret_path.display()
            )
        })?
        .trim()
        .as_bytes()
        .to_vec();

    let client = build_client(&options)?;
    let provider = GitHubProvider::new(client);

    let poller = StatusPoller::new(PollerConfig {
        registration_delay: Duration::from_secs(options.registration_delay_secs),
        timeout: Duration::from_secs(options.statuses_timeout_secs),
        exempt_contexts: options.exempt_contexts.clone(),
        ..PollerConfig::default()
    });

    let registry = Arc::new(AttemptRegistry::new());
    let mut warden = ReviewWarden::new(provider, rules.clone(), registry, poller);
    if let Some(context) = &options.merge_queue_context {
        warden = warden.with_merge_queue_context(context.clone());
    }

    tokio::spawn(reload::watch_rules(
        options.rules_path.clone(),
        rules,
        Duration::from_secs(options.rules_reload_secs),
    ));

    let app = Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/healthz", get(health_handler))
        .with_state(AppState::new(warden, webhook_secret));

    let bind_address = format!("{}:{}", options.address, options.port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {}", bind_address))?;
    info!(address = %bind_address, "Review Warden server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

/// Builds the GitHub client from the configured credentials.
fn build_client(options: &ServerOptions) -> Result<octocrab::Octocrab> {
    if let Some(token) = &options.github_token {
        return create_token_client(token).context("failed to create token client");
    }

    match (&options.app_id, &options.private_key_path) {
        (Some(app_id), Some(private_key_path)) => {
            let private_key = std::fs::read_to_string(private_key_path).with_context(|| {
                format!(
                    "failed to read private key from {}",
                    private_key_path.display()
                )
            })?;
            create_app_client(*app_id, &private_key).context("failed to create app client")
        }
        _ => bail!(
            "no GitHub credentials configured; provide --github-token or --app-id with --private-key-path"
        ),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = e.to_string(), "Failed to listen for shutdown signal");
    } else {
        info!("Shutdown signal received");
    }
}
