//! Shared state for the webhook server.

use std::sync::Arc;

use review_warden_core::ReviewWarden;
use review_warden_developer_platforms::github::GitHubProvider;

/// State shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    warden: Arc<ReviewWarden<GitHubProvider>>,
    webhook_secret: Arc<Vec<u8>>,
}

impl AppState {
    pub fn new(warden: ReviewWarden<GitHubProvider>, webhook_secret: Vec<u8>) -> Self {
        Self {
            warden: Arc::new(warden),
            webhook_secret: Arc::new(webhook_secret),
        }
    }

    /// A handle to the orchestrator, cloneable into spawned attempt tasks.
    pub fn warden(&self) -> Arc<ReviewWarden<GitHubProvider>> {
        Arc::clone(&self.warden)
    }

    pub fn webhook_secret(&self) -> &[u8] {
        &self.webhook_secret
    }
}
