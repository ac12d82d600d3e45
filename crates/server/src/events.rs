//! Webhook payload models.
//!
//! Only the fields Review Warden reads are modeled; everything else in the
//! GitHub payload is ignored by serde. The conversion to
//! [`PullRequestContext`] is the boundary between the wire format and the
//! core.

use review_warden_core::PullRequestContext;
use serde::Deserialize;

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;

/// A `pull_request` webhook event.
#[derive(Debug, Deserialize)]
pub struct PullRequestEvent {
    /// The action that triggered the delivery (e.g. `review_requested`)
    pub action: String,

    /// The pull request the event applies to
    pub pull_request: PullRequestInfo,

    /// The repository the pull request belongs to
    pub repository: Repository,
}

impl PullRequestEvent {
    /// Builds the core context for this event.
    pub fn context(&self) -> PullRequestContext {
        context_from(&self.pull_request, &self.repository)
    }
}

/// A `pull_request_review` webhook event.
#[derive(Debug, Deserialize)]
pub struct ReviewEvent {
    /// The action that triggered the delivery (e.g. `dismissed`)
    pub action: String,

    /// The pull request the review belongs to
    pub pull_request: PullRequestInfo,

    /// The repository the pull request belongs to
    pub repository: Repository,
}

impl ReviewEvent {
    /// Builds the core context for this event.
    pub fn context(&self) -> PullRequestContext {
        context_from(&self.pull_request, &self.repository)
    }
}

/// The pull request object embedded in webhook payloads.
#[derive(Debug, Deserialize)]
pub struct PullRequestInfo {
    pub number: u64,
    pub head: CommitRef,
    pub user: Account,
    #[serde(default)]
    pub labels: Vec<LabelRef>,
}

/// A commit reference (only the SHA is needed).
#[derive(Debug, Deserialize)]
pub struct CommitRef {
    pub sha: String,
}

/// A user or organization account.
#[derive(Debug, Deserialize)]
pub struct Account {
    pub login: String,
}

/// A label reference (only the name is needed).
#[derive(Debug, Deserialize)]
pub struct LabelRef {
    pub name: String,
}

/// The repository object embedded in webhook payloads.
#[derive(Debug, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: Account,
}

fn context_from(pull_request: &PullRequestInfo, repository: &Repository) -> PullRequestContext {
    PullRequestContext {
        organization: repository.owner.login.clone(),
        repository: repository.name.clone(),
        number: pull_request.number,
        head_sha: pull_request.head.sha.clone(),
        author: pull_request.user.login.clone(),
        labels: pull_request
            .labels
            .iter()
            .map(|l| l.name.clone())
            .collect(),
    }
}
