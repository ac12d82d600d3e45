//! # Review Warden Core
//!
//! Core automation logic for reviewing and merging pull requests according to
//! configurable rules.
//!
//! Review Warden reacts to pull request webhook events and, when an
//! explicitly configured rule matches, waits for CI to finish and then
//! performs a terminal action:
//! - approve the pull request (and label it `auto-approved`), or
//! - enable auto-merge.
//!
//! The crate guarantees that at most one automation attempt is live per head
//! commit of a pull request, and that a new commit supersedes attempts still
//! running for older commits of the same pull request.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use review_warden_core::{ReviewWarden, PullRequestContext};
//! use review_warden_core::config::load_rules_file;
//! use review_warden_core::poller::{PollerConfig, StatusPoller};
//! use review_warden_core::registry::AttemptRegistry;
//! use review_warden_core::rules::{RuleSet, SharedRuleSet};
//! use review_warden_developer_platforms::PullRequestProvider;
//! use anyhow::Result;
//!
//! async fn handle_event<P: PullRequestProvider + std::fmt::Debug>(provider: P) -> Result<()> {
//!     let rules_file = load_rules_file("rules.toml")?;
//!     let rules = SharedRuleSet::new(RuleSet::compile(&rules_file)?);
//!     let registry = Arc::new(AttemptRegistry::new());
//!     let poller = StatusPoller::new(PollerConfig::default());
//!
//!     let warden = ReviewWarden::new(provider, rules, registry, poller);
//!
//!     let context = PullRequestContext {
//!         organization: "acme".to_string(),
//!         repository: "infrastructure".to_string(),
//!         number: 9046,
//!         head_sha: "6dcb09b5b57875f334f61aebed695e2e4193db5e".to_string(),
//!         author: "acme-bot".to_string(),
//!         labels: vec!["team-review-done".to_string()],
//!     };
//!
//!     let outcome = warden.handle_review_requested(context).await?;
//!     println!("Attempt finished: {:?}", outcome);
//!
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use review_warden_developer_platforms::PullRequestProvider;
use tracing::{debug, info, instrument, warn};

pub mod config;
use config::AUTO_APPROVED_LABEL;

pub mod errors;
use errors::WardenError;

pub mod poller;
use poller::{PollError, StatusPoller};

pub mod registry;
use registry::{AttemptGuard, AttemptKey, AttemptRegistry};

pub mod rules;
use rules::{evaluate_approve, evaluate_merge, SharedRuleSet};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Snapshot of the pull request state carried by a webhook event.
///
/// This is everything the orchestrator needs from the webhook payload; the
/// changed files and commit statuses are fetched from the provider on demand.
#[derive(Debug, Clone)]
pub struct PullRequestContext {
    /// The organization the repository belongs to
    pub organization: String,

    /// The repository name
    pub repository: String,

    /// The pull request number
    pub number: u64,

    /// The head commit SHA at the time of the event
    pub head_sha: String,

    /// The PR author's login
    pub author: String,

    /// The labels currently on the pull request
    pub labels: Vec<String>,
}

impl fmt::Display for PullRequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}#{}",
            self.organization, self.repository, self.number
        )
    }
}

/// How one automation attempt finished.
///
/// Every variant other than the two action variants is an expected terminal
/// state, not a failure; provider errors are reported separately through
/// [`WardenError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The pull request was approved (and labeled)
    Approved,

    /// Auto-merge was enabled for the pull request
    AutoMergeEnabled,

    /// An attempt for the same head commit is already live
    DuplicateAttempt,

    /// No rules are configured for this pull request
    NoRulesConfigured,

    /// Rules are configured but none matched
    NoConditionMatched,

    /// A newer commit superseded this attempt; nothing was done
    Superseded,

    /// CI did not resolve to success; nothing was done
    ChecksNotGreen {
        /// Diagnostic naming the failing check or the timeout
        reason: String,
    },
}

/// Main struct orchestrating automation attempts.
///
/// `ReviewWarden` wires the rule engine, the status poller and the attempt
/// registry into one attempt lifecycle, independent of which webhook action
/// triggered it. One public operation exists per triggering action kind; the
/// webhook layer calls them from one spawned task per qualifying event.
#[derive(Debug)]
pub struct ReviewWarden<P: PullRequestProvider + std::fmt::Debug> {
    provider: P,
    rules: SharedRuleSet,
    registry: Arc<AttemptRegistry>,
    poller: StatusPoller,
    merge_queue_context: Option<String>,
}

impl<P: PullRequestProvider + std::fmt::Debug> ReviewWarden<P> {
    /// Creates a new `ReviewWarden`.
    ///
    /// The registry is passed in rather than constructed here so one registry
    /// can be shared by every handler invocation in the process, and so tests
    /// can observe it from the outside.
    pub fn new(
        provider: P,
        rules: SharedRuleSet,
        registry: Arc<AttemptRegistry>,
        poller: StatusPoller,
    ) -> Self {
        Self {
            provider,
            rules,
            registry,
            poller,
            merge_queue_context: None,
        }
    }

    /// Sets the name of the merge-queue status context.
    ///
    /// Merge conditions with `merge_queue = true` exempt this context from the
    /// pending-check scan; without a configured name the flag has no effect.
    pub fn with_merge_queue_context(mut self, context: impl Into<String>) -> Self {
        self.merge_queue_context = Some(context.into());
        self
    }

    /// Handles a `review_requested` pull request action.
    #[instrument(skip(self))]
    pub async fn handle_review_requested(
        &self,
        context: PullRequestContext,
    ) -> Result<AttemptOutcome, WardenError> {
        self.run_approve_attempt(context).await
    }

    /// Handles a `synchronize` pull request action (a new commit was pushed).
    ///
    /// Attempts still running for older commits of this pull request are
    /// cancelled before the new attempt starts.
    #[instrument(skip(self))]
    pub async fn handle_synchronize(
        &self,
        context: PullRequestContext,
    ) -> Result<AttemptOutcome, WardenError> {
        self.registry.cancel_others(
            &context.organization,
            &context.repository,
            context.number,
            &context.head_sha,
        );
        self.run_approve_attempt(context).await
    }

    /// Handles a `dismissed` pull request review action.
    #[instrument(skip(self))]
    pub async fn handle_review_dismissed(
        &self,
        context: PullRequestContext,
    ) -> Result<AttemptOutcome, WardenError> {
        self.run_approve_attempt(context).await
    }

    /// Handles an `opened` pull request action (auto-merge path).
    #[instrument(skip(self))]
    pub async fn handle_pr_opened(
        &self,
        context: PullRequestContext,
    ) -> Result<AttemptOutcome, WardenError> {
        self.run_merge_attempt(context).await
    }

    /// Handles a `labeled` pull request action (auto-merge path).
    #[instrument(skip(self))]
    pub async fn handle_pr_labeled(
        &self,
        context: PullRequestContext,
    ) -> Result<AttemptOutcome, WardenError> {
        self.run_merge_attempt(context).await
    }

    /// Handles an `unlabeled` pull request action (auto-merge path).
    #[instrument(skip(self))]
    pub async fn handle_pr_unlabeled(
        &self,
        context: PullRequestContext,
    ) -> Result<AttemptOutcome, WardenError> {
        self.run_merge_attempt(context).await
    }

    /// Runs one approval attempt: acquire, evaluate, poll, approve.
    async fn run_approve_attempt(
        &self,
        context: PullRequestContext,
    ) -> Result<AttemptOutcome, WardenError> {
        let key = AttemptKey::new(
            &context.organization,
            &context.repository,
            context.number,
            &context.head_sha,
        );
        let Some(guard) = self.registry.try_acquire(key) else {
            info!(
                pull_request = %context,
                commit = context.head_sha,
                "Attempt for this head commit already in process"
            );
            return Ok(AttemptOutcome::DuplicateAttempt);
        };

        let rules = self.rules.snapshot();
        let Some(conditions) = rules.approve_conditions(
            &context.organization,
            &context.repository,
            &context.author,
        ) else {
            info!(
                pull_request = %context,
                author = context.author,
                "No approval conditions defined for PR author"
            );
            return Ok(AttemptOutcome::NoRulesConfigured);
        };

        let changes = self
            .provider
            .get_pull_request_files(&context.organization, &context.repository, context.number)
            .await?;

        let Some(index) = evaluate_approve(conditions, &context.labels, &changes) else {
            debug!(pull_request = %context, "No approval condition matched");
            return Ok(AttemptOutcome::NoConditionMatched);
        };
        debug!(
            pull_request = %context,
            condition = index,
            "Approval condition matched, waiting for statuses"
        );

        if let Err(outcome) = self.wait_for_statuses(&context, &guard, &[]).await {
            return Ok(outcome);
        }

        // Last race window between poll success and the terminal action: the
        // commit may have been superseded while the final query was in flight.
        if guard.token().is_cancelled() {
            info!(pull_request = %context, "Attempt superseded, skip approving");
            return Ok(AttemptOutcome::Superseded);
        }

        self.provider
            .approve_pull_request(
                &context.organization,
                &context.repository,
                context.number,
                &context.head_sha,
            )
            .await?;
        info!(pull_request = %context, commit = context.head_sha, "Pull request approved");

        if let Err(e) = self
            .provider
            .add_label(
                &context.organization,
                &context.repository,
                context.number,
                AUTO_APPROVED_LABEL,
            )
            .await
        {
            warn!(
                pull_request = %context,
                error = e.to_string(),
                "Failed to add label after approval"
            );
        } else {
            info!(
                pull_request = %context,
                label = AUTO_APPROVED_LABEL,
                "Label added to pull request"
            );
        }

        Ok(AttemptOutcome::Approved)
    }

    /// Runs one auto-merge attempt: acquire, evaluate, poll, enable auto-merge.
    async fn run_merge_attempt(
        &self,
        context: PullRequestContext,
    ) -> Result<AttemptOutcome, WardenError> {
        let key = AttemptKey::new(
            &context.organization,
            &context.repository,
            context.number,
            &context.head_sha,
        );
        let Some(guard) = self.registry.try_acquire(key) else {
            info!(
                pull_request = %context,
                commit = context.head_sha,
                "Attempt for this head commit already in process"
            );
            return Ok(AttemptOutcome::DuplicateAttempt);
        };

        let rules = self.rules.snapshot();
        let Some(conditions) =
            rules.merge_conditions(&context.organization, &context.repository)
        else {
            info!(pull_request = %context, "No merge conditions defined for repository");
            return Ok(AttemptOutcome::NoRulesConfigured);
        };

        let Some(index) = evaluate_merge(conditions, &context.labels) else {
            debug!(pull_request = %context, "Pull request excluded from auto merge");
            return Ok(AttemptOutcome::NoConditionMatched);
        };
        let condition = &conditions[index];

        let exempt: Vec<String> = if condition.merge_queue {
            self.merge_queue_context.iter().cloned().collect()
        } else {
            Vec::new()
        };
        if let Err(outcome) = self.wait_for_statuses(&context, &guard, &exempt).await {
            return Ok(outcome);
        }

        if guard.token().is_cancelled() {
            info!(pull_request = %context, "Attempt superseded, skip enabling auto merge");
            return Ok(AttemptOutcome::Superseded);
        }

        self.provider
            .enable_auto_merge(
                &context.organization,
                &context.repository,
                context.number,
                condition.merge_method,
            )
            .await?;
        info!(
            pull_request = %context,
            merge_method = %condition.merge_method,
            "Auto merge enabled for pull request"
        );

        Ok(AttemptOutcome::AutoMergeEnabled)
    }

    /// Runs the status poller, translating its terminal states into attempt
    /// outcomes. `Ok(())` means the attempt may proceed to its action.
    async fn wait_for_statuses(
        &self,
        context: &PullRequestContext,
        guard: &AttemptGuard,
        additional_exempt: &[String],
    ) -> Result<(), AttemptOutcome> {
        match self
            .poller
            .await_success(
                &self.provider,
                guard.token(),
                &context.organization,
                &context.repository,
                &context.head_sha,
                additional_exempt,
            )
            .await
        {
            Ok(()) => Ok(()),
            Err(PollError::Cancelled) => {
                info!(pull_request = %context, "Attempt superseded while waiting for statuses");
                Err(AttemptOutcome::Superseded)
            }
            Err(e) => {
                // Failing or timed-out checks must never be auto-approved.
                warn!(
                    pull_request = %context,
                    commit = context.head_sha,
                    reason = e.to_string(),
                    "Statuses did not resolve to success, skipping action"
                );
                Err(AttemptOutcome::ChecksNotGreen {
                    reason: e.to_string(),
                })
            }
        }
    }
}
