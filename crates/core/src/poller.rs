//! Combined-status polling with exponential backoff.
//!
//! CI statuses for a fresh commit appear asynchronously: the contexts are
//! registered shortly after push, and resolve minutes to hours later. The
//! poller first waits a fixed registration delay so that polling does not
//! start before CI has created its status contexts, then re-queries the
//! combined status on an escalating interval until every check resolves, a
//! check fails, or the overall time budget runs out.
//!
//! Cancellation is cooperative: the token is checked before every query and
//! raced against every sleep, so a superseded attempt performs at most one
//! further in-flight request after its token fires.

use std::time::Duration;

use review_warden_developer_platforms::models::{CheckState, CombinedStatus};
use review_warden_developer_platforms::PullRequestProvider;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;

/// Default warm-up before the first status query (30 seconds).
const DEFAULT_REGISTRATION_DELAY_SECS: u64 = 30;

/// Default overall time budget for one polling run (1 hour).
const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// Default initial interval between queries (5 minutes).
const DEFAULT_INITIAL_INTERVAL_SECS: u64 = 300;

/// Default cap for the interval growth (10 minutes).
const DEFAULT_MAX_INTERVAL_SECS: u64 = 600;

/// Default multiplier for the interval growth.
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 1.5;

/// Configuration for combined-status polling.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Warm-up before the first query, letting CI register its contexts.
    pub registration_delay: Duration,

    /// Overall elapsed-time budget for one polling run.
    pub timeout: Duration,

    /// Interval before the second query.
    pub initial_interval: Duration,

    /// Cap for the interval growth.
    pub max_interval: Duration,

    /// Multiplier applied to the interval after each query (typically 1.5-2.0).
    pub backoff_multiplier: f64,

    /// Status contexts whose pending state does not block success.
    ///
    /// A merge-queue context stays pending until the PR is ready to merge, so
    /// waiting for it would deadlock the approval.
    pub exempt_contexts: Vec<String>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            registration_delay: Duration::from_secs(DEFAULT_REGISTRATION_DELAY_SECS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            initial_interval: Duration::from_secs(DEFAULT_INITIAL_INTERVAL_SECS),
            max_interval: Duration::from_secs(DEFAULT_MAX_INTERVAL_SECS),
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            exempt_contexts: Vec::new(),
        }
    }
}

/// Terminal outcomes of one polling run.
#[derive(Debug, Error)]
pub enum PollError {
    /// The attempt was superseded while waiting
    #[error("polling cancelled")]
    Cancelled,

    /// A status check finished unsuccessfully; checks do not recover on their
    /// own, so there is no point in waiting out the rest of the budget
    #[error("status check {context} is in state {state}")]
    CheckFailed {
        /// The failing status context
        context: String,
        /// The state it reported
        state: CheckState,
    },

    /// The time budget ran out with checks still pending
    #[error("timed out after {elapsed:?} waiting for statuses to become success")]
    Timeout {
        /// Time spent waiting
        elapsed: Duration,
    },
}

/// What one combined-status observation means for the polling run.
#[derive(Debug)]
enum Resolution {
    /// Every check (modulo exempt contexts) has succeeded
    Success,

    /// A check failed or errored; stop immediately
    Failed { context: String, state: CheckState },

    /// A non-exempt check is still pending; keep waiting
    Pending { context: String },
}

/// Polls the combined status of a commit until it resolves.
#[derive(Debug, Clone)]
pub struct StatusPoller {
    config: PollerConfig,
}

impl StatusPoller {
    pub fn new(config: PollerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Waits until every status check for `commit_ref` succeeds.
    ///
    /// Returns `Ok(())` on success, [`PollError::Cancelled`] when the token
    /// fires first, [`PollError::CheckFailed`] as soon as any check fails, and
    /// [`PollError::Timeout`] when the budget is exhausted. Transport errors
    /// from the status query are retried within the budget.
    ///
    /// `additional_exempt` extends the configured exempt contexts for this run
    /// only (used by merge attempts whose condition opts into the merge-queue
    /// exemption).
    pub async fn await_success<P: PullRequestProvider>(
        &self,
        provider: &P,
        cancel: &CancellationToken,
        organization: &str,
        repository: &str,
        commit_ref: &str,
        additional_exempt: &[String],
    ) -> Result<(), PollError> {
        debug!(
            repository_owner = organization,
            repository = repository,
            commit = commit_ref,
            delay = ?self.config.registration_delay,
            "Waiting for statuses to be registered"
        );
        tokio::select! {
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            _ = sleep(self.config.registration_delay) => {}
        }

        let started = Instant::now();
        let mut interval = self.config.initial_interval;
        loop {
            // Checked before the query so a cancelled attempt never performs a
            // late external call.
            if cancel.is_cancelled() {
                return Err(PollError::Cancelled);
            }

            match provider
                .get_combined_status(organization, repository, commit_ref)
                .await
            {
                Ok(status) => match self.resolve(&status, additional_exempt) {
                    Resolution::Success => {
                        debug!(
                            repository_owner = organization,
                            repository = repository,
                            commit = commit_ref,
                            "All statuses are success"
                        );
                        return Ok(());
                    }
                    Resolution::Failed { context, state } => {
                        return Err(PollError::CheckFailed { context, state });
                    }
                    Resolution::Pending { context } => {
                        info!(
                            repository_owner = organization,
                            repository = repository,
                            commit = commit_ref,
                            context = context,
                            "Status check still pending, waiting for statuses to become success"
                        );
                    }
                },
                Err(e) => {
                    // Transport or auth hiccups are retryable; the budget
                    // bounds how long we keep trying.
                    warn!(
                        repository_owner = organization,
                        repository = repository,
                        commit = commit_ref,
                        error = e.to_string(),
                        "Failed to get combined status, retrying"
                    );
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= self.config.timeout {
                return Err(PollError::Timeout { elapsed });
            }
            let wait = interval.min(self.config.timeout - elapsed);
            tokio::select! {
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                _ = sleep(wait) => {}
            }
            interval = self.next_interval(interval);
        }
    }

    /// Computes the interval following `current`.
    ///
    /// The interval grows by `backoff_multiplier`, capped at `max_interval`.
    fn next_interval(&self, current: Duration) -> Duration {
        let grown = current.as_secs_f64() * self.config.backoff_multiplier;
        let capped = grown.min(self.config.max_interval.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Classifies one combined-status observation.
    fn resolve(&self, status: &CombinedStatus, additional_exempt: &[String]) -> Resolution {
        // A failed sub-check is terminal regardless of the rolled-up state.
        if let Some(failed) = status
            .statuses
            .iter()
            .find(|s| s.state.is_terminal_failure())
        {
            return Resolution::Failed {
                context: failed.context.clone(),
                state: failed.state,
            };
        }

        match status.state {
            CheckState::Success => Resolution::Success,
            CheckState::Failure | CheckState::Error => Resolution::Failed {
                context: "combined status".to_string(),
                state: status.state,
            },
            CheckState::Pending => {
                let pending = status.statuses.iter().find(|s| {
                    s.state == CheckState::Pending && !self.is_exempt(&s.context, additional_exempt)
                });
                match pending {
                    Some(check) => Resolution::Pending {
                        context: check.context.clone(),
                    },
                    // Only exempt contexts are still pending.
                    None => Resolution::Success,
                }
            }
        }
    }

    fn is_exempt(&self, context: &str, additional_exempt: &[String]) -> bool {
        self.config.exempt_contexts.iter().any(|c| c == context)
            || additional_exempt.iter().any(|c| c == context)
    }
}
