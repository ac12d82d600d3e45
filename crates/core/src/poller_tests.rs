use super::*;
use async_trait::async_trait;
use proptest::prelude::*;
use review_warden_developer_platforms::errors::Error;
use review_warden_developer_platforms::models::{
    Label, MergeMethod, PullRequestFile, StatusCheck,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
enum ScriptedResponse {
    Status(CombinedStatus),
    TransportError,
}

/// Provider returning a scripted sequence of combined statuses.
///
/// The last script entry repeats once the sequence is exhausted.
#[derive(Debug)]
struct ScriptedStatusProvider {
    script: Mutex<VecDeque<ScriptedResponse>>,
    queries: AtomicU32,
}

impl ScriptedStatusProvider {
    fn new(script: Vec<ScriptedResponse>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            queries: AtomicU32::new(0),
        }
    }

    fn query_count(&self) -> u32 {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PullRequestProvider for ScriptedStatusProvider {
    async fn get_pull_request_files(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        _pr_number: u64,
    ) -> Result<Vec<PullRequestFile>, Error> {
        unimplemented!()
    }

    async fn get_combined_status(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        _commit_ref: &str,
    ) -> Result<CombinedStatus, Error> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        let response = if script.len() > 1 {
            script.pop_front().expect("script is not empty")
        } else {
            script.front().cloned().expect("script is not empty")
        };
        match response {
            ScriptedResponse::Status(status) => Ok(status),
            ScriptedResponse::TransportError => Err(Error::ApiError()),
        }
    }

    async fn approve_pull_request(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        _pr_number: u64,
        _commit_sha: &str,
    ) -> Result<(), Error> {
        unimplemented!()
    }

    async fn enable_auto_merge(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        _pr_number: u64,
        _merge_method: MergeMethod,
    ) -> Result<(), Error> {
        unimplemented!()
    }

    async fn add_label(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        _pr_number: u64,
        _label: &str,
    ) -> Result<(), Error> {
        unimplemented!()
    }

    async fn list_labels(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        _pr_number: u64,
    ) -> Result<Vec<Label>, Error> {
        unimplemented!()
    }
}

fn combined(state: CheckState, checks: &[(&str, CheckState)]) -> ScriptedResponse {
    ScriptedResponse::Status(CombinedStatus {
        state,
        statuses: checks
            .iter()
            .map(|(context, state)| StatusCheck {
                context: context.to_string(),
                state: *state,
            })
            .collect(),
    })
}

fn pending(checks: &[(&str, CheckState)]) -> ScriptedResponse {
    combined(CheckState::Pending, checks)
}

fn success() -> ScriptedResponse {
    combined(CheckState::Success, &[])
}

fn fast_config() -> PollerConfig {
    PollerConfig {
        registration_delay: Duration::from_millis(1),
        timeout: Duration::from_secs(5),
        initial_interval: Duration::from_millis(5),
        max_interval: Duration::from_millis(20),
        backoff_multiplier: 2.0,
        exempt_contexts: Vec::new(),
    }
}

async fn run(
    poller: &StatusPoller,
    provider: &ScriptedStatusProvider,
    cancel: &CancellationToken,
) -> Result<(), PollError> {
    poller
        .await_success(provider, cancel, "acme", "infrastructure", "abc123", &[])
        .await
}

#[tokio::test]
async fn test_success_after_pending_iterations() {
    let provider = ScriptedStatusProvider::new(vec![
        pending(&[("ci/test", CheckState::Pending)]),
        pending(&[("ci/test", CheckState::Pending)]),
        success(),
    ]);
    let poller = StatusPoller::new(fast_config());
    let cancel = CancellationToken::new();

    let result = run(&poller, &provider, &cancel).await;

    assert!(result.is_ok());
    // One query per script entry; success stops the loop immediately.
    assert_eq!(provider.query_count(), 3);
}

#[tokio::test]
async fn test_terminal_failure_short_circuits() {
    let provider = ScriptedStatusProvider::new(vec![
        pending(&[("ci/test", CheckState::Pending)]),
        pending(&[("ci/build", CheckState::Success), ("ci/test", CheckState::Failure)]),
    ]);
    // A generous budget proves the failure returns without waiting it out.
    let config = PollerConfig {
        timeout: Duration::from_secs(600),
        ..fast_config()
    };
    let poller = StatusPoller::new(config);
    let cancel = CancellationToken::new();

    let started = std::time::Instant::now();
    let result = run(&poller, &provider, &cancel).await;

    assert_eq!(provider.query_count(), 2);
    assert!(started.elapsed() < Duration::from_secs(1));
    match result {
        Err(PollError::CheckFailed { context, state }) => {
            assert_eq!(context, "ci/test");
            assert_eq!(state, CheckState::Failure);
        }
        other => panic!("expected CheckFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_error_state_is_terminal() {
    let provider =
        ScriptedStatusProvider::new(vec![pending(&[("ci/test", CheckState::Error)])]);
    let poller = StatusPoller::new(fast_config());
    let cancel = CancellationToken::new();

    let result = run(&poller, &provider, &cancel).await;

    match result {
        Err(PollError::CheckFailed { context, state }) => {
            assert_eq!(context, "ci/test");
            assert_eq!(state, CheckState::Error);
        }
        other => panic!("expected CheckFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_combined_failure_without_failed_subcheck_is_terminal() {
    let provider = ScriptedStatusProvider::new(vec![combined(CheckState::Failure, &[])]);
    let poller = StatusPoller::new(fast_config());
    let cancel = CancellationToken::new();

    let result = run(&poller, &provider, &cancel).await;

    match result {
        Err(PollError::CheckFailed { context, .. }) => {
            assert_eq!(context, "combined status");
        }
        other => panic!("expected CheckFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_transport_errors_are_retried() {
    let provider = ScriptedStatusProvider::new(vec![
        ScriptedResponse::TransportError,
        ScriptedResponse::TransportError,
        success(),
    ]);
    let poller = StatusPoller::new(fast_config());
    let cancel = CancellationToken::new();

    let result = run(&poller, &provider, &cancel).await;

    assert!(result.is_ok());
    assert_eq!(provider.query_count(), 3);
}

#[tokio::test]
async fn test_timeout_when_checks_stay_pending() {
    let provider =
        ScriptedStatusProvider::new(vec![pending(&[("ci/test", CheckState::Pending)])]);
    let config = PollerConfig {
        timeout: Duration::from_millis(50),
        initial_interval: Duration::from_millis(10),
        ..fast_config()
    };
    let poller = StatusPoller::new(config);
    let cancel = CancellationToken::new();

    let result = run(&poller, &provider, &cancel).await;

    assert!(matches!(result, Err(PollError::Timeout { .. })));
    // The budget allowed for more than one query before running out.
    assert!(provider.query_count() >= 2);
}

#[tokio::test]
async fn test_cancelled_before_polling_makes_no_queries() {
    let provider = ScriptedStatusProvider::new(vec![success()]);
    let poller = StatusPoller::new(fast_config());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = run(&poller, &provider, &cancel).await;

    assert!(matches!(result, Err(PollError::Cancelled)));
    assert_eq!(provider.query_count(), 0);
}

#[tokio::test]
async fn test_cancelled_during_backoff_wait() {
    let provider =
        ScriptedStatusProvider::new(vec![pending(&[("ci/test", CheckState::Pending)])]);
    let config = PollerConfig {
        // Long interval so the cancellation, not the next query, ends the wait.
        initial_interval: Duration::from_secs(30),
        timeout: Duration::from_secs(60),
        ..fast_config()
    };
    let poller = StatusPoller::new(config);
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let result = run(&poller, &provider, &cancel).await;

    assert!(matches!(result, Err(PollError::Cancelled)));
    assert_eq!(provider.query_count(), 1);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_exempt_context_pending_counts_as_success() {
    let provider = ScriptedStatusProvider::new(vec![pending(&[
        ("tide", CheckState::Pending),
        ("ci/build", CheckState::Success),
    ])]);
    let config = PollerConfig {
        exempt_contexts: vec!["tide".to_string()],
        ..fast_config()
    };
    let poller = StatusPoller::new(config);
    let cancel = CancellationToken::new();

    let result = run(&poller, &provider, &cancel).await;

    assert!(result.is_ok());
    assert_eq!(provider.query_count(), 1);
}

#[tokio::test]
async fn test_additional_exempt_contexts_apply_per_run() {
    let provider =
        ScriptedStatusProvider::new(vec![pending(&[("merge-queue", CheckState::Pending)])]);
    let poller = StatusPoller::new(fast_config());
    let cancel = CancellationToken::new();

    let result = poller
        .await_success(
            &provider,
            &cancel,
            "acme",
            "infrastructure",
            "abc123",
            &["merge-queue".to_string()],
        )
        .await;

    assert!(result.is_ok());
    assert_eq!(provider.query_count(), 1);
}

#[tokio::test]
async fn test_non_exempt_pending_context_keeps_waiting() {
    let provider = ScriptedStatusProvider::new(vec![
        pending(&[("tide", CheckState::Pending), ("ci/test", CheckState::Pending)]),
        success(),
    ]);
    let config = PollerConfig {
        exempt_contexts: vec!["tide".to_string()],
        ..fast_config()
    };
    let poller = StatusPoller::new(config);
    let cancel = CancellationToken::new();

    let result = run(&poller, &provider, &cancel).await;

    assert!(result.is_ok());
    assert_eq!(provider.query_count(), 2);
}

#[tokio::test]
async fn test_failed_exempt_context_is_still_terminal() {
    // Exemption only applies to the pending scan; a failed merge-queue
    // context still blocks the attempt.
    let provider =
        ScriptedStatusProvider::new(vec![pending(&[("tide", CheckState::Failure)])]);
    let config = PollerConfig {
        exempt_contexts: vec!["tide".to_string()],
        ..fast_config()
    };
    let poller = StatusPoller::new(config);
    let cancel = CancellationToken::new();

    let result = run(&poller, &provider, &cancel).await;

    assert!(matches!(result, Err(PollError::CheckFailed { .. })));
}

proptest! {
    #[test]
    fn test_next_interval_never_exceeds_cap(
        initial_ms in 1u64..10_000,
        max_ms in 1u64..60_000,
        multiplier in 1.5f64..3.0,
        current_ms in 1u64..120_000,
    ) {
        let config = PollerConfig {
            initial_interval: Duration::from_millis(initial_ms),
            max_interval: Duration::from_millis(max_ms),
            backoff_multiplier: multiplier,
            ..PollerConfig::default()
        };
        let poller = StatusPoller::new(config);

        let next = poller.next_interval(Duration::from_millis(current_ms));

        prop_assert!(next <= Duration::from_millis(max_ms));
    }

    #[test]
    fn test_next_interval_grows_until_cap(
        max_ms in 1u64..60_000,
        multiplier in 1.5f64..3.0,
        current_ms in 1u64..120_000,
    ) {
        let config = PollerConfig {
            max_interval: Duration::from_millis(max_ms),
            backoff_multiplier: multiplier,
            ..PollerConfig::default()
        };
        let poller = StatusPoller::new(config);

        let current = Duration::from_millis(current_ms);
        let next = poller.next_interval(current);

        // Either the interval grew, or it was clamped by the cap.
        prop_assert!(next >= current.min(Duration::from_millis(max_ms)));
    }
}
