//! Per-pull-request concurrency guard.
//!
//! GitHub fans out one `review_requested` event per requested reviewer, so the
//! same head commit can arrive several times within milliseconds. The registry
//! guarantees that at most one automation attempt is live per
//! `(organization, repository, PR number, head SHA)` at any time, and gives
//! every attempt a cancellation token so that a newer commit can supersede
//! attempts still running for older commits.
//!
//! Supersession only fires the token; the registry entry is removed by the
//! cancelled attempt itself when its guard drops. Keeping removal with the
//! owner avoids the canceller and the cancelled attempt mutating the same
//! entry concurrently.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::debug;

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

/// Identifies one version of a pull request: a new commit produces a new key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttemptKey {
    /// The organization the repository belongs to
    pub organization: String,

    /// The repository name
    pub repository: String,

    /// The pull request number
    pub number: u64,

    /// The head commit SHA the attempt applies to
    pub head_sha: String,
}

impl AttemptKey {
    pub fn new(organization: &str, repository: &str, number: u64, head_sha: &str) -> Self {
        Self {
            organization: organization.to_string(),
            repository: repository.to_string(),
            number,
            head_sha: head_sha.to_string(),
        }
    }
}

impl fmt::Display for AttemptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}#{}@{}",
            self.organization, self.repository, self.number, self.head_sha
        )
    }
}

/// Registry of live automation attempts.
///
/// All operations are serialized by one registry-wide mutex. The lock is held
/// only for the map operation itself; operations are O(attempts in flight),
/// not O(webhook volume).
#[derive(Debug, Default)]
pub struct AttemptRegistry {
    entries: Mutex<HashMap<AttemptKey, CancellationToken>>,
}

impl AttemptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tries to register an attempt for the given key.
    ///
    /// Returns `None` without mutating the registry when an attempt for the
    /// exact same key is already live (a duplicate delivery of the same
    /// commit). Otherwise inserts a fresh cancellation token and returns a
    /// guard that releases the entry when dropped.
    pub fn try_acquire(self: &Arc<Self>, key: AttemptKey) -> Option<AttemptGuard> {
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(&key) {
            return None;
        }
        let token = CancellationToken::new();
        entries.insert(key.clone(), token.clone());
        Some(AttemptGuard {
            registry: Arc::clone(self),
            key,
            token,
        })
    }

    /// Cancels every live attempt for the pull request whose head SHA differs
    /// from `surviving_head_sha`.
    ///
    /// Invoked when a new commit arrives: attempts for older commits of the
    /// same PR are superseded. Attempts for other pull requests are never
    /// touched, even when they share the same SHA value. The cancelled
    /// entries stay in the registry until their owners observe the token and
    /// release.
    pub fn cancel_others(
        &self,
        organization: &str,
        repository: &str,
        number: u64,
        surviving_head_sha: &str,
    ) {
        let entries = self.entries.lock().unwrap();
        for (key, token) in entries.iter() {
            if key.organization == organization
                && key.repository == repository
                && key.number == number
                && key.head_sha != surviving_head_sha
            {
                debug!(attempt = %key, "Cancelling superseded attempt");
                token.cancel();
            }
        }
    }

    /// Number of attempts currently registered.
    pub fn in_flight(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    fn release(&self, key: &AttemptKey) {
        self.entries.lock().unwrap().remove(key);
    }
}

/// Scoped registration of one attempt.
///
/// Dropping the guard releases the registry entry, so release happens on every
/// exit path of the owning attempt, including early returns and panics.
#[derive(Debug)]
pub struct AttemptGuard {
    registry: Arc<AttemptRegistry>,
    key: AttemptKey,
    token: CancellationToken,
}

impl AttemptGuard {
    /// The cancellation token of this attempt.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The key this attempt is registered under.
    pub fn key(&self) -> &AttemptKey {
        &self.key
    }
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        self.registry.release(&self.key);
    }
}
