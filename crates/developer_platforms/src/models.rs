//! # Models
//!
//! This module contains the data models used throughout Review Warden.
//!
//! These models represent the entities Review Warden works with, such as
//! labels, changed files, and commit statuses. They are designed to be
//! serializable and deserializable to facilitate integration with Git
//! provider APIs.

use std::fmt;

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// Represents a label on a pull request.
///
/// # Examples
///
/// ```
/// use review_warden_developer_platforms::models::Label;
///
/// let label = Label {
///     name: "team-review-done".to_string(),
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    /// The name of the label
    pub name: String,
}

/// Represents one file changed by a pull request.
///
/// Only the path is carried; rule evaluation matches file paths against
/// configured patterns and does not need diff contents or line counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestFile {
    /// The repository-relative path of the changed file
    pub filename: String,
}

/// The state of a commit status, either combined or for a single check.
///
/// GitHub reports `pending`, `success`, `failure` and `error`; `error` is a
/// terminal state just like `failure` (the check will not recover on its own).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    /// At least one check has not finished yet
    Pending,

    /// Every check finished successfully
    Success,

    /// A check finished unsuccessfully
    Failure,

    /// A check could not be executed
    Error,
}

impl CheckState {
    /// Returns true when the state is terminal and unsuccessful.
    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, CheckState::Failure | CheckState::Error)
    }
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckState::Pending => "pending",
            CheckState::Success => "success",
            CheckState::Failure => "failure",
            CheckState::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// One named status context reported for a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCheck {
    /// The name of the status context (e.g. a CI job name)
    pub context: String,

    /// The state the context last reported
    pub state: CheckState,
}

/// The combined commit status for a commit: the rolled-up state plus each
/// individual status context.
///
/// The combined `state` is `success` only when every context succeeded, and
/// `failure` as soon as any context failed or errored; while contexts are
/// still running it is `pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedStatus {
    /// The rolled-up state across all contexts
    pub state: CheckState,

    /// The individual status contexts
    #[serde(default)]
    pub statuses: Vec<StatusCheck>,
}

/// The merge method used when auto-merge completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
    /// Create a merge commit
    Merge,

    /// Squash all commits into one
    Squash,

    /// Rebase the commits onto the base branch
    Rebase,
}

impl MergeMethod {
    /// Returns the GraphQL `PullRequestMergeMethod` enum value.
    pub fn as_graphql(&self) -> &'static str {
        match self {
            MergeMethod::Merge => "MERGE",
            MergeMethod::Squash => "SQUASH",
            MergeMethod::Rebase => "REBASE",
        }
    }
}

impl fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MergeMethod::Merge => "merge",
            MergeMethod::Squash => "squash",
            MergeMethod::Rebase => "rebase",
        };
        write!(f, "{}", s)
    }
}
