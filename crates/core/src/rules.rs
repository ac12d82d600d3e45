//! Rule model and evaluation.
//!
//! A rule set maps a pull request's origin (organization, repository, and for
//! the approval path the PR author) to an ordered list of conditions. The
//! first condition that matches wins; condition order is the configured order
//! and never depends on map iteration.
//!
//! Rule sets are immutable once compiled. A configuration reload builds a new
//! `RuleSet` and swaps it into the `SharedRuleSet` wholesale, so concurrent
//! readers never observe a partially updated set.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use regex::Regex;
use review_warden_developer_platforms::models::{MergeMethod, PullRequestFile};
use tracing::debug;

use crate::config::RulesFile;
use crate::errors::RulesError;

#[cfg(test)]
#[path = "rules_tests.rs"]
mod tests;

/// A condition gating automatic approval of a pull request.
///
/// A condition matches when the pull request carries every required label and
/// every changed file matches at least one of the configured patterns. An
/// empty label list and an empty pattern list are both vacuously satisfied.
#[derive(Debug, Clone)]
pub struct ApproveCondition {
    /// Labels that must all be present on the pull request
    pub required_labels: Vec<String>,

    /// Patterns the changed files are matched against, in configured order
    pub changed_file_patterns: Vec<Regex>,
}

impl ApproveCondition {
    /// Checks if the pull request has all required labels.
    ///
    /// Membership is by exact name match. Vacuously true when no labels are
    /// required.
    pub fn has_required_labels(&self, pr_labels: &[String]) -> bool {
        self.required_labels
            .iter()
            .all(|required| pr_labels.iter().any(|l| l == required))
    }

    /// Checks if the pull request changed only allowed files.
    ///
    /// Every changed file must match at least one pattern; the patterns are
    /// searched against the full repository-relative path. Vacuously true when
    /// no patterns are configured.
    pub fn all_files_match(&self, changes: &[PullRequestFile]) -> bool {
        if self.changed_file_patterns.is_empty() {
            return true;
        }
        changes.iter().all(|change| {
            self.changed_file_patterns
                .iter()
                .any(|pattern| pattern.is_match(&change.filename))
        })
    }
}

/// A condition gating automatic merge of a pull request.
///
/// Unlike the approval kind, a merge condition has no changed-file check; it
/// matches unless the pull request carries one of the exclude labels.
#[derive(Debug, Clone)]
pub struct MergeCondition {
    /// Labels that disqualify the pull request from auto-merge
    pub exclude_labels: Vec<String>,

    /// The merge method used when auto-merge completes
    pub merge_method: MergeMethod,

    /// Whether the merge-queue status context is exempt from the pending scan
    pub merge_queue: bool,
}

impl MergeCondition {
    /// Checks if the pull request carries any of the exclude labels.
    pub fn excludes(&self, pr_labels: &[String]) -> bool {
        self.exclude_labels
            .iter()
            .any(|excluded| pr_labels.iter().any(|l| l == excluded))
    }
}

/// Key of an approval rule: one PR author in one repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleKey {
    pub organization: String,
    pub repository: String,
    pub author: String,
}

impl RuleKey {
    pub fn new(organization: &str, repository: &str, author: &str) -> Self {
        Self {
            organization: organization.to_string(),
            repository: repository.to_string(),
            author: author.to_string(),
        }
    }
}

/// Key of a merge rule: one repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoKey {
    pub organization: String,
    pub repository: String,
}

impl RepoKey {
    pub fn new(organization: &str, repository: &str) -> Self {
        Self {
            organization: organization.to_string(),
            repository: repository.to_string(),
        }
    }
}

/// An immutable, compiled rule set.
///
/// Both tables use flat composite keys with value semantics; the per-key
/// condition lists keep their configured order.
#[derive(Debug, Default)]
pub struct RuleSet {
    approve: HashMap<RuleKey, Vec<ApproveCondition>>,
    merge: HashMap<RepoKey, Vec<MergeCondition>>,
}

impl RuleSet {
    /// Compiles a parsed rules file into an evaluable rule set.
    ///
    /// Changed-file patterns are compiled here so that a malformed pattern is
    /// a load-time error; evaluation itself cannot fail.
    pub fn compile(file: &RulesFile) -> Result<Self, RulesError> {
        let mut approve: HashMap<RuleKey, Vec<ApproveCondition>> = HashMap::new();
        for rule in &file.approve_rules {
            let key = RuleKey::new(&rule.organization, &rule.repository, &rule.author);
            let mut conditions = Vec::with_capacity(rule.conditions.len());
            for condition in &rule.conditions {
                let mut patterns = Vec::with_capacity(condition.changed_file_patterns.len());
                for pattern in &condition.changed_file_patterns {
                    let compiled =
                        Regex::new(pattern).map_err(|source| RulesError::InvalidPattern {
                            pattern: pattern.clone(),
                            source,
                        })?;
                    patterns.push(compiled);
                }
                conditions.push(ApproveCondition {
                    required_labels: condition.required_labels.clone(),
                    changed_file_patterns: patterns,
                });
            }
            approve.entry(key).or_default().extend(conditions);
        }

        let mut merge: HashMap<RepoKey, Vec<MergeCondition>> = HashMap::new();
        for rule in &file.merge_rules {
            let key = RepoKey::new(&rule.organization, &rule.repository);
            let conditions = rule.conditions.iter().map(|condition| MergeCondition {
                exclude_labels: condition.exclude_labels.clone(),
                merge_method: condition.merge_method,
                merge_queue: condition.merge_queue,
            });
            merge.entry(key).or_default().extend(conditions);
        }

        Ok(Self { approve, merge })
    }

    /// Returns the ordered approval conditions configured for a PR author in a
    /// repository, if any.
    pub fn approve_conditions(
        &self,
        organization: &str,
        repository: &str,
        author: &str,
    ) -> Option<&[ApproveCondition]> {
        self.approve
            .get(&RuleKey::new(organization, repository, author))
            .map(|c| c.as_slice())
    }

    /// Returns the ordered merge conditions configured for a repository, if any.
    pub fn merge_conditions(
        &self,
        organization: &str,
        repository: &str,
    ) -> Option<&[MergeCondition]> {
        self.merge
            .get(&RepoKey::new(organization, repository))
            .map(|c| c.as_slice())
    }

    /// Number of approval rule entries.
    pub fn approve_rule_count(&self) -> usize {
        self.approve.len()
    }

    /// Number of merge rule entries.
    pub fn merge_rule_count(&self) -> usize {
        self.merge.len()
    }
}

/// Evaluates approval conditions against a pull request snapshot.
///
/// Conditions are tried in list order; the first one where both the label and
/// the changed-file requirement hold wins (OR across the list, AND within one
/// condition). Returns the index of the matching condition, or `None` when the
/// list is exhausted.
pub fn evaluate_approve(
    conditions: &[ApproveCondition],
    pr_labels: &[String],
    changes: &[PullRequestFile],
) -> Option<usize> {
    for (index, condition) in conditions.iter().enumerate() {
        if !condition.has_required_labels(pr_labels) {
            debug!(condition = index, "Labels not matched");
            continue;
        }
        if !condition.all_files_match(changes) {
            debug!(condition = index, "Files not matched");
            continue;
        }
        return Some(index);
    }
    None
}

/// Evaluates merge conditions against a pull request's labels.
///
/// The first condition whose exclude labels are all absent wins. Returns the
/// index of the matching condition, or `None` when every condition excludes
/// the pull request.
pub fn evaluate_merge(conditions: &[MergeCondition], pr_labels: &[String]) -> Option<usize> {
    for (index, condition) in conditions.iter().enumerate() {
        if condition.excludes(pr_labels) {
            debug!(condition = index, "Exclude label present");
            continue;
        }
        return Some(index);
    }
    None
}

/// A shared handle to the current rule set snapshot.
///
/// Readers take a cheap `Arc` clone of the current snapshot; a reload replaces
/// the whole snapshot. In-flight evaluations keep reading the snapshot they
/// started with.
#[derive(Debug, Clone)]
pub struct SharedRuleSet {
    inner: Arc<RwLock<Arc<RuleSet>>>,
}

impl SharedRuleSet {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(rules))),
        }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.inner.read().unwrap().clone()
    }

    /// Replaces the current snapshot wholesale.
    pub fn replace(&self, rules: RuleSet) {
        *self.inner.write().unwrap() = Arc::new(rules);
    }
}
