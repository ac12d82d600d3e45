//! Rules-file definitions for the Review Warden core.
//!
//! The rules file is TOML, schema-versioned like the other Review Warden
//! configuration surfaces. Parsing is separate from compilation: this module
//! produces the raw [`RulesFile`] structure, and [`crate::rules::RuleSet::compile`]
//! turns it into an evaluable rule set (compiling the changed-file patterns in
//! the process).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use review_warden_developer_platforms::models::MergeMethod;

use crate::errors::RulesError;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Label applied to pull requests after an automatic approval
pub const AUTO_APPROVED_LABEL: &str = "auto-approved";

/// The schema version this build understands
pub const SUPPORTED_SCHEMA_VERSION: u32 = 1;

/// Top-level rules file structure.
///
/// # Example
///
/// ```toml
/// schemaVersion = 1
///
/// [[approveRules]]
/// organization = "acme"
/// repository = "infrastructure"
/// author = "acme-bot"
///
/// [[approveRules.conditions]]
/// requiredLabels = ["team-review-done"]
/// changedFilePatterns = ['.*\.yaml$']
///
/// [[mergeRules]]
/// organization = "acme"
/// repository = "infrastructure"
///
/// [[mergeRules.conditions]]
/// excludeLabels = ["do-not-merge"]
/// mergeMethod = "squash"
/// mergeQueue = false
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RulesFile {
    /// Schema version of the rules file
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,

    /// Approval rules, one entry per (organization, repository, author)
    #[serde(default, rename = "approveRules")]
    pub approve_rules: Vec<ApproveRuleConfig>,

    /// Merge rules, one entry per (organization, repository)
    #[serde(default, rename = "mergeRules")]
    pub merge_rules: Vec<MergeRuleConfig>,
}

/// One approval rule entry: the conditions for one PR author in one repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApproveRuleConfig {
    /// The organization the repository belongs to
    pub organization: String,

    /// The repository name
    pub repository: String,

    /// The PR author these conditions apply to
    pub author: String,

    /// Ordered conditions; the first match wins
    #[serde(default)]
    pub conditions: Vec<ApproveConditionConfig>,
}

/// One approval condition as written in the rules file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ApproveConditionConfig {
    /// Labels that must all be present on the pull request
    #[serde(default, rename = "requiredLabels")]
    pub required_labels: Vec<String>,

    /// Regular expressions the changed files are matched against
    #[serde(default, rename = "changedFilePatterns")]
    pub changed_file_patterns: Vec<String>,
}

/// One merge rule entry: the conditions for one repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergeRuleConfig {
    /// The organization the repository belongs to
    pub organization: String,

    /// The repository name
    pub repository: String,

    /// Ordered conditions; the first match wins
    #[serde(default)]
    pub conditions: Vec<MergeConditionConfig>,
}

/// One merge condition as written in the rules file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergeConditionConfig {
    /// Labels that disqualify the pull request from auto-merge
    #[serde(default, rename = "excludeLabels")]
    pub exclude_labels: Vec<String>,

    /// The merge method used when auto-merge completes
    #[serde(default = "MergeConditionConfig::default_merge_method", rename = "mergeMethod")]
    pub merge_method: MergeMethod,

    /// Whether the merge-queue status context is exempt from the pending scan
    #[serde(default, rename = "mergeQueue")]
    pub merge_queue: bool,
}

impl MergeConditionConfig {
    fn default_merge_method() -> MergeMethod {
        MergeMethod::Merge
    }
}

/// Loads the rules file from the given path.
///
/// The file is parsed and its schema version checked; pattern compilation
/// happens in [`crate::rules::RuleSet::compile`].
///
/// # Arguments
/// * `path` - Path to the rules file
///
/// # Returns
/// * `Ok(RulesFile)` if loaded and valid
/// * `Err(RulesError)` if there is a problem
pub fn load_rules_file<P: AsRef<Path>>(path: P) -> Result<RulesFile, RulesError> {
    let path_ref = path.as_ref();
    let content = match fs::read_to_string(path_ref) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RulesError::NotFound(path_ref.display().to_string()));
        }
        Err(e) => return Err(RulesError::Io(e)),
    };
    let rules: RulesFile = toml::from_str(&content)?;
    if rules.schema_version != SUPPORTED_SCHEMA_VERSION {
        return Err(RulesError::UnsupportedSchemaVersion(rules.schema_version));
    }
    Ok(rules)
}
