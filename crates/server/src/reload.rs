//! Rules-file hot reload.
//!
//! The rules file is managed outside the process (mounted config, git pull,
//! operator edit). A background task stats the file on a fixed interval and,
//! when its modification time changes, re-loads and re-compiles it and swaps
//! the shared snapshot wholesale. A file that fails to load or compile leaves
//! the previous snapshot in place.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use review_warden_core::config::load_rules_file;
use review_warden_core::rules::{RuleSet, SharedRuleSet};
use tracing::{error, info};

#[cfg(test)]
#[path = "reload_tests.rs"]
mod tests;

/// Watches the rules file and swaps the shared snapshot on change.
///
/// Runs until the process exits; spawn it once at startup.
pub async fn watch_rules(rules_path: PathBuf, rules: SharedRuleSet, interval: Duration) {
    info!(path = %rules_path.display(), interval = ?interval, "Starting rules watcher");
    let mut last_modified = modified_time(&rules_path);
    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately; the file was already loaded at startup.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let modified = modified_time(&rules_path);
        if modified == last_modified {
            continue;
        }
        last_modified = modified;

        info!(path = %rules_path.display(), "Rules file changed, reloading");
        match reload(&rules_path) {
            Ok(compiled) => {
                info!(
                    approve_rules = compiled.approve_rule_count(),
                    merge_rules = compiled.merge_rule_count(),
                    "Rules reloaded"
                );
                rules.replace(compiled);
            }
            Err(e) => {
                error!(
                    path = %rules_path.display(),
                    error = e.to_string(),
                    "Failed to reload rules, keeping previous rule set"
                );
            }
        }
    }
}

fn reload(rules_path: &PathBuf) -> Result<RuleSet, review_warden_core::errors::RulesError> {
    let file = load_rules_file(rules_path)?;
    RuleSet::compile(&file)
}

fn modified_time(path: &PathBuf) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
