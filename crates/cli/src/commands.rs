/// Dry-run the rule engine against a live pull request.
pub mod check_pr;

/// Validate a rules file.
pub mod validate_rules;
