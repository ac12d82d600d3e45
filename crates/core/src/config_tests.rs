use super::*;
use review_warden_developer_platforms::models::MergeMethod;

const EXAMPLE_RULES: &str = r#"
schemaVersion = 1

[[approveRules]]
organization = "acme"
repository = "infrastructure"
author = "acme-bot"

[[approveRules.conditions]]
requiredLabels = ["team-review-done"]
changedFilePatterns = ['.*\.yaml$']

[[approveRules.conditions]]
requiredLabels = ["docs-only"]

[[mergeRules]]
organization = "acme"
repository = "infrastructure"

[[mergeRules.conditions]]
excludeLabels = ["do-not-merge"]
mergeMethod = "squash"
mergeQueue = true
"#;

#[test]
fn test_parse_example_rules() {
    let rules: RulesFile = toml::from_str(EXAMPLE_RULES).expect("example rules should parse");

    assert_eq!(rules.schema_version, 1);
    assert_eq!(rules.approve_rules.len(), 1);
    assert_eq!(rules.merge_rules.len(), 1);

    let approve = &rules.approve_rules[0];
    assert_eq!(approve.organization, "acme");
    assert_eq!(approve.repository, "infrastructure");
    assert_eq!(approve.author, "acme-bot");
    assert_eq!(approve.conditions.len(), 2);
    assert_eq!(approve.conditions[0].required_labels, vec!["team-review-done"]);
    assert_eq!(
        approve.conditions[0].changed_file_patterns,
        vec![r".*\.yaml$"]
    );
    // The second condition omits changedFilePatterns entirely.
    assert!(approve.conditions[1].changed_file_patterns.is_empty());

    let merge = &rules.merge_rules[0];
    assert_eq!(merge.conditions.len(), 1);
    assert_eq!(merge.conditions[0].exclude_labels, vec!["do-not-merge"]);
    assert_eq!(merge.conditions[0].merge_method, MergeMethod::Squash);
    assert!(merge.conditions[0].merge_queue);
}

#[test]
fn test_parse_minimal_rules() {
    let rules: RulesFile =
        toml::from_str("schemaVersion = 1").expect("minimal rules should parse");

    assert_eq!(rules.schema_version, 1);
    assert!(rules.approve_rules.is_empty());
    assert!(rules.merge_rules.is_empty());
}

#[test]
fn test_merge_condition_defaults() {
    let toml_str = r#"
schemaVersion = 1

[[mergeRules]]
organization = "acme"
repository = "infrastructure"

[[mergeRules.conditions]]
"#;

    let rules: RulesFile = toml::from_str(toml_str).expect("rules should parse");

    let condition = &rules.merge_rules[0].conditions[0];
    assert!(condition.exclude_labels.is_empty());
    assert_eq!(condition.merge_method, MergeMethod::Merge);
    assert!(!condition.merge_queue);
}

#[test]
fn test_load_rules_file() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("rules.toml");
    std::fs::write(&path, EXAMPLE_RULES).expect("failed to write rules file");

    let rules = load_rules_file(&path).expect("rules file should load");

    assert_eq!(rules.approve_rules.len(), 1);
}

#[test]
fn test_load_rules_file_not_found() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("does-not-exist.toml");

    let result = load_rules_file(&path);

    assert!(matches!(result, Err(RulesError::NotFound(_))));
}

#[test]
fn test_load_rules_file_rejects_unsupported_schema_version() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("rules.toml");
    std::fs::write(&path, "schemaVersion = 2").expect("failed to write rules file");

    let result = load_rules_file(&path);

    assert!(matches!(
        result,
        Err(RulesError::UnsupportedSchemaVersion(2))
    ));
}

#[test]
fn test_load_rules_file_rejects_invalid_toml() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("rules.toml");
    std::fs::write(&path, "schemaVersion = [not toml").expect("failed to write rules file");

    let result = load_rules_file(&path);

    assert!(matches!(result, Err(RulesError::Parse(_))));
}
