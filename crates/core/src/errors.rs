use review_warden_developer_platforms::errors::Error as PlatformError;
use thiserror::Error;

/// Errors raised while loading and compiling a rules file.
///
/// All of these are configuration errors: they occur at load time, never
/// during evaluation of an already loaded rule set.
#[derive(Debug, Error)]
pub enum RulesError {
    /// The rules file does not exist at the given path
    #[error("Rules file not found: {0}")]
    NotFound(String),

    /// The rules file could not be read
    #[error("Failed to read the rules file: {0}")]
    Io(#[from] std::io::Error),

    /// The rules file is not valid TOML or does not match the expected schema
    #[error("Failed to parse the rules file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The rules file declares a schema version this build does not support
    #[error("Unsupported schema version: {0}")]
    UnsupportedSchemaVersion(u32),

    /// A changed-file pattern is not a valid regular expression
    #[error("Invalid changed-file pattern `{pattern}`: {source}")]
    InvalidPattern {
        /// The pattern as written in the rules file
        pattern: String,
        /// The underlying regex compilation error
        source: regex::Error,
    },
}

/// Errors surfaced by an automation attempt.
///
/// Expected terminal states of an attempt (duplicate event, supersession,
/// checks not green) are not errors; they are reported through
/// `AttemptOutcome`. An attempt only fails with a `WardenError` when a call
/// to the developer platform fails.
#[derive(Debug, Error)]
pub enum WardenError {
    /// A call to the developer platform failed
    #[error("Developer platform request failed: {0}")]
    Provider(#[from] PlatformError),
}
