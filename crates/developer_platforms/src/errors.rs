#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Error types for developer platform operations.
///
/// This enum represents all possible errors that can occur when interacting
/// with developer platforms like GitHub, GitLab, etc. Each variant provides
/// specific context about the type of failure encountered.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Generic API request failure.
    ///
    /// This error indicates that an API call to the developer platform failed
    /// for an unspecified reason. This is typically used as a fallback when
    /// more specific error information is not available.
    #[error("API request failed")]
    ApiError(),

    /// Authentication failed with the platform.
    ///
    /// The provided credentials (token, app credentials, etc.) are invalid,
    /// expired, or insufficient for the requested operation. The string
    /// parameter contains additional details about the authentication failure.
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Failed to update pull request.
    ///
    /// An operation that modifies a pull request failed. This could include
    /// failures to:
    /// - Submit the approval review
    /// - Enable auto-merge
    /// - Add labels
    ///
    /// The string parameter contains specific details about what operation failed.
    #[error("Failed to update the PR: {0}")]
    FailedToUpdatePullRequest(String),

    /// Invalid response format from platform API.
    ///
    /// The response received from the developer platform API was not in the
    /// expected format: malformed JSON, missing required fields, or an
    /// unexpected response structure.
    #[error("Invalid response format")]
    InvalidResponse,
}
