use async_trait::async_trait;

pub mod errors;

pub mod github;

pub mod models;
use errors::Error;
use models::{CombinedStatus, Label, MergeMethod, PullRequestFile};

/// Trait for interacting with developer platforms that provide pull requests (e.g., GitHub, GitLab).
///
/// Implementations of this trait provide the operations Review Warden needs to
/// inspect a pull request (changed files, labels, CI status) and to perform the
/// terminal automation actions (approval review, auto-merge, labels).
///
/// # Example Implementation
///
/// ```rust,no_run
/// use review_warden_developer_platforms::{PullRequestProvider, errors::Error};
/// use review_warden_developer_platforms::models::{CombinedStatus, Label, MergeMethod, PullRequestFile};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct GitHubProvider {
///     // Fields for authentication, etc.
///     token: String,
/// }
///
/// #[async_trait]
/// impl PullRequestProvider for GitHubProvider {
///     async fn get_pull_request_files(
///         &self,
///         repo_owner: &str,
///         repo_name: &str,
///         pr_number: u64,
///     ) -> Result<Vec<PullRequestFile>, Error> {
///         // Implementation to fetch the changed files from the GitHub API
///         // ...
///         # unimplemented!()
///     }
///
///     // Implement other required methods...
///     # async fn get_combined_status(&self, _: &str, _: &str, _: &str) -> Result<CombinedStatus, Error> { unimplemented!() }
///     # async fn approve_pull_request(&self, _: &str, _: &str, _: u64, _: &str) -> Result<(), Error> { unimplemented!() }
///     # async fn enable_auto_merge(&self, _: &str, _: &str, _: u64, _: MergeMethod) -> Result<(), Error> { unimplemented!() }
///     # async fn add_label(&self, _: &str, _: &str, _: u64, _: &str) -> Result<(), Error> { unimplemented!() }
///     # async fn list_labels(&self, _: &str, _: &str, _: u64) -> Result<Vec<Label>, Error> { unimplemented!() }
/// }
/// ```
#[async_trait]
pub trait PullRequestProvider: Send + Sync {
    /// Gets the list of files changed in a pull request.
    ///
    /// This method fetches all files that have been modified, added, deleted, or
    /// renamed as part of the pull request. Only the file paths are needed for
    /// rule evaluation.
    ///
    /// # Arguments
    ///
    /// * `repo_owner` - The owner of the repository
    /// * `repo_name` - The name of the repository
    /// * `pr_number` - The pull request number
    ///
    /// # Returns
    ///
    /// A `Result` containing a vector of file changes
    async fn get_pull_request_files(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<PullRequestFile>, Error>;

    /// Retrieves the combined commit status for a commit reference.
    ///
    /// The combined status aggregates every status context reported for the
    /// commit (CI jobs, required checks) into one rolled-up state plus the
    /// individual sub-checks.
    ///
    /// # Arguments
    ///
    /// * `repo_owner` - The owner of the repository
    /// * `repo_name` - The name of the repository
    /// * `commit_ref` - The commit SHA or ref to query
    ///
    /// # Returns
    ///
    /// A `Result` containing the combined status
    async fn get_combined_status(
        &self,
        repo_owner: &str,
        repo_name: &str,
        commit_ref: &str,
    ) -> Result<CombinedStatus, Error>;

    /// Submits an approving review for a pull request.
    ///
    /// The review is pinned to a specific commit so that an approval issued for
    /// an older commit cannot be attached to a newer one.
    ///
    /// # Arguments
    ///
    /// * `repo_owner` - The owner of the repository
    /// * `repo_name` - The name of the repository
    /// * `pr_number` - The pull request number
    /// * `commit_sha` - The head commit the approval applies to
    ///
    /// # Returns
    ///
    /// A `Result` indicating success or failure
    async fn approve_pull_request(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        commit_sha: &str,
    ) -> Result<(), Error>;

    /// Enables auto-merge for a pull request.
    ///
    /// # Arguments
    ///
    /// * `repo_owner` - The owner of the repository
    /// * `repo_name` - The name of the repository
    /// * `pr_number` - The pull request number
    /// * `merge_method` - The merge method to use once the PR becomes mergeable
    ///
    /// # Returns
    ///
    /// A `Result` indicating success or failure
    async fn enable_auto_merge(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        merge_method: MergeMethod,
    ) -> Result<(), Error>;

    /// Adds a label to a pull request.
    ///
    /// # Arguments
    ///
    /// * `repo_owner` - The owner of the repository
    /// * `repo_name` - The name of the repository
    /// * `pr_number` - The pull request number
    /// * `label` - The label to add
    ///
    /// # Returns
    ///
    /// A `Result` indicating success or failure
    async fn add_label(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        label: &str,
    ) -> Result<(), Error>;

    /// Lists all labels on a pull request.
    ///
    /// # Arguments
    ///
    /// * `repo_owner` - The owner of the repository
    /// * `repo_name` - The name of the repository
    /// * `pr_number` - The pull request number
    ///
    /// # Returns
    ///
    /// A `Result` containing a vector of labels
    async fn list_labels(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<Label>, Error>;
}
