use async_trait::async_trait;
use jsonwebtoken::EncodingKey;
use octocrab::Octocrab;
use serde_json::json;
use tracing::{debug, error, info, instrument};

use crate::{
    errors::Error,
    models::{CombinedStatus, Label, MergeMethod, PullRequestFile},
    PullRequestProvider,
};

/// GraphQL query resolving a pull request number to its node id.
///
/// The `enablePullRequestAutoMerge` mutation takes the node id, not the
/// number, so the id has to be looked up first.
const PULL_REQUEST_ID_QUERY: &str = r#"
query PullRequestId($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $number) {
      id
    }
  }
}
"#;

/// GraphQL mutation for enabling auto-merge.
const ENABLE_AUTO_MERGE_MUTATION: &str = r#"
mutation EnableAutoMerge($pullRequestId: ID!, $mergeMethod: PullRequestMergeMethod!) {
  enablePullRequestAutoMerge(input: { pullRequestId: $pullRequestId, mergeMethod: $mergeMethod }) {
    pullRequest {
      id
    }
  }
}
"#;

/// Creates an `Octocrab` client authenticated as a GitHub App.
///
/// This function parses the app's private key and uses it to create an
/// authenticated `Octocrab` client. The client can then be used to perform
/// API operations on behalf of the GitHub App.
///
/// # Arguments
///
/// * `app_id` - The ID of the GitHub App.
/// * `private_key` - The private key associated with the GitHub App, in PEM format.
///
/// # Returns
///
/// A `Result` containing an authenticated `Octocrab` client, or an `Error` if
/// the operation fails.
///
/// # Errors
///
/// This function returns an `Error` in the following cases:
/// - If the private key cannot be parsed.
/// - If the `Octocrab` client cannot be built.
#[instrument(skip(private_key))]
pub fn create_app_client(app_id: u64, private_key: &str) -> Result<Octocrab, Error> {
    let key = EncodingKey::from_rsa_pem(private_key.as_bytes()).map_err(|e| {
        Error::AuthError(format!("Failed to translate the private key. Error was: {}", e))
    })?;

    let octocrab = Octocrab::builder()
        .app(app_id.into(), key)
        .build()
        .map_err(|_| Error::AuthError("Failed to build a client for the GitHub app.".to_string()))?;

    info!(app_id, "Created client for the GitHub app");

    Ok(octocrab)
}

/// Creates an `Octocrab` client authenticated with a personal access token.
#[instrument(skip(token))]
pub fn create_token_client(token: &str) -> Result<Octocrab, Error> {
    Octocrab::builder()
        .personal_token(token.to_string())
        .build()
        .map_err(|_| Error::ApiError())
}

fn log_octocrab_error(message: &str, e: octocrab::Error) {
    match e {
        octocrab::Error::GitHub { source, backtrace } => {
            let err = *source;
            error!(
                error_message = err.message,
                backtrace = backtrace.to_string(),
                "{}. Received an error from GitHub",
                message
            )
        }
        octocrab::Error::UriParse { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. Failed to parse URI.",
            message
        ),
        octocrab::Error::InvalidHeaderValue { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. One of the header values was invalid.",
            message
        ),
        octocrab::Error::InvalidUtf8 { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. The message wasn't valid UTF-8.",
            message,
        ),
        _ => error!(error_message = e.to_string(), message),
    };
}

/// A `PullRequestProvider` backed by the GitHub REST and GraphQL APIs.
#[derive(Debug, Default)]
pub struct GitHubProvider {
    client: Octocrab,
}

impl GitHubProvider {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    /// Resolves a pull request number to its GraphQL node id.
    async fn pull_request_node_id(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<String, Error> {
        let payload = json!({
            "query": PULL_REQUEST_ID_QUERY,
            "variables": {
                "owner": repo_owner,
                "name": repo_name,
                "number": pr_number,
            },
        });

        let response: serde_json::Value = match self.client.graphql(&payload).await {
            Ok(r) => r,
            Err(e) => {
                log_octocrab_error("Failed to query pull request node id", e);
                return Err(Error::InvalidResponse);
            }
        };

        response
            .pointer("/data/repository/pullRequest/id")
            .and_then(|id| id.as_str())
            .map(|id| id.to_string())
            .ok_or(Error::InvalidResponse)
    }
}

#[async_trait]
impl PullRequestProvider for GitHubProvider {
    #[instrument]
    async fn get_pull_request_files(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<PullRequestFile>, Error> {
        let mut current_page = match self
            .client
            .pulls(repo_owner, repo_name)
            .list_files(pr_number)
            .await
        {
            Ok(p) => p,
            Err(e) => {
                log_octocrab_error("Failed to list changed files for pull request", e);
                return Err(Error::InvalidResponse);
            }
        };

        let mut files = current_page.take_items();
        while let Ok(Some(mut new_page)) = self.client.get_page(&current_page.next).await {
            files.extend(new_page.take_items());

            current_page = new_page;
        }

        let result = files
            .into_iter()
            .map(|f| PullRequestFile {
                filename: f.filename,
            })
            .collect();

        Ok(result)
    }

    #[instrument]
    async fn get_combined_status(
        &self,
        repo_owner: &str,
        repo_name: &str,
        commit_ref: &str,
    ) -> Result<CombinedStatus, Error> {
        let route = format!(
            "/repos/{}/{}/commits/{}/status",
            repo_owner, repo_name, commit_ref
        );

        match self.client.get(route, None::<&()>).await {
            Ok(status) => Ok(status),
            Err(e) => {
                log_octocrab_error("Failed to get combined status for commit", e);
                Err(Error::InvalidResponse)
            }
        }
    }

    #[instrument]
    async fn approve_pull_request(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        commit_sha: &str,
    ) -> Result<(), Error> {
        let url = format!(
            "/repos/{}/{}/pulls/{}/reviews",
            repo_owner, repo_name, pr_number
        );
        let payload = json!({
            "commit_id": commit_sha,
            "event": "APPROVE",
            "body": "",
        });

        self.client._post(url, Some(&payload)).await.map_err(|e| {
            log_octocrab_error("Failed to create approving review", e);
            Error::FailedToUpdatePullRequest("Failed to create approving review".to_string())
        })?;

        debug!(
            repository_owner = repo_owner,
            repository = repo_name,
            pull_request = pr_number,
            commit = commit_sha,
            "Created approving review"
        );

        Ok(())
    }

    #[instrument]
    async fn enable_auto_merge(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        merge_method: MergeMethod,
    ) -> Result<(), Error> {
        let node_id = self
            .pull_request_node_id(repo_owner, repo_name, pr_number)
            .await?;

        let payload = json!({
            "query": ENABLE_AUTO_MERGE_MUTATION,
            "variables": {
                "pullRequestId": node_id,
                "mergeMethod": merge_method.as_graphql(),
            },
        });

        let response: serde_json::Value = match self.client.graphql(&payload).await {
            Ok(r) => r,
            Err(e) => {
                log_octocrab_error("Failed to enable auto merge", e);
                return Err(Error::FailedToUpdatePullRequest(
                    "Failed to enable auto merge".to_string(),
                ));
            }
        };

        // GraphQL reports mutation failures as a 200 with an "errors" array.
        if let Some(errors) = response.get("errors") {
            return Err(Error::FailedToUpdatePullRequest(format!(
                "Failed to enable auto merge: {}",
                errors
            )));
        }

        Ok(())
    }

    #[instrument]
    async fn add_label(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        label: &str,
    ) -> Result<(), Error> {
        match self
            .client
            .issues(repo_owner, repo_name)
            .add_labels(pr_number, &[label.to_string()])
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                log_octocrab_error("Failed to add new labels", e);
                Err(Error::FailedToUpdatePullRequest(
                    "Failed to add labels".to_string(),
                ))
            }
        }
    }

    #[instrument]
    async fn list_labels(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<Label>, Error> {
        let mut current_page = match self
            .client
            .issues(repo_owner, repo_name)
            .list_labels_for_issue(pr_number)
            .send()
            .await
        {
            Ok(p) => p,
            Err(e) => {
                log_octocrab_error("Failed to list all labels for pull request", e);
                return Err(Error::InvalidResponse);
            }
        };

        let mut labels = current_page.take_items();
        while let Ok(Some(mut new_page)) = self.client.get_page(&current_page.next).await {
            labels.extend(new_page.take_items());

            current_page = new_page;
        }

        let result = labels.into_iter().map(|l| Label { name: l.name }).collect();

        Ok(result)
    }
}
