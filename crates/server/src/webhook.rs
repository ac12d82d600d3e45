//! Webhook endpoint handler.
//!
//! Accepts GitHub webhook deliveries, validates signatures, and spawns one
//! attempt task per qualifying event before returning `202 Accepted`. The
//! attempt itself can take minutes (it waits for CI), so it never runs on the
//! request path.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::events::{PullRequestEvent, ReviewEvent};
use crate::signature::verify_signature;
use crate::state::AppState;

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod tests;

/// Header name for GitHub event type.
const HEADER_EVENT: &str = "x-github-event";
/// Header name for GitHub signature.
const HEADER_SIGNATURE: &str = "x-hub-signature-256";

/// Errors that can occur when processing a webhook delivery.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Missing required header.
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    /// Invalid signature.
    #[error("invalid signature")]
    InvalidSignature,

    /// Invalid JSON body.
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::MissingHeader(_) => StatusCode::BAD_REQUEST,
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
            WebhookError::InvalidJson(_) => StatusCode::BAD_REQUEST,
        };

        (status, self.to_string()).into_response()
    }
}

/// Webhook handler.
///
/// # Request
///
/// - Method: POST
/// - Required headers:
///   - `X-GitHub-Event`: Event type (e.g. "pull_request")
///   - `X-Hub-Signature-256`: HMAC-SHA256 signature of the payload
/// - Body: JSON webhook payload
///
/// # Response
///
/// - 202 Accepted: delivery accepted (including non-qualifying actions)
/// - 400 Bad Request: missing header or invalid JSON
/// - 401 Unauthorized: invalid signature
pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), WebhookError> {
    let event_type = get_header(&headers, HEADER_EVENT)?;
    let signature_header = get_header(&headers, HEADER_SIGNATURE)?;

    // Verify the signature before parsing anything.
    if !verify_signature(&body, &signature_header, state.webhook_secret()) {
        warn!(event_type = %event_type, "Invalid webhook signature");
        return Err(WebhookError::InvalidSignature);
    }

    match event_type.as_str() {
        "pull_request" => {
            let event: PullRequestEvent = serde_json::from_slice(&body)?;
            dispatch_pull_request(&state, event);
        }
        "pull_request_review" => {
            let event: ReviewEvent = serde_json::from_slice(&body)?;
            dispatch_review(&state, event);
        }
        other => {
            debug!(event_type = other, "Ignoring event type");
        }
    }

    Ok((StatusCode::ACCEPTED, "Accepted"))
}

/// Routes a `pull_request` event to the matching orchestrator operation.
fn dispatch_pull_request(state: &AppState, event: PullRequestEvent) {
    let context = event.context();
    let warden = state.warden();

    debug!(
        pull_request = %context,
        action = event.action,
        "Received pull_request event"
    );

    match event.action.as_str() {
        "review_requested" => {
            tokio::spawn(async move {
                report_outcome(warden.handle_review_requested(context).await);
            });
        }
        "synchronize" => {
            tokio::spawn(async move {
                report_outcome(warden.handle_synchronize(context).await);
            });
        }
        "opened" => {
            tokio::spawn(async move {
                report_outcome(warden.handle_pr_opened(context).await);
            });
        }
        "labeled" => {
            tokio::spawn(async move {
                report_outcome(warden.handle_pr_labeled(context).await);
            });
        }
        "unlabeled" => {
            tokio::spawn(async move {
                report_outcome(warden.handle_pr_unlabeled(context).await);
            });
        }
        other => {
            debug!(action = other, "Ignoring pull_request action");
        }
    }
}

/// Routes a `pull_request_review` event to the matching orchestrator operation.
fn dispatch_review(state: &AppState, event: ReviewEvent) {
    let context = event.context();
    let warden = state.warden();

    debug!(
        pull_request = %context,
        action = event.action,
        "Received pull_request_review event"
    );

    match event.action.as_str() {
        "dismissed" => {
            tokio::spawn(async move {
                report_outcome(warden.handle_review_dismissed(context).await);
            });
        }
        other => {
            debug!(action = other, "Ignoring pull_request_review action");
        }
    }
}

fn report_outcome(
    result: Result<review_warden_core::AttemptOutcome, review_warden_core::errors::WardenError>,
) {
    match result {
        Ok(outcome) => info!(outcome = ?outcome, "Attempt finished"),
        Err(e) => error!(error = e.to_string(), "Attempt failed"),
    }
}

/// Extracts a required header value as a string.
fn get_header(headers: &HeaderMap, name: &'static str) -> Result<String, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .ok_or(WebhookError::MissingHeader(name))
}

/// Liveness endpoint.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}
