use super::*;
use std::sync::Arc;

use axum::http::HeaderValue;
use review_warden_core::poller::{PollerConfig, StatusPoller};
use review_warden_core::registry::AttemptRegistry;
use review_warden_core::rules::{RuleSet, SharedRuleSet};
use review_warden_core::ReviewWarden;
use review_warden_developer_platforms::github::GitHubProvider;

use crate::signature::signature_header;

const SECRET: &[u8] = b"test-webhook-secret";

const PULL_REQUEST_BODY: &str = r#"{
    "action": "review_requested",
    "pull_request": {
        "number": 9046,
        "head": {"sha": "abc123"},
        "user": {"login": "acme-bot"},
        "labels": []
    },
    "repository": {
        "name": "infrastructure",
        "owner": {"login": "acme"}
    }
}"#;

// State with an empty rule set: dispatched attempts finish with
// NoRulesConfigured before any GitHub call is made.
fn test_state() -> AppState {
    let warden = ReviewWarden::new(
        GitHubProvider::default(),
        SharedRuleSet::new(RuleSet::default()),
        Arc::new(AttemptRegistry::new()),
        StatusPoller::new(PollerConfig::default()),
    );
    AppState::new(warden, SECRET.to_vec())
}

fn headers_for(event_type: &str, body: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        HEADER_EVENT,
        HeaderValue::from_str(event_type).expect("valid header value"),
    );
    headers.insert(
        HEADER_SIGNATURE,
        HeaderValue::from_str(&signature_header(body.as_bytes(), SECRET))
            .expect("valid header value"),
    );
    headers
}

#[tokio::test]
async fn test_valid_delivery_is_accepted() {
    let result = webhook_handler(
        State(test_state()),
        headers_for("pull_request", PULL_REQUEST_BODY),
        Bytes::from(PULL_REQUEST_BODY),
    )
    .await;

    let (status, _) = result.expect("delivery should be accepted");
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_unknown_event_type_is_accepted_and_dropped() {
    let body = "{}";
    let result = webhook_handler(
        State(test_state()),
        headers_for("issue_comment", body),
        Bytes::from(body),
    )
    .await;

    let (status, _) = result.expect("delivery should be accepted");
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_invalid_signature_is_rejected() {
    let mut headers = headers_for("pull_request", PULL_REQUEST_BODY);
    headers.insert(
        HEADER_SIGNATURE,
        HeaderValue::from_static("sha256=0000000000000000000000000000000000000000000000000000000000000000"),
    );

    let result = webhook_handler(
        State(test_state()),
        headers,
        Bytes::from(PULL_REQUEST_BODY),
    )
    .await;

    assert!(matches!(result, Err(WebhookError::InvalidSignature)));
}

#[tokio::test]
async fn test_missing_signature_header_is_rejected() {
    let mut headers = HeaderMap::new();
    headers.insert(HEADER_EVENT, HeaderValue::from_static("pull_request"));

    let result = webhook_handler(
        State(test_state()),
        headers,
        Bytes::from(PULL_REQUEST_BODY),
    )
    .await;

    assert!(matches!(result, Err(WebhookError::MissingHeader(_))));
}

#[tokio::test]
async fn test_malformed_json_with_valid_signature_is_rejected() {
    let body = "{not json";
    let result = webhook_handler(
        State(test_state()),
        headers_for("pull_request", body),
        Bytes::from(body),
    )
    .await;

    assert!(matches!(result, Err(WebhookError::InvalidJson(_))));
}
