//! Credential-forwarding proxy shared by both deletion routes.

use super::types::{DeletionAccepted, DeletionFailure, DeletionKind, DeletionRequest};
use crate::api::handlers::auth::subject_from_headers;
use anyhow::{Context, Result, anyhow};
use axum::{
    Json,
    http::{
        HeaderMap, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use url::Url;

pub const DEFAULT_DELETE_DATA_URL: &str =
    "https://auth.pocketpanel.ai/functions/v1/delete-user-data";
pub const DEFAULT_DELETE_ACCOUNT_URL: &str =
    "https://auth.pocketpanel.ai/functions/v1/delete-user-account";
const DEFAULT_UPSTREAM_TIMEOUT_SECONDS: u64 = 30;

const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";
const NON_JSON_MESSAGE: &str = "Function returned non-JSON";
const FUNCTION_ERROR_MESSAGE: &str = "Function error";
const SERVER_ERROR_MESSAGE: &str = "Server error";

#[derive(Clone, Debug)]
pub struct ProxyConfig {
    delete_data_url: String,
    delete_account_url: String,
    upstream_timeout_seconds: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            delete_data_url: DEFAULT_DELETE_DATA_URL.to_string(),
            delete_account_url: DEFAULT_DELETE_ACCOUNT_URL.to_string(),
            upstream_timeout_seconds: DEFAULT_UPSTREAM_TIMEOUT_SECONDS,
        }
    }
}

impl ProxyConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_delete_data_url(mut self, url: String) -> Self {
        self.delete_data_url = url;
        self
    }

    #[must_use]
    pub fn with_delete_account_url(mut self, url: String) -> Self {
        self.delete_account_url = url;
        self
    }

    #[must_use]
    pub fn with_upstream_timeout_seconds(mut self, seconds: u64) -> Self {
        self.upstream_timeout_seconds = seconds;
        self
    }

    #[must_use]
    pub fn delete_data_url(&self) -> &str {
        &self.delete_data_url
    }

    #[must_use]
    pub fn delete_account_url(&self) -> &str {
        &self.delete_account_url
    }

    #[must_use]
    pub fn upstream_timeout_seconds(&self) -> u64 {
        self.upstream_timeout_seconds
    }
}

/// Result of one forwarded deletion, mapped to the same HTTP contract by both routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// Upstream accepted the request.
    Ok,
    /// No subject could be read from the bearer credential.
    Unauthorized,
    /// Upstream answered with a non-success status.
    UpstreamError { status: StatusCode, message: String },
    /// Upstream body was not JSON.
    MalformedUpstream,
    /// Request never completed (connect, timeout, body read).
    Transport(String),
}

impl ForwardOutcome {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Ok => StatusCode::OK,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::UpstreamError { status, .. } => *status,
            Self::MalformedUpstream => StatusCode::BAD_GATEWAY,
            Self::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error text for the response body, `None` on success.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Ok => None,
            Self::Unauthorized => Some(UNAUTHORIZED_MESSAGE),
            Self::UpstreamError { message, .. } => Some(message),
            Self::MalformedUpstream => Some(NON_JSON_MESSAGE),
            Self::Transport(message) if message.trim().is_empty() => Some(SERVER_ERROR_MESSAGE),
            Self::Transport(message) => Some(message),
        }
    }
}

impl IntoResponse for ForwardOutcome {
    fn into_response(self) -> Response {
        let status = self.status();
        match self.error_message() {
            None => (status, Json(DeletionAccepted { ok: true })).into_response(),
            Some(message) => (
                status,
                Json(DeletionFailure {
                    error: message.to_string(),
                }),
            )
                .into_response(),
        }
    }
}

/// Stateless forwarder holding the upstream URLs and a shared HTTP client.
#[derive(Debug)]
pub struct DeletionProxy {
    client: Client,
    config: ProxyConfig,
}

impl DeletionProxy {
    /// Build a proxy for the configured upstream functions.
    ///
    /// # Errors
    /// Returns an error if an upstream URL is invalid or the HTTP client cannot be built.
    pub fn new(config: ProxyConfig) -> Result<Self> {
        for url in [config.delete_data_url(), config.delete_account_url()] {
            let parsed =
                Url::parse(url).with_context(|| format!("Invalid upstream function URL: {url}"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(anyhow!("Upstream function URL must be http(s): {url}"));
            }
        }

        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(config.upstream_timeout_seconds()))
            .build()
            .context("Failed to build upstream HTTP client")?;

        Ok(Self { client, config })
    }

    #[must_use]
    pub fn upstream_url(&self, kind: DeletionKind) -> &str {
        match kind {
            DeletionKind::Data => self.config.delete_data_url(),
            DeletionKind::Account => self.config.delete_account_url(),
        }
    }

    pub async fn forward(&self, kind: DeletionKind, headers: &HeaderMap) -> ForwardOutcome {
        let outcome = forward_deletion(&self.client, self.upstream_url(kind), headers).await;

        match &outcome {
            ForwardOutcome::Ok => info!(kind = kind.endpoint(), "deletion request accepted"),
            ForwardOutcome::Unauthorized => {
                debug!(kind = kind.endpoint(), "deletion request without identity");
            }
            ForwardOutcome::UpstreamError { status, message } => error!(
                kind = kind.endpoint(),
                status = status.as_u16(),
                message = %message,
                "upstream deletion function returned error"
            ),
            ForwardOutcome::MalformedUpstream => error!(
                kind = kind.endpoint(),
                "upstream deletion function returned non-JSON"
            ),
            ForwardOutcome::Transport(message) => error!(
                kind = kind.endpoint(),
                error = %message,
                "deletion proxy request failed"
            ),
        }

        outcome
    }
}

/// Forward one deletion request to `upstream_url` on behalf of the bearer in `headers`.
///
/// The upstream is never contacted when no subject can be read. The original
/// `Authorization` header is forwarded as-is. No retries: a failure after the
/// upstream already acted still reports as a local failure.
#[instrument(skip(client, headers))]
pub async fn forward_deletion(
    client: &Client,
    upstream_url: &str,
    headers: &HeaderMap,
) -> ForwardOutcome {
    let Some(user_id) = subject_from_headers(headers) else {
        return ForwardOutcome::Unauthorized;
    };

    let mut request = client
        .post(upstream_url)
        .header(CONTENT_TYPE, "application/json")
        .json(&DeletionRequest { user_id });

    if let Some(authorization) = headers.get(AUTHORIZATION) {
        request = request.header(AUTHORIZATION, authorization.clone());
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(err) => return ForwardOutcome::Transport(err.to_string()),
    };

    let status = response.status();
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(err) => return ForwardOutcome::Transport(err.to_string()),
    };

    // The body is parsed before the status is checked, so a 2xx without JSON is still malformed.
    let Ok(json) = serde_json::from_slice::<Value>(&body) else {
        return ForwardOutcome::MalformedUpstream;
    };

    if !status.is_success() {
        return ForwardOutcome::UpstreamError {
            status,
            message: upstream_error_message(&json),
        };
    }

    ForwardOutcome::Ok
}

fn upstream_error_message(json: &Value) -> String {
    match json.get("error") {
        Some(Value::String(message)) => message.clone(),
        Some(Value::Null) | None => FUNCTION_ERROR_MESSAGE.to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outcome_status_mapping() {
        assert_eq!(ForwardOutcome::Ok.status(), StatusCode::OK);
        assert_eq!(
            ForwardOutcome::Unauthorized.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ForwardOutcome::MalformedUpstream.status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ForwardOutcome::Transport("boom".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ForwardOutcome::UpstreamError {
                status: StatusCode::IM_A_TEAPOT,
                message: "tea".to_string(),
            }
            .status(),
            StatusCode::IM_A_TEAPOT
        );
    }

    #[test]
    fn empty_transport_message_falls_back() {
        let outcome = ForwardOutcome::Transport(String::new());
        assert_eq!(outcome.error_message(), Some(SERVER_ERROR_MESSAGE));
    }

    #[test]
    fn upstream_error_message_prefers_error_field() {
        assert_eq!(upstream_error_message(&json!({"error": "nope"})), "nope");
        assert_eq!(upstream_error_message(&json!({})), FUNCTION_ERROR_MESSAGE);
        assert_eq!(
            upstream_error_message(&json!({"error": null})),
            FUNCTION_ERROR_MESSAGE
        );
        assert_eq!(upstream_error_message(&json!([1, 2])), FUNCTION_ERROR_MESSAGE);
        assert_eq!(
            upstream_error_message(&json!({"error": {"code": 7}})),
            r#"{"code":7}"#
        );
    }

    #[test]
    fn proxy_rejects_non_http_urls() {
        let config = ProxyConfig::new().with_delete_data_url("ftp://example.com/x".to_string());
        assert!(DeletionProxy::new(config).is_err());

        let config = ProxyConfig::new().with_delete_account_url("not a url".to_string());
        assert!(DeletionProxy::new(config).is_err());
    }

    #[test]
    fn proxy_routes_kinds_to_their_urls() -> Result<()> {
        let proxy = DeletionProxy::new(ProxyConfig::default())?;
        assert_eq!(
            proxy.upstream_url(DeletionKind::Data),
            DEFAULT_DELETE_DATA_URL
        );
        assert_eq!(
            proxy.upstream_url(DeletionKind::Account),
            DEFAULT_DELETE_ACCOUNT_URL
        );
        Ok(())
    }
}
