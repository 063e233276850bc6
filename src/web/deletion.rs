//! Deletion requests from the signed-in view.

use super::{error::DeletionError, guard::InFlight, provider::IdentityProvider};
use crate::api::handlers::deletion::DeletionKind;
use reqwest::{
    Client,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};
use url::Url;

pub const REQUEST_RECEIVED_MESSAGE: &str = "Request received. We’ll process it shortly.";

#[derive(Debug)]
pub enum DeletionOutcome {
    Accepted,
    Failed(DeletionError),
    /// Another action of the view is still running.
    Suppressed,
}

impl DeletionOutcome {
    /// Status line for the view, `None` when nothing changed.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Accepted => Some(REQUEST_RECEIVED_MESSAGE.to_string()),
            Self::Failed(DeletionError::NotSignedIn) => {
                Some(DeletionError::NotSignedIn.to_string())
            }
            Self::Failed(err) => Some(format!("Failed: {err}")),
            Self::Suppressed => None,
        }
    }

    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

#[derive(Clone)]
pub struct DeletionCenter {
    http: Client,
    site: Url,
    provider: Arc<dyn IdentityProvider>,
    in_flight: InFlight,
}

impl DeletionCenter {
    #[must_use]
    pub fn new(
        http: Client,
        site: Url,
        provider: Arc<dyn IdentityProvider>,
        in_flight: InFlight,
    ) -> Self {
        Self {
            http,
            site,
            provider,
            in_flight,
        }
    }

    /// Ask the proxy to delete the signed-in user's data or account.
    pub async fn request(&self, kind: DeletionKind) -> DeletionOutcome {
        let Some(_guard) = self.in_flight.try_acquire() else {
            return DeletionOutcome::Suppressed;
        };

        match self.send(kind).await {
            Ok(()) => {
                info!(kind = kind.endpoint(), "deletion request accepted");
                DeletionOutcome::Accepted
            }
            Err(err) => {
                if !matches!(err, DeletionError::NotSignedIn) {
                    error!(kind = kind.endpoint(), "deletion request failed: {err}");
                }
                DeletionOutcome::Failed(err)
            }
        }
    }

    async fn send(&self, kind: DeletionKind) -> Result<(), DeletionError> {
        let session = match self.provider.get_session().await {
            Ok(Some(session)) => session,
            Ok(None) => return Err(DeletionError::NotSignedIn),
            Err(err) => {
                warn!("could not read session: {err}");
                return Err(DeletionError::NotSignedIn);
            }
        };

        let url = self
            .site
            .join(&format!("/api/{}", kind.endpoint()))
            .map_err(|err| DeletionError::Transport(err.to_string()))?;

        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, session.bearer())
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|err| DeletionError::Transport(transport_message(&err.to_string())))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        let detail = failure_detail(&text).unwrap_or_else(|| {
            format!(
                "Error {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or_default()
            )
        });
        Err(DeletionError::Rejected(detail))
    }
}

/// `error`, then `message`, then the raw body.
fn failure_detail(text: &str) -> Option<String> {
    if let Ok(json) = serde_json::from_str::<Value>(text) {
        for key in ["error", "message"] {
            match json.get(key) {
                Some(Value::String(message)) => return Some(message.clone()),
                Some(Value::Null) | None => {}
                Some(other) => return Some(other.to_string()),
            }
        }
    }

    (!text.trim().is_empty()).then(|| text.to_string())
}

fn transport_message(message: &str) -> String {
    if message.trim().is_empty() {
        "Network error".to_string()
    } else {
        message.to_string()
    }
}
