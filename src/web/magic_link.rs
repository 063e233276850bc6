//! Passwordless sign-in requests.

use super::{guard::InFlight, provider::IdentityProvider};
use std::sync::Arc;
use tracing::{debug, error};

pub const LINK_SENT_MESSAGE: &str = "Check your email for a sign-in link.";

/// Redirect target embedded in the emailed link.
#[must_use]
pub fn callback_redirect(origin: &str, next: &str) -> String {
    format!("{}/auth/callback?next={next}", origin.trim_end_matches('/'))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MagicLinkOutcome {
    Sent,
    Failed(String),
    /// Nothing was dispatched: empty email or another action in flight.
    Suppressed,
}

impl MagicLinkOutcome {
    /// Status line for the view, `None` when nothing changed.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Sent => Some(LINK_SENT_MESSAGE.to_string()),
            Self::Failed(reason) => Some(format!("Error sending link: {reason}")),
            Self::Suppressed => None,
        }
    }
}

#[derive(Clone)]
pub struct MagicLinkRequester {
    provider: Arc<dyn IdentityProvider>,
    in_flight: InFlight,
}

impl MagicLinkRequester {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, in_flight: InFlight) -> Self {
        Self {
            provider,
            in_flight,
        }
    }

    /// Ask the provider to email a sign-in link landing on `redirect_to`.
    pub async fn request(&self, email: &str, redirect_to: &str) -> MagicLinkOutcome {
        let email = email.trim();
        if email.is_empty() {
            return MagicLinkOutcome::Suppressed;
        }

        let Some(_guard) = self.in_flight.try_acquire() else {
            debug!("magic link request suppressed, another action is in flight");
            return MagicLinkOutcome::Suppressed;
        };

        match self.provider.sign_in_with_otp(email, redirect_to).await {
            Ok(()) => MagicLinkOutcome::Sent,
            Err(err) => {
                error!("magic link request failed: {err}");
                MagicLinkOutcome::Failed(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::testing::MockProvider;
    use std::time::Duration;

    #[test]
    fn redirect_points_at_callback() {
        assert_eq!(
            callback_redirect("https://pocketpanel.ai/", "/delete"),
            "https://pocketpanel.ai/auth/callback?next=/delete"
        );
    }

    #[tokio::test]
    async fn sends_link_with_trimmed_email() {
        let provider = Arc::new(MockProvider::default());
        let requester = MagicLinkRequester::new(provider.clone(), InFlight::new());

        let outcome = requester
            .request("  user@example.com ", "https://pocketpanel.ai/auth/callback?next=/delete")
            .await;

        assert_eq!(outcome, MagicLinkOutcome::Sent);
        assert_eq!(outcome.message().as_deref(), Some(LINK_SENT_MESSAGE));
        assert_eq!(
            provider.otp_requests(),
            vec![(
                "user@example.com".to_string(),
                "https://pocketpanel.ai/auth/callback?next=/delete".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn empty_email_dispatches_nothing() {
        let provider = Arc::new(MockProvider::default());
        let requester = MagicLinkRequester::new(provider.clone(), InFlight::new());

        assert_eq!(
            requester.request("   ", "/x").await,
            MagicLinkOutcome::Suppressed
        );
        assert!(provider.otp_requests().is_empty());
    }

    #[tokio::test]
    async fn failure_reports_reason() {
        let provider = Arc::new(MockProvider::default().failing_otp("rate limit exceeded"));
        let requester = MagicLinkRequester::new(provider, InFlight::new());

        let outcome = requester.request("user@example.com", "/x").await;
        assert_eq!(
            outcome.message().as_deref(),
            Some("Error sending link: rate limit exceeded")
        );
    }

    #[tokio::test]
    async fn concurrent_requests_dispatch_once() {
        let provider = Arc::new(MockProvider::default().with_delay(Duration::from_millis(100)));
        let requester = MagicLinkRequester::new(provider.clone(), InFlight::new());

        let (first, second) = tokio::join!(
            requester.request("user@example.com", "/x"),
            requester.request("user@example.com", "/x"),
        );

        let outcomes = [first, second];
        assert!(outcomes.contains(&MagicLinkOutcome::Sent));
        assert!(outcomes.contains(&MagicLinkOutcome::Suppressed));
        assert_eq!(provider.otp_requests().len(), 1);
    }
}
