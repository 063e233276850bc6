//! Session tracking for the deletion page.

use super::{
    callback::DEFAULT_NEXT,
    deletion::{DeletionCenter, DeletionOutcome},
    guard::InFlight,
    magic_link::{MagicLinkOutcome, MagicLinkRequester, callback_redirect},
    provider::IdentityProvider,
    types::{Session, ViewMode},
};
use crate::api::handlers::deletion::DeletionKind;
use reqwest::Client;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::warn;
use url::Url;

pub const AUTH_FAILED_MESSAGE: &str = "Authentication failed. Please request a new link.";

/// Mounted deletion page: follows the provider's session until torn down.
pub struct SessionController {
    session: watch::Receiver<Option<Session>>,
    origin: String,
    initial_status: Option<String>,
    magic_link: MagicLinkRequester,
    deletion: DeletionCenter,
    active: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl SessionController {
    /// Mount on `page_url`. Must be called inside a tokio runtime.
    #[must_use]
    pub fn mount(provider: Arc<dyn IdentityProvider>, page_url: &Url, http: Client) -> Self {
        let (tx, rx) = watch::channel(None);
        let active = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(track(provider.clone(), tx, active.clone()));

        let initial_status = page_url
            .query_pairs()
            .any(|(key, _)| key == "error")
            .then(|| AUTH_FAILED_MESSAGE.to_string());

        let in_flight = InFlight::new();
        let mut site = page_url.clone();
        site.set_path("/");
        site.set_query(None);
        site.set_fragment(None);

        Self {
            session: rx,
            origin: page_url.origin().ascii_serialization(),
            initial_status,
            magic_link: MagicLinkRequester::new(provider.clone(), in_flight.clone()),
            deletion: DeletionCenter::new(http, site, provider, in_flight),
            active,
            task,
        }
    }

    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    #[must_use]
    pub fn mode(&self) -> ViewMode {
        ViewMode::from_session(self.session.borrow().as_ref())
    }

    /// Receiver that changes whenever the tracked session does.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Option<Session>> {
        self.session.clone()
    }

    /// Banner shown on arrival, set when a failed sign-in redirected back here.
    #[must_use]
    pub fn initial_status(&self) -> Option<&str> {
        self.initial_status.as_deref()
    }

    pub async fn request_magic_link(&self, email: &str) -> MagicLinkOutcome {
        let redirect_to = callback_redirect(&self.origin, DEFAULT_NEXT);
        self.magic_link.request(email, &redirect_to).await
    }

    pub async fn request_deletion(&self, kind: DeletionKind) -> DeletionOutcome {
        self.deletion.request(kind).await
    }

    pub fn teardown(self) {
        drop(self);
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        self.task.abort();
    }
}

async fn track(
    provider: Arc<dyn IdentityProvider>,
    tx: watch::Sender<Option<Session>>,
    active: Arc<AtomicBool>,
) {
    let mut stream = provider.subscribe();

    match provider.get_session().await {
        Ok(session) => {
            if active.load(Ordering::Acquire) {
                tx.send_replace(session);
            }
        }
        Err(err) => warn!("could not restore session: {err}"),
    }

    while let Some(session) = stream.next().await {
        if !active.load(Ordering::Acquire) {
            break;
        }
        tx.send_replace(session);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::web::testing::{MockProvider, session_for};
    use std::time::Duration;

    fn page(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn starts_signed_out_and_restores_session() {
        let provider =
            Arc::new(MockProvider::default().with_session(session_for("a@example.com", "t1")));
        let controller =
            SessionController::mount(provider, &page("https://pocketpanel.ai/delete"), Client::new());

        let mut rx = controller.watch();
        rx.wait_for(Option::is_some).await.unwrap();

        assert_eq!(
            controller.mode(),
            ViewMode::SignedIn {
                email: "a@example.com".to_string()
            }
        );
        assert_eq!(controller.initial_status(), None);
    }

    #[tokio::test]
    async fn every_notification_overwrites_session() {
        let provider = Arc::new(MockProvider::default());
        let controller = SessionController::mount(
            provider.clone(),
            &page("https://pocketpanel.ai/delete"),
            Client::new(),
        );
        settle().await;
        assert_eq!(controller.mode(), ViewMode::SignedOut);

        provider.store().set(Some(session_for("b@example.com", "t2")));
        let mut rx = controller.watch();
        rx.wait_for(Option::is_some).await.unwrap();
        assert_eq!(
            controller.mode(),
            ViewMode::SignedIn {
                email: "b@example.com".to_string()
            }
        );

        provider.store().set(None);
        rx.wait_for(Option::is_none).await.unwrap();
        assert_eq!(controller.mode(), ViewMode::SignedOut);
    }

    #[tokio::test]
    async fn teardown_stops_updates() {
        let provider = Arc::new(MockProvider::default());
        let controller = SessionController::mount(
            provider.clone(),
            &page("https://pocketpanel.ai/delete"),
            Client::new(),
        );
        settle().await;

        let rx = controller.watch();
        controller.teardown();

        provider.store().set(Some(session_for("c@example.com", "t3")));
        settle().await;
        assert!(rx.borrow().is_none());
    }

    #[tokio::test]
    async fn failed_restore_stays_signed_out() {
        let provider = Arc::new(MockProvider::default().failing_get_session("offline"));
        let controller =
            SessionController::mount(provider, &page("https://pocketpanel.ai/delete"), Client::new());
        settle().await;
        assert_eq!(controller.mode(), ViewMode::SignedOut);
    }

    #[tokio::test]
    async fn error_query_sets_initial_banner() {
        let provider = Arc::new(MockProvider::default());
        let controller = SessionController::mount(
            provider,
            &page("https://pocketpanel.ai/delete?error=access_denied"),
            Client::new(),
        );
        assert_eq!(controller.initial_status(), Some(AUTH_FAILED_MESSAGE));
    }

    #[tokio::test]
    async fn magic_link_redirects_through_callback() {
        let provider = Arc::new(MockProvider::default());
        let controller = SessionController::mount(
            provider.clone(),
            &page("https://pocketpanel.ai/delete?error=x#frag"),
            Client::new(),
        );

        let outcome = controller.request_magic_link("user@example.com").await;
        assert_eq!(outcome, MagicLinkOutcome::Sent);
        assert_eq!(
            provider.otp_requests(),
            vec![(
                "user@example.com".to_string(),
                "https://pocketpanel.ai/auth/callback?next=/delete".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn deletion_without_session_asks_to_sign_in() {
        let provider = Arc::new(MockProvider::default());
        let controller =
            SessionController::mount(provider, &page("https://pocketpanel.ai/delete"), Client::new());

        let outcome = controller.request_deletion(DeletionKind::Account).await;
        assert_eq!(outcome.message().as_deref(), Some("Please sign in first."));
    }
}
