//! Capability surface of an identity provider and the in-memory session store
//! implementations share.

use super::{
    error::AuthError,
    types::{OtpKind, Session},
};
use async_trait::async_trait;
use tokio::sync::watch;

/// Operations the sign-in, session and deletion flows need from an identity backend.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current session, if any.
    async fn get_session(&self) -> Result<Option<Session>, AuthError>;

    /// Session change notifications. The first item is the current value.
    fn subscribe(&self) -> SessionStream;

    /// Complete a PKCE sign-in started by [`IdentityProvider::sign_in_with_otp`].
    async fn exchange_code_for_session(&self, code: &str) -> Result<Session, AuthError>;

    async fn verify_otp(&self, token_hash: &str, kind: OtpKind) -> Result<Session, AuthError>;

    /// Adopt tokens delivered out of band (implicit flow fragment).
    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<Session, AuthError>;

    /// Email a one-time sign-in link that lands on `redirect_to`.
    async fn sign_in_with_otp(&self, email: &str, redirect_to: &str) -> Result<(), AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Latest-value session store with change notifications.
#[derive(Debug)]
pub struct SessionStore {
    tx: watch::Sender<Option<Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    #[must_use]
    pub fn get(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    /// Overwrite the stored session and notify subscribers.
    pub fn set(&self, session: Option<Session>) {
        self.tx.send_replace(session);
    }

    #[must_use]
    pub fn subscribe(&self) -> SessionStream {
        SessionStream::new(self.tx.subscribe())
    }
}

/// Stream of session values. Dropping it unsubscribes.
#[derive(Debug)]
pub struct SessionStream {
    rx: watch::Receiver<Option<Session>>,
    started: bool,
}

impl SessionStream {
    #[must_use]
    pub fn new(rx: watch::Receiver<Option<Session>>) -> Self {
        Self { rx, started: false }
    }

    /// Next session value, or `None` once the store is gone.
    ///
    /// The first call resolves immediately with the current value; later calls
    /// wait for a change. Intermediate values may be skipped, the latest always wins.
    pub async fn next(&mut self) -> Option<Option<Session>> {
        if self.started {
            self.rx.changed().await.ok()?;
        } else {
            self.started = true;
        }
        Some(self.rx.borrow_and_update().clone())
    }
}
