//! In-process identity provider for exercising the client flows.

#![allow(clippy::unwrap_used)]

use super::{
    error::AuthError,
    provider::{IdentityProvider, SessionStore, SessionStream},
    types::{OtpKind, Session, User},
};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::sync::Notify;

#[derive(Default)]
pub struct MockProvider {
    store: SessionStore,
    calls: Mutex<Vec<String>>,
    otp_requests: Mutex<Vec<(String, String)>>,
    otp_error: Option<String>,
    exchange_error: Option<String>,
    session_error: Option<String>,
    delay: Option<Duration>,
    gate: Option<Arc<Notify>>,
}

pub fn session_for(email: &str, access_token: &str) -> Session {
    Session::new(
        access_token.to_string(),
        format!("refresh-{access_token}"),
        User {
            id: format!("id-{email}"),
            email: Some(email.to_string()),
        },
    )
}

impl MockProvider {
    pub fn with_session(self, session: Session) -> Self {
        self.store.set(Some(session));
        self
    }

    pub fn failing_otp(mut self, message: &str) -> Self {
        self.otp_error = Some(message.to_string());
        self
    }

    pub fn failing_exchange(mut self, message: &str) -> Self {
        self.exchange_error = Some(message.to_string());
        self
    }

    pub fn failing_get_session(mut self, message: &str) -> Self {
        self.session_error = Some(message.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Exchanges block until the returned handle is notified.
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn otp_requests(&self) -> Vec<(String, String)> {
        self.otp_requests.lock().unwrap().clone()
    }

    async fn pause(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    async fn establish(&self, call: String, access_token: &str) -> Result<Session, AuthError> {
        self.calls.lock().unwrap().push(call);
        self.pause().await;
        if let Some(message) = &self.exchange_error {
            return Err(rejected(message));
        }
        let session = session_for("user@example.com", access_token);
        self.store.set(Some(session.clone()));
        Ok(session)
    }
}

fn rejected(message: &str) -> AuthError {
    AuthError::Rejected {
        status: StatusCode::BAD_REQUEST,
        message: message.to_string(),
    }
}

#[async_trait]
impl IdentityProvider for MockProvider {
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        if let Some(message) = &self.session_error {
            return Err(rejected(message));
        }
        Ok(self.store.get())
    }

    fn subscribe(&self) -> SessionStream {
        self.store.subscribe()
    }

    async fn exchange_code_for_session(&self, code: &str) -> Result<Session, AuthError> {
        self.establish(format!("exchange:{code}"), "access-code").await
    }

    async fn verify_otp(&self, token_hash: &str, kind: OtpKind) -> Result<Session, AuthError> {
        self.establish(format!("verify:{token_hash}:{}", kind.as_str()), "access-otp")
            .await
    }

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<Session, AuthError> {
        self.establish(
            format!("set_session:{access_token}:{refresh_token}"),
            access_token,
        )
        .await
    }

    async fn sign_in_with_otp(&self, email: &str, redirect_to: &str) -> Result<(), AuthError> {
        self.otp_requests
            .lock()
            .unwrap()
            .push((email.to_string(), redirect_to.to_string()));
        self.pause().await;
        match &self.otp_error {
            Some(message) => Err(rejected(message)),
            None => Ok(()),
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.store.set(None);
        Ok(())
    }
}
