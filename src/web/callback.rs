//! Completion of a sign-in redirect (`/auth/callback`).
//!
//! The callback URL carries one of three payloads. [`CallbackResolver::mount`]
//! picks it once, exchanges it for a session in a spawned task and redirects to
//! the requested page. Tearing the mount down before the exchange finishes
//! leaves the state untouched and skips the redirect, but the exchange itself
//! still runs to completion so the session is stored.

use super::{error::AuthError, provider::IdentityProvider, types::OtpKind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, error, info};
use url::{Url, form_urlencoded};

/// Landing page when the callback does not name a valid one.
pub const DEFAULT_NEXT: &str = "/delete";

pub const PENDING_MESSAGE: &str = "Signing you in…";
pub const NO_AUTH_PARAMETERS_MESSAGE: &str =
    "No auth parameters found. Please use the latest login link.";

/// Accept `next` only as a same-origin absolute path.
#[must_use]
pub fn resolve_next(next: Option<&str>) -> String {
    match next {
        Some(path)
            if path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\") =>
        {
            path.to_string()
        }
        _ => DEFAULT_NEXT.to_string(),
    }
}

/// Redirect payload, in the order it is looked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackPayload {
    Code {
        code: String,
    },
    TokenHash {
        token_hash: String,
        kind: OtpKind,
    },
    /// Legacy implicit flow: tokens in the URL fragment.
    Fragment {
        access_token: String,
        refresh_token: String,
    },
}

impl CallbackPayload {
    #[must_use]
    pub fn from_url(url: &Url) -> Option<Self> {
        let query = |name: &str| {
            url.query_pairs()
                .find(|(key, value)| key == name && !value.is_empty())
                .map(|(_, value)| value.into_owned())
        };

        if let Some(code) = query("code") {
            return Some(Self::Code { code });
        }

        if let Some(token_hash) = query("token_hash") {
            let kind = query("type")
                .and_then(|value| OtpKind::parse(&value))
                .unwrap_or_default();
            return Some(Self::TokenHash { token_hash, kind });
        }

        let fragment = url.fragment()?;
        if !fragment.contains("access_token=") {
            return None;
        }
        let param = |name: &str| {
            form_urlencoded::parse(fragment.as_bytes())
                .find(|(key, value)| key == name && !value.is_empty())
                .map(|(_, value)| value.into_owned())
        };
        Some(Self::Fragment {
            access_token: param("access_token")?,
            refresh_token: param("refresh_token")?,
        })
    }

    /// Exchange the payload for a session.
    ///
    /// # Errors
    /// Returns the provider's error when the exchange is rejected.
    pub async fn exchange(&self, provider: &dyn IdentityProvider) -> Result<(), AuthError> {
        let session = match self {
            Self::Code { code } => provider.exchange_code_for_session(code).await?,
            Self::TokenHash { token_hash, kind } => provider.verify_otp(token_hash, *kind).await?,
            Self::Fragment {
                access_token,
                refresh_token,
            } => provider.set_session(access_token, refresh_token).await?,
        };
        debug!(user = %session.user.id, "session established");
        Ok(())
    }

    const fn label(&self) -> &'static str {
        match self {
            Self::Code { .. } => "code",
            Self::TokenHash { .. } => "token_hash",
            Self::Fragment { .. } => "fragment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackState {
    Pending,
    Complete,
    Failed(String),
    NoAuthParameters,
}

impl CallbackState {
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Pending | Self::Complete => PENDING_MESSAGE.to_string(),
            Self::Failed(reason) => format!("Failed to complete sign-in: {reason}"),
            Self::NoAuthParameters => NO_AUTH_PARAMETERS_MESSAGE.to_string(),
        }
    }
}

/// Client-side navigation used after a successful sign-in.
pub trait Navigator: Send + Sync {
    /// Replace the current history entry with `path`.
    fn replace(&self, path: &str);
}

#[derive(Clone)]
pub struct CallbackResolver {
    provider: Arc<dyn IdentityProvider>,
    navigator: Arc<dyn Navigator>,
}

impl CallbackResolver {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            provider,
            navigator,
        }
    }

    /// Start resolving `url`. Must be called inside a tokio runtime.
    #[must_use]
    pub fn mount(&self, url: &Url) -> CallbackMount {
        let next = resolve_next(
            url.query_pairs()
                .find(|(key, _)| key == "next")
                .map(|(_, value)| value.into_owned())
                .as_deref(),
        );
        let payload = CallbackPayload::from_url(url);

        let (tx, rx) = watch::channel(CallbackState::Pending);
        let teardown = Teardown::default();

        // Detached: teardown silences the task but never stops the exchange.
        tokio::spawn(resolve(
            self.provider.clone(),
            self.navigator.clone(),
            payload,
            next,
            tx,
            teardown.clone(),
        ));

        CallbackMount {
            state: rx,
            teardown,
        }
    }
}

async fn resolve(
    provider: Arc<dyn IdentityProvider>,
    navigator: Arc<dyn Navigator>,
    payload: Option<CallbackPayload>,
    next: String,
    tx: watch::Sender<CallbackState>,
    teardown: Teardown,
) {
    let Some(payload) = payload else {
        teardown.unless_torn_down(|| {
            debug!("callback without auth parameters");
            tx.send_replace(CallbackState::NoAuthParameters);
        });
        return;
    };

    let result = payload.exchange(provider.as_ref()).await;

    let published = teardown.unless_torn_down(|| match &result {
        Ok(()) => {
            info!(payload = payload.label(), next = %next, "sign-in complete");
            tx.send_replace(CallbackState::Complete);
            navigator.replace(&next);
        }
        Err(err) => {
            error!(payload = payload.label(), "sign-in failed: {err}");
            tx.send_replace(CallbackState::Failed(err.to_string()));
        }
    });

    if !published {
        debug!(
            payload = payload.label(),
            ok = result.is_ok(),
            "callback finished after teardown"
        );
    }
}

/// Teardown flag. The lock is held while a result is published, so teardown
/// either happens before the state change and redirect or after both.
#[derive(Clone, Default)]
struct Teardown(Arc<Mutex<bool>>);

impl Teardown {
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self) {
        *self.lock() = true;
    }

    /// Run `publish` unless torn down. Returns whether it ran.
    fn unless_torn_down(&self, publish: impl FnOnce()) -> bool {
        let torn_down = self.lock();
        if *torn_down {
            return false;
        }
        publish();
        true
    }
}

/// A running callback resolution. Dropping it silences the resolution; an
/// exchange already sent to the provider still completes.
pub struct CallbackMount {
    state: watch::Receiver<CallbackState>,
    teardown: Teardown,
}

impl CallbackMount {
    #[must_use]
    pub fn state(&self) -> CallbackState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn watch(&self) -> watch::Receiver<CallbackState> {
        self.state.clone()
    }

    /// Wait until the resolution leaves `Pending`.
    pub async fn settled(&mut self) -> CallbackState {
        if self
            .state
            .wait_for(|state| *state != CallbackState::Pending)
            .await
            .is_err()
        {
            debug!("callback task ended without settling");
        }
        self.state()
    }

    pub fn teardown(self) {
        drop(self);
    }
}

impl Drop for CallbackMount {
    fn drop(&mut self) {
        self.teardown.set();
    }
}
