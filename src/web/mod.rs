//! Client-side sign-in and deletion flows.
//!
//! Everything here talks to an [`IdentityProvider`] passed in explicitly, so a
//! view can be driven against [`GoTrueClient`] in production and an in-process
//! provider in tests.

pub mod callback;
pub mod controller;
pub mod deletion;
pub mod error;
pub mod gotrue;
pub mod guard;
pub mod magic_link;
pub mod provider;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::api::handlers::deletion::DeletionKind;
pub use callback::{
    CallbackMount, CallbackPayload, CallbackResolver, CallbackState, DEFAULT_NEXT, Navigator,
    resolve_next,
};
pub use controller::SessionController;
pub use deletion::{DeletionCenter, DeletionOutcome};
pub use error::{AuthError, DeletionError};
pub use gotrue::GoTrueClient;
pub use guard::InFlight;
pub use magic_link::{MagicLinkOutcome, MagicLinkRequester, callback_redirect};
pub use provider::{IdentityProvider, SessionStore, SessionStream};
pub use types::{OtpKind, Session, User, ViewMode};
