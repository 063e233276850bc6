//! # Deletion Center
//!
//! `deletion-center` backs the self-service data deletion page of the Pocket
//! Panel support site. A signed-in user can either wipe their data while
//! keeping the login, or delete the account together with all data.
//!
//! ## Server (`api`)
//!
//! Two proxy routes, `POST /api/delete-data` and `POST /api/delete-account`,
//! read the subject (`sub`) from the caller's bearer credential and forward
//! `{ "user_id": <sub> }` to the matching upstream deletion function. The
//! original `Authorization` header is forwarded verbatim; the upstream
//! function is the party that verifies the credential's signature and
//! expiry; this service only routes.
//!
//! Every response is one of:
//!
//! - `200 {"ok": true}`
//! - `401 {"error": "Unauthorized"}` when no subject could be read
//! - upstream status with `{"error": ...}` when the function rejects
//! - `502 {"error": "Function returned non-JSON"}` for malformed upstream bodies
//! - `500 {"error": ...}` for transport failures
//!
//! ## Client flows (`web`)
//!
//! Passwordless sign-in (magic link, PKCE code exchange, token-hash
//! verification and the legacy implicit fragment), session tracking for a
//! view and the deletion request itself, written against an
//! [`web::IdentityProvider`] so any identity backend can be plugged in. A
//! GoTrue-compatible HTTP client ships as the default provider.

pub mod api;
pub mod cli;
pub mod web;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
