//! API handlers for the deletion center.
//!
//! `auth` reads identity from bearer credentials, `deletion` proxies the two
//! destructive routes upstream and `health` reports build metadata.

pub mod auth;
pub mod deletion;
pub mod health;
