//! Bearer credential parsing.
//!
//! Reads the `sub` claim out of a `header.claims.signature` token. Any failure
//! (missing header, wrong scheme, bad base64, bad JSON, missing or non-string
//! `sub`) means "no identity"; nothing here panics or propagates an error to
//! the caller of [`subject_from_headers`].

use axum::http::{HeaderMap, header::AUTHORIZATION};
use base64ct::{Base64Unpadded, Encoding};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Error)]
pub enum ClaimsError {
    #[error("invalid base64 in claims segment")]
    Base64,
    #[error("claims segment is not valid json")]
    Json(#[from] serde_json::Error),
    #[error("claims have no string `sub`")]
    MissingSubject,
}

/// Return the raw token after the `Bearer ` prefix, if present.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
}

/// Extract the subject identifier from the request's bearer credential.
///
/// Returns `None` when the credential is absent or unreadable. Decode failures
/// are logged at debug level with the failure kind only; the token itself is
/// never logged.
#[must_use]
pub fn subject_from_headers(headers: &HeaderMap) -> Option<String> {
    let token = bearer_token(headers)?;

    match subject_from_token(token) {
        Ok(subject) => Some(subject),
        Err(err) => {
            debug!(reason = %err, "bearer credential carries no usable subject");
            None
        }
    }
}

/// Decode the claims segment of `token` and return its `sub`.
///
/// # Errors
/// Returns an error if the claims segment is missing, is not base64, is not
/// JSON, or has no non-empty string `sub`.
pub fn subject_from_token(token: &str) -> Result<String, ClaimsError> {
    // A missing segment decodes as empty input, which then fails as JSON.
    let segment = token.split('.').nth(1).unwrap_or_default();
    let bytes = decode_segment(segment)?;
    let claims: Value = serde_json::from_slice(&bytes)?;

    claims
        .get("sub")
        .and_then(Value::as_str)
        .filter(|sub| !sub.is_empty())
        .map(str::to_string)
        .ok_or(ClaimsError::MissingSubject)
}

// Tokens are normally base64url without padding, but standard-alphabet and padded
// segments are accepted as well.
fn decode_segment(segment: &str) -> Result<Vec<u8>, ClaimsError> {
    let normalized: String = segment
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    Base64Unpadded::decode_vec(&normalized).map_err(|_| ClaimsError::Base64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use base64ct::{Base64, Base64UrlUnpadded};
    use serde_json::json;

    fn token_with_claims(claims: &Value) -> String {
        let header = Base64UrlUnpadded::encode_string(br#"{"alg":"HS256","typ":"JWT"}"#);
        let claims = Base64UrlUnpadded::encode_string(claims.to_string().as_bytes());
        format!("{header}.{claims}.signature")
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    #[test]
    fn well_formed_token_yields_subject() {
        let token = token_with_claims(&json!({"sub": "abc123"}));
        let headers = headers_with(&format!("Bearer {token}"));
        assert_eq!(subject_from_headers(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn missing_header_yields_none() {
        assert_eq!(subject_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn other_schemes_yield_none() {
        let token = token_with_claims(&json!({"sub": "abc123"}));
        for value in [
            format!("Basic {token}"),
            format!("bearer {token}"),
            format!("Bearer{token}"),
            token.clone(),
        ] {
            assert_eq!(subject_from_headers(&headers_with(&value)), None, "{value}");
        }
    }

    #[test]
    fn garbage_claims_yield_none() {
        for value in [
            "Bearer ",
            "Bearer onlyonesegment",
            "Bearer a.!!!not-base64!!!.c",
            "Bearer a.bm90IGpzb24.c",
            "Bearer a..c",
        ] {
            assert_eq!(subject_from_headers(&headers_with(value)), None, "{value}");
        }
    }

    #[test]
    fn claims_without_string_subject_yield_none() {
        for claims in [
            json!({}),
            json!({"sub": 42}),
            json!({"sub": null}),
            json!({"sub": ""}),
            json!(["sub"]),
            json!("abc123"),
        ] {
            let token = token_with_claims(&claims);
            assert!(
                matches!(
                    subject_from_token(&token),
                    Err(ClaimsError::MissingSubject)
                ),
                "{claims}"
            );
        }
    }

    #[test]
    fn padded_standard_alphabet_is_accepted() {
        let claims = json!({"sub": "user-1", "note": "??>>??"}).to_string();
        let segment = Base64::encode_string(claims.as_bytes());
        let token = format!("header.{segment}.sig");
        assert_eq!(subject_from_token(&token).ok(), Some("user-1".to_string()));
    }

    #[test]
    fn signature_and_expiry_are_not_checked() {
        let token = token_with_claims(&json!({"sub": "abc123", "exp": 1}));
        let token = token.replace("signature", "definitely-not-a-signature");
        assert_eq!(subject_from_token(&token).ok(), Some("abc123".to_string()));
    }

    #[test]
    fn bearer_token_strips_prefix() {
        let headers = headers_with("Bearer a.b.c");
        assert_eq!(bearer_token(&headers), Some("a.b.c"));
    }
}
