use reqwest::StatusCode;
use thiserror::Error;

/// Failures reported by an identity provider.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid response from identity provider: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid identity provider URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("no PKCE code verifier stored for this sign-in")]
    MissingCodeVerifier,
    #[error("no active session")]
    NoSession,
}

/// Failures of a deletion request made from the signed-in view.
#[derive(Debug, Error)]
pub enum DeletionError {
    #[error("Please sign in first.")]
    NotSignedIn,
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_displays_message_only() {
        let err = AuthError::Rejected {
            status: StatusCode::BAD_REQUEST,
            message: "Token has expired or is invalid".to_string(),
        };
        assert_eq!(err.to_string(), "Token has expired or is invalid");
    }

    #[test]
    fn not_signed_in_message() {
        assert_eq!(DeletionError::NotSignedIn.to_string(), "Please sign in first.");
    }
}
