use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity record attached to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated session as held by the identity provider.
#[derive(Clone)]
pub struct Session {
    access_token: SecretString,
    refresh_token: SecretString,
    pub expires_in: Option<i64>,
    pub expires_at: Option<i64>,
    pub token_type: Option<String>,
    pub user: User,
}

impl Session {
    #[must_use]
    pub fn new(access_token: String, refresh_token: String, user: User) -> Self {
        Self {
            access_token: SecretString::from(access_token),
            refresh_token: SecretString::from(refresh_token),
            expires_in: None,
            expires_at: None,
            token_type: None,
            user,
        }
    }

    #[must_use]
    pub fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    #[must_use]
    pub fn refresh_token(&self) -> &SecretString {
        &self.refresh_token
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.user.email.as_deref()
    }

    /// `Authorization` header value for calls made on behalf of this session.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token.expose_secret())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .field("user", &self.user)
            .finish()
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.access_token.expose_secret() == other.access_token.expose_secret()
            && self.refresh_token.expose_secret() == other.refresh_token.expose_secret()
            && self.user == other.user
    }
}

/// One-time token kinds accepted by `verify_otp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpKind {
    #[default]
    Magiclink,
    Signup,
    Invite,
    Recovery,
    EmailChange,
    Email,
}

impl OtpKind {
    /// Parse the `type` query parameter of a callback URL.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "magiclink" => Some(Self::Magiclink),
            "signup" => Some(Self::Signup),
            "invite" => Some(Self::Invite),
            "recovery" => Some(Self::Recovery),
            "email_change" => Some(Self::EmailChange),
            "email" => Some(Self::Email),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Magiclink => "magiclink",
            Self::Signup => "signup",
            Self::Invite => "invite",
            Self::Recovery => "recovery",
            Self::EmailChange => "email_change",
            Self::Email => "email",
        }
    }
}

/// What the deletion page renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewMode {
    SignedOut,
    SignedIn { email: String },
}

impl ViewMode {
    #[must_use]
    pub fn from_session(session: Option<&Session>) -> Self {
        match session {
            Some(session) => Self::SignedIn {
                email: session.email().unwrap_or_default().to_string(),
            },
            None => Self::SignedOut,
        }
    }
}
