//! GoTrue-compatible identity provider over HTTP.
//!
//! Sessions live in memory for the lifetime of the client. Magic links use the
//! PKCE flow: the verifier is generated when the link is requested and consumed
//! by the code exchange on the callback.

use super::{
    error::AuthError,
    provider::{IdentityProvider, SessionStore, SessionStream},
    types::{OtpKind, Session, User},
};
use async_trait::async_trait;
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use url::Url;

const API_PREFIX: &str = "auth/v1/";
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    token_type: Option<String>,
    user: User,
}

impl From<TokenResponse> for Session {
    fn from(response: TokenResponse) -> Self {
        let mut session = Self::new(response.access_token, response.refresh_token, response.user);
        session.expires_in = response.expires_in;
        session.expires_at = response.expires_at;
        session.token_type = response.token_type;
        session
    }
}

/// PKCE verifier and its S256 challenge.
struct Pkce {
    verifier: SecretString,
    challenge: String,
}

impl Pkce {
    fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        let verifier = Base64UrlUnpadded::encode_string(&bytes);
        let challenge = pkce_challenge(&verifier);
        Self {
            verifier: SecretString::from(verifier),
            challenge,
        }
    }
}

fn pkce_challenge(verifier: &str) -> String {
    Base64UrlUnpadded::encode_string(&Sha256::digest(verifier.as_bytes()))
}

pub struct GoTrueClient {
    http: Client,
    base: Url,
    anon_key: SecretString,
    store: SessionStore,
    code_verifier: Mutex<Option<SecretString>>,
}

impl GoTrueClient {
    /// Client for the project at `project_url` (for example `https://auth.example.com`).
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(project_url: &str, anon_key: SecretString) -> Result<Self, AuthError> {
        let mut root = Url::parse(project_url)?;
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }
        let base = root.join(API_PREFIX)?;

        let http = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            http,
            base,
            anon_key,
            store: SessionStore::new(),
            code_verifier: Mutex::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        Ok(self.base.join(path)?)
    }

    fn with_api_key(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", self.anon_key.expose_secret())
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<Session, AuthError> {
        let mut url = self.endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let response = self
            .with_api_key(self.http.post(url))
            .json(&body)
            .send()
            .await?;
        let session = session_from(response).await?;
        self.store.set(Some(session.clone()));
        Ok(session)
    }

    async fn fetch_user(&self, access_token: &str) -> Result<Option<User>, AuthError> {
        let response = self
            .with_api_key(self.http.get(self.endpoint("user")?))
            .bearer_auth(access_token)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        let body = success_body(response).await?;
        Ok(Some(serde_json::from_slice(&body)?))
    }
}

async fn success_body(response: Response) -> Result<Vec<u8>, AuthError> {
    let status = response.status();
    let body = response.bytes().await?;
    if status.is_success() {
        Ok(body.to_vec())
    } else {
        Err(AuthError::Rejected {
            status,
            message: rejection_message(status, &body),
        })
    }
}

async fn session_from(response: Response) -> Result<Session, AuthError> {
    let body = success_body(response).await?;
    let token: TokenResponse = serde_json::from_slice(&body)?;
    Ok(token.into())
}

fn rejection_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(json) = serde_json::from_slice::<Value>(body) {
        for key in ["error_description", "msg", "message", "error"] {
            if let Some(message) = json.get(key).and_then(Value::as_str) {
                if !message.is_empty() {
                    return message.to_string();
                }
            }
        }
    }

    let text = String::from_utf8_lossy(body);
    if text.trim().is_empty() {
        status
            .canonical_reason()
            .map_or_else(|| status.to_string(), str::to_string)
    } else {
        text.trim().to_string()
    }
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.store.get())
    }

    fn subscribe(&self) -> SessionStream {
        self.store.subscribe()
    }

    #[instrument(skip(self, code))]
    async fn exchange_code_for_session(&self, code: &str) -> Result<Session, AuthError> {
        let verifier = self
            .code_verifier
            .lock()
            .await
            .take()
            .ok_or(AuthError::MissingCodeVerifier)?;

        self.token_grant(
            "pkce",
            json!({
                "auth_code": code,
                "code_verifier": verifier.expose_secret(),
            }),
        )
        .await
    }

    #[instrument(skip(self, token_hash))]
    async fn verify_otp(&self, token_hash: &str, kind: OtpKind) -> Result<Session, AuthError> {
        let response = self
            .with_api_key(self.http.post(self.endpoint("verify")?))
            .json(&json!({
                "type": kind.as_str(),
                "token_hash": token_hash,
            }))
            .send()
            .await?;

        let session = session_from(response).await?;
        self.store.set(Some(session.clone()));
        Ok(session)
    }

    #[instrument(skip_all)]
    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<Session, AuthError> {
        if let Some(user) = self.fetch_user(access_token).await? {
            let session = Session::new(access_token.to_string(), refresh_token.to_string(), user);
            self.store.set(Some(session.clone()));
            return Ok(session);
        }

        debug!("access token rejected, refreshing session");
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    #[instrument(skip(self, email))]
    async fn sign_in_with_otp(&self, email: &str, redirect_to: &str) -> Result<(), AuthError> {
        let pkce = Pkce::generate();

        let mut url = self.endpoint("otp")?;
        url.query_pairs_mut().append_pair("redirect_to", redirect_to);

        let response = self
            .with_api_key(self.http.post(url))
            .json(&json!({
                "email": email,
                "create_user": true,
                "code_challenge": pkce.challenge,
                "code_challenge_method": "s256",
            }))
            .send()
            .await?;
        success_body(response).await?;

        *self.code_verifier.lock().await = Some(pkce.verifier);
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(session) = self.store.get() else {
            return Ok(());
        };
        self.store.set(None);

        let result = match self.endpoint("logout") {
            Ok(url) => self
                .with_api_key(self.http.post(url))
                .bearer_auth(session.access_token().expose_secret())
                .send()
                .await
                .map_err(AuthError::from),
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            warn!("remote sign-out failed: {err}");
        }
        Ok(())
    }
}
