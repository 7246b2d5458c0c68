//! Bearer-token authentication against an external identity provider.
//!
//! The service never manages credentials itself; it only asks the identity
//! provider who a presented access token belongs to. Both the REST handlers
//! and the WebSocket gateway authenticate through [`AuthVerifier`] before any
//! session work happens.

use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::Deserialize;
use tracing::warn;

/// The authenticated identity resolved from a bearer token.
#[derive(Deserialize, Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Unauthorized: missing Bearer token")]
    MissingToken,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("identity provider request failed: {0}")]
    Provider(#[source] anyhow::Error),
}

/// Validates bearer tokens against an identity provider.
#[async_trait]
pub trait AuthVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError>;
}

/// An `AuthVerifier` backed by a Supabase-style GoTrue endpoint
/// (`GET {base}/auth/v1/user` with the token as a bearer credential).
pub struct IdentityProviderClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl IdentityProviderClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl AuthVerifier for IdentityProviderClient {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.into()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AuthError::InvalidToken);
        }
        if !response.status().is_success() {
            warn!(status = %response.status(), "Unexpected identity provider response");
            return Err(AuthError::Provider(anyhow::anyhow!(
                "identity provider returned {}",
                response.status()
            )));
        }

        response
            .json::<AuthUser>()
            .await
            .map_err(|e| AuthError::Provider(e.into()))
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
