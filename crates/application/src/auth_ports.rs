use std::fmt::{Display, Formatter};
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strollup_core::{AppError, AuthError, Session};

/// Identity providers offered for redirect-based sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OAuthProvider {
    /// Google accounts.
    Google,
    /// GitHub accounts.
    Github,
}

impl OAuthProvider {
    /// Returns the provider key understood by the hosted auth service.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
        }
    }
}

impl Display for OAuthProvider {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for OAuthProvider {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "google" => Ok(Self::Google),
            "github" => Ok(Self::Github),
            _ => Err(AppError::Validation(format!(
                "unsupported oauth provider '{value}'"
            ))),
        }
    }
}

/// Where the browser must go to continue an OAuth sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthRedirect {
    /// Provider being used.
    pub provider: OAuthProvider,
    /// Absolute authorization URL.
    pub authorize_url: String,
}

/// Tokens handed back by the provider's OAuth callback.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthCallback {
    /// Bearer token for the new session.
    pub access_token: String,
    /// Refresh token for the new session.
    pub refresh_token: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
}

impl std::fmt::Debug for OAuthCallback {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("OAuthCallback")
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Port for the hosted auth provider.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Returns a session persisted by an earlier run, if any.
    async fn resume_session(&self) -> Result<Option<Session>, AuthError>;

    /// Exchanges an email and password for a session.
    async fn sign_in_with_password(&self, email: &str, password: &str)
    -> Result<Session, AuthError>;

    /// Returns the authorization URL that starts a redirect-based sign-in.
    async fn authorize_url(&self, provider: OAuthProvider) -> Result<OAuthRedirect, AuthError>;

    /// Turns callback tokens into a session by looking up their identity.
    async fn complete_oauth(&self, callback: OAuthCallback) -> Result<Session, AuthError>;

    /// Exchanges a refresh token for a fresh session.
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError>;

    /// Revokes the session remotely.
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    /// Stores the session current after a transition for
    /// [`Self::resume_session`]; `None` forgets it. Only the session store
    /// calls this, and only for transitions it applied.
    async fn persist_session(&self, _session: Option<&Session>) {}
}

/// Source of the bearer token attached to backend record calls.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// Returns the current access token, if signed in.
    async fn access_token(&self) -> Option<String>;
}
