use std::fmt::{Debug, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated user as known to the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    id: String,
    email: Option<String>,
    display_name: Option<String>,
    avatar_url: Option<String>,
}

impl UserIdentity {
    /// Creates an identity from the provider's opaque user id and email.
    #[must_use]
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            id: id.into(),
            email,
            display_name: None,
            avatar_url: None,
        }
    }

    /// Attaches provider metadata to the identity.
    #[must_use]
    pub fn with_metadata(mut self, display_name: Option<String>, avatar_url: Option<String>) -> Self {
        self.display_name = display_name;
        self.avatar_url = avatar_url;
        self
    }

    /// Returns the stable provider user id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the email, if the provider returned one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the display name from provider metadata.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Returns the avatar URL from provider metadata.
    #[must_use]
    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar_url.as_deref()
    }
}

/// Token-backed proof that an identity is currently authenticated.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    identity: UserIdentity,
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session from provider tokens.
    #[must_use]
    pub fn new(
        identity: UserIdentity,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            identity,
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
        }
    }

    /// Returns the identity bound to this session.
    #[must_use]
    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    /// Returns the bearer token used for backend calls.
    #[must_use]
    pub fn access_token(&self) -> &str {
        self.access_token.as_str()
    }

    /// Returns the token exchanged for a fresh session.
    #[must_use]
    pub fn refresh_token(&self) -> &str {
        self.refresh_token.as_str()
    }

    /// Returns the instant after which the access token is rejected.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns whether the session has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl Debug for Session {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Session")
            .field("identity", &self.identity)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{Session, UserIdentity};

    #[test]
    fn session_debug_output_omits_tokens() {
        let session = Session::new(
            UserIdentity::new("user-1", None),
            "secret-access",
            "secret-refresh",
            Utc::now(),
        );

        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-refresh"));
    }

    #[test]
    fn session_expires_at_boundary() {
        let now = Utc::now();
        let session = Session::new(UserIdentity::new("user-1", None), "a", "r", now);

        assert!(session.is_expired_at(now));
        assert!(!session.is_expired_at(now - Duration::seconds(1)));
    }
}
