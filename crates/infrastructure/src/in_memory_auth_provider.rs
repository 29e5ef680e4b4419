use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use strollup_application::{AuthProvider, OAuthCallback, OAuthProvider, OAuthRedirect};
use strollup_core::{AuthError, Session, UserIdentity};
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::Argon2PasswordDigest;

struct Account {
    identity: UserIdentity,
    password_hash: String,
}

struct IssuedTokens {
    identity: UserIdentity,
    refresh_token: String,
}

/// Auth provider keeping accounts and tokens in process memory.
///
/// OAuth sign-ins are simulated: the authorization URL points straight at
/// the redirect target with freshly issued tokens in the fragment.
pub struct InMemoryAuthProvider {
    digest: Argon2PasswordDigest,
    redirect_url: Url,
    session_ttl: Duration,
    accounts: RwLock<HashMap<String, Account>>,
    access_tokens: RwLock<HashMap<String, IssuedTokens>>,
    refresh_tokens: RwLock<HashMap<String, UserIdentity>>,
}

impl InMemoryAuthProvider {
    /// Creates a provider without accounts.
    #[must_use]
    pub fn new(redirect_url: Url) -> Self {
        Self {
            digest: Argon2PasswordDigest::new(),
            redirect_url,
            session_ttl: Duration::hours(1),
            accounts: RwLock::new(HashMap::new()),
            access_tokens: RwLock::new(HashMap::new()),
            refresh_tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Overrides the lifetime of issued access tokens.
    #[must_use]
    pub fn with_session_ttl(mut self, session_ttl: Duration) -> Self {
        self.session_ttl = session_ttl;
        self
    }

    /// Registers an account and returns its identity.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<String>,
    ) -> Result<UserIdentity, AuthError> {
        let email = email.trim().to_lowercase();
        let identity = UserIdentity::new(Uuid::new_v4().to_string(), Some(email.clone()))
            .with_metadata(display_name, None);
        let password_hash = self.digest.hash(password)?;

        self.accounts.write().await.insert(
            email,
            Account {
                identity: identity.clone(),
                password_hash,
            },
        );
        Ok(identity)
    }

    async fn issue(&self, identity: UserIdentity) -> Session {
        let access_token = Uuid::new_v4().to_string();
        let refresh_token = Uuid::new_v4().to_string();

        self.access_tokens.write().await.insert(
            access_token.clone(),
            IssuedTokens {
                identity: identity.clone(),
                refresh_token: refresh_token.clone(),
            },
        );
        self.refresh_tokens
            .write()
            .await
            .insert(refresh_token.clone(), identity.clone());

        Session::new(
            identity,
            access_token,
            refresh_token,
            Utc::now() + self.session_ttl,
        )
    }

    async fn oauth_identity(&self, provider: OAuthProvider) -> UserIdentity {
        let email = format!("{provider}-user@strollup.local");
        if let Some(account) = self.accounts.read().await.get(&email) {
            return account.identity.clone();
        }

        UserIdentity::new(format!("{provider}-user"), Some(email))
            .with_metadata(Some(format!("{provider} user")), None)
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuthProvider {
    async fn resume_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(None)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let identity = {
            let accounts = self.accounts.read().await;
            let Some(account) = accounts.get(&email.trim().to_lowercase()) else {
                return Err(AuthError::InvalidCredentials);
            };
            if !self.digest.verify(password, &account.password_hash)? {
                return Err(AuthError::InvalidCredentials);
            }
            account.identity.clone()
        };

        Ok(self.issue(identity).await)
    }

    async fn authorize_url(&self, provider: OAuthProvider) -> Result<OAuthRedirect, AuthError> {
        let session = self.issue(self.oauth_identity(provider).await).await;
        let expires_in = self.session_ttl.num_seconds().to_string();

        let mut fragment = Url::parse("memory://callback")
            .map_err(|error| AuthError::Provider(error.to_string()))?;
        fragment
            .query_pairs_mut()
            .append_pair("access_token", session.access_token())
            .append_pair("refresh_token", session.refresh_token())
            .append_pair("expires_in", &expires_in)
            .append_pair("provider", provider.as_str());

        let mut authorize_url = self.redirect_url.clone();
        authorize_url.set_fragment(fragment.query());
        debug!(%provider, "issued simulated OAuth redirect");

        Ok(OAuthRedirect {
            provider,
            authorize_url: authorize_url.to_string(),
        })
    }

    async fn complete_oauth(&self, callback: OAuthCallback) -> Result<Session, AuthError> {
        let tokens = self.access_tokens.read().await;
        let Some(issued) = tokens.get(&callback.access_token) else {
            return Err(AuthError::InvalidCredentials);
        };
        if issued.refresh_token != callback.refresh_token {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(Session::new(
            issued.identity.clone(),
            callback.access_token.clone(),
            callback.refresh_token,
            Utc::now() + Duration::seconds(callback.expires_in.max(0)),
        ))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let Some(identity) = self.refresh_tokens.write().await.remove(refresh_token) else {
            return Err(AuthError::InvalidCredentials);
        };
        self.access_tokens
            .write()
            .await
            .retain(|_, issued| issued.refresh_token != refresh_token);

        Ok(self.issue(identity).await)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let Some(issued) = self.access_tokens.write().await.remove(access_token) else {
            return Ok(());
        };
        self.refresh_tokens
            .write()
            .await
            .remove(&issued.refresh_token);
        Ok(())
    }
}
