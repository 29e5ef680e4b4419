use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use strollup_application::{AuthProvider, OAuthCallback, OAuthProvider, OAuthRedirect};
use strollup_core::{AppError, AppResult, AuthError, Session, UserIdentity};
use tracing::{debug, warn};
use url::Url;

use crate::HostedClient;
use crate::hosted_client::HostedFailure;

/// Auth adapter for a hosted token service speaking the GoTrue REST dialect.
pub struct HostedAuthProvider {
    client: HostedClient,
    redirect_url: Url,
    session_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: UserResponse,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: Value,
}

impl UserResponse {
    fn into_identity(self) -> UserIdentity {
        let metadata_text = |keys: &[&str]| {
            keys.iter().find_map(|key| {
                self.user_metadata
                    .get(key)
                    .and_then(Value::as_str)
                    .filter(|value| !value.trim().is_empty())
                    .map(str::to_owned)
            })
        };
        let display_name = metadata_text(&["full_name", "name", "user_name"]);
        let avatar_url = metadata_text(&["avatar_url", "picture"]);

        UserIdentity::new(self.id, self.email).with_metadata(display_name, avatar_url)
    }
}

impl TokenResponse {
    fn into_session(self) -> Session {
        Session::new(
            self.user.into_identity(),
            self.access_token,
            self.refresh_token,
            Utc::now() + Duration::seconds(self.expires_in.max(0)),
        )
    }
}

fn network(error: reqwest::Error) -> AuthError {
    AuthError::Network(error.to_string())
}

fn provider(failure: &HostedFailure) -> AuthError {
    AuthError::Provider(failure.describe())
}

/// Credential rejections come back as 400 or 401 from the token endpoint.
fn token_failure(failure: &HostedFailure) -> AuthError {
    match failure.status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => AuthError::InvalidCredentials,
        _ => provider(failure),
    }
}

impl HostedAuthProvider {
    /// Creates the adapter; OAuth flows return to `redirect_url`.
    pub fn new(client: HostedClient, redirect_url: &str) -> AppResult<Self> {
        let redirect_url = Url::parse(redirect_url).map_err(|error| {
            AppError::Validation(format!(
                "invalid OAuth redirect URL '{redirect_url}': {error}"
            ))
        })?;

        Ok(Self {
            client,
            redirect_url,
            session_file: None,
        })
    }

    /// Persists sessions to `path` so they survive restarts.
    #[must_use]
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<Session, AuthError> {
        let url = self
            .client
            .endpoint("auth/v1/token", &[("grant_type", grant_type)])
            .map_err(|error| AuthError::Provider(error.to_string()))?;
        let request = self.client.request(Method::POST, url, None).json(&body);

        let response = HostedClient::send(request)
            .await
            .map_err(network)?
            .map_err(|failure| token_failure(&failure))?;
        let tokens = response.json::<TokenResponse>().await.map_err(|error| {
            AuthError::Provider(format!("unexpected token response: {error}"))
        })?;

        Ok(tokens.into_session())
    }

    async fn fetch_user(&self, access_token: &str) -> Result<UserIdentity, AuthError> {
        let url = self
            .client
            .endpoint("auth/v1/user", &[])
            .map_err(|error| AuthError::Provider(error.to_string()))?;
        let request = self.client.request(Method::GET, url, Some(access_token));

        let response = HostedClient::send(request)
            .await
            .map_err(network)?
            .map_err(|failure| match failure.status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AuthError::InvalidCredentials,
                _ => provider(&failure),
            })?;
        let user = response.json::<UserResponse>().await.map_err(|error| {
            AuthError::Provider(format!("unexpected user response: {error}"))
        })?;

        Ok(user.into_identity())
    }
}

#[async_trait]
impl AuthProvider for HostedAuthProvider {
    async fn resume_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(path) = &self.session_file else {
            return Ok(None);
        };

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(AuthError::Provider(format!("reading session file: {error}"))),
        };

        match serde_json::from_slice::<Session>(&bytes) {
            Ok(session) => {
                debug!(identity = session.identity().id(), "resumed persisted session");
                Ok(Some(session))
            }
            Err(error) => {
                warn!(error = %error, "ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        self.token_grant("password", json!({ "email": email, "password": password }))
            .await
    }

    async fn authorize_url(&self, provider: OAuthProvider) -> Result<OAuthRedirect, AuthError> {
        let url = self
            .client
            .endpoint(
                "auth/v1/authorize",
                &[
                    ("provider", provider.as_str()),
                    ("redirect_to", self.redirect_url.as_str()),
                ],
            )
            .map_err(|error| AuthError::Provider(error.to_string()))?;

        Ok(OAuthRedirect {
            provider,
            authorize_url: url.to_string(),
        })
    }

    async fn complete_oauth(&self, callback: OAuthCallback) -> Result<Session, AuthError> {
        let identity = self.fetch_user(&callback.access_token).await?;
        Ok(Session::new(
            identity,
            callback.access_token,
            callback.refresh_token,
            Utc::now() + Duration::seconds(callback.expires_in.max(0)),
        ))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let url = self
            .client
            .endpoint("auth/v1/logout", &[])
            .map_err(|error| AuthError::Provider(error.to_string()))?;
        let request = self.client.request(Method::POST, url, Some(access_token));

        HostedClient::send(request)
            .await
            .map_err(network)?
            .map_err(|failure| provider(&failure))?;
        Ok(())
    }

    async fn persist_session(&self, session: Option<&Session>) {
        let Some(path) = &self.session_file else {
            return;
        };

        let result = match session {
            Some(session) => match serde_json::to_vec(session) {
                Ok(bytes) => tokio::fs::write(path, bytes).await,
                Err(error) => {
                    warn!(error = %error, "failed to encode session for persistence");
                    return;
                }
            },
            None => match tokio::fs::remove_file(path).await {
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
                other => other,
            },
        };

        if let Err(error) = result {
            warn!(error = %error, path = %path.display(), "failed to update persisted session");
        }
    }
}
