//! Single source of truth for who is signed in.
//!
//! The store is the only writer of the current [`Session`]. Every transition
//! bumps or keeps a monotonic generation and is delivered, in order, to each
//! live [`SessionSubscription`] while the state lock is held, so subscribers
//! observe transitions in the same order the state changed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use strollup_core::{AuthError, Session};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::{AccessTokenSource, AuthProvider, OAuthCallback, OAuthProvider, OAuthRedirect};

/// Monotonic counter identifying which session is current.
pub type SessionGeneration = u64;

/// Kind of session change delivered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionTransition {
    /// A persisted session was picked up at startup.
    Resumed,
    /// A new session was established.
    SignedIn,
    /// The current session received fresh tokens.
    TokenRefreshed,
    /// The session was cleared by the user.
    SignedOut,
    /// The session lapsed and was cleared.
    Expired,
}

impl SessionTransition {
    fn starts_new_generation(self) -> bool {
        !matches!(self, Self::TokenRefreshed)
    }
}

/// One session change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    /// What happened.
    pub transition: SessionTransition,
    /// Session current after the change.
    pub session: Option<Session>,
    /// Generation current after the change.
    pub generation: SessionGeneration,
}

/// Receiving end of a store subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct SessionSubscription {
    receiver: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionSubscription {
    /// Waits for the next transition; `None` once the store is gone.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.receiver.recv().await
    }

    /// Returns the next queued transition without waiting.
    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        self.receiver.try_recv().ok()
    }

    /// Stops receiving transitions.
    pub fn unsubscribe(self) {}
}

#[derive(Default)]
struct SessionState {
    current: Option<Session>,
    generation: SessionGeneration,
    subscribers: HashMap<u64, mpsc::UnboundedSender<SessionEvent>>,
    next_subscriber_id: u64,
}

impl SessionState {
    fn publish(&mut self, transition: SessionTransition, session: Option<Session>) -> SessionEvent {
        if transition.starts_new_generation() {
            self.generation += 1;
        }
        self.current = session;

        let event = SessionEvent {
            transition,
            session: self.current.clone(),
            generation: self.generation,
        };
        self.subscribers
            .retain(|_, sender| sender.send(event.clone()).is_ok());

        info!(
            transition = ?transition,
            generation = self.generation,
            identity = self.current.as_ref().map(|session| session.identity().id()),
            "session transition"
        );

        event
    }
}

/// Owned store for the process-wide current session.
#[derive(Clone)]
pub struct SessionStore {
    provider: Arc<dyn AuthProvider>,
    state: Arc<Mutex<SessionState>>,
}

impl SessionStore {
    /// Creates a store with no current session.
    #[must_use]
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self {
            provider,
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    /// Publishes a transition and hands the resulting session to the
    /// provider's persistence while the state lock is still held, so the
    /// persisted copy follows the same order as the transitions.
    async fn apply(
        &self,
        state: &mut SessionState,
        transition: SessionTransition,
        session: Option<Session>,
    ) {
        state.publish(transition, session);
        self.provider.persist_session(state.current.as_ref()).await;
    }

    /// Resumes a persisted session, refreshing it when it already lapsed.
    ///
    /// A sign-in that completes while the lookup is outstanding wins.
    pub async fn initialize(&self) -> Result<Option<Session>, AuthError> {
        let started_at = self.generation().await;
        let Some(mut session) = self.provider.resume_session().await? else {
            return Ok(None);
        };

        if session.is_expired_at(Utc::now()) {
            match self.provider.refresh_session(session.refresh_token()).await {
                Ok(refreshed) => session = refreshed,
                Err(error) => {
                    warn!(error = %error, "discarding expired persisted session");
                    return Ok(None);
                }
            }
        }

        let mut state = self.state.lock().await;
        if state.generation != started_at {
            debug!("session established during resume; ignoring persisted session");
            return Ok(state.current.clone());
        }
        self.apply(&mut state, SessionTransition::Resumed, Some(session.clone()))
            .await;

        Ok(Some(session))
    }

    /// Returns the current session unless it has expired.
    pub async fn current_session(&self) -> Option<Session> {
        let now = Utc::now();
        self.state
            .lock()
            .await
            .current
            .clone()
            .filter(|session| !session.is_expired_at(now))
    }

    /// Returns the current session generation.
    pub async fn generation(&self) -> SessionGeneration {
        self.state.lock().await.generation
    }

    /// Returns the stored session and its generation as one consistent pair.
    pub async fn snapshot(&self) -> (Option<Session>, SessionGeneration) {
        let state = self.state.lock().await;
        (state.current.clone(), state.generation)
    }

    /// Signs in with email and password and notifies subscribers.
    pub async fn sign_in_with_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let session = self.provider.sign_in_with_password(email, password).await?;
        let mut state = self.state.lock().await;
        self.apply(&mut state, SessionTransition::SignedIn, Some(session.clone()))
            .await;

        Ok(session)
    }

    /// Starts a redirect-based sign-in.
    ///
    /// The session arrives later through [`Self::complete_oauth_sign_in`]
    /// and is observed by subscribers, not returned here.
    pub async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
    ) -> Result<OAuthRedirect, AuthError> {
        self.provider.authorize_url(provider).await
    }

    /// Applies the session delivered by an OAuth callback.
    pub async fn complete_oauth_sign_in(
        &self,
        callback: OAuthCallback,
    ) -> Result<Session, AuthError> {
        let session = self.provider.complete_oauth(callback).await?;
        let mut state = self.state.lock().await;
        self.apply(&mut state, SessionTransition::SignedIn, Some(session.clone()))
            .await;

        Ok(session)
    }

    /// Exchanges the refresh token for fresh tokens.
    ///
    /// Returns `Ok(None)` without a session, or when the session changed
    /// while the exchange was outstanding. A rejected refresh token ends the
    /// session.
    pub async fn refresh(&self) -> Result<Option<Session>, AuthError> {
        let (session, generation) = {
            let state = self.state.lock().await;
            (state.current.clone(), state.generation)
        };
        let Some(session) = session else {
            return Ok(None);
        };

        let result = self.provider.refresh_session(session.refresh_token()).await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            debug!(generation, "discarding refresh for superseded session");
            return Ok(None);
        }

        match result {
            Ok(refreshed) if refreshed.identity() == session.identity() => {
                self.apply(
                    &mut state,
                    SessionTransition::TokenRefreshed,
                    Some(refreshed.clone()),
                )
                .await;
                Ok(Some(refreshed))
            }
            Ok(refreshed) => {
                self.apply(
                    &mut state,
                    SessionTransition::SignedIn,
                    Some(refreshed.clone()),
                )
                .await;
                Ok(Some(refreshed))
            }
            Err(AuthError::InvalidCredentials) => {
                self.apply(&mut state, SessionTransition::Expired, None).await;
                Err(AuthError::InvalidCredentials)
            }
            Err(error) => Err(error),
        }
    }

    /// Clears a session whose expiry has passed. Returns whether it did.
    pub async fn expire_if_due(&self) -> bool {
        let mut state = self.state.lock().await;
        let expired = state
            .current
            .as_ref()
            .is_some_and(|session| session.is_expired_at(Utc::now()));
        if expired {
            self.apply(&mut state, SessionTransition::Expired, None).await;
        }

        expired
    }

    /// Clears the session locally, then revokes it remotely.
    ///
    /// Always succeeds; a failed remote revoke is only logged.
    pub async fn sign_out(&self) {
        let previous = {
            let mut state = self.state.lock().await;
            let previous = state.current.clone();
            if previous.is_some() {
                self.apply(&mut state, SessionTransition::SignedOut, None).await;
            }
            previous
        };

        let Some(previous) = previous else {
            return;
        };

        if let Err(error) = self.provider.sign_out(previous.access_token()).await {
            warn!(
                error = %error,
                identity = previous.identity().id(),
                "remote sign-out failed; local session already cleared"
            );
        }
    }

    /// Registers for every future transition.
    pub async fn subscribe(&self) -> SessionSubscription {
        let (subscription, _, _) = self.subscribe_with_snapshot().await;
        subscription
    }

    /// Registers for future transitions and returns the state they follow.
    pub async fn subscribe_with_snapshot(
        &self,
    ) -> (SessionSubscription, Option<Session>, SessionGeneration) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut state = self.state.lock().await;
        let subscriber_id = state.next_subscriber_id;
        state.next_subscriber_id += 1;
        state.subscribers.insert(subscriber_id, sender);

        (
            SessionSubscription { receiver },
            state.current.clone(),
            state.generation,
        )
    }
}

#[async_trait]
impl AccessTokenSource for SessionStore {
    async fn access_token(&self) -> Option<String> {
        self.current_session()
            .await
            .map(|session| session.access_token().to_owned())
    }
}
