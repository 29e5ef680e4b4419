//! Process-wide access state: the current session paired with its resolved
//! permissions.
//!
//! Every resolution is tagged with a [`ResolutionTicket`]. A result is only
//! applied while its ticket is still current, so a slow lookup for a previous
//! session can never overwrite the permissions of the session that replaced it.

use std::sync::Arc;

use async_trait::async_trait;
use strollup_core::{AuthError, ResolveError, Session, UserIdentity};
use strollup_domain::{Permission, PermissionSet, RouteCatalog};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    AccessGate, AccessSnapshot, GateState, PathOutcome, PermissionResolver, PermissionState,
    SessionEvent, SessionGeneration, SessionStore, SessionSubscription,
};

/// Identifies one permission resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionTicket {
    generation: SessionGeneration,
    epoch: u64,
}

/// Seam through which administration changes reach the live access state.
#[async_trait]
pub trait PermissionInvalidation: Send + Sync {
    /// Returns the identity of the current session, if any.
    async fn current_identity(&self) -> Option<UserIdentity>;

    /// Re-resolves permissions for the current session.
    async fn invalidate_permissions(&self);
}

struct ContextState {
    snapshot: AccessSnapshot,
    epoch: u64,
}

/// Shared access state driven by session transitions.
#[derive(Clone)]
pub struct AccessContext {
    session_store: SessionStore,
    resolver: PermissionResolver,
    catalog: Arc<RouteCatalog>,
    state: Arc<RwLock<ContextState>>,
}

impl AccessContext {
    /// Creates a context that has not yet observed the session store.
    #[must_use]
    pub fn new(
        session_store: SessionStore,
        resolver: PermissionResolver,
        catalog: RouteCatalog,
    ) -> Self {
        Self {
            session_store,
            resolver,
            catalog: Arc::new(catalog),
            state: Arc::new(RwLock::new(ContextState {
                snapshot: AccessSnapshot::starting(),
                epoch: 0,
            })),
        }
    }

    /// Returns the session store the context follows.
    #[must_use]
    pub fn session_store(&self) -> &SessionStore {
        &self.session_store
    }

    /// Returns the routing table used for path evaluation.
    #[must_use]
    pub fn catalog(&self) -> &RouteCatalog {
        &self.catalog
    }

    /// Subscribes to the session store and follows it in a background task.
    pub async fn start(&self) -> JoinHandle<()> {
        let (subscription, session, generation) =
            self.session_store.subscribe_with_snapshot().await;
        self.observe_and_resolve(session, generation).await;

        let context = self.clone();
        tokio::spawn(async move { context.run(subscription).await })
    }

    /// Applies transitions until the store goes away.
    pub async fn run(self, mut subscription: SessionSubscription) {
        while let Some(event) = subscription.recv().await {
            self.apply_session_event(event).await;
        }
        debug!("session store closed; access context stopped");
    }

    /// Resumes the persisted session and marks the session as known.
    ///
    /// A failed resume leaves the context signed out.
    pub async fn initialize(&self) -> Result<Option<Session>, AuthError> {
        let resumed = self.session_store.initialize().await;
        let (session, generation) = self.session_store.snapshot().await;
        self.observe_and_resolve(session, generation).await;
        self.state.write().await.snapshot.session_known = true;

        if let Err(error) = &resumed {
            warn!(error = %error, "session resume failed; starting signed out");
        }
        resumed
    }

    /// Reacts to one session transition.
    pub async fn apply_session_event(&self, event: SessionEvent) {
        debug!(
            transition = ?event.transition,
            generation = event.generation,
            "access context observed session transition"
        );
        self.observe_and_resolve(event.session, event.generation)
            .await;
    }

    /// Returns the current access snapshot.
    pub async fn snapshot(&self) -> AccessSnapshot {
        self.state.read().await.snapshot.clone()
    }

    /// Evaluates a single view requirement against the current snapshot.
    pub async fn evaluate(&self, required: Option<Permission>) -> GateState {
        AccessGate::evaluate(&self.snapshot().await, required)
    }

    /// Evaluates a concrete path against the current snapshot.
    pub async fn evaluate_path(&self, path: &str) -> PathOutcome {
        AccessGate::evaluate_path(&self.catalog, &self.snapshot().await, path)
    }

    /// Re-resolves permissions for the current session and waits for them.
    ///
    /// The previous set stays visible until the new one lands. Without a
    /// session this resolves to no permissions.
    pub async fn refresh_permissions(&self) -> Result<PermissionSet, ResolveError> {
        let (ticket, session) = {
            let mut state = self.state.write().await;
            state.epoch += 1;
            let ticket = ResolutionTicket {
                generation: state.snapshot.generation,
                epoch: state.epoch,
            };
            (ticket, state.snapshot.session.clone())
        };

        let Some(session) = session else {
            return Ok(PermissionSet::empty());
        };

        let result = self.resolver.resolve_permissions(session.identity()).await;
        self.complete_resolution(ticket, result.clone()).await;
        result
    }

    /// Catches up with the session store and resolves inline if needed.
    ///
    /// Request handlers call this so their answer reflects the session they
    /// just changed instead of an outstanding background resolution.
    pub async fn sync(&self) -> AccessSnapshot {
        let (session, generation) = self.session_store.snapshot().await;
        let signed_in = session.is_some();

        if let Some((ticket, session)) = self.observe(session, generation).await {
            let result = self.resolver.resolve_permissions(session.identity()).await;
            self.complete_resolution(ticket, result).await;
        } else if signed_in
            && matches!(self.snapshot().await.permissions, PermissionState::Pending)
        {
            // Supersedes the background lookup; the error is kept in the snapshot.
            let _ = self.refresh_permissions().await;
        }

        self.snapshot().await
    }

    async fn observe_and_resolve(&self, session: Option<Session>, generation: SessionGeneration) {
        let Some((ticket, session)) = self.observe(session, generation).await else {
            return;
        };

        let context = self.clone();
        tokio::spawn(async move {
            let result = context.resolver.resolve_permissions(session.identity()).await;
            context.complete_resolution(ticket, result).await;
        });
    }

    /// Records the session of `generation` and returns a ticket when its
    /// permissions must be resolved.
    async fn observe(
        &self,
        session: Option<Session>,
        generation: SessionGeneration,
    ) -> Option<(ResolutionTicket, Session)> {
        let mut state = self.state.write().await;
        if generation < state.snapshot.generation {
            debug!(generation, "ignoring superseded session transition");
            return None;
        }

        if generation == state.snapshot.generation
            && state.snapshot.session.is_some() == session.is_some()
        {
            state.snapshot.session = session;
            return None;
        }

        state.epoch += 1;
        state.snapshot.generation = generation;
        state.snapshot.session = session.clone();

        match session {
            Some(session) => {
                state.snapshot.permissions = PermissionState::Pending;
                Some((
                    ResolutionTicket {
                        generation,
                        epoch: state.epoch,
                    },
                    session,
                ))
            }
            None => {
                state.snapshot.permissions = PermissionState::Resolved(PermissionSet::empty());
                None
            }
        }
    }

    /// Applies a resolution result if its ticket is still current.
    async fn complete_resolution(
        &self,
        ticket: ResolutionTicket,
        result: Result<PermissionSet, ResolveError>,
    ) -> bool {
        let mut state = self.state.write().await;
        if ticket.generation != state.snapshot.generation || ticket.epoch != state.epoch {
            debug!(
                ticket_generation = ticket.generation,
                current_generation = state.snapshot.generation,
                "discarding stale permission resolution"
            );
            return false;
        }

        state.snapshot.permissions = match result {
            Ok(permissions) => {
                info!(
                    generation = ticket.generation,
                    permissions = ?permissions.keys(),
                    "permissions resolved"
                );
                PermissionState::Resolved(permissions)
            }
            Err(error) => {
                warn!(error = %error, generation = ticket.generation, "permission resolution failed");
                PermissionState::Failed(error)
            }
        };
        true
    }
}

#[async_trait]
impl PermissionInvalidation for AccessContext {
    async fn current_identity(&self) -> Option<UserIdentity> {
        self.state
            .read()
            .await
            .snapshot
            .session
            .as_ref()
            .map(|session| session.identity().clone())
    }

    async fn invalidate_permissions(&self) {
        if let Err(error) = self.refresh_permissions().await {
            warn!(error = %error, "permission refresh after administration change failed");
        }
    }
}
