//! Route-level guard turning (session, permissions, required key) into a
//! render, redirect or deny outcome.
//!
//! Evaluation is pure: it reads an [`AccessSnapshot`] and never resolves
//! permissions itself. Nested views reuse the [`AccessGrant`] of their parent,
//! so requirements compose as a logical AND over one resolved set.

use chrono::{DateTime, Utc};
use serde::Serialize;
use strollup_core::{ResolveError, Session};
use strollup_domain::{
    Permission, PermissionSet, RouteCatalog, RouteMatch, RouteRequirement, SIGN_IN_PATH,
};

use crate::SessionGeneration;

/// Progress of the permission lookup for the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionState {
    /// A resolution is outstanding.
    Pending,
    /// The effective set is known.
    Resolved(PermissionSet),
    /// The last resolution failed; permissions are unknown.
    Failed(ResolveError),
}

/// The (session, permissions, loading) triple the gate reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessSnapshot {
    /// Whether the startup session lookup finished.
    pub session_known: bool,
    /// Current session, if any.
    pub session: Option<Session>,
    /// Generation of `session`.
    pub generation: SessionGeneration,
    /// Permission lookup state for `session`.
    pub permissions: PermissionState,
}

impl AccessSnapshot {
    /// Snapshot before the startup session lookup completes.
    #[must_use]
    pub fn starting() -> Self {
        Self {
            session_known: false,
            session: None,
            generation: 0,
            permissions: PermissionState::Pending,
        }
    }
}

/// Resolved access handed to a rendered view and its nested views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    session: Session,
    permissions: PermissionSet,
    satisfied: Vec<Permission>,
}

impl AccessGrant {
    /// Returns the session the grant was issued for.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the effective permission set.
    #[must_use]
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Returns every permission checked by enclosing gates, outermost first.
    #[must_use]
    pub fn satisfied(&self) -> &[Permission] {
        self.satisfied.as_slice()
    }

    /// Evaluates a nested view against the already-resolved set.
    #[must_use]
    pub fn nested(&self, required: Option<Permission>) -> GateState {
        match required {
            None => GateState::AuthenticatedAllowed(self.clone()),
            Some(permission) if self.permissions.contains(permission) => {
                let mut grant = self.clone();
                grant.satisfied.push(permission);
                GateState::AuthenticatedAllowed(grant)
            }
            Some(permission) => GateState::AuthenticatedNoAccess {
                missing: permission,
            },
        }
    }
}

/// Outcome of one gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    /// Session lookup or permission resolution is outstanding.
    Loading,
    /// No current session.
    Unauthenticated,
    /// Signed in but missing the required permission.
    AuthenticatedNoAccess {
        /// The first requirement that failed.
        missing: Permission,
    },
    /// Signed in and every requirement holds.
    AuthenticatedAllowed(AccessGrant),
    /// Permissions are unknown because resolution failed.
    ResolutionFailed(ResolveError),
}

/// What the surrounding router should do for a gate outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum GateEffect {
    /// Show a loading indicator.
    RenderLoading,
    /// Navigate to the sign-in view.
    RedirectToSignIn {
        /// Sign-in view path.
        sign_in_path: String,
        /// Destination originally requested, for the router to restore.
        return_to: Option<String>,
    },
    /// Show the access-denied notice instead of the view.
    RenderAccessDenied,
    /// Render the requested view.
    RenderView,
    /// Show an error with a retry affordance.
    RenderRetry,
}

impl GateState {
    /// Stable name of the state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Unauthenticated => "unauthenticated",
            Self::AuthenticatedNoAccess { .. } => "authenticated_no_access",
            Self::AuthenticatedAllowed(_) => "authenticated_allowed",
            Self::ResolutionFailed(_) => "resolution_failed",
        }
    }

    /// Maps the state to the router effect for a destination.
    #[must_use]
    pub fn effect(&self, destination: Option<&str>) -> GateEffect {
        match self {
            Self::Loading => GateEffect::RenderLoading,
            Self::Unauthenticated => GateEffect::RedirectToSignIn {
                sign_in_path: SIGN_IN_PATH.to_owned(),
                return_to: destination.map(str::to_owned),
            },
            Self::AuthenticatedNoAccess { .. } => GateEffect::RenderAccessDenied,
            Self::AuthenticatedAllowed(_) => GateEffect::RenderView,
            Self::ResolutionFailed(_) => GateEffect::RenderRetry,
        }
    }
}

/// Outcome of evaluating a concrete path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOutcome {
    /// The path is public; no gate applies.
    Public,
    /// No route matches the path.
    NotFound,
    /// The path is protected and the gate produced this state.
    Gated(GateState),
}

/// Stateless access gate.
pub struct AccessGate;

impl AccessGate {
    /// Evaluates one view with an optional required permission.
    #[must_use]
    pub fn evaluate(snapshot: &AccessSnapshot, required: Option<Permission>) -> GateState {
        Self::evaluate_at(snapshot, required, Utc::now())
    }

    /// Evaluates one view as of `now`.
    #[must_use]
    pub fn evaluate_at(
        snapshot: &AccessSnapshot,
        required: Option<Permission>,
        now: DateTime<Utc>,
    ) -> GateState {
        if !snapshot.session_known {
            return GateState::Loading;
        }

        let Some(session) = snapshot
            .session
            .as_ref()
            .filter(|session| !session.is_expired_at(now))
        else {
            return GateState::Unauthenticated;
        };

        match &snapshot.permissions {
            PermissionState::Pending => GateState::Loading,
            PermissionState::Failed(error) => GateState::ResolutionFailed(error.clone()),
            PermissionState::Resolved(permissions) => AccessGrant {
                session: session.clone(),
                permissions: permissions.clone(),
                satisfied: Vec::new(),
            }
            .nested(required),
        }
    }

    /// Evaluates a chain of nested requirements, outermost first, stopping
    /// at the first level that does not allow rendering.
    #[must_use]
    pub fn evaluate_nested(snapshot: &AccessSnapshot, requirements: &[RouteRequirement]) -> GateState {
        let mut levels = requirements.iter().map(RouteRequirement::permission);
        let mut state = Self::evaluate(snapshot, levels.next().flatten());

        for required in levels {
            let GateState::AuthenticatedAllowed(grant) = &state else {
                break;
            };
            state = grant.nested(required);
        }

        state
    }

    /// Evaluates a concrete path against the route catalog.
    #[must_use]
    pub fn evaluate_path(catalog: &RouteCatalog, snapshot: &AccessSnapshot, path: &str) -> PathOutcome {
        match catalog.resolve(path) {
            RouteMatch::Public => PathOutcome::Public,
            RouteMatch::NotFound => PathOutcome::NotFound,
            RouteMatch::Protected { requirements, .. } => {
                PathOutcome::Gated(Self::evaluate_nested(snapshot, &requirements))
            }
        }
    }
}

#[cfg(test)]
mod tests;
