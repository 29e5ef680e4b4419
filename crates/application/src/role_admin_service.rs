//! Role and assignment administration with optimistic local state.
//!
//! Each mutation shows its result immediately, persists on a spawned task and
//! then either commits or restores the replaced value, even when the caller
//! stops waiting. At most
//! one write per entity is in flight; a second one is rejected with
//! [`AdminError::AlreadySaving`]. The state lock is never held across a
//! storage call.

mod edit_state;
mod roles;
mod users;

use std::sync::Arc;

use serde::Serialize;
use strollup_core::{AppError, PersistError, StoreError, UserIdentity};
use strollup_domain::{RoleDefinition, UserProfile};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{PermissionInvalidation, ProfileRepository, RoleRepository};

pub use edit_state::{AdminEntry, EditStatus};

use edit_state::Ledger;

const LOAD_KEY: &str = "administration data";

/// Administration failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminError {
    /// Another role already derives the same id or carries the same name.
    #[error("a role named '{0}' already exists")]
    DuplicateName(String),

    /// A write for the entity is still in flight.
    #[error("'{0}' is already saving")]
    AlreadySaving(String),

    /// No loaded role has the id or name.
    #[error("role '{0}' does not exist")]
    UnknownRole(String),

    /// No loaded profile has the identity id.
    #[error("user '{0}' does not exist")]
    UnknownUser(String),

    /// The role is still assigned and cannot be deleted.
    #[error("role '{role}' is still assigned to {holders} user(s)")]
    RoleInUse {
        /// Role name.
        role: String,
        /// Number of loaded profiles holding the role.
        holders: usize,
    },

    /// Input failed validation.
    #[error("{0}")]
    Validation(String),

    /// Reading administration data failed.
    #[error("loading administration data failed: {0}")]
    Load(StoreError),

    /// A write failed and was rolled back.
    #[error(transparent)]
    Persist(PersistError),
}

impl From<AppError> for AdminError {
    fn from(value: AppError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<AdminError> for AppError {
    fn from(value: AdminError) -> Self {
        match value {
            AdminError::DuplicateName(_)
            | AdminError::AlreadySaving(_)
            | AdminError::RoleInUse { .. } => Self::Conflict(value.to_string()),
            AdminError::UnknownRole(_) | AdminError::UnknownUser(_) => {
                Self::NotFound(value.to_string())
            }
            AdminError::Validation(message) => Self::Validation(message),
            AdminError::Load(error) => Self::Unavailable(error.to_string()),
            AdminError::Persist(error) => error.into(),
        }
    }
}

/// User-visible message about a rolled back change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminNotice {
    /// Key of the affected role or user.
    pub entity: String,
    /// Human-readable message.
    pub message: String,
}

#[derive(Default)]
struct AdminState {
    roles: Ledger<RoleDefinition>,
    users: Ledger<UserProfile>,
    notices: Vec<AdminNotice>,
}

impl AdminState {
    fn has_pending(&self) -> bool {
        self.roles.has_pending() || self.users.has_pending()
    }

    fn notify(&mut self, entity: &str, message: String) {
        self.notices.push(AdminNotice {
            entity: entity.to_owned(),
            message,
        });
    }
}

/// Application service behind the roles and permissions screen.
#[derive(Clone)]
pub struct RoleAdminService {
    profile_repository: Arc<dyn ProfileRepository>,
    role_repository: Arc<dyn RoleRepository>,
    invalidation: Option<Arc<dyn PermissionInvalidation>>,
    state: Arc<Mutex<AdminState>>,
}

impl RoleAdminService {
    /// Creates a service with nothing loaded.
    #[must_use]
    pub fn new(
        profile_repository: Arc<dyn ProfileRepository>,
        role_repository: Arc<dyn RoleRepository>,
    ) -> Self {
        Self {
            profile_repository,
            role_repository,
            invalidation: None,
            state: Arc::new(Mutex::new(AdminState::default())),
        }
    }

    /// Re-resolves live permissions after changes that affect them.
    #[must_use]
    pub fn with_invalidation(mut self, invalidation: Arc<dyn PermissionInvalidation>) -> Self {
        self.invalidation = Some(invalidation);
        self
    }

    /// Loads roles and user profiles, replacing local state.
    ///
    /// Without any stored profile the signed-in account is listed alone.
    pub async fn load(&self) -> Result<(), AdminError> {
        if self.state.lock().await.has_pending() {
            return Err(AdminError::AlreadySaving(LOAD_KEY.to_owned()));
        }

        let roles = self
            .role_repository
            .list_roles()
            .await
            .map_err(AdminError::Load)?;
        let mut users = self
            .profile_repository
            .list_profiles()
            .await
            .map_err(AdminError::Load)?;

        let mut fallback = false;
        if users.is_empty()
            && let Some(identity) = self.current_identity().await
        {
            users.push(UserProfile::from_identity(&identity));
            fallback = true;
        }

        let mut state = self.state.lock().await;
        if state.has_pending() {
            return Err(AdminError::AlreadySaving(LOAD_KEY.to_owned()));
        }
        state.roles.replace_all(roles);
        state.users.replace_all(users);
        if fallback {
            state.notify(
                "profiles",
                "No user profiles found; showing the signed-in account only.".to_owned(),
            );
        }

        info!(
            roles = state.roles.values().count(),
            users = state.users.values().count(),
            "administration data loaded"
        );
        Ok(())
    }

    /// Returns roles ordered by name.
    pub async fn roles(&self) -> Vec<AdminEntry<RoleDefinition>> {
        let mut roles = self.state.lock().await.roles.entries();
        roles.sort_by(|left, right| left.value.name().cmp(right.value.name()));
        roles
    }

    /// Returns user profiles in load order.
    pub async fn users(&self) -> Vec<AdminEntry<UserProfile>> {
        self.state.lock().await.users.entries()
    }

    /// Drains notices about rolled back changes.
    pub async fn take_notices(&self) -> Vec<AdminNotice> {
        std::mem::take(&mut self.state.lock().await.notices)
    }

    async fn current_identity(&self) -> Option<UserIdentity> {
        match &self.invalidation {
            Some(invalidation) => invalidation.current_identity().await,
            None => None,
        }
    }

    /// Returns whether the current identity holds `role_name`. An identity
    /// without a loaded profile counts as holding it.
    async fn current_identity_holds(&self, role_name: &str) -> bool {
        let Some(identity) = self.current_identity().await else {
            return false;
        };

        self.state
            .lock()
            .await
            .users
            .get(identity.id())
            .is_none_or(|profile| profile.holds_role(role_name))
    }

    async fn invalidate_permissions(&self) {
        if let Some(invalidation) = &self.invalidation {
            invalidation.invalidate_permissions().await;
        }
    }

    fn settle<T>(
        ledger: &mut Ledger<T>,
        notices: &mut Vec<AdminNotice>,
        key: &str,
        action: &str,
        result: Result<(), StoreError>,
    ) -> Result<(), AdminError>
    where
        T: edit_state::Keyed + Clone,
    {
        match result {
            Ok(()) => {
                ledger.commit(key);
                info!(entity = key, action, "administration change saved");
                Ok(())
            }
            Err(error) => {
                ledger.roll_back(key);
                let error = PersistError::from(error);
                warn!(entity = key, action, error = %error, "administration change rolled back");
                notices.push(AdminNotice {
                    entity: key.to_owned(),
                    message: format!("Failed to {action}: {error}"),
                });
                Err(AdminError::Persist(error))
            }
        }
    }

    async fn settle_entry(
        &self,
        ledger: LedgerKind,
        key: &str,
        action: &str,
        result: Result<(), StoreError>,
    ) -> Result<(), AdminError> {
        let mut state = self.state.lock().await;
        let AdminState {
            roles,
            users,
            notices,
        } = &mut *state;
        match ledger {
            LedgerKind::Roles => Self::settle(roles, notices, key, action, result),
            LedgerKind::Users => Self::settle(users, notices, key, action, result),
        }
    }

    /// Runs the store write and its settlement on a task of its own, so a
    /// dropped caller still leaves the entry committed or rolled back.
    async fn write_detached<W>(
        &self,
        ledger: LedgerKind,
        key: &str,
        action: &'static str,
        write: W,
    ) -> Result<(), AdminError>
    where
        W: Future<Output = Result<(), StoreError>> + Send + 'static,
    {
        let service = self.clone();
        let task_key = key.to_owned();
        let task = tokio::spawn(async move {
            let result = write.await;
            service.settle_entry(ledger, &task_key, action, result).await
        });

        match task.await {
            Ok(settled) => settled,
            Err(error) => {
                let stopped = Err(StoreError::Rejected(format!("save task stopped: {error}")));
                self.settle_entry(ledger, key, action, stopped).await
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum LedgerKind {
    Roles,
    Users,
}
