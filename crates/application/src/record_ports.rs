use async_trait::async_trait;
use strollup_core::StoreError;
use strollup_domain::{RoleDefinition, RoleId, UserProfile};

/// Port for profile records keyed by identity id.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Finds one profile; `Ok(None)` when no profile exists.
    async fn find_profile(&self, identity_id: &str) -> Result<Option<UserProfile>, StoreError>;

    /// Lists every readable profile.
    async fn list_profiles(&self) -> Result<Vec<UserProfile>, StoreError>;

    /// Replaces the full set of role names on a profile.
    async fn save_profile_roles(&self, identity_id: &str, roles: &[String])
    -> Result<(), StoreError>;

    /// Sets the active flag on a profile.
    async fn save_profile_active(&self, identity_id: &str, active: bool) -> Result<(), StoreError>;
}

/// Port for role definition records.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Lists every role ordered by name.
    async fn list_roles(&self) -> Result<Vec<RoleDefinition>, StoreError>;

    /// Returns the definitions whose names are listed; unknown names are skipped.
    async fn find_roles_by_names(&self, names: &[String]) -> Result<Vec<RoleDefinition>, StoreError>;

    /// Inserts a new role definition.
    async fn insert_role(&self, role: &RoleDefinition) -> Result<(), StoreError>;

    /// Persists the full permission flag map of a role.
    async fn save_role_permissions(&self, role: &RoleDefinition) -> Result<(), StoreError>;

    /// Persists a new role name.
    async fn save_role_name(&self, role_id: &RoleId, name: &str) -> Result<(), StoreError>;

    /// Deletes a role definition.
    async fn delete_role(&self, role_id: &RoleId) -> Result<(), StoreError>;
}
