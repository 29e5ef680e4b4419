use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use strollup_application::RoleRepository;
use strollup_core::StoreError;
use strollup_domain::{RoleDefinition, RoleId};
use tokio::sync::RwLock;

/// In-memory role definition repository implementation.
#[derive(Debug, Default)]
pub struct InMemoryRoleRepository {
    roles: RwLock<HashMap<RoleId, RoleDefinition>>,
    offline: AtomicBool,
}

impl InMemoryRoleRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a role definition.
    pub async fn upsert(&self, role: RoleDefinition) {
        self.roles.write().await.insert(role.id().clone(), role);
    }

    /// Makes every call fail as unreachable until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn reachable(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Network("role store offline".to_owned()));
        }
        Ok(())
    }
}

fn missing(role_id: &RoleId) -> StoreError {
    StoreError::Rejected(format!("role '{role_id}' does not exist"))
}

#[async_trait]
impl RoleRepository for InMemoryRoleRepository {
    async fn list_roles(&self) -> Result<Vec<RoleDefinition>, StoreError> {
        self.reachable()?;
        let mut roles: Vec<RoleDefinition> = self.roles.read().await.values().cloned().collect();
        roles.sort_by(|left, right| left.name().cmp(right.name()));
        Ok(roles)
    }

    async fn find_roles_by_names(
        &self,
        names: &[String],
    ) -> Result<Vec<RoleDefinition>, StoreError> {
        self.reachable()?;
        let roles = self.roles.read().await;

        Ok(roles
            .values()
            .filter(|role| names.iter().any(|name| name == role.name()))
            .cloned()
            .collect())
    }

    async fn insert_role(&self, role: &RoleDefinition) -> Result<(), StoreError> {
        self.reachable()?;
        let mut roles = self.roles.write().await;
        if roles.contains_key(role.id()) {
            return Err(StoreError::Rejected(format!(
                "role '{}' already exists",
                role.id()
            )));
        }

        roles.insert(role.id().clone(), role.clone());
        Ok(())
    }

    async fn save_role_permissions(&self, role: &RoleDefinition) -> Result<(), StoreError> {
        self.reachable()?;
        let mut roles = self.roles.write().await;
        let Some(stored) = roles.get_mut(role.id()) else {
            return Err(missing(role.id()));
        };

        for (permission, granted) in role.flags() {
            stored.set_permission(permission, granted);
        }
        Ok(())
    }

    async fn save_role_name(&self, role_id: &RoleId, name: &str) -> Result<(), StoreError> {
        self.reachable()?;
        let mut roles = self.roles.write().await;
        let Some(stored) = roles.get_mut(role_id) else {
            return Err(missing(role_id));
        };

        stored
            .rename(name)
            .map_err(|error| StoreError::Rejected(error.to_string()))
    }

    async fn delete_role(&self, role_id: &RoleId) -> Result<(), StoreError> {
        self.reachable()?;
        self.roles
            .write()
            .await
            .remove(role_id)
            .map(|_| ())
            .ok_or_else(|| missing(role_id))
    }
}
