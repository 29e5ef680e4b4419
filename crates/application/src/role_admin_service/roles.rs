use super::*;

use strollup_domain::{Permission, RoleId};

impl RoleAdminService {
    /// Creates a role with every permission switched off.
    ///
    /// The duplicate check runs against local state before any write; the
    /// store stays authoritative.
    pub async fn create_role(&self, name: &str) -> Result<RoleDefinition, AdminError> {
        let role = RoleDefinition::new(name)?;
        let key = role.id().as_str().to_owned();

        {
            let mut state = self.state.lock().await;
            let taken = state.roles.get(&key).is_some()
                || state
                    .roles
                    .values()
                    .any(|other| other.name().eq_ignore_ascii_case(role.name()));
            if taken {
                return Err(AdminError::DuplicateName(role.name().to_owned()));
            }
            state.roles.begin(&key, Some(role.clone()))?;
        }

        let repository = Arc::clone(&self.role_repository);
        let stored = role.clone();
        self.write_detached(LedgerKind::Roles, &key, "create role", async move {
            repository.insert_role(&stored).await
        })
        .await?;

        Ok(role)
    }

    /// Switches one permission flag on a role.
    pub async fn set_role_permission(
        &self,
        role_id: &RoleId,
        permission: Permission,
        granted: bool,
    ) -> Result<(), AdminError> {
        let key = role_id.as_str();
        let next = {
            let mut state = self.state.lock().await;
            let mut next = state
                .roles
                .get(key)
                .cloned()
                .ok_or_else(|| AdminError::UnknownRole(key.to_owned()))?;
            next.set_permission(permission, granted);
            state.roles.begin(key, Some(next.clone()))?;
            next
        };

        let repository = Arc::clone(&self.role_repository);
        let stored = next.clone();
        self.write_detached(LedgerKind::Roles, key, "update permission", async move {
            repository.save_role_permissions(&stored).await
        })
        .await?;

        if self.current_identity_holds(next.name()).await {
            self.invalidate_permissions().await;
        }
        Ok(())
    }

    /// Renames a role; the id stays stable.
    ///
    /// Assignments reference role names and are not rewritten.
    pub async fn rename_role(&self, role_id: &RoleId, name: &str) -> Result<(), AdminError> {
        let key = role_id.as_str();
        let (previous_name, next) = {
            let mut state = self.state.lock().await;
            let current = state
                .roles
                .get(key)
                .ok_or_else(|| AdminError::UnknownRole(key.to_owned()))?;
            let previous_name = current.name().to_owned();

            let mut next = current.clone();
            next.rename(name)?;
            let derived = RoleId::from_name(next.name())?;
            let taken = state.roles.values().any(|other| {
                other.id() != role_id
                    && (other.id() == &derived || other.name().eq_ignore_ascii_case(next.name()))
            });
            if taken {
                return Err(AdminError::DuplicateName(next.name().to_owned()));
            }

            state.roles.begin(key, Some(next.clone()))?;
            (previous_name, next)
        };

        let repository = Arc::clone(&self.role_repository);
        let stored_id = role_id.clone();
        let stored_name = next.name().to_owned();
        self.write_detached(LedgerKind::Roles, key, "rename role", async move {
            repository.save_role_name(&stored_id, &stored_name).await
        })
        .await?;

        if self.current_identity_holds(&previous_name).await {
            self.invalidate_permissions().await;
        }
        Ok(())
    }

    /// Deletes a role no loaded profile references.
    pub async fn delete_role(&self, role_id: &RoleId) -> Result<(), AdminError> {
        let key = role_id.as_str();
        let role = {
            let mut state = self.state.lock().await;
            let role = state
                .roles
                .get(key)
                .cloned()
                .ok_or_else(|| AdminError::UnknownRole(key.to_owned()))?;

            let holders = state
                .users
                .values()
                .filter(|profile| profile.holds_role(role.name()))
                .count();
            if holders > 0 {
                return Err(AdminError::RoleInUse {
                    role: role.name().to_owned(),
                    holders,
                });
            }

            state.roles.begin(key, None)?;
            role
        };

        let repository = Arc::clone(&self.role_repository);
        self.write_detached(LedgerKind::Roles, key, "delete role", async move {
            repository.delete_role(role.id()).await
        })
        .await
    }
}
