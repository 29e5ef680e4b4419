use super::*;

impl RoleAdminService {
    /// Replaces the full set of role names held by a user.
    ///
    /// Every name must belong to a loaded role.
    pub async fn set_user_roles(
        &self,
        identity_id: &str,
        role_names: Vec<String>,
    ) -> Result<(), AdminError> {
        let next = {
            let mut state = self.state.lock().await;
            let mut next = state
                .users
                .get(identity_id)
                .cloned()
                .ok_or_else(|| AdminError::UnknownUser(identity_id.to_owned()))?;
            next.set_roles(role_names);

            if let Some(unknown) = next
                .roles()
                .iter()
                .find(|name| !state.roles.values().any(|role| role.name() == name.as_str()))
            {
                return Err(AdminError::UnknownRole(unknown.clone()));
            }

            state.users.begin(identity_id, Some(next.clone()))?;
            next
        };

        let repository = Arc::clone(&self.profile_repository);
        let stored_id = identity_id.to_owned();
        self.write_detached(LedgerKind::Users, identity_id, "update user roles", async move {
            repository.save_profile_roles(&stored_id, next.roles()).await
        })
        .await?;

        let affects_current = self
            .current_identity()
            .await
            .is_some_and(|identity| identity.id() == identity_id);
        if affects_current {
            self.invalidate_permissions().await;
        }
        Ok(())
    }

    /// Activates or deactivates a user.
    pub async fn set_user_active(&self, identity_id: &str, active: bool) -> Result<(), AdminError> {
        {
            let mut state = self.state.lock().await;
            let mut next = state
                .users
                .get(identity_id)
                .cloned()
                .ok_or_else(|| AdminError::UnknownUser(identity_id.to_owned()))?;
            next.set_active(active);
            state.users.begin(identity_id, Some(next))?;
        }

        let repository = Arc::clone(&self.profile_repository);
        let stored_id = identity_id.to_owned();
        self.write_detached(LedgerKind::Users, identity_id, "update user status", async move {
            repository.save_profile_active(&stored_id, active).await
        })
        .await
    }
}
