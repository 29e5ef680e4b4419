use std::sync::Arc;

use strollup_core::{ResolveError, UserIdentity};
use strollup_domain::PermissionSet;
use tracing::debug;

use crate::{ProfileRepository, RoleRepository};

/// Derives the effective permission set of an identity from its roles.
#[derive(Clone)]
pub struct PermissionResolver {
    profile_repository: Arc<dyn ProfileRepository>,
    role_repository: Arc<dyn RoleRepository>,
}

impl PermissionResolver {
    /// Creates a resolver over the profile and role stores.
    #[must_use]
    pub fn new(
        profile_repository: Arc<dyn ProfileRepository>,
        role_repository: Arc<dyn RoleRepository>,
    ) -> Self {
        Self {
            profile_repository,
            role_repository,
        }
    }

    /// Returns the union of the permissions switched on in every role the
    /// identity holds.
    ///
    /// An identity without a profile, or without roles, has no permissions.
    /// Role names with no definition are skipped. Any store failure is an
    /// error: the caller must treat permissions as unknown, not as empty.
    pub async fn resolve_permissions(
        &self,
        identity: &UserIdentity,
    ) -> Result<PermissionSet, ResolveError> {
        let Some(profile) = self.profile_repository.find_profile(identity.id()).await? else {
            debug!(identity = identity.id(), "no profile found; resolving to no permissions");
            return Ok(PermissionSet::empty());
        };

        if profile.roles().is_empty() {
            return Ok(PermissionSet::empty());
        }

        let definitions = self
            .role_repository
            .find_roles_by_names(profile.roles())
            .await?;

        let mut permissions = PermissionSet::empty();
        for definition in definitions
            .iter()
            .filter(|definition| profile.holds_role(definition.name()))
        {
            permissions.extend_from(&definition.granted());
        }

        Ok(permissions)
    }
}

#[cfg(test)]
mod tests;
