use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use strollup_core::{ResolveError, StoreError, UserIdentity};
use strollup_domain::{Permission, PermissionSet, RoleDefinition, RoleId, UserProfile};
use tokio::sync::Mutex;

use crate::{ProfileRepository, RoleRepository};

use super::PermissionResolver;

#[derive(Default)]
struct FakeProfileRepository {
    profiles: HashMap<String, UserProfile>,
    failure: Option<StoreError>,
}

#[async_trait]
impl ProfileRepository for FakeProfileRepository {
    async fn find_profile(&self, identity_id: &str) -> Result<Option<UserProfile>, StoreError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        Ok(self.profiles.get(identity_id).cloned())
    }

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, StoreError> {
        Ok(self.profiles.values().cloned().collect())
    }

    async fn save_profile_roles(
        &self,
        _identity_id: &str,
        _roles: &[String],
    ) -> Result<(), StoreError> {
        Ok(())
    }

    async fn save_profile_active(
        &self,
        _identity_id: &str,
        _active: bool,
    ) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Default)]
struct FakeRoleRepository {
    roles: Vec<RoleDefinition>,
    reverse_lookup_order: bool,
    lookups: Mutex<u32>,
    failure: Option<StoreError>,
}

#[async_trait]
impl RoleRepository for FakeRoleRepository {
    async fn list_roles(&self) -> Result<Vec<RoleDefinition>, StoreError> {
        Ok(self.roles.clone())
    }

    async fn find_roles_by_names(
        &self,
        names: &[String],
    ) -> Result<Vec<RoleDefinition>, StoreError> {
        *self.lookups.lock().await += 1;
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }

        let mut found: Vec<RoleDefinition> = self
            .roles
            .iter()
            .filter(|role| names.iter().any(|name| name == role.name()))
            .cloned()
            .collect();
        if self.reverse_lookup_order {
            found.reverse();
        }
        Ok(found)
    }

    async fn insert_role(&self, _role: &RoleDefinition) -> Result<(), StoreError> {
        Ok(())
    }

    async fn save_role_permissions(&self, _role: &RoleDefinition) -> Result<(), StoreError> {
        Ok(())
    }

    async fn save_role_name(&self, _role_id: &RoleId, _name: &str) -> Result<(), StoreError> {
        Ok(())
    }

    async fn delete_role(&self, _role_id: &RoleId) -> Result<(), StoreError> {
        Ok(())
    }
}

fn role(name: &str, grants: &[Permission]) -> RoleDefinition {
    match RoleDefinition::new(name) {
        Ok(role) => role.with_grants(grants),
        Err(error) => panic!("invalid test role: {error}"),
    }
}

fn identity(id: &str) -> UserIdentity {
    UserIdentity::new(id, None)
}

fn profiles(id: &str, roles: &[&str]) -> HashMap<String, UserProfile> {
    HashMap::from([(
        id.to_owned(),
        UserProfile::new(id, id).with_roles(roles.iter().copied()),
    )])
}

fn sales_and_analyst() -> Vec<RoleDefinition> {
    vec![
        role("Sales", &[Permission::ViewDashboard, Permission::ViewContacts]),
        role("Analyst", &[Permission::ViewDashboard, Permission::ViewAnalytics]),
    ]
}

#[tokio::test]
async fn identity_without_profile_has_no_permissions() {
    let resolver = PermissionResolver::new(
        Arc::new(FakeProfileRepository::default()),
        Arc::new(FakeRoleRepository::default()),
    );

    let permissions = resolver.resolve_permissions(&identity("ghost")).await;
    assert_eq!(permissions, Ok(PermissionSet::empty()));
}

#[tokio::test]
async fn identity_without_roles_skips_role_lookup() {
    let roles = Arc::new(FakeRoleRepository {
        roles: sales_and_analyst(),
        ..FakeRoleRepository::default()
    });
    let resolver = PermissionResolver::new(
        Arc::new(FakeProfileRepository {
            profiles: profiles("ada", &[]),
            ..FakeProfileRepository::default()
        }),
        roles.clone(),
    );

    let permissions = resolver.resolve_permissions(&identity("ada")).await;

    assert_eq!(permissions, Ok(PermissionSet::empty()));
    assert_eq!(*roles.lookups.lock().await, 0);
}

#[tokio::test]
async fn permissions_are_the_union_of_assigned_roles() {
    let resolver = PermissionResolver::new(
        Arc::new(FakeProfileRepository {
            profiles: profiles("ada", &["Sales", "Analyst"]),
            ..FakeProfileRepository::default()
        }),
        Arc::new(FakeRoleRepository {
            roles: sales_and_analyst(),
            ..FakeRoleRepository::default()
        }),
    );

    let permissions = resolver.resolve_permissions(&identity("ada")).await;

    let expected: PermissionSet = [
        Permission::ViewDashboard,
        Permission::ViewContacts,
        Permission::ViewAnalytics,
    ]
    .into_iter()
    .collect();
    assert_eq!(permissions, Ok(expected));
}

#[tokio::test]
async fn union_does_not_depend_on_lookup_order() {
    let build = |reverse_lookup_order| {
        PermissionResolver::new(
            Arc::new(FakeProfileRepository {
                profiles: profiles("ada", &["Sales", "Analyst"]),
                ..FakeProfileRepository::default()
            }),
            Arc::new(FakeRoleRepository {
                roles: sales_and_analyst(),
                reverse_lookup_order,
                ..FakeRoleRepository::default()
            }),
        )
    };

    let forward = build(false).resolve_permissions(&identity("ada")).await;
    let reversed = build(true).resolve_permissions(&identity("ada")).await;

    assert!(forward.is_ok());
    assert_eq!(forward, reversed);
}

#[tokio::test]
async fn resolving_twice_yields_identical_sets() {
    let resolver = PermissionResolver::new(
        Arc::new(FakeProfileRepository {
            profiles: profiles("ada", &["Sales"]),
            ..FakeProfileRepository::default()
        }),
        Arc::new(FakeRoleRepository {
            roles: sales_and_analyst(),
            ..FakeRoleRepository::default()
        }),
    );

    let first = resolver.resolve_permissions(&identity("ada")).await;
    let second = resolver.resolve_permissions(&identity("ada")).await;

    assert!(first.is_ok());
    assert_eq!(first, second);
}

#[tokio::test]
async fn unknown_role_names_are_ignored() {
    let resolver = PermissionResolver::new(
        Arc::new(FakeProfileRepository {
            profiles: profiles("ada", &["Sales", "Retired Role"]),
            ..FakeProfileRepository::default()
        }),
        Arc::new(FakeRoleRepository {
            roles: sales_and_analyst(),
            ..FakeRoleRepository::default()
        }),
    );

    let permissions = resolver.resolve_permissions(&identity("ada")).await;

    let expected: PermissionSet = [Permission::ViewDashboard, Permission::ViewContacts]
        .into_iter()
        .collect();
    assert_eq!(permissions, Ok(expected));
}

#[tokio::test]
async fn profile_lookup_network_failure_is_an_error_not_empty() {
    let resolver = PermissionResolver::new(
        Arc::new(FakeProfileRepository {
            failure: Some(StoreError::Network("timed out".to_owned())),
            ..FakeProfileRepository::default()
        }),
        Arc::new(FakeRoleRepository::default()),
    );

    let permissions = resolver.resolve_permissions(&identity("ada")).await;
    assert_eq!(permissions, Err(ResolveError::Network("timed out".to_owned())));
}

#[tokio::test]
async fn role_lookup_rejection_is_an_error() {
    let resolver = PermissionResolver::new(
        Arc::new(FakeProfileRepository {
            profiles: profiles("ada", &["Sales"]),
            ..FakeProfileRepository::default()
        }),
        Arc::new(FakeRoleRepository {
            failure: Some(StoreError::Rejected("permission denied".to_owned())),
            ..FakeRoleRepository::default()
        }),
    );

    let permissions = resolver.resolve_permissions(&identity("ada")).await;
    assert!(matches!(permissions, Err(ResolveError::Store(_))));
}
