use strollup_core::AppResult;
use strollup_domain::{Permission, RoleDefinition, UserProfile};
use strollup_infrastructure::{
    InMemoryAuthProvider, InMemoryProfileRepository, InMemoryRoleRepository,
};
use tracing::info;

use crate::api_config::MemoryRuntimeConfig;

const DEV_SEED_ADMIN_DISPLAY_NAME: &str = "Workspace Admin";
const DEV_SEED_ADMIN_ROLE: &str = "Admin";
const DEV_SEED_SALES_ROLE: &str = "Sales";

/// Seeds the in-memory backend with an administrator and two roles.
pub async fn run(
    config: &MemoryRuntimeConfig,
    auth_provider: &InMemoryAuthProvider,
    profiles: &InMemoryProfileRepository,
    roles: &InMemoryRoleRepository,
) -> AppResult<()> {
    roles
        .upsert(
            RoleDefinition::new(DEV_SEED_ADMIN_ROLE)?
                .with_description("Full access to every screen")
                .with_grants(Permission::all()),
        )
        .await;
    roles
        .upsert(
            RoleDefinition::new(DEV_SEED_SALES_ROLE)?
                .with_description("Dashboard and contacts")
                .with_grants(&[Permission::ViewDashboard, Permission::ViewContacts]),
        )
        .await;

    let identity = auth_provider
        .register(
            config.admin_email.as_str(),
            config.admin_password.as_str(),
            Some(DEV_SEED_ADMIN_DISPLAY_NAME.to_owned()),
        )
        .await?;
    profiles
        .upsert(UserProfile::from_identity(&identity).with_roles([DEV_SEED_ADMIN_ROLE]))
        .await;

    info!(
        email = config.admin_email.as_str(),
        "seeded in-memory backend with an administrator"
    );
    Ok(())
}
