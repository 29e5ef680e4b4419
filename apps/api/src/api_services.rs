use std::sync::Arc;
use std::time::Duration;

use strollup_application::{
    AccessContext, AuthProvider, PermissionResolver, ProfileRepository, RoleAdminService,
    RoleRepository, SessionStore,
};
use strollup_core::{AppError, AppResult};
use strollup_domain::RouteCatalog;
use strollup_infrastructure::{
    HostedAuthProvider, HostedClient, HostedRecordStore, InMemoryAuthProvider,
    InMemoryProfileRepository, InMemoryRoleRepository,
};
use tokio::task::JoinHandle;
use tracing::info;
use url::Url;

use crate::api_config::{ApiConfig, BackendConfig, HostedRuntimeConfig, MemoryRuntimeConfig};
use crate::dev_seed;
use crate::state::AppState;

const EXPIRY_CHECK_INTERVAL: Duration = Duration::from_secs(30);

struct Backend {
    session_store: SessionStore,
    profiles: Arc<dyn ProfileRepository>,
    roles: Arc<dyn RoleRepository>,
}

pub async fn build_app_state(config: &ApiConfig) -> AppResult<AppState> {
    let backend = match &config.backend {
        BackendConfig::Memory(memory) => memory_backend(memory).await?,
        BackendConfig::Hosted(hosted) => hosted_backend(hosted)?,
    };

    Ok(assemble(backend, config.frontend_url.clone()))
}

fn assemble(backend: Backend, frontend_url: String) -> AppState {
    let resolver = PermissionResolver::new(backend.profiles.clone(), backend.roles.clone());
    let access_context =
        AccessContext::new(backend.session_store, resolver, RouteCatalog::standard());
    let role_admin_service = RoleAdminService::new(backend.profiles, backend.roles)
        .with_invalidation(Arc::new(access_context.clone()));

    AppState {
        access_context,
        role_admin_service,
        frontend_url,
    }
}

async fn memory_backend(config: &MemoryRuntimeConfig) -> AppResult<Backend> {
    let redirect_url = Url::parse(config.oauth_redirect_url.as_str()).map_err(|error| {
        AppError::Validation(format!("invalid OAUTH_REDIRECT_URL: {error}"))
    })?;
    let auth_provider = Arc::new(InMemoryAuthProvider::new(redirect_url));
    let profiles = Arc::new(InMemoryProfileRepository::new());
    let roles = Arc::new(InMemoryRoleRepository::new());

    dev_seed::run(config, &auth_provider, &profiles, &roles).await?;

    let auth_provider: Arc<dyn AuthProvider> = auth_provider;
    Ok(Backend {
        session_store: SessionStore::new(auth_provider),
        profiles,
        roles,
    })
}

fn hosted_backend(config: &HostedRuntimeConfig) -> AppResult<Backend> {
    let client = HostedClient::new(
        reqwest::Client::new(),
        config.url.as_str(),
        config.anon_key.as_str(),
    )?;

    let mut auth_provider =
        HostedAuthProvider::new(client.clone(), config.oauth_redirect_url.as_str())?;
    if let Some(session_file) = &config.session_file {
        auth_provider = auth_provider.with_session_file(session_file.clone());
    }

    let session_store = SessionStore::new(Arc::new(auth_provider));
    let records = Arc::new(HostedRecordStore::new(client, Arc::new(session_store.clone())));

    Ok(Backend {
        session_store,
        profiles: records.clone(),
        roles: records,
    })
}

/// Starts following the session store and resumes any persisted session.
pub async fn start_access_tracking(state: &AppState) -> JoinHandle<()> {
    let follower = state.access_context.start().await;
    if let Ok(Some(session)) = state.access_context.initialize().await {
        info!(identity = session.identity().id(), "resumed persisted session");
    }

    follower
}

/// Clears the session once its access token lapses.
pub fn spawn_expiry_watch(session_store: SessionStore) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(EXPIRY_CHECK_INTERVAL);
        loop {
            interval.tick().await;
            session_store.expire_if_due().await;
        }
    })
}

#[cfg(test)]
pub(crate) async fn memory_state_for_tests(admin_password: &str) -> AppState {
    let config = MemoryRuntimeConfig {
        admin_email: "admin@strollup.local".to_owned(),
        admin_password: admin_password.to_owned(),
        oauth_redirect_url: "http://localhost:5173/app".to_owned(),
    };
    let backend = match memory_backend(&config).await {
        Ok(backend) => backend,
        Err(error) => panic!("memory backend should build: {error}"),
    };

    let state = assemble(backend, "http://localhost:5173".to_owned());
    let _follower = start_access_tracking(&state).await;
    state
}
