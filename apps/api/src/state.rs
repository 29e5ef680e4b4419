use strollup_application::{AccessContext, RoleAdminService, SessionStore};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub access_context: AccessContext,
    pub role_admin_service: RoleAdminService,
    pub frontend_url: String,
}

impl AppState {
    pub fn session_store(&self) -> &SessionStore {
        self.access_context.session_store()
    }
}
