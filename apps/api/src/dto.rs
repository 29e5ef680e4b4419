use serde::{Deserialize, Serialize};
use strollup_application::{
    AccessSnapshot, AdminEntry, AdminNotice, EditStatus, GateEffect, GateState, OAuthRedirect,
    PathOutcome, PermissionState,
};
use strollup_core::Session;
use strollup_domain::{PermissionSet, RoleDefinition, UserProfile};
use ts_rs::TS;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// API representation of the signed-in identity.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/identity-response.ts"
)]
pub struct IdentityResponse {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Current session and permission state.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/session-response.ts"
)]
pub struct SessionResponse {
    pub session_known: bool,
    pub generation: u64,
    pub identity: Option<IdentityResponse>,
    /// RFC 3339 expiry of the access token.
    pub expires_at: Option<String>,
    /// `pending`, `resolved` or `failed`.
    pub permission_state: String,
    pub permissions: Vec<String>,
    /// Bearer token the client sends on session-bound routes.
    pub access_token: Option<String>,
}

impl From<&AccessSnapshot> for SessionResponse {
    fn from(value: &AccessSnapshot) -> Self {
        let (permission_state, permissions) = match &value.permissions {
            PermissionState::Pending => ("pending", Vec::new()),
            PermissionState::Resolved(permissions) => ("resolved", permission_keys(permissions)),
            PermissionState::Failed(_) => ("failed", Vec::new()),
        };

        Self {
            session_known: value.session_known,
            generation: value.generation,
            identity: value.session.as_ref().map(identity_response),
            expires_at: value
                .session
                .as_ref()
                .map(|session| session.expires_at().to_rfc3339()),
            permission_state: permission_state.to_owned(),
            permissions,
            access_token: value
                .session
                .as_ref()
                .map(|session| session.access_token().to_owned()),
        }
    }
}

fn identity_response(session: &Session) -> IdentityResponse {
    let identity = session.identity();
    IdentityResponse {
        id: identity.id().to_owned(),
        email: identity.email().map(str::to_owned),
        display_name: identity.display_name().map(str::to_owned),
        avatar_url: identity.avatar_url().map(str::to_owned),
    }
}

fn permission_keys(permissions: &PermissionSet) -> Vec<String> {
    permissions.keys().into_iter().map(str::to_owned).collect()
}

/// Incoming payload for password sign-in.
#[derive(Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/password-sign-in-request.ts"
)]
pub struct PasswordSignInRequest {
    pub email: String,
    pub password: String,
}

/// Incoming payload starting an OAuth sign-in.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/oauth-start-request.ts"
)]
pub struct OAuthStartRequest {
    /// `google` or `github`.
    pub provider: String,
}

/// Where the browser must go to continue an OAuth sign-in.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/oauth-redirect-response.ts"
)]
pub struct OAuthRedirectResponse {
    pub provider: String,
    pub authorize_url: String,
}

impl From<OAuthRedirect> for OAuthRedirectResponse {
    fn from(value: OAuthRedirect) -> Self {
        Self {
            provider: value.provider.as_str().to_owned(),
            authorize_url: value.authorize_url,
        }
    }
}

/// Tokens read from the OAuth redirect fragment.
#[derive(Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/oauth-callback-request.ts"
)]
pub struct OAuthCallbackRequest {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Query string of the gate endpoint.
#[derive(Debug, Deserialize)]
pub struct GateQuery {
    pub path: String,
}

/// Router instruction for a gated path.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/gate-effect-response.ts"
)]
pub struct GateEffectResponse {
    /// `render_loading`, `redirect_to_sign_in`, `render_access_denied`,
    /// `render_view` or `render_retry`.
    pub effect: String,
    pub sign_in_path: Option<String>,
    pub return_to: Option<String>,
}

impl From<GateEffect> for GateEffectResponse {
    fn from(value: GateEffect) -> Self {
        let name = match &value {
            GateEffect::RenderLoading => "render_loading",
            GateEffect::RedirectToSignIn { .. } => "redirect_to_sign_in",
            GateEffect::RenderAccessDenied => "render_access_denied",
            GateEffect::RenderView => "render_view",
            GateEffect::RenderRetry => "render_retry",
        };
        let (sign_in_path, return_to) = match value {
            GateEffect::RedirectToSignIn {
                sign_in_path,
                return_to,
            } => (Some(sign_in_path), return_to),
            _ => (None, None),
        };

        Self {
            effect: name.to_owned(),
            sign_in_path,
            return_to,
        }
    }
}

/// Gate verdict for one path.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/gate-response.ts"
)]
pub struct GateResponse {
    pub path: String,
    /// `public`, `not_found` or `gated`.
    pub outcome: String,
    pub state: Option<String>,
    pub effect: Option<GateEffectResponse>,
    pub missing_permission: Option<String>,
    pub error: Option<String>,
}

impl GateResponse {
    pub fn new(path: String, outcome: PathOutcome) -> Self {
        match outcome {
            PathOutcome::Public => Self::bare(path, "public"),
            PathOutcome::NotFound => Self::bare(path, "not_found"),
            PathOutcome::Gated(state) => {
                let effect = state.effect(Some(path.as_str()));
                let (missing_permission, error) = match &state {
                    GateState::AuthenticatedNoAccess { missing } => {
                        (Some(missing.as_str().to_owned()), None)
                    }
                    GateState::ResolutionFailed(error) => (None, Some(error.to_string())),
                    _ => (None, None),
                };

                Self {
                    path,
                    outcome: "gated".to_owned(),
                    state: Some(state.as_str().to_owned()),
                    effect: Some(effect.into()),
                    missing_permission,
                    error,
                }
            }
        }
    }

    fn bare(path: String, outcome: &str) -> Self {
        Self {
            path,
            outcome: outcome.to_owned(),
            state: None,
            effect: None,
            missing_permission: None,
            error: None,
        }
    }
}

/// Effective permission keys of the current session.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permissions-response.ts"
)]
pub struct PermissionsResponse {
    pub permissions: Vec<String>,
}

impl From<&PermissionSet> for PermissionsResponse {
    fn from(value: &PermissionSet) -> Self {
        Self {
            permissions: permission_keys(value),
        }
    }
}

fn edit_status(status: EditStatus) -> String {
    match status {
        EditStatus::Committed => "committed",
        EditStatus::Pending => "pending",
        EditStatus::RolledBack => "rolled_back",
    }
    .to_owned()
}

/// One permission flag of a role.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permission-flag-response.ts"
)]
pub struct PermissionFlagResponse {
    pub key: String,
    pub label: String,
    pub granted: bool,
}

/// API representation of a role definition.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-response.ts"
)]
pub struct RoleResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub permissions: Vec<PermissionFlagResponse>,
    pub edit_status: String,
}

impl From<&RoleDefinition> for RoleResponse {
    fn from(value: &RoleDefinition) -> Self {
        Self {
            id: value.id().as_str().to_owned(),
            name: value.name().to_owned(),
            description: value.description().to_owned(),
            permissions: value
                .flags()
                .into_iter()
                .map(|(permission, granted)| PermissionFlagResponse {
                    key: permission.as_str().to_owned(),
                    label: permission.label().to_owned(),
                    granted,
                })
                .collect(),
            edit_status: edit_status(EditStatus::Committed),
        }
    }
}

impl From<AdminEntry<RoleDefinition>> for RoleResponse {
    fn from(value: AdminEntry<RoleDefinition>) -> Self {
        let mut response = Self::from(&value.value);
        response.edit_status = edit_status(value.status);
        response
    }
}

/// Incoming payload for role creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-role-request.ts"
)]
pub struct CreateRoleRequest {
    pub name: String,
}

/// Incoming payload toggling one role permission.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/set-role-permission-request.ts"
)]
pub struct SetRolePermissionRequest {
    pub granted: bool,
}

/// Incoming payload renaming a role.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/rename-role-request.ts"
)]
pub struct RenameRoleRequest {
    pub name: String,
}

/// API representation of an administered user profile.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/user-response.ts"
)]
pub struct UserResponse {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub roles: Vec<String>,
    pub status: String,
    pub active: bool,
    pub edit_status: String,
}

impl From<AdminEntry<UserProfile>> for UserResponse {
    fn from(value: AdminEntry<UserProfile>) -> Self {
        let profile = value.value;
        Self {
            id: profile.id().to_owned(),
            display_name: profile.display_name().to_owned(),
            email: profile.email().unwrap_or("No email").to_owned(),
            avatar_url: profile.avatar_url().map(str::to_owned),
            roles: profile.roles().to_vec(),
            status: profile.status().to_owned(),
            active: profile.is_active(),
            edit_status: edit_status(value.status),
        }
    }
}

/// Incoming payload replacing a user's roles.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/set-user-roles-request.ts"
)]
pub struct SetUserRolesRequest {
    pub roles: Vec<String>,
}

/// Incoming payload toggling a user's active flag.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/set-user-active-request.ts"
)]
pub struct SetUserActiveRequest {
    pub active: bool,
}

/// A rolled back administration change.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/notice-response.ts"
)]
pub struct NoticeResponse {
    pub entity: String,
    pub message: String,
}

impl From<AdminNotice> for NoticeResponse {
    fn from(value: AdminNotice) -> Self {
        Self {
            entity: value.entity,
            message: value.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use strollup_application::{GateState, PathOutcome};
    use strollup_core::ResolveError;
    use strollup_domain::Permission;

    use super::{
        CreateRoleRequest, GateEffectResponse, GateResponse, HealthResponse, IdentityResponse,
        NoticeResponse, OAuthCallbackRequest, OAuthRedirectResponse, OAuthStartRequest,
        PasswordSignInRequest, PermissionFlagResponse, PermissionsResponse, RenameRoleRequest,
        RoleResponse, SessionResponse, SetRolePermissionRequest, SetUserActiveRequest,
        SetUserRolesRequest, UserResponse,
    };

    use crate::error::ErrorResponse;
    use ts_rs::Config;
    use ts_rs::TS;

    #[test]
    fn export_ts_bindings() -> Result<(), ts_rs::ExportError> {
        let config = Config::default();

        HealthResponse::export(&config)?;
        IdentityResponse::export(&config)?;
        SessionResponse::export(&config)?;
        PasswordSignInRequest::export(&config)?;
        OAuthStartRequest::export(&config)?;
        OAuthRedirectResponse::export(&config)?;
        OAuthCallbackRequest::export(&config)?;
        GateEffectResponse::export(&config)?;
        GateResponse::export(&config)?;
        PermissionsResponse::export(&config)?;
        PermissionFlagResponse::export(&config)?;
        RoleResponse::export(&config)?;
        CreateRoleRequest::export(&config)?;
        SetRolePermissionRequest::export(&config)?;
        RenameRoleRequest::export(&config)?;
        UserResponse::export(&config)?;
        SetUserRolesRequest::export(&config)?;
        SetUserActiveRequest::export(&config)?;
        NoticeResponse::export(&config)?;
        ErrorResponse::export(&config)?;

        Ok(())
    }

    #[test]
    fn unauthenticated_gate_response_carries_the_return_path() {
        let response = GateResponse::new(
            "/app/roles".to_owned(),
            PathOutcome::Gated(GateState::Unauthenticated),
        );

        let Some(effect) = response.effect else {
            panic!("gated paths carry an effect");
        };
        assert_eq!(effect.effect, "redirect_to_sign_in");
        assert_eq!(effect.sign_in_path.as_deref(), Some("/login"));
        assert_eq!(effect.return_to.as_deref(), Some("/app/roles"));
    }

    #[test]
    fn denied_and_failed_gates_explain_themselves() {
        let denied = GateResponse::new(
            "/app/roles".to_owned(),
            PathOutcome::Gated(GateState::AuthenticatedNoAccess {
                missing: Permission::ViewRoles,
            }),
        );
        assert_eq!(denied.missing_permission.as_deref(), Some("view_roles"));
        assert_eq!(denied.state.as_deref(), Some("authenticated_no_access"));

        let failed = GateResponse::new(
            "/app".to_owned(),
            PathOutcome::Gated(GateState::ResolutionFailed(ResolveError::Network(
                "reset".to_owned(),
            ))),
        );
        assert!(failed.error.is_some());
        assert_eq!(
            failed.effect.map(|effect| effect.effect).as_deref(),
            Some("render_retry")
        );

        let public = GateResponse::new("/login".to_owned(), PathOutcome::Public);
        assert_eq!(public.outcome, "public");
        assert!(public.effect.is_none());
    }
}
