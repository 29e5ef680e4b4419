use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::IntoResponse;
use strollup_core::AppError;

use crate::api_services::memory_state_for_tests;
use crate::dto::{
    CreateRoleRequest, GateQuery, GateResponse, OAuthCallbackRequest, OAuthStartRequest,
    PasswordSignInRequest, RenameRoleRequest, SessionResponse, SetRolePermissionRequest,
    SetUserRolesRequest,
};
use crate::error::ApiResult;
use crate::middleware::{authorize_bearer, bearer_token, roles_access};
use crate::state::AppState;

use super::{admin, gate, health, session};

const ADMIN_PASSWORD: &str = "change-me-please";

fn status<T>(result: ApiResult<T>) -> StatusCode
where
    T: IntoResponse,
{
    match result {
        Ok(response) => response.into_response().status(),
        Err(error) => error.into_response().status(),
    }
}

async fn gate_for(state: &AppState, path: &str) -> GateResponse {
    let Json(response) = gate::gate_handler(
        State(state.clone()),
        Query(GateQuery {
            path: path.to_owned(),
        }),
    )
    .await;
    response
}

async fn sign_in_admin(state: &AppState) -> SessionResponse {
    let result = session::password_sign_in_handler(
        State(state.clone()),
        Json(PasswordSignInRequest {
            email: "admin@strollup.local".to_owned(),
            password: ADMIN_PASSWORD.to_owned(),
        }),
    )
    .await;

    match result {
        Ok(Json(response)) => response,
        Err(error) => panic!("admin sign-in failed: {:?}", error.0),
    }
}

fn effect_name(response: &GateResponse) -> Option<&str> {
    response
        .effect
        .as_ref()
        .map(|effect| effect.effect.as_str())
}

#[tokio::test]
async fn health_reports_ok() {
    let Json(response) = health::health_handler().await;
    assert_eq!(response.status, "ok");
}

#[tokio::test]
async fn signed_out_navigation_redirects_with_the_destination() {
    let state = memory_state_for_tests(ADMIN_PASSWORD).await;

    let response = gate_for(&state, "/app/dashboard").await;
    assert_eq!(response.state.as_deref(), Some("unauthenticated"));
    assert_eq!(effect_name(&response), Some("redirect_to_sign_in"));
    assert_eq!(
        response
            .effect
            .and_then(|effect| effect.return_to)
            .as_deref(),
        Some("/app/dashboard")
    );

    assert_eq!(gate_for(&state, "/login").await.outcome, "public");
    assert_eq!(gate_for(&state, "/app/unknown").await.outcome, "not_found");
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let state = memory_state_for_tests(ADMIN_PASSWORD).await;

    let result = session::password_sign_in_handler(
        State(state.clone()),
        Json(PasswordSignInRequest {
            email: "admin@strollup.local".to_owned(),
            password: "not-the-password".to_owned(),
        }),
    )
    .await;

    assert_eq!(status(result), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_sign_in_settles_permissions_before_answering() {
    let state = memory_state_for_tests(ADMIN_PASSWORD).await;

    let response = sign_in_admin(&state).await;

    assert_eq!(response.permission_state, "resolved");
    assert_eq!(response.permissions.len(), 6);
    assert!(response.identity.is_some());
    assert_eq!(
        effect_name(&gate_for(&state, "/app/roles").await),
        Some("render_view")
    );
}

fn issued_token(response: &SessionResponse) -> &str {
    match response.access_token.as_deref() {
        Some(token) => token,
        None => panic!("signed-in session response carries its access token"),
    }
}

#[tokio::test]
async fn administration_requires_view_roles() {
    let state = memory_state_for_tests(ADMIN_PASSWORD).await;

    assert!(matches!(
        roles_access(&state.access_context, None).await,
        Err(AppError::Unauthorized(_))
    ));

    let signed_in = sign_in_admin(&state).await;
    assert!(
        roles_access(&state.access_context, Some(issued_token(&signed_in)))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn administration_rejects_requests_without_the_session_token() {
    let state = memory_state_for_tests(ADMIN_PASSWORD).await;
    let signed_in = sign_in_admin(&state).await;

    assert!(matches!(
        roles_access(&state.access_context, None).await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        roles_access(&state.access_context, Some("forged-token")).await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        authorize_bearer(state.session_store(), None).await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(
        authorize_bearer(state.session_store(), Some(issued_token(&signed_in)))
            .await
            .is_ok()
    );

    let rejected: ApiResult<()> = roles_access(&state.access_context, None)
        .await
        .map(|_| ())
        .map_err(Into::into);
    assert_eq!(status(rejected), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_routes_are_open_while_signed_out() {
    let state = memory_state_for_tests(ADMIN_PASSWORD).await;

    assert!(authorize_bearer(state.session_store(), None).await.is_ok());
}

#[test]
fn bearer_token_is_read_from_the_authorization_header() {
    let mut headers = HeaderMap::new();
    assert_eq!(bearer_token(&headers), None);

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
    assert_eq!(bearer_token(&headers), None);

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok-123"));
    assert_eq!(bearer_token(&headers), Some("tok-123"));
}

#[tokio::test]
async fn role_creation_conflicts_on_duplicate_names() {
    let state = memory_state_for_tests(ADMIN_PASSWORD).await;
    sign_in_admin(&state).await;

    let created = admin::create_role_handler(
        State(state.clone()),
        Json(CreateRoleRequest {
            name: "Field Ops".to_owned(),
        }),
    )
    .await;
    let Ok((code, Json(role))) = created else {
        panic!("role creation should succeed");
    };
    assert_eq!(code, StatusCode::CREATED);
    assert_eq!(role.id, "field-ops");
    assert!(role.permissions.iter().all(|flag| !flag.granted));

    let duplicate = admin::create_role_handler(
        State(state.clone()),
        Json(CreateRoleRequest {
            name: "field ops".to_owned(),
        }),
    )
    .await;
    assert_eq!(status(duplicate), StatusCode::CONFLICT);
}

#[tokio::test]
async fn permission_toggle_validates_the_key() {
    let state = memory_state_for_tests(ADMIN_PASSWORD).await;
    sign_in_admin(&state).await;

    let unknown = admin::set_role_permission_handler(
        State(state.clone()),
        Path(("sales".to_owned(), "launch_rockets".to_owned())),
        Json(SetRolePermissionRequest { granted: true }),
    )
    .await;
    assert_eq!(status(unknown), StatusCode::BAD_REQUEST);

    let granted = admin::set_role_permission_handler(
        State(state.clone()),
        Path(("sales".to_owned(), "view_analytics".to_owned())),
        Json(SetRolePermissionRequest { granted: true }),
    )
    .await;
    assert_eq!(status(granted), StatusCode::NO_CONTENT);

    let Ok(Json(roles)) = admin::list_roles_handler(State(state.clone())).await else {
        panic!("roles should list");
    };
    let Some(sales) = roles.iter().find(|role| role.id == "sales") else {
        panic!("sales role should exist");
    };
    assert!(
        sales
            .permissions
            .iter()
            .any(|flag| flag.key == "view_analytics" && flag.granted)
    );
}

#[tokio::test]
async fn assigned_roles_cannot_be_deleted_but_renamed_ones_can() {
    let state = memory_state_for_tests(ADMIN_PASSWORD).await;
    sign_in_admin(&state).await;

    let in_use = admin::delete_role_handler(State(state.clone()), Path("admin".to_owned())).await;
    assert_eq!(status(in_use), StatusCode::CONFLICT);

    let renamed = admin::rename_role_handler(
        State(state.clone()),
        Path("sales".to_owned()),
        Json(RenameRoleRequest {
            name: "Account Managers".to_owned(),
        }),
    )
    .await;
    assert_eq!(status(renamed), StatusCode::NO_CONTENT);

    let deleted = admin::delete_role_handler(State(state.clone()), Path("sales".to_owned())).await;
    assert_eq!(status(deleted), StatusCode::NO_CONTENT);

    let Ok(Json(roles)) = admin::list_roles_handler(State(state.clone())).await else {
        panic!("roles should list");
    };
    let names: Vec<&str> = roles.iter().map(|role| role.name.as_str()).collect();
    assert_eq!(names, vec!["Admin"]);
}

#[tokio::test]
async fn removing_own_admin_role_revokes_access_immediately() {
    let state = memory_state_for_tests(ADMIN_PASSWORD).await;
    let signed_in = sign_in_admin(&state).await;
    let token = issued_token(&signed_in).to_owned();
    let Some(identity) = signed_in.identity else {
        panic!("signed-in session carries an identity");
    };

    let updated = admin::set_user_roles_handler(
        State(state.clone()),
        Path(identity.id.clone()),
        Json(SetUserRolesRequest {
            roles: vec!["Sales".to_owned()],
        }),
    )
    .await;
    assert_eq!(status(updated), StatusCode::NO_CONTENT);

    assert!(matches!(
        roles_access(&state.access_context, Some(token.as_str())).await,
        Err(AppError::Forbidden(_))
    ));
    assert_eq!(
        effect_name(&gate_for(&state, "/app/contacts").await),
        Some("render_view")
    );
    assert_eq!(
        gate_for(&state, "/app/roles").await.missing_permission.as_deref(),
        Some("view_roles")
    );
}

#[tokio::test]
async fn unknown_role_assignment_is_not_found() {
    let state = memory_state_for_tests(ADMIN_PASSWORD).await;
    let signed_in = sign_in_admin(&state).await;
    let Some(identity) = signed_in.identity else {
        panic!("signed-in session carries an identity");
    };

    let updated = admin::set_user_roles_handler(
        State(state.clone()),
        Path(identity.id),
        Json(SetUserRolesRequest {
            roles: vec!["Ghost".to_owned()],
        }),
    )
    .await;
    assert_eq!(status(updated), StatusCode::NOT_FOUND);

    let Json(notices) = admin::list_notices_handler(State(state.clone())).await;
    assert!(notices.is_empty());
}

#[tokio::test]
async fn sign_out_returns_to_the_signed_out_gate() {
    let state = memory_state_for_tests(ADMIN_PASSWORD).await;
    sign_in_admin(&state).await;

    let Json(response) = session::sign_out_handler(State(state.clone())).await;

    assert!(response.identity.is_none());
    assert!(response.access_token.is_none());
    assert!(response.permissions.is_empty());
    assert_eq!(
        gate_for(&state, "/app").await.state.as_deref(),
        Some("unauthenticated")
    );
}

#[tokio::test]
async fn oauth_round_trip_signs_in_without_permissions() {
    let state = memory_state_for_tests(ADMIN_PASSWORD).await;

    let unsupported = session::oauth_start_handler(
        State(state.clone()),
        Json(OAuthStartRequest {
            provider: "myspace".to_owned(),
        }),
    )
    .await;
    assert_eq!(status(unsupported), StatusCode::BAD_REQUEST);

    let started = session::oauth_start_handler(
        State(state.clone()),
        Json(OAuthStartRequest {
            provider: "github".to_owned(),
        }),
    )
    .await;
    let Ok(Json(redirect)) = started else {
        panic!("oauth start should succeed");
    };
    let Ok(url) = url::Url::parse(redirect.authorize_url.as_str()) else {
        panic!("authorize URL should parse");
    };
    let fragment = url.fragment().unwrap_or_default().to_owned();
    let value = |key: &str| {
        url::form_urlencoded::parse(fragment.as_bytes())
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default()
    };

    let completed = session::oauth_callback_handler(
        State(state.clone()),
        Json(OAuthCallbackRequest {
            access_token: value("access_token"),
            refresh_token: value("refresh_token"),
            expires_in: 3600,
        }),
    )
    .await;
    let Ok(Json(response)) = completed else {
        panic!("oauth callback should succeed");
    };

    assert_eq!(
        response.identity.and_then(|identity| identity.email).as_deref(),
        Some("github-user@strollup.local")
    );
    assert!(response.permissions.is_empty());
    assert_eq!(
        effect_name(&gate_for(&state, "/app/dashboard").await),
        Some("render_access_denied")
    );
    assert_eq!(
        effect_name(&gate_for(&state, "/app/alerts").await),
        Some("render_view")
    );
}

#[tokio::test]
async fn serialized_gate_response_uses_snake_case_fields() {
    let state = memory_state_for_tests(ADMIN_PASSWORD).await;

    let response = gate_for(&state, "/app/settings").await;
    let Ok(value) = serde_json::to_value(&response) else {
        panic!("gate response should serialize");
    };

    assert_eq!(value["outcome"], "gated");
    assert_eq!(value["effect"]["sign_in_path"], "/login");
}
