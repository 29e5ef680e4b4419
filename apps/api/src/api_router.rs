use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use strollup_core::AppError;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

mod cors;

pub fn build_router(app_state: AppState, frontend_url: &str) -> Result<Router, AppError> {
    let admin_routes = Router::new()
        .route(
            "/api/admin/roles",
            get(handlers::admin::list_roles_handler).post(handlers::admin::create_role_handler),
        )
        .route(
            "/api/admin/roles/{role_id}/permissions/{permission}",
            put(handlers::admin::set_role_permission_handler),
        )
        .route(
            "/api/admin/roles/{role_id}/name",
            put(handlers::admin::rename_role_handler),
        )
        .route(
            "/api/admin/roles/{role_id}",
            delete(handlers::admin::delete_role_handler),
        )
        .route("/api/admin/users", get(handlers::admin::list_users_handler))
        .route(
            "/api/admin/users/{user_id}/roles",
            put(handlers::admin::set_user_roles_handler),
        )
        .route(
            "/api/admin/users/{user_id}/active",
            put(handlers::admin::set_user_active_handler),
        )
        .route(
            "/api/admin/notices",
            get(handlers::admin::list_notices_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_roles_access,
        ));

    let sign_in_routes = Router::new()
        .route(
            "/api/session/password",
            post(handlers::session::password_sign_in_handler),
        )
        .route(
            "/api/session/oauth",
            post(handlers::session::oauth_start_handler),
        )
        .route(
            "/api/session/oauth/callback",
            post(handlers::session::oauth_callback_handler),
        );

    let session_routes = Router::new()
        .route(
            "/api/session",
            get(handlers::session::session_handler).delete(handlers::session::sign_out_handler),
        )
        .route(
            "/api/session/refresh",
            post(handlers::session::refresh_session_handler),
        )
        .route("/api/gate", get(handlers::gate::gate_handler))
        .route(
            "/api/permissions/refresh",
            post(handlers::gate::refresh_permissions_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_session_token,
        ));

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(sign_in_routes)
        .merge(session_routes)
        .merge(admin_routes)
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_same_origin_for_mutations,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors::build_cors_layer(frontend_url)?)
        .with_state(app_state))
}
