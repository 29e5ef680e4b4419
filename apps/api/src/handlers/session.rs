use axum::Json;
use axum::extract::State;
use strollup_application::{OAuthCallback, OAuthProvider};

use crate::dto::{
    OAuthCallbackRequest, OAuthRedirectResponse, OAuthStartRequest, PasswordSignInRequest,
    SessionResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

async fn settled(state: &AppState) -> Json<SessionResponse> {
    let snapshot = state.access_context.sync().await;
    Json(SessionResponse::from(&snapshot))
}

pub async fn session_handler(State(state): State<AppState>) -> Json<SessionResponse> {
    state.session_store().expire_if_due().await;
    settled(&state).await
}

pub async fn password_sign_in_handler(
    State(state): State<AppState>,
    Json(payload): Json<PasswordSignInRequest>,
) -> ApiResult<Json<SessionResponse>> {
    state
        .session_store()
        .sign_in_with_credentials(payload.email.as_str(), payload.password.as_str())
        .await?;

    Ok(settled(&state).await)
}

pub async fn oauth_start_handler(
    State(state): State<AppState>,
    Json(payload): Json<OAuthStartRequest>,
) -> ApiResult<Json<OAuthRedirectResponse>> {
    let provider = payload.provider.parse::<OAuthProvider>()?;
    let redirect = state.session_store().sign_in_with_oauth(provider).await?;

    Ok(Json(OAuthRedirectResponse::from(redirect)))
}

pub async fn oauth_callback_handler(
    State(state): State<AppState>,
    Json(payload): Json<OAuthCallbackRequest>,
) -> ApiResult<Json<SessionResponse>> {
    state
        .session_store()
        .complete_oauth_sign_in(OAuthCallback {
            access_token: payload.access_token,
            refresh_token: payload.refresh_token,
            expires_in: payload.expires_in,
        })
        .await?;

    Ok(settled(&state).await)
}

pub async fn refresh_session_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<SessionResponse>> {
    state.session_store().refresh().await?;

    Ok(settled(&state).await)
}

pub async fn sign_out_handler(State(state): State<AppState>) -> Json<SessionResponse> {
    state.session_store().sign_out().await;
    settled(&state).await
}
