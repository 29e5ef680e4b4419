use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, header};
use axum::middleware::Next;
use axum::response::Response;
use strollup_application::{AccessContext, GateState, SessionStore};
use strollup_core::{AppError, UserIdentity};
use strollup_domain::Permission;

use crate::error::ApiResult;
use crate::state::AppState;

/// Admits only the holder of the current session, and only when its
/// resolved permissions include `view_roles`.
pub async fn require_roles_access(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let presented = bearer_token(request.headers()).map(str::to_owned);
    let identity = roles_access(&state.access_context, presented.as_deref()).await?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Rejects requests that do not carry the current session's access token.
/// Without a current session there is nothing to protect and the request
/// passes.
pub async fn require_session_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    authorize_bearer(state.session_store(), bearer_token(request.headers())).await?;

    Ok(next.run(request).await)
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub(crate) async fn authorize_bearer(
    store: &SessionStore,
    presented: Option<&str>,
) -> Result<(), AppError> {
    let (session, _) = store.snapshot().await;
    match (session, presented) {
        (None, _) => Ok(()),
        (Some(session), Some(token)) if session.access_token() == token => Ok(()),
        (Some(_), Some(_)) => Err(AppError::Unauthorized(
            "bearer token does not match the current session".to_owned(),
        )),
        (Some(_), None) => Err(AppError::Unauthorized("bearer token required".to_owned())),
    }
}

pub(crate) async fn roles_access(
    context: &AccessContext,
    presented: Option<&str>,
) -> Result<UserIdentity, AppError> {
    authorize_bearer(context.session_store(), presented).await?;

    match context.evaluate(Some(Permission::ViewRoles)).await {
        GateState::AuthenticatedAllowed(grant) => Ok(grant.session().identity().clone()),
        GateState::Unauthenticated => Err(AppError::Unauthorized(
            "authentication required".to_owned(),
        )),
        GateState::AuthenticatedNoAccess { missing } => Err(AppError::Forbidden(format!(
            "missing permission '{}'",
            missing.as_str()
        ))),
        GateState::Loading => Err(AppError::Unavailable(
            "permissions are still loading".to_owned(),
        )),
        GateState::ResolutionFailed(error) => Err(error.into()),
    }
}

pub async fn require_same_origin_for_mutations(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if is_state_changing_method(request.method()) {
        let headers = request.headers();

        if let Some(fetch_site) = headers.get("sec-fetch-site") {
            if fetch_site == HeaderValue::from_static("cross-site") {
                return Err(AppError::Unauthorized("cross-site request blocked".to_owned()).into());
            }
        }

        let origin = headers
            .get(header::ORIGIN)
            .and_then(|value| value.to_str().ok());
        if let Some(origin) = origin {
            if origin != state.frontend_url {
                return Err(AppError::Unauthorized("origin validation failed".to_owned()).into());
            }
        }
    }

    Ok(next.run(request).await)
}

fn is_state_changing_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}
