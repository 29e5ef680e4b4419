use axum::Json;
use axum::extract::{Query, State};

use crate::dto::{GateQuery, GateResponse, PermissionsResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn gate_handler(
    State(state): State<AppState>,
    Query(query): Query<GateQuery>,
) -> Json<GateResponse> {
    let outcome = state.access_context.evaluate_path(query.path.as_str()).await;

    Json(GateResponse::new(query.path, outcome))
}

pub async fn refresh_permissions_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<PermissionsResponse>> {
    let permissions = state.access_context.refresh_permissions().await?;

    Ok(Json(PermissionsResponse::from(&permissions)))
}
