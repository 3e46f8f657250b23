use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::history::{ActivityResponse, HistoryQuery};
use crate::schemas::ApiResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(list_history))
}

async fn list_history(
    Query(query): Query<HistoryQuery>,
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
) -> Result<Json<ApiResponse<Vec<ActivityResponse>>>, ApiError> {
    let entries =
        repositories::activity_log::list_by_teacher(state.db(), &teacher.id, query.effective_limit())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load history"))?;

    Ok(Json(ApiResponse::ok(
        "History loaded",
        entries.into_iter().map(ActivityResponse::from_db).collect(),
    )))
}
