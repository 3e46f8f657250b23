use axum::{extract::State, routing::get, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::core::state::AppState;
use crate::db::types::SubmissionStatus;
use crate::repositories;
use crate::schemas::dashboard::{DashboardResponse, DashboardStats, RECENT_GRADES_LIMIT};
use crate::schemas::grade::GradeListItem;
use crate::schemas::ApiResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(dashboard))
}

/// Totals and the latest graded submissions, all scoped to the caller.
async fn dashboard(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
) -> Result<Json<ApiResponse<DashboardResponse>>, ApiError> {
    let db = state.db();
    let failed = |e: sqlx::Error| ApiError::internal(e, "Failed to load dashboard");

    let total_classes =
        repositories::classes::count_by_teacher(db, &teacher.id).await.map_err(failed)?;
    let total_exams = repositories::exams::count_by_teacher(db, &teacher.id).await.map_err(failed)?;
    let total_graded =
        repositories::submissions::count_graded_for_teacher(db, &teacher.id).await.map_err(failed)?;
    let recent = repositories::submissions::list_for_teacher(
        db,
        &teacher.id,
        None,
        Some(SubmissionStatus::Graded),
        Some(RECENT_GRADES_LIMIT),
    )
    .await
    .map_err(failed)?;

    Ok(Json(ApiResponse::ok(
        "Dashboard loaded",
        DashboardResponse {
            stats: DashboardStats { total_classes, total_exams, total_graded },
            recent_grades: recent.into_iter().map(GradeListItem::from_row).collect(),
        },
    )))
}
