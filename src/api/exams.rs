use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::classes::owned_class;
use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::core::state::AppState;
use crate::core::time::{parse_date, primitive_now_utc};
use crate::db::types::ActivityType;
use crate::repositories;
use crate::schemas::exam::{ExamCreate, ExamDetailResponse, ExamListItem, ExamResponse};
use crate::schemas::grade::SubmissionResponse;
use crate::schemas::ApiResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", post(create_exam).get(list_exams)).route("/:exam_id", get(get_exam))
}

async fn create_exam(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Json(payload): Json<ExamCreate>,
) -> Result<(StatusCode, Json<ApiResponse<ExamResponse>>), ApiError> {
    payload.validate().map_err(ApiError::validation)?;

    let exam_date = parse_date(&payload.exam_date)
        .ok_or_else(|| ApiError::BadRequest("exam_date must be in YYYY-MM-DD format".to_string()))?;
    let answer_key = payload.answer_key_json().map_err(ApiError::BadRequest)?;
    let class = owned_class(&state, &payload.class_id, &teacher.id).await?;

    let exam = repositories::exams::create(
        state.db(),
        repositories::exams::CreateExam {
            id: &Uuid::new_v4().to_string(),
            class_id: &class.id,
            teacher_id: &teacher.id,
            exam_name: payload.name.trim(),
            total_points: payload.total_points,
            answer_key,
            exam_date,
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create exam"))?;

    repositories::activity_log::record(
        state.db(),
        &teacher.id,
        ActivityType::CreateExam,
        &format!("Created exam {} for class {}", exam.exam_name, class.class_name),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Exam created successfully", ExamResponse::from_db(exam))),
    ))
}

async fn list_exams(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
) -> Result<Json<ApiResponse<Vec<ExamListItem>>>, ApiError> {
    let rows = repositories::exams::list_by_teacher(state.db(), &teacher.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;

    Ok(Json(ApiResponse::ok("Exams loaded", rows.into_iter().map(ExamListItem::from_row).collect())))
}

async fn get_exam(
    Path(exam_id): Path<String>,
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
) -> Result<Json<ApiResponse<ExamDetailResponse>>, ApiError> {
    let exam = repositories::exams::find_for_teacher(state.db(), &exam_id, &teacher.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))?;

    let class = repositories::classes::find_for_teacher(state.db(), &exam.class_id, &teacher.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam class"))?;

    let submissions = repositories::submissions::list_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam submissions"))?
        .into_iter()
        .map(SubmissionResponse::from_db)
        .collect();

    Ok(Json(ApiResponse::ok("Exam loaded", ExamDetailResponse::new(exam, class, submissions))))
}
