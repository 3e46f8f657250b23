use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::api::validation::validate_exam_upload;
use crate::core::redis::grading_rate_key;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::{ActivityType, SubmissionStatus};
use crate::repositories;
use crate::repositories::submissions::SubmissionCorrection;
use crate::schemas::grade::{
    GradeListItem, GradeListQuery, GradeUpdate, GradedSubmissionResponse, SubmissionResponse,
};
use crate::schemas::ApiResponse;
use crate::services::grading_workflow::{
    process_submission, GradingContext, PgGradingStore, SubmissionIntake,
};
use crate::services::student_matching::SubstringCodeMatcher;
use crate::services::uploads::UploadedImage;

const SUBMISSION_FIELD: &str = "submission";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_grades).post(grade_submission))
        .route("/:submission_id", patch(update_grade))
}

struct GradingForm {
    exam_id: String,
    student_id: Option<String>,
    image: UploadedImage,
}

async fn grade_submission(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<GradedSubmissionResponse>>), ApiError> {
    let grading = state.settings().grading();
    let allowed = state
        .redis()
        .rate_limit(&grading_rate_key(&teacher.id), grading.rate_limit, grading.rate_window_seconds)
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Grading rate limit check failed; allowing request");
            true
        });
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many grading requests, try again later"));
    }

    let form = read_grading_form(&state, &mut multipart).await?;
    let exam_id = form.exam_id.clone();

    let store = PgGradingStore::new(state.db());
    let ctx = GradingContext {
        store: &store,
        oracle: state.oracle(),
        matcher: &SubstringCodeMatcher,
        images: state.uploads(),
    };

    let outcome = process_submission(
        &ctx,
        SubmissionIntake {
            teacher_id: teacher.id.clone(),
            exam_id: form.exam_id,
            student_id: form.student_id,
            image: form.image,
        },
    )
    .await?;

    let description = match outcome.submission.student_id.as_deref() {
        Some(student_id) => format!("Graded exam {exam_id} for student {student_id}"),
        None => format!("Graded exam {exam_id}; student not matched"),
    };
    repositories::activity_log::record(
        state.db(),
        &teacher.id,
        ActivityType::GradeSubmission,
        &description,
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "Exam processed successfully",
            GradedSubmissionResponse::from_outcome(outcome),
        )),
    ))
}

async fn read_grading_form(
    state: &AppState,
    multipart: &mut Multipart,
) -> Result<GradingForm, ApiError> {
    let uploads = state.settings().uploads();
    let max_bytes = uploads.max_upload_bytes();

    let mut exam_id: Option<String> = None;
    let mut student_id: Option<String> = None;
    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            SUBMISSION_FIELD => {
                let filename = field.file_name().unwrap_or("").to_string();
                let content_type = field.content_type().map(|s| s.to_string());
                let mut bytes = Vec::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
                {
                    if bytes.len() as u64 + chunk.len() as u64 > max_bytes {
                        return Err(ApiError::BadRequest(format!(
                            "File size exceeds {}MB limit",
                            uploads.max_upload_size_mb
                        )));
                    }
                    bytes.extend_from_slice(&chunk);
                }
                file = Some((filename, content_type, bytes));
            }
            "exam_id" | "student_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::BadRequest(format!("Invalid {name} field")))?;
                let value = Some(text.trim().to_string()).filter(|value| !value.is_empty());
                if name == "exam_id" {
                    exam_id = value;
                } else {
                    student_id = value;
                }
            }
            _ => {}
        }
    }

    let exam_id = exam_id.ok_or_else(|| ApiError::BadRequest("exam_id is required".to_string()))?;
    let (filename, content_type, bytes) = file
        .ok_or_else(|| ApiError::BadRequest("Submission image is required".to_string()))?;

    let image = validate_exam_upload(
        &filename,
        content_type.as_deref(),
        bytes,
        &uploads.allowed_extensions,
        max_bytes,
    )?;

    Ok(GradingForm { exam_id, student_id, image })
}

async fn list_grades(
    Query(query): Query<GradeListQuery>,
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
) -> Result<Json<ApiResponse<Vec<GradeListItem>>>, ApiError> {
    let status = query.status_filter().map_err(ApiError::BadRequest)?;
    let exam_id = query.exam_id.as_deref().map(str::trim).filter(|value| !value.is_empty());

    let rows =
        repositories::submissions::list_for_teacher(state.db(), &teacher.id, exam_id, status, None)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list grades"))?;

    Ok(Json(ApiResponse::ok("Grades loaded", rows.into_iter().map(GradeListItem::from_row).collect())))
}

async fn update_grade(
    Path(submission_id): Path<String>,
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Json(payload): Json<GradeUpdate>,
) -> Result<Json<ApiResponse<SubmissionResponse>>, ApiError> {
    payload.validate().map_err(ApiError::validation)?;

    let submission =
        repositories::submissions::find_for_teacher(state.db(), &submission_id, &teacher.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load submission"))?
            .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    let exam = repositories::exams::find_for_teacher(state.db(), &submission.exam_id, &teacher.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))?;

    if let Some(score) = payload.graded_score {
        if !score.is_finite() || score > f64::from(exam.total_points) {
            return Err(ApiError::BadRequest(format!(
                "graded_score must be between 0 and {}",
                exam.total_points
            )));
        }
    }

    let student_id = match payload.student_id.as_deref().map(str::trim) {
        Some("") => {
            return Err(ApiError::BadRequest("student_id must not be empty".to_string()));
        }
        Some(student_id) => {
            let student =
                repositories::students::find_in_class(state.db(), student_id, &exam.class_id)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to load student"))?
                    .ok_or_else(|| {
                        ApiError::BadRequest(
                            "Student does not belong to this exam's class".to_string(),
                        )
                    })?;
            Some(student.id)
        }
        None => None,
    };

    let status = payload
        .status
        .or_else(|| student_id.as_ref().map(|_| SubmissionStatus::Graded));

    let updated = repositories::submissions::apply_correction(
        state.db(),
        &submission.id,
        SubmissionCorrection {
            graded_score: payload.graded_score,
            feedback: payload.feedback,
            status,
            student_id,
            question_results: payload.question_results,
        },
        primitive_now_utc(),
    )
    .await;

    let updated = match updated {
        Ok(updated) => updated,
        Err(err) if repositories::is_unique_violation(&err) => {
            return Err(ApiError::Conflict(
                "This student already has a submission for the exam".to_string(),
            ));
        }
        Err(err) => return Err(ApiError::internal(err, "Failed to update grade")),
    };

    repositories::activity_log::record(
        state.db(),
        &teacher.id,
        ActivityType::UpdateGrade,
        &format!("Updated grade for submission {} in exam {}", updated.id, exam.exam_name),
    )
    .await;

    Ok(Json(ApiResponse::ok("Grade updated successfully", SubmissionResponse::from_db(updated))))
}
