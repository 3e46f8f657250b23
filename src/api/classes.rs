use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Class;
use crate::db::types::ActivityType;
use crate::repositories;
use crate::schemas::class::{ClassCreate, ClassResponse, StudentCreate, StudentResponse};
use crate::schemas::ApiResponse;
use crate::services::class_analysis::{self, ClassAnalysis};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_class).get(list_classes))
        .route("/students", post(add_student))
        .route("/:class_id/students", get(list_students))
        .route("/:class_id/analysis", get(analyze_class))
}

pub(crate) async fn owned_class(
    state: &AppState,
    class_id: &str,
    teacher_id: &str,
) -> Result<Class, ApiError> {
    repositories::classes::find_for_teacher(state.db(), class_id, teacher_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load class"))?
        .ok_or_else(|| ApiError::NotFound("Class not found".to_string()))
}

async fn create_class(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Json(payload): Json<ClassCreate>,
) -> Result<(StatusCode, Json<ApiResponse<ClassResponse>>), ApiError> {
    payload.validate().map_err(ApiError::validation)?;

    let class = repositories::classes::create(
        state.db(),
        repositories::classes::CreateClass {
            id: &Uuid::new_v4().to_string(),
            teacher_id: &teacher.id,
            class_name: payload.name.trim(),
            grade_level: payload.grade_level.trim(),
            subject: payload.subject.trim(),
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create class"))?;

    repositories::activity_log::record(
        state.db(),
        &teacher.id,
        ActivityType::CreateClass,
        &format!("Created class {}", class.class_name),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Class created successfully", ClassResponse::from_db(class))),
    ))
}

async fn list_classes(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
) -> Result<Json<ApiResponse<Vec<ClassResponse>>>, ApiError> {
    let rows = repositories::classes::list_by_teacher(state.db(), &teacher.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list classes"))?;

    let classes = rows.into_iter().map(ClassResponse::from_row).collect();
    Ok(Json(ApiResponse::ok("Classes loaded", classes)))
}

async fn add_student(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Json(payload): Json<StudentCreate>,
) -> Result<(StatusCode, Json<ApiResponse<StudentResponse>>), ApiError> {
    payload.validate().map_err(ApiError::validation)?;
    let class = owned_class(&state, &payload.class_id, &teacher.id).await?;

    let created = repositories::students::create(
        state.db(),
        repositories::students::CreateStudent {
            id: &Uuid::new_v4().to_string(),
            class_id: &class.id,
            student_name: payload.name.trim(),
            roster_code: payload.roster_code.trim(),
            created_at: primitive_now_utc(),
        },
    )
    .await;

    let student = match created {
        Ok(student) => student,
        Err(err) if repositories::is_unique_violation(&err) => {
            return Err(ApiError::Conflict(
                "A student with this code already exists in the class".to_string(),
            ));
        }
        Err(err) => return Err(ApiError::internal(err, "Failed to add student")),
    };

    repositories::activity_log::record(
        state.db(),
        &teacher.id,
        ActivityType::AddStudent,
        &format!("Added student {} to class {}", student.student_name, class.class_name),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Student added successfully", StudentResponse::from_db(student))),
    ))
}

async fn list_students(
    Path(class_id): Path<String>,
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
) -> Result<Json<ApiResponse<Vec<StudentResponse>>>, ApiError> {
    let class = owned_class(&state, &class_id, &teacher.id).await?;

    let students = repositories::students::list_by_class(state.db(), &class.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list students"))?;

    let students = students.into_iter().map(StudentResponse::from_db).collect();
    Ok(Json(ApiResponse::ok("Students loaded", students)))
}

async fn analyze_class(
    Path(class_id): Path<String>,
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
) -> Result<Json<ApiResponse<ClassAnalysis>>, ApiError> {
    let class = owned_class(&state, &class_id, &teacher.id).await?;

    let scores = repositories::classes::list_scores(state.db(), &class.id, &teacher.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load class scores"))?;

    Ok(Json(ApiResponse::ok("Class analysis loaded", class_analysis::analyze(&scores))))
}
