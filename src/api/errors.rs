use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::grading_workflow::WorkflowError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    TooManyRequests(&'static str),
    ServiceUnavailable(&'static str),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    pub(crate) fn validation(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| match &error.message {
                    Some(message) => message.to_string(),
                    None => format!("{field} is invalid"),
                })
            })
            .next()
            .unwrap_or_else(|| "Invalid request payload".to_string());
        Self::BadRequest(message)
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::ExamNotFound => Self::NotFound("Exam not found".to_string()),
            WorkflowError::StudentNotInClass => {
                Self::BadRequest("Student does not belong to this exam's class".to_string())
            }
            WorkflowError::InvalidInput(input) => Self::BadRequest(input.to_string()),
            WorkflowError::Storage(err) => {
                Self::internal(format!("{err:#}"), "Failed to store submission image")
            }
            WorkflowError::Store(err) => Self::internal(err, "Failed to save submission"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(message) => {
                let mut response = (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse { success: false, message: message.to_string() }),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                return response;
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::TooManyRequests(message) => {
                (StatusCode::TOO_MANY_REQUESTS, message.to_string())
            }
            ApiError::ServiceUnavailable(message) => {
                (StatusCode::SERVICE_UNAVAILABLE, message.to_string())
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        (status, Json(ErrorResponse { success: false, message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&body).expect("json"))
    }

    #[tokio::test]
    async fn errors_use_failure_envelope() {
        let (status, body) = body_of(ApiError::Conflict("Duplicate".to_string())).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body, serde_json::json!({"success": false, "message": "Duplicate"}));
    }

    #[tokio::test]
    async fn internal_errors_hide_detail() {
        let (status, body) =
            body_of(ApiError::internal("connection reset by peer", "Failed to load exam")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Failed to load exam");
    }

    #[tokio::test]
    async fn unavailable_dependency_maps_to_503() {
        let (status, body) =
            body_of(ApiError::ServiceUnavailable("Identity provider is not configured")).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn workflow_errors_map_to_statuses() {
        let (status, _) = body_of(WorkflowError::ExamNotFound.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = body_of(WorkflowError::StudentNotInClass.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
