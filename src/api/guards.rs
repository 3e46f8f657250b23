use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::security::{self, Claims};
use crate::core::state::AppState;
use crate::db::models::Teacher;
use crate::repositories;

/// A verified identity-provider token; no teacher profile required.
pub(crate) struct CurrentIdentity(pub(crate) Claims);

/// The teacher profile behind a verified token.
pub(crate) struct CurrentTeacher(pub(crate) Teacher);

#[async_trait]
impl FromRequestParts<AppState> for CurrentIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(security::bearer_token)
            .ok_or(ApiError::Unauthorized("Access token required"))?;

        let claims = security::verify_token(token, app_state.settings()).map_err(|err| {
            tracing::debug!(error = %err, "Rejected access token");
            ApiError::Unauthorized("Invalid or expired token")
        })?;

        Ok(CurrentIdentity(claims))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentTeacher {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentIdentity(claims) = CurrentIdentity::from_request_parts(parts, state).await?;

        let teacher = repositories::teachers::find_by_user_id(state.db(), &claims.sub)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load teacher profile"))?;

        teacher.map(CurrentTeacher).ok_or_else(|| ApiError::NotFound("Teacher not found".to_string()))
    }
}
