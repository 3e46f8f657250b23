use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentIdentity, CurrentTeacher};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::teacher::{
    AccountResponse, LoginRequest, LoginResponse, ProfileCreate, SignupRequest, TeacherResponse,
};
use crate::schemas::ApiResponse;
use crate::services::identity::IdentityError;

/// Max signup or login attempts per email and window.
const AUTH_RATE_LIMIT: u64 = 10;
const AUTH_RATE_WINDOW_SECONDS: u64 = 60;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/profile", get(get_profile).post(create_profile))
}

async fn check_auth_rate(state: &AppState, action: &str, email: &str) -> Result<(), ApiError> {
    let key = format!("rl:{action}:{}", email.to_lowercase());
    let allowed = state
        .redis()
        .rate_limit(&key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, action, "Auth rate limit check failed; allowing request");
            true
        });
    if allowed {
        Ok(())
    } else {
        Err(ApiError::TooManyRequests("Too many attempts, try again later"))
    }
}

fn identity_failure(err: IdentityError, context: &str) -> ApiError {
    match err {
        IdentityError::NotConfigured => {
            ApiError::ServiceUnavailable("Identity provider is not configured")
        }
        other => ApiError::internal(other, context),
    }
}

/// Creates the identity-provider account and its teacher profile together.
///
/// A failed profile insert deletes the fresh account again so the email can
/// be reused.
async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AccountResponse>>), ApiError> {
    payload.validate().map_err(ApiError::validation)?;
    let email = payload.email.trim();
    let name = payload.name.trim();
    check_auth_rate(&state, "signup", email).await?;

    let user = match state.identity().create_user(email, &payload.password).await {
        Ok(user) => user,
        Err(IdentityError::Rejected(message)) => return Err(ApiError::BadRequest(message)),
        Err(err) => return Err(identity_failure(err, "Failed to create account")),
    };

    let created = repositories::teachers::create(
        state.db(),
        &Uuid::new_v4().to_string(),
        &user.id,
        name,
        primitive_now_utc(),
    )
    .await;

    let teacher = match created {
        Ok(teacher) => teacher,
        Err(err) => {
            if let Err(cleanup) = state.identity().delete_user(&user.id).await {
                tracing::warn!(
                    error = %cleanup,
                    user_id = %user.id,
                    "Failed to remove account after profile insert failed"
                );
            }
            return Err(ApiError::internal(err, "Failed to create teacher profile"));
        }
    };

    tracing::info!(teacher_id = %teacher.id, user_id = %user.id, "Teacher account created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "User created successfully",
            AccountResponse {
                id: user.id,
                email: user.email.unwrap_or_else(|| email.to_string()),
                name: teacher.full_name,
            },
        )),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    payload.validate().map_err(ApiError::validation)?;
    let email = payload.email.trim();
    check_auth_rate(&state, "login", email).await?;

    let session = match state.identity().sign_in(email, &payload.password).await {
        Ok(session) => session,
        Err(IdentityError::Rejected(message)) => {
            tracing::debug!(reason = %message, "Password sign-in rejected");
            return Err(ApiError::Unauthorized("Invalid credentials"));
        }
        Err(err) => return Err(identity_failure(err, "Failed to sign in")),
    };

    let teacher = repositories::teachers::find_by_user_id(state.db(), &session.user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load teacher profile"))?
        .ok_or_else(|| ApiError::NotFound("Teacher profile not found".to_string()))?;

    Ok(Json(ApiResponse::ok(
        "Login successful",
        LoginResponse {
            token: session.access_token,
            user: AccountResponse {
                id: session.user.id,
                email: session.user.email.unwrap_or_else(|| email.to_string()),
                name: teacher.full_name,
            },
        },
    )))
}

async fn get_profile(
    CurrentTeacher(teacher): CurrentTeacher,
) -> Json<ApiResponse<TeacherResponse>> {
    Json(ApiResponse::ok("Profile loaded", TeacherResponse::from_db(teacher)))
}

/// Links a token issued elsewhere to a teacher profile, or renames the existing one.
async fn create_profile(
    State(state): State<AppState>,
    CurrentIdentity(claims): CurrentIdentity,
    Json(payload): Json<ProfileCreate>,
) -> Result<(StatusCode, Json<ApiResponse<TeacherResponse>>), ApiError> {
    payload.validate().map_err(ApiError::validation)?;

    let teacher = repositories::teachers::upsert_profile(
        state.db(),
        &Uuid::new_v4().to_string(),
        &claims.sub,
        payload.name.trim(),
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to save teacher profile"))?;

    tracing::info!(teacher_id = %teacher.id, user_id = %teacher.user_id, "Teacher profile saved");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Profile saved", TeacherResponse::from_db(teacher))),
    ))
}
