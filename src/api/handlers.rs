use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::collections::HashMap;

use crate::api::errors::ApiError;
use crate::core::metrics;
use crate::core::redis::RedisHealth;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::{HealthResponse, RootResponse};

pub(crate) async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let settings = state.settings();

    Json(RootResponse {
        success: true,
        message: settings.api().project_name.clone(),
        version: settings.api().version.clone(),
        environment: settings.runtime().environment.as_str().to_string(),
    })
}

pub(crate) async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let (redis, redis_ok) = redis_component(state.redis().health().await);
    let (database, database_ok) =
        database_component(repositories::health::ping(state.db()).await);

    let status = match (database_ok, redis_ok) {
        (false, _) => "unhealthy",
        (true, false) => "degraded",
        (true, true) => "healthy",
    };

    let components = HashMap::from([
        ("redis".to_string(), redis.to_string()),
        ("database".to_string(), database.to_string()),
    ]);

    Json(HealthResponse {
        service: "math-grader".to_string(),
        status: status.to_string(),
        components,
    })
}

/// Check failures are logged; the response only carries the component state.
fn redis_component(health: RedisHealth) -> (&'static str, bool) {
    match health {
        RedisHealth::Healthy => ("healthy", true),
        RedisHealth::Disconnected => ("disconnected", true),
        RedisHealth::Unhealthy(error) => {
            tracing::warn!(error = %error, "Redis health check failed");
            ("unhealthy", false)
        }
    }
}

fn database_component(result: Result<(), sqlx::Error>) -> (&'static str, bool) {
    match result {
        Ok(()) => ("healthy", true),
        Err(err) => {
            tracing::error!(error = %err, "Database health check failed");
            ("unhealthy", false)
        }
    }
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if !state.settings().telemetry().prometheus_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    match metrics::render() {
        Some(body) => ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

pub(crate) async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_checks_hide_error_detail() {
        let redis = redis_component(RedisHealth::Unhealthy(
            "Connection refused (os error 111) at 10.0.0.7:6379".to_string(),
        ));
        let database = database_component(Err(sqlx::Error::PoolTimedOut));

        assert_eq!(redis, ("unhealthy", false));
        assert_eq!(database, ("unhealthy", false));
    }

    #[test]
    fn missing_redis_does_not_degrade_health() {
        assert_eq!(redis_component(RedisHealth::Disconnected), ("disconnected", true));
        assert_eq!(database_component(Ok(())), ("healthy", true));
    }
}
