pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::core::{config::Settings, redis::RedisHandle, state::AppState, telemetry};
use crate::services::ai_grading::AiGradingService;
use crate::services::identity::IdentityClient;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let redis = RedisHandle::new(settings.redis().redis_url());
    if let Err(err) = redis.connect().await {
        tracing::error!(error = %err, "Failed to connect to Redis; grading rate limit disabled");
    } else {
        tracing::info!("Redis connected successfully");
    }

    let oracle = AiGradingService::from_settings(&settings)?;
    tracing::info!(
        provider = settings.ai().provider.as_str(),
        model = %settings.ai().model,
        "Grading oracle configured"
    );

    let identity = IdentityClient::from_settings(&settings)?;
    if settings.auth().supabase_url.is_empty() || settings.auth().service_role_key.is_empty() {
        tracing::warn!(
            "SUPABASE_URL or SUPABASE_SERVICE_ROLE_KEY not set; signup and login disabled"
        );
    }

    let state = AppState::new(settings, db_pool, redis.clone(), Arc::new(oracle), identity);
    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        upload_dir = %state.uploads().root().display(),
        "Math grader API listening"
    );

    let result =
        axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await;

    redis.disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}
