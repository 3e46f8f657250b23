use std::sync::Arc;

use sqlx::PgPool;

use crate::core::{config::Settings, redis::RedisHandle};
use crate::services::ai_grading::GradingOracle;
use crate::services::identity::IdentityClient;
use crate::services::uploads::LocalImageStore;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    redis: RedisHandle,
    uploads: LocalImageStore,
    oracle: Arc<dyn GradingOracle>,
    identity: IdentityClient,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        db: PgPool,
        redis: RedisHandle,
        oracle: Arc<dyn GradingOracle>,
        identity: IdentityClient,
    ) -> Self {
        let uploads = LocalImageStore::from_settings(&settings);
        Self { inner: Arc::new(InnerState { settings, db, redis, uploads, oracle, identity }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn uploads(&self) -> &LocalImageStore {
        &self.inner.uploads
    }

    pub(crate) fn oracle(&self) -> &dyn GradingOracle {
        self.inner.oracle.as_ref()
    }

    pub(crate) fn identity(&self) -> &IdentityClient {
        &self.inner.identity
    }
}
