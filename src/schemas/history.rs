use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::ActivityLogEntry;

pub(crate) const DEFAULT_HISTORY_LIMIT: i64 = 50;
pub(crate) const MAX_HISTORY_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryQuery {
    #[serde(default)]
    pub(crate) limit: Option<i64>,
}

impl HistoryQuery {
    pub(crate) fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ActivityResponse {
    pub(crate) id: String,
    pub(crate) activity_type: String,
    pub(crate) description: String,
    pub(crate) created_at: String,
}

impl ActivityResponse {
    pub(crate) fn from_db(entry: ActivityLogEntry) -> Self {
        Self {
            id: entry.id,
            activity_type: entry.activity_type,
            description: entry.description,
            created_at: format_primitive(entry.created_at),
        }
    }
}
