use sqlx::PgPool;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::db::models::ActivityLogEntry;
use crate::db::types::ActivityType;

pub(crate) const COLUMNS: &str = "id, activity_type, description, created_at";

pub(crate) async fn insert(
    pool: &PgPool,
    teacher_id: &str,
    activity_type: ActivityType,
    description: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO activity_log (id, teacher_id, activity_type, description, created_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(teacher_id)
    .bind(activity_type.as_str())
    .bind(description)
    .bind(primitive_now_utc())
    .execute(pool)
    .await?;
    Ok(())
}

/// History is informational: a failed write is logged and swallowed.
pub(crate) async fn record(
    pool: &PgPool,
    teacher_id: &str,
    activity_type: ActivityType,
    description: &str,
) {
    if let Err(err) = insert(pool, teacher_id, activity_type, description).await {
        tracing::warn!(
            error = %err,
            teacher_id,
            activity_type = activity_type.as_str(),
            "Failed to write activity log entry"
        );
    }
}

pub(crate) async fn list_by_teacher(
    pool: &PgPool,
    teacher_id: &str,
    limit: i64,
) -> Result<Vec<ActivityLogEntry>, sqlx::Error> {
    sqlx::query_as::<_, ActivityLogEntry>(&format!(
        "SELECT {COLUMNS} FROM activity_log
         WHERE teacher_id = $1
         ORDER BY created_at DESC
         LIMIT $2"
    ))
    .bind(teacher_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}
