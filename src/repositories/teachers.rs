use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Teacher;

pub(crate) const COLUMNS: &str = "id, user_id, full_name, created_at";

pub(crate) async fn find_by_user_id(
    pool: &PgPool,
    user_id: &str,
) -> Result<Option<Teacher>, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(&format!("SELECT {COLUMNS} FROM teachers WHERE user_id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Creates the profile for `user_id`, or renames it when one already exists.
pub(crate) async fn upsert_profile(
    pool: &PgPool,
    id: &str,
    user_id: &str,
    full_name: &str,
    now: PrimitiveDateTime,
) -> Result<Teacher, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(&format!(
        "INSERT INTO teachers (id, user_id, full_name, created_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (user_id) DO UPDATE SET full_name = EXCLUDED.full_name
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(user_id)
    .bind(full_name)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Plain insert; fails with a unique violation when `user_id` already has a profile.
pub(crate) async fn create(
    pool: &PgPool,
    id: &str,
    user_id: &str,
    full_name: &str,
    now: PrimitiveDateTime,
) -> Result<Teacher, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(&format!(
        "INSERT INTO teachers (id, user_id, full_name, created_at)
         VALUES ($1, $2, $3, $4)
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(user_id)
    .bind(full_name)
    .bind(now)
    .fetch_one(pool)
    .await
}
