use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Class;

pub(crate) const COLUMNS: &str = "id, teacher_id, class_name, grade_level, subject, created_at";

pub(crate) struct CreateClass<'a> {
    pub(crate) id: &'a str,
    pub(crate) teacher_id: &'a str,
    pub(crate) class_name: &'a str,
    pub(crate) grade_level: &'a str,
    pub(crate) subject: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ClassWithCount {
    pub(crate) id: String,
    pub(crate) teacher_id: String,
    pub(crate) class_name: String,
    pub(crate) grade_level: String,
    pub(crate) subject: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) student_count: i64,
}

/// One row per submission of the class's exams.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ScoreRow {
    pub(crate) graded_score: f64,
    pub(crate) total_points: i32,
}

pub(crate) async fn create(pool: &PgPool, params: CreateClass<'_>) -> Result<Class, sqlx::Error> {
    sqlx::query_as::<_, Class>(&format!(
        "INSERT INTO classes (id, teacher_id, class_name, grade_level, subject, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.teacher_id)
    .bind(params.class_name)
    .bind(params.grade_level)
    .bind(params.subject)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_for_teacher(
    pool: &PgPool,
    class_id: &str,
    teacher_id: &str,
) -> Result<Option<Class>, sqlx::Error> {
    sqlx::query_as::<_, Class>(&format!(
        "SELECT {COLUMNS} FROM classes WHERE id = $1 AND teacher_id = $2"
    ))
    .bind(class_id)
    .bind(teacher_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_by_teacher(
    pool: &PgPool,
    teacher_id: &str,
) -> Result<Vec<ClassWithCount>, sqlx::Error> {
    sqlx::query_as::<_, ClassWithCount>(
        "SELECT c.id, c.teacher_id, c.class_name, c.grade_level, c.subject, c.created_at,
                COUNT(s.id) AS student_count
         FROM classes c
         LEFT JOIN students s ON s.class_id = c.id
         WHERE c.teacher_id = $1
         GROUP BY c.id
         ORDER BY c.created_at DESC",
    )
    .bind(teacher_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_by_teacher(pool: &PgPool, teacher_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM classes WHERE teacher_id = $1")
        .bind(teacher_id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn list_scores(
    pool: &PgPool,
    class_id: &str,
    teacher_id: &str,
) -> Result<Vec<ScoreRow>, sqlx::Error> {
    sqlx::query_as::<_, ScoreRow>(
        "SELECT s.graded_score, e.total_points
         FROM exam_submissions s
         JOIN exams e ON e.id = s.exam_id
         WHERE e.class_id = $1 AND e.teacher_id = $2",
    )
    .bind(class_id)
    .bind(teacher_id)
    .fetch_all(pool)
    .await
}
