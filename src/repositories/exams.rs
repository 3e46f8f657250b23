use sqlx::types::Json;
use sqlx::PgPool;
use time::{Date, PrimitiveDateTime};

use crate::db::models::Exam;

pub(crate) const COLUMNS: &str = "\
    id, class_id, teacher_id, exam_name, total_points, answer_key, exam_date, \
    created_at, updated_at";

pub(crate) struct CreateExam<'a> {
    pub(crate) id: &'a str,
    pub(crate) class_id: &'a str,
    pub(crate) teacher_id: &'a str,
    pub(crate) exam_name: &'a str,
    pub(crate) total_points: i32,
    pub(crate) answer_key: serde_json::Value,
    pub(crate) exam_date: Date,
    pub(crate) now: PrimitiveDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ExamListRow {
    pub(crate) id: String,
    pub(crate) class_id: String,
    pub(crate) exam_name: String,
    pub(crate) total_points: i32,
    pub(crate) answer_key: Json<serde_json::Value>,
    pub(crate) exam_date: Date,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) class_name: String,
    pub(crate) grade_level: String,
    pub(crate) submission_count: i64,
}

pub(crate) async fn create(pool: &PgPool, params: CreateExam<'_>) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (id, class_id, teacher_id, exam_name, total_points, answer_key,
                            exam_date, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.class_id)
    .bind(params.teacher_id)
    .bind(params.exam_name)
    .bind(params.total_points)
    .bind(Json(params.answer_key))
    .bind(params.exam_date)
    .bind(params.now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_for_teacher(
    pool: &PgPool,
    id: &str,
    teacher_id: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams WHERE id = $1 AND teacher_id = $2"
    ))
    .bind(id)
    .bind(teacher_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_by_teacher(
    pool: &PgPool,
    teacher_id: &str,
) -> Result<Vec<ExamListRow>, sqlx::Error> {
    sqlx::query_as::<_, ExamListRow>(
        "SELECT e.id, e.class_id, e.exam_name, e.total_points, e.answer_key, e.exam_date,
                e.created_at, c.class_name, c.grade_level,
                (SELECT COUNT(*) FROM exam_submissions s WHERE s.exam_id = e.id)
                    AS submission_count
         FROM exams e
         JOIN classes c ON c.id = e.class_id
         WHERE e.teacher_id = $1
         ORDER BY e.created_at DESC",
    )
    .bind(teacher_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_by_teacher(pool: &PgPool, teacher_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM exams WHERE teacher_id = $1")
        .bind(teacher_id)
        .fetch_one(pool)
        .await
}
