use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Student;

pub(crate) const COLUMNS: &str = "id, class_id, student_name, roster_code, created_at";

pub(crate) struct CreateStudent<'a> {
    pub(crate) id: &'a str,
    pub(crate) class_id: &'a str,
    pub(crate) student_name: &'a str,
    pub(crate) roster_code: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateStudent<'_>,
) -> Result<Student, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "INSERT INTO students (id, class_id, student_name, roster_code, created_at)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.class_id)
    .bind(params.student_name)
    .bind(params.roster_code)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_by_class(
    pool: &PgPool,
    class_id: &str,
) -> Result<Vec<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "SELECT {COLUMNS} FROM students WHERE class_id = $1 ORDER BY student_name, id"
    ))
    .bind(class_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_in_class(
    pool: &PgPool,
    student_id: &str,
    class_id: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "SELECT {COLUMNS} FROM students WHERE id = $1 AND class_id = $2"
    ))
    .bind(student_id)
    .bind(class_id)
    .fetch_optional(pool)
    .await
}
