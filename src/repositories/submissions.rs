use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::{QuestionResult, Submission};
use crate::db::types::SubmissionStatus;

pub(crate) const COLUMNS: &str = "\
    id, exam_id, student_id, submission_image_url, image_sha256, graded_score, feedback, \
    question_results, status, graded_at, created_at, updated_at";

pub(crate) struct UpsertSubmission<'a> {
    pub(crate) exam_id: &'a str,
    pub(crate) student_id: Option<&'a str>,
    pub(crate) image_url: &'a str,
    pub(crate) image_sha256: &'a str,
    pub(crate) score: f64,
    pub(crate) feedback: Option<&'a str>,
    pub(crate) question_results: &'a [QuestionResult],
    pub(crate) now: PrimitiveDateTime,
}

/// Manual correction. `None` keeps the stored value.
#[derive(Debug, Default)]
pub(crate) struct SubmissionCorrection {
    pub(crate) graded_score: Option<f64>,
    pub(crate) feedback: Option<String>,
    pub(crate) status: Option<SubmissionStatus>,
    pub(crate) student_id: Option<String>,
    pub(crate) question_results: Option<Vec<QuestionResult>>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct GradeListRow {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: Option<String>,
    pub(crate) submission_image_url: String,
    pub(crate) image_sha256: Option<String>,
    pub(crate) graded_score: f64,
    pub(crate) feedback: Option<String>,
    pub(crate) question_results: Json<Vec<QuestionResult>>,
    pub(crate) status: SubmissionStatus,
    pub(crate) graded_at: PrimitiveDateTime,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) student_name: Option<String>,
    pub(crate) roster_code: Option<String>,
    pub(crate) exam_name: String,
    pub(crate) total_points: i32,
}

/// Single-statement insert-or-update on `(exam_id, student_id)`.
///
/// Rows with a null student never hit the conflict arm (NULLS DISTINCT), so an
/// unresolved attempt always inserts and can never overwrite a resolved row.
pub(crate) async fn upsert(
    pool: &PgPool,
    params: UpsertSubmission<'_>,
) -> Result<Submission, sqlx::Error> {
    let status = SubmissionStatus::for_student(params.student_id);

    sqlx::query_as::<_, Submission>(&format!(
        "INSERT INTO exam_submissions (id, exam_id, student_id, submission_image_url,
                                       image_sha256, graded_score, feedback, question_results,
                                       status, graded_at, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10, $10)
         ON CONFLICT (exam_id, student_id) DO UPDATE
         SET submission_image_url = EXCLUDED.submission_image_url,
             image_sha256 = EXCLUDED.image_sha256,
             graded_score = EXCLUDED.graded_score,
             feedback = EXCLUDED.feedback,
             question_results = EXCLUDED.question_results,
             status = EXCLUDED.status,
             graded_at = EXCLUDED.graded_at,
             updated_at = EXCLUDED.updated_at
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(params.exam_id)
    .bind(params.student_id)
    .bind(params.image_url)
    .bind(params.image_sha256)
    .bind(params.score)
    .bind(params.feedback)
    .bind(Json(params.question_results))
    .bind(status)
    .bind(params.now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_for_teacher(
    pool: &PgPool,
    submission_id: &str,
    teacher_id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(
        "SELECT s.id, s.exam_id, s.student_id, s.submission_image_url, s.image_sha256,
                s.graded_score, s.feedback, s.question_results, s.status, s.graded_at,
                s.created_at, s.updated_at
         FROM exam_submissions s
         JOIN exams e ON e.id = s.exam_id
         WHERE s.id = $1 AND e.teacher_id = $2",
    )
    .bind(submission_id)
    .bind(teacher_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_by_exam(
    pool: &PgPool,
    exam_id: &str,
) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM exam_submissions WHERE exam_id = $1 ORDER BY graded_at DESC"
    ))
    .bind(exam_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_for_teacher(
    pool: &PgPool,
    teacher_id: &str,
    exam_id: Option<&str>,
    status: Option<SubmissionStatus>,
    limit: Option<i64>,
) -> Result<Vec<GradeListRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT s.id, s.exam_id, s.student_id, s.submission_image_url, s.image_sha256,
                s.graded_score, s.feedback, s.question_results, s.status, s.graded_at,
                s.created_at, s.updated_at,
                st.student_name, st.roster_code,
                e.exam_name, e.total_points
         FROM exam_submissions s
         JOIN exams e ON e.id = s.exam_id
         LEFT JOIN students st ON st.id = s.student_id
         WHERE e.teacher_id = ",
    );
    builder.push_bind(teacher_id);

    if let Some(exam_id) = exam_id {
        builder.push(" AND s.exam_id = ");
        builder.push_bind(exam_id);
    }

    if let Some(status) = status {
        builder.push(" AND s.status = ");
        builder.push_bind(status);
    }

    builder.push(" ORDER BY s.graded_at DESC, s.id");

    if let Some(limit) = limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit);
    }

    builder.build_query_as::<GradeListRow>().fetch_all(pool).await
}

pub(crate) async fn count_graded_for_teacher(
    pool: &PgPool,
    teacher_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*)
         FROM exam_submissions s
         JOIN exams e ON e.id = s.exam_id
         WHERE e.teacher_id = $1 AND s.status = $2",
    )
    .bind(teacher_id)
    .bind(SubmissionStatus::Graded)
    .fetch_one(pool)
    .await
}

pub(crate) async fn apply_correction(
    pool: &PgPool,
    submission_id: &str,
    correction: SubmissionCorrection,
    now: PrimitiveDateTime,
) -> Result<Submission, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("UPDATE exam_submissions SET graded_at = ");
    builder.push_bind(now);
    builder.push(", updated_at = ");
    builder.push_bind(now);

    if let Some(score) = correction.graded_score {
        builder.push(", graded_score = ");
        builder.push_bind(score);
    }
    if let Some(feedback) = correction.feedback {
        builder.push(", feedback = ");
        builder.push_bind(feedback);
    }
    if let Some(status) = correction.status {
        builder.push(", status = ");
        builder.push_bind(status);
    }
    if let Some(student_id) = correction.student_id {
        builder.push(", student_id = ");
        builder.push_bind(student_id);
    }
    if let Some(question_results) = correction.question_results {
        builder.push(", question_results = ");
        builder.push_bind(Json(question_results));
    }

    builder.push(" WHERE id = ");
    builder.push_bind(submission_id);
    builder.push(format!(" RETURNING {COLUMNS}"));

    builder.build_query_as::<Submission>().fetch_one(pool).await
}
