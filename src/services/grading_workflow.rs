use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::core::{metrics, time::primitive_now_utc};
use crate::db::models::{Exam, Student, Submission};
use crate::repositories;
use crate::repositories::submissions::UpsertSubmission;
use crate::services::ai_grading::{GradingInputError, GradingOracle, GradingRequest};
use crate::services::student_matching::StudentMatcher;
use crate::services::uploads::{ImageStore, StoredImage, UploadedImage};

/// Persistence the grading workflow depends on.
#[async_trait]
pub(crate) trait GradingStore: Send + Sync {
    async fn find_exam(&self, exam_id: &str, teacher_id: &str)
        -> Result<Option<Exam>, sqlx::Error>;
    async fn list_roster(&self, class_id: &str) -> Result<Vec<Student>, sqlx::Error>;
    async fn find_student_in_class(
        &self,
        student_id: &str,
        class_id: &str,
    ) -> Result<Option<Student>, sqlx::Error>;
    async fn upsert_submission(
        &self,
        params: UpsertSubmission<'_>,
    ) -> Result<Submission, sqlx::Error>;
}

pub(crate) struct PgGradingStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PgGradingStore<'a> {
    pub(crate) fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GradingStore for PgGradingStore<'_> {
    async fn find_exam(
        &self,
        exam_id: &str,
        teacher_id: &str,
    ) -> Result<Option<Exam>, sqlx::Error> {
        repositories::exams::find_for_teacher(self.pool, exam_id, teacher_id).await
    }

    async fn list_roster(&self, class_id: &str) -> Result<Vec<Student>, sqlx::Error> {
        repositories::students::list_by_class(self.pool, class_id).await
    }

    async fn find_student_in_class(
        &self,
        student_id: &str,
        class_id: &str,
    ) -> Result<Option<Student>, sqlx::Error> {
        repositories::students::find_in_class(self.pool, student_id, class_id).await
    }

    async fn upsert_submission(
        &self,
        params: UpsertSubmission<'_>,
    ) -> Result<Submission, sqlx::Error> {
        repositories::submissions::upsert(self.pool, params).await
    }
}

/// Collaborators for one grading request.
pub(crate) struct GradingContext<'a> {
    pub(crate) store: &'a dyn GradingStore,
    pub(crate) oracle: &'a dyn GradingOracle,
    pub(crate) matcher: &'a dyn StudentMatcher,
    pub(crate) images: &'a dyn ImageStore,
}

#[derive(Debug)]
pub(crate) struct SubmissionIntake {
    pub(crate) teacher_id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: Option<String>,
    pub(crate) image: UploadedImage,
}

#[derive(Debug)]
pub(crate) struct GradedSubmission {
    pub(crate) submission: Submission,
    pub(crate) extracted_code: Option<String>,
    pub(crate) is_matched: bool,
    pub(crate) degraded: bool,
}

#[derive(Debug, Error)]
pub(crate) enum WorkflowError {
    #[error("Exam not found")]
    ExamNotFound,
    #[error("Student does not belong to the exam's class")]
    StudentNotInClass,
    #[error(transparent)]
    InvalidInput(#[from] GradingInputError),
    #[error("failed to store submission image: {0:#}")]
    Storage(anyhow::Error),
    #[error("grading store error")]
    Store(#[from] sqlx::Error),
}

/// Grades one uploaded sheet and records it against `(exam, student)`.
///
/// Oracle trouble never fails the request: it degrades the result instead.
/// Only a missing exam, a foreign student, invalid input or storage errors
/// are surfaced. A saved image is discarded when its submission cannot be
/// recorded.
pub(crate) async fn process_submission(
    ctx: &GradingContext<'_>,
    intake: SubmissionIntake,
) -> Result<GradedSubmission, WorkflowError> {
    let exam = ctx
        .store
        .find_exam(&intake.exam_id, &intake.teacher_id)
        .await?
        .ok_or(WorkflowError::ExamNotFound)?;

    if let Some(student_id) = intake.student_id.as_deref() {
        if ctx.store.find_student_in_class(student_id, &exam.class_id).await?.is_none() {
            return Err(WorkflowError::StudentNotInClass);
        }
    }

    let request = GradingRequest::new(&exam, &intake.image.bytes, intake.image.media_type)?;
    let stored = ctx.images.save(&intake.image).await.map_err(WorkflowError::Storage)?;

    match grade_and_record(ctx, &exam, intake.student_id, &request, &stored).await {
        Ok(graded) => Ok(graded),
        Err(err) => {
            ctx.images.discard(&stored).await;
            Err(err)
        }
    }
}

async fn grade_and_record(
    ctx: &GradingContext<'_>,
    exam: &Exam,
    supplied_student: Option<String>,
    request: &GradingRequest<'_>,
    stored: &StoredImage,
) -> Result<GradedSubmission, WorkflowError> {
    let result = ctx.oracle.grade(request).await;

    let student_id = match supplied_student {
        Some(student_id) => Some(student_id),
        None => match result.student_code.as_deref() {
            Some(code) => {
                let roster = ctx.store.list_roster(&exam.class_id).await?;
                ctx.matcher.resolve(&roster, code).map(|student| student.id.clone())
            }
            None => None,
        },
    };

    let submission = ctx
        .store
        .upsert_submission(UpsertSubmission {
            exam_id: &exam.id,
            student_id: student_id.as_deref(),
            image_url: &stored.url,
            image_sha256: &stored.sha256,
            score: result.score,
            feedback: result.feedback.as_deref(),
            question_results: &result.question_results,
            now: primitive_now_utc(),
        })
        .await?;

    metrics::record_submission(submission.status);
    tracing::info!(
        submission_id = %submission.id,
        exam_id = %exam.id,
        student_id = submission.student_id.as_deref().unwrap_or("-"),
        extracted_code = result.student_code.as_deref().unwrap_or("-"),
        status = submission.status.as_str(),
        score = submission.graded_score,
        degraded = result.degraded,
        "Submission graded"
    );

    Ok(GradedSubmission {
        is_matched: submission.student_id.is_some(),
        submission,
        extracted_code: result.student_code,
        degraded: result.degraded,
    })
}
