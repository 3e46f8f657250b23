use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{QuestionResult, Submission};
use crate::db::types::SubmissionStatus;
use crate::repositories::submissions::GradeListRow;
use crate::services::grading_workflow::GradedSubmission;

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: Option<String>,
    pub(crate) submission_image_url: String,
    pub(crate) image_sha256: Option<String>,
    pub(crate) graded_score: f64,
    pub(crate) feedback: Option<String>,
    pub(crate) question_results: Vec<QuestionResult>,
    pub(crate) status: SubmissionStatus,
    pub(crate) graded_at: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl SubmissionResponse {
    pub(crate) fn from_db(submission: Submission) -> Self {
        Self {
            id: submission.id,
            exam_id: submission.exam_id,
            student_id: submission.student_id,
            submission_image_url: submission.submission_image_url,
            image_sha256: submission.image_sha256,
            graded_score: submission.graded_score,
            feedback: submission.feedback,
            question_results: submission.question_results.0,
            status: submission.status,
            graded_at: format_primitive(submission.graded_at),
            created_at: format_primitive(submission.created_at),
            updated_at: format_primitive(submission.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GradedSubmissionResponse {
    #[serde(flatten)]
    pub(crate) submission: SubmissionResponse,
    pub(crate) extracted_code: Option<String>,
    pub(crate) is_matched: bool,
    /// Automatic grading failed and the stored score is a placeholder.
    pub(crate) needs_review: bool,
}

impl GradedSubmissionResponse {
    pub(crate) fn from_outcome(outcome: GradedSubmission) -> Self {
        Self {
            submission: SubmissionResponse::from_db(outcome.submission),
            extracted_code: outcome.extracted_code,
            is_matched: outcome.is_matched,
            needs_review: outcome.degraded,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentSummary {
    pub(crate) id: String,
    pub(crate) student_name: String,
    pub(crate) roster_code: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamSummary {
    pub(crate) exam_name: String,
    pub(crate) total_points: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct GradeListItem {
    #[serde(flatten)]
    pub(crate) submission: SubmissionResponse,
    pub(crate) student: Option<StudentSummary>,
    pub(crate) exam: ExamSummary,
}

impl GradeListItem {
    pub(crate) fn from_row(row: GradeListRow) -> Self {
        let student = match (row.student_id.clone(), row.student_name, row.roster_code) {
            (Some(id), Some(student_name), Some(roster_code)) => {
                Some(StudentSummary { id, student_name, roster_code })
            }
            _ => None,
        };

        Self {
            submission: SubmissionResponse {
                id: row.id,
                exam_id: row.exam_id,
                student_id: row.student_id,
                submission_image_url: row.submission_image_url,
                image_sha256: row.image_sha256,
                graded_score: row.graded_score,
                feedback: row.feedback,
                question_results: row.question_results.0,
                status: row.status,
                graded_at: format_primitive(row.graded_at),
                created_at: format_primitive(row.created_at),
                updated_at: format_primitive(row.updated_at),
            },
            student,
            exam: ExamSummary { exam_name: row.exam_name, total_points: row.total_points },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GradeListQuery {
    #[serde(default)]
    pub(crate) exam_id: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<String>,
}

impl GradeListQuery {
    pub(crate) fn status_filter(&self) -> Result<Option<SubmissionStatus>, String> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some("graded") => Ok(Some(SubmissionStatus::Graded)),
            Some("pending_match") => Ok(Some(SubmissionStatus::PendingMatch)),
            Some(other) => Err(format!("Unknown status '{other}'")),
        }
    }
}

/// Manual correction payload. Absent fields keep their stored value.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GradeUpdate {
    #[serde(default)]
    #[validate(range(min = 0.0, message = "graded_score must be non-negative"))]
    pub(crate) graded_score: Option<f64>,
    #[serde(default)]
    pub(crate) feedback: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<SubmissionStatus>,
    #[serde(default)]
    pub(crate) student_id: Option<String>,
    #[serde(default)]
    pub(crate) question_results: Option<Vec<QuestionResult>>,
}
