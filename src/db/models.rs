use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::{Date, PrimitiveDateTime};

use crate::db::types::SubmissionStatus;

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Teacher {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) full_name: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Class {
    pub(crate) id: String,
    pub(crate) teacher_id: String,
    pub(crate) class_name: String,
    pub(crate) grade_level: String,
    pub(crate) subject: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Student {
    pub(crate) id: String,
    pub(crate) class_id: String,
    pub(crate) student_name: String,
    pub(crate) roster_code: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) class_id: String,
    pub(crate) teacher_id: String,
    pub(crate) exam_name: String,
    pub(crate) total_points: i32,
    pub(crate) answer_key: Json<serde_json::Value>,
    pub(crate) exam_date: Date,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// One row of the per-question breakdown stored alongside a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct QuestionResult {
    #[serde(alias = "question")]
    pub(crate) question_number: u32,
    #[serde(alias = "marks_awarded", alias = "points")]
    pub(crate) points_awarded: f64,
    #[serde(alias = "max_marks")]
    pub(crate) max_points: f64,
    #[serde(default)]
    pub(crate) is_correct: bool,
    #[serde(default)]
    pub(crate) feedback: String,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Submission {
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
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ActivityLogEntry {
    pub(crate) id: String,
    pub(crate) activity_type: String,
    pub(crate) description: String,
    pub(crate) created_at: PrimitiveDateTime,
}
