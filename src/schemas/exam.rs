use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::core::time::{format_date, format_primitive};
use crate::db::models::{Class, Exam};
use crate::repositories::exams::ExamListRow;
use crate::schemas::grade::SubmissionResponse;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamCreate {
    #[serde(alias = "exam_name")]
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
    #[validate(length(min = 1, message = "class_id must not be empty"))]
    pub(crate) class_id: String,
    #[validate(range(min = 1, message = "total_points must be positive"))]
    pub(crate) total_points: i32,
    #[serde(default)]
    pub(crate) answer_key: Value,
    pub(crate) exam_date: String,
}

impl ExamCreate {
    /// Browsers often send the key as a JSON-encoded string; both forms are stored as JSON.
    pub(crate) fn answer_key_json(&self) -> Result<Value, String> {
        match &self.answer_key {
            Value::Null => Ok(Value::Object(Default::default())),
            Value::String(raw) if raw.trim().is_empty() => Ok(Value::Object(Default::default())),
            Value::String(raw) => serde_json::from_str(raw)
                .map_err(|_| "answer_key must be valid JSON".to_string()),
            other => Ok(other.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ClassSummary {
    pub(crate) class_name: String,
    pub(crate) grade_level: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) class_id: String,
    pub(crate) teacher_id: String,
    pub(crate) exam_name: String,
    pub(crate) total_points: i32,
    pub(crate) answer_key: Value,
    pub(crate) exam_date: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl ExamResponse {
    pub(crate) fn from_db(exam: Exam) -> Self {
        Self {
            id: exam.id,
            class_id: exam.class_id,
            teacher_id: exam.teacher_id,
            exam_name: exam.exam_name,
            total_points: exam.total_points,
            answer_key: exam.answer_key.0,
            exam_date: format_date(exam.exam_date),
            created_at: format_primitive(exam.created_at),
            updated_at: format_primitive(exam.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamListItem {
    pub(crate) id: String,
    pub(crate) class_id: String,
    pub(crate) exam_name: String,
    pub(crate) total_points: i32,
    pub(crate) answer_key: Value,
    pub(crate) exam_date: String,
    pub(crate) created_at: String,
    pub(crate) class: ClassSummary,
    pub(crate) submission_count: i64,
}

impl ExamListItem {
    pub(crate) fn from_row(row: ExamListRow) -> Self {
        Self {
            id: row.id,
            class_id: row.class_id,
            exam_name: row.exam_name,
            total_points: row.total_points,
            answer_key: row.answer_key.0,
            exam_date: format_date(row.exam_date),
            created_at: format_primitive(row.created_at),
            class: ClassSummary { class_name: row.class_name, grade_level: row.grade_level },
            submission_count: row.submission_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamDetailResponse {
    #[serde(flatten)]
    pub(crate) exam: ExamResponse,
    pub(crate) class: Option<ClassSummary>,
    pub(crate) submissions: Vec<SubmissionResponse>,
}

impl ExamDetailResponse {
    pub(crate) fn new(exam: Exam, class: Option<Class>, submissions: Vec<SubmissionResponse>) -> Self {
        Self {
            exam: ExamResponse::from_db(exam),
            class: class.map(|class| ClassSummary {
                class_name: class.class_name,
                grade_level: class.grade_level,
            }),
            submissions,
        }
    }
}
