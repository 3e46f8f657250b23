use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Class, Student};
use crate::repositories::classes::ClassWithCount;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ClassCreate {
    #[serde(alias = "class_name")]
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
    #[validate(length(min = 1, message = "grade_level must not be empty"))]
    pub(crate) grade_level: String,
    #[validate(length(min = 1, message = "subject must not be empty"))]
    pub(crate) subject: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ClassResponse {
    pub(crate) id: String,
    pub(crate) teacher_id: String,
    pub(crate) class_name: String,
    pub(crate) grade_level: String,
    pub(crate) subject: String,
    pub(crate) created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) student_count: Option<i64>,
}

impl ClassResponse {
    pub(crate) fn from_db(class: Class) -> Self {
        Self {
            id: class.id,
            teacher_id: class.teacher_id,
            class_name: class.class_name,
            grade_level: class.grade_level,
            subject: class.subject,
            created_at: format_primitive(class.created_at),
            student_count: None,
        }
    }

    pub(crate) fn from_row(row: ClassWithCount) -> Self {
        Self {
            id: row.id,
            teacher_id: row.teacher_id,
            class_name: row.class_name,
            grade_level: row.grade_level,
            subject: row.subject,
            created_at: format_primitive(row.created_at),
            student_count: Some(row.student_count),
        }
    }
}

/// `student_id` is the historical name of the roster code and is still accepted.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StudentCreate {
    #[validate(length(min = 1, message = "class_id must not be empty"))]
    pub(crate) class_id: String,
    #[serde(alias = "student_name")]
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
    #[serde(alias = "student_id")]
    #[validate(length(min = 1, max = 64, message = "roster_code must not be empty"))]
    pub(crate) roster_code: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentResponse {
    pub(crate) id: String,
    pub(crate) class_id: String,
    pub(crate) student_name: String,
    pub(crate) roster_code: String,
    pub(crate) created_at: String,
}

impl StudentResponse {
    pub(crate) fn from_db(student: Student) -> Self {
        Self {
            id: student.id,
            class_id: student.class_id,
            student_name: student.student_name,
            roster_code: student.roster_code,
            created_at: format_primitive(student.created_at),
        }
    }
}
