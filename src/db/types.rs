use serde::{Deserialize, Serialize};
use sqlx::Type;

/// Lifecycle of a graded submission. A resolved student is what separates the two states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "submissionstatus", rename_all = "snake_case")]
pub(crate) enum SubmissionStatus {
    Graded,
    PendingMatch,
}

impl SubmissionStatus {
    pub(crate) fn for_student(student_id: Option<&str>) -> Self {
        match student_id {
            Some(_) => Self::Graded,
            None => Self::PendingMatch,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Graded => "graded",
            Self::PendingMatch => "pending_match",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum ActivityType {
    CreateClass,
    AddStudent,
    CreateExam,
    GradeSubmission,
    UpdateGrade,
}

impl ActivityType {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::CreateClass => "CREATE_CLASS",
            Self::AddStudent => "ADD_STUDENT",
            Self::CreateExam => "CREATE_EXAM",
            Self::GradeSubmission => "GRADE_SUBMISSION",
            Self::UpdateGrade => "UPDATE_GRADE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ActivityType, SubmissionStatus};

    #[test]
    fn status_follows_student_presence() {
        assert_eq!(SubmissionStatus::for_student(Some("s-1")), SubmissionStatus::Graded);
        assert_eq!(SubmissionStatus::for_student(None), SubmissionStatus::PendingMatch);
    }

    #[test]
    fn wire_names_match_storage_names() {
        let json = serde_json::to_value(SubmissionStatus::PendingMatch).unwrap();
        assert_eq!(json, SubmissionStatus::PendingMatch.as_str());
        let json = serde_json::to_value(ActivityType::GradeSubmission).unwrap();
        assert_eq!(json, ActivityType::GradeSubmission.as_str());
    }
}
