use serde::Serialize;

use crate::schemas::grade::GradeListItem;

pub(crate) const RECENT_GRADES_LIMIT: i64 = 10;

#[derive(Debug, Serialize)]
pub(crate) struct DashboardStats {
    pub(crate) total_classes: i64,
    pub(crate) total_exams: i64,
    pub(crate) total_graded: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct DashboardResponse {
    pub(crate) stats: DashboardStats,
    pub(crate) recent_grades: Vec<GradeListItem>,
}
