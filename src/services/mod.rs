pub(crate) mod ai_grading;
pub(crate) mod class_analysis;
pub(crate) mod grading_output;
pub(crate) mod grading_workflow;
pub(crate) mod identity;
pub(crate) mod student_matching;
pub(crate) mod uploads;
