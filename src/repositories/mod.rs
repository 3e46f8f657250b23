pub(crate) mod activity_log;
pub(crate) mod classes;
pub(crate) mod exams;
pub(crate) mod health;
pub(crate) mod students;
pub(crate) mod submissions;
pub(crate) mod teachers;

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error().is_some_and(|db_err| db_err.is_unique_violation())
}
