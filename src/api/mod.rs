pub(crate) mod auth;
pub(crate) mod classes;
pub(crate) mod dashboard;
pub(crate) mod errors;
pub(crate) mod exams;
pub(crate) mod grades;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod history;
pub(crate) mod router;
pub(crate) mod validation;
