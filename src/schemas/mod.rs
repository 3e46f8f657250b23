use std::collections::HashMap;

use serde::Serialize;

pub(crate) mod class;
pub(crate) mod dashboard;
pub(crate) mod exam;
pub(crate) mod grade;
pub(crate) mod history;
pub(crate) mod teacher;

/// Success envelope shared by every data endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct ApiResponse<T> {
    pub(crate) success: bool,
    pub(crate) message: String,
    pub(crate) data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub(crate) fn ok(message: impl Into<String>, data: T) -> Self {
        Self { success: true, message: message.into(), data }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) success: bool,
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) environment: String,
}
