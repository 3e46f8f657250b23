use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Teacher;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ProfileCreate {
    #[serde(alias = "full_name")]
    #[validate(length(min = 1, max = 200, message = "name must not be empty"))]
    pub(crate) name: String,
}

/// Missing fields deserialize as empty so validation reports them as 400s.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SignupRequest {
    #[serde(default)]
    #[validate(email(message = "email must be a valid email address"))]
    pub(crate) email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub(crate) password: String,
    #[serde(default, alias = "full_name")]
    #[validate(length(min = 1, max = 200, message = "name must not be empty"))]
    pub(crate) name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "email must not be empty"))]
    pub(crate) email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub(crate) password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AccountResponse {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginResponse {
    pub(crate) token: String,
    pub(crate) user: AccountResponse,
}

#[derive(Debug, Serialize)]
pub(crate) struct TeacherResponse {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) name: String,
    pub(crate) created_at: String,
}

impl TeacherResponse {
    pub(crate) fn from_db(teacher: Teacher) -> Self {
        Self {
            id: teacher.id,
            user_id: teacher.user_id,
            name: teacher.full_name,
            created_at: format_primitive(teacher.created_at),
        }
    }
}
