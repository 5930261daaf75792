use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::user::{Profile, User};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterPayload {
    #[validate(length(min = 3, max = 150))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
    #[validate(length(max = 150))]
    #[serde(default)]
    pub first_name: String,
    #[validate(length(max = 150))]
    #[serde(default)]
    pub last_name: String,
    pub student_level: Option<String>,
    #[validate(length(max = 100))]
    pub stream: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginPayload {
    /// Username or email.
    #[serde(alias = "username", alias = "email")]
    #[validate(length(min = 1))]
    pub identifier: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
    /// Where the client should send the user next: "staff" or "dashboard".
    pub redirect: &'static str,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProfilePayload {
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
    #[validate(length(max = 15))]
    pub phone: Option<String>,
    pub address: Option<String>,
    #[validate(url)]
    pub linkedin_url: Option<String>,
    #[validate(url)]
    pub github_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub profile: Profile,
}
