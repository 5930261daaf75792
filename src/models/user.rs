use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudentLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl StudentLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentLevel::Beginner => "Beginner",
            StudentLevel::Intermediate => "Intermediate",
            StudentLevel::Advanced => "Advanced",
        }
    }
}

impl Default for StudentLevel {
    fn default() -> Self {
        StudentLevel::Beginner
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_student: bool,
    pub is_teacher: bool,
    pub is_staff: bool,
    pub is_active: bool,
    pub student_level: String,
    pub stream: Option<String>,
    pub last_login_ip: Option<sqlx::types::ipnetwork::IpNetwork>,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.username.clone()
        } else {
            name.to_string()
        }
    }

    /// Role carried in issued tokens; staff outranks teacher outranks student.
    pub fn role(&self) -> &'static str {
        if self.is_staff {
            "staff"
        } else if self.is_teacher {
            "teacher"
        } else {
            "student"
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub user_id: Uuid,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub profile_pic: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}
