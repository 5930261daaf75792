use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::enrollment::EnrollmentWithCourse;
use crate::models::exam::QuizResultWithExam;
use crate::models::user::{Profile, User};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateStudentPayload {
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 100))]
    pub stream: Option<String>,
    pub student_level: Option<String>,
    #[validate(length(max = 15))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordPayload {
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentDetail {
    pub student: User,
    pub profile: Option<Profile>,
    pub enrollments: Vec<EnrollmentWithCourse>,
    pub completed_courses: usize,
    pub results: Vec<QuizResultWithExam>,
    /// Mean of the student's result percentages (0-100), one decimal.
    pub average_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaffStats {
    pub total_students: i64,
    pub total_courses: i64,
    pub total_enrollments: i64,
    pub total_documents: i64,
    pub upcoming_classes: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NoticePayload {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1))]
    pub message: String,
    #[serde(default = "default_true")]
    pub is_global: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LiveClassPayload {
    pub course_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    #[validate(url)]
    pub meeting_link: String,
    pub date_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateExamPayload {
    pub course_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    #[validate(url)]
    pub exam_link: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 600))]
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
}

fn default_true() -> bool {
    true
}

fn default_duration() -> i32 {
    15
}
