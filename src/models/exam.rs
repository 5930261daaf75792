use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Exam {
    pub id: Uuid,
    pub course_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub exam_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deadline: Option<DateTime<Utc>>,
    pub duration_minutes: i32,
    pub total_marks: i32,
    pub is_active: bool,
}

impl Exam {
    pub fn is_expired(&self) -> bool {
        self.deadline.map(|d| Utc::now() > d).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub position: i32,
    pub question_text: String,
    pub option1: String,
    pub option2: String,
    pub option3: String,
    pub option4: String,
    pub correct_index: i16,
    pub correct_option: String,
    pub marks: i32,
}

impl Question {
    pub fn options(&self) -> [&str; 4] {
        [
            self.option1.as_str(),
            self.option2.as_str(),
            self.option3.as_str(),
            self.option4.as_str(),
        ]
    }
}

/// A question as shown to a student taking the exam: no answer key.
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: Uuid,
    pub position: i32,
    pub question_text: String,
    pub options: Vec<String>,
    pub marks: i32,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            position: q.position,
            question_text: q.question_text.clone(),
            options: q.options().iter().map(|o| o.to_string()).collect(),
            marks: q.marks,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizResult {
    pub id: Uuid,
    pub student_id: Uuid,
    pub exam_id: Uuid,
    pub score: f64,
    pub total_marks: f64,
    pub percentage: f64,
    pub attempt_number: i32,
    pub answers: JsonValue,
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizResultWithExam {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub exam_title: String,
    pub score: f64,
    pub total_marks: f64,
    pub percentage: f64,
    pub attempt_number: i32,
    pub taken_at: DateTime<Utc>,
}
