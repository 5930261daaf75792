use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::services::chat_service::ChatTurn;
use crate::services::grading_service::SubmittedAnswer;
use crate::services::quiz_service::GeneratedQuestion;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GenerateQuizRequest {
    #[schema(value_type = String)]
    pub document_id: Uuid,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GenerateQuizResponse {
    pub status: String,
    pub quiz: Vec<GeneratedQuestion>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GenerateQuizRetry {
    pub status: String,
    pub message: String,
    pub retry: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SaveQuizRequest {
    #[serde(default)]
    #[validate(length(max = 200))]
    pub title: String,
    #[validate(length(min = 1, message = "No questions to save."))]
    pub questions: Vec<GeneratedQuestion>,
    #[schema(value_type = Option<String>)]
    pub course_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SaveQuizResponse {
    pub status: String,
    #[schema(value_type = String)]
    pub exam_id: Uuid,
    pub title: String,
    pub question_count: usize,
    pub repaired: usize,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChatRequest {
    #[serde(alias = "message")]
    #[validate(length(min = 1, max = 4000))]
    pub question: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChatResponse {
    pub answer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitExamPayload {
    /// Question id to chosen option (index or text).
    pub answers: HashMap<String, SubmittedAnswer>,
}
