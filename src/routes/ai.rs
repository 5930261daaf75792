use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use utoipa::OpenApi;
use validator::Validate;

use crate::{
    dto::quiz_dto::{
        ChatRequest, ChatResponse, GenerateQuizRequest, GenerateQuizResponse, GenerateQuizRetry,
        SaveQuizRequest, SaveQuizResponse,
    },
    error::{Error, Result},
    services::chat_service::{ChatRole, ChatTurn},
    services::quiz_service::GeneratedQuestion,
    AppState,
};

#[derive(OpenApi)]
#[openapi(
    paths(chat, generate_quiz, save_quiz),
    components(schemas(
        ChatRequest,
        ChatResponse,
        ChatTurn,
        ChatRole,
        GenerateQuizRequest,
        GenerateQuizResponse,
        GenerateQuizRetry,
        GeneratedQuestion,
        SaveQuizRequest,
        SaveQuizResponse
    )),
    tags((name = "ai", description = "Chat assistant and quiz generation"))
)]
pub struct ApiDoc;

pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[utoipa::path(
    post,
    path = "/api/ai-chat/",
    tag = "ai",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant answer (or a fixed apology when the model is unavailable)", body = ChatResponse),
        (status = 400, description = "Malformed body or empty question"),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(payload) = payload.map_err(|e| Error::BadRequest(e.body_text()))?;
    payload.validate()?;
    let question = payload.question.trim();
    if question.is_empty() {
        return Err(Error::BadRequest("Question cannot be empty.".into()));
    }

    let answer = state.chat_assistant.reply(question, &payload.history).await;
    Ok(Json(ChatResponse { answer }))
}

#[utoipa::path(
    post,
    path = "/api/quiz/generate",
    tag = "ai",
    request_body = GenerateQuizRequest,
    responses(
        (status = 200, description = "Generated questions", body = GenerateQuizResponse),
        (status = 400, description = "File is empty or unreadable"),
        (status = 404, description = "Document or file not found"),
        (status = 422, description = "Generator returned nothing; the client may retry", body = GenerateQuizRetry)
    )
)]
pub async fn generate_quiz(
    State(state): State<AppState>,
    Json(payload): Json<GenerateQuizRequest>,
) -> Result<Response> {
    let quiz = state
        .quiz_service
        .generate_for_document(payload.document_id)
        .await?;

    if quiz.is_empty() {
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(GenerateQuizRetry {
                status: "error".into(),
                message: "AI could not generate questions. Please try again.".into(),
                retry: true,
            }),
        )
            .into_response());
    }

    Ok(Json(GenerateQuizResponse {
        status: "success".into(),
        quiz,
    })
    .into_response())
}

#[utoipa::path(
    post,
    path = "/api/quiz/save",
    tag = "ai",
    request_body = SaveQuizRequest,
    responses(
        (status = 201, description = "Quiz saved as an exam", body = SaveQuizResponse),
        (status = 400, description = "No questions to save")
    )
)]
pub async fn save_quiz(
    State(state): State<AppState>,
    Json(payload): Json<SaveQuizRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let saved = state
        .exam_service
        .save_quiz(&payload.title, &payload.questions, payload.course_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SaveQuizResponse {
            status: "success".into(),
            exam_id: saved.exam.id,
            title: saved.exam.title,
            question_count: saved.question_count,
            repaired: saved.repaired,
        }),
    ))
}
