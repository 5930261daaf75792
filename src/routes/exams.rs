use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;

use crate::{
    dto::quiz_dto::SubmitExamPayload,
    error::Result,
    routes::current_user,
    utils::token::Claims,
    AppState,
};

#[axum::debug_handler]
pub async fn list_exams(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let overview = state
        .exam_service
        .list_for_student(current_user(&claims)?)
        .await?;
    Ok(Json(overview))
}

#[axum::debug_handler]
pub async fn get_exam(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let exam = state.exam_service.get_for_taking(id).await?;
    Ok(Json(exam))
}

#[axum::debug_handler]
pub async fn submit_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitExamPayload>,
) -> Result<impl IntoResponse> {
    let outcome = state
        .submission_service
        .submit(current_user(&claims)?, id, &payload.answers)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}
