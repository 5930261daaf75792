use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::Result,
    routes::current_user,
    services::enrollment_service::EnrollOutcome,
    utils::token::{generate_payment_reference, Claims},
    AppState,
};

#[axum::debug_handler]
pub async fn enroll(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let student_id = current_user(&claims)?;
    let outcome = state.enrollment_service.enroll(student_id, course_id).await?;
    let status = match &outcome {
        EnrollOutcome::Enrolled { .. } => StatusCode::CREATED,
        EnrollOutcome::AlreadyEnrolled { .. } => StatusCode::OK,
        EnrollOutcome::PaymentRequired { .. } => StatusCode::PAYMENT_REQUIRED,
    };
    Ok((status, Json(outcome)))
}

/// Hands the client what it needs to open a gateway checkout for a paid course.
#[axum::debug_handler]
pub async fn start_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let student_id = current_user(&claims)?;
    if let Some(enrollment) = state.enrollment_service.find(student_id, course_id).await? {
        return Ok((
            StatusCode::OK,
            Json(json!({ "status": "already_enrolled", "enrollment": enrollment })),
        ));
    }

    let course = state.course_service.get(course_id).await?;
    let reference = generate_payment_reference();
    tracing::info!(student_id = %student_id, course_id = %course.id, reference = %reference, "Payment initiated");
    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "payment_pending",
            "course_id": course.id,
            "student_id": student_id,
            "amount": course.price,
            "reference": reference,
        })),
    ))
}

#[axum::debug_handler]
pub async fn watch_course(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let playback = state
        .enrollment_service
        .record_view(current_user(&claims)?, course_id, None)
        .await?;
    Ok(Json(playback))
}

#[axum::debug_handler]
pub async fn watch_lesson(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((course_id, lesson_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    let playback = state
        .enrollment_service
        .record_view(current_user(&claims)?, course_id, Some(lesson_id))
        .await?;
    Ok(Json(playback))
}

#[axum::debug_handler]
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let dashboard = state.enrollment_service.dashboard(current_user(&claims)?).await?;
    Ok(Json(dashboard))
}
