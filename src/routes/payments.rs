use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde_json::json;
use validator::Validate;

use crate::{
    config::get_config,
    dto::course_dto::PaymentConfirmPayload,
    error::{Error, Result},
    services::enrollment_service::PaymentConfirmation,
    utils::crypto::verify_payload_signature,
    AppState,
};

pub const SIGNATURE_HEADER: &str = "x-payment-signature";

/// Gateway callback. The raw body must be signed with the shared webhook secret.
#[axum::debug_handler]
pub async fn confirm_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Unauthorized("missing_signature".into()))?;

    if !verify_payload_signature(&get_config().payment_webhook_secret, &body, signature) {
        tracing::warn!("Rejected payment callback with bad signature");
        return Err(Error::Unauthorized("invalid_signature".into()));
    }

    let payload: PaymentConfirmPayload = serde_json::from_slice(&body)?;
    payload.validate()?;

    let enrollment = state
        .enrollment_service
        .confirm_payment(PaymentConfirmation {
            student_id: payload.student_id,
            course_id: payload.course_id,
            amount: payload.amount,
            reference: payload.reference,
        })
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "status": "enrolled", "enrollment": enrollment })),
    ))
}
