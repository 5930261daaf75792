pub mod ai;
pub mod auth_routes;
pub mod catalog;
pub mod exams;
pub mod health;
pub mod learning;
pub mod payments;
pub mod staff;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post},
    Router,
};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::middleware::{
    auth::{require_bearer_auth, require_staff},
    rate_limit::{new_rps_state, rps_middleware},
};
use crate::utils::token::Claims;
use crate::AppState;

/// User id carried by a validated token.
pub(crate) fn current_user(claims: &Claims) -> Result<Uuid> {
    claims
        .user_id()
        .ok_or_else(|| Error::Unauthorized("invalid_token".into()))
}

/// The full API without outer layers (CORS, tracing, body limit).
pub fn app_router(ai_rps: u32) -> Router<AppState> {
    let public_api = Router::new()
        .route("/health", get(health::health))
        .route("/api/landing", get(catalog::landing))
        .route("/api/auth/register", post(auth_routes::register))
        .route("/api/auth/login", post(auth_routes::login))
        .route("/api/payments/confirm", post(payments::confirm_payment))
        .route("/api/openapi.json", get(ai::openapi_json));

    let ai_api = Router::new()
        .route("/api/ai-chat/", post(ai::chat))
        .route("/api/quiz/generate", post(ai::generate_quiz))
        .route_layer(from_fn_with_state(new_rps_state(ai_rps), rps_middleware));

    let student_api = Router::new()
        .route("/api/me", get(auth_routes::me))
        .route(
            "/api/profile",
            get(auth_routes::get_profile).patch(auth_routes::update_profile),
        )
        .route("/api/profile/picture", post(auth_routes::upload_profile_picture))
        .route("/api/dashboard", get(learning::dashboard))
        .route("/api/courses", get(catalog::list_courses))
        .route("/api/courses/:id", get(catalog::get_course))
        .route("/api/courses/:id/enroll", post(learning::enroll))
        .route("/api/courses/:id/payment", post(learning::start_payment))
        .route("/api/courses/:id/watch", get(learning::watch_course))
        .route("/api/courses/:id/watch/:lesson_id", get(learning::watch_lesson))
        .route("/api/live-classes", get(catalog::live_classes))
        .route("/api/library", get(catalog::list_documents))
        .route("/api/library/:id/download", get(catalog::download_document))
        .route("/api/exams", get(exams::list_exams))
        .route("/api/exams/:id", get(exams::get_exam))
        .route("/api/exams/:id/submit", post(exams::submit_exam))
        .route("/api/quiz/save", post(ai::save_quiz))
        .merge(ai_api)
        .route_layer(from_fn(require_bearer_auth));

    let staff_api = Router::new()
        .route("/api/staff/stats", get(staff::stats))
        .route("/api/staff/students", get(staff::list_students))
        .route(
            "/api/staff/students/:id",
            get(staff::student_detail)
                .patch(staff::update_student)
                .delete(staff::delete_student),
        )
        .route("/api/staff/students/:id/block", post(staff::toggle_block))
        .route("/api/staff/students/:id/reset-password", post(staff::reset_password))
        .route("/api/staff/courses", get(staff::list_courses).post(staff::create_course))
        .route(
            "/api/staff/courses/:id",
            patch(staff::update_course).delete(staff::delete_course),
        )
        .route("/api/staff/courses/:id/lessons", post(staff::add_lesson))
        .route(
            "/api/staff/documents",
            get(staff::list_documents).post(staff::upload_document),
        )
        .route(
            "/api/staff/documents/:id",
            patch(staff::update_document).delete(staff::delete_document),
        )
        .route("/api/staff/enrollments", get(staff::list_enrollments))
        .route("/api/staff/enrollments/:id", delete(staff::delete_enrollment))
        .route("/api/staff/notices", post(staff::create_notice))
        .route("/api/staff/live-classes", post(staff::create_live_class))
        .route("/api/staff/exams", get(staff::list_exams).post(staff::create_exam))
        .route_layer(from_fn(require_staff));

    public_api.merge(student_api).merge(staff_api)
}
