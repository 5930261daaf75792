use axum::{
    extract::{ConnectInfo, Multipart, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;
use std::net::{IpAddr, SocketAddr};
use validator::Validate;

use crate::{
    config::get_config,
    dto::auth_dto::{LoginPayload, LoginResponse, ProfileResponse, RegisterPayload, UpdateProfilePayload},
    error::{Error, Result},
    routes::current_user,
    utils::{
        storage::{remove_upload, save_upload, MultipartForm},
        token::{issue_token, Claims},
        validation::{ensure_extension, ensure_max_size, IMAGE_EXTENSIONS, MAX_IMAGE_BYTES},
    },
    AppState,
};

/// Caller address: first `X-Forwarded-For` hop when behind a proxy, else the socket peer.
pub(crate) fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
        .or_else(|| peer.map(|p| p.ip()))
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = state.user_service.register(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Welcome {}! Account created.", user.username),
            "user": user,
        })),
    ))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let ip = client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    let user = state
        .user_service
        .authenticate(&payload.identifier, &payload.password, ip)
        .await?;

    let config = get_config();
    let token = issue_token(
        &config.jwt_secret,
        user.id,
        user.role(),
        chrono::Duration::hours(config.token_ttl_hours),
    )?;
    let redirect = if user.is_staff { "staff" } else { "dashboard" };

    Ok(Json(LoginResponse {
        token,
        user,
        redirect,
    }))
}

#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.get(current_user(&claims)?).await?;
    Ok(Json(json!({
        "user": user,
        "full_name": user.full_name(),
        "role": user.role(),
    })))
}

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user_id = current_user(&claims)?;
    let user = state.user_service.get(user_id).await?;
    let profile = state.user_service.profile(user_id).await?;
    Ok(Json(ProfileResponse { user, profile }))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let (user, profile) = state
        .user_service
        .update_profile(current_user(&claims)?, payload)
        .await?;
    Ok(Json(ProfileResponse { user, profile }))
}

#[axum::debug_handler]
pub async fn upload_profile_picture(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let user_id = current_user(&claims)?;
    let mut form = MultipartForm::read(multipart).await?;
    let file = form
        .take_file("profile_pic")
        .or_else(|| form.take_file("file"))
        .ok_or_else(|| Error::BadRequest("profile_pic file is required".into()))?;

    let ext = ensure_extension(&file.filename, IMAGE_EXTENSIONS)?;
    ensure_max_size(file.data.len(), MAX_IMAGE_BYTES, "Image")?;

    let path = save_upload(&get_config().uploads_dir, "profile_pics", &ext, &file.data).await?;
    let (profile, previous) = state.user_service.set_profile_picture(user_id, &path).await?;
    if let Some(old) = previous {
        remove_upload(&old).await;
    }

    Ok(Json(json!({ "profile": profile })))
}
