use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde_json::json;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::{
    dto::course_dto::{CourseListQuery, SearchQuery},
    error::{Error, Result},
    utils::text::slugify,
    AppState,
};

#[axum::debug_handler]
pub async fn landing(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let stats = state.course_service.landing().await?;
    Ok(Json(stats))
}

#[axum::debug_handler]
pub async fn list_courses(
    State(state): State<AppState>,
    Query(query): Query<CourseListQuery>,
) -> Result<impl IntoResponse> {
    let page = state
        .course_service
        .list_published(query.search_term(), query.page())
        .await?;
    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let detail = state.course_service.detail(id).await?;
    Ok(Json(detail))
}

#[axum::debug_handler]
pub async fn live_classes(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let classes = state.schedule_service.upcoming_live_classes().await?;
    Ok(Json(json!({ "live_classes": classes })))
}

#[axum::debug_handler]
pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse> {
    let documents = state.library_service.list(query.term()).await?;
    Ok(Json(json!({ "documents": documents })))
}

fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Streams a library document as an attachment.
pub async fn download_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let document = state.library_service.get(id).await?;
    let file = match tokio::fs::File::open(&document.file_path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(document_id = %document.id, "Library file missing on disk");
            return Err(Error::NotFound("File not found on server.".into()));
        }
        Err(e) => return Err(Error::Io(e)),
    };

    let ext = document.extension();
    let stem = match slugify(&document.title) {
        s if s.is_empty() => "document".to_string(),
        s => s,
    };
    let disposition = format!("attachment; filename=\"{}.{}\"", stem, ext);
    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type_for(&ext).to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}
