use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::get_config,
    dto::{
        course_dto::SearchQuery,
        staff_dto::{
            CreateExamPayload, LiveClassPayload, NoticePayload, ResetPasswordPayload,
            StudentDetail, UpdateStudentPayload,
        },
    },
    error::{Error, Result},
    routes::current_user,
    services::{
        course_service::{CourseInput, NewLesson},
        exam_service::NewExam,
        library_service::{DocumentChanges, NewDocument},
        user_service::average_percentage,
    },
    utils::{
        storage::{remove_upload, save_upload, MultipartForm, UploadedFile},
        token::Claims,
        validation::{
            ensure_extension, ensure_max_size, DOCUMENT_EXTENSIONS, IMAGE_EXTENSIONS,
            MAX_IMAGE_BYTES, VIDEO_EXTENSIONS,
        },
    },
    AppState,
};

// --- dashboard & students ---

#[axum::debug_handler]
pub async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let stats = state.user_service.staff_stats().await?;
    let notices = state.schedule_service.latest_notices(5).await?;
    Ok(Json(json!({ "stats": stats, "recent_notices": notices })))
}

#[axum::debug_handler]
pub async fn list_students(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse> {
    let students = state.user_service.list_students(query.term()).await?;
    Ok(Json(json!({ "students": students, "count": students.len() })))
}

#[axum::debug_handler]
pub async fn student_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let student = state.user_service.student(id).await?;
    let profile = state.user_service.find_profile(id).await?;
    let enrollments = state.enrollment_service.for_student(id).await?;
    let results = state.exam_service.results_for_student(id).await?;

    let percentages: Vec<f64> = results.iter().map(|r| r.percentage).collect();
    let completed_courses = enrollments.iter().filter(|e| e.is_completed).count();

    Ok(Json(StudentDetail {
        student,
        profile,
        completed_courses,
        average_percentage: average_percentage(&percentages),
        enrollments,
        results,
    }))
}

#[axum::debug_handler]
pub async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStudentPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let student = state.user_service.update_student(id, payload).await?;
    Ok(Json(json!({ "student": student })))
}

#[axum::debug_handler]
pub async fn toggle_block(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let is_active = state.user_service.toggle_block(id).await?;
    let message = if is_active { "Student unblocked." } else { "Student blocked." };
    Ok(Json(json!({ "is_active": is_active, "message": message })))
}

#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state.user_service.reset_password(id, &payload.new_password).await?;
    Ok(Json(json!({ "message": "Password reset successfully." })))
}

#[axum::debug_handler]
pub async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.user_service.delete_student(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- courses & lessons ---

async fn store_thumbnail(file: Option<UploadedFile>) -> Result<Option<String>> {
    let Some(file) = file else {
        return Ok(None);
    };
    let ext = ensure_extension(&file.filename, IMAGE_EXTENSIONS)?;
    ensure_max_size(file.data.len(), MAX_IMAGE_BYTES, "Thumbnail")?;
    let path = save_upload(&get_config().uploads_dir, "course_thumbnails", &ext, &file.data).await?;
    Ok(Some(path))
}

fn course_input(form: &MultipartForm) -> Result<CourseInput> {
    Ok(CourseInput {
        title: form.text("title"),
        slug: form.text("slug"),
        description: form.text("description"),
        faculty_name: form.text("faculty_name"),
        price: form.parse::<Decimal>("price")?,
        is_published: form.flag("is_published"),
        total_modules: form.parse::<i32>("total_modules")?,
        difficulty_level: form.text("difficulty_level"),
        thumbnail: None,
    })
}

#[axum::debug_handler]
pub async fn list_courses(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let courses = state.course_service.list_all().await?;
    Ok(Json(json!({ "courses": courses })))
}

#[axum::debug_handler]
pub async fn create_course(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut form = MultipartForm::read(multipart).await?;
    let mut input = course_input(&form)?;
    input.thumbnail = store_thumbnail(form.take_file("thumbnail")).await?;

    let thumbnail = input.thumbnail.clone();
    match state.course_service.create(input).await {
        Ok(course) => Ok((StatusCode::CREATED, Json(json!({ "course": course })))),
        Err(e) => {
            if let Some(path) = thumbnail {
                remove_upload(&path).await;
            }
            Err(e)
        }
    }
}

#[axum::debug_handler]
pub async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut form = MultipartForm::read(multipart).await?;
    let mut input = course_input(&form)?;
    input.thumbnail = store_thumbnail(form.take_file("thumbnail")).await?;

    let thumbnail = input.thumbnail.clone();
    match state.course_service.update(id, input).await {
        Ok((course, replaced)) => {
            if let Some(old) = replaced {
                remove_upload(&old).await;
            }
            Ok(Json(json!({ "course": course })))
        }
        Err(e) => {
            if let Some(path) = thumbnail {
                remove_upload(&path).await;
            }
            Err(e)
        }
    }
}

#[axum::debug_handler]
pub async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let files = state.course_service.delete(id).await?;
    for path in files {
        remove_upload(&path).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn add_lesson(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut form = MultipartForm::read(multipart).await?;
    let title = form.require("title")?;

    let video_file = match form.take_file("video_file") {
        Some(file) => {
            let ext = ensure_extension(&file.filename, VIDEO_EXTENSIONS)?;
            Some(save_upload(&get_config().uploads_dir, "course_videos", &ext, &file.data).await?)
        }
        None => None,
    };
    let video_url = form.text("video_url");
    if video_file.is_none() && video_url.is_none() && form.text("content").is_none() {
        return Err(Error::BadRequest(
            "Provide a video file, a video URL or lesson content.".into(),
        ));
    }

    let lesson = NewLesson {
        title,
        video_url,
        video_file: video_file.clone(),
        content: form.text("content"),
        duration: form.text("duration"),
        order: form.parse::<i32>("order")?,
        is_preview: form.flag("is_preview").unwrap_or(false),
    };

    match state.course_service.add_lesson(course_id, lesson).await {
        Ok(lesson) => Ok((StatusCode::CREATED, Json(json!({ "lesson": lesson })))),
        Err(e) => {
            if let Some(path) = video_file {
                remove_upload(&path).await;
            }
            Err(e)
        }
    }
}

// --- library ---

#[axum::debug_handler]
pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse> {
    let documents = state.library_service.list(query.term()).await?;
    Ok(Json(json!({ "documents": documents })))
}

async fn store_document(file: UploadedFile) -> Result<String> {
    let ext = ensure_extension(&file.filename, DOCUMENT_EXTENSIONS)?;
    save_upload(&get_config().uploads_dir, "library", &ext, &file.data).await
}

#[axum::debug_handler]
pub async fn upload_document(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut form = MultipartForm::read(multipart).await?;
    let title = form.require("title")?;
    let file = form
        .take_file("file")
        .ok_or_else(|| Error::BadRequest("file is required".into()))?;
    let file_path = store_document(file).await?;

    let doc = NewDocument {
        title,
        category: form.text("category"),
        course_id: form.parse::<Uuid>("course_id")?,
        file_path: file_path.clone(),
        uploaded_by: claims.user_id(),
    };
    match state.library_service.create(doc).await {
        Ok(document) => Ok((StatusCode::CREATED, Json(json!({ "document": document })))),
        Err(e) => {
            remove_upload(&file_path).await;
            Err(e)
        }
    }
}

#[axum::debug_handler]
pub async fn update_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut form = MultipartForm::read(multipart).await?;
    let file_path = match form.take_file("file") {
        Some(file) => Some(store_document(file).await?),
        None => None,
    };

    let changes = DocumentChanges {
        title: form.text("title"),
        category: form.text("category"),
        course_id: form.parse::<Uuid>("course_id")?,
        file_path: file_path.clone(),
    };
    match state.library_service.update(id, changes).await {
        Ok((document, replaced)) => {
            if let Some(old) = replaced {
                remove_upload(&old).await;
            }
            Ok(Json(json!({ "document": document })))
        }
        Err(e) => {
            if let Some(path) = file_path {
                remove_upload(&path).await;
            }
            Err(e)
        }
    }
}

#[axum::debug_handler]
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let path = state.library_service.delete(id).await?;
    remove_upload(&path).await;
    Ok(StatusCode::NO_CONTENT)
}

// --- enrollments, notices, live classes, exams ---

#[axum::debug_handler]
pub async fn list_enrollments(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let enrollments = state.enrollment_service.list_all().await?;
    Ok(Json(json!({ "enrollments": enrollments })))
}

#[axum::debug_handler]
pub async fn delete_enrollment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.enrollment_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn create_notice(
    State(state): State<AppState>,
    Json(payload): Json<NoticePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let notice = state.schedule_service.create_notice(payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "notice": notice }))))
}

#[axum::debug_handler]
pub async fn create_live_class(
    State(state): State<AppState>,
    Json(payload): Json<LiveClassPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let live_class = state.schedule_service.create_live_class(payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "live_class": live_class }))))
}

#[axum::debug_handler]
pub async fn list_exams(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let exams = state.exam_service.list_all().await?;
    Ok(Json(json!({ "exams": exams })))
}

#[axum::debug_handler]
pub async fn create_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateExamPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let exam = state
        .exam_service
        .create_exam(NewExam {
            course_id: payload.course_id,
            title: payload.title,
            description: payload.description,
            exam_link: payload.exam_link,
            deadline: payload.deadline,
            duration_minutes: payload.duration_minutes,
        })
        .await?;
    tracing::info!(exam_id = %exam.id, created_by = %current_user(&claims)?, "Exam created");
    Ok((StatusCode::CREATED, Json(json!({ "exam": exam }))))
}
