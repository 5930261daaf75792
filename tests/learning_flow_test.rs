mod common;

use std::collections::HashMap;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use learnhub_backend::{
    database::pool::run_migrations,
    routes::payments::SIGNATURE_HEADER,
    services::{
        course_service::{CourseInput, CourseService, NewLesson},
        library_service::{LibraryService, NewDocument},
    },
    utils::crypto::sign_payload,
};
use rust_decimal::Decimal;
use serde_json::{json, Value as JsonValue};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower::ServiceExt;
use uuid::Uuid;

use common::{
    app_with_pool, bearer, body_json, get_request, init_env, json_request, live_database_url,
    PAYMENT_SECRET,
};

const STUDY_NOTES: &str = "Photosynthesis is a process used by plants to convert light into energy. \
    A cell is a basic structural unit of every living organism. \
    Osmosis refers to the movement of water across a semi permeable membrane. \
    The mitochondria is called the powerhouse of the cell by many teachers.";

async fn setup() -> Option<(Router, PgPool)> {
    let Some(url) = live_database_url() else {
        eprintln!("DATABASE_URL not set; skipping database flow test");
        return None;
    };
    init_env();
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect");
    run_migrations(&pool).await.expect("migrations");
    Some((app_with_pool(pool.clone()), pool))
}

/// Registers a fresh student over HTTP and returns (user id, bearer header).
async fn register_student(app: &Router) -> (Uuid, String) {
    let suffix = Uuid::new_v4().simple().to_string();
    let username = format!("student_{}", &suffix[..12]);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            None,
            &json!({
                "username": username,
                "email": format!("{}@learnhub.test", username),
                "password": "correct-horse",
                "confirm_password": "correct-horse",
                "first_name": "Ada",
                "student_level": "Beginner",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            &json!({ "username": username, "password": "correct-horse" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["redirect"], "dashboard");

    let id = Uuid::parse_str(body["user"]["id"].as_str().unwrap()).unwrap();
    (id, format!("Bearer {}", body["token"].as_str().unwrap()))
}

async fn seed_course(pool: &PgPool, price: Decimal, lessons: usize) -> (Uuid, Vec<Uuid>) {
    let service = CourseService::new(pool.clone());
    let course = service
        .create(CourseInput {
            title: Some(format!("Course {}", Uuid::new_v4())),
            description: Some("Hands-on fundamentals.".into()),
            price: Some(price),
            ..Default::default()
        })
        .await
        .expect("course");

    let mut ids = Vec::new();
    for n in 1..=lessons {
        let lesson = service
            .add_lesson(
                course.id,
                NewLesson {
                    title: format!("Lesson {}", n),
                    video_url: Some(format!("https://video.test/{}", n)),
                    video_file: None,
                    content: None,
                    duration: Some("10:00".into()),
                    order: None,
                    is_preview: n == 1,
                },
            )
            .await
            .expect("lesson");
        ids.push(lesson.id);
    }
    (course.id, ids)
}

async fn watch(app: &Router, auth: &str, course_id: Uuid, lesson_id: Uuid) -> JsonValue {
    let response = app
        .clone()
        .oneshot(get_request(
            &format!("/api/courses/{}/watch/{}", course_id, lesson_id),
            Some(auth),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

#[tokio::test]
async fn free_course_progress_only_moves_forward() {
    let Some((app, pool)) = setup().await else {
        return;
    };
    let (_, auth) = register_student(&app).await;
    let (course_id, lessons) = seed_course(&pool, Decimal::ZERO, 3).await;

    // Watching before enrolling is refused.
    let response = app
        .clone()
        .oneshot(get_request(&format!("/api/courses/{}/watch", course_id), Some(&auth)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let enroll_uri = format!("/api/courses/{}/enroll", course_id);
    let response = app
        .clone()
        .oneshot(json_request("POST", &enroll_uri, Some(&auth), &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["status"], "enrolled");

    let response = app
        .clone()
        .oneshot(json_request("POST", &enroll_uri, Some(&auth), &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "already_enrolled");

    let second = watch(&app, &auth, course_id, lessons[1]).await;
    assert_eq!(second["progress"].as_f64(), Some(66.67));
    assert_eq!(second["prev_lesson_id"], json!(lessons[0]));
    assert_eq!(second["next_lesson_id"], json!(lessons[2]));

    let first = watch(&app, &auth, course_id, lessons[0]).await;
    assert_eq!(first["progress"].as_f64(), Some(66.67));
    assert_eq!(first["is_completed"], false);

    let last = watch(&app, &auth, course_id, lessons[2]).await;
    assert_eq!(last["progress"].as_f64(), Some(100.0));
    assert_eq!(last["is_completed"], true);
    assert!(last["next_lesson_id"].is_null());

    let response = app
        .clone()
        .oneshot(get_request("/api/dashboard", Some(&auth)))
        .await
        .unwrap();
    let dashboard = body_json(response).await;
    assert_eq!(dashboard["total_enrolled"], 1);
    assert_eq!(dashboard["completed"], 1);
}

#[tokio::test]
async fn paid_course_enrolls_after_signed_confirmation() {
    let Some((app, pool)) = setup().await else {
        return;
    };
    let (student_id, auth) = register_student(&app).await;
    let (course_id, _) = seed_course(&pool, Decimal::new(49900, 2), 1).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/courses/{}/enroll", course_id),
            Some(&auth),
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body_json(response).await["status"], "payment_required");

    let body = json!({
        "student_id": student_id,
        "course_id": course_id,
        "amount": "499.00",
        "reference": format!("pay_{}", Uuid::new_v4().simple()),
    })
    .to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/api/payments/confirm")
        .header(header::CONTENT_TYPE, "application/json")
        .header(SIGNATURE_HEADER, sign_payload(PAYMENT_SECRET, body.as_bytes()))
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "enrolled");

    let response = app
        .clone()
        .oneshot(get_request(&format!("/api/courses/{}/watch", course_id), Some(&auth)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["progress"].as_f64(), Some(100.0));
}

#[tokio::test]
async fn generated_quiz_is_saved_taken_and_graded() {
    let Some((app, pool)) = setup().await else {
        return;
    };
    let (_, auth) = register_student(&app).await;

    let notes = std::env::temp_dir().join(format!("notes-{}.txt", Uuid::new_v4()));
    tokio::fs::write(&notes, STUDY_NOTES).await.unwrap();
    let document = LibraryService::new(pool.clone())
        .create(NewDocument {
            title: "Biology notes".into(),
            category: Some("Science".into()),
            course_id: None,
            file_path: notes.to_string_lossy().into_owned(),
            uploaded_by: None,
        })
        .await
        .expect("document");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/quiz/generate",
            Some(&auth),
            &json!({ "document_id": document.id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let generated = body_json(response).await;
    let quiz = generated["quiz"].as_array().unwrap().clone();
    assert!(quiz.len() >= 2);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/quiz/save",
            Some(&auth),
            &json!({ "title": "Biology check", "questions": quiz }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let saved = body_json(response).await;
    assert_eq!(saved["question_count"], quiz.len());
    let exam_id = saved["exam_id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(get_request(&format!("/api/exams/{}", exam_id), Some(&auth)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let exam = body_json(response).await;
    let questions = exam["questions"].as_array().unwrap();
    assert_eq!(questions.len(), quiz.len());
    assert!(questions[0].get("correct_option").is_none());

    // Positions follow generation order, so the generated answer key applies.
    let answers: HashMap<String, i64> = questions
        .iter()
        .map(|q| {
            let position = q["position"].as_u64().unwrap() as usize;
            let id = q["id"].as_str().unwrap().to_string();
            (id, quiz[position]["answer_index"].as_i64().unwrap())
        })
        .collect();

    let submit_uri = format!("/api/exams/{}/submit", exam_id);
    let response = app
        .clone()
        .oneshot(json_request("POST", &submit_uri, Some(&auth), &json!({ "answers": answers })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let outcome = body_json(response).await;
    assert_eq!(outcome["report"]["score"], quiz.len());
    assert_eq!(outcome["report"]["percentage"].as_f64(), Some(100.0));
    assert_eq!(outcome["result"]["attempt_number"], 1);

    // A blank retake is a new attempt and leaves the first one intact.
    let response = app
        .clone()
        .oneshot(json_request("POST", &submit_uri, Some(&auth), &json!({ "answers": {} })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let retake = body_json(response).await;
    assert_eq!(retake["report"]["score"], 0);
    assert_eq!(retake["result"]["attempt_number"], 2);

    let response = app
        .oneshot(get_request("/api/exams", Some(&auth)))
        .await
        .unwrap();
    let overview = body_json(response).await;
    assert_eq!(overview["completed_count"], 2);

    let _ = tokio::fs::remove_file(&notes).await;
}

async fn seed_document(pool: &PgPool, course_id: Option<Uuid>) -> (Uuid, std::path::PathBuf) {
    let path = std::env::temp_dir().join(format!("library-{}.txt", Uuid::new_v4()));
    tokio::fs::write(&path, STUDY_NOTES).await.unwrap();
    let document = LibraryService::new(pool.clone())
        .create(NewDocument {
            title: "Handout".into(),
            category: None,
            course_id,
            file_path: path.to_string_lossy().into_owned(),
            uploaded_by: None,
        })
        .await
        .expect("document");
    (document.id, path)
}

async fn staff_delete(app: &Router, uri: &str) -> StatusCode {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .header(header::AUTHORIZATION, bearer(Uuid::new_v4(), "staff"))
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap().status()
}

#[tokio::test]
async fn deleting_documents_removes_their_files() {
    let Some((app, pool)) = setup().await else {
        return;
    };

    let (document_id, path) = seed_document(&pool, None).await;
    let status = staff_delete(&app, &format!("/api/staff/documents/{}", document_id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!path.exists());

    // Documents attached to a course go with it, files included.
    let (course_id, _) = seed_course(&pool, Decimal::ZERO, 1).await;
    let (course_document, course_path) = seed_document(&pool, Some(course_id)).await;
    let status = staff_delete(&app, &format!("/api/staff/courses/{}", course_id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!course_path.exists());

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM library_documents WHERE id = $1")
        .bind(course_document)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn unknown_course_reference_is_not_found() {
    let Some((app, _pool)) = setup().await else {
        return;
    };
    let (_, auth) = register_student(&app).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/quiz/save",
            Some(&auth),
            &json!({
                "title": "Orphan quiz",
                "course_id": Uuid::new_v4(),
                "questions": [
                    { "question": "2+2?", "options": ["3", "4", "5", "6"], "answer_index": 1 }
                ],
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .starts_with("Referenced record does not exist"));

    let staff = bearer(Uuid::new_v4(), "staff");
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/staff/exams",
            Some(&staff),
            &json!({ "title": "Midterm", "course_id": Uuid::new_v4(), "duration_minutes": 30 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
