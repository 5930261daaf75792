pub mod chat_service;
pub mod course_service;
pub mod enrollment_service;
pub mod exam_service;
pub mod grading_service;
pub mod library_service;
pub mod llm_service;
pub mod quiz_service;
pub mod schedule_service;
pub mod user_service;
