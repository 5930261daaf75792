pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::{get_config, QuizStrategy};
use crate::services::{
    chat_service::ChatAssistant,
    course_service::CourseService,
    enrollment_service::EnrollmentService,
    exam_service::ExamService,
    grading_service::SubmissionService,
    library_service::LibraryService,
    llm_service::{LlmProvider, OpenAiCompatibleProvider},
    quiz_service::{HeuristicQuizGenerator, LlmQuizGenerator, QuizGenerator, QuizService},
    schedule_service::ScheduleService,
    user_service::UserService,
};
use reqwest::Client;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub user_service: UserService,
    pub course_service: CourseService,
    pub enrollment_service: EnrollmentService,
    pub library_service: LibraryService,
    pub schedule_service: ScheduleService,
    pub exam_service: ExamService,
    pub submission_service: SubmissionService,
    pub quiz_service: QuizService,
    pub chat_assistant: ChatAssistant,
}

impl AppState {
    /// Wires the configured LLM provider and quiz strategy.
    pub fn new(pool: PgPool) -> error::Result<Self> {
        let config = get_config();
        let timeout = Duration::from_secs(config.llm_timeout_secs);
        let http_client = Client::builder().timeout(timeout).build()?;

        let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiCompatibleProvider::new(
            config.llm_api_key.clone(),
            config.llm_base_url.clone(),
            config.llm_model.clone(),
            http_client,
            timeout,
        ));
        let generator: Arc<dyn QuizGenerator> = match config.quiz_generator {
            QuizStrategy::Llm => Arc::new(LlmQuizGenerator::new(llm.clone())),
            QuizStrategy::Heuristic => Arc::new(HeuristicQuizGenerator::new()),
        };
        tracing::info!(
            model = %config.llm_model,
            quiz_generator = generator.name(),
            attempt_policy = ?config.attempt_policy,
            "AI providers configured"
        );

        Ok(Self::with_providers(pool, llm, generator))
    }

    /// Builds the state around explicit AI collaborators.
    pub fn with_providers(
        pool: PgPool,
        llm: Arc<dyn LlmProvider>,
        generator: Arc<dyn QuizGenerator>,
    ) -> Self {
        let config = get_config();
        Self {
            user_service: UserService::new(pool.clone()),
            course_service: CourseService::new(pool.clone()),
            enrollment_service: EnrollmentService::new(pool.clone()),
            library_service: LibraryService::new(pool.clone()),
            schedule_service: ScheduleService::new(pool.clone()),
            exam_service: ExamService::new(pool.clone()),
            submission_service: SubmissionService::new(pool.clone(), config.attempt_policy),
            quiz_service: QuizService::new(
                pool.clone(),
                generator,
                config.quiz_text_budget,
                config.quiz_num_questions,
            ),
            chat_assistant: ChatAssistant::new(pool.clone(), llm),
            pool,
        }
    }
}
