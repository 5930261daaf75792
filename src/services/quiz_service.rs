use crate::error::{Error, Result};
use crate::models::library::LibraryDocument;
use crate::services::llm_service::{ChatMessage, LlmProvider};
use crate::utils::extract::extract_text_with_budget;
use crate::utils::text::{ellipsize, strip_code_fences};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::sync::{Arc, OnceLock};
use utoipa::ToSchema;
use uuid::Uuid;

/// Below this many characters of extracted text a document is treated as unreadable.
pub const MIN_SOURCE_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeneratedQuestion {
    #[serde(alias = "question_text")]
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(alias = "answer", default)]
    pub answer_index: i64,
}

#[async_trait]
pub trait QuizGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Multiple-choice questions mined from `text`. Failures yield an empty list.
    async fn generate(&self, text: &str, num_questions: usize) -> Vec<GeneratedQuestion>;
}

// --- LLM strategy ---

pub struct LlmQuizGenerator {
    provider: Arc<dyn LlmProvider>,
}

impl LlmQuizGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    fn system_prompt(num_questions: usize) -> String {
        format!(
            "You are an expert teacher and quiz generator.\n\
             Create {} multiple-choice questions based strictly on the provided text.\n\
             Return ONLY raw JSON, no markdown, in exactly this shape:\n\
             {{\"questions\": [{{\"question\": \"Question text?\", \
             \"options\": [\"Option A\", \"Option B\", \"Option C\", \"Option D\"], \
             \"answer_index\": 0}}]}}\n\
             Every question has exactly 4 options and answer_index is the 0-based index of the correct option.",
            num_questions
        )
    }
}

#[async_trait]
impl QuizGenerator for LlmQuizGenerator {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn generate(&self, text: &str, num_questions: usize) -> Vec<GeneratedQuestion> {
        let messages = vec![
            ChatMessage::system(Self::system_prompt(num_questions)),
            ChatMessage::user(format!("Generate quiz from this text:\n\n{}", text)),
        ];

        let raw = match self.provider.complete(messages).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Quiz generation call failed: {}", e);
                return Vec::new();
            }
        };

        let mut questions = parse_generated(&raw);
        if questions.is_empty() {
            tracing::warn!("Quiz generation returned no usable questions");
        }
        questions.truncate(num_questions);
        questions
    }
}

/// Parses a model reply into questions. Accepts `{"questions": [...]}` or a
/// bare array, optionally wrapped in Markdown fences. Items without question
/// text or with fewer than two options are dropped.
pub fn parse_generated(raw: &str) -> Vec<GeneratedQuestion> {
    let cleaned = strip_code_fences(raw);
    let value: JsonValue = match serde_json::from_str(cleaned) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("Error decoding quiz JSON: {}", e);
            return Vec::new();
        }
    };

    let items = match value {
        JsonValue::Array(items) => items,
        JsonValue::Object(mut map) => match map.remove("questions") {
            Some(JsonValue::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<GeneratedQuestion>(item).ok())
        .filter(|q| !q.question.trim().is_empty() && q.options.len() >= 2)
        .collect()
}

// --- Heuristic strategy ---

const DEFINITION_KEYWORDS: &[&str] = &[
    " is a ",
    " is an ",
    " means ",
    " refers to ",
    " is defined as ",
    " is called ",
];

const DISTRACTORS: [&str; 3] = [
    "None of the above",
    "It is not mentioned in the text",
    "All of the above",
];

const MIN_SENTENCE_WORDS: usize = 6;
const MAX_SENTENCE_WORDS: usize = 29;
const MAX_OPTION_CHARS: usize = 150;

fn sentence_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+").expect("valid sentence regex"))
}

/// Keyword-splitting text miner. Not NLP: it only finds sentences shaped like
/// "X is a Y" and asks about them.
#[derive(Default)]
pub struct HeuristicQuizGenerator;

impl HeuristicQuizGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        text: &str,
        num_questions: usize,
        rng: &mut R,
    ) -> Vec<GeneratedQuestion> {
        let mut sentences: Vec<String> = sentence_boundary()
            .split(text)
            .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|s| {
                let words = s.split(' ').filter(|w| !w.is_empty()).count();
                (MIN_SENTENCE_WORDS..=MAX_SENTENCE_WORDS).contains(&words)
            })
            .collect();
        sentences.shuffle(rng);

        let mut questions = Vec::new();
        for sentence in &sentences {
            if questions.len() >= num_questions {
                break;
            }
            if let Some(q) = question_from_sentence(sentence, rng) {
                questions.push(q);
            }
        }

        if questions.len() < 2 {
            questions.push(with_shuffled_options(
                "Which of the following best describes the uploaded document?".to_string(),
                "Study material for this course".to_string(),
                rng,
            ));
        }
        questions
    }
}

fn question_from_sentence<R: Rng + ?Sized>(sentence: &str, rng: &mut R) -> Option<GeneratedQuestion> {
    // ASCII lower-casing keeps byte offsets aligned with `sentence`.
    let lowered = sentence.to_ascii_lowercase();
    for keyword in DEFINITION_KEYWORDS {
        let Some(pos) = lowered.find(keyword) else {
            continue;
        };
        let subject = sentence[..pos].trim();
        let definition = sentence[pos + keyword.len()..].trim();
        if subject.is_empty() || definition.is_empty() {
            continue;
        }

        let question = if subject.split_whitespace().count() <= 5 {
            format!("What is {}?", subject)
        } else {
            format!("Fill in the blank: {} {} ______.", subject, keyword.trim())
        };
        return Some(with_shuffled_options(
            question,
            ellipsize(definition, MAX_OPTION_CHARS),
            rng,
        ));
    }
    None
}

fn with_shuffled_options<R: Rng + ?Sized>(
    question: String,
    answer: String,
    rng: &mut R,
) -> GeneratedQuestion {
    let mut options: Vec<String> = DISTRACTORS.iter().map(|d| d.to_string()).collect();
    options.push(answer.clone());
    options.shuffle(rng);
    let answer_index = options.iter().position(|o| *o == answer).unwrap_or(0) as i64;
    GeneratedQuestion {
        question,
        options,
        answer_index,
    }
}

#[async_trait]
impl QuizGenerator for HeuristicQuizGenerator {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    async fn generate(&self, text: &str, num_questions: usize) -> Vec<GeneratedQuestion> {
        let mut rng = rand::thread_rng();
        self.generate_with_rng(text, num_questions, &mut rng)
    }
}

// --- Pipeline ---

#[derive(Clone)]
pub struct QuizService {
    pool: PgPool,
    generator: Arc<dyn QuizGenerator>,
    text_budget: usize,
    num_questions: usize,
}

impl QuizService {
    pub fn new(
        pool: PgPool,
        generator: Arc<dyn QuizGenerator>,
        text_budget: usize,
        num_questions: usize,
    ) -> Self {
        Self {
            pool,
            generator,
            text_budget,
            num_questions,
        }
    }

    /// Extracts a library document and runs the configured generator over it.
    /// An empty result means the generator produced nothing and the caller may retry.
    pub async fn generate_for_document(&self, document_id: Uuid) -> Result<Vec<GeneratedQuestion>> {
        let document = sqlx::query_as::<_, LibraryDocument>(
            "SELECT * FROM library_documents WHERE id = $1",
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Document not found".into()))?;

        if !tokio::fs::try_exists(&document.file_path).await.unwrap_or(false) {
            tracing::warn!(document_id = %document.id, path = %document.file_path, "Document file missing on disk");
            return Err(Error::NotFound("File not found on server.".into()));
        }

        let text = extract_text_with_budget(&document.file_path, self.text_budget).await;
        if text.chars().count() < MIN_SOURCE_CHARS {
            return Err(Error::BadRequest("File is empty or unreadable.".into()));
        }

        let questions = self.generator.generate(&text, self.num_questions).await;
        tracing::info!(
            document_id = %document.id,
            generator = self.generator.name(),
            count = questions.len(),
            "Quiz generated"
        );
        Ok(questions)
    }
}
