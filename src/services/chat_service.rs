use crate::error::Result;
use crate::models::course::Course;
use crate::services::llm_service::{ChatMessage, LlmProvider};
use crate::utils::text::ellipsize;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use utoipa::ToSchema;

pub const HISTORY_WINDOW: usize = 6;
pub const APOLOGY: &str =
    "I am having trouble connecting to the brain right now. Please try again later.";
const DESCRIPTION_PREVIEW_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// One line of catalog context handed to the assistant.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub title: String,
    pub mentor: String,
    pub level: String,
    pub description: String,
}

impl From<&Course> for CatalogEntry {
    fn from(course: &Course) -> Self {
        Self {
            title: course.title.clone(),
            mentor: course.faculty_name.clone(),
            level: course.difficulty_level.clone(),
            description: course.description.clone(),
        }
    }
}

pub fn catalog_summary(entries: &[CatalogEntry]) -> String {
    if entries.is_empty() {
        return "No courses are published yet.".to_string();
    }
    entries
        .iter()
        .map(|c| {
            format!(
                "- {} (Mentor: {}, Level: {}): {}",
                c.title,
                c.mentor,
                c.level,
                ellipsize(c.description.trim(), DESCRIPTION_PREVIEW_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn system_prompt(catalog: &str) -> String {
    format!(
        "ROLE: You are 'LearnHub AI', an educational assistant and coding mentor. \
         You are polite, encouraging and precise.\n\n\
         COURSES CURRENTLY AVAILABLE ON THIS PLATFORM:\n{}\n\n\
         GUIDELINES:\n\
         1. Only answer questions about learning and education, programming, debugging, \
         the courses listed above, and careers in tech and education.\n\
         2. For anything else reply with: \"I am designed to assist only with learning and \
         educational topics. Please ask me something about your courses or studies.\"\n\
         3. When writing code, keep it clean and explain the logic step by step.\n\
         4. Keep a professional tone that stays accessible to beginners.",
        catalog
    )
}

/// Messages sent to the model: system prompt, the trailing history window, the new question.
pub fn build_messages(question: &str, history: &[ChatTurn], catalog: &str) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    let mut messages = Vec::with_capacity(HISTORY_WINDOW + 2);
    messages.push(ChatMessage::system(system_prompt(catalog)));
    for turn in &history[start..] {
        messages.push(match turn.role {
            ChatRole::User => ChatMessage::user(turn.content.clone()),
            ChatRole::Assistant => ChatMessage::assistant(turn.content.clone()),
        });
    }
    messages.push(ChatMessage::user(question));
    messages
}

#[derive(Clone)]
pub struct ChatAssistant {
    pool: PgPool,
    provider: Arc<dyn LlmProvider>,
}

impl ChatAssistant {
    pub fn new(pool: PgPool, provider: Arc<dyn LlmProvider>) -> Self {
        Self { pool, provider }
    }

    async fn live_catalog(&self) -> Result<Vec<CatalogEntry>> {
        let courses = sqlx::query_as::<_, Course>(
            "SELECT * FROM courses WHERE is_published = TRUE ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(courses.iter().map(CatalogEntry::from).collect())
    }

    /// Answers `question`. Never fails: any error becomes the fixed apology.
    pub async fn reply(&self, question: &str, history: &[ChatTurn]) -> String {
        let catalog = match self.live_catalog().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("Failed to load course catalog for chat: {}", e);
                return APOLOGY.to_string();
            }
        };
        reply_with(self.provider.as_ref(), question, history, &catalog).await
    }
}

pub async fn reply_with(
    provider: &dyn LlmProvider,
    question: &str,
    history: &[ChatTurn],
    catalog: &[CatalogEntry],
) -> String {
    let messages = build_messages(question, history, &catalog_summary(catalog));
    match provider.complete(messages).await {
        Ok(answer) if !answer.trim().is_empty() => answer,
        Ok(_) => {
            tracing::warn!("Chat model returned an empty answer");
            APOLOGY.to_string()
        }
        Err(e) => {
            tracing::error!("Chat completion failed: {}", e);
            APOLOGY.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::services::llm_service::MockLlmProvider;

    fn turn(role: ChatRole, content: &str) -> ChatTurn {
        ChatTurn {
            role,
            content: content.to_string(),
        }
    }

    #[test]
    fn only_last_six_turns_are_forwarded() {
        let history: Vec<ChatTurn> = (0..10)
            .map(|i| {
                let role = if i % 2 == 0 { ChatRole::User } else { ChatRole::Assistant };
                turn(role, &format!("turn {}", i))
            })
            .collect();
        let messages = build_messages("latest?", &history, "- Rust");

        assert_eq!(messages.len(), 1 + HISTORY_WINDOW + 1);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].content, "turn 4");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[2].role, "assistant");
        assert_eq!(messages.last().unwrap(), &ChatMessage::user("latest?"));
    }

    #[test]
    fn catalog_descriptions_are_truncated() {
        let entry = CatalogEntry {
            title: "Rust 101".into(),
            mentor: "Ferris".into(),
            level: "Easy".into(),
            description: "x".repeat(300),
        };
        let summary = catalog_summary(&[entry]);
        assert!(summary.starts_with("- Rust 101 (Mentor: Ferris, Level: Easy): "));
        assert!(summary.ends_with(&format!("{}...", "x".repeat(120))));
    }

    #[tokio::test]
    async fn provider_receives_only_the_recent_window() {
        let history: Vec<ChatTurn> = (0..9)
            .map(|i| {
                let role = if i % 2 == 0 { ChatRole::User } else { ChatRole::Assistant };
                turn(role, &format!("turn {}", i))
            })
            .collect();

        let mut provider = MockLlmProvider::new();
        provider.expect_complete().times(1).returning(|messages| {
            assert_eq!(messages.len(), 1 + HISTORY_WINDOW + 1);
            assert_eq!(messages[0].role, "system");
            assert_eq!(messages[1], ChatMessage::assistant("turn 3"));
            assert_eq!(messages[HISTORY_WINDOW], ChatMessage::user("turn 8"));
            assert_eq!(messages[HISTORY_WINDOW + 1], ChatMessage::user("and now?"));
            assert!(!messages.iter().any(|m| m.content == "turn 2"));
            Ok("Windowed.".to_string())
        });

        let answer = reply_with(&provider, "and now?", &history, &[]).await;
        assert_eq!(answer, "Windowed.");
    }

    #[tokio::test]
    async fn failures_become_apology() {
        let mut provider = MockLlmProvider::new();
        provider
            .expect_complete()
            .returning(|_| Err(Error::Config("LLM_API_KEY is not set".into())));
        let answer = reply_with(&provider, "What is Rust?", &[], &[]).await;
        assert_eq!(answer, APOLOGY);
    }

    #[tokio::test]
    async fn catalog_reaches_the_system_prompt() {
        let mut provider = MockLlmProvider::new();
        provider.expect_complete().times(1).returning(|messages| {
            assert!(messages[0].content.contains("- Data Science (Mentor: Dr. Rahman"));
            Ok("Try Data Science.".to_string())
        });
        let catalog = vec![CatalogEntry {
            title: "Data Science".into(),
            mentor: "Dr. Rahman".into(),
            level: "Medium".into(),
            description: "Pandas and statistics.".into(),
        }];
        let answer = reply_with(&provider, "Which course?", &[], &catalog).await;
        assert_eq!(answer, "Try Data Science.");
    }
}
