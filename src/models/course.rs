use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::OnceLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Medium
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub faculty_name: String,
    pub thumbnail: Option<String>,
    pub price: Decimal,
    pub is_published: bool,
    pub total_modules: i32,
    pub difficulty_level: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    pub fn is_free(&self) -> bool {
        self.price <= Decimal::ZERO
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lesson {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub slug: String,
    pub video_file: Option<String>,
    pub video_url: Option<String>,
    pub content: Option<String>,
    pub duration: Option<String>,
    #[sqlx(rename = "lesson_order")]
    #[serde(rename = "order")]
    pub order: i32,
    pub is_preview: bool,
    pub created_at: DateTime<Utc>,
}

fn youtube_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:https?://)?(?:www\.|m\.)?(?:youtube\.com/(?:[^/\n\s]+/\S+/|(?:v|e(?:mbed)?)/|\S*?[?&]v=|shorts/)|youtu\.be/)([a-zA-Z0-9_-]{11})",
        )
        .expect("valid youtube regex")
    })
}

impl Lesson {
    /// Player URL for the lesson: YouTube links become embed links, anything
    /// else is returned as stored.
    pub fn embed_url(&self) -> String {
        let Some(url) = self.video_url.as_deref().map(str::trim) else {
            return String::new();
        };
        embed_url_for(url)
    }
}

pub fn embed_url_for(url: &str) -> String {
    match youtube_id_regex().captures(url).and_then(|c| c.get(1)) {
        Some(id) => format!("https://www.youtube.com/embed/{}?rel=0", id.as_str()),
        None => url.to_string(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LessonView {
    #[serde(flatten)]
    pub lesson: Lesson,
    pub embed_url: String,
}

impl From<Lesson> for LessonView {
    fn from(lesson: Lesson) -> Self {
        let embed_url = lesson.embed_url();
        Self { lesson, embed_url }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_youtube_links_to_embed() {
        let expected = "https://www.youtube.com/embed/dQw4w9WgXcQ?rel=0";
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://m.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
        ] {
            assert_eq!(embed_url_for(url), expected, "url: {}", url);
        }
    }

    #[test]
    fn leaves_other_links_untouched() {
        assert_eq!(
            embed_url_for("https://cdn.example.com/video.mp4"),
            "https://cdn.example.com/video.mp4"
        );
    }
}
