use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LibraryDocument {
    pub id: Uuid,
    pub course_id: Option<Uuid>,
    pub title: String,
    pub category: String,
    #[serde(skip_serializing)]
    pub file_path: String,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: Option<Uuid>,
}

impl LibraryDocument {
    pub fn extension(&self) -> String {
        std::path::Path::new(&self.file_path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default()
    }
}
