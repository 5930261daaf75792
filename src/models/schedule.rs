use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LiveClass {
    pub id: Uuid,
    pub course_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub meeting_link: String,
    pub date_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notice {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub is_global: bool,
    pub created_at: DateTime<Utc>,
}
