use crate::dto::staff_dto::{LiveClassPayload, NoticePayload};
use crate::error::Result;
use crate::models::schedule::{LiveClass, Notice};
use crate::utils::validation::ensure_not_in_past;
use sqlx::PgPool;

/// Classes that started within this many minutes still count as upcoming.
const LIVE_GRACE_MINUTES: i32 = 60;

#[derive(Clone)]
pub struct ScheduleService {
    pool: PgPool,
}

impl ScheduleService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn upcoming_live_classes(&self) -> Result<Vec<LiveClass>> {
        let classes = sqlx::query_as::<_, LiveClass>(
            r#"
            SELECT * FROM live_classes
            WHERE date_time >= NOW() - make_interval(mins => $1)
            ORDER BY date_time ASC
            "#,
        )
        .bind(LIVE_GRACE_MINUTES)
        .fetch_all(&self.pool)
        .await?;
        Ok(classes)
    }

    pub async fn create_live_class(&self, payload: LiveClassPayload) -> Result<LiveClass> {
        ensure_not_in_past(payload.date_time)?;
        let class = sqlx::query_as::<_, LiveClass>(
            r#"
            INSERT INTO live_classes (course_id, title, description, meeting_link, date_time)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(payload.course_id)
        .bind(payload.title.trim())
        .bind(payload.description)
        .bind(payload.meeting_link.trim())
        .bind(payload.date_time)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(live_class_id = %class.id, at = %class.date_time, "Live class scheduled");
        Ok(class)
    }

    pub async fn latest_notices(&self, limit: i64) -> Result<Vec<Notice>> {
        let notices = sqlx::query_as::<_, Notice>(
            "SELECT * FROM notices ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(notices)
    }

    pub async fn create_notice(&self, payload: NoticePayload) -> Result<Notice> {
        let notice = sqlx::query_as::<_, Notice>(
            "INSERT INTO notices (title, message, is_global) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(payload.title.trim())
        .bind(payload.message.trim())
        .bind(payload.is_global)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(notice_id = %notice.id, "Notice published");
        Ok(notice)
    }
}
