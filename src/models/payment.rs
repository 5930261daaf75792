use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub amount: Decimal,
    pub reference: String,
    pub confirmed_at: DateTime<Utc>,
}
