use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

pub const COURSES_PER_PAGE: i64 = 6;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseListQuery {
    pub search: Option<String>,
    pub page: Option<i64>,
}

impl CourseListQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

impl SearchQuery {
    pub fn term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PaymentConfirmPayload {
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub amount: rust_decimal::Decimal,
    #[validate(length(min = 1, max = 100))]
    pub reference: String,
}
