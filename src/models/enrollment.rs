use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const MAX_PROGRESS: f64 = 100.0;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub enrolled_at: DateTime<Utc>,
    pub progress: f64,
    pub is_completed: bool,
    pub last_accessed: DateTime<Utc>,
}

/// Enrollment joined with the course fields shown on dashboards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EnrollmentWithCourse {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub course_title: String,
    pub course_slug: String,
    pub course_thumbnail: Option<String>,
    pub student_username: String,
    pub enrolled_at: DateTime<Utc>,
    pub progress: f64,
    pub is_completed: bool,
    pub last_accessed: DateTime<Utc>,
}

/// Progress earned by viewing the lesson at `index` of `total` ordered lessons,
/// rounded to two decimals.
pub fn lesson_progress(index: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = ((index + 1) as f64 / total as f64) * MAX_PROGRESS;
    clamp_progress((raw * 100.0).round() / 100.0)
}

pub fn clamp_progress(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, MAX_PROGRESS)
}

/// Applies the ratchet: progress never moves backwards.
/// Returns the resulting progress and completion flag.
pub fn ratchet(current: f64, candidate: f64) -> (f64, bool) {
    let next = clamp_progress(current.max(candidate));
    (next, next >= MAX_PROGRESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_of_three_lessons_is_two_thirds() {
        assert_eq!(lesson_progress(1, 3), 66.67);
        assert_eq!(lesson_progress(2, 3), 100.0);
        assert_eq!(lesson_progress(0, 4), 25.0);
        assert_eq!(lesson_progress(0, 0), 0.0);
    }

    #[test]
    fn ratchet_never_lowers_progress() {
        let (p, done) = ratchet(0.0, lesson_progress(1, 3));
        assert_eq!(p, 66.67);
        assert!(!done);

        let (p, done) = ratchet(p, lesson_progress(0, 3));
        assert_eq!(p, 66.67);
        assert!(!done);

        let (p, done) = ratchet(p, lesson_progress(2, 3));
        assert_eq!(p, 100.0);
        assert!(done);
    }

    #[test]
    fn ratchet_clamps_out_of_range_values() {
        assert_eq!(ratchet(0.0, 250.0), (100.0, true));
        assert_eq!(ratchet(-5.0, -1.0), (0.0, false));
        assert_eq!(ratchet(10.0, f64::NAN).0, 10.0);
    }

    #[test]
    fn completion_iff_full_progress() {
        for total in 1..8 {
            let mut progress = 0.0;
            for idx in 0..total {
                let (p, done) = ratchet(progress, lesson_progress(idx, total));
                assert!(p >= progress);
                assert_eq!(done, p == MAX_PROGRESS);
                progress = p;
            }
            assert_eq!(progress, MAX_PROGRESS);
        }
    }
}
