use crate::config::AttemptPolicy;
use crate::error::{Error, Result};
use crate::models::exam::{Exam, Question, QuizResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

/// A student's pick for one question: the option index or the option text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmittedAnswer {
    Index(i64),
    Text(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct GradedAnswer {
    pub question_id: Uuid,
    pub question_text: String,
    pub selected: Option<String>,
    pub correct_option: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeReport {
    pub score: usize,
    pub total: usize,
    pub percentage: f64,
    pub breakdown: Vec<GradedAnswer>,
}

pub struct GradingService;

impl GradingService {
    /// Scores `answers` (keyed by question id) against `questions`.
    /// Text answers must equal the stored correct option exactly.
    pub fn grade(questions: &[Question], answers: &HashMap<String, SubmittedAnswer>) -> GradeReport {
        let mut score = 0usize;
        let mut breakdown = Vec::with_capacity(questions.len());

        for q in questions {
            let options = q.options();
            let submitted = answers.get(&q.id.to_string());

            let (selected, is_correct) = match submitted {
                Some(SubmittedAnswer::Index(idx)) => {
                    let text = usize::try_from(*idx)
                        .ok()
                        .and_then(|i| options.get(i))
                        .map(|s| s.to_string());
                    (text, *idx == q.correct_index as i64)
                }
                Some(SubmittedAnswer::Text(text)) => (Some(text.clone()), *text == q.correct_option),
                None => (None, false),
            };

            if is_correct {
                score += 1;
            }
            breakdown.push(GradedAnswer {
                question_id: q.id,
                question_text: q.question_text.clone(),
                selected,
                correct_option: q.correct_option.clone(),
                is_correct,
            });
        }

        let total = questions.len();
        GradeReport {
            score,
            total,
            percentage: percentage(score, total),
            breakdown,
        }
    }
}

pub fn percentage(score: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = score as f64 / total as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub result: QuizResult,
    pub report: GradeReport,
}

#[derive(Clone)]
pub struct SubmissionService {
    pool: PgPool,
    policy: AttemptPolicy,
}

impl SubmissionService {
    pub fn new(pool: PgPool, policy: AttemptPolicy) -> Self {
        Self { pool, policy }
    }

    /// Grades and records a new attempt. Prior attempts are never modified.
    pub async fn submit(
        &self,
        student_id: Uuid,
        exam_id: Uuid,
        answers: &HashMap<String, SubmittedAnswer>,
    ) -> Result<SubmissionOutcome> {
        let mut tx = self.pool.begin().await?;

        let exam = sqlx::query_as::<_, Exam>("SELECT * FROM exams WHERE id = $1")
            .bind(exam_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound("Exam not found".into()))?;

        if !exam.is_active {
            return Err(Error::BadRequest("This exam is not active.".into()));
        }
        if exam.is_expired() {
            return Err(Error::BadRequest("The deadline for this exam has passed.".into()));
        }

        let questions = sqlx::query_as::<_, Question>(
            "SELECT * FROM questions WHERE exam_id = $1 ORDER BY position",
        )
        .bind(exam_id)
        .fetch_all(&mut *tx)
        .await?;

        let previous: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(attempt_number), 0) FROM quiz_results WHERE student_id = $1 AND exam_id = $2",
        )
        .bind(student_id)
        .bind(exam_id)
        .fetch_one(&mut *tx)
        .await?;

        let attempt_number = next_attempt(self.policy, previous)?;
        let report = GradingService::grade(&questions, answers);

        let result = sqlx::query_as::<_, QuizResult>(
            r#"
            INSERT INTO quiz_results (student_id, exam_id, score, total_marks, percentage, attempt_number, answers)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(student_id)
        .bind(exam_id)
        .bind(report.score as f64)
        .bind(report.total as f64)
        .bind(report.percentage)
        .bind(attempt_number)
        .bind(json!(report.breakdown))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            student_id = %student_id,
            exam_id = %exam_id,
            attempt = attempt_number,
            score = report.score,
            total = report.total,
            "Quiz submitted"
        );

        Ok(SubmissionOutcome { result, report })
    }
}

fn next_attempt(policy: AttemptPolicy, previous: i32) -> Result<i32> {
    match policy {
        AttemptPolicy::Single if previous > 0 => {
            Err(Error::Conflict("You have already taken this exam.".into()))
        }
        _ => Ok(previous + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(text: &str, options: [&str; 4], correct_index: i16) -> Question {
        Question {
            id: Uuid::new_v4(),
            exam_id: Uuid::nil(),
            position: 0,
            question_text: text.to_string(),
            option1: options[0].to_string(),
            option2: options[1].to_string(),
            option3: options[2].to_string(),
            option4: options[3].to_string(),
            correct_index,
            correct_option: options[correct_index as usize].to_string(),
            marks: 1,
        }
    }

    #[test]
    fn grades_by_text_and_by_index() {
        let q1 = question("2+2?", ["3", "4", "5", "6"], 1);
        let q2 = question("Capital of Japan?", ["Tokyo", "Kyoto", "Osaka", "Nara"], 0);
        let q3 = question("Largest planet?", ["Mars", "Venus", "Jupiter", "Earth"], 2);

        let mut answers = HashMap::new();
        answers.insert(q1.id.to_string(), SubmittedAnswer::Text("4".into()));
        answers.insert(q2.id.to_string(), SubmittedAnswer::Index(0));
        answers.insert(q3.id.to_string(), SubmittedAnswer::Index(1));

        let report = GradingService::grade(&[q1, q2, q3], &answers);
        assert_eq!(report.score, 2);
        assert_eq!(report.total, 3);
        assert_eq!(report.percentage, 66.67);
        assert_eq!(report.breakdown[2].selected.as_deref(), Some("Venus"));
        assert!(!report.breakdown[2].is_correct);
    }

    #[test]
    fn text_comparison_is_exact() {
        let q = question("Language?", ["Rust", "Go", "C", "Zig"], 0);
        let mut answers = HashMap::new();
        answers.insert(q.id.to_string(), SubmittedAnswer::Text("rust ".into()));
        let report = GradingService::grade(&[q], &answers);
        assert_eq!(report.score, 0);
        assert_eq!(report.percentage, 0.0);
    }

    #[test]
    fn unanswered_and_out_of_range_are_wrong() {
        let q1 = question("A?", ["a", "b", "c", "d"], 3);
        let q2 = question("B?", ["a", "b", "c", "d"], 0);
        let mut answers = HashMap::new();
        answers.insert(q1.id.to_string(), SubmittedAnswer::Index(9));
        let report = GradingService::grade(&[q1, q2], &answers);
        assert_eq!(report.score, 0);
        assert_eq!(report.breakdown[0].selected, None);
        assert_eq!(report.breakdown[1].selected, None);
    }

    #[test]
    fn empty_exam_scores_zero_percent() {
        let report = GradingService::grade(&[], &HashMap::new());
        assert_eq!((report.score, report.total, report.percentage), (0, 0, 0.0));
    }

    #[test]
    fn answers_deserialize_from_text_or_index() {
        let raw = r#"{"a": 2, "b": "Paris"}"#;
        let parsed: HashMap<String, SubmittedAnswer> = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed["a"], SubmittedAnswer::Index(2));
        assert_eq!(parsed["b"], SubmittedAnswer::Text("Paris".into()));
    }

    #[test]
    fn attempt_policy() {
        assert_eq!(next_attempt(AttemptPolicy::Unlimited, 0).unwrap(), 1);
        assert_eq!(next_attempt(AttemptPolicy::Unlimited, 3).unwrap(), 4);
        assert_eq!(next_attempt(AttemptPolicy::Single, 0).unwrap(), 1);
        assert!(matches!(
            next_attempt(AttemptPolicy::Single, 1),
            Err(Error::Conflict(_))
        ));
    }
}
