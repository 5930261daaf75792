use crate::error::{Error, Result};
use crate::models::exam::{Exam, PublicQuestion, Question, QuizResultWithExam};
use crate::services::quiz_service::GeneratedQuestion;
use crate::utils::text::truncate_chars;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

pub const DEFAULT_QUIZ_TITLE: &str = "AI Generated Quiz";
const GENERATED_DESCRIPTION: &str = "Generated by AI Assistant";
const GENERATED_DURATION_MINUTES: i32 = 20;
const OPTION_SLOTS: usize = 4;
const MAX_OPTION_CHARS: usize = 200;
const EMPTY_SLOT: &str = "-";

/// A generated question mapped onto the four stored option slots.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedQuestion {
    pub question_text: String,
    pub options: [String; OPTION_SLOTS],
    pub correct_index: i16,
    pub correct_option: String,
}

/// Fits `q` into the stored shape. The flag is true when anything had to be repaired.
pub fn normalize_question(position: usize, q: &GeneratedQuestion) -> (NormalizedQuestion, bool) {
    let mut repaired = false;

    let mut question_text = q.question.trim().to_string();
    if question_text.is_empty() {
        question_text = format!("Question {}", position + 1);
        repaired = true;
    }
    if q.options.len() != OPTION_SLOTS {
        repaired = true;
    }

    let options: [String; OPTION_SLOTS] = std::array::from_fn(|i| {
        match q.options.get(i).map(|o| o.trim()).filter(|o| !o.is_empty()) {
            Some(o) => truncate_chars(o, MAX_OPTION_CHARS).to_string(),
            None => EMPTY_SLOT.to_string(),
        }
    });
    if q.options.iter().take(OPTION_SLOTS).any(|o| o.trim().is_empty()) {
        repaired = true;
    }

    let supplied = q.options.len().min(OPTION_SLOTS) as i64;
    let correct_index = if (0..supplied).contains(&q.answer_index) {
        q.answer_index as i16
    } else {
        repaired = true;
        0
    };
    let correct_option = options[correct_index as usize].clone();

    (
        NormalizedQuestion {
            question_text,
            options,
            correct_index,
            correct_option,
        },
        repaired,
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedQuiz {
    pub exam: Exam,
    pub question_count: usize,
    pub repaired: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExamOverview {
    pub available: Vec<Exam>,
    pub history: Vec<QuizResultWithExam>,
    pub available_count: usize,
    pub completed_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExamForTaking {
    pub exam: Exam,
    pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Clone)]
pub struct NewExam {
    pub course_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub exam_link: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub duration_minutes: i32,
}

#[derive(Clone)]
pub struct ExamService {
    pool: PgPool,
}

impl ExamService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persists an exam and all of its questions atomically.
    pub async fn save_quiz(
        &self,
        title: &str,
        questions: &[GeneratedQuestion],
        course_id: Option<Uuid>,
    ) -> Result<SavedQuiz> {
        if questions.is_empty() {
            return Err(Error::BadRequest("No questions to save.".into()));
        }
        let title = match title.trim() {
            "" => DEFAULT_QUIZ_TITLE,
            t => t,
        };

        let mut tx = self.pool.begin().await?;

        let exam = sqlx::query_as::<_, Exam>(
            r#"
            INSERT INTO exams (course_id, title, description, duration_minutes, total_marks, is_active)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            RETURNING *
            "#,
        )
        .bind(course_id)
        .bind(truncate_chars(title, 200))
        .bind(GENERATED_DESCRIPTION)
        .bind(GENERATED_DURATION_MINUTES)
        .bind(questions.len() as i32)
        .fetch_one(&mut *tx)
        .await?;

        let mut repaired = 0usize;
        for (position, q) in questions.iter().enumerate() {
            let (normalized, was_repaired) = normalize_question(position, q);
            if was_repaired {
                repaired += 1;
            }
            let [o1, o2, o3, o4] = &normalized.options;

            sqlx::query(
                r#"
                INSERT INTO questions (exam_id, position, question_text, option1, option2, option3, option4, correct_index, correct_option, marks)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 1)
                "#,
            )
            .bind(exam.id)
            .bind(position as i32)
            .bind(&normalized.question_text)
            .bind(o1)
            .bind(o2)
            .bind(o3)
            .bind(o4)
            .bind(normalized.correct_index)
            .bind(&normalized.correct_option)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        if repaired > 0 {
            tracing::warn!(exam_id = %exam.id, repaired, "Saved quiz with repaired questions");
        }
        tracing::info!(exam_id = %exam.id, questions = questions.len(), "Quiz saved");

        Ok(SavedQuiz {
            exam,
            question_count: questions.len(),
            repaired,
        })
    }

    /// Active exams the student has not attempted, plus their result history.
    pub async fn list_for_student(&self, student_id: Uuid) -> Result<ExamOverview> {
        let available = sqlx::query_as::<_, Exam>(
            r#"
            SELECT e.* FROM exams e
            WHERE e.is_active = TRUE
              AND NOT EXISTS (
                SELECT 1 FROM quiz_results r WHERE r.exam_id = e.id AND r.student_id = $1
              )
            ORDER BY e.created_at DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        let history = self.results_for_student(student_id).await?;

        Ok(ExamOverview {
            available_count: available.len(),
            completed_count: history.len(),
            available,
            history,
        })
    }

    pub async fn results_for_student(&self, student_id: Uuid) -> Result<Vec<QuizResultWithExam>> {
        let results = sqlx::query_as::<_, QuizResultWithExam>(
            r#"
            SELECT r.id, r.exam_id, e.title AS exam_title, r.score, r.total_marks,
                   r.percentage, r.attempt_number, r.taken_at
            FROM quiz_results r
            JOIN exams e ON e.id = r.exam_id
            WHERE r.student_id = $1
            ORDER BY r.taken_at DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(results)
    }

    pub async fn get_for_taking(&self, exam_id: Uuid) -> Result<ExamForTaking> {
        let exam = sqlx::query_as::<_, Exam>("SELECT * FROM exams WHERE id = $1")
            .bind(exam_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Exam not found".into()))?;

        let questions = sqlx::query_as::<_, Question>(
            "SELECT * FROM questions WHERE exam_id = $1 ORDER BY position",
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ExamForTaking {
            exam,
            questions: questions.iter().map(PublicQuestion::from).collect(),
        })
    }

    pub async fn create_exam(&self, new: NewExam) -> Result<Exam> {
        let exam = sqlx::query_as::<_, Exam>(
            r#"
            INSERT INTO exams (course_id, title, description, exam_link, deadline, duration_minutes, total_marks, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, 0, TRUE)
            RETURNING *
            "#,
        )
        .bind(new.course_id)
        .bind(new.title.trim())
        .bind(new.description)
        .bind(new.exam_link)
        .bind(new.deadline)
        .bind(new.duration_minutes)
        .fetch_one(&self.pool)
        .await?;
        Ok(exam)
    }

    pub async fn list_all(&self) -> Result<Vec<Exam>> {
        let exams = sqlx::query_as::<_, Exam>("SELECT * FROM exams ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(exams)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generated(question: &str, options: &[&str], answer_index: i64) -> GeneratedQuestion {
        GeneratedQuestion {
            question: question.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            answer_index,
        }
    }

    #[test]
    fn well_formed_question_is_untouched() {
        let (n, repaired) = normalize_question(0, &generated("2+2?", &["3", "4", "5", "6"], 1));
        assert!(!repaired);
        assert_eq!(n.correct_index, 1);
        assert_eq!(n.correct_option, "4");
        assert_eq!(n.options, ["3", "4", "5", "6"].map(String::from));
    }

    #[test]
    fn missing_slots_are_padded() {
        let (n, repaired) = normalize_question(0, &generated("Yes or no?", &["Yes", "No"], 1));
        assert!(repaired);
        assert_eq!(n.options, ["Yes", "No", "-", "-"].map(String::from));
        assert_eq!(n.correct_option, "No");
    }

    #[test]
    fn out_of_range_answer_falls_back_to_first_slot() {
        let (n, repaired) = normalize_question(2, &generated("", &["a", "b", "c", "d", "e"], 7));
        assert!(repaired);
        assert_eq!(n.question_text, "Question 3");
        assert_eq!(n.correct_index, 0);
        assert_eq!(n.correct_option, "a");

        let (n, _) = normalize_question(0, &generated("Q", &["a", "b"], 3));
        assert_eq!(n.correct_index, 0);
        assert_eq!(n.correct_option, "a");

        let (n, _) = normalize_question(0, &generated("Q", &["a", "b", "c", "d"], -1));
        assert_eq!(n.correct_index, 0);
    }

    #[test]
    fn correct_option_is_never_empty() {
        let (n, repaired) = normalize_question(0, &generated("Q", &["", " ", "c", "d"], 0));
        assert!(repaired);
        assert_eq!(n.correct_option, "-");
        assert!(!n.correct_option.is_empty());
    }
}
