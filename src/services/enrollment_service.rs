use crate::error::{Error, Result};
use crate::models::course::{Course, Lesson, LessonView};
use crate::models::enrollment::{lesson_progress, ratchet, Enrollment, EnrollmentWithCourse};
use crate::models::payment::Payment;
use crate::models::schedule::Notice;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EnrollOutcome {
    Enrolled { enrollment: Enrollment },
    AlreadyEnrolled { enrollment: Enrollment },
    PaymentRequired { course_id: Uuid, amount: Decimal },
}

#[derive(Debug, Clone, Serialize)]
pub struct LessonPlayback {
    pub course: Course,
    pub lesson: Option<LessonView>,
    pub lessons: Vec<Lesson>,
    pub prev_lesson_id: Option<Uuid>,
    pub next_lesson_id: Option<Uuid>,
    pub progress: f64,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub enrollments: Vec<EnrollmentWithCourse>,
    pub notices: Vec<Notice>,
    pub total_enrolled: usize,
    pub completed: usize,
    pub certificates: usize,
}

#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub amount: Decimal,
    pub reference: String,
}

const ENROLLMENT_WITH_COURSE: &str = r#"
    SELECT e.id, e.student_id, e.course_id, c.title AS course_title, c.slug AS course_slug,
           c.thumbnail AS course_thumbnail, u.username AS student_username,
           e.enrolled_at, e.progress, e.is_completed, e.last_accessed
    FROM enrollments e
    JOIN courses c ON c.id = e.course_id
    JOIN users u ON u.id = e.student_id
"#;

#[derive(Clone)]
pub struct EnrollmentService {
    pool: PgPool,
}

impl EnrollmentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn course(&self, course_id: Uuid) -> Result<Course> {
        sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Course not found".into()))
    }

    pub async fn find(&self, student_id: Uuid, course_id: Uuid) -> Result<Option<Enrollment>> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE student_id = $1 AND course_id = $2",
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(enrollment)
    }

    /// Free courses enroll immediately; paid ones report the amount due and create nothing.
    pub async fn enroll(&self, student_id: Uuid, course_id: Uuid) -> Result<EnrollOutcome> {
        let course = self.course(course_id).await?;

        if let Some(enrollment) = self.find(student_id, course_id).await? {
            return Ok(EnrollOutcome::AlreadyEnrolled { enrollment });
        }

        if !course.is_free() {
            return Ok(EnrollOutcome::PaymentRequired {
                course_id,
                amount: course.price,
            });
        }

        let (enrollment, created) = self.get_or_create(student_id, course_id).await?;
        if created {
            tracing::info!(student_id = %student_id, course_id = %course_id, "Student enrolled");
            Ok(EnrollOutcome::Enrolled { enrollment })
        } else {
            Ok(EnrollOutcome::AlreadyEnrolled { enrollment })
        }
    }

    /// Inserts the enrollment unless one exists; the unique key makes concurrent calls converge.
    async fn get_or_create(&self, student_id: Uuid, course_id: Uuid) -> Result<(Enrollment, bool)> {
        let inserted = sqlx::query_as::<_, Enrollment>(
            r#"
            INSERT INTO enrollments (student_id, course_id)
            VALUES ($1, $2)
            ON CONFLICT (student_id, course_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(enrollment) => Ok((enrollment, true)),
            None => {
                let existing = self
                    .find(student_id, course_id)
                    .await?
                    .ok_or_else(|| Error::Internal("Enrollment vanished after conflict".into()))?;
                Ok((existing, false))
            }
        }
    }

    /// Records a verified gateway payment and grants access to the course.
    pub async fn confirm_payment(&self, confirmation: PaymentConfirmation) -> Result<Enrollment> {
        let course = self.course(confirmation.course_id).await?;
        if confirmation.amount < course.price {
            return Err(Error::PaymentRequired(format!(
                "Amount {} does not cover the course price {}",
                confirmation.amount, course.price
            )));
        }

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (student_id, course_id, amount, reference)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (reference) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(confirmation.student_id)
        .bind(confirmation.course_id)
        .bind(confirmation.amount)
        .bind(&confirmation.reference)
        .fetch_optional(&self.pool)
        .await?;

        if payment.is_none() {
            tracing::info!(reference = %confirmation.reference, "Payment already recorded");
        }

        let (enrollment, created) = self
            .get_or_create(confirmation.student_id, confirmation.course_id)
            .await?;
        tracing::info!(
            student_id = %confirmation.student_id,
            course_id = %confirmation.course_id,
            reference = %confirmation.reference,
            created,
            "Payment confirmed"
        );
        Ok(enrollment)
    }

    /// Opens a lesson for an enrolled student and advances progress. Progress only ever grows.
    pub async fn record_view(
        &self,
        student_id: Uuid,
        course_id: Uuid,
        lesson_id: Option<Uuid>,
    ) -> Result<LessonPlayback> {
        let course = self.course(course_id).await?;

        let mut enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            UPDATE enrollments SET last_accessed = NOW()
            WHERE student_id = $1 AND course_id = $2
            RETURNING *
            "#,
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::NotEnrolled)?;

        let lessons = sqlx::query_as::<_, Lesson>(
            "SELECT * FROM lessons WHERE course_id = $1 ORDER BY lesson_order, created_at",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        if lessons.is_empty() {
            return Ok(LessonPlayback {
                course,
                lesson: None,
                lessons,
                prev_lesson_id: None,
                next_lesson_id: None,
                progress: enrollment.progress,
                is_completed: enrollment.is_completed,
            });
        }

        let index = match lesson_id {
            None => 0,
            Some(id) => lessons
                .iter()
                .position(|l| l.id == id)
                .ok_or_else(|| Error::NotFound("Lesson not found in this course".into()))?,
        };

        let candidate = lesson_progress(index, lessons.len());
        let (advanced, _) = ratchet(enrollment.progress, candidate);
        if advanced > enrollment.progress {
            enrollment = sqlx::query_as::<_, Enrollment>(
                r#"
                UPDATE enrollments
                SET progress = GREATEST(progress, LEAST($3, 100.0)),
                    is_completed = GREATEST(progress, LEAST($3, 100.0)) >= 100.0
                WHERE student_id = $1 AND course_id = $2
                RETURNING *
                "#,
            )
            .bind(student_id)
            .bind(course_id)
            .bind(candidate)
            .fetch_one(&self.pool)
            .await?;
            tracing::info!(
                student_id = %student_id,
                course_id = %course_id,
                progress = enrollment.progress,
                "Progress advanced"
            );
        }

        let prev_lesson_id = index.checked_sub(1).map(|i| lessons[i].id);
        let next_lesson_id = lessons.get(index + 1).map(|l| l.id);
        let lesson = LessonView::from(lessons[index].clone());

        Ok(LessonPlayback {
            course,
            lesson: Some(lesson),
            lessons,
            prev_lesson_id,
            next_lesson_id,
            progress: enrollment.progress,
            is_completed: enrollment.is_completed,
        })
    }

    pub async fn dashboard(&self, student_id: Uuid) -> Result<Dashboard> {
        let enrollments = sqlx::query_as::<_, EnrollmentWithCourse>(&format!(
            "{} WHERE e.student_id = $1 ORDER BY e.last_accessed DESC",
            ENROLLMENT_WITH_COURSE
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        let notices = sqlx::query_as::<_, Notice>(
            "SELECT * FROM notices ORDER BY created_at DESC LIMIT 5",
        )
        .fetch_all(&self.pool)
        .await?;

        let completed = enrollments.iter().filter(|e| e.is_completed).count();
        Ok(Dashboard {
            total_enrolled: enrollments.len(),
            completed,
            certificates: completed,
            enrollments,
            notices,
        })
    }

    pub async fn for_student(&self, student_id: Uuid) -> Result<Vec<EnrollmentWithCourse>> {
        let rows = sqlx::query_as::<_, EnrollmentWithCourse>(&format!(
            "{} WHERE e.student_id = $1 ORDER BY e.enrolled_at DESC",
            ENROLLMENT_WITH_COURSE
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_all(&self) -> Result<Vec<EnrollmentWithCourse>> {
        let rows = sqlx::query_as::<_, EnrollmentWithCourse>(&format!(
            "{} ORDER BY e.enrolled_at DESC",
            ENROLLMENT_WITH_COURSE
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn delete(&self, enrollment_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM enrollments WHERE id = $1")
            .bind(enrollment_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Enrollment not found".into()));
        }
        tracing::info!(enrollment_id = %enrollment_id, "Enrollment deleted");
        Ok(())
    }
}
