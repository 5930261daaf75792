use crate::dto::course_dto::COURSES_PER_PAGE;
use crate::error::{Error, Result};
use crate::models::course::{Course, Lesson};
use crate::utils::text::slugify;
use crate::utils::validation::{ensure_difficulty, ensure_non_negative_price};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct CoursePage {
    pub courses: Vec<Course>,
    pub page: i64,
    pub total_pages: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseDetail {
    pub course: Course,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LandingStats {
    pub featured_courses: Vec<Course>,
    pub student_count: i64,
    pub course_count: i64,
}

#[derive(Debug, Clone, Default)]
pub struct CourseInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub faculty_name: Option<String>,
    pub price: Option<Decimal>,
    pub is_published: Option<bool>,
    pub total_modules: Option<i32>,
    pub difficulty_level: Option<String>,
    pub thumbnail: Option<String>,
}

impl CourseInput {
    fn check(&self) -> Result<()> {
        if let Some(price) = self.price {
            ensure_non_negative_price(price)?;
        }
        if let Some(level) = self.difficulty_level.as_deref() {
            ensure_difficulty(level)?;
        }
        if matches!(self.total_modules, Some(n) if n < 0) {
            return Err(Error::BadRequest("Total modules cannot be negative.".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NewLesson {
    pub title: String,
    pub video_url: Option<String>,
    pub video_file: Option<String>,
    pub content: Option<String>,
    pub duration: Option<String>,
    pub order: Option<i32>,
    pub is_preview: bool,
}

#[derive(Clone)]
pub struct CourseService {
    pool: PgPool,
}

impl CourseService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Published courses, newest first, six per page.
    pub async fn list_published(&self, search: Option<&str>, page: i64) -> Result<CoursePage> {
        let pattern = search.map(|s| format!("%{}%", s));
        let filter = r#"
            is_published = TRUE
            AND ($1::text IS NULL
                 OR title ILIKE $1 OR description ILIKE $1 OR difficulty_level ILIKE $1)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM courses WHERE {}", filter))
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;

        let total_pages = ((total + COURSES_PER_PAGE - 1) / COURSES_PER_PAGE).max(1);
        let page = page.clamp(1, total_pages);

        let courses = sqlx::query_as::<_, Course>(&format!(
            "SELECT * FROM courses WHERE {} ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            filter
        ))
        .bind(&pattern)
        .bind(COURSES_PER_PAGE)
        .bind((page - 1) * COURSES_PER_PAGE)
        .fetch_all(&self.pool)
        .await?;

        Ok(CoursePage {
            courses,
            page,
            total_pages,
            total,
        })
    }

    pub async fn get(&self, course_id: Uuid) -> Result<Course> {
        sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Course not found".into()))
    }

    pub async fn lessons(&self, course_id: Uuid) -> Result<Vec<Lesson>> {
        let lessons = sqlx::query_as::<_, Lesson>(
            "SELECT * FROM lessons WHERE course_id = $1 ORDER BY lesson_order, created_at",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lessons)
    }

    pub async fn detail(&self, course_id: Uuid) -> Result<CourseDetail> {
        let course = self.get(course_id).await?;
        let lessons = self.lessons(course_id).await?;
        Ok(CourseDetail { course, lessons })
    }

    pub async fn landing(&self) -> Result<LandingStats> {
        let featured_courses = sqlx::query_as::<_, Course>(
            "SELECT * FROM courses WHERE is_published = TRUE ORDER BY created_at DESC LIMIT 3",
        )
        .fetch_all(&self.pool)
        .await?;

        let (student_count, course_count) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users WHERE is_student = TRUE),
                (SELECT COUNT(*) FROM courses WHERE is_published = TRUE)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(LandingStats {
            featured_courses,
            student_count,
            course_count,
        })
    }

    // --- staff ---

    pub async fn list_all(&self) -> Result<Vec<Course>> {
        let courses = sqlx::query_as::<_, Course>("SELECT * FROM courses ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(courses)
    }

    pub async fn create(&self, input: CourseInput) -> Result<Course> {
        input.check()?;
        let title = input
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::BadRequest("title is required".into()))?;
        let description = input
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| Error::BadRequest("description is required".into()))?;
        let slug = input
            .slug
            .as_deref()
            .map(slugify)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| slugify(title));

        let course = sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (title, slug, description, faculty_name, thumbnail, price, is_published, total_modules, difficulty_level)
            VALUES ($1, $2, $3, COALESCE($4, 'Expert Faculty'), $5, $6, $7, $8, COALESCE($9, 'Medium'))
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(&slug)
        .bind(description)
        .bind(input.faculty_name.as_deref())
        .bind(input.thumbnail.as_deref())
        .bind(input.price.unwrap_or(Decimal::ZERO))
        .bind(input.is_published.unwrap_or(true))
        .bind(input.total_modules.unwrap_or(0))
        .bind(input.difficulty_level.as_deref())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(course_id = %course.id, slug = %course.slug, "Course created");
        Ok(course)
    }

    /// Applies the given changes; returns the course and the replaced thumbnail path, if any.
    pub async fn update(&self, course_id: Uuid, input: CourseInput) -> Result<(Course, Option<String>)> {
        input.check()?;
        let existing = self.get(course_id).await?;
        let slug = input.slug.as_deref().map(slugify).filter(|s| !s.is_empty());

        let course = sqlx::query_as::<_, Course>(
            r#"
            UPDATE courses SET
                title = COALESCE($2, title),
                slug = COALESCE($3, slug),
                description = COALESCE($4, description),
                faculty_name = COALESCE($5, faculty_name),
                thumbnail = COALESCE($6, thumbnail),
                price = COALESCE($7, price),
                is_published = COALESCE($8, is_published),
                total_modules = COALESCE($9, total_modules),
                difficulty_level = COALESCE($10, difficulty_level),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(course_id)
        .bind(input.title.as_deref().map(str::trim))
        .bind(slug)
        .bind(input.description.as_deref())
        .bind(input.faculty_name.as_deref())
        .bind(input.thumbnail.as_deref())
        .bind(input.price)
        .bind(input.is_published)
        .bind(input.total_modules)
        .bind(input.difficulty_level.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let replaced = match (&input.thumbnail, existing.thumbnail) {
            (Some(_), Some(old)) => Some(old),
            _ => None,
        };
        tracing::info!(course_id = %course.id, "Course updated");
        Ok((course, replaced))
    }

    /// Deletes a course and returns the file paths it owned: thumbnail, lesson videos and library documents.
    pub async fn delete(&self, course_id: Uuid) -> Result<Vec<String>> {
        let mut tx = self.pool.begin().await?;
        let mut files: Vec<String> = sqlx::query_scalar(
            "SELECT video_file FROM lessons WHERE course_id = $1 AND video_file IS NOT NULL",
        )
        .bind(course_id)
        .fetch_all(&mut *tx)
        .await?;

        // Library rows cascade with the course; their files do not.
        let documents: Vec<String> =
            sqlx::query_scalar("SELECT file_path FROM library_documents WHERE course_id = $1")
                .bind(course_id)
                .fetch_all(&mut *tx)
                .await?;
        files.extend(documents);

        let thumbnail: Option<Option<String>> =
            sqlx::query_scalar("DELETE FROM courses WHERE id = $1 RETURNING thumbnail")
                .bind(course_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(thumbnail) = thumbnail else {
            return Err(Error::NotFound("Course not found".into()));
        };
        tx.commit().await?;

        files.extend(thumbnail);
        tracing::info!(course_id = %course_id, "Course deleted");
        Ok(files)
    }

    /// Appends a lesson; without an explicit order it goes after the current last one.
    pub async fn add_lesson(&self, course_id: Uuid, lesson: NewLesson) -> Result<Lesson> {
        let course = self.get(course_id).await?;
        let title = lesson.title.trim();
        if title.is_empty() {
            return Err(Error::BadRequest("title is required".into()));
        }
        if matches!(lesson.order, Some(n) if n < 0) {
            return Err(Error::BadRequest("order cannot be negative".into()));
        }
        let video_url = lesson
            .video_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());

        let created = sqlx::query_as::<_, Lesson>(
            r#"
            INSERT INTO lessons (course_id, title, slug, video_file, video_url, content, duration, lesson_order, is_preview)
            VALUES ($1, $2, $3, $4, $5, $6, $7,
                    COALESCE($8, (SELECT COALESCE(MAX(lesson_order), 0) + 1 FROM lessons WHERE course_id = $1)),
                    $9)
            RETURNING *
            "#,
        )
        .bind(course.id)
        .bind(title)
        .bind(slugify(title))
        .bind(lesson.video_file.as_deref())
        .bind(video_url)
        .bind(lesson.content.as_deref())
        .bind(lesson.duration.as_deref())
        .bind(lesson.order)
        .bind(lesson.is_preview)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(course_id = %course.id, lesson_id = %created.id, order = created.order, "Lesson added");
        Ok(created)
    }
}
