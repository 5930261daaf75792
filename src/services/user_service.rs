use crate::dto::auth_dto::{RegisterPayload, UpdateProfilePayload};
use crate::dto::staff_dto::{StaffStats, UpdateStudentPayload};
use crate::error::{Error, Result};
use crate::models::user::{Profile, StudentLevel, User};
use crate::utils::crypto::{hash_password, verify_password};
use crate::utils::validation::ensure_level;
use sqlx::types::ipnetwork::IpNetwork;
use sqlx::PgPool;
use std::net::IpAddr;
use uuid::Uuid;

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a student account and its empty profile in one transaction.
    pub async fn register(&self, payload: RegisterPayload) -> Result<User> {
        let username = payload.username.trim().to_string();
        let email = payload.email.trim().to_lowercase();
        let level = match payload.student_level.as_deref().map(str::trim) {
            Some(level) if !level.is_empty() => {
                ensure_level(level)?;
                level.to_string()
            }
            _ => StudentLevel::default().as_str().to_string(),
        };

        let taken: Option<(String, String)> = sqlx::query_as(
            "SELECT username, email FROM users WHERE lower(username) = lower($1) OR lower(email) = $2 LIMIT 1",
        )
        .bind(&username)
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?;
        if let Some((existing_username, _)) = taken {
            return Err(if existing_username.eq_ignore_ascii_case(&username) {
                Error::Conflict("Username already exists.".into())
            } else {
                Error::Conflict("Email already registered.".into())
            });
        }

        let password_hash = hash_password(&payload.password)?;

        let mut tx = self.pool.begin().await?;
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name, is_student, student_level, stream)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&username)
        .bind(&email)
        .bind(&password_hash)
        .bind(payload.first_name.trim())
        .bind(payload.last_name.trim())
        .bind(&level)
        .bind(payload.stream.as_deref().map(str::trim))
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO profiles (user_id) VALUES ($1)")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, username = %user.username, "Student registered");
        Ok(user)
    }

    /// Checks credentials for a username or email and records the login address.
    pub async fn authenticate(&self, identifier: &str, password: &str, ip: Option<IpAddr>) -> Result<User> {
        let identifier = identifier.trim();
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE username = $1 OR lower(email) = lower($1) LIMIT 1",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::Unauthorized("Invalid username or password.".into()))?;

        if !verify_password(password, &user.password_hash)? {
            return Err(Error::Unauthorized("Invalid username or password.".into()));
        }
        if !user.is_active {
            tracing::warn!(user_id = %user.id, "Blocked user attempted to log in");
            return Err(Error::Unauthorized("Your account has been blocked.".into()));
        }

        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET last_login_ip = $2 WHERE id = $1 RETURNING *",
        )
        .bind(user.id)
        .bind(ip.map(IpNetwork::from))
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user_id = %user.id, role = user.role(), "User logged in");
        Ok(user)
    }

    pub async fn get(&self, user_id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".into()))
    }

    /// The user's profile, created on first access for accounts that predate profiles.
    pub async fn profile(&self, user_id: Uuid) -> Result<Profile> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (user_id) VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING *
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(profile)
    }

    pub async fn update_profile(&self, user_id: Uuid, payload: UpdateProfilePayload) -> Result<(User, Profile)> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(payload.first_name.as_deref().map(str::trim))
        .bind(payload.last_name.as_deref().map(str::trim))
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".into()))?;

        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (user_id, bio, phone, address, linkedin_url, github_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE SET
                bio = COALESCE(EXCLUDED.bio, profiles.bio),
                phone = COALESCE(EXCLUDED.phone, profiles.phone),
                address = COALESCE(EXCLUDED.address, profiles.address),
                linkedin_url = COALESCE(EXCLUDED.linkedin_url, profiles.linkedin_url),
                github_url = COALESCE(EXCLUDED.github_url, profiles.github_url),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(payload.bio)
        .bind(payload.phone)
        .bind(payload.address)
        .bind(payload.linkedin_url)
        .bind(payload.github_url)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((user, profile))
    }

    /// Stores a new picture path and returns the previous one so the caller can delete it.
    pub async fn set_profile_picture(&self, user_id: Uuid, path: &str) -> Result<(Profile, Option<String>)> {
        let previous = self.profile(user_id).await?.profile_pic;
        let profile = sqlx::query_as::<_, Profile>(
            "UPDATE profiles SET profile_pic = $2, updated_at = NOW() WHERE user_id = $1 RETURNING *",
        )
        .bind(user_id)
        .bind(path)
        .fetch_one(&self.pool)
        .await?;
        Ok((profile, previous))
    }

    // --- staff ---

    pub async fn list_students(&self, search: Option<&str>) -> Result<Vec<User>> {
        let pattern = search.map(|s| format!("%{}%", s));
        let students = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE is_student = TRUE AND is_staff = FALSE
              AND ($1::text IS NULL
                   OR username ILIKE $1 OR email ILIKE $1
                   OR first_name ILIKE $1 OR last_name ILIKE $1)
            ORDER BY date_joined DESC
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(students)
    }

    pub async fn student(&self, student_id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND is_student = TRUE")
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Student not found".into()))
    }

    pub async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    pub async fn update_student(&self, student_id: Uuid, payload: UpdateStudentPayload) -> Result<User> {
        if let Some(level) = payload.student_level.as_deref() {
            ensure_level(level)?;
        }
        let student = self.student(student_id).await?;

        let mut tx = self.pool.begin().await?;
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                stream = COALESCE($5, stream),
                student_level = COALESCE($6, student_level)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(student.id)
        .bind(payload.first_name.as_deref().map(str::trim))
        .bind(payload.last_name.as_deref().map(str::trim))
        .bind(payload.email.as_deref().map(|e| e.trim().to_lowercase()))
        .bind(payload.stream.as_deref().map(str::trim))
        .bind(payload.student_level.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        if let Some(phone) = payload.phone.as_deref() {
            sqlx::query(
                r#"
                INSERT INTO profiles (user_id, phone) VALUES ($1, $2)
                ON CONFLICT (user_id) DO UPDATE SET phone = EXCLUDED.phone, updated_at = NOW()
                "#,
            )
            .bind(student.id)
            .bind(phone.trim())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        tracing::info!(student_id = %student.id, "Student info updated");
        Ok(user)
    }

    /// Flips the active flag and returns the new state.
    pub async fn toggle_block(&self, student_id: Uuid) -> Result<bool> {
        let is_active: bool = sqlx::query_scalar(
            "UPDATE users SET is_active = NOT is_active WHERE id = $1 AND is_staff = FALSE RETURNING is_active",
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Student not found".into()))?;

        tracing::info!(student_id = %student_id, is_active, "Student block toggled");
        Ok(is_active)
    }

    pub async fn reset_password(&self, student_id: Uuid, new_password: &str) -> Result<()> {
        let password_hash = hash_password(new_password)?;
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1 AND is_staff = FALSE")
            .bind(student_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Student not found".into()));
        }
        tracing::info!(student_id = %student_id, "Student password reset");
        Ok(())
    }

    /// Deletes a student; enrollments, results and the profile cascade.
    pub async fn delete_student(&self, student_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1 AND is_staff = FALSE")
            .bind(student_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Student not found".into()));
        }
        tracing::info!(student_id = %student_id, "Student deleted");
        Ok(())
    }

    pub async fn staff_stats(&self) -> Result<StaffStats> {
        let stats = sqlx::query_as::<_, (i64, i64, i64, i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users WHERE is_student = TRUE AND is_staff = FALSE),
                (SELECT COUNT(*) FROM courses),
                (SELECT COUNT(*) FROM enrollments),
                (SELECT COUNT(*) FROM library_documents),
                (SELECT COUNT(*) FROM live_classes WHERE date_time >= NOW())
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StaffStats {
            total_students: stats.0,
            total_courses: stats.1,
            total_enrollments: stats.2,
            total_documents: stats.3,
            upcoming_classes: stats.4,
        })
    }
}

/// Mean of the recorded result percentages (not raw scores), rounded to one decimal.
pub fn average_percentage(percentages: &[f64]) -> f64 {
    if percentages.is_empty() {
        return 0.0;
    }
    let mean = percentages.iter().sum::<f64>() / percentages.len() as f64;
    (mean * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_is_rounded_to_one_decimal() {
        assert_eq!(average_percentage(&[]), 0.0);
        assert_eq!(average_percentage(&[66.67, 100.0, 50.0]), 72.2);
        assert_eq!(average_percentage(&[80.0]), 80.0);
    }
}
