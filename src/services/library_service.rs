use crate::error::{Error, Result};
use crate::models::library::LibraryDocument;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub category: Option<String>,
    pub course_id: Option<Uuid>,
    pub file_path: String,
    pub uploaded_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentChanges {
    pub title: Option<String>,
    pub category: Option<String>,
    pub course_id: Option<Uuid>,
    pub file_path: Option<String>,
}

#[derive(Clone)]
pub struct LibraryService {
    pool: PgPool,
}

impl LibraryService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, search: Option<&str>) -> Result<Vec<LibraryDocument>> {
        let pattern = search.map(|s| format!("%{}%", s));
        let documents = sqlx::query_as::<_, LibraryDocument>(
            r#"
            SELECT * FROM library_documents
            WHERE $1::text IS NULL OR title ILIKE $1 OR category ILIKE $1
            ORDER BY uploaded_at DESC
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(documents)
    }

    pub async fn get(&self, document_id: Uuid) -> Result<LibraryDocument> {
        sqlx::query_as::<_, LibraryDocument>("SELECT * FROM library_documents WHERE id = $1")
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Document not found".into()))
    }

    pub async fn create(&self, doc: NewDocument) -> Result<LibraryDocument> {
        let document = sqlx::query_as::<_, LibraryDocument>(
            r#"
            INSERT INTO library_documents (course_id, title, category, file_path, uploaded_by)
            VALUES ($1, $2, COALESCE($3, 'General'), $4, $5)
            RETURNING *
            "#,
        )
        .bind(doc.course_id)
        .bind(doc.title.trim())
        .bind(doc.category.as_deref())
        .bind(&doc.file_path)
        .bind(doc.uploaded_by)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(document_id = %document.id, title = %document.title, "Document uploaded");
        Ok(document)
    }

    /// Updates metadata and optionally swaps the file; returns the replaced path.
    pub async fn update(&self, document_id: Uuid, changes: DocumentChanges) -> Result<(LibraryDocument, Option<String>)> {
        let existing = self.get(document_id).await?;
        let document = sqlx::query_as::<_, LibraryDocument>(
            r#"
            UPDATE library_documents SET
                title = COALESCE($2, title),
                category = COALESCE($3, category),
                course_id = COALESCE($4, course_id),
                file_path = COALESCE($5, file_path)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(document_id)
        .bind(changes.title.as_deref().map(str::trim))
        .bind(changes.category.as_deref())
        .bind(changes.course_id)
        .bind(changes.file_path.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let replaced = changes.file_path.map(|_| existing.file_path);
        Ok((document, replaced))
    }

    /// Removes the row and returns the stored file path for cleanup.
    pub async fn delete(&self, document_id: Uuid) -> Result<String> {
        let path: String = sqlx::query_scalar(
            "DELETE FROM library_documents WHERE id = $1 RETURNING file_path",
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Document not found".into()))?;

        tracing::info!(document_id = %document_id, "Document deleted");
        Ok(path)
    }
}
