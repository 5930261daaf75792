use crate::error::{Error, Result};
use axum::extract::Multipart;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Bytes,
}

/// A drained multipart body: text fields by name plus any non-empty file parts.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(Error::Multipart)? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(|f| f.to_string()) {
                Some(filename) => {
                    let data = field.bytes().await.map_err(Error::Multipart)?;
                    if !data.is_empty() {
                        form.files.insert(name, UploadedFile { filename, data });
                    }
                }
                None => {
                    let value = field.text().await.map_err(Error::Multipart)?;
                    form.fields.insert(name, value);
                }
            }
        }
        Ok(form)
    }

    /// Trimmed, non-empty text field.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string())
    }

    pub fn require(&self, name: &str) -> Result<String> {
        self.text(name)
            .ok_or_else(|| Error::BadRequest(format!("{} is required", name)))
    }

    pub fn parse<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>> {
        match self.text(name) {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| Error::BadRequest(format!("Invalid value for {}", name))),
            None => Ok(None),
        }
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.text(name)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "on" | "1" | "yes"))
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}

/// Writes `data` under `<root>/<subdir>/` with a fresh name and returns the stored path.
pub async fn save_upload(root: &str, subdir: &str, extension: &str, data: &[u8]) -> Result<String> {
    let dir = Path::new(root).join(subdir);
    tokio::fs::create_dir_all(&dir).await.map_err(Error::Io)?;
    let path = dir.join(format!("{}.{}", Uuid::new_v4(), extension));
    tokio::fs::write(&path, data).await.map_err(Error::Io)?;
    Ok(path.to_string_lossy().into_owned())
}

/// Best-effort removal of a stored upload.
pub async fn remove_upload(path: &str) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::info!(path = %path, "Removed stored file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path, "Failed to remove stored file: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saves_and_removes_uploads() {
        let root = std::env::temp_dir().join(format!("uploads_{}", Uuid::new_v4()));
        let root = root.to_str().unwrap();

        let path = save_upload(root, "library", "txt", b"hello").await.unwrap();
        assert!(path.ends_with(".txt"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"hello");

        remove_upload(&path).await;
        assert!(!Path::new(&path).exists());
        remove_upload(&path).await;

        tokio::fs::remove_dir_all(root).await.unwrap();
    }

    #[test]
    fn form_field_helpers() {
        let mut form = MultipartForm::default();
        form.fields.insert("title".into(), "  Rust  ".into());
        form.fields.insert("order".into(), "3".into());
        form.fields.insert("is_preview".into(), "on".into());
        form.fields.insert("blank".into(), "   ".into());

        assert_eq!(form.text("title").as_deref(), Some("Rust"));
        assert_eq!(form.parse::<i32>("order").unwrap(), Some(3));
        assert!(form.parse::<i32>("title").is_err());
        assert_eq!(form.flag("is_preview"), Some(true));
        assert!(form.require("blank").is_err());
        assert!(form.take_file("video").is_none());
    }
}
