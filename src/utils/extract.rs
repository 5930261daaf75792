use crate::utils::text::truncate_chars;
use std::path::Path;
use tokio::fs;
use tokio::process::Command;

/// Plain text of a stored document. Every failure degrades to an empty
/// string; callers decide whether the result is usable.
pub async fn extract_text_from_file(file_path: &str) -> String {
    let ext = Path::new(file_path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let text = match ext.as_str() {
        "pdf" => run_pdftotext(file_path).await,
        "doc" | "docx" | "ppt" | "pptx" | "odt" | "rtf" => run_libreoffice_to_text(file_path).await,
        "txt" | "md" => match fs::read(file_path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                tracing::error!("Failed to read text file {}: {}", file_path, e);
                String::new()
            }
        },
        other => {
            tracing::warn!("No text extractor for .{} ({})", other, file_path);
            String::new()
        }
    };

    text.trim().to_string()
}

/// Extracted text capped to `budget` characters for the downstream model.
pub async fn extract_text_with_budget(file_path: &str, budget: usize) -> String {
    let text = extract_text_from_file(file_path).await;
    truncate_chars(&text, budget).to_string()
}

async fn run_pdftotext(file_path: &str) -> String {
    let output = Command::new("pdftotext")
        .arg("-layout")
        .arg(file_path)
        .arg("-")
        .output()
        .await;

    match output {
        Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).into_owned(),
        Ok(out) => {
            tracing::error!(
                "pdftotext failed on {}: {}",
                file_path,
                String::from_utf8_lossy(&out.stderr)
            );
            String::new()
        }
        Err(e) => {
            tracing::error!("Failed to run pdftotext on {}: {}", file_path, e);
            String::new()
        }
    }
}

async fn run_libreoffice_to_text(file_path: &str) -> String {
    let temp_dir = std::env::temp_dir().join(format!("doc_totext_{}", uuid::Uuid::new_v4()));
    if let Err(e) = fs::create_dir_all(&temp_dir).await {
        tracing::error!("Failed to create temp dir for conversion: {}", e);
        return String::new();
    }

    let output = Command::new("libreoffice")
        .arg("--headless")
        .arg("--norestore")
        .arg("--convert-to")
        .arg("txt:Text")
        .arg("--outdir")
        .arg(&temp_dir)
        .arg(file_path)
        .output()
        .await;

    let text = match output {
        Ok(out) if out.status.success() => {
            let stem = Path::new(file_path)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("document");
            let converted = temp_dir.join(format!("{}.txt", stem));
            match fs::read(&converted).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    tracing::error!("LibreOffice produced no text output for {}: {}", file_path, e);
                    String::new()
                }
            }
        }
        Ok(out) => {
            tracing::error!(
                "LibreOffice text conversion failed: {}",
                String::from_utf8_lossy(&out.stderr)
            );
            String::new()
        }
        Err(e) => {
            tracing::error!("Failed to run libreoffice: {}", e);
            String::new()
        }
    };

    let _ = fs::remove_dir_all(&temp_dir).await;
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_plain_text_and_applies_budget() {
        let path = std::env::temp_dir().join(format!("extract_{}.txt", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, "  Photosynthesis is a process used by plants.  ")
            .await
            .unwrap();
        let path_str = path.to_str().unwrap();

        assert_eq!(
            extract_text_from_file(path_str).await,
            "Photosynthesis is a process used by plants."
        );
        assert_eq!(extract_text_with_budget(path_str, 14).await, "Photosynthesis");

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_or_missing_files_yield_empty_text() {
        assert_eq!(extract_text_from_file("/nonexistent/file.txt").await, "");
        assert_eq!(extract_text_from_file("/nonexistent/file.bin").await, "");
    }
}
