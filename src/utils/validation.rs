use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::path::Path;

pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "docx", "doc", "ppt", "pptx", "txt"];
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "mkv"];

pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

pub fn ensure_non_negative_price(price: Decimal) -> Result<()> {
    if price < Decimal::ZERO {
        return Err(Error::BadRequest("Price cannot be negative.".into()));
    }
    Ok(())
}

pub fn ensure_not_in_past(when: DateTime<Utc>) -> Result<()> {
    if when < Utc::now() {
        return Err(Error::BadRequest("Meeting time cannot be in the past!".into()));
    }
    Ok(())
}

/// Lower-cased extension of `filename` if it is in `allowed`.
pub fn ensure_extension(filename: &str, allowed: &[&str]) -> Result<String> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if !allowed.contains(&ext.as_str()) {
        return Err(Error::BadRequest(format!(
            "Unsupported file extension. Allowed: {}",
            allowed.join(", ")
        )));
    }
    Ok(ext)
}

pub fn ensure_max_size(len: usize, max: usize, label: &str) -> Result<()> {
    if len > max {
        return Err(Error::BadRequest(format!(
            "{} too large ( > {} MB ).",
            label,
            max / (1024 * 1024)
        )));
    }
    Ok(())
}

pub fn ensure_level(level: &str) -> Result<()> {
    match level {
        "Beginner" | "Intermediate" | "Advanced" => Ok(()),
        other => Err(Error::BadRequest(format!("Unknown student level: {}", other))),
    }
}

pub fn ensure_difficulty(level: &str) -> Result<()> {
    match level {
        "Easy" | "Medium" | "Hard" => Ok(()),
        other => Err(Error::BadRequest(format!("Unknown difficulty level: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn rejects_negative_price() {
        assert!(ensure_non_negative_price(Decimal::new(-1, 2)).is_err());
        assert!(ensure_non_negative_price(Decimal::ZERO).is_ok());
        assert!(ensure_non_negative_price(Decimal::new(49900, 2)).is_ok());
    }

    #[test]
    fn extension_allow_list_is_case_insensitive() {
        assert_eq!(ensure_extension("Notes.PDF", DOCUMENT_EXTENSIONS).unwrap(), "pdf");
        assert!(ensure_extension("malware.exe", DOCUMENT_EXTENSIONS).is_err());
        assert!(ensure_extension("noext", DOCUMENT_EXTENSIONS).is_err());
    }

    #[test]
    fn live_class_time_must_be_future() {
        assert!(ensure_not_in_past(Utc::now() - Duration::minutes(5)).is_err());
        assert!(ensure_not_in_past(Utc::now() + Duration::hours(1)).is_ok());
    }

    #[test]
    fn size_limit() {
        assert!(ensure_max_size(MAX_IMAGE_BYTES, MAX_IMAGE_BYTES, "Image").is_ok());
        assert!(ensure_max_size(MAX_IMAGE_BYTES + 1, MAX_IMAGE_BYTES, "Image").is_err());
    }
}
