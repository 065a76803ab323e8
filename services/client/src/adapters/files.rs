//! services/client/src/adapters/files.rs
//!
//! Turns a path on disk into an `UploadFile`. The media type comes from the extension,
//! the way a browser file picker reports it.

use crate::error::CliError;
use researchmate_core::domain::{UploadFile, PDF_MEDIA_TYPE};
use std::path::Path;

pub fn media_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("pdf") => PDF_MEDIA_TYPE,
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

pub async fn load_upload_file(path: &Path) -> Result<UploadFile, CliError> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CliError::InvalidInput(format!("'{}' is not a file path", path.display())))?
        .to_string();
    let bytes = tokio::fs::read(path).await?;
    Ok(UploadFile::new(filename, media_type_for(path), bytes))
}
