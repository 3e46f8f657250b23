use std::path::Path;

use crate::api::errors::ApiError;
use crate::services::uploads::{MediaType, UploadedImage};

/// Checks an uploaded exam sheet: allowed extension, consistent MIME type,
/// size limit and magic bytes.
pub(crate) fn validate_exam_upload(
    filename: &str,
    content_type: Option<&str>,
    bytes: Vec<u8>,
    allowed_extensions: &[String],
    max_bytes: u64,
) -> Result<UploadedImage, ApiError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| ApiError::BadRequest("File must have an extension".to_string()))?;

    let media_type = MediaType::from_extension(&extension)
        .filter(|_| allowed_extensions.iter().any(|allowed| allowed == &extension))
        .ok_or_else(|| {
            ApiError::BadRequest(format!("File extension '{extension}' is not allowed"))
        })?;

    if let Some(mime) = content_type.map(|value| value.trim().to_ascii_lowercase()) {
        if mime != "application/octet-stream" && !media_type.accepts_mime(&mime) {
            return Err(ApiError::BadRequest(format!(
                "MIME type '{mime}' does not match extension '.{extension}'"
            )));
        }
    }

    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }

    if bytes.len() as u64 > max_bytes {
        return Err(ApiError::BadRequest(format!(
            "File exceeds maximum size of {} MB",
            max_bytes / (1024 * 1024)
        )));
    }

    if MediaType::sniff(&bytes) != Some(media_type) {
        return Err(ApiError::BadRequest(format!(
            "File content does not match extension '.{extension}'"
        )));
    }

    Ok(UploadedImage { bytes, media_type, extension })
}
