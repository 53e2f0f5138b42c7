use axum::extract::Multipart;
use bytes::Bytes;
use tracing::debug;

use crate::errors::AppError;
use crate::resumes::extract::ensure_supported;
use crate::resumes::store::validate_name;

/// One file taken from a multipart upload.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Collects every file sent under `field`. The whole upload is rejected before anything
/// is stored if any file has an unsafe name or an unsupported extension.
pub async fn read_files(mut multipart: Multipart, field: &str) -> Result<Vec<UploadedFile>, AppError> {
    let mut files = Vec::new();
    while let Some(part) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        if part.name() != Some(field) {
            debug!("Ignoring multipart field {:?}", part.name());
            continue;
        }
        let file_name = part
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation(format!("'{field}' part has no file name")))?;
        validate_name(&file_name)?;
        ensure_supported(&file_name)?;

        let bytes = part
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        files.push(UploadedFile { file_name, bytes });
    }

    if files.is_empty() {
        return Err(AppError::Validation(format!(
            "No files uploaded under '{field}'"
        )));
    }
    Ok(files)
}
