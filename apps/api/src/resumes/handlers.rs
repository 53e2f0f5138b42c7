use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::resumes::store::validate_name;
use crate::routes::upload::read_files;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ResumesResponse {
    pub message: &'static str,
    pub files: Vec<String>,
}

/// POST /resumes
pub async fn handle_upload_resumes(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ResumesResponse>, AppError> {
    let files = read_files(multipart, "resumes").await?;

    let mut stored = Vec::with_capacity(files.len());
    for file in files {
        state.resumes.put(&file.file_name, file.bytes).await?;
        stored.push(file.file_name);
    }
    info!("Stored {} resumes", stored.len());

    Ok(Json(ResumesResponse {
        message: "Resumes uploaded successfully!",
        files: stored,
    }))
}

/// DELETE /resumes
/// Deletes every listed resume that exists; 404 names the ones that did not. An invalid
/// name fails the whole request with 400 and nothing is deleted.
pub async fn handle_delete_resumes(
    State(state): State<AppState>,
    Json(names): Json<Vec<String>>,
) -> Result<Json<ResumesResponse>, AppError> {
    // Reject the request before touching the store if any name is invalid.
    for name in &names {
        validate_name(name)?;
    }

    let mut deleted = Vec::new();
    let mut missing = Vec::new();
    for name in names {
        if state.resumes.delete(&name).await? {
            deleted.push(name);
        } else {
            missing.push(name);
        }
    }

    if !missing.is_empty() {
        return Err(AppError::NotFound(format!(
            "Files not found: {}",
            missing.join(", ")
        )));
    }
    Ok(Json(ResumesResponse {
        message: "Resumes deleted successfully!",
        files: deleted,
    }))
}

/// DELETE /resumes/all
pub async fn handle_delete_all_resumes(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = state.resumes.delete_all().await?;
    info!("Deleted all {deleted} resumes");
    Ok(Json(serde_json::json!({
        "message": "All resumes deleted successfully!",
        "deleted": deleted
    })))
}
