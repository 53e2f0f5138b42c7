use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::errors::AppError;
use crate::models::job_description::JobDescriptionRow;
use crate::routes::upload::read_files;
use crate::state::AppState;

const CATEGORY_NOT_FOUND: &str = "Category not found!";

fn category_not_found() -> AppError {
    AppError::NotFound(CATEGORY_NOT_FOUND.to_string())
}

fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}

#[derive(Serialize)]
pub struct IngestedFile {
    pub file: String,
    pub tags: usize,
}

#[derive(Serialize)]
pub struct UploadJdResponse {
    pub message: &'static str,
    pub files: Vec<IngestedFile>,
}

/// POST /jd
/// Stores each file, extracts its text and merges the model-extracted tags.
pub async fn handle_upload_jd(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadJdResponse>, AppError> {
    let files = read_files(multipart, "jd_files").await?;

    let mut ingested = Vec::with_capacity(files.len());
    for file in files {
        state
            .job_documents
            .put(&file.file_name, file.bytes.clone())
            .await?;
        let text = state.extractor.extract(&file.file_name, file.bytes).await?;
        let tags = state.tag_extractor.ingest(state.tags.as_ref(), &text).await?;
        info!("Tagged {} ({} tags)", file.file_name, tags.len());
        ingested.push(IngestedFile {
            file: file.file_name,
            tags: tags.len(),
        });
    }

    Ok(Json(UploadJdResponse {
        message: "Job Descriptions uploaded successfully!",
        files: ingested,
    }))
}

/// PUT /jd
pub async fn handle_replace_category(
    State(state): State<AppState>,
    Json(req): Json<JobDescriptionRow>,
) -> Result<Json<Value>, AppError> {
    if !state.tags.replace(&req.category, &req.data).await? {
        return Err(category_not_found());
    }
    Ok(message("Job description updated successfully!"))
}

#[derive(Deserialize)]
pub struct CategoryQuery {
    pub category: String,
}

/// DELETE /jd?category=
pub async fn handle_delete_category(
    State(state): State<AppState>,
    Query(params): Query<CategoryQuery>,
) -> Result<Json<Value>, AppError> {
    if !state.tags.delete(&params.category).await? {
        return Err(category_not_found());
    }
    Ok(message("Job description deleted successfully!"))
}

#[derive(Serialize)]
pub struct AllCategoriesResponse {
    pub job_descriptions: Vec<JobDescriptionRow>,
}

/// GET /jd/all
pub async fn handle_get_all_categories(
    State(state): State<AppState>,
) -> Result<Json<AllCategoriesResponse>, AppError> {
    let job_descriptions = state
        .tags
        .get_all()
        .await?
        .into_iter()
        .map(|(category, data)| JobDescriptionRow { category, data })
        .collect();
    Ok(Json(AllCategoriesResponse { job_descriptions }))
}

/// DELETE /jd/all
pub async fn handle_delete_all_categories(
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    state.tags.delete_all().await?;
    Ok(message("All job descriptions deleted successfully!"))
}

#[derive(Deserialize)]
pub struct TagsRequest {
    pub category: String,
    pub jds: Vec<String>,
}

/// POST /jd/sub
pub async fn handle_append_tags(
    State(state): State<AppState>,
    Json(req): Json<TagsRequest>,
) -> Result<Json<Value>, AppError> {
    if !state.tags.append(&req.category, &req.jds).await? {
        return Err(category_not_found());
    }
    Ok(message("Job Descriptions appended successfully!"))
}

/// DELETE /jd/sub
pub async fn handle_remove_tags(
    State(state): State<AppState>,
    Json(req): Json<TagsRequest>,
) -> Result<Json<Value>, AppError> {
    if !state.tags.remove(&req.category, &req.jds).await? {
        return Err(category_not_found());
    }
    Ok(message("Job Descriptions removed successfully!"))
}

/// GET /jd/:category
pub async fn handle_get_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<JobDescriptionRow>, AppError> {
    let data = state
        .tags
        .get(&category)
        .await?
        .ok_or_else(category_not_found)?;
    Ok(Json(JobDescriptionRow { category, data }))
}
