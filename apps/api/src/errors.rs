use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::jd::tags::TagStoreError;
use crate::ranking::orchestrator::RankError;
use crate::ranking::weights::WeightsError;
use crate::ranking::InvalidCriteria;
use crate::resumes::extract::ExtractionError;
use crate::resumes::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<TagStoreError> for AppError {
    fn from(e: TagStoreError) -> Self {
        match e {
            TagStoreError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidName(_) => AppError::Validation(e.to_string()),
            StoreError::NotFound(_) => AppError::NotFound(e.to_string()),
            StoreError::Io(_) | StoreError::S3(_) => AppError::Storage(e.to_string()),
        }
    }
}

impl From<ExtractionError> for AppError {
    fn from(e: ExtractionError) -> Self {
        match e {
            ExtractionError::UnsupportedFormat(_) => AppError::Validation(e.to_string()),
            _ => AppError::UnprocessableEntity(e.to_string()),
        }
    }
}

impl From<WeightsError> for AppError {
    fn from(e: WeightsError) -> Self {
        match e {
            WeightsError::Io(_) => AppError::Storage(e.to_string()),
            _ => AppError::Validation(e.to_string()),
        }
    }
}

impl From<InvalidCriteria> for AppError {
    fn from(e: InvalidCriteria) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<RankError> for AppError {
    fn from(e: RankError) -> Self {
        match e {
            RankError::EmptyBatch => AppError::NotFound(e.to_string()),
            RankError::TagStore(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_batch_maps_to_not_found() {
        let err: AppError = RankError::EmptyBatch.into();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "No resumes uploaded"));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_input_maps_to_bad_request() {
        let cases: Vec<AppError> = vec![
            InvalidCriteria("median".into()).into(),
            WeightsError::UnknownCategory("hobbies".into()).into(),
            StoreError::InvalidName("../x".into()).into(),
            ExtractionError::UnsupportedFormat(".png".into()).into(),
        ];
        for err in cases {
            assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_extraction_failure_maps_to_unprocessable() {
        let err: AppError = ExtractionError::ToolMissing("soffice").into();
        assert_eq!(
            err.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
