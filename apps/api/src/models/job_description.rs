use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One category of job-description keywords, as stored and as served by `/jd`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct JobDescriptionRow {
    pub category: String,
    pub data: Vec<String>,
}
