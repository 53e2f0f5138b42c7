use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// S3 / MinIO settings. Present only when `S3_BUCKET` is set.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Application configuration loaded from environment variables.
/// Start-up fails if a set variable cannot be parsed; everything has a default
/// except the optional backends.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Absent ⇒ job-description tags are kept in memory only.
    pub database_url: Option<String>,
    pub resume_dir: PathBuf,
    pub jd_dir: PathBuf,
    pub weights_path: PathBuf,
    pub s3: Option<S3Config>,
    pub llm_base_url: String,
    pub llm_api_key: String,
    pub llm_model: String,
    pub llm_fast_model: String,
    pub llm_max_concurrency: usize,
    pub llm_max_attempts: u32,
    pub llm_retry_delay: Duration,
    pub rank_concurrency: usize,
    pub rank_timeout: Option<Duration>,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key → value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let s3 = match var("S3_BUCKET") {
            Some(bucket) => Some(S3Config {
                bucket,
                endpoint: var("S3_ENDPOINT"),
                region: or("S3_REGION", "us-east-1"),
                access_key_id: require(&var, "AWS_ACCESS_KEY_ID")?,
                secret_access_key: require(&var, "AWS_SECRET_ACCESS_KEY")?,
            }),
            None => None,
        };

        Ok(Config {
            port: parse_or(&var, "PORT", 8080)?,
            rust_log: or("RUST_LOG", "info"),
            database_url: var("DATABASE_URL"),
            resume_dir: or("RESUME_DIR", "employee_docs").into(),
            jd_dir: or("JD_DIR", "jd_docs").into(),
            weights_path: or("WEIGHTS_PATH", "weights.json").into(),
            s3,
            llm_base_url: or("LLM_BASE_URL", "http://localhost:11434/v1"),
            llm_api_key: or("LLM_API_KEY", "ollama"),
            llm_model: or("LLM_MODEL", "llama3"),
            llm_fast_model: or("LLM_FAST_MODEL", "llama3"),
            llm_max_concurrency: parse_or(&var, "LLM_MAX_CONCURRENCY", 2)?,
            llm_max_attempts: parse_or(&var, "LLM_MAX_ATTEMPTS", 3)?,
            llm_retry_delay: Duration::from_millis(parse_or(&var, "LLM_RETRY_DELAY_MS", 2000)?),
            rank_concurrency: parse_or(&var, "RANK_CONCURRENCY", 4)?,
            rank_timeout: var("RANK_TIMEOUT_SECS")
                .map(|v| v.parse::<u64>().map(Duration::from_secs))
                .transpose()
                .context("RANK_TIMEOUT_SECS must be a whole number of seconds")?,
            max_upload_bytes: parse_or(&var, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }
}

fn require(var: impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_or<T>(var: impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
