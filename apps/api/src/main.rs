mod config;
mod db;
mod errors;
mod jd;
mod llm_client;
mod models;
mod ranking;
mod resumes;
mod routes;
mod screening;
mod state;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, S3Config};
use crate::db::{create_pool, ensure_schema};
use crate::jd::extract::TagExtractor;
use crate::jd::tags::{CategoryTagStore, InMemoryTagStore, PgTagStore};
use crate::llm_client::retry::RetryPolicy;
use crate::llm_client::{CompletionModel, LlmClient, LlmSettings};
use crate::ranking::embedding::{EmbeddingScorer, FastEmbedder};
use crate::ranking::keyword::KeywordScorer;
use crate::ranking::orchestrator::{RankOptions, RankingOrchestrator};
use crate::ranking::weights::WeightConfig;
use crate::resumes::extract::{DocumentExtractor, TextExtractor};
use crate::resumes::store::{DocumentStore, LocalDocumentStore, S3DocumentStore};
use crate::resumes::StoredResumeText;
use crate::routes::build_router;
use crate::screening::fitness::LlmFitnessGate;
use crate::screening::summarize::{Summarizer, SummarizerSettings};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on unparsable env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume ranker v{}", env!("CARGO_PKG_VERSION"));

    // Category tag store: PostgreSQL when configured, otherwise process memory
    let tags: Arc<dyn CategoryTagStore> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            ensure_schema(&pool).await?;
            Arc::new(PgTagStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set; job-description tags will not survive a restart");
            Arc::new(InMemoryTagStore::new())
        }
    };

    // Document stores: S3 / MinIO when configured, otherwise local directories
    let (resumes, job_documents): (Arc<dyn DocumentStore>, Arc<dyn DocumentStore>) =
        match &config.s3 {
            Some(s3) => {
                let client = build_s3_client(s3).await;
                info!("S3 client initialized (bucket: {})", s3.bucket);
                (
                    Arc::new(S3DocumentStore::new(client.clone(), &s3.bucket, "resumes")),
                    Arc::new(S3DocumentStore::new(client, &s3.bucket, "job_descriptions")),
                )
            }
            None => (
                Arc::new(LocalDocumentStore::open(&config.resume_dir).await?),
                Arc::new(LocalDocumentStore::open(&config.jd_dir).await?),
            ),
        };

    // Initialize LLM client
    let llm = LlmClient::new(LlmSettings {
        base_url: config.llm_base_url.clone(),
        api_key: config.llm_api_key.clone(),
        primary_model: config.llm_model.clone(),
        fast_model: config.llm_fast_model.clone(),
        max_concurrency: config.llm_max_concurrency,
    })?;
    info!(
        "LLM client initialized (endpoint: {}, model: {}, fast model: {})",
        config.llm_base_url, config.llm_model, config.llm_fast_model
    );
    let model: Arc<dyn CompletionModel> = Arc::new(llm);
    let retry = RetryPolicy::new(config.llm_max_attempts, config.llm_retry_delay);

    // Embedding model (downloaded on first start)
    let embedder = tokio::task::spawn_blocking(FastEmbedder::load).await??;
    info!("Embedding model loaded (all-MiniLM-L6-v2)");

    let extractor: Arc<dyn TextExtractor> = Arc::new(DocumentExtractor::default());
    let gate = LlmFitnessGate::new(
        model.clone(),
        Summarizer::new(model.clone(), retry, SummarizerSettings::default()),
        retry,
    );
    let ranker = RankingOrchestrator::new(
        Arc::new(StoredResumeText::new(resumes.clone(), extractor.clone())),
        tags.clone(),
        Arc::new(gate),
        Arc::new(KeywordScorer),
        Arc::new(EmbeddingScorer::new(Arc::new(embedder))),
    )
    .with_options(RankOptions {
        concurrency: config.rank_concurrency,
        deadline: config.rank_timeout,
    });

    let weights = WeightConfig::new(&config.weights_path);
    info!("Category weights file: {}", weights.path().display());

    // Build app state
    let state = AppState {
        weights,
        config: config.clone(),
        resumes,
        job_documents,
        extractor,
        tags,
        tag_extractor: Arc::new(TagExtractor::new(model, retry)),
        ranker,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("Could not install Ctrl-C handler; shutting down");
    }
    info!("Shutdown signal received");
}

/// Constructs an S3 client configured for MinIO (custom endpoint) or AWS.
async fn build_s3_client(s3: &S3Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &s3.access_key_id,
        &s3.secret_access_key,
        None,
        None,
        "resume-ranker-static",
    );

    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(s3.region.clone()))
        .credentials_provider(credentials);
    if let Some(endpoint) = &s3.endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let shared = loader.load().await;

    // MinIO serves buckets by path, not by virtual host.
    let s3_config = aws_sdk_s3::config::Builder::from(&shared)
        .force_path_style(s3.endpoint.is_some())
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}
