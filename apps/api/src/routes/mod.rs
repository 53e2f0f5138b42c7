pub mod health;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::jd::handlers as jd;
use crate::ranking::handlers as ranking;
use crate::resumes::handlers as resumes;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(health::home_handler))
        .route("/health", get(health::health_handler))
        // Resumes
        .route(
            "/resumes",
            post(resumes::handle_upload_resumes).delete(resumes::handle_delete_resumes),
        )
        .route("/resumes/all", delete(resumes::handle_delete_all_resumes))
        .route("/resumes/scores", get(ranking::handle_get_scores))
        // Job descriptions
        .route(
            "/jd",
            post(jd::handle_upload_jd)
                .put(jd::handle_replace_category)
                .delete(jd::handle_delete_category),
        )
        .route(
            "/jd/all",
            get(jd::handle_get_all_categories).delete(jd::handle_delete_all_categories),
        )
        .route(
            "/jd/sub",
            post(jd::handle_append_tags).delete(jd::handle_remove_tags),
        )
        .route("/jd/:category", get(jd::handle_get_category))
        // Weights
        .route(
            "/weights",
            get(ranking::handle_get_weights).post(ranking::handle_set_weights),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
