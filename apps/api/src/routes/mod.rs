pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::search::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .route("/search-jobs", post(handlers::handle_search_jobs))
        .with_state(state)
}
