mod config;
mod errors;
mod llm_client;
mod models;
mod routes;
mod search;
mod sources;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::errors::handle_panic;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::search::classifier::{LlmRelevanceScorer, RelevanceClassifier};
use crate::search::service::JobSearchService;
use crate::sources::http::HttpFetcher;
use crate::sources::build_adapters;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Job Finder API v{}", env!("CARGO_PKG_VERSION"));

    // Source adapters share one HTTP client
    let fetcher = Arc::new(HttpFetcher::new(config.sources.request_timeout)?);
    let adapters = build_adapters(&config.sources, fetcher);
    let names: Vec<&str> = adapters.iter().map(|a| a.source().as_str()).collect();
    info!("Job sources enabled: {}", names.join(", "));

    // Scorer
    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        config.llm_model.clone(),
        config.classifier.scoring_timeout,
    )?;
    info!("LLM client initialized (model: {})", llm.model());

    let classifier = RelevanceClassifier::new(
        Arc::new(LlmRelevanceScorer(llm)),
        config.classifier.clone(),
    );
    let search = JobSearchService::new(adapters, classifier, config.sources.adapter_timeout);

    // Shared state
    let state = AppState {
        search: Arc::new(search),
    };

    // Router
    let app = build_router(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
