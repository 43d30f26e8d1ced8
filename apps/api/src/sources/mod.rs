//! Source adapters: one per listing site, all behind the `SourceAdapter` trait.
//!
//! Each site contributes only a `ListingSource`: how to address page N and how
//! to turn one page body into raw listings. Pagination, politeness delays and
//! retries live once in `PagedAdapter`, and transport is the `PageFetcher` seam
//! so parsers and paging are testable against fixtures.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use scraper::{ElementRef, Selector};
use thiserror::Error;
use tracing::warn;

use crate::config::SourcesConfig;
use crate::models::listing::{JobSource, RawListing};
use crate::models::profile::CandidateProfile;

pub mod glassdoor;
pub mod http;
pub mod indeed;
pub mod linkedin;
pub mod paging;

pub use paging::PagedAdapter;

use glassdoor::GlassdoorSource;
use indeed::IndeedSource;
use linkedin::LinkedInSource;

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Network/HTTP failure while fetching one source page.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Only rate limiting, server errors and connection failures are retried.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Connection(_) => true,
            TransportError::Status { status, .. } => *status == 429 || *status >= 500,
            TransportError::Timeout(_) | TransportError::Request(_) => false,
        }
    }
}

/// One listing card could not be turned into a `RawListing`. The card is skipped.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("unresolvable link: {0}")]
    InvalidLink(String),

    #[error("malformed item: {0}")]
    Malformed(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Seams
// ────────────────────────────────────────────────────────────────────────────

/// A single page fetch. `body` switches the request from GET to a JSON POST.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub url: String,
    pub body: Option<serde_json::Value>,
}

impl PageRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            url: url.into(),
            body: Some(body),
        }
    }
}

/// Transport used by `PagedAdapter`. Production: `http::HttpFetcher`.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<String, TransportError>;
}

/// Site-specific knowledge: addressing pages and extracting listing cards.
pub trait ListingSource: Send + Sync {
    fn source(&self) -> JobSource;

    /// Request for the 1-based `page` of results for `profile`.
    fn page_request(&self, profile: &CandidateProfile, page: u32) -> PageRequest;

    /// Turns one page body into zero or more raw listings. Never fails as a
    /// whole: cards that cannot be extracted are skipped.
    fn parse_page(&self, body: &str) -> Vec<RawListing>;
}

/// The capability the aggregator consumes.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> JobSource;

    async fn fetch(&self, profile: &CandidateProfile) -> anyhow::Result<Vec<RawListing>>;
}

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Exponential backoff: base, 2×base, 4×base, …
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdapterConfig {
    pub max_listings: usize,
    pub max_pages: u32,
    pub page_delay_min: Duration,
    pub page_delay_max: Duration,
    pub retry: RetryPolicy,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            max_listings: 10,
            max_pages: 3,
            page_delay_min: Duration::from_secs(2),
            page_delay_max: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Factory
// ────────────────────────────────────────────────────────────────────────────

/// Builds one adapter per configured source, in configuration order.
/// Indeed is skipped when no Apify token is configured.
pub fn build_adapters(
    config: &SourcesConfig,
    fetcher: Arc<dyn PageFetcher>,
) -> Vec<Arc<dyn SourceAdapter>> {
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();

    for source in &config.sources {
        let adapter_config = config.adapter.clone();
        match source {
            JobSource::LinkedIn => adapters.push(Arc::new(PagedAdapter::new(
                LinkedInSource,
                Arc::clone(&fetcher),
                adapter_config,
            ))),
            JobSource::Glassdoor => adapters.push(Arc::new(PagedAdapter::new(
                GlassdoorSource,
                Arc::clone(&fetcher),
                adapter_config,
            ))),
            JobSource::Indeed => {
                let Some(token) = config.apify_api_token.clone() else {
                    warn!("Indeed requested but APIFY_API_TOKEN is not set; skipping");
                    continue;
                };
                let indeed = IndeedSource::new(
                    token,
                    config.indeed_actor_id.clone(),
                    adapter_config.max_listings,
                );
                adapters.push(Arc::new(PagedAdapter::new(
                    indeed,
                    Arc::clone(&fetcher),
                    AdapterConfig {
                        max_pages: 1,
                        ..adapter_config
                    },
                )));
            }
        }
    }

    adapters
}

// ────────────────────────────────────────────────────────────────────────────
// Shared extraction helpers
// ────────────────────────────────────────────────────────────────────────────

/// Collapses all runs of whitespace into single spaces.
pub(crate) fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace-normalized text of the first element matching `selector`, if non-empty.
pub(crate) fn select_text(card: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    card.select(selector)
        .next()
        .map(|el| clean_text(&el.text().collect::<Vec<_>>().join(" ")))
        .filter(|text| !text.is_empty())
}

pub(crate) fn css(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::error!("Invalid CSS selector '{selector}': {e}");
            None
        }
    }
}

/// Resolves `href` against `origin` into an absolute http(s) URL.
pub(crate) fn resolve_link(origin: &str, href: &str) -> Result<String, ExtractionError> {
    let href = href.trim();
    if href.is_empty() {
        return Err(ExtractionError::InvalidLink(String::new()));
    }

    let base = Url::parse(origin).map_err(|e| ExtractionError::InvalidLink(e.to_string()))?;
    let url = base
        .join(href)
        .map_err(|_| ExtractionError::InvalidLink(href.to_string()))?;

    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        _ => Err(ExtractionError::InvalidLink(href.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let status = |status| TransportError::Status {
            status,
            url: "https://example.com".to_string(),
        };
        assert!(status(429).is_transient());
        assert!(status(503).is_transient());
        assert!(!status(404).is_transient());
        assert!(TransportError::Connection("refused".to_string()).is_transient());
        assert!(!TransportError::Timeout("30s".to_string()).is_transient());
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
    }

    #[test]
    fn test_resolve_link_handles_relative_and_rejects_other_schemes() {
        assert_eq!(
            resolve_link("https://www.glassdoor.com", "/job-listing/abc?jl=1").unwrap(),
            "https://www.glassdoor.com/job-listing/abc?jl=1"
        );
        assert_eq!(
            resolve_link("https://www.glassdoor.com", "https://other.example/x").unwrap(),
            "https://other.example/x"
        );
        assert!(resolve_link("https://www.glassdoor.com", "javascript:void(0)").is_err());
        assert!(resolve_link("https://www.glassdoor.com", "   ").is_err());
    }

    struct NoFetch;

    #[async_trait]
    impl PageFetcher for NoFetch {
        async fn fetch_page(&self, _request: &PageRequest) -> Result<String, TransportError> {
            Ok(String::new())
        }
    }

    fn sources_config(sources: Vec<JobSource>, token: Option<&str>) -> SourcesConfig {
        SourcesConfig {
            sources,
            apify_api_token: token.map(str::to_string),
            indeed_actor_id: indeed::DEFAULT_ACTOR_ID.to_string(),
            adapter: AdapterConfig::default(),
            request_timeout: Duration::from_secs(30),
            adapter_timeout: Duration::from_secs(90),
        }
    }

    #[test]
    fn test_build_adapters_keeps_declaration_order() {
        let config = sources_config(
            vec![JobSource::Glassdoor, JobSource::Indeed, JobSource::LinkedIn],
            Some("token"),
        );
        let adapters = build_adapters(&config, Arc::new(NoFetch));
        let order: Vec<JobSource> = adapters.iter().map(|a| a.source()).collect();
        assert_eq!(order, vec![JobSource::Glassdoor, JobSource::Indeed, JobSource::LinkedIn]);
    }

    #[test]
    fn test_build_adapters_skips_indeed_without_token() {
        let config = sources_config(vec![JobSource::Indeed, JobSource::LinkedIn], None);
        let adapters = build_adapters(&config, Arc::new(NoFetch));
        assert_eq!(adapters.len(), 1);
        assert_eq!(adapters[0].source(), JobSource::LinkedIn);
    }

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Senior\n   Rust \t Engineer "), "Senior Rust Engineer");
    }
}
