use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::DEFAULT_MODEL;
use crate::models::listing::JobSource;
use crate::search::classifier::ClassifierConfig;
use crate::sources::indeed::DEFAULT_ACTOR_ID;
use crate::sources::{AdapterConfig, RetryPolicy};

/// Which sources to query and how hard to hit them.
#[derive(Debug, Clone)]
pub struct SourcesConfig {
    /// Declaration order; also the order of the merged pool.
    pub sources: Vec<JobSource>,
    pub apify_api_token: Option<String>,
    pub indeed_actor_id: String,
    pub adapter: AdapterConfig,
    pub request_timeout: Duration,
    pub adapter_timeout: Duration,
}

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub llm_model: String,
    pub port: u16,
    pub rust_log: String,
    pub sources: SourcesConfig,
    pub classifier: ClassifierConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = Env(lookup);

        let sources = SourcesConfig {
            sources: parse_sources(&env.string("JOB_SOURCES", "linkedin,glassdoor"))?,
            apify_api_token: env.optional("APIFY_API_TOKEN"),
            indeed_actor_id: env.string("INDEED_ACTOR_ID", DEFAULT_ACTOR_ID),
            adapter: AdapterConfig {
                max_listings: env.parse("SOURCE_MAX_LISTINGS", 10)?,
                max_pages: env.parse("SOURCE_MAX_PAGES", 3)?,
                page_delay_min: Duration::from_millis(env.parse("PAGE_DELAY_MIN_MS", 2000)?),
                page_delay_max: Duration::from_millis(env.parse("PAGE_DELAY_MAX_MS", 5000)?),
                retry: RetryPolicy {
                    max_retries: env.parse("FETCH_MAX_RETRIES", 3)?,
                    base_delay: Duration::from_millis(env.parse("FETCH_BACKOFF_BASE_MS", 500)?),
                },
            },
            request_timeout: Duration::from_secs(env.parse("REQUEST_TIMEOUT_SECS", 30)?),
            adapter_timeout: Duration::from_secs(env.parse("ADAPTER_TIMEOUT_SECS", 90)?),
        };

        let classifier = ClassifierConfig {
            trivial_accept_max: env.parse("RELEVANCE_TRIVIAL_MAX", 5)?,
            min_keep: env.parse("RELEVANCE_MIN_KEEP", 3)?,
            min_selection: env.parse("RELEVANCE_MIN_SELECTION", 3)?,
            location_bonus: env.parse("RELEVANCE_LOCATION_BONUS", 2)?,
            scoring_timeout: Duration::from_secs(env.parse("SCORING_TIMEOUT_SECS", 60)?),
        };

        Ok(Config {
            anthropic_api_key: env.require("ANTHROPIC_API_KEY")?,
            llm_model: env.string("LLM_MODEL", DEFAULT_MODEL),
            port: env.parse("PORT", 8000)?,
            rust_log: env.string("RUST_LOG", "info"),
            sources,
            classifier,
        })
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn require(&self, key: &str) -> Result<String> {
        self.optional(key)
            .with_context(|| format!("Required environment variable '{key}' is not set"))
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.optional(key) {
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
            None => Ok(default),
        }
    }
}

fn parse_sources(raw: &str) -> Result<Vec<JobSource>> {
    let mut sources = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let source = name
            .parse::<JobSource>()
            .map_err(|e| anyhow::anyhow!("JOB_SOURCES: {e}"))?;
        if !sources.contains(&source) {
            sources.push(source);
        }
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("ANTHROPIC_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.llm_model, DEFAULT_MODEL);
        assert_eq!(config.sources.sources, vec![JobSource::LinkedIn, JobSource::Glassdoor]);
        assert!(config.sources.apify_api_token.is_none());
        assert_eq!(config.sources.adapter, AdapterConfig::default());
        assert_eq!(config.classifier, ClassifierConfig::default());
    }

    #[test]
    fn test_missing_api_key_fails() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("JOB_SOURCES", "indeed, LinkedIn, indeed"),
            ("APIFY_API_TOKEN", "apify-token"),
            ("SOURCE_MAX_LISTINGS", "25"),
            ("RELEVANCE_TRIVIAL_MAX", "3"),
            ("PAGE_DELAY_MIN_MS", "0"),
        ])
        .unwrap();
        assert_eq!(config.sources.sources, vec![JobSource::Indeed, JobSource::LinkedIn]);
        assert_eq!(config.sources.apify_api_token.as_deref(), Some("apify-token"));
        assert_eq!(config.sources.adapter.max_listings, 25);
        assert_eq!(config.sources.adapter.page_delay_min, Duration::ZERO);
        assert_eq!(config.classifier.trivial_accept_max, 3);
    }

    #[test]
    fn test_invalid_values_fail() {
        let err = load(&[("ANTHROPIC_API_KEY", "k"), ("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        let err = load(&[("ANTHROPIC_API_KEY", "k"), ("JOB_SOURCES", "linkedin,monster")]).unwrap_err();
        assert!(err.to_string().contains("monster"));
    }
}
