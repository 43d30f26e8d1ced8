//! Relevance classifier: decides which pooled listings fit the profile.
//!
//! Three steps, always terminating without an error:
//! 1. Trivial accept: pools of at most `trivial_accept_max` come back unchanged.
//! 2. Scored tier: one LLM round-trip returning a JSON array of 1-based indices.
//!    Extraction is best-effort; any failure falls through to step 3.
//! 3. Keyword fallback: deterministic ranking, keeps `max(min_keep, ceil(N/2))`.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{LlmClient, LlmError};
use crate::models::listing::{JobListing, NOT_SPECIFIED};
use crate::models::profile::CandidateProfile;
use crate::search::prompts::{RELEVANCE_PROMPT_TEMPLATE, RELEVANCE_SYSTEM};

// ────────────────────────────────────────────────────────────────────────────
// Scoring capability
// ────────────────────────────────────────────────────────────────────────────

/// Text in, text out. The hosted model behind the scored tier.
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    async fn score_jobs(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Production scorer over the shared `LlmClient`.
pub struct LlmRelevanceScorer(pub LlmClient);

#[async_trait]
impl RelevanceScorer for LlmRelevanceScorer {
    async fn score_jobs(&self, prompt: &str) -> Result<String, LlmError> {
        let system = format!("{RELEVANCE_SYSTEM} {JSON_ONLY_SYSTEM}");
        self.0.call_text(prompt, &system).await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Configuration and outputs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    pub trivial_accept_max: usize,
    /// Floor of the fallback keep count.
    pub min_keep: usize,
    /// "Select at least" count given to the model.
    pub min_selection: usize,
    pub location_bonus: usize,
    pub scoring_timeout: Duration,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            trivial_accept_max: 5,
            min_keep: 3,
            min_selection: 3,
            location_bonus: 2,
            scoring_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    TrivialAccept,
    Scored,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Classification {
    pub tier: Tier,
    pub jobs: Vec<JobListing>,
}

/// Why the scored tier was abandoned. Logged, never returned to callers.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("scoring call failed: {0}")]
    Scorer(#[from] LlmError),

    #[error("scoring call timed out after {0:?}")]
    Timeout(Duration),

    #[error("response contains no bracketed array")]
    NoArray,

    #[error("response array is malformed: {0}")]
    Malformed(String),

    #[error("response contains no valid listing index")]
    NoValidIndices,
}

// ────────────────────────────────────────────────────────────────────────────
// Classifier
// ────────────────────────────────────────────────────────────────────────────

pub struct RelevanceClassifier {
    scorer: Arc<dyn RelevanceScorer>,
    config: ClassifierConfig,
}

impl RelevanceClassifier {
    pub fn new(scorer: Arc<dyn RelevanceScorer>, config: ClassifierConfig) -> Self {
        Self { scorer, config }
    }

    pub async fn classify(&self, profile: &CandidateProfile, pool: Vec<JobListing>) -> Classification {
        let total = pool.len();

        if total <= self.config.trivial_accept_max {
            info!("Pool of {total} listings accepted without ranking");
            return Classification {
                tier: Tier::TrivialAccept,
                jobs: pool,
            };
        }

        match self.scored_indices(profile, &pool).await {
            Ok(indices) => {
                let jobs: Vec<JobListing> = pool
                    .into_iter()
                    .enumerate()
                    .filter(|(i, _)| indices.contains(&(i + 1)))
                    .map(|(_, job)| job)
                    .collect();
                info!("Scored tier kept {} of {total} listings", jobs.len());
                Classification {
                    tier: Tier::Scored,
                    jobs,
                }
            }
            Err(e) => {
                warn!("Relevance scoring unavailable, using keyword fallback: {e}");
                let jobs = keyword_fallback(profile, pool, &self.config);
                info!("Keyword fallback kept {} of {total} listings", jobs.len());
                Classification {
                    tier: Tier::Fallback,
                    jobs,
                }
            }
        }
    }

    async fn scored_indices(
        &self,
        profile: &CandidateProfile,
        pool: &[JobListing],
    ) -> Result<BTreeSet<usize>, ClassificationError> {
        let min_count = self.config.min_selection.min(pool.len());
        let prompt = build_prompt(profile, pool, min_count);

        let timeout = self.config.scoring_timeout;
        let text = tokio::time::timeout(timeout, self.scorer.score_jobs(&prompt))
            .await
            .map_err(|_| ClassificationError::Timeout(timeout))??;

        let entries = extract_index_array(&text)?;
        let indices = valid_indices(&entries, pool.len());
        if indices.is_empty() {
            return Err(ClassificationError::NoValidIndices);
        }
        Ok(indices)
    }
}

fn build_prompt(profile: &CandidateProfile, pool: &[JobListing], min_count: usize) -> String {
    let listings = pool
        .iter()
        .enumerate()
        .map(|(i, job)| {
            format!(
                "{}. {} | {} | {} | {} | experience: {} | salary: {}",
                i + 1,
                job.job_title,
                job.company,
                job.location,
                job.job_nature,
                job.experience,
                job.salary
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let min_count = min_count.to_string();
    let count = pool.len().to_string();
    fill_template(
        RELEVANCE_PROMPT_TEMPLATE,
        &[
            ("position", &profile.position),
            ("experience", &profile.experience),
            ("skills", &profile.skills),
            ("salary", profile.salary().unwrap_or(NOT_SPECIFIED)),
            ("job_nature", profile.job_nature().unwrap_or(NOT_SPECIFIED)),
            ("location", profile.location().unwrap_or(NOT_SPECIFIED)),
            ("min_count", &min_count),
            ("count", &count),
            ("listings", &listings),
        ],
    )
}

/// Substitutes `{name}` placeholders in a single pass over `template`.
/// Substituted text is never rescanned; unknown `{...}` spans are kept as-is.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Best-effort extraction
// ────────────────────────────────────────────────────────────────────────────

/// Finds the first `[ … ]` substring (brackets balanced) that parses as a JSON
/// array. Surrounding commentary and code fences are ignored.
pub fn extract_index_array(text: &str) -> Result<Vec<Value>, ClassificationError> {
    let mut last_error = None;

    for (start, _) in text.match_indices('[') {
        let Some(end) = matching_bracket(&text[start..]) else {
            continue;
        };
        match serde_json::from_str::<Vec<Value>>(&text[start..start + end + 1]) {
            Ok(entries) => return Ok(entries),
            Err(e) => last_error = Some(e.to_string()),
        }
    }

    Err(match last_error {
        Some(e) => ClassificationError::Malformed(e),
        None => ClassificationError::NoArray,
    })
}

/// Byte offset of the `]` closing the `[` at the start of `text`. Brackets
/// inside JSON string literals do not count.
fn matching_bracket(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Keeps integer entries within `[1, total]`; everything else is dropped.
pub fn valid_indices(entries: &[Value], total: usize) -> BTreeSet<usize> {
    entries
        .iter()
        .filter_map(Value::as_u64)
        .filter_map(|i| usize::try_from(i).ok())
        .filter(|i| (1..=total).contains(i))
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Deterministic fallback
// ────────────────────────────────────────────────────────────────────────────

/// Ranks by keyword hits (plus location bonus) and keeps the top slice.
/// Ties keep pool order.
pub fn keyword_fallback(
    profile: &CandidateProfile,
    pool: Vec<JobListing>,
    config: &ClassifierConfig,
) -> Vec<JobListing> {
    let keep = fallback_keep_count(pool.len(), config.min_keep);
    let keywords = build_keywords(profile);
    let location = profile.location().map(str::to_lowercase);

    let mut scored: Vec<(usize, JobListing)> = pool
        .into_iter()
        .map(|job| {
            let score = score_listing(&job, &keywords, location.as_deref(), config.location_bonus);
            (score, job)
        })
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(keep).map(|(_, job)| job).collect()
}

/// `min(total, max(min_keep, ceil(total / 2)))`
pub fn fallback_keep_count(total: usize, min_keep: usize) -> usize {
    min_keep.max(total.div_ceil(2)).min(total)
}

/// Position and skill terms, lowercased, split on whitespace and commas.
/// Terms of two characters or fewer are dropped.
pub fn build_keywords(profile: &CandidateProfile) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    let text = format!("{} {}", profile.position, profile.skills).to_lowercase();

    for term in text.split(|c: char| c.is_whitespace() || c == ',') {
        if term.chars().count() > 2 && !keywords.iter().any(|k| k == term) {
            keywords.push(term.to_string());
        }
    }
    keywords
}

pub fn score_listing(
    job: &JobListing,
    keywords: &[String],
    profile_location: Option<&str>,
    location_bonus: usize,
) -> usize {
    let haystack = format!(
        "{} {} {} {} {}",
        job.job_title, job.company, job.experience, job.job_nature, job.location
    )
    .to_lowercase();

    let hits = keywords.iter().filter(|k| haystack.contains(k.as_str())).count();

    let location_match = profile_location
        .map(|loc| job.location.to_lowercase().contains(loc))
        .unwrap_or(false);

    hits + if location_match { location_bonus } else { 0 }
}
