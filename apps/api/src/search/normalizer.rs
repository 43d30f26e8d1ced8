//! Normalizer: maps a source's `RawListing` onto the canonical `JobListing`.
//!
//! Pure: no I/O. Every field absent from the raw data falls back to what the
//! profile implies, then to `NOT_SPECIFIED`.

use crate::models::listing::{JobListing, RawListing, NOT_SPECIFIED};
use crate::models::profile::CandidateProfile;

pub fn normalize(raw: RawListing, profile: &CandidateProfile) -> JobListing {
    let job_nature = infer_job_nature(&raw.job_types, profile.job_nature());

    JobListing {
        job_title: or_sentinel(raw.title, None),
        company: or_sentinel(raw.company, None),
        experience: or_sentinel(raw.experience, Some(profile.experience.as_str())),
        job_nature,
        location: or_sentinel(raw.location, None),
        salary: or_sentinel(raw.salary, profile.salary()),
        apply_link: raw.apply_link,
        source: raw.source,
    }
}

/// Precedence: remote > hybrid > onsite > first tag > requested > sentinel.
pub fn infer_job_nature(tags: &[String], requested: Option<&str>) -> String {
    let lowered: Vec<String> = tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    let has = |needles: &[&str]| {
        lowered
            .iter()
            .any(|tag| needles.iter().any(|needle| tag.contains(needle)))
    };

    if has(&["remote"]) {
        return "Remote".to_string();
    }
    if has(&["hybrid"]) {
        return "Hybrid".to_string();
    }
    if has(&["onsite", "on-site", "on site"]) {
        return "Onsite".to_string();
    }
    if let Some(first) = tags.iter().map(|t| t.trim()).find(|t| !t.is_empty()) {
        return first.to_string();
    }

    requested
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(NOT_SPECIFIED)
        .to_string()
}

fn or_sentinel(value: Option<String>, fallback: Option<&str>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            fallback
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| NOT_SPECIFIED.to_string())
}
