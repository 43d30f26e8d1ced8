use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Placeholder used for every canonical field the source did not provide.
pub const NOT_SPECIFIED: &str = "Not specified";

/// The closed set of listing sources the service knows how to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobSource {
    LinkedIn,
    Glassdoor,
    Indeed,
}

impl JobSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobSource::LinkedIn => "LinkedIn",
            JobSource::Glassdoor => "Glassdoor",
            JobSource::Indeed => "Indeed",
        }
    }

    /// Origin used to resolve relative apply links.
    pub fn origin(&self) -> &'static str {
        match self {
            JobSource::LinkedIn => "https://www.linkedin.com",
            JobSource::Glassdoor => "https://www.glassdoor.com",
            JobSource::Indeed => "https://www.indeed.com",
        }
    }
}

impl fmt::Display for JobSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linkedin" => Ok(JobSource::LinkedIn),
            "glassdoor" => Ok(JobSource::Glassdoor),
            "indeed" => Ok(JobSource::Indeed),
            other => Err(format!("unknown job source '{other}'")),
        }
    }
}

/// A listing as scraped from one source page, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawListing {
    pub source: JobSource,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub experience: Option<String>,
    /// Free-text tags such as "Full-time" or "Remote".
    pub job_types: Vec<String>,
    /// Absolute http(s) URL. Cards without one never become a `RawListing`.
    pub apply_link: String,
}

impl RawListing {
    pub fn new(source: JobSource, apply_link: String) -> Self {
        Self {
            source,
            title: None,
            company: None,
            location: None,
            salary: None,
            experience: None,
            job_types: Vec::new(),
            apply_link,
        }
    }
}

/// Canonical listing returned to callers. Every text field is populated,
/// `NOT_SPECIFIED` standing in for data the source did not carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    pub job_title: String,
    pub company: String,
    pub experience: String,
    #[serde(rename = "jobNature")]
    pub job_nature: String,
    pub location: String,
    pub salary: String,
    pub apply_link: String,
    pub source: JobSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSearchResponse {
    pub relevant_jobs: Vec<JobListing>,
}
