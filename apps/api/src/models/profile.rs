use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// The candidate a search is run for. Deserialized straight from the
/// `/search-jobs` request body and shared read-only by every adapter task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub position: String,
    pub experience: String,
    /// Free text, comma-separated terms.
    pub skills: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    #[serde(
        rename = "jobNature",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub job_nature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl CandidateProfile {
    /// Rejects profiles whose required fields are blank.
    pub fn validate(&self) -> Result<(), AppError> {
        for (field, value) in [
            ("position", &self.position),
            ("experience", &self.experience),
            ("skills", &self.skills),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{field} cannot be empty")));
            }
        }
        Ok(())
    }

    pub fn location(&self) -> Option<&str> {
        non_blank(self.location.as_deref())
    }

    pub fn job_nature(&self) -> Option<&str> {
        non_blank(self.job_nature.as_deref())
    }

    pub fn salary(&self) -> Option<&str> {
        non_blank(self.salary.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
