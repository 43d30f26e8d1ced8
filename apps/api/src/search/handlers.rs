//! Axum route handlers for the job search API.

use axum::{extract::State, Json};

use crate::errors::AppError;
use crate::models::listing::JobSearchResponse;
use crate::models::profile::CandidateProfile;
use crate::state::AppState;

/// POST /search-jobs
///
/// Validates the profile, runs the full pipeline and returns the relevant
/// listings. Source and classifier failures only shrink the result.
pub async fn handle_search_jobs(
    State(state): State<AppState>,
    Json(profile): Json<CandidateProfile>,
) -> Result<Json<JobSearchResponse>, AppError> {
    profile.validate()?;

    let relevant_jobs = state.search.search(profile).await;

    Ok(Json(JobSearchResponse { relevant_jobs }))
}
