//! Job search orchestration: aggregate every source, then classify the pool.
//!
//! Built once at startup and shared by all requests. The pool handed to the
//! classifier is exactly what the aggregator produced; listings are neither
//! reordered nor modified in between.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::models::listing::JobListing;
use crate::models::profile::CandidateProfile;
use crate::search::aggregator::aggregate;
use crate::search::classifier::RelevanceClassifier;
use crate::sources::SourceAdapter;

pub struct JobSearchService {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    classifier: RelevanceClassifier,
    adapter_timeout: Duration,
}

impl JobSearchService {
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        classifier: RelevanceClassifier,
        adapter_timeout: Duration,
    ) -> Self {
        Self {
            adapters,
            classifier,
            adapter_timeout,
        }
    }

    pub async fn search(&self, profile: CandidateProfile) -> Vec<JobListing> {
        let profile = Arc::new(profile);
        info!(
            "Searching {} sources for '{}'",
            self.adapters.len(),
            profile.position
        );

        let pool = aggregate(Arc::clone(&profile), &self.adapters, self.adapter_timeout).await;
        let classification = self.classifier.classify(&profile, pool).await;

        info!(
            "Returning {} relevant jobs ({:?} tier)",
            classification.jobs.len(),
            classification.tier
        );
        classification.jobs
    }
}
