//! Aggregator: runs every source adapter concurrently and merges the results.
//!
//! One task per adapter, joined with an all-complete barrier. An adapter that
//! errors, times out or panics contributes an empty sequence; the others are
//! unaffected. The pool is ordered by adapter declaration, then by each
//! adapter's own order. Listings seen on several sources are kept as-is.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::models::listing::{JobListing, RawListing};
use crate::models::profile::CandidateProfile;
use crate::search::normalizer::normalize;
use crate::sources::SourceAdapter;

/// Aborts every still-running adapter task when the request is dropped.
struct AbortOnDrop(Vec<JoinHandle<Vec<RawListing>>>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

pub async fn aggregate(
    profile: Arc<CandidateProfile>,
    adapters: &[Arc<dyn SourceAdapter>],
    adapter_timeout: Duration,
) -> Vec<JobListing> {
    let mut tasks = AbortOnDrop(
        adapters
            .iter()
            .map(|adapter| {
                let adapter = Arc::clone(adapter);
                let profile = Arc::clone(&profile);
                tokio::spawn(run_adapter(adapter, profile, adapter_timeout))
            })
            .collect(),
    );

    let mut pool = Vec::new();
    for (adapter, handle) in adapters.iter().zip(tasks.0.iter_mut()) {
        let raw = match handle.await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("{} adapter task failed: {e}", adapter.source());
                Vec::new()
            }
        };
        info!("{} contributed {} listings", adapter.source(), raw.len());
        pool.extend(raw.into_iter().map(|r| normalize(r, &profile)));
    }

    info!("Total jobs from all sources before filtering: {}", pool.len());
    pool
}

async fn run_adapter(
    adapter: Arc<dyn SourceAdapter>,
    profile: Arc<CandidateProfile>,
    adapter_timeout: Duration,
) -> Vec<RawListing> {
    let source = adapter.source();
    match tokio::time::timeout(adapter_timeout, adapter.fetch(&profile)).await {
        Ok(Ok(raw)) => raw,
        Ok(Err(e)) => {
            warn!("{source} adapter failed: {e:#}");
            Vec::new()
        }
        Err(_) => {
            warn!("{source} adapter timed out after {}s", adapter_timeout.as_secs());
            Vec::new()
        }
    }
}
