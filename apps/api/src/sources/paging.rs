use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::models::listing::{JobSource, RawListing};
use crate::models::profile::CandidateProfile;
use crate::sources::{
    AdapterConfig, ListingSource, PageFetcher, PageRequest, SourceAdapter, TransportError,
};

/// Walks a source's result pages one at a time.
///
/// Stops at `max_listings`, at the first empty page after page 1, or at the
/// first transport error that survives the retry policy. In every case the
/// listings collected so far are returned.
pub struct PagedAdapter<S> {
    source: S,
    fetcher: Arc<dyn PageFetcher>,
    config: AdapterConfig,
}

impl<S: ListingSource> PagedAdapter<S> {
    pub fn new(source: S, fetcher: Arc<dyn PageFetcher>, config: AdapterConfig) -> Self {
        Self {
            source,
            fetcher,
            config,
        }
    }

    async fn fetch_with_retry(&self, request: &PageRequest) -> Result<String, TransportError> {
        let retry = &self.config.retry;
        let mut attempt = 0;

        loop {
            match self.fetcher.fetch_page(request).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < retry.max_retries => {
                    let delay = retry.delay_for(attempt);
                    warn!(
                        "{} fetch attempt {} failed ({}), retrying after {}ms...",
                        self.source.source(),
                        attempt + 1,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn politeness_delay(&self) -> Duration {
        let min = self.config.page_delay_min;
        let max = self.config.page_delay_max;
        if max <= min {
            return min;
        }
        let millis = rand::thread_rng().gen_range(min.as_millis()..=max.as_millis());
        Duration::from_millis(millis as u64)
    }
}

#[async_trait]
impl<S: ListingSource + 'static> SourceAdapter for PagedAdapter<S> {
    fn source(&self) -> JobSource {
        self.source.source()
    }

    async fn fetch(&self, profile: &CandidateProfile) -> anyhow::Result<Vec<RawListing>> {
        let source = self.source.source();
        let max_listings = self.config.max_listings;
        let mut collected: Vec<RawListing> = Vec::new();

        for page in 1..=self.config.max_pages {
            if collected.len() >= max_listings {
                break;
            }

            let request = self.source.page_request(profile, page);
            let body = match self.fetch_with_retry(&request).await {
                Ok(body) => body,
                Err(e) => {
                    warn!("{source} page {page} failed, keeping {} listings: {e}", collected.len());
                    break;
                }
            };

            let listings = self.source.parse_page(&body);
            debug!("{source} page {page} yielded {} listings", listings.len());

            if listings.is_empty() && page > 1 {
                break;
            }

            let room = max_listings - collected.len();
            collected.extend(listings.into_iter().take(room));

            if collected.len() < max_listings && page < self.config.max_pages {
                tokio::time::sleep(self.politeness_delay()).await;
            }
        }

        info!("Scraped {} jobs from {source}", collected.len());
        Ok(collected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::RetryPolicy;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Page bodies are lines of `title|link`; blank body = empty page.
    struct LineSource;

    impl ListingSource for LineSource {
        fn source(&self) -> JobSource {
            JobSource::LinkedIn
        }

        fn page_request(&self, _profile: &CandidateProfile, page: u32) -> PageRequest {
            PageRequest::get(format!("https://jobs.test/search?page={page}"))
        }

        fn parse_page(&self, body: &str) -> Vec<RawListing> {
            body.lines()
                .filter_map(|line| line.split_once('|'))
                .map(|(title, link)| {
                    let mut raw = RawListing::new(JobSource::LinkedIn, link.to_string());
                    raw.title = Some(title.to_string());
                    raw
                })
                .collect()
        }
    }

    struct ScriptedFetcher {
        responses: Mutex<VecDeque<Result<String, TransportError>>>,
        requests: Mutex<Vec<PageRequest>>,
    }

    impl ScriptedFetcher {
        fn new(responses: Vec<Result<String, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch_page(&self, request: &PageRequest) -> Result<String, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    fn page(start: usize, count: usize) -> Result<String, TransportError> {
        Ok((start..start + count)
            .map(|i| format!("Job {i}|https://jobs.test/view/{i}"))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn profile() -> CandidateProfile {
        CandidateProfile {
            position: "Rust Developer".to_string(),
            experience: "3 years".to_string(),
            skills: "Rust, Tokio".to_string(),
            salary: None,
            job_nature: None,
            location: None,
        }
    }

    fn config(max_listings: usize, max_pages: u32) -> AdapterConfig {
        AdapterConfig {
            max_listings,
            max_pages,
            page_delay_min: Duration::from_secs(2),
            page_delay_max: Duration::from_secs(5),
            retry: RetryPolicy {
                max_retries: 2,
                base_delay: Duration::from_millis(500),
            },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_max_listings() {
        let fetcher = ScriptedFetcher::new(vec![page(0, 4), page(4, 4), page(8, 4)]);
        let adapter = PagedAdapter::new(LineSource, fetcher.clone(), config(6, 5));

        let listings = adapter.fetch(&profile()).await.unwrap();
        assert_eq!(listings.len(), 6);
        assert_eq!(listings[5].title.as_deref(), Some("Job 5"));
        assert_eq!(fetcher.request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_later_page_stops_walk() {
        let fetcher = ScriptedFetcher::new(vec![page(0, 3), page(3, 0), page(6, 3)]);
        let adapter = PagedAdapter::new(LineSource, fetcher.clone(), config(50, 5));

        let listings = adapter.fetch(&profile()).await.unwrap();
        assert_eq!(listings.len(), 3);
        assert_eq!(fetcher.request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_first_page_does_not_stop_walk() {
        let fetcher = ScriptedFetcher::new(vec![page(0, 0), page(0, 2), page(2, 0)]);
        let adapter = PagedAdapter::new(LineSource, fetcher.clone(), config(50, 5));

        let listings = adapter.fetch(&profile()).await.unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(fetcher.request_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_keeps_collected_listings() {
        let fetcher = ScriptedFetcher::new(vec![
            page(0, 3),
            Err(TransportError::Status {
                status: 403,
                url: "https://jobs.test/search?page=2".to_string(),
            }),
            page(3, 3),
        ]);
        let adapter = PagedAdapter::new(LineSource, fetcher.clone(), config(50, 5));

        let listings = adapter.fetch(&profile()).await.unwrap();
        assert_eq!(listings.len(), 3);
        // 403 is not transient: no retry
        assert_eq!(fetcher.request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_on_first_page_returns_empty_not_error() {
        let fetcher = ScriptedFetcher::new(vec![Err(TransportError::Timeout("30s".to_string()))]);
        let adapter = PagedAdapter::new(LineSource, fetcher.clone(), config(10, 3));

        let listings = adapter.fetch(&profile()).await.unwrap();
        assert!(listings.is_empty());
        assert_eq!(fetcher.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried_with_backoff() {
        let fetcher = ScriptedFetcher::new(vec![
            Err(TransportError::Status {
                status: 429,
                url: "https://jobs.test/search?page=1".to_string(),
            }),
            Err(TransportError::Connection("reset".to_string())),
            page(0, 2),
        ]);
        let adapter = PagedAdapter::new(LineSource, fetcher.clone(), config(2, 1));

        let started = tokio::time::Instant::now();
        let listings = adapter.fetch(&profile()).await.unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(fetcher.request_count(), 3);
        // 500ms + 1000ms of backoff
        assert!(started.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_are_bounded() {
        let fetcher = ScriptedFetcher::new(vec![
            Err(TransportError::Connection("refused".to_string())),
            Err(TransportError::Connection("refused".to_string())),
            Err(TransportError::Connection("refused".to_string())),
            page(0, 2),
        ]);
        let adapter = PagedAdapter::new(LineSource, fetcher.clone(), config(10, 1));

        let listings = adapter.fetch(&profile()).await.unwrap();
        assert!(listings.is_empty());
        // initial attempt + 2 retries
        assert_eq!(fetcher.request_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_politeness_delay_between_pages() {
        let fetcher = ScriptedFetcher::new(vec![page(0, 1), page(1, 1), page(2, 0)]);
        let adapter = PagedAdapter::new(LineSource, fetcher.clone(), config(50, 3));

        let started = tokio::time::Instant::now();
        adapter.fetch(&profile()).await.unwrap();
        // two delays of at least 2s each, no delay after the final page
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(4), "elapsed {elapsed:?}");
        assert!(elapsed <= Duration::from_secs(10), "elapsed {elapsed:?}");
    }

    #[test]
    fn test_politeness_delay_stays_in_range() {
        let adapter = PagedAdapter::new(LineSource, ScriptedFetcher::new(vec![]), config(1, 1));
        for _ in 0..50 {
            let d = adapter.politeness_delay();
            assert!(d >= Duration::from_secs(2) && d <= Duration::from_secs(5));
        }
    }
}
