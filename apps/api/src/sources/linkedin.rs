// LinkedIn guest job search. Returns bare HTML card fragments, 25 per page.

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::models::listing::{JobSource, RawListing};
use crate::models::profile::CandidateProfile;
use crate::sources::{css, resolve_link, select_text, ExtractionError, ListingSource, PageRequest};

const SEARCH_URL: &str = "https://www.linkedin.com/jobs-guest/jobs/api/seeMoreJobPostings/search";
const JOBS_PER_PAGE: u32 = 25;

const CARD: &str = "div.base-card";
const TITLE: &str = "h3.base-search-card__title";
const COMPANY: &str = "h4.base-search-card__subtitle";
const LOCATION: &str = "span.job-search-card__location";
const SALARY: &str = "span.job-search-card__salary-info";
const LINK: &str = "a.base-card__full-link";

pub struct LinkedInSource;

impl ListingSource for LinkedInSource {
    fn source(&self) -> JobSource {
        JobSource::LinkedIn
    }

    fn page_request(&self, profile: &CandidateProfile, page: u32) -> PageRequest {
        let start = (page.saturating_sub(1) * JOBS_PER_PAGE).to_string();
        let params = [
            ("keywords", profile.position.as_str()),
            ("location", profile.location().unwrap_or("")),
            ("start", start.as_str()),
        ];
        let url = Url::parse_with_params(SEARCH_URL, &params)
            .map(String::from)
            .unwrap_or_else(|_| SEARCH_URL.to_string());
        PageRequest::get(url)
    }

    fn parse_page(&self, body: &str) -> Vec<RawListing> {
        let document = Html::parse_fragment(body);
        let Some(selectors) = CardSelectors::new() else {
            return Vec::new();
        };

        document
            .select(&selectors.card)
            .filter_map(|card| match selectors.parse_card(&card) {
                Ok(listing) => Some(listing),
                Err(e) => {
                    debug!("Skipping LinkedIn card: {e}");
                    None
                }
            })
            .collect()
    }
}

struct CardSelectors {
    card: Selector,
    title: Selector,
    company: Selector,
    location: Selector,
    salary: Selector,
    link: Selector,
}

impl CardSelectors {
    fn new() -> Option<Self> {
        Some(Self {
            card: css(CARD)?,
            title: css(TITLE)?,
            company: css(COMPANY)?,
            location: css(LOCATION)?,
            salary: css(SALARY)?,
            link: css(LINK)?,
        })
    }

    fn parse_card(&self, card: &ElementRef<'_>) -> Result<RawListing, ExtractionError> {
        let href = card
            .select(&self.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .ok_or(ExtractionError::MissingField("apply_link"))?;
        let apply_link = strip_query(&resolve_link(JobSource::LinkedIn.origin(), href)?);

        let title = select_text(card, &self.title).ok_or(ExtractionError::MissingField("title"))?;

        let mut listing = RawListing::new(JobSource::LinkedIn, apply_link);
        listing.title = Some(title);
        listing.company = select_text(card, &self.company);
        listing.location = select_text(card, &self.location);
        listing.salary = select_text(card, &self.salary);
        Ok(listing)
    }
}

/// LinkedIn appends tracking parameters to every job link.
fn strip_query(url: &str) -> String {
    url.split(['?', '#']).next().unwrap_or(url).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"
        <li>
          <div class="base-card relative job-search-card">
            <a class="base-card__full-link" href="https://www.linkedin.com/jobs/view/python-developer-3811?refId=abc&trackingId=xyz">
              <span class="sr-only">Python Developer</span>
            </a>
            <div class="base-search-card__info">
              <h3 class="base-search-card__title">
                  Python Developer
              </h3>
              <h4 class="base-search-card__subtitle"><a href="#">Arbisoft</a></h4>
              <div class="base-search-card__metadata">
                <span class="job-search-card__location">Lahore, Punjab, Pakistan</span>
                <span class="job-search-card__salary-info">PKR 200K - 300K</span>
              </div>
            </div>
          </div>
        </li>
        <li>
          <div class="base-card relative job-search-card">
            <div class="base-search-card__info">
              <h3 class="base-search-card__title">No Link Engineer</h3>
            </div>
          </div>
        </li>
        <li>
          <div class="base-card relative job-search-card">
            <a class="base-card__full-link" href="/jobs/view/backend-engineer-3812"></a>
            <h3 class="base-search-card__title">Backend Engineer</h3>
          </div>
        </li>
        <li>
          <div class="base-card relative job-search-card">
            <a class="base-card__full-link" href="https://www.linkedin.com/jobs/view/3813"></a>
          </div>
        </li>
    "##;

    fn profile() -> CandidateProfile {
        CandidateProfile {
            position: "Python Developer".to_string(),
            experience: "2 years".to_string(),
            skills: "Python, FastAPI".to_string(),
            salary: None,
            job_nature: None,
            location: Some("Pakistan".to_string()),
        }
    }

    #[test]
    fn test_parses_complete_card() {
        let listings = LinkedInSource.parse_page(PAGE);
        let first = &listings[0];
        assert_eq!(first.title.as_deref(), Some("Python Developer"));
        assert_eq!(first.company.as_deref(), Some("Arbisoft"));
        assert_eq!(first.location.as_deref(), Some("Lahore, Punjab, Pakistan"));
        assert_eq!(first.salary.as_deref(), Some("PKR 200K - 300K"));
        assert_eq!(
            first.apply_link,
            "https://www.linkedin.com/jobs/view/python-developer-3811"
        );
        assert_eq!(first.source, JobSource::LinkedIn);
    }

    #[test]
    fn test_skips_cards_without_link_or_title() {
        let listings = LinkedInSource.parse_page(PAGE);
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[1].title.as_deref(), Some("Backend Engineer"));
        assert_eq!(
            listings[1].apply_link,
            "https://www.linkedin.com/jobs/view/backend-engineer-3812"
        );
        assert!(listings[1].company.is_none());
    }

    #[test]
    fn test_empty_body_yields_no_listings() {
        assert!(LinkedInSource.parse_page("").is_empty());
        assert!(LinkedInSource.parse_page("<html><body>No results</body></html>").is_empty());
    }

    #[test]
    fn test_page_request_offsets_by_page_size() {
        let first = LinkedInSource.page_request(&profile(), 1);
        assert!(first.url.contains("keywords=Python+Developer"));
        assert!(first.url.contains("location=Pakistan"));
        assert!(first.url.contains("start=0"));
        assert!(first.body.is_none());

        let third = LinkedInSource.page_request(&profile(), 3);
        assert!(third.url.contains("start=50"));
    }
}
