use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::models::listing::{JobSource, RawListing};
use crate::models::profile::CandidateProfile;
use crate::sources::{
    clean_text, css, resolve_link, select_text, ExtractionError, ListingSource, PageRequest,
};

const SEARCH_URL: &str = "https://www.glassdoor.com/Job/jobs.htm";

const CARD: &str = r#"li[data-test="jobListing"]"#;
const TITLE_LINK: &str = r#"a[data-test="job-title"]"#;
const EMPLOYER: &str = r#"[class*="EmployerProfile_compactEmployerName"], [data-test="employer-name"]"#;
const LOCATION: &str = r#"[data-test="emp-location"]"#;
const SALARY: &str = r#"[data-test="detailSalary"]"#;
const TAGS: &str = r#"[data-test="job-type"], [class*="JobCard_jobType"]"#;

pub struct GlassdoorSource;

impl ListingSource for GlassdoorSource {
    fn source(&self) -> JobSource {
        JobSource::Glassdoor
    }

    fn page_request(&self, profile: &CandidateProfile, page: u32) -> PageRequest {
        let page = page.max(1).to_string();
        let params = [
            ("sc.keyword", profile.position.as_str()),
            ("locKeyword", profile.location().unwrap_or("")),
            ("p", page.as_str()),
        ];
        let url = Url::parse_with_params(SEARCH_URL, &params)
            .map(String::from)
            .unwrap_or_else(|_| SEARCH_URL.to_string());
        PageRequest::get(url)
    }

    fn parse_page(&self, body: &str) -> Vec<RawListing> {
        let document = Html::parse_document(body);
        let Some(selectors) = CardSelectors::new() else {
            return Vec::new();
        };

        document
            .select(&selectors.card)
            .filter_map(|card| match selectors.parse_card(&card) {
                Ok(listing) => Some(listing),
                Err(e) => {
                    debug!("Skipping Glassdoor card: {e}");
                    None
                }
            })
            .collect()
    }
}

struct CardSelectors {
    card: Selector,
    title_link: Selector,
    employer: Selector,
    location: Selector,
    salary: Selector,
    tags: Selector,
}

impl CardSelectors {
    fn new() -> Option<Self> {
        Some(Self {
            card: css(CARD)?,
            title_link: css(TITLE_LINK)?,
            employer: css(EMPLOYER)?,
            location: css(LOCATION)?,
            salary: css(SALARY)?,
            tags: css(TAGS)?,
        })
    }

    fn parse_card(&self, card: &ElementRef<'_>) -> Result<RawListing, ExtractionError> {
        let anchor = card
            .select(&self.title_link)
            .next()
            .ok_or(ExtractionError::MissingField("title"))?;
        let href = anchor
            .value()
            .attr("href")
            .ok_or(ExtractionError::MissingField("apply_link"))?;
        let apply_link = resolve_link(JobSource::Glassdoor.origin(), href)?;

        let mut listing = RawListing::new(JobSource::Glassdoor, apply_link);
        listing.title = select_text(card, &self.title_link);
        listing.company = select_text(card, &self.employer);
        listing.location = select_text(card, &self.location);
        listing.salary = select_text(card, &self.salary);
        listing.job_types = card
            .select(&self.tags)
            .map(|el| clean_text(&el.text().collect::<Vec<_>>().join(" ")))
            .filter(|tag| !tag.is_empty())
            .collect();
        Ok(listing)
    }
}
