//! Indeed listings through an Apify actor run.
//!
//! Apify runs the actor synchronously and returns the whole dataset as one
//! JSON array, so this source has exactly one page.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::models::listing::{JobSource, RawListing};
use crate::models::profile::CandidateProfile;
use crate::sources::{resolve_link, ExtractionError, ListingSource, PageRequest};

const APIFY_ACTS_URL: &str = "https://api.apify.com/v2/acts";
pub const DEFAULT_ACTOR_ID: &str = "hMvNSpz3JnHgl5jkh";

const COUNTRY_CODES: &[(&str, &str)] = &[
    ("united states", "US"),
    ("usa", "US"),
    ("united kingdom", "GB"),
    ("uk", "GB"),
    ("pakistan", "PK"),
    ("india", "IN"),
    ("canada", "CA"),
    ("australia", "AU"),
    ("germany", "DE"),
];

pub struct IndeedSource {
    api_token: String,
    actor_id: String,
    max_items: usize,
}

impl IndeedSource {
    pub fn new(api_token: String, actor_id: String, max_items: usize) -> Self {
        Self {
            api_token,
            actor_id,
            max_items,
        }
    }
}

/// One dataset item. Only the fields we map are declared.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApifyJobItem {
    position_name: Option<String>,
    company: Option<String>,
    location: Option<String>,
    salary: Option<String>,
    url: Option<String>,
    #[serde(default)]
    job_type: Vec<String>,
}

impl ListingSource for IndeedSource {
    fn source(&self) -> JobSource {
        JobSource::Indeed
    }

    fn page_request(&self, profile: &CandidateProfile, _page: u32) -> PageRequest {
        let (country, location) = split_location(profile.location().unwrap_or(""));
        let url = format!(
            "{APIFY_ACTS_URL}/{}/run-sync-get-dataset-items?token={}",
            self.actor_id, self.api_token
        );

        PageRequest::post_json(
            url,
            json!({
                "position": profile.position,
                "country": country,
                "location": location,
                "maxItems": self.max_items,
                "parseCompanyDetails": false,
                "saveOnlyUniqueItems": true,
                "followApplyRedirects": false,
            }),
        )
    }

    fn parse_page(&self, body: &str) -> Vec<RawListing> {
        let items: Vec<serde_json::Value> = match serde_json::from_str(body) {
            Ok(items) => items,
            Err(e) => {
                warn!("Apify dataset is not a JSON array: {e}");
                return Vec::new();
            }
        };

        items
            .into_iter()
            .filter_map(|item| match convert_item(item) {
                Ok(listing) => Some(listing),
                Err(e) => {
                    debug!("Skipping Indeed item: {e}");
                    None
                }
            })
            .collect()
    }
}

fn convert_item(item: serde_json::Value) -> Result<RawListing, ExtractionError> {
    let item: ApifyJobItem =
        serde_json::from_value(item).map_err(|e| ExtractionError::Malformed(e.to_string()))?;

    let url = item.url.ok_or(ExtractionError::MissingField("url"))?;
    let apply_link = resolve_link(JobSource::Indeed.origin(), &url)?;

    let mut listing = RawListing::new(JobSource::Indeed, apply_link);
    listing.title = item.position_name;
    listing.company = item.company;
    listing.location = item.location;
    listing.salary = item.salary;
    listing.job_types = item.job_type;
    Ok(listing)
}

/// "City, Country" → (country code, city); a lone part is treated as the country.
/// Unknown countries fall back to the US.
fn split_location(location: &str) -> (&'static str, String) {
    let parts: Vec<&str> = location.split(',').map(str::trim).collect();
    let (country, place) = match parts.as_slice() {
        [only] => (only.to_lowercase(), only.to_string()),
        [first, .., last] => (last.to_lowercase(), first.to_string()),
        [] => (String::new(), String::new()),
    };

    let code = COUNTRY_CODES
        .iter()
        .find(|(name, _)| *name == country)
        .map(|(_, code)| *code)
        .unwrap_or("US");

    (code, place)
}
