use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL};
use reqwest::Client;

use crate::sources::{PageFetcher, PageRequest, TransportError};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// `PageFetcher` over a shared reqwest client. Created once per process.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = client_builder(request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

fn client_builder(request_timeout: Duration) -> reqwest::ClientBuilder {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(request_timeout)
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, request: &PageRequest) -> Result<String, TransportError> {
        let builder = match &request.body {
            Some(body) => self.client.post(&request.url).json(body),
            None => self.client.get(&request.url),
        };

        let response = builder.send().await.map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: redact(&request.url),
            });
        }

        response.text().await.map_err(classify_reqwest_error)
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> TransportError {
    let e = e.without_url();
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_connect() {
        TransportError::Connection(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}

/// Drops the query string so tokens never reach the logs.
fn redact(url: &str) -> String {
    url.split('?').next().unwrap_or(url).to_string()
}
