//! Claude client used by the relevance classifier's scored tier.
//!
//! Created once at startup; clones share the underlying reqwest client.
use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
/// Index arrays are short; this leaves room for a fenced reply with commentary.
const MAX_TOKENS: u32 = 1024;
const ATTEMPTS: u32 = 3;
const FIRST_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Turn<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Turn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesReply {
    #[serde(default)]
    content: Vec<Block>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Block {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl MessagesReply {
    fn first_text(self) -> Option<String> {
        self.content
            .into_iter()
            .filter(|block| block.kind == "text")
            .find_map(|block| block.text)
    }
}

/// Outcome of a single attempt that did not produce a reply.
enum Failure {
    Retryable(LlmError),
    Final(LlmError),
}

/// 429 and 5xx are worth another attempt; other non-2xx statuses are not.
fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Pulls the API's own message out of an error body, falling back to the raw body.
fn error_message(body: String) -> String {
    serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body)
}

#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    model: String,
}

impl LlmClient {
    pub fn new(api_key: String, model: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build LLM HTTP client")?;

        Ok(Self {
            client,
            api_key,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one user turn and returns the first text block of the reply.
    /// Retries connection failures, 429 and 5xx with doubling backoff.
    pub async fn call_text(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system,
            messages: [Turn {
                role: "user",
                content: prompt,
            }],
        };

        let mut backoff = FIRST_BACKOFF;
        let mut last_error = None;

        for attempt in 1..=ATTEMPTS {
            match self.attempt(&request).await {
                Ok(reply) => {
                    return reply
                        .first_text()
                        .filter(|text| !text.trim().is_empty())
                        .ok_or(LlmError::EmptyContent);
                }
                Err(Failure::Final(e)) => return Err(e),
                Err(Failure::Retryable(e)) => {
                    if attempt < ATTEMPTS {
                        warn!(
                            "LLM attempt {attempt}/{ATTEMPTS} failed ({e}), retrying in {}ms",
                            backoff.as_millis()
                        );
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(LlmError::RateLimited { retries: ATTEMPTS }))
    }

    async fn attempt(&self, request: &MessagesRequest<'_>) -> Result<MessagesReply, Failure> {
        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await
            .map_err(|e| Failure::Retryable(LlmError::Http(e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = LlmError::Api {
                status: status.as_u16(),
                message: error_message(body),
            };
            return Err(if is_retryable(status) {
                Failure::Retryable(error)
            } else {
                Failure::Final(error)
            });
        }

        let reply: MessagesReply = response
            .json()
            .await
            .map_err(|e| Failure::Final(LlmError::Http(e)))?;

        if let Some(usage) = &reply.usage {
            debug!(
                "LLM reply received: input_tokens={}, output_tokens={}",
                usage.input_tokens, usage.output_tokens
            );
        }

        Ok(reply)
    }
}
