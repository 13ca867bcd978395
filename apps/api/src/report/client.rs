//! Report Client: the single point of entry for Anthropic Messages API calls.
//!
//! Configuration is passed at construction; nothing is global. Rate limits and
//! transient failures are retried with bounded exponential backoff, everything
//! else fails on the first answer.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header::HeaderMap, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::LlmSettings;
use crate::prompt::Prompt;
use crate::report::{GeneratedReport, ReportError, ReportGenerator};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_ID_HEADER: &str = "request-id";
/// Upper bound for any wait between attempts, server-requested or computed.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl MessagesResponse {
    fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// A failed attempt plus the wait the server asked for, if any.
struct AttemptError {
    error: ReportError,
    retry_after: Option<Duration>,
}

impl From<ReportError> for AttemptError {
    fn from(error: ReportError) -> Self {
        Self {
            error,
            retry_after: None,
        }
    }
}

#[derive(Clone)]
pub struct ReportClient {
    client: Client,
    settings: LlmSettings,
}

impl ReportClient {
    pub fn new(settings: LlmSettings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, settings })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    async fn send_once(&self, prompt: &Prompt) -> Result<GeneratedReport, AttemptError> {
        let body = MessagesRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            top_k: self.settings.top_k,
            top_p: self.settings.top_p,
            system: &prompt.system,
            messages: vec![Message {
                role: "user",
                content: &prompt.user,
            }],
        };

        let response = self
            .client
            .post(&self.settings.api_url)
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify_transport(e))?;

        let status = response.status();
        let request_id = header_str(response.headers(), REQUEST_ID_HEADER);

        if !status.is_success() {
            let retry_after = retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!(
                "Report service returned {} (request-id {:?}): {}",
                status, request_id, message
            );
            return Err(AttemptError {
                error: classify_status(status, message),
                retry_after,
            });
        }

        let raw = response.text().await.map_err(|e| self.classify_transport(e))?;
        let parsed: MessagesResponse = serde_json::from_str(&raw).map_err(|e| {
            ReportError::TransientService(format!("malformed response body: {e}"))
        })?;

        let text = parsed
            .text()
            .map(strip_html_fences)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ReportError::TransientService("response contained no report text".to_string())
            })?
            .to_string();

        debug!(
            "Report generated: input_tokens={}, output_tokens={}",
            parsed.usage.input_tokens, parsed.usage.output_tokens
        );

        Ok(GeneratedReport {
            raw_text: text,
            received_at: Utc::now(),
            source_request_id: request_id,
            model: self.settings.model.clone(),
            input_tokens: parsed.usage.input_tokens,
            output_tokens: parsed.usage.output_tokens,
        })
    }

    fn classify_transport(&self, e: reqwest::Error) -> AttemptError {
        let error = if e.is_timeout() {
            ReportError::Timeout(self.settings.timeout.as_secs())
        } else if e.is_connect() {
            ReportError::TransientService(e.to_string())
        } else {
            ReportError::Unknown(e.to_string())
        };
        error.into()
    }

    fn backoff(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let delay = retry_after.unwrap_or_else(|| {
            self.settings
                .retry_base_delay
                .checked_mul(1u32 << attempt.saturating_sub(1).min(10))
                .unwrap_or(MAX_RETRY_DELAY)
        });
        delay.min(MAX_RETRY_DELAY)
    }
}

#[async_trait]
impl ReportGenerator for ReportClient {
    async fn generate(
        &self,
        prompt: &Prompt,
        cancel: &CancellationToken,
    ) -> Result<GeneratedReport, ReportError> {
        let mut attempt = 0;
        loop {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ReportError::Cancelled),
                outcome = self.send_once(prompt) => outcome,
            };

            let failure = match outcome {
                Ok(report) => return Ok(report),
                Err(failure) => failure,
            };

            attempt += 1;
            if !failure.error.is_retryable() || attempt > self.settings.max_retries {
                return Err(failure.error);
            }

            let delay = self.backoff(attempt, failure.retry_after);
            warn!(
                "Report attempt {} failed ({}), retrying after {}ms",
                attempt,
                failure.error,
                delay.as_millis()
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ReportError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

fn classify_status(status: StatusCode, message: String) -> ReportError {
    match status.as_u16() {
        401 | 403 => ReportError::Auth(message),
        429 => ReportError::RateLimit(message),
        // 529 is Anthropic's "overloaded".
        500..=599 => ReportError::TransientService(message),
        400 => ReportError::Unknown(format!("Invalid request: {message}")),
        code => ReportError::Unknown(format!("API error ({code}): {message}")),
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    header_str(headers, "retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Strips ```html ... ``` or ``` ... ``` fences the model sometimes wraps around the report.
fn strip_html_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```html")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start()),
        None => text,
    }
}
