//! Report generation boundary.
//!
//! Every call to the external model goes through a `ReportGenerator`. The
//! production implementation is `client::ReportClient`; tests substitute fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::prompt::Prompt;

pub mod client;

pub use client::ReportClient;

/// One complete report body as returned by the model. Held in memory only.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedReport {
    /// HTML, ready for direct rendering.
    pub raw_text: String,
    pub received_at: DateTime<Utc>,
    pub source_request_id: Option<String>,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Authentication rejected by report service: {0}")]
    Auth(String),

    #[error("Report service rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Report service unavailable: {0}")]
    TransientService(String),

    #[error("Report request timed out after {0}s")]
    Timeout(u64),

    #[error("Report request was cancelled")]
    Cancelled,

    #[error("Report generation failed: {0}")]
    Unknown(String),
}

impl ReportError {
    /// Rate limits and transient outages are worth another attempt; nothing else is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReportError::RateLimit(_) | ReportError::TransientService(_)
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            ReportError::Auth(_) => "REPORT_AUTH_ERROR",
            ReportError::RateLimit(_) => "REPORT_RATE_LIMITED",
            ReportError::TransientService(_) => "REPORT_SERVICE_UNAVAILABLE",
            ReportError::Timeout(_) => "REPORT_TIMEOUT",
            ReportError::Cancelled => "REPORT_CANCELLED",
            ReportError::Unknown(_) => "REPORT_FAILED",
        }
    }

    /// Message shown to the person who submitted the files.
    pub fn user_message(&self) -> String {
        match self {
            ReportError::Auth(_) => {
                "Authentication with the report service failed. Please check the configured API key."
                    .to_string()
            }
            ReportError::RateLimit(_) => {
                "Too many requests. Please try again in a few minutes.".to_string()
            }
            ReportError::TransientService(_) => {
                "The report service is temporarily unavailable. Please try again later.".to_string()
            }
            ReportError::Timeout(secs) => format!(
                "The report service did not answer within {secs} seconds. Please try again."
            ),
            ReportError::Cancelled => "Report generation was cancelled.".to_string(),
            ReportError::Unknown(message) => format!("Failed to generate report: {message}"),
        }
    }
}

#[async_trait]
pub trait ReportGenerator: Send + Sync {
    /// Sends `prompt` and returns one complete report, or fails as a whole.
    async fn generate(
        &self,
        prompt: &Prompt,
        cancel: &CancellationToken,
    ) -> Result<GeneratedReport, ReportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rate_limit_and_transient_are_retryable() {
        assert!(ReportError::RateLimit("x".into()).is_retryable());
        assert!(ReportError::TransientService("x".into()).is_retryable());
        assert!(!ReportError::Auth("x".into()).is_retryable());
        assert!(!ReportError::Timeout(5).is_retryable());
        assert!(!ReportError::Cancelled.is_retryable());
        assert!(!ReportError::Unknown("x".into()).is_retryable());
    }

    #[test]
    fn test_rate_limit_message_differs_from_auth() {
        let rate = ReportError::RateLimit("quota".into()).user_message();
        let auth = ReportError::Auth("bad key".into()).user_message();
        assert_ne!(rate, auth);
        assert!(auth.contains("API key"));
    }

    #[test]
    fn test_unknown_carries_raw_message() {
        let msg = ReportError::Unknown("socket closed".into()).user_message();
        assert!(msg.contains("socket closed"));
    }
}
