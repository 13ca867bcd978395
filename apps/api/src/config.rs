use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Generation settings for the report service. Passed to `ReportClient::new`.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if the API key is missing or a value is out of range.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmSettings,
    /// Quiet period before an auto-generating session regenerates its report.
    pub report_debounce: Duration,
    pub max_upload_bytes: usize,
    /// Sessions untouched for this long are evicted with their files and report.
    pub session_idle_ttl: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = Env(&lookup);

        let llm = LlmSettings {
            api_key: env.require("ANTHROPIC_API_KEY")?,
            api_url: env.or("ANTHROPIC_API_URL", DEFAULT_API_URL),
            model: env.or("LLM_MODEL", DEFAULT_MODEL),
            temperature: env.parse_or("LLM_TEMPERATURE", 0.0)?,
            max_tokens: env.parse_or("LLM_MAX_TOKENS", 8192)?,
            top_k: env.parse_opt("LLM_TOP_K")?,
            top_p: env.parse_opt("LLM_TOP_P")?,
            timeout: Duration::from_secs(env.parse_or("LLM_TIMEOUT_SECS", 120)?),
            max_retries: env.parse_or("LLM_MAX_RETRIES", 2)?,
            retry_base_delay: Duration::from_millis(env.parse_or("LLM_RETRY_BASE_DELAY_MS", 1000)?),
        };

        if !(0.0..=1.0).contains(&llm.temperature) {
            bail!("LLM_TEMPERATURE must be between 0 and 1, got {}", llm.temperature);
        }
        if llm.max_tokens == 0 {
            bail!("LLM_MAX_TOKENS must be greater than 0");
        }
        if let Some(top_p) = llm.top_p {
            if !(top_p > 0.0 && top_p <= 1.0) {
                bail!("LLM_TOP_P must be in (0, 1], got {top_p}");
            }
        }
        if llm.timeout.is_zero() {
            bail!("LLM_TIMEOUT_SECS must be greater than 0");
        }

        let session_idle_ttl =
            Duration::from_secs(env.parse_or("SESSION_IDLE_TTL_SECS", 1800)?);
        if session_idle_ttl.is_zero() {
            bail!("SESSION_IDLE_TTL_SECS must be greater than 0");
        }

        Ok(Config {
            llm,
            session_idle_ttl,
            report_debounce: Duration::from_millis(env.parse_or("REPORT_DEBOUNCE_MS", 500)?),
            max_upload_bytes: env.parse_or("MAX_UPLOAD_BYTES", 50 * 1024 * 1024)?,
            port: env
                .parse_or("PORT", 8080)
                .context("PORT must be a valid port number")?,
            rust_log: env.or("RUST_LOG", "info"),
        })
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn require(&self, key: &str) -> Result<String> {
        self.get(key)
            .with_context(|| format!("Required environment variable '{key}' is not set"))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_opt<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| anyhow::anyhow!("Invalid value for '{key}': {e}")),
            None => Ok(None),
        }
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        Ok(self.parse_opt(key)?.unwrap_or(default))
    }
}
