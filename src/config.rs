use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::llm::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, GeminiConfig};
use crate::retry::RetryPolicy;
use crate::summarizer::{MAX_PROMPT_BODY_CHARS, SummarizerConfig};
use crate::telemetry::LogFormat;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Clone)]
pub struct Config {
    pub server_addr: SocketAddr,
    /// May be absent; requests then fail with a missing-credential error.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub fetch_timeout: Duration,
    pub llm_timeout: Duration,
    /// Connection setup limit shared by the page fetcher and the Gemini client.
    pub connect_timeout: Duration,
    pub retry: RetryPolicy,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server_addr", &self.server_addr)
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<redacted>"))
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("llm_timeout", &self.llm_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("retry", &self.retry)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = value("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let ip = IpAddr::from_str(host.trim()).map_err(|e| ConfigError::Invalid {
            key: "HOST",
            reason: e.to_string(),
        })?;
        let port = parse_or("PORT", value("PORT"), 3000u16)?;

        let max_attempts = parse_or("SUMMARY_MAX_ATTEMPTS", value("SUMMARY_MAX_ATTEMPTS"), 3usize)?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "SUMMARY_MAX_ATTEMPTS",
                reason: "must be at least 1".into(),
            });
        }
        let retry_delay_ms = parse_or("SUMMARY_RETRY_DELAY_MS", value("SUMMARY_RETRY_DELAY_MS"), 2000u64)?;

        let log_format = match value("LOG_FORMAT") {
            None => LogFormat::Text,
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                key: "LOG_FORMAT",
                reason,
            })?,
        };

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            gemini_api_key: value("GEMINI_API_KEY").map(|k| k.trim().to_string()),
            gemini_model: value("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: value("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            fetch_timeout: Duration::from_secs(parse_or("FETCH_TIMEOUT_SECS", value("FETCH_TIMEOUT_SECS"), 15)?),
            llm_timeout: Duration::from_secs(parse_or("LLM_TIMEOUT_SECS", value("LLM_TIMEOUT_SECS"), 60)?),
            connect_timeout: Duration::from_secs(parse_or(
                "CONNECT_TIMEOUT_SECS",
                value("CONNECT_TIMEOUT_SECS"),
                5,
            )?),
            retry: RetryPolicy::new(max_attempts, Duration::from_millis(retry_delay_ms)),
            log_format,
        })
    }

    pub fn gemini(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.gemini_api_key.clone(),
            model: self.gemini_model.clone(),
            base_url: self.gemini_base_url.clone(),
            timeout: self.llm_timeout,
            connect_timeout: self.connect_timeout,
        }
    }

    pub fn summarizer(&self) -> SummarizerConfig {
        SummarizerConfig {
            retry: self.retry,
            max_body_chars: MAX_PROMPT_BODY_CHARS,
        }
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: format!("{:?}: {}", raw, e),
        }),
    }
}
