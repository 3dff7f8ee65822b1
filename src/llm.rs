use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API key is not configured")]
    MissingApiKey,

    #[error("model is overloaded: {0}")]
    Overloaded(String),

    #[error("API key rejected: {0}")]
    InvalidApiKey(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Carries no request URL, so credentials cannot end up in logs.
    #[error("network error: {0}")]
    Network(reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Transient overload, the only condition worth retrying.
    pub fn is_overloaded(&self) -> bool {
        matches!(self, LlmError::Overloaded(_))
    }
}

/// Text generation backend used by the summarizer.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Whether a credential is available. Checked before any network call.
    fn is_configured(&self) -> bool;

    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<serde_json::Value>,
}

/// Google Gemini `generateContent` client.
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn api_key(&self) -> Option<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let api_key = self.api_key().ok_or(LlmError::MissingApiKey)?;
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );

        let body = GenerateRequest {
            contents: vec![Content {
                role: "user".into(),
                parts: vec![Part { text: prompt.into() }],
            }],
        };

        tracing::debug!(model = %self.config.model, prompt_chars = prompt.chars().count(), "Calling Gemini");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &text));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| {
                LlmError::InvalidResponse(format!("Failed to parse Gemini response: {}", e.without_url()))
            })?;

        extract_text(parsed)
    }
}

fn extract_text(response: GenerateResponse) -> Result<String, LlmError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("No candidates returned from Gemini".into()))?;

    if candidate.finish_reason.as_deref() == Some("SAFETY") {
        return Err(LlmError::InvalidResponse(
            "Content blocked by Gemini safety filters".into(),
        ));
    }

    let text: String = candidate
        .content
        .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(LlmError::InvalidResponse("Empty text in Gemini response".into()));
    }

    Ok(text)
}

/// Maps a non-success Gemini reply onto the error kinds the pipeline distinguishes.
fn classify_failure(status: u16, body: &str) -> LlmError {
    let (message, google_status, reasons) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let reasons: Vec<String> = envelope
                .error
                .details
                .iter()
                .filter_map(|detail| detail.get("reason").and_then(|r| r.as_str()))
                .map(str::to_string)
                .collect();
            (envelope.error.message, envelope.error.status, reasons)
        }
        Err(_) => (body.trim().to_string(), String::new(), Vec::new()),
    };

    let message = if message.is_empty() {
        format!("HTTP {}", status)
    } else {
        message
    };

    if status == 503 || google_status == "UNAVAILABLE" || message.to_lowercase().contains("overloaded") {
        return LlmError::Overloaded(message);
    }

    let key_rejected = status == 401
        || reasons.iter().any(|r| r == "API_KEY_INVALID")
        || ((status == 400 || status == 403) && message.contains("API key"));
    if key_rejected {
        return LlmError::InvalidApiKey(message);
    }

    LlmError::Api { status, message }
}
