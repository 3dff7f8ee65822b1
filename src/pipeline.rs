use serde_json::Value;
use std::sync::Arc;
use url::Url;

use crate::error::{AppError, Result};
use crate::extractor::{ContentExtractor, MIN_BODY_CHARS};
use crate::fetcher::DocumentFetcher;
use crate::summarizer::{Summarizer, UNTITLED};

/// Outcome of a successful summarize request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleSummary {
    pub title: String,
    pub summary: String,
    pub source_url: String,
}

/// Checks the request body carries a usable absolute http(s) URL.
///
/// The original string is returned alongside the parsed form so the response
/// echoes exactly what the user submitted.
pub fn validate_request(body: &Value) -> Result<(String, Url)> {
    let raw = body
        .get("url")
        .and_then(Value::as_str)
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("有効なURLを入力してください".into()))?;

    let malformed = || AppError::InvalidInput("URLの形式が正しくありません".into());
    let url = Url::parse(raw.trim()).map_err(|_| malformed())?;
    if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
        return Err(malformed());
    }

    Ok((raw.to_string(), url))
}

/// Fetch, extract and summarize one article.
pub struct SummaryPipeline {
    fetcher: Arc<dyn DocumentFetcher>,
    extractor: Arc<dyn ContentExtractor>,
    summarizer: Summarizer,
}

impl SummaryPipeline {
    pub fn new(
        fetcher: Arc<dyn DocumentFetcher>,
        extractor: Arc<dyn ContentExtractor>,
        summarizer: Summarizer,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            summarizer,
        }
    }

    pub async fn run(&self, body: &Value) -> Result<ArticleSummary> {
        let (source_url, url) = validate_request(body)?;
        self.summarizer.ensure_configured()?;

        tracing::info!(%url, "Fetching article");
        let html = self.fetcher.fetch(&url).await?;

        let article = self
            .extractor
            .extract(&html, &url)
            .ok_or_else(|| AppError::Extraction("記事の本文を抽出できませんでした".into()))?;

        if !article.is_long_enough() {
            tracing::info!(
                %url,
                chars = article.body_chars(),
                min = MIN_BODY_CHARS,
                "Article body too short"
            );
            return Err(AppError::Extraction("記事の内容が短すぎます".into()));
        }
        tracing::debug!(%url, chars = article.body_chars(), "Extracted article");

        let summary = self.summarizer.summarize(&article).await?;
        tracing::info!(%url, "Summary generated");

        Ok(ArticleSummary {
            title: article.title.unwrap_or_else(|| UNTITLED.to_string()),
            summary,
            source_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use serde_json::json;

    fn category(body: Value) -> ErrorCategory {
        validate_request(&body).unwrap_err().category()
    }

    #[test]
    fn accepts_absolute_http_urls() {
        let (raw, url) = validate_request(&json!({"url": "https://example.com/article"})).unwrap();
        assert_eq!(raw, "https://example.com/article");
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn rejects_missing_or_non_string_url() {
        assert_eq!(category(json!({})), ErrorCategory::InvalidInput);
        assert_eq!(category(json!({"url": 42})), ErrorCategory::InvalidInput);
        assert_eq!(category(json!({"url": "   "})), ErrorCategory::InvalidInput);
        assert_eq!(category(json!("https://example.com")), ErrorCategory::InvalidInput);
    }

    #[test]
    fn rejects_malformed_urls() {
        for raw in ["not-a-url", "/relative/path", "example.com", "ftp://example.com/file", "mailto:a@b.c"] {
            let err = validate_request(&json!({ "url": raw })).unwrap_err();
            assert_eq!(err.category(), ErrorCategory::InvalidInput, "{raw}");
            assert_eq!(err.user_message(), "URLの形式が正しくありません");
        }
    }
}
