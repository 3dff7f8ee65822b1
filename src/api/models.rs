use serde::Serialize;

use crate::error::ErrorCategory;
use crate::pipeline::ArticleSummary;

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub success: bool,
    pub title: String,
    pub summary: String,
    pub url: String,
}

impl From<ArticleSummary> for SummarizeResponse {
    fn from(summary: ArticleSummary) -> Self {
        Self {
            success: true,
            title: summary.title,
            summary: summary.summary,
            url: summary.source_url,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_category: ErrorCategory,
}
