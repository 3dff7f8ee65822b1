use axum::Json;
use axum::http::StatusCode;

use crate::api::models::{ErrorResponse, SummarizeResponse};
use crate::error::ErrorCategory;
use crate::pipeline::ArticleSummary;

pub fn success(summary: ArticleSummary) -> (StatusCode, Json<SummarizeResponse>) {
    (StatusCode::OK, Json(SummarizeResponse::from(summary)))
}

pub fn error(
    status: StatusCode,
    category: ErrorCategory,
    message: String,
) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: message,
            error_category: category,
        }),
    )
}
