use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};
use serde::Serialize;

use crate::api::response;
use crate::fetcher::FetchError;
use crate::llm::LlmError;

/// User-facing failure class of a summarize request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    InvalidInput,
    FetchFailure,
    ExtractionFailure,
    MissingCredential,
    ProviderOverloaded,
    InvalidCredential,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::FetchFailure => "fetch_failure",
            Self::ExtractionFailure => "extraction_failure",
            Self::MissingCredential => "missing_credential",
            Self::ProviderOverloaded => "provider_overloaded",
            Self::InvalidCredential => "invalid_credential",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to fetch page: {0}")]
    Fetch(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Gemini API key is not configured")]
    MissingCredential,

    #[error("Gemini API is overloaded: {0}")]
    ProviderOverloaded(String),

    #[error("Gemini API key was rejected: {0}")]
    InvalidCredential(String),

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::InvalidInput(_) => ErrorCategory::InvalidInput,
            AppError::Fetch(_) => ErrorCategory::FetchFailure,
            AppError::Extraction(_) => ErrorCategory::ExtractionFailure,
            AppError::MissingCredential => ErrorCategory::MissingCredential,
            AppError::ProviderOverloaded(_) => ErrorCategory::ProviderOverloaded,
            AppError::InvalidCredential(_) => ErrorCategory::InvalidCredential,
            AppError::Unknown(_) => ErrorCategory::Unknown,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::Fetch(_) | AppError::Extraction(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::ProviderOverloaded(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::MissingCredential
            | AppError::InvalidCredential(_)
            | AppError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the end user. Provider and internal details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg) | AppError::Fetch(msg) | AppError::Extraction(msg) => {
                msg.clone()
            }
            AppError::MissingCredential => "Gemini APIキーが設定されていません".to_string(),
            AppError::ProviderOverloaded(_) => {
                "AI APIが混雑しています。少し待ってから再度お試しください。（30秒〜1分後）"
                    .to_string()
            }
            AppError::InvalidCredential(_) => "Gemini APIキーが無効です".to_string(),
            AppError::Unknown(_) => {
                "要約処理中にエラーが発生しました。しばらく待ってから再度お試しください。"
                    .to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_client_error() {
            tracing::warn!(category = self.category().as_str(), "Request rejected: {}", self);
        } else {
            tracing::error!(category = self.category().as_str(), "Request failed: {}", self);
        }

        response::error(status, self.category(), self.user_message()).into_response()
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        let message = match &err {
            FetchError::Transport(e) => format!("URLへの接続に失敗しました: {}", e),
            FetchError::Status(status) => {
                format!("ページの取得に失敗しました (ステータス: {})", status)
            }
            FetchError::Body(e) => format!("ページの読み込みに失敗しました: {}", e),
        };
        AppError::Fetch(message)
    }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingApiKey => AppError::MissingCredential,
            LlmError::Overloaded(msg) => AppError::ProviderOverloaded(msg),
            LlmError::InvalidApiKey(msg) => AppError::InvalidCredential(msg),
            other => AppError::Unknown(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_side_failures_are_bad_requests() {
        for err in [
            AppError::InvalidInput("x".into()),
            AppError::Fetch("x".into()),
            AppError::Extraction("x".into()),
        ] {
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn provider_failures_map_to_server_statuses() {
        assert_eq!(AppError::MissingCredential.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            AppError::ProviderOverloaded("busy".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::InvalidCredential("bad".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::Unknown("boom".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn llm_errors_are_classified() {
        assert_eq!(
            AppError::from(LlmError::MissingApiKey).category(),
            ErrorCategory::MissingCredential
        );
        assert_eq!(
            AppError::from(LlmError::Overloaded("The model is overloaded".into())).category(),
            ErrorCategory::ProviderOverloaded
        );
        assert_eq!(
            AppError::from(LlmError::InvalidApiKey("API key not valid".into())).category(),
            ErrorCategory::InvalidCredential
        );
        assert_eq!(
            AppError::from(LlmError::Api { status: 500, message: "internal".into() }).category(),
            ErrorCategory::Unknown
        );
    }

    #[test]
    fn status_errors_mention_the_code() {
        let err = AppError::from(FetchError::Status(404));
        assert_eq!(err.category(), ErrorCategory::FetchFailure);
        assert!(err.user_message().contains("404"));
    }

    #[test]
    fn unknown_errors_hide_internal_detail() {
        let err = AppError::Unknown("stack trace at line 42".into());
        assert!(!err.user_message().contains("line 42"));
    }

    #[test]
    fn categories_serialize_as_snake_case() {
        let json = serde_json::to_string(&ErrorCategory::ProviderOverloaded).unwrap();
        assert_eq!(json, "\"provider_overloaded\"");
        assert_eq!(ErrorCategory::ProviderOverloaded.as_str(), "provider_overloaded");
    }
}
